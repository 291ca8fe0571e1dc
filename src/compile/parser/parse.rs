use chumsky::input::ValueInput;
use chumsky::prelude::*;
use chumsky::recursive::Direct;

use crate::compile::ast::int_literal::IntLiteral;
use crate::compile::ast::BinaryOp;
use crate::compile::ast::Expr;
use crate::compile::ast::ExprKind;
use crate::compile::ast::Program;
use crate::compile::ast::SourcePos;
use crate::compile::ast::Stmt;
use crate::compile::ast::Type;
use crate::compile::ast::UnaryOp;
use crate::compile::parser::lex::Token;

type ErrorParserExtra<'src> = extra::Err<Rich<'src, Token<'src>, SourcePos>>;

pub fn program_parser<'src, I>() -> impl Parser<'src, I, Program, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    stmt()
        .repeated()
        .collect()
        .map_with(|body, ctx| Program {
            body,
            span: ctx.span(),
        })
        .then_ignore(end())
}

fn type_parser<'src, I>() -> impl Parser<'src, I, Type, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let int = just(Token::INT).to(Type::Int);
    let boolean = just(Token::BOOLEAN).to(Type::Bool);

    choice((int, boolean))
}

fn stmt<'src, I>() -> impl Parser<'src, I, Stmt, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    recursive(|stmt: Recursive<Direct<'src, '_, I, Stmt, ErrorParserExtra<'src>>>| {
        let ident = select! {Token::IDENT(x) => x};

        let decl = type_parser()
            .then(ident)
            .then(just(Token::EQUAL_SIGN).ignore_then(expr()).or_not())
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|((ty, name), init), ctx| Stmt::Decl {
                ty,
                name: name.to_string(),
                init,
                entry: None,
                span: ctx.span(),
            })
            .boxed();

        let print_stmt = just(Token::PRINT)
            .ignore_then(expr())
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|exp, ctx| Stmt::Print(exp, ctx.span()))
            .boxed();

        let if_stmt = just(Token::IF)
            .ignore_then(expr().delimited_by(just(Token::L_ROUND), just(Token::R_ROUND)))
            .then(stmt.clone())
            .then(just(Token::ELSE).ignore_then(stmt.clone()).or_not())
            .map(|((test, if_true), if_false)| {
                Stmt::If(test, if_true.boxed(), if_false.map(Stmt::boxed))
            })
            .boxed();

        let while_stmt = just(Token::WHILE)
            .ignore_then(expr().delimited_by(just(Token::L_ROUND), just(Token::R_ROUND)))
            .then(stmt.clone())
            .map(|(test, body)| Stmt::While(test, body.boxed()))
            .boxed();

        let block_stmt = stmt
            .clone()
            .repeated()
            .collect()
            .delimited_by(just(Token::L_CURLY), just(Token::R_CURLY))
            .map(Stmt::Block)
            .boxed();

        let expr_stmt = expr()
            .then_ignore(just(Token::SEMICOLON))
            .map(Stmt::Expr)
            .boxed();

        choice((
            decl, print_stmt, if_stmt, while_stmt, block_stmt, expr_stmt,
        ))
        .boxed()
    })
}

pub fn expr<'src, I>() -> impl Parser<'src, I, Expr, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let num = select! {Token::NUM {value, base} => (value, base)}.try_map_with(
        |(value, base), ctx| match IntLiteral::new(value.to_string(), base).parse() {
            Ok(n) => Ok(Expr::new(ExprKind::Int(n), ctx.span())),
            Err(_) => Err(Rich::custom(ctx.span(), "integer literal out of bounds")),
        },
    );

    let boolean = choice((just(Token::TRUE).to(true), just(Token::FALSE).to(false)))
        .map_with(|value, ctx| Expr::new(ExprKind::Bool(value), ctx.span()));

    let ident = select! {Token::IDENT(ident) => ident}
        .map_with(|ident, ctx| Expr::new(ExprKind::Ident(ident.to_string(), None), ctx.span()));

    recursive(|expr| {
        let atomic_expr = choice((
            num,
            boolean,
            ident,
            expr.clone()
                .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND)),
        ))
        .boxed();

        let unary_op = choice((
            just(Token::MINUS).to(UnaryOp::Neg),
            just(Token::TILDE).to(UnaryOp::BitwiseNot),
            just(Token::EXCLAMATION_MARK).to(UnaryOp::LogicalNot),
        ))
        .boxed();
        let unary = unary_op
            .repeated()
            .foldr_with(atomic_expr, |op, rhs, ctx| {
                Expr::new(ExprKind::Unary(op, rhs.boxed()), ctx.span())
            })
            .boxed();

        let mult = unary
            .clone()
            .foldl_with(
                just(Token::STAR).to(BinaryOp::Mul).then(unary).repeated(),
                |lhs, (op, rhs), ctx| {
                    Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
                },
            )
            .boxed();

        let sum_op = choice((
            just(Token::PLUS).to(BinaryOp::Add),
            just(Token::MINUS).to(BinaryOp::Sub),
        ))
        .boxed();
        let sum = mult
            .clone()
            .foldl_with(sum_op.then(mult).repeated(), |lhs, (op, rhs), ctx| {
                Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
            })
            .boxed();

        let int_comp_op = choice((
            just(Token::L_POINTY).to(BinaryOp::Less),
            just(Token::LESS_EQ).to(BinaryOp::LessEq),
            just(Token::R_POINTY).to(BinaryOp::Greater),
            just(Token::GREATER_EQ).to(BinaryOp::GreaterEq),
        ))
        .boxed();
        let int_comp = sum
            .clone()
            .foldl_with(int_comp_op.then(sum).repeated(), |lhs, (op, rhs), ctx| {
                Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
            })
            .boxed();

        let comp_op = choice((
            just(Token::EQ).to(BinaryOp::Eq),
            just(Token::NOT_EQ).to(BinaryOp::NotEq),
        ))
        .boxed();
        let comp = int_comp
            .clone()
            .foldl_with(comp_op.then(int_comp).repeated(), |lhs, (op, rhs), ctx| {
                Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
            })
            .boxed();

        let bitwise_and = comp
            .clone()
            .foldl_with(
                just(Token::AMPERSAND)
                    .to(BinaryOp::BitwiseAnd)
                    .then(comp)
                    .repeated(),
                |lhs, (op, rhs), ctx| {
                    Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
                },
            )
            .boxed();

        let bitwise_xor = bitwise_and
            .clone()
            .foldl_with(
                just(Token::CARET)
                    .to(BinaryOp::BitwiseXor)
                    .then(bitwise_and)
                    .repeated(),
                |lhs, (op, rhs), ctx| {
                    Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
                },
            )
            .boxed();

        let bitwise_or = bitwise_xor
            .clone()
            .foldl_with(
                just(Token::PIPE)
                    .to(BinaryOp::BitwiseOr)
                    .then(bitwise_xor)
                    .repeated(),
                |lhs, (op, rhs), ctx| {
                    Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
                },
            )
            .boxed();

        let logical_and = bitwise_or
            .clone()
            .foldl_with(
                just(Token::LOGICAL_AND)
                    .to(BinaryOp::LogicalAnd)
                    .then(bitwise_or)
                    .repeated(),
                |lhs, (op, rhs), ctx| {
                    Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
                },
            )
            .boxed();

        let logical_or = logical_and
            .clone()
            .foldl_with(
                just(Token::LOGICAL_OR)
                    .to(BinaryOp::LogicalOr)
                    .then(logical_and)
                    .repeated(),
                |lhs, (op, rhs), ctx| {
                    Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), ctx.span())
                },
            )
            .boxed();

        // assignment binds loosest and associates to the right; anything
        // other than a plain identifier is an invalid left hand side
        let assign = logical_or
            .clone()
            .then(
                just(Token::EQUAL_SIGN)
                    .ignore_then(expr.clone())
                    .or_not(),
            )
            .try_map_with(|(lhs, rhs), ctx| {
                let Some(rhs) = rhs else {
                    return Ok(lhs);
                };

                if !matches!(lhs.kind, ExprKind::Ident(..)) {
                    return Err(Rich::custom(
                        ctx.span(),
                        "invalid left hand side for assignment",
                    ));
                }

                Ok(Expr::new(
                    ExprKind::Assign(lhs.boxed(), rhs.boxed()),
                    ctx.span(),
                ))
            })
            .boxed();

        assign
    })
}

#[cfg(test)]
mod tests {
    use chumsky::input::Input;

    use super::*;
    use crate::compile::parser::lex::lexer;

    fn parse_source(src: &str) -> Program {
        let tokens = lexer().parse(src).into_result().expect("lexing failed");
        let stream = tokens.as_slice().map(src.len()..src.len(), |(t, s)| (t, s));

        let program = program_parser()
            .parse(stream)
            .into_result()
            .expect("parsing failed");
        program
    }

    fn parse_fails(src: &str) -> bool {
        let tokens = lexer().parse(src).into_result().expect("lexing failed");
        let stream = tokens.as_slice().map(src.len()..src.len(), |(t, s)| (t, s));

        let has_errors = program_parser().parse(stream).has_errors();
        has_errors
    }

    #[test]
    fn declarations_with_and_without_initializer() {
        let program = parse_source("int x; boolean b = true;");

        assert_eq!(2, program.body.len());
        assert!(matches!(
            &program.body[0],
            Stmt::Decl { ty: Type::Int, init: None, .. }
        ));
        assert!(matches!(
            &program.body[1],
            Stmt::Decl { ty: Type::Bool, init: Some(_), .. }
        ));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse_source("x = 1 + 2 * 3;");

        let Stmt::Expr(assign) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Assign(_, rhs) = &assign.kind else {
            panic!("expected an assignment");
        };
        let ExprKind::Binary(BinaryOp::Add, _, add_rhs) = &rhs.kind else {
            panic!("expected the addition at the top");
        };

        assert!(matches!(add_rhs.kind, ExprKind::Binary(BinaryOp::Mul, ..)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_source("x = y = 3;");

        let Stmt::Expr(outer) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Assign(_, rhs) = &outer.kind else {
            panic!("expected an assignment");
        };

        assert!(matches!(rhs.kind, ExprKind::Assign(..)));
    }

    #[test]
    fn non_identifier_assignment_targets_are_rejected() {
        assert!(parse_fails("1 = x;"));
        assert!(parse_fails("x + y = 3;"));
    }

    #[test]
    fn else_binds_to_the_nearest_if() {
        let program = parse_source("if (a) if (b) print 1; else print 2;");

        let Stmt::If(_, inner, outer_else) = &program.body[0] else {
            panic!("expected an if statement");
        };

        assert!(outer_else.is_none());
        assert!(matches!(**inner, Stmt::If(_, _, Some(_))));
    }

    #[test]
    fn bitwise_or_binds_looser_than_xor_and_and() {
        let program = parse_source("x = a & b ^ c | d;");

        let Stmt::Expr(assign) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Assign(_, rhs) = &assign.kind else {
            panic!("expected an assignment");
        };
        let ExprKind::Binary(BinaryOp::BitwiseOr, or_lhs, _) = &rhs.kind else {
            panic!("expected the or at the top");
        };

        assert!(matches!(
            or_lhs.kind,
            ExprKind::Binary(BinaryOp::BitwiseXor, ..)
        ));
    }

    #[test]
    fn out_of_bounds_literals_are_parse_errors() {
        assert!(parse_fails("x = 4294967296;"));
    }
}

use crate::compile::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, Type, UnaryOp};
use crate::compile::semantic::symbols::SymbolTable;
use crate::compile::semantic::{Reporter, SemanticError};

/// Bottom-up type checker. Every expression node gets its synthesized type
/// written into its `ty` slot; `require` reports a mismatch but hands the
/// expected type back to the caller, so one fault does not cascade into a
/// chain of follow-up diagnostics.
pub struct TypeAnalysis<'a> {
    symbols: &'a SymbolTable,
    reporter: &'a mut Reporter,
}

impl<'a> TypeAnalysis<'a> {
    pub fn analyze(program: &mut Program, symbols: &'a SymbolTable, reporter: &'a mut Reporter) {
        let mut analysis = TypeAnalysis { symbols, reporter };

        for stmt in program.body.iter_mut() {
            analysis.analyze_stmt(stmt);
        }
    }

    fn analyze_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Decl { ty, init, .. } => {
                let expected = *ty;
                if let Some(init) = init {
                    self.require(init, expected);
                }
            }
            Stmt::If(test, if_true, if_false) => {
                self.require(test, Type::Bool);
                self.analyze_stmt(if_true);
                if let Some(if_false) = if_false {
                    self.analyze_stmt(if_false);
                }
            }
            Stmt::While(test, body) => {
                self.require(test, Type::Bool);
                self.analyze_stmt(body);
            }
            Stmt::Print(exp, _) => {
                self.require(exp, Type::Int);
            }
            Stmt::Expr(exp) => {
                self.analyze_expr(exp);
            }
            Stmt::Block(stmts) => {
                for stmt in stmts.iter_mut() {
                    self.analyze_stmt(stmt);
                }
            }
        }
    }

    fn analyze_expr(&mut self, expr: &mut Expr) -> Type {
        let ty = match &mut expr.kind {
            ExprKind::Int(_) => Type::Int,
            ExprKind::Bool(_) => Type::Bool,
            ExprKind::Ident(_, entry) => match entry {
                Some(id) => self.symbols.entry(*id).ty,
                None => unreachable!("identifier not bound by scope analysis"),
            },
            ExprKind::Unary(op, rhs) => match op {
                UnaryOp::Neg | UnaryOp::BitwiseNot => {
                    self.require(rhs, Type::Int);
                    Type::Int
                }
                UnaryOp::LogicalNot => {
                    self.require(rhs, Type::Bool);
                    Type::Bool
                }
            },
            ExprKind::Binary(op, lhs, rhs) => match op {
                BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::BitwiseAnd
                | BinaryOp::BitwiseOr
                | BinaryOp::BitwiseXor => {
                    self.require(lhs, Type::Int);
                    self.require(rhs, Type::Int);
                    Type::Int
                }
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                    self.require(lhs, Type::Bool);
                    self.require(rhs, Type::Bool);
                    Type::Bool
                }
                BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
                    self.require(lhs, Type::Int);
                    self.require(rhs, Type::Int);
                    Type::Bool
                }
                BinaryOp::Eq | BinaryOp::NotEq => {
                    // both int == int and boolean == boolean are fine, but
                    // the operand types have to agree
                    let operand = self.require_either(lhs, Type::Int, Type::Bool);
                    if self.is_synthetic(lhs) {
                        // a recovery binding fixes no operand type, so the
                        // right side only has to fit the operator
                        self.require_either(rhs, Type::Int, Type::Bool);
                    } else {
                        self.require(rhs, operand);
                    }
                    Type::Bool
                }
            },
            ExprKind::Assign(lhs, rhs) => {
                let expected = self.analyze_expr(lhs);
                if self.is_synthetic(lhs) {
                    // the declared type is unknown, so the right side
                    // cannot mismatch it
                    self.analyze_expr(rhs)
                } else {
                    self.require(rhs, expected);
                    expected
                }
            }
        };

        expr.ty = Some(ty);

        ty
    }

    /// Checks an expression that has to have the `expected` type. On a
    /// mismatch the fault is reported and `expected` is returned, as if the
    /// expression had conformed. A recovery binding conforms to whatever is
    /// expected without a report: its fault was already raised by scope
    /// analysis.
    fn require(&mut self, expr: &mut Expr, expected: Type) -> Type {
        let got = self.analyze_expr(expr);
        if got == expected {
            return got;
        }

        if !self.is_synthetic(expr) {
            self.reporter.report(
                expr.span.clone(),
                SemanticError::MismatchedTypes { expected, got },
            );
        }

        expected
    }

    /// Checks an expression that may have either of two types.
    fn require_either(&mut self, expr: &mut Expr, expected: Type, alternative: Type) -> Type {
        let got = self.analyze_expr(expr);
        if got == expected || got == alternative {
            return got;
        }

        if !self.is_synthetic(expr) {
            self.reporter.report(
                expr.span.clone(),
                SemanticError::MismatchedTypes { expected, got },
            );
        }

        expected
    }

    fn is_synthetic(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Ident(_, Some(id)) => self.symbols.entry(*id).synthetic,
            _ => false,
        }
    }
}

use std::borrow::Cow;

use chumsky::prelude::*;

use super::Spanned;

#[derive(Clone, Debug, PartialEq)]
#[allow(non_camel_case_types)]
pub enum Token<'src> {
    IDENT(Cow<'src, str>),
    NUM { value: Cow<'src, str>, base: u32 },
    INT,
    BOOLEAN,
    IF,
    ELSE,
    WHILE,
    PRINT,
    TRUE,
    FALSE,
    L_ROUND,
    R_ROUND,
    L_CURLY,
    R_CURLY,
    SEMICOLON,
    EQUAL_SIGN,
    PLUS,
    MINUS,
    STAR,
    AMPERSAND,
    PIPE,
    CARET,
    TILDE,
    EXCLAMATION_MARK,
    LOGICAL_AND,
    LOGICAL_OR,
    EQ,
    NOT_EQ,
    L_POINTY,
    LESS_EQ,
    R_POINTY,
    GREATER_EQ,
}

impl<'a> Token<'a> {
    pub fn into_owned<'b>(&'a self) -> Token<'b> {
        match self.clone() {
            Token::IDENT(str) => Token::IDENT(Cow::Owned(str.into_owned())),
            Token::NUM { value, base } => Token::NUM {
                value: Cow::Owned(value.into_owned()),
                base,
            },
            Token::INT => Token::INT,
            Token::BOOLEAN => Token::BOOLEAN,
            Token::IF => Token::IF,
            Token::ELSE => Token::ELSE,
            Token::WHILE => Token::WHILE,
            Token::PRINT => Token::PRINT,
            Token::TRUE => Token::TRUE,
            Token::FALSE => Token::FALSE,
            Token::L_ROUND => Token::L_ROUND,
            Token::R_ROUND => Token::R_ROUND,
            Token::L_CURLY => Token::L_CURLY,
            Token::R_CURLY => Token::R_CURLY,
            Token::SEMICOLON => Token::SEMICOLON,
            Token::EQUAL_SIGN => Token::EQUAL_SIGN,
            Token::PLUS => Token::PLUS,
            Token::MINUS => Token::MINUS,
            Token::STAR => Token::STAR,
            Token::AMPERSAND => Token::AMPERSAND,
            Token::PIPE => Token::PIPE,
            Token::CARET => Token::CARET,
            Token::TILDE => Token::TILDE,
            Token::EXCLAMATION_MARK => Token::EXCLAMATION_MARK,
            Token::LOGICAL_AND => Token::LOGICAL_AND,
            Token::LOGICAL_OR => Token::LOGICAL_OR,
            Token::EQ => Token::EQ,
            Token::NOT_EQ => Token::NOT_EQ,
            Token::L_POINTY => Token::L_POINTY,
            Token::LESS_EQ => Token::LESS_EQ,
            Token::R_POINTY => Token::R_POINTY,
            Token::GREATER_EQ => Token::GREATER_EQ,
        }
    }
}

type ErrorParserExtra<'src> = extra::Err<Rich<'src, char, SimpleSpan>>;

fn decimal<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    text::int(10).map(|value: &'src str| Token::NUM {
        value: Cow::Borrowed(value),
        base: 10,
    })
}

fn hexadecimal<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    just("0x")
        .ignore_then(text::int(16))
        .map(|value: &'src str| Token::NUM {
            value: Cow::Borrowed(value),
            base: 16,
        })
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, ErrorParserExtra<'src>> {
    let ident = text::ascii::ident().map(|ident| match ident {
        "int" => Token::INT,
        "boolean" => Token::BOOLEAN,
        "if" => Token::IF,
        "else" => Token::ELSE,
        "while" => Token::WHILE,
        "print" => Token::PRINT,
        "true" => Token::TRUE,
        "false" => Token::FALSE,
        _ => Token::IDENT(Cow::Borrowed(ident)),
    });

    // multi-character operators have to be tried before their prefixes
    let punctuation = choice((
        just("&&").to(Token::LOGICAL_AND),
        just("||").to(Token::LOGICAL_OR),
        just("==").to(Token::EQ),
        just("!=").to(Token::NOT_EQ),
        just("<=").to(Token::LESS_EQ),
        just(">=").to(Token::GREATER_EQ),
        just("(").to(Token::L_ROUND),
        just(")").to(Token::R_ROUND),
        just("{").to(Token::L_CURLY),
        just("}").to(Token::R_CURLY),
        just(";").to(Token::SEMICOLON),
        just("=").to(Token::EQUAL_SIGN),
        just("+").to(Token::PLUS),
        just("-").to(Token::MINUS),
        just("*").to(Token::STAR),
        just("&").to(Token::AMPERSAND),
        just("|").to(Token::PIPE),
        just("^").to(Token::CARET),
        just("~").to(Token::TILDE),
        just("!").to(Token::EXCLAMATION_MARK),
        just("<").to(Token::L_POINTY),
        just(">").to(Token::R_POINTY),
    ));

    let comment_single_line = just("//")
        .then(any().and_is(text::newline().not()).repeated())
        .padded()
        .to(())
        .boxed();

    let comment_multi_line = recursive(|comment| {
        let content = choice((comment, any().and_is(just("*/").not()).ignored()));

        just("/*")
            .then(content.repeated())
            .then(just("*/"))
            .padded()
            .to(())
    })
    .boxed();

    let comment = choice((comment_single_line, comment_multi_line)).boxed();

    choice((hexadecimal(), decimal(), ident, punctuation))
        .map_with(|token, ctx| (token, ctx.span().into()))
        .padded_by(comment.repeated())
        .padded()
        .repeated()
        .collect()
        .then_ignore(end())
}

use std::process::Termination;

use chumsky::error::Rich;
use thiserror::Error;

use crate::compile::asm::x86::CodeGenError;
use crate::compile::parser::lex::Token;

pub struct ExitCode(u8);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAIL_PARSING: ExitCode = ExitCode(42);
    pub const FAIL_SEMANTIC: ExitCode = ExitCode(7);
}

impl Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.0)
    }
}

impl From<MiniError> for ExitCode {
    fn from(value: MiniError) -> Self {
        match value {
            MiniError::LexerError(_) => ExitCode::FAIL_PARSING,
            MiniError::ParsingError(_) => ExitCode::FAIL_PARSING,
            MiniError::AnalysisError(_) => ExitCode::FAIL_SEMANTIC,
            _ => ExitCode(255),
        }
    }
}

#[derive(Error, Debug)]
pub enum MiniError {
    #[error("Lexical Analysis failed.")]
    LexerError(Vec<Rich<'static, char>>),

    #[error("Syntactic Analysis failed.")]
    ParsingError(Vec<Rich<'static, Token<'static>, std::ops::Range<usize>>>),

    #[error("Semantic Analysis failed:\n{}", .0.join("\n"))]
    AnalysisError(Vec<String>),

    #[error("Code generation failed: {0}")]
    CodeGenError(#[from] CodeGenError),

    #[error("There was an I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("There was a formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

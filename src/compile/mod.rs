use std::{fs, path::PathBuf};

use chumsky::{input::Input, Parser};

use crate::compile::ast::Program;
use crate::compile::parser::{lex::lexer, parse::program_parser};
use crate::compile::semantic::{symbols::SymbolTable, SemanticAnalysis};
use crate::infra::MiniError;

pub mod asm;
pub mod ast;
pub mod optimize;
pub mod parser;
pub mod semantic;

// Custom macro for compiler pipeline errors

macro_rules! pipeline_error {
    ($msg:expr) => {
        panic!("Compiler pipeline encountered an error: {}", $msg)
    };
}

/// Drives a source file through the whole pipeline: parse, the three
/// checking passes, algebraic simplification and IA-32 code generation.
/// The stages run in order and the first failing stage stops the run.
#[derive(Debug, Default)]
pub struct Compiler {
    src_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    src: Option<String>,
    program: Option<Program>,
    symbols: Option<SymbolTable>,
    asm: Option<String>,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn src(&mut self, src: PathBuf) -> &mut Self {
        self.src_path = Some(src);

        self
    }

    pub fn out(&mut self, out: PathBuf) -> &mut Self {
        self.out_path = Some(out);

        self
    }

    pub fn compile(&mut self) -> Result<&mut Self, MiniError> {
        self.parse()?.analyze()?.simplify()?.generate()?.write_out()?;

        Ok(self)
    }

    fn parse(&mut self) -> Result<&mut Self, MiniError> {
        let Some(ref src_path) = self.src_path else {
            pipeline_error!("No src path provided")
        };

        let src = match fs::read_to_string(src_path) {
            Ok(src) => src,
            Err(err) => return Err(MiniError::IOError(err)),
        };

        let tokens = lexer().parse(src.as_str()).into_result().map_err(
            |err: Vec<chumsky::prelude::Rich<'_, char>>| {
                let err: Vec<chumsky::prelude::Rich<'static, char>> = err
                    .into_iter()
                    .map(chumsky::error::Rich::into_owned)
                    .collect();

                MiniError::LexerError(err)
            },
        )?;

        let token_stream = tokens.as_slice().map(src.len()..src.len(), |(t, s)| (t, s));

        let program = match program_parser().parse(token_stream).into_result() {
            Ok(program) => program,
            Err(err) => {
                let err = err
                    .into_iter()
                    .map(|x| x.map_token(|x| x.into_owned()).into_owned())
                    .collect();

                return Err(MiniError::ParsingError(err));
            }
        };

        self.program = Some(program);
        self.src = Some(src);

        Ok(self)
    }

    fn analyze(&mut self) -> Result<&mut Self, MiniError> {
        let Some(ref mut program) = self.program else {
            pipeline_error!("No AST provided.")
        };
        let Some(ref src) = self.src else {
            pipeline_error!("No source text available.")
        };

        match SemanticAnalysis::analyze(program) {
            Ok(symbols) => self.symbols = Some(symbols),
            Err(diagnostics) => {
                let rendered = diagnostics.iter().map(|d| d.render(src)).collect();

                return Err(MiniError::AnalysisError(rendered));
            }
        }

        Ok(self)
    }

    fn simplify(&mut self) -> Result<&mut Self, MiniError> {
        let Some(ref mut program) = self.program else {
            pipeline_error!("No AST provided.")
        };

        optimize::simplify(program);

        Ok(self)
    }

    fn generate(&mut self) -> Result<&mut Self, MiniError> {
        let Some(ref program) = self.program else {
            pipeline_error!("No AST provided.")
        };
        let Some(ref mut symbols) = self.symbols else {
            pipeline_error!("No symbol table provided.")
        };

        let asm = asm::x86::generate(program, symbols)?;
        self.asm = Some(asm);

        Ok(self)
    }

    fn write_out(&mut self) -> Result<&mut Self, MiniError> {
        let Some(ref out_path) = self.out_path else {
            pipeline_error!("No output path provided.")
        };
        let Some(ref asm) = self.asm else {
            pipeline_error!("No assembly generated.")
        };

        fs::write(out_path, asm)?;

        Ok(self)
    }
}

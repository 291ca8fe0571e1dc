use thiserror::Error;

use crate::compile::ast::{Program, SourcePos, Type};

pub mod init;
pub mod scope;
pub mod symbols;
pub mod typecheck;

use symbols::SymbolTable;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Variable with name {0} is already declared.")]
    VariableRedeclared(String),

    #[error("Variable {0} is used without being declared.")]
    VariableUndeclared(String),

    #[error("Variable {0} is used without being initialized.")]
    VariableUninitialized(String),

    #[error("Expression has unexpected type. Expected was `{expected}`, but got `{got}`.")]
    MismatchedTypes { expected: Type, got: Type },
}

/// A reported fault together with the source position it was raised at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: SourcePos,
    pub error: SemanticError,
}

impl Diagnostic {
    /// Renders the diagnostic against the source text it was raised on.
    pub fn render(&self, src: &str) -> String {
        let (line, column) = line_col(src, self.span.start);
        format!("line {line}, column {column}: {}", self.error)
    }
}

pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];

    let line = before.matches('\n').count() + 1;
    let line_start = match before.rfind('\n') {
        Some(newline) => newline + 1,
        None => 0,
    };

    (line, offset - line_start + 1)
}

/// Collects diagnostics across the analysis passes. The passes recover and
/// keep walking after a fault; the driver consults the collector once all
/// of them have run.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    pub fn report(&mut self, span: SourcePos, error: SemanticError) {
        self.diagnostics.push(Diagnostic { span, error });
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

pub struct SemanticAnalysis;

impl SemanticAnalysis {
    /// Runs scope, type and initialization analysis over the program in
    /// that order. All three always run; earlier faults are patched up with
    /// recovery bindings so later passes still produce their diagnostics.
    pub fn analyze(program: &mut Program) -> Result<SymbolTable, Vec<Diagnostic>> {
        let mut reporter = Reporter::default();
        let mut symbols = SymbolTable::new();

        scope::ScopeAnalysis::analyze(program, &mut symbols, &mut reporter);
        typecheck::TypeAnalysis::analyze(program, &symbols, &mut reporter);
        init::InitAnalysis::analyze(program, &symbols, &mut reporter);

        if reporter.has_errors() {
            return Err(reporter.into_diagnostics());
        }

        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use chumsky::input::Input;
    use chumsky::Parser;

    use super::*;
    use crate::compile::parser::{lex::lexer, parse::program_parser};

    fn analyze(src: &str) -> Result<SymbolTable, Vec<Diagnostic>> {
        let tokens = lexer().parse(src).into_result().expect("lexing failed");
        let stream = tokens.as_slice().map(src.len()..src.len(), |(t, s)| (t, s));
        let mut program = program_parser()
            .parse(stream)
            .into_result()
            .expect("parsing failed");

        SemanticAnalysis::analyze(&mut program)
    }

    fn errors(src: &str) -> Vec<SemanticError> {
        analyze(src)
            .expect_err("expected diagnostics")
            .into_iter()
            .map(|d| d.error)
            .collect()
    }

    #[test]
    fn well_formed_programs_pass() {
        assert!(analyze("int x; x = 3; print x;").is_ok());
        assert!(analyze("boolean b; b = true; if (b) print 1; else print 2;").is_ok());
        assert!(analyze("int x; x = 0; while (x < 3) { print x; x = x + 1; }").is_ok());
    }

    #[test]
    fn redeclaration_in_the_same_scope_is_reported() {
        assert_eq!(
            vec![SemanticError::VariableRedeclared("x".to_string())],
            errors("int x; int x;")
        );
    }

    #[test]
    fn shadowing_in_a_nested_block_is_allowed() {
        assert!(analyze("int x; x = 1; { int x; x = 2; print x; } print x;").is_ok());
    }

    #[test]
    fn a_block_scoped_variable_does_not_escape() {
        assert_eq!(
            vec![SemanticError::VariableUndeclared("y".to_string())],
            errors("{ int y; y = 1; } y = 2;")
        );
    }

    #[test]
    fn an_undeclared_identifier_is_reported_exactly_once() {
        // no cascading type or initialization faults for the surrounding
        // arithmetic
        assert_eq!(
            vec![SemanticError::VariableUndeclared("y".to_string())],
            errors("int x; x = (y + 2) + 3;")
        );
    }

    #[test]
    fn an_undeclared_identifier_does_not_cascade_in_boolean_positions() {
        let undeclared_q = vec![SemanticError::VariableUndeclared("q".to_string())];

        assert_eq!(undeclared_q, errors("if (q) print 1; else print 2;"));
        assert_eq!(undeclared_q, errors("while (q) print 1;"));
        assert_eq!(
            undeclared_q,
            errors("boolean b; b = true; boolean c; c = q && b;")
        );
        assert_eq!(
            undeclared_q,
            errors("boolean b; b = true; boolean c; c = q == b;")
        );
        assert_eq!(
            undeclared_q,
            errors("boolean b; b = true; boolean c; c = b == q;")
        );
        assert_eq!(undeclared_q, errors("q = true;"));
    }

    #[test]
    fn condition_expressions_must_be_boolean() {
        assert_eq!(
            vec![SemanticError::MismatchedTypes {
                expected: Type::Bool,
                got: Type::Int,
            }],
            errors("int x; x = 1; if (x) print 1; else print 2;")
        );
    }

    #[test]
    fn print_takes_an_integer() {
        assert_eq!(
            vec![SemanticError::MismatchedTypes {
                expected: Type::Int,
                got: Type::Bool,
            }],
            errors("boolean b; b = true; print b;")
        );
    }

    #[test]
    fn assignments_require_matching_types() {
        assert_eq!(
            vec![SemanticError::MismatchedTypes {
                expected: Type::Int,
                got: Type::Bool,
            }],
            errors("int x; x = true; print x;")
        );
    }

    #[test]
    fn initializers_must_match_the_declared_type() {
        assert_eq!(
            vec![SemanticError::MismatchedTypes {
                expected: Type::Bool,
                got: Type::Int,
            }],
            errors("boolean b = 1;")
        );
    }

    #[test]
    fn equality_is_allowed_on_booleans_and_integers() {
        assert!(analyze("boolean a; a = true; boolean c; c = a == false; print 1;").is_ok());
        assert!(analyze("int x; x = 1; boolean c; c = x != 2; print 1;").is_ok());
    }

    #[test]
    fn mixed_equality_operands_are_rejected() {
        assert_eq!(
            vec![SemanticError::MismatchedTypes {
                expected: Type::Int,
                got: Type::Bool,
            }],
            errors("int x; x = 1; boolean c; c = x == true;")
        );
    }

    #[test]
    fn reading_an_uninitialized_variable_is_reported() {
        assert_eq!(
            vec![SemanticError::VariableUninitialized("x".to_string())],
            errors("int x; print x;")
        );
    }

    #[test]
    fn declaration_initializers_count() {
        assert!(analyze("int x = 3; print x;").is_ok());
    }

    #[test]
    fn both_branches_must_initialize() {
        assert!(analyze(
            "int x; boolean b; b = true; if (b) x = 1; else x = 2; print x;"
        )
        .is_ok());

        assert_eq!(
            vec![SemanticError::VariableUninitialized("x".to_string())],
            errors("int x; boolean b; b = true; if (b) x = 1; print x;")
        );
    }

    #[test]
    fn while_bodies_may_not_run() {
        assert_eq!(
            vec![SemanticError::VariableUninitialized("x".to_string())],
            errors("int x; boolean b; b = false; while (b) x = 1; print x;")
        );
    }

    #[test]
    fn while_bodies_are_still_checked() {
        assert_eq!(
            vec![SemanticError::VariableUninitialized("y".to_string())],
            errors("int y; boolean b; b = false; while (b) print y; print 1;")
        );
    }

    #[test]
    fn short_circuit_right_sides_do_not_initialize() {
        // the right operand of && might never run, so the assignment
        // buried in it must not count afterwards
        assert_eq!(
            vec![SemanticError::VariableUninitialized("x".to_string())],
            errors("int x; boolean b; b = true; boolean c; c = b && (x = 1) == 1; print x;")
        );
    }

    #[test]
    fn assignment_initializes_inside_the_same_expression() {
        assert!(analyze("int x; int y; y = (x = 2) + x; print y;").is_ok());
    }

    #[test]
    fn faults_accumulate_across_passes() {
        let errs = errors("int x; int x; boolean b; b = 1; print y;");

        assert_eq!(3, errs.len());
    }
}

use thiserror::Error;

use crate::compile::ast::{Program, Stmt};
use crate::compile::semantic::symbols::SymbolTable;

pub mod codegen;
pub mod output;

use codegen::CodeGen;
use output::WORDSIZE;

#[derive(Error, Debug)]
pub enum CodeGenError {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("There was a formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// Generates the complete IA-32 assembly text for a checked and simplified
/// program: prologue, statement bodies and epilogue.
pub fn generate(program: &Program, symbols: &mut SymbolTable) -> Result<String, CodeGenError> {
    let mut codegen = CodeGen::new(symbols);

    codegen.prologue(frame_size(&program.body))?;
    for stmt in program.body.iter() {
        codegen.compile_stmt(stmt, 0)?;
    }
    codegen.epilogue()?;

    Ok(codegen.finish())
}

/// Bytes reserved below `%ebp` in the prologue: the deepest extent of
/// local slots over all block nestings, padded to keep `%esp` 16-byte
/// alignable across calls (the frame is 8 mod 16, complementing the
/// return address and the saved `%ebp`).
fn frame_size(body: &[Stmt]) -> i32 {
    let mut here = 0;
    let mut locals = 0;
    for stmt in body.iter() {
        locals = locals.max(frame_bytes(stmt, &mut here));
    }

    ((locals + 8 + 15) & !15) - 8
}

/// Mirrors the slot assignment of the code generator: declarations grow
/// the frame, blocks release their slots on exit.
fn frame_bytes(stmt: &Stmt, here: &mut i32) -> i32 {
    match stmt {
        Stmt::Decl { .. } => {
            *here += WORDSIZE;
            *here
        }
        Stmt::Block(stmts) => {
            let saved = *here;
            let mut max = *here;
            for stmt in stmts.iter() {
                max = max.max(frame_bytes(stmt, here));
            }
            *here = saved;

            max
        }
        Stmt::If(_, if_true, if_false) => {
            let mut max = frame_bytes(if_true, here);
            if let Some(if_false) = if_false {
                max = max.max(frame_bytes(if_false, here));
            }

            max
        }
        Stmt::While(_, body) => frame_bytes(body, here),
        Stmt::Print(..) | Stmt::Expr(_) => *here,
    }
}

#[cfg(test)]
mod tests {
    use chumsky::input::Input;
    use chumsky::Parser;

    use super::*;
    use crate::compile::optimize;
    use crate::compile::parser::{lex::lexer, parse::program_parser};
    use crate::compile::semantic::SemanticAnalysis;

    fn compile_source(src: &str) -> String {
        let tokens = lexer().parse(src).into_result().expect("lexing failed");
        let stream = tokens.as_slice().map(src.len()..src.len(), |(t, s)| (t, s));
        let mut program = program_parser()
            .parse(stream)
            .into_result()
            .expect("parsing failed");

        let mut symbols = SemanticAnalysis::analyze(&mut program).expect("analysis failed");
        optimize::simplify(&mut program);

        generate(&program, &mut symbols).expect("code generation failed")
    }

    #[test]
    fn the_frame_keeps_esp_16_byte_alignable() {
        assert_eq!(8, frame_size(&[]));

        for decls in 1..8 {
            let src = (0..decls)
                .map(|i| format!("int x{i};"))
                .collect::<String>();
            let asm = compile_source(&src);

            let frame: i32 = asm
                .lines()
                .find_map(|line| line.strip_prefix("\tsubl\t$"))
                .and_then(|rest| rest.strip_suffix(", %esp"))
                .and_then(|n| n.parse().ok())
                .expect("prologue frame adjust missing");

            assert!(frame >= decls * 4);
            assert_eq!(8, frame % 16);
        }
    }

    #[test]
    fn folded_constants_are_stored_directly() {
        let asm = compile_source("int x; x = (5 + 2) * 3; print x;");

        assert_eq!(1, asm.matches("$21").count());
        assert!(!asm.contains("imull"));
    }

    #[test]
    fn zero_additions_vanish_from_the_emitted_code() {
        let asm = compile_source("int x; x = 3 + 0;");

        assert!(asm.contains("\tmovl\t$3, %eax"));
        assert!(!asm.contains("addl"));
    }

    #[test]
    fn xor_minus_one_compiles_to_a_complement() {
        let asm = compile_source("int x; x = 15; x = x ^ -1; print x;");

        assert!(asm.contains("\tnotl\t%eax"));
        assert!(!asm.contains("xorl\t$-1"));
    }

    #[test]
    fn literal_operands_become_immediates() {
        let asm = compile_source("int x; x = 2; print x + 40;");

        assert!(asm.contains("\taddl\t$40, %eax"));
    }

    #[test]
    fn print_pads_the_stack_for_the_call() {
        let asm = compile_source("int x; x = 1; print x;");
        let lines: Vec<&str> = asm.lines().collect();

        let call = lines
            .iter()
            .position(|line| *line == "\tcall\tprint")
            .expect("no call emitted");

        assert_eq!("\tsubl\t$12, %esp", lines[call - 3]);
        assert_eq!("\tpushl\t%eax", lines[call - 1]);
        assert_eq!("\taddl\t$16, %esp", lines[call + 1]);
    }

    #[test]
    fn if_statements_branch_around_their_arms() {
        let asm = compile_source("boolean b; b = true; if (b) print 1; else print 2;");

        assert!(asm.contains("\tjz\t.L0"));
        assert!(asm.contains("\tjmp\t.L1"));
        assert!(asm.contains(".L0:"));
        assert!(asm.contains(".L1:"));
    }

    #[test]
    fn while_loops_test_at_the_bottom() {
        let asm = compile_source("int x; x = 0; while (x < 3) { print x; x = x + 1; }");
        let lines: Vec<&str> = asm.lines().collect();

        let entry = lines
            .iter()
            .position(|line| *line == "\tjmp\t.L1")
            .expect("no entry jump");
        let test = lines
            .iter()
            .position(|line| *line == ".L1:")
            .expect("no test label");

        assert!(entry < test);
        assert_eq!("\tcmpl\t$3, %eax", lines[test + 2]);
        assert_eq!("\tjl\t.L0", lines[test + 3]);
    }

    #[test]
    fn comparisons_against_registers_set_flags_once() {
        let asm = compile_source("int x; x = 1; int y; y = 2; boolean b; b = x < y; print 1;");

        assert!(asm.contains("\tcmpl\t%ecx, %eax"));
        assert!(asm.contains("\tsetl\t%al"));
        assert!(asm.contains("\tmovzbl\t%al, %eax"));
    }

    #[test]
    fn deep_expressions_spill_instead_of_running_out_of_registers() {
        // subtraction keeps its operand order, so a right-leaning chain
        // occupies all four registers and the last operand has to spill
        let src = "int a; a = 1; int b; b = 2; int c; c = 3; int d; d = 4; int e; e = 5;
                   print a - (b - (c - (d - e)));";
        let asm = compile_source(src);

        assert!(asm.contains("\tpushl\t%ebx"));
        assert!(asm.contains("\tsubl\t%ebx, (%esp)"));
        assert!(asm.contains("\tpopl\t%ebx"));
    }

    #[test]
    fn commutative_operands_reorder_to_avoid_spills() {
        let src = "int a; a = 1; int b; b = 2; int c; c = 3; int d; d = 4; int e; e = 5;
                   print a + (b + (c + (d + e)));";
        let asm = compile_source(src);

        assert!(!asm.contains("pushl\t%ebx"));
        assert!(asm.contains("\taddl\t%ecx, %eax"));
    }

    #[test]
    fn short_circuit_and_skips_the_right_side() {
        let asm = compile_source(
            "boolean a; a = true; boolean b; b = false; if (a && b) print 1; else print 2;",
        );
        let lines: Vec<&str> = asm.lines().collect();

        // both operand tests jump to the same false target
        let jumps: Vec<&&str> = lines.iter().filter(|line| line.starts_with("\tjz")).collect();
        assert_eq!(2, jumps.len());
        assert_eq!(jumps[0], jumps[1]);
    }
}

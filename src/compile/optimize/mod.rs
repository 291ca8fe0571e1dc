use crate::compile::ast::{Expr, ExprKind, Program, Stmt};

pub mod simplify;

/// Rewrites every expression in the program with the algebraic identities
/// implemented in [`simplify`]. Statements keep their shape; only their
/// expressions change.
pub fn simplify(program: &mut Program) {
    for stmt in program.body.iter_mut() {
        simplify_stmt(stmt);
    }
}

fn simplify_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::Decl { init, .. } => {
            if let Some(init) = init {
                rewrite(init);
            }
        }
        Stmt::If(test, if_true, if_false) => {
            rewrite(test);
            simplify_stmt(if_true);
            if let Some(if_false) = if_false {
                simplify_stmt(if_false);
            }
        }
        Stmt::While(test, body) => {
            rewrite(test);
            simplify_stmt(body);
        }
        Stmt::Print(exp, _) => rewrite(exp),
        Stmt::Expr(exp) => rewrite(exp),
        Stmt::Block(stmts) => {
            for stmt in stmts.iter_mut() {
                simplify_stmt(stmt);
            }
        }
    }
}

fn rewrite(slot: &mut Expr) {
    let placeholder = Expr::new(ExprKind::Int(0), slot.span.clone());
    let expr = std::mem::replace(slot, placeholder);
    *slot = simplify::expr(expr);
}

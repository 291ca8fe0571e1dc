use crate::compile::ast::{BinaryOp, Expr, ExprKind, Program, Stmt};
use crate::compile::semantic::symbols::SymbolTable;
use crate::compile::semantic::{Reporter, SemanticError};
use crate::datstructures::var_set::VarSet;

/// Definite-assignment analysis. Each statement and expression maps the set
/// of variables known to be initialized before it to the set known to be
/// initialized after it; reading a variable outside the incoming set is a
/// fault. Control flow meets conservatively: an `if` only keeps what both
/// branches establish, a `while` body contributes nothing (it may not run),
/// and the right side of `&&`/`||` is checked but discarded.
pub struct InitAnalysis<'a> {
    symbols: &'a SymbolTable,
    reporter: &'a mut Reporter,
}

impl<'a> InitAnalysis<'a> {
    pub fn analyze(program: &Program, symbols: &'a SymbolTable, reporter: &'a mut Reporter) {
        let mut analysis = InitAnalysis { symbols, reporter };

        let mut initialized = VarSet::new();
        for stmt in program.body.iter() {
            initialized = analysis.analyze_stmt(stmt, initialized);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt, initialized: VarSet) -> VarSet {
        match stmt {
            Stmt::Decl { init, entry, .. } => {
                let Some(init) = init else {
                    return initialized;
                };

                let after = self.analyze_expr(init, initialized);
                match entry {
                    Some(id) => after.add(*id),
                    None => unreachable!("declaration not bound by scope analysis"),
                }
            }
            Stmt::If(test, if_true, if_false) => {
                let before = self.analyze_expr(test, initialized);
                let true_out = self.analyze_stmt(if_true, before.clone());
                let false_out = match if_false {
                    Some(if_false) => self.analyze_stmt(if_false, before.clone()),
                    None => before.clone(),
                };

                // only what both branches establish beyond the baseline
                // is initialized afterwards
                true_out
                    .trim(&before)
                    .intersect(&false_out.trim(&before))
                    .union(&before)
            }
            Stmt::While(test, body) => {
                let before = self.analyze_expr(test, initialized);
                // the body is analyzed for its faults, but since it may
                // never run its additions are discarded
                self.analyze_stmt(body, before.clone());

                before
            }
            Stmt::Print(exp, _) => self.analyze_expr(exp, initialized),
            Stmt::Expr(exp) => self.analyze_expr(exp, initialized),
            Stmt::Block(stmts) => {
                let mut set = initialized;
                for stmt in stmts.iter() {
                    set = self.analyze_stmt(stmt, set);
                }

                set
            }
        }
    }

    fn analyze_expr(&mut self, expr: &Expr, initialized: VarSet) -> VarSet {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Bool(_) => initialized,
            ExprKind::Ident(name, entry) => {
                let Some(id) = entry else {
                    unreachable!("identifier not bound by scope analysis")
                };

                if !self.symbols.entry(*id).synthetic && !initialized.contains(*id) {
                    self.reporter.report(
                        expr.span.clone(),
                        SemanticError::VariableUninitialized(name.clone()),
                    );
                }

                initialized
            }
            ExprKind::Unary(_, rhs) => self.analyze_expr(rhs, initialized),
            ExprKind::Binary(BinaryOp::LogicalAnd | BinaryOp::LogicalOr, lhs, rhs) => {
                // short circuit: the right side may never evaluate
                let after = self.analyze_expr(lhs, initialized);
                self.analyze_expr(rhs, after.clone());

                after
            }
            ExprKind::Binary(_, lhs, rhs) => {
                let after = self.analyze_expr(lhs, initialized);
                self.analyze_expr(rhs, after)
            }
            ExprKind::Assign(lhs, rhs) => {
                // the left side is a write, not a read
                let after = self.analyze_expr(rhs, initialized);
                let ExprKind::Ident(_, entry) = &lhs.kind else {
                    unreachable!("assignment target is always an identifier")
                };

                match entry {
                    Some(id) => after.add(*id),
                    None => unreachable!("identifier not bound by scope analysis"),
                }
            }
        }
    }
}

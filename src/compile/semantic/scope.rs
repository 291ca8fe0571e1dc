use crate::compile::ast::{EntryId, Expr, ExprKind, Program, Stmt};
use crate::compile::semantic::symbols::SymbolTable;
use crate::compile::semantic::{Reporter, SemanticError};
use crate::datstructures::scope_stack::ScopeStack;

/// Binds every identifier in the tree to a symbol arena entry. Blocks push
/// and pop environment frames; declarations extend the innermost frame;
/// expressions never extend the environment. An unresolvable or conflicting
/// name gets a synthetic recovery entry so the later passes can proceed.
pub struct ScopeAnalysis<'a> {
    symbols: &'a mut SymbolTable,
    reporter: &'a mut Reporter,
    scopes: ScopeStack<String, EntryId>,
}

impl<'a> ScopeAnalysis<'a> {
    pub fn analyze(program: &mut Program, symbols: &'a mut SymbolTable, reporter: &'a mut Reporter) {
        let mut analysis = ScopeAnalysis {
            symbols,
            reporter,
            scopes: ScopeStack::new(),
        };

        for stmt in program.body.iter_mut() {
            analysis.analyze_stmt(stmt);
        }
    }

    fn analyze_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Decl {
                ty,
                name,
                init,
                entry,
                span,
            } => {
                // the initializer is evaluated before the name is in scope
                if let Some(init) = init {
                    self.analyze_expr(init);
                }

                if self.scopes.declared_here(name) {
                    self.reporter
                        .report(span.clone(), SemanticError::VariableRedeclared(name.clone()));
                    *entry = Some(self.symbols.declare_synthetic(name));
                    return;
                }

                let id = self.symbols.declare(name, *ty);
                self.scopes.insert(name.clone(), id);
                *entry = Some(id);
            }
            Stmt::If(test, if_true, if_false) => {
                self.analyze_expr(test);
                self.analyze_stmt(if_true);
                if let Some(if_false) = if_false {
                    self.analyze_stmt(if_false);
                }
            }
            Stmt::While(test, body) => {
                self.analyze_expr(test);
                self.analyze_stmt(body);
            }
            Stmt::Print(exp, _) => self.analyze_expr(exp),
            Stmt::Expr(exp) => self.analyze_expr(exp),
            Stmt::Block(stmts) => {
                self.scopes.push();
                for stmt in stmts.iter_mut() {
                    self.analyze_stmt(stmt);
                }
                self.scopes.pop();
            }
        }
    }

    fn analyze_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Int(_) | ExprKind::Bool(_) => {}
            ExprKind::Ident(name, entry) => match self.scopes.lookup(name) {
                Some(id) => *entry = Some(*id),
                None => {
                    self.reporter.report(
                        expr.span.clone(),
                        SemanticError::VariableUndeclared(name.clone()),
                    );
                    *entry = Some(self.symbols.declare_synthetic(name));
                }
            },
            ExprKind::Unary(_, rhs) => self.analyze_expr(rhs),
            ExprKind::Binary(_, lhs, rhs) => {
                self.analyze_expr(lhs);
                self.analyze_expr(rhs);
            }
            ExprKind::Assign(lhs, rhs) => {
                self.analyze_expr(lhs);
                self.analyze_expr(rhs);
            }
        }
    }
}

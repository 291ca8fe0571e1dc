use crate::compile::asm::x86::output::{byte_reg, emit, reg, Ia32Output, NUM_REGS, WORDSIZE};
use crate::compile::asm::x86::CodeGenError;
use crate::compile::ast::{BinaryOp, EntryId, Expr, ExprKind, Stmt, UnaryOp};
use crate::compile::semantic::symbols::SymbolTable;

/// Depth value marking expressions whose evaluation has side effects or
/// short circuits; their operand order must be preserved.
pub const DEEP: usize = 1000;

/// Sethi-Ullman register-need estimate for an expression. Literals compile
/// to immediates, variables need the target register, and a binary node
/// whose operands need the same amount needs one more. The estimate only
/// steers evaluation order; running out of registers is handled by
/// spilling at compile time.
pub fn depth(expr: &Expr) -> usize {
    match &expr.kind {
        ExprKind::Int(_) | ExprKind::Bool(_) => 0,
        ExprKind::Ident(..) => 1,
        ExprKind::Unary(_, rhs) => depth(rhs).max(1),
        ExprKind::Assign(..) => DEEP,
        ExprKind::Binary(BinaryOp::LogicalAnd | BinaryOp::LogicalOr, ..) => DEEP,
        ExprKind::Binary(_, lhs, rhs) => {
            let dl = depth(lhs);
            let dr = depth(rhs);

            if dl >= DEEP || dr >= DEEP {
                return DEEP;
            }
            if matches!(rhs.kind, ExprKind::Int(_)) {
                return dl.max(1);
            }
            if dl == dr {
                dl + 1
            } else {
                dl.max(dr).max(1)
            }
        }
    }
}

fn commutes(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Add
            | BinaryOp::Mul
            | BinaryOp::BitwiseAnd
            | BinaryOp::BitwiseOr
            | BinaryOp::BitwiseXor
    )
}

fn is_compare(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq
            | BinaryOp::Eq
            | BinaryOp::NotEq
    )
}

fn arith_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "addl",
        BinaryOp::Sub => "subl",
        BinaryOp::Mul => "imull",
        BinaryOp::BitwiseAnd => "andl",
        BinaryOp::BitwiseOr => "orl",
        BinaryOp::BitwiseXor => "xorl",
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn set_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Less => "setl",
        BinaryOp::LessEq => "setle",
        BinaryOp::Greater => "setg",
        BinaryOp::GreaterEq => "setge",
        BinaryOp::Eq => "sete",
        BinaryOp::NotEq => "setne",
        _ => unreachable!("not a comparison operator"),
    }
}

fn jump_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Less => "jl",
        BinaryOp::LessEq => "jle",
        BinaryOp::Greater => "jg",
        BinaryOp::GreaterEq => "jge",
        BinaryOp::Eq => "je",
        BinaryOp::NotEq => "jne",
        _ => unreachable!("not a comparison operator"),
    }
}

fn negate(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Less => BinaryOp::GreaterEq,
        BinaryOp::LessEq => BinaryOp::Greater,
        BinaryOp::Greater => BinaryOp::LessEq,
        BinaryOp::GreaterEq => BinaryOp::Less,
        BinaryOp::Eq => BinaryOp::NotEq,
        BinaryOp::NotEq => BinaryOp::Eq,
        _ => unreachable!("not a comparison operator"),
    }
}

/// Walks a checked, simplified tree and emits IA-32 assembly. Locals live
/// at negative `%ebp` offsets; `frame_top` tracks how many bytes of them
/// are in scope so blocks can reuse the slots of their silblings.
pub struct CodeGen<'a> {
    symbols: &'a mut SymbolTable,
    out: Ia32Output,
    frame_top: i32,
}

impl<'a> CodeGen<'a> {
    pub fn new(symbols: &'a mut SymbolTable) -> CodeGen<'a> {
        CodeGen {
            symbols,
            out: Ia32Output::new(),
            frame_top: 0,
        }
    }

    pub fn prologue(&mut self, frame: i32) -> Result<(), CodeGenError> {
        self.out.emit_op(".text")?;
        self.out.emit(".globl", format_args!("main"))?;
        self.out.emit_label("main")?;
        emit!(self.out, "pushl", "%ebp")?;
        emit!(self.out, "movl", "%esp, %ebp")?;
        self.out.insert_adjust(frame)?;

        Ok(())
    }

    pub fn epilogue(&mut self) -> Result<(), CodeGenError> {
        emit!(self.out, "xorl", "%eax, %eax")?;
        emit!(self.out, "leave")?;
        emit!(self.out, "ret")?;

        Ok(())
    }

    pub fn finish(self) -> String {
        self.out.finish()
    }

    pub fn compile_stmt(&mut self, stmt: &Stmt, pushed: i32) -> Result<(), CodeGenError> {
        match stmt {
            Stmt::Decl {
                name, init, entry, ..
            } => {
                let id = self.resolved(entry, name)?;
                self.frame_top += WORDSIZE;
                let slot = -self.frame_top;
                self.symbols.entry_mut(id).slot = Some(slot);

                if let Some(init) = init {
                    self.compile_expr(init, pushed, 0)?;
                    emit!(self.out, "movl", "{}, {slot}(%ebp)", reg(0))?;
                }

                Ok(())
            }
            Stmt::If(test, if_true, if_false) => {
                let lab1 = self.out.new_label();
                let lab2 = self.out.new_label();

                self.branch_false(test, pushed, 0, &lab1)?;
                self.compile_stmt(if_true, pushed)?;
                emit!(self.out, "jmp", "{lab2}")?;
                self.out.emit_label(&lab1)?;
                if let Some(if_false) = if_false {
                    self.compile_stmt(if_false, pushed)?;
                }
                self.out.emit_label(&lab2)?;

                Ok(())
            }
            Stmt::While(test, body) => {
                let top = self.out.new_label();
                let test_label = self.out.new_label();

                emit!(self.out, "jmp", "{test_label}")?;
                self.out.emit_label(&top)?;
                self.compile_stmt(body, pushed)?;
                self.out.emit_label(&test_label)?;
                self.branch_true(test, pushed, 0, &top)?;

                Ok(())
            }
            Stmt::Print(exp, _) => {
                // pad so the stack is 16-byte aligned once the single
                // argument word has been pushed
                let adjust = self.out.alignment_adjust(pushed + WORDSIZE);

                self.out.insert_adjust(adjust)?;
                self.compile_expr(exp, pushed + adjust, 0)?;
                emit!(self.out, "pushl", "{}", reg(0))?;
                self.out.call("print", 0)?;
                self.out.remove_adjust(adjust + WORDSIZE)?;

                Ok(())
            }
            Stmt::Expr(exp) => self.compile_expr(exp, pushed, 0),
            Stmt::Block(stmts) => {
                let saved = self.frame_top;
                for stmt in stmts.iter() {
                    self.compile_stmt(stmt, pushed)?;
                }
                self.frame_top = saved;

                Ok(())
            }
        }
    }

    /// Evaluates `expr` into register `free`, preserving every register
    /// below `free`. `pushed` counts the bytes currently on the stack
    /// below the frame, which the call sites need for alignment.
    pub fn compile_expr(&mut self, expr: &Expr, pushed: i32, free: usize) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::Int(n) => {
                emit!(self.out, "movl", "${n}, {}", reg(free))?;
            }
            ExprKind::Bool(b) => {
                emit!(self.out, "movl", "${}, {}", *b as i32, reg(free))?;
            }
            ExprKind::Ident(name, entry) => {
                let id = self.resolved(entry, name)?;
                let slot = self.slot(id)?;
                emit!(self.out, "movl", "{slot}(%ebp), {}", reg(free))?;
            }
            ExprKind::Assign(lhs, rhs) => {
                self.compile_expr(rhs, pushed, free)?;

                let ExprKind::Ident(name, entry) = &lhs.kind else {
                    return Err(CodeGenError::Internal(
                        "assignment to a non-identifier".to_string(),
                    ));
                };
                let id = self.resolved(entry, name)?;
                let slot = self.slot(id)?;
                emit!(self.out, "movl", "{}, {slot}(%ebp)", reg(free))?;
            }
            ExprKind::Unary(op, rhs) => {
                self.compile_expr(rhs, pushed, free)?;
                match op {
                    UnaryOp::Neg => emit!(self.out, "negl", "{}", reg(free))?,
                    UnaryOp::BitwiseNot => emit!(self.out, "notl", "{}", reg(free))?,
                    UnaryOp::LogicalNot => emit!(self.out, "xorl", "$1, {}", reg(free))?,
                }
            }
            ExprKind::Binary(op, lhs, rhs) => match op {
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                    self.compile_logic(*op, lhs, rhs, pushed, free)?
                }
                op if is_compare(*op) => self.compile_compare(*op, lhs, rhs, pushed, free)?,
                op => self.compile_arith(*op, lhs, rhs, pushed, free)?,
            },
        }

        Ok(())
    }

    fn compile_arith(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        pushed: i32,
        free: usize,
    ) -> Result<(), CodeGenError> {
        let mnemonic = arith_mnemonic(op);

        // a literal right operand becomes an immediate
        if let ExprKind::Int(n) = rhs.kind {
            self.compile_expr(lhs, pushed, free)?;
            if op == BinaryOp::Mul {
                let r = reg(free);
                emit!(self.out, "imull", "${n}, {r}, {r}")?;
            } else {
                emit!(self.out, mnemonic, "${n}, {}", reg(free))?;
            }

            return Ok(());
        }

        // evaluate the deeper side first while more registers are free
        let (first, second) = if commutes(op) && wants_swap(lhs, rhs) {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };

        self.compile_expr(first, pushed, free)?;

        if free + 1 < NUM_REGS {
            self.compile_expr(second, pushed, free + 1)?;
            emit!(self.out, mnemonic, "{}, {}", reg(free + 1), reg(free))?;

            return Ok(());
        }

        // no register left for the second operand: spill the finished one
        // and combine against the stack
        emit!(self.out, "pushl", "{}", reg(free))?;
        self.compile_expr(second, pushed + WORDSIZE, free)?;

        if commutes(op) {
            emit!(self.out, mnemonic, "(%esp), {}", reg(free))?;
            self.out.remove_adjust(WORDSIZE)?;
        } else {
            // subtraction: the left operand is the spilled one
            emit!(self.out, mnemonic, "{}, (%esp)", reg(free))?;
            emit!(self.out, "popl", "{}", reg(free))?;
        }

        Ok(())
    }

    fn compile_compare(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        pushed: i32,
        free: usize,
    ) -> Result<(), CodeGenError> {
        if let ExprKind::Int(n) = rhs.kind {
            self.compile_expr(lhs, pushed, free)?;
            emit!(self.out, "cmpl", "${n}, {}", reg(free))?;
        } else if free + 1 < NUM_REGS {
            self.compile_expr(lhs, pushed, free)?;
            self.compile_expr(rhs, pushed, free + 1)?;
            emit!(self.out, "cmpl", "{}, {}", reg(free + 1), reg(free))?;
        } else {
            self.compile_expr(lhs, pushed, free)?;
            emit!(self.out, "pushl", "{}", reg(free))?;
            self.compile_expr(rhs, pushed + WORDSIZE, free)?;
            // flags are set before the stack is cleaned up again
            emit!(self.out, "cmpl", "{}, (%esp)", reg(free))?;
            emit!(self.out, set_mnemonic(op), "{}", byte_reg(free))?;
            emit!(self.out, "movzbl", "{}, {}", byte_reg(free), reg(free))?;
            self.out.remove_adjust(WORDSIZE)?;

            return Ok(());
        }

        emit!(self.out, set_mnemonic(op), "{}", byte_reg(free))?;
        emit!(self.out, "movzbl", "{}, {}", byte_reg(free), reg(free))?;

        Ok(())
    }

    /// Materializes a short-circuit operator as 0 or 1 via its branch form.
    fn compile_logic(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        pushed: i32,
        free: usize,
    ) -> Result<(), CodeGenError> {
        let short = self.out.new_label();
        let end = self.out.new_label();

        match op {
            BinaryOp::LogicalAnd => {
                self.branch_false(lhs, pushed, free, &short)?;
                self.branch_false(rhs, pushed, free, &short)?;
                emit!(self.out, "movl", "$1, {}", reg(free))?;
                emit!(self.out, "jmp", "{end}")?;
                self.out.emit_label(&short)?;
                emit!(self.out, "movl", "$0, {}", reg(free))?;
            }
            BinaryOp::LogicalOr => {
                self.branch_true(lhs, pushed, free, &short)?;
                self.branch_true(rhs, pushed, free, &short)?;
                emit!(self.out, "movl", "$0, {}", reg(free))?;
                emit!(self.out, "jmp", "{end}")?;
                self.out.emit_label(&short)?;
                emit!(self.out, "movl", "$1, {}", reg(free))?;
            }
            _ => unreachable!("not a short-circuit operator"),
        }
        self.out.emit_label(&end)?;

        Ok(())
    }

    /// Evaluates a boolean expression and jumps to `label` if it is true.
    /// Comparisons emit their `cmp`/`jcc` pair directly; the logical
    /// operators short circuit; everything else is evaluated into a
    /// register and tested against zero.
    pub fn branch_true(
        &mut self,
        expr: &Expr,
        pushed: i32,
        free: usize,
        label: &str,
    ) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::Binary(op, lhs, rhs) if is_compare(*op) => {
                self.branch_compare(*op, lhs, rhs, pushed, free, label, true)
            }
            ExprKind::Binary(BinaryOp::LogicalAnd, lhs, rhs) => {
                let fall = self.out.new_label();
                self.branch_false(lhs, pushed, free, &fall)?;
                self.branch_true(rhs, pushed, free, label)?;
                self.out.emit_label(&fall)?;

                Ok(())
            }
            ExprKind::Binary(BinaryOp::LogicalOr, lhs, rhs) => {
                self.branch_true(lhs, pushed, free, label)?;
                self.branch_true(rhs, pushed, free, label)
            }
            ExprKind::Unary(UnaryOp::LogicalNot, rhs) => {
                self.branch_false(rhs, pushed, free, label)
            }
            _ => {
                self.compile_expr(expr, pushed, free)?;
                emit!(self.out, "orl", "{}, {}", reg(free), reg(free))?;
                emit!(self.out, "jnz", "{label}")?;

                Ok(())
            }
        }
    }

    /// Evaluates a boolean expression and jumps to `label` if it is false.
    pub fn branch_false(
        &mut self,
        expr: &Expr,
        pushed: i32,
        free: usize,
        label: &str,
    ) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::Binary(op, lhs, rhs) if is_compare(*op) => {
                self.branch_compare(*op, lhs, rhs, pushed, free, label, false)
            }
            ExprKind::Binary(BinaryOp::LogicalAnd, lhs, rhs) => {
                self.branch_false(lhs, pushed, free, label)?;
                self.branch_false(rhs, pushed, free, label)
            }
            ExprKind::Binary(BinaryOp::LogicalOr, lhs, rhs) => {
                let fall = self.out.new_label();
                self.branch_true(lhs, pushed, free, &fall)?;
                self.branch_false(rhs, pushed, free, label)?;
                self.out.emit_label(&fall)?;

                Ok(())
            }
            ExprKind::Unary(UnaryOp::LogicalNot, rhs) => self.branch_true(rhs, pushed, free, label),
            _ => {
                self.compile_expr(expr, pushed, free)?;
                emit!(self.out, "orl", "{}, {}", reg(free), reg(free))?;
                emit!(self.out, "jz", "{label}")?;

                Ok(())
            }
        }
    }

    fn branch_compare(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        pushed: i32,
        free: usize,
        label: &str,
        sense: bool,
    ) -> Result<(), CodeGenError> {
        if free + 1 >= NUM_REGS && !matches!(rhs.kind, ExprKind::Int(_)) {
            // not enough registers for the cmp pair; fall back to the
            // value form and test that
            self.compile_compare(op, lhs, rhs, pushed, free)?;
            emit!(self.out, "orl", "{}, {}", reg(free), reg(free))?;
            emit!(self.out, if sense { "jnz" } else { "jz" }, "{label}")?;

            return Ok(());
        }

        if let ExprKind::Int(n) = rhs.kind {
            self.compile_expr(lhs, pushed, free)?;
            emit!(self.out, "cmpl", "${n}, {}", reg(free))?;
        } else {
            self.compile_expr(lhs, pushed, free)?;
            self.compile_expr(rhs, pushed, free + 1)?;
            emit!(self.out, "cmpl", "{}, {}", reg(free + 1), reg(free))?;
        }

        let jump = if sense {
            jump_mnemonic(op)
        } else {
            jump_mnemonic(negate(op))
        };
        emit!(self.out, jump, "{label}")?;

        Ok(())
    }

    fn resolved(&self, entry: &Option<EntryId>, name: &str) -> Result<EntryId, CodeGenError> {
        entry.ok_or_else(|| {
            CodeGenError::Internal(format!("identifier {name} was never resolved"))
        })
    }

    fn slot(&self, id: EntryId) -> Result<i32, CodeGenError> {
        self.symbols.entry(id).slot.ok_or_else(|| {
            CodeGenError::Internal(format!(
                "variable {} has no frame slot",
                self.symbols.entry(id).name
            ))
        })
    }
}

fn wants_swap(lhs: &Expr, rhs: &Expr) -> bool {
    let dl = depth(lhs);
    let dr = depth(rhs);

    dr > dl && dr < DEEP && dl < DEEP
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(name.to_string(), None), 0..0)
    }

    fn lit(n: i32) -> Expr {
        Expr::new(ExprKind::Int(n), 0..0)
    }

    fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Binary(op, lhs.boxed(), rhs.boxed()), 0..0)
    }

    #[test]
    fn literals_are_free_and_variables_need_a_register() {
        assert_eq!(0, depth(&lit(3)));
        assert_eq!(1, depth(&var("x")));
    }

    #[test]
    fn literal_right_operands_do_not_add_pressure() {
        assert_eq!(1, depth(&bin(BinaryOp::Add, var("x"), lit(1))));
    }

    #[test]
    fn equally_deep_operands_need_one_more_register() {
        let balanced = bin(
            BinaryOp::Add,
            bin(BinaryOp::Add, var("a"), var("b")),
            bin(BinaryOp::Add, var("c"), var("d")),
        );

        assert_eq!(2, depth(&bin(BinaryOp::Add, var("a"), var("b"))));
        assert_eq!(3, depth(&balanced));
    }

    #[test]
    fn depth_is_monotonic_over_children() {
        let exprs = [
            bin(BinaryOp::Sub, var("a"), bin(BinaryOp::Mul, var("b"), var("c"))),
            bin(BinaryOp::BitwiseAnd, lit(7), var("a")),
            bin(
                BinaryOp::Add,
                bin(BinaryOp::Add, var("a"), lit(2)),
                bin(BinaryOp::Sub, var("b"), var("c")),
            ),
        ];

        for e in exprs.iter() {
            let ExprKind::Binary(_, lhs, rhs) = &e.kind else {
                unreachable!()
            };
            assert!(depth(e) >= depth(lhs));
            assert!(depth(e) >= depth(rhs));
        }
    }

    #[test]
    fn side_effects_and_short_circuits_are_deep() {
        let assign = Expr::new(
            ExprKind::Assign(var("x").boxed(), lit(1).boxed()),
            0..0,
        );

        assert_eq!(DEEP, depth(&assign));
        assert_eq!(
            DEEP,
            depth(&bin(BinaryOp::LogicalAnd, var("a"), var("b")))
        );
        // a side-effecting operand keeps the whole node deep
        assert_eq!(DEEP, depth(&bin(BinaryOp::Add, assign, var("y"))));
    }
}

use crate::compile::ast::{BinaryOp, Expr, ExprKind, SourcePos, Type, UnaryOp};

/// Simplifies an expression bottom-up: children first, then the local
/// rewrite rules. All integer folding is two's-complement wrapping, so the
/// rewritten tree computes the same 32-bit values as the original.
pub fn expr(e: Expr) -> Expr {
    let Expr { kind, span, ty } = e;

    match kind {
        ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Ident(..) => Expr { kind, span, ty },
        ExprKind::Unary(op, rhs) => unary(op, expr(*rhs), span, ty),
        ExprKind::Binary(op, lhs, rhs) => binary(op, expr(*lhs), expr(*rhs), span, ty),
        ExprKind::Assign(lhs, rhs) => {
            let rhs = expr(*rhs);
            Expr {
                kind: ExprKind::Assign(lhs, rhs.boxed()),
                span,
                ty,
            }
        }
    }
}

fn unary(op: UnaryOp, rhs: Expr, span: SourcePos, ty: Option<Type>) -> Expr {
    let Expr {
        kind: rhs_kind,
        span: rhs_span,
        ty: rhs_ty,
    } = rhs;

    match (op, rhs_kind) {
        (UnaryOp::Neg, ExprKind::Int(n)) => int(n.wrapping_neg(), span),
        (UnaryOp::BitwiseNot, ExprKind::Int(n)) => int(!n, span),
        (UnaryOp::LogicalNot, ExprKind::Bool(b)) => boolean(!b, span),
        // - - x  ==>  x, and ~ ~ x  ==>  x
        (UnaryOp::Neg, ExprKind::Unary(UnaryOp::Neg, inner))
        | (UnaryOp::BitwiseNot, ExprKind::Unary(UnaryOp::BitwiseNot, inner)) => *inner,
        (op, rhs_kind) => Expr {
            kind: ExprKind::Unary(
                op,
                Expr {
                    kind: rhs_kind,
                    span: rhs_span,
                    ty: rhs_ty,
                }
                .boxed(),
            ),
            span,
            ty,
        },
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, span: SourcePos, ty: Option<Type>) -> Expr {
    match op {
        BinaryOp::Add
        | BinaryOp::Mul
        | BinaryOp::BitwiseAnd
        | BinaryOp::BitwiseOr
        | BinaryOp::BitwiseXor => {
            // known constants migrate to the right
            let (lhs, rhs) = if lhs.as_int().is_some() && rhs.as_int().is_none() {
                (rhs, lhs)
            } else {
                (lhs, rhs)
            };

            match (lhs.as_int(), rhs.as_int()) {
                (Some(n), Some(m)) => int(fold(op, n, m), span),
                (_, Some(m)) => dispatch(op, lhs, m, span),
                _ => rebuild(op, lhs, rhs, span, ty),
            }
        }
        BinaryOp::Sub => match (lhs.as_int(), rhs.as_int()) {
            (Some(n), Some(m)) => int(n.wrapping_sub(m), span),
            _ => rebuild(op, lhs, rhs, span, ty),
        },
        BinaryOp::Less
        | BinaryOp::LessEq
        | BinaryOp::Greater
        | BinaryOp::GreaterEq
        | BinaryOp::Eq
        | BinaryOp::NotEq => compare(op, lhs, rhs, span, ty),
        BinaryOp::LogicalAnd => logical_and(lhs, rhs, span, ty),
        BinaryOp::LogicalOr => logical_or(lhs, rhs, span, ty),
    }
}

fn fold(op: BinaryOp, n: i32, m: i32) -> i32 {
    match op {
        BinaryOp::Add => n.wrapping_add(m),
        BinaryOp::Mul => n.wrapping_mul(m),
        BinaryOp::BitwiseAnd => n & m,
        BinaryOp::BitwiseOr => n | m,
        BinaryOp::BitwiseXor => n ^ m,
        _ => unreachable!("not a foldable integer operator"),
    }
}

/// The right operand folded to a known integer; pick the rewrite for this
/// operator based on the shape of the simplified left operand.
fn dispatch(op: BinaryOp, lhs: Expr, m: i32, span: SourcePos) -> Expr {
    match op {
        BinaryOp::Add => simp_add(lhs, m, span),
        BinaryOp::Mul => simp_mul(lhs, m, span),
        BinaryOp::BitwiseAnd => simp_band(lhs, m, span),
        BinaryOp::BitwiseOr => simp_bor(lhs, m, span),
        BinaryOp::BitwiseXor => simp_bxor(lhs, m, span),
        _ => unreachable!("not a foldable integer operator"),
    }
}

/// Splits `x op n` with a literal right operand into `(x, n)`; hands the
/// expression back unchanged otherwise.
fn split_literal_right(op: BinaryOp, e: Expr) -> Result<(Expr, i32), Expr> {
    let Expr { kind, span, ty } = e;

    match kind {
        ExprKind::Binary(inner, x, n) if inner == op => match n.as_int() {
            Some(m) => Ok((*x, m)),
            None => Err(Expr {
                kind: ExprKind::Binary(inner, x, n),
                span,
                ty,
            }),
        },
        kind => Err(Expr { kind, span, ty }),
    }
}

// (x + n) + m  ==>  x + (n+m)
fn simp_add(lhs: Expr, m: i32, span: SourcePos) -> Expr {
    match split_literal_right(BinaryOp::Add, lhs) {
        Ok((x, n)) => new_add(x, n.wrapping_add(m), span),
        Err(lhs) => new_add(lhs, m, span),
    }
}

// (x * n) * m  ==>  x * (n*m)
fn simp_mul(lhs: Expr, m: i32, span: SourcePos) -> Expr {
    match split_literal_right(BinaryOp::Mul, lhs) {
        Ok((x, n)) => new_mul(x, n.wrapping_mul(m), span),
        Err(lhs) => new_mul(lhs, m, span),
    }
}

// (x & n) & m  ==>  x & (n&m)
fn simp_band(lhs: Expr, m: i32, span: SourcePos) -> Expr {
    match split_literal_right(BinaryOp::BitwiseAnd, lhs) {
        Ok((x, n)) => new_band(x, n & m, span),
        Err(lhs) => new_band(lhs, m, span),
    }
}

// (x | n) | m  ==>  x | (n|m)
fn simp_bor(lhs: Expr, m: i32, span: SourcePos) -> Expr {
    match split_literal_right(BinaryOp::BitwiseOr, lhs) {
        Ok((x, n)) => new_bor(x, n | m, span),
        Err(lhs) => new_bor(lhs, m, span),
    }
}

// (x ^ n) ^ m  ==>  x ^ (n^m)
fn simp_bxor(lhs: Expr, m: i32, span: SourcePos) -> Expr {
    match split_literal_right(BinaryOp::BitwiseXor, lhs) {
        Ok((x, n)) => new_bxor(x, n ^ m, span),
        Err(lhs) => new_bxor(lhs, m, span),
    }
}

// x + 0  ==>  x
fn new_add(x: Expr, n: i32, span: SourcePos) -> Expr {
    if n == 0 {
        return x;
    }

    build(BinaryOp::Add, x, n, span)
}

// x * 1  ==>  x,  x * 0  ==>  0
fn new_mul(x: Expr, n: i32, span: SourcePos) -> Expr {
    match n {
        1 => x,
        0 => int(0, span),
        n => build(BinaryOp::Mul, x, n, span),
    }
}

// x & -1  ==>  x,  x & 0  ==>  0
fn new_band(x: Expr, n: i32, span: SourcePos) -> Expr {
    match n {
        -1 => x,
        0 => int(0, span),
        n => build(BinaryOp::BitwiseAnd, x, n, span),
    }
}

// x | -1  ==>  -1,  x | 0  ==>  x
fn new_bor(x: Expr, n: i32, span: SourcePos) -> Expr {
    match n {
        -1 => int(-1, span),
        0 => x,
        n => build(BinaryOp::BitwiseOr, x, n, span),
    }
}

// x ^ -1  ==>  ~x,  x ^ 0  ==>  x
fn new_bxor(x: Expr, n: i32, span: SourcePos) -> Expr {
    match n {
        -1 => complement(x, span),
        0 => x,
        n => build(BinaryOp::BitwiseXor, x, n, span),
    }
}

// ~ ~ x  ==>  x, otherwise wrap in a complement
fn complement(x: Expr, span: SourcePos) -> Expr {
    let Expr {
        kind,
        span: x_span,
        ty: x_ty,
    } = x;

    match kind {
        ExprKind::Unary(UnaryOp::BitwiseNot, inner) => *inner,
        kind => Expr {
            kind: ExprKind::Unary(
                UnaryOp::BitwiseNot,
                Expr {
                    kind,
                    span: x_span,
                    ty: x_ty,
                }
                .boxed(),
            ),
            span,
            ty: Some(Type::Int),
        },
    }
}

fn compare(op: BinaryOp, lhs: Expr, rhs: Expr, span: SourcePos, ty: Option<Type>) -> Expr {
    if let (Some(n), Some(m)) = (lhs.as_int(), rhs.as_int()) {
        let value = match op {
            BinaryOp::Less => n < m,
            BinaryOp::LessEq => n <= m,
            BinaryOp::Greater => n > m,
            BinaryOp::GreaterEq => n >= m,
            BinaryOp::Eq => n == m,
            BinaryOp::NotEq => n != m,
            _ => unreachable!("not a comparison operator"),
        };

        return boolean(value, span);
    }

    if let (ExprKind::Bool(a), ExprKind::Bool(b)) = (&lhs.kind, &rhs.kind) {
        match op {
            BinaryOp::Eq => return boolean(a == b, span),
            BinaryOp::NotEq => return boolean(a != b, span),
            _ => {}
        }
    }

    rebuild(op, lhs, rhs, span, ty)
}

fn logical_and(lhs: Expr, rhs: Expr, span: SourcePos, ty: Option<Type>) -> Expr {
    match (&lhs.kind, &rhs.kind) {
        (ExprKind::Bool(true), _) => rhs,
        (ExprKind::Bool(false), _) => boolean(false, span),
        // dropping the left side would lose its evaluation, so only the
        // neutral right operand goes away
        (_, ExprKind::Bool(true)) => lhs,
        _ => rebuild(BinaryOp::LogicalAnd, lhs, rhs, span, ty),
    }
}

fn logical_or(lhs: Expr, rhs: Expr, span: SourcePos, ty: Option<Type>) -> Expr {
    match (&lhs.kind, &rhs.kind) {
        (ExprKind::Bool(true), _) => boolean(true, span),
        (ExprKind::Bool(false), _) => rhs,
        (_, ExprKind::Bool(false)) => lhs,
        _ => rebuild(BinaryOp::LogicalOr, lhs, rhs, span, ty),
    }
}

fn rebuild(op: BinaryOp, lhs: Expr, rhs: Expr, span: SourcePos, ty: Option<Type>) -> Expr {
    Expr {
        kind: ExprKind::Binary(op, lhs.boxed(), rhs.boxed()),
        span,
        ty,
    }
}

fn build(op: BinaryOp, x: Expr, n: i32, span: SourcePos) -> Expr {
    let lit = int(n, span.clone());

    Expr {
        kind: ExprKind::Binary(op, x.boxed(), lit.boxed()),
        span,
        ty: Some(Type::Int),
    }
}

fn int(n: i32, span: SourcePos) -> Expr {
    Expr {
        kind: ExprKind::Int(n),
        span,
        ty: Some(Type::Int),
    }
}

fn boolean(b: bool, span: SourcePos) -> Expr {
    Expr {
        kind: ExprKind::Bool(b),
        span,
        ty: Some(Type::Bool),
    }
}

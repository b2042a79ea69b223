//! Ergonomic expression construction.
//!
//! [`Express`] pairs an expression handle with its owning context so that
//! plain Rust operators build the AST: `2.0 * x + y - 1.0` works directly.
//! Comparison methods produce a [`Cmp`], which [`constraint`] turns into a
//! labeled constraint node. [`Array`] views a block of handle-contiguous
//! variables as an n-dimensional, row-major indexed collection.

use std::fmt;
use std::ops;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::reference::Expr;
use crate::types::CmpOp;

/// A copyable handle to an expression in a context.
#[derive(Copy, Clone)]
pub struct Express<'a> {
    ctx: &'a Context,
    expr: Expr,
}

impl<'a> Express<'a> {
    pub fn new(ctx: &'a Context, expr: Expr) -> Self {
        Self { ctx, expr }
    }

    pub fn handle(self) -> Expr {
        self.expr
    }

    pub fn context(self) -> &'a Context {
        self.ctx
    }

    /// `self` raised to a positive integer power, by repeated
    /// multiplication.
    pub fn pow(self, n: u32) -> Result<Self> {
        if n == 0 {
            return Err(Error::ZeroExponent);
        }
        let mut acc = self.expr;
        for _ in 1..n {
            acc = self.ctx.mul(acc, self.expr);
        }
        Ok(Self::new(self.ctx, acc))
    }

    /// Division by a non-zero constant.
    pub fn div(self, rhs: f64) -> Result<Self> {
        if rhs == 0.0 {
            return Err(Error::DivisionByZero);
        }
        let scale = self.ctx.constant(1.0 / rhs);
        Ok(Self::new(self.ctx, self.ctx.mul(self.expr, scale)))
    }

    pub fn eq(self, rhs: f64) -> Cmp<'a> {
        self.cmp(CmpOp::Eq, rhs)
    }

    pub fn ne(self, rhs: f64) -> Cmp<'a> {
        self.cmp(CmpOp::Ne, rhs)
    }

    pub fn gt(self, rhs: f64) -> Cmp<'a> {
        self.cmp(CmpOp::Gt, rhs)
    }

    pub fn ge(self, rhs: f64) -> Cmp<'a> {
        self.cmp(CmpOp::Ge, rhs)
    }

    pub fn lt(self, rhs: f64) -> Cmp<'a> {
        self.cmp(CmpOp::Lt, rhs)
    }

    pub fn le(self, rhs: f64) -> Cmp<'a> {
        self.cmp(CmpOp::Le, rhs)
    }

    fn cmp(self, op: CmpOp, rhs: f64) -> Cmp<'a> {
        Cmp {
            ctx: self.ctx,
            expr: self.expr,
            op,
            rhs,
        }
    }
}

impl fmt::Debug for Express<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Express({} = {})", self.expr, self)
    }
}

impl fmt::Display for Express<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ctx.display_expr(self.expr))
    }
}

impl<'a> ops::Add for Express<'a> {
    type Output = Express<'a>;

    fn add(self, rhs: Self) -> Self::Output {
        Express::new(self.ctx, self.ctx.add(self.expr, rhs.expr))
    }
}

impl<'a> ops::Add<f64> for Express<'a> {
    type Output = Express<'a>;

    fn add(self, rhs: f64) -> Self::Output {
        let rhs = self.ctx.constant(rhs);
        Express::new(self.ctx, self.ctx.add(self.expr, rhs))
    }
}

impl<'a> ops::Add<Express<'a>> for f64 {
    type Output = Express<'a>;

    fn add(self, rhs: Express<'a>) -> Self::Output {
        let lhs = rhs.ctx.constant(self);
        Express::new(rhs.ctx, rhs.ctx.add(lhs, rhs.expr))
    }
}

impl<'a> ops::Sub for Express<'a> {
    type Output = Express<'a>;

    fn sub(self, rhs: Self) -> Self::Output {
        Express::new(self.ctx, self.ctx.sub(self.expr, rhs.expr))
    }
}

impl<'a> ops::Sub<f64> for Express<'a> {
    type Output = Express<'a>;

    fn sub(self, rhs: f64) -> Self::Output {
        let rhs = self.ctx.constant(rhs);
        Express::new(self.ctx, self.ctx.sub(self.expr, rhs))
    }
}

impl<'a> ops::Sub<Express<'a>> for f64 {
    type Output = Express<'a>;

    fn sub(self, rhs: Express<'a>) -> Self::Output {
        let lhs = rhs.ctx.constant(self);
        Express::new(rhs.ctx, rhs.ctx.sub(lhs, rhs.expr))
    }
}

impl<'a> ops::Mul for Express<'a> {
    type Output = Express<'a>;

    fn mul(self, rhs: Self) -> Self::Output {
        Express::new(self.ctx, self.ctx.mul(self.expr, rhs.expr))
    }
}

impl<'a> ops::Mul<f64> for Express<'a> {
    type Output = Express<'a>;

    fn mul(self, rhs: f64) -> Self::Output {
        let rhs = self.ctx.constant(rhs);
        Express::new(self.ctx, self.ctx.mul(self.expr, rhs))
    }
}

impl<'a> ops::Mul<Express<'a>> for f64 {
    type Output = Express<'a>;

    fn mul(self, rhs: Express<'a>) -> Self::Output {
        let lhs = rhs.ctx.constant(self);
        Express::new(rhs.ctx, rhs.ctx.mul(lhs, rhs.expr))
    }
}

impl<'a> ops::Neg for Express<'a> {
    type Output = Express<'a>;

    fn neg(self) -> Self::Output {
        Express::new(self.ctx, self.ctx.neg(self.expr))
    }
}

/// A pending comparison of an expression against a constant.
#[derive(Copy, Clone)]
pub struct Cmp<'a> {
    ctx: &'a Context,
    expr: Expr,
    op: CmpOp,
    rhs: f64,
}

/// Labels an expression as a named sub-objective.
pub fn subh<'a>(label: &str, expr: Express<'a>) -> Express<'a> {
    let ctx = expr.ctx;
    Express::new(ctx, ctx.subh(label, expr.expr))
}

/// Turns a comparison into a labeled constraint node.
pub fn constraint<'a>(label: &str, cmp: Cmp<'a>) -> Express<'a> {
    let cond = cmp.ctx.condition(cmp.op, cmp.rhs);
    Express::new(cmp.ctx, cmp.ctx.constraint(label, cmp.expr, cond))
}

/// An n-dimensional, row-major view over handle-contiguous variable
/// expressions.
#[derive(Debug)]
pub struct Array<'a> {
    ctx: &'a Context,
    base: Expr,
    shape: Vec<usize>,
}

impl<'a> Array<'a> {
    /// `base` must be the first of `shape.iter().product()` contiguous
    /// variable-expression handles.
    pub(crate) fn new(ctx: &'a Context, base: Expr, shape: Vec<usize>) -> Self {
        assert!(!shape.is_empty(), "array shape must have at least one axis");
        Self { ctx, base, shape }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at the given multi-index.
    ///
    /// # Panics
    ///
    /// Panics if the rank or any index is out of bounds.
    pub fn at(&self, indices: &[usize]) -> Express<'a> {
        assert_eq!(
            indices.len(),
            self.shape.len(),
            "rank mismatch: {} indices for shape {:?}",
            indices.len(),
            self.shape
        );
        let mut flat = 0;
        for (i, (&idx, &extent)) in indices.iter().zip(&self.shape).enumerate() {
            assert!(idx < extent, "index {} out of bounds on axis {}", idx, i);
            flat = flat * extent + idx;
        }
        self.flat(flat)
    }

    /// Element at a flat row-major offset.
    pub fn flat(&self, offset: usize) -> Express<'a> {
        assert!(offset < self.len(), "flat offset out of bounds");
        Express::new(self.ctx, Expr::from_index(self.base.index() + offset))
    }

    /// All elements in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Express<'a>> + '_ {
        (0..self.len()).map(|offset| self.flat(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExprData, Op};
    use crate::types::Vartype;
    use test_log::test;

    fn var<'a>(ctx: &'a Context, name: &str) -> Express<'a> {
        let v = ctx.create_var(name, Vartype::Binary).unwrap();
        Express::new(ctx, ctx.variable(v))
    }

    #[test]
    fn test_operator_chain() {
        let ctx = Context::new();
        let x = var(&ctx, "x");
        let y = var(&ctx, "y");

        let h = 2.0 * x + y - 1.0;
        assert_eq!(h.to_string(), "((2 * 'x') + 'y' + -1)");
    }

    #[test]
    fn test_pow() {
        let ctx = Context::new();
        let x = var(&ctx, "x");
        let y = var(&ctx, "y");

        let square = (x + y).pow(2).unwrap();
        match ctx.expr_data(square.handle()) {
            ExprData::List { op: Op::Mul, items } => assert_eq!(items.len(), 2),
            other => panic!("expected Mul list, got {:?}", other),
        }

        assert_eq!(x.pow(1).unwrap().handle(), x.handle());
        assert_eq!(x.pow(0).unwrap_err(), Error::ZeroExponent);
    }

    #[test]
    fn test_div() {
        let ctx = Context::new();
        let x = var(&ctx, "x");
        assert_eq!(x.div(2.0).unwrap().to_string(), "('x' * 0.5)");
        assert_eq!(x.div(0.0).unwrap_err(), Error::DivisionByZero);
    }

    #[test]
    fn test_constraint_from_comparison() {
        let ctx = Context::new();
        let x = var(&ctx, "x");
        let y = var(&ctx, "y");

        let c = constraint("one_hot", (x + y).eq(1.0));
        match ctx.expr_data(c.handle()) {
            ExprData::Constraint { label, cond, .. } => {
                assert_eq!(label, "one_hot");
                assert_eq!(ctx.condition_data(cond), (CmpOp::Eq, 1.0));
            }
            other => panic!("expected Constraint, got {:?}", other),
        }
    }

    #[test]
    fn test_subh_label() {
        let ctx = Context::new();
        let x = var(&ctx, "x");
        let h = subh("obj", x);
        assert_eq!(ctx.expr_name(h.handle()), Some("obj".to_string()));
    }

    #[test]
    fn test_array_indexing_is_row_major() {
        let ctx = Context::new();
        let exprs: Vec<Expr> = (0..6)
            .map(|i| {
                let v = ctx.create_var(&format!("x[{}][{}]", i / 3, i % 3), Vartype::Binary);
                ctx.variable(v.unwrap())
            })
            .collect();
        let arr = Array::new(&ctx, exprs[0], vec![2, 3]);

        assert_eq!(arr.len(), 6);
        assert_eq!(arr.at(&[0, 0]).handle(), exprs[0]);
        assert_eq!(arr.at(&[0, 2]).handle(), exprs[2]);
        assert_eq!(arr.at(&[1, 1]).handle(), exprs[4]);
        assert_eq!(arr.iter().count(), 6);
    }

    #[test]
    fn test_array_is_debug_printable() {
        let ctx = Context::new();
        let v = ctx.create_anon_var(Vartype::Binary);
        let arr = Array::new(&ctx, ctx.variable(v), vec![2]);
        let rendered = format!("{:?}", arr);
        assert!(rendered.contains("shape: [2]"), "got {}", rendered);
    }

    #[test]
    #[should_panic(expected = "rank mismatch")]
    fn test_array_rank_mismatch_panics() {
        let ctx = Context::new();
        let v = ctx.create_anon_var(Vartype::Binary);
        let arr = Array::new(&ctx, ctx.variable(v), vec![1]);
        arr.at(&[0, 0]);
    }
}

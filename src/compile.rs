//! Lowering expressions to polynomials, and the numeric passes that run
//! over the results afterwards.
//!
//! [`Compiler`] walks the expression DAG bottom-up and folds each node into
//! a [`Poly`] using [`PolyBuilder`] arithmetic. Labels (sub-objectives and
//! constraints) are transparent here: they contribute their inner
//! expression's polynomial unchanged and only matter again when energies
//! are reported.
//!
//! [`PlaceholderExpander`] resolves a symbolic coefficient to a number once
//! a feed dict is available. [`EnergyEvaluator`] computes the energy of an
//! expression for a concrete assignment, announcing labeled node energies
//! through an [`EnergyObserver`].

use log::trace;

use crate::context::{Context, ExprData, Op};
use crate::error::{Error, Result};
use crate::poly::{Poly, PolyBuilder};
use crate::reference::{Expr, Variable};
use crate::types::{FeedDict, Sample};

/// The result of compiling one expression.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The compiled expression, kept for energy reporting.
    pub root: Expr,
    /// Multilinear polynomial with symbolic coefficients.
    pub poly: Poly,
}

/// Compiles expressions to polynomials.
pub struct Compiler<'a> {
    ctx: &'a Context,
    builder: PolyBuilder<'a>,
    /// Values of fixed variables, in each variable's own domain.
    fixed: &'a Sample,
}

impl<'a> Compiler<'a> {
    pub fn new(ctx: &'a Context, fixed: &'a Sample) -> Self {
        Self {
            ctx,
            builder: PolyBuilder::new(ctx),
            fixed,
        }
    }

    pub fn compile(&self, root: Expr) -> Compiled {
        let poly = self.visit(root);
        trace!("compiled {} into {} terms", root, poly.size());
        Compiled { root, poly }
    }

    fn visit(&self, expr: Expr) -> Poly {
        match self.ctx.expr_data(expr) {
            ExprData::Fp(v) => self.builder.constant(v),
            ExprData::Var(var) => {
                // Fixed variables compile as the constant they were pinned
                // to, in the variable's own domain.
                if let Some(&value) = self.fixed.get(&(var.index() as u32)) {
                    self.builder.constant(value as f64)
                } else {
                    self.builder.variable(var)
                }
            }
            // Placeholders stay symbolic until a feed dict arrives.
            ExprData::Placeholder(_) => self.builder.symbol(expr),
            ExprData::SubH { expr: inner, .. } => self.visit(inner),
            ExprData::Constraint { expr: inner, .. } => self.visit(inner),
            ExprData::Neg(inner) => {
                let mut poly = self.visit(inner);
                self.builder.neg_assign(&mut poly);
                poly
            }
            ExprData::List { op: Op::Add, items } => {
                let mut acc = Poly::Empty;
                for item in items {
                    self.builder.add_assign(&mut acc, self.visit(item));
                }
                acc
            }
            ExprData::List { op: Op::Mul, items } => {
                let mut iter = items.into_iter();
                let mut acc = match iter.next() {
                    Some(first) => self.visit(first),
                    None => return Poly::Empty,
                };
                for item in iter {
                    if acc.is_empty() {
                        return acc;
                    }
                    self.builder.mul_assign(&mut acc, &self.visit(item));
                }
                acc
            }
        }
    }
}

/// Resolves a symbolic coefficient expression to a number using a feed dict.
pub struct PlaceholderExpander<'a> {
    ctx: &'a Context,
    feed: &'a FeedDict,
}

impl<'a> PlaceholderExpander<'a> {
    pub fn new(ctx: &'a Context, feed: &'a FeedDict) -> Self {
        Self { ctx, feed }
    }

    pub fn expand(&self, expr: Expr) -> Result<f64> {
        match self.ctx.expr_data(expr) {
            ExprData::Fp(v) => Ok(v),
            ExprData::Placeholder(name) => self
                .feed
                .get(&name)
                .copied()
                .ok_or(Error::MissingPlaceholder(name)),
            ExprData::Neg(inner) => Ok(-self.expand(inner)?),
            ExprData::List { op, items } => {
                let mut acc = match op {
                    Op::Add => 0.0,
                    Op::Mul => 1.0,
                };
                for item in items {
                    let v = self.expand(item)?;
                    match op {
                        Op::Add => acc += v,
                        Op::Mul => acc *= v,
                    }
                }
                Ok(acc)
            }
            ExprData::Var(var) => Err(Error::NonConstant(self.ctx.var_name(var))),
            ExprData::SubH { label, .. } | ExprData::Constraint { label, .. } => {
                Err(Error::NonConstant(label))
            }
        }
    }
}

/// Receives energies of labeled nodes during evaluation.
///
/// Both callbacks default to no-ops, so observers only implement what they
/// care about.
pub trait EnergyObserver {
    fn sub_objective(&mut self, _label: &str, _energy: f64) {}
    fn constraint(&mut self, _label: &str, _energy: f64, _satisfied: bool) {}
}

/// Observer that discards everything.
pub struct NoObserver;

impl EnergyObserver for NoObserver {}

/// Evaluates the energy of an expression for a concrete assignment.
///
/// Variables are looked up through a caller-supplied closure so the same
/// evaluator serves samples keyed by sparse or dense indices.
pub struct EnergyEvaluator<'a> {
    ctx: &'a Context,
    feed: &'a FeedDict,
}

impl<'a> EnergyEvaluator<'a> {
    pub fn new(ctx: &'a Context, feed: &'a FeedDict) -> Self {
        Self { ctx, feed }
    }

    /// Evaluates `expr`. `var_value` must return the value of a variable in
    /// that variable's own domain.
    pub fn energy<F, O>(&self, expr: Expr, var_value: &mut F, observer: &mut O) -> Result<f64>
    where
        F: FnMut(Variable) -> Result<f64>,
        O: EnergyObserver,
    {
        match self.ctx.expr_data(expr) {
            ExprData::Fp(v) => Ok(v),
            ExprData::Var(var) => var_value(var),
            ExprData::Placeholder(name) => self
                .feed
                .get(&name)
                .copied()
                .ok_or(Error::MissingPlaceholder(name)),
            ExprData::SubH { label, expr: inner } => {
                let e = self.energy(inner, var_value, observer)?;
                observer.sub_objective(&label, e);
                Ok(e)
            }
            ExprData::Constraint {
                label,
                expr: inner,
                cond,
            } => {
                let e = self.energy(inner, var_value, observer)?;
                let satisfied = self.ctx.apply_condition(cond, e);
                observer.constraint(&label, e, satisfied);
                Ok(e)
            }
            ExprData::Neg(inner) => Ok(-self.energy(inner, var_value, observer)?),
            ExprData::List { op, items } => {
                let mut acc = match op {
                    Op::Add => 0.0,
                    Op::Mul => 1.0,
                };
                for item in items {
                    let v = self.energy(item, var_value, observer)?;
                    match op {
                        Op::Add => acc += v,
                        Op::Mul => acc *= v,
                    }
                }
                Ok(acc)
            }
        }
    }
}

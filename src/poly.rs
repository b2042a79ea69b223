//! Multilinear polynomials with symbolic coefficients.
//!
//! A [`Poly`] maps canonical monomials ([`Product`] handles) to coefficient
//! expressions ([`Expr`] handles). Coefficients stay symbolic so that
//! placeholders survive compilation and are only resolved at generation
//! time. The constant term is keyed by `Product::NONE`.
//!
//! The representation is staged by size: most intermediate results during
//! compilation are a single term, so `Single` avoids allocating a map until
//! a second distinct monomial actually appears.

use std::collections::HashMap;

use crate::context::Context;
use crate::reference::{Expr, Product, Variable};
use crate::types::Vartype;

#[derive(Debug, Clone, PartialEq)]
pub enum Poly {
    Empty,
    Single(Product, Expr),
    Multi(HashMap<Product, Expr>),
}

impl Poly {
    pub fn new() -> Self {
        Poly::Empty
    }

    /// Number of terms.
    pub fn size(&self) -> usize {
        match self {
            Poly::Empty => 0,
            Poly::Single(..) => 1,
            Poly::Multi(terms) => terms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Poly::Empty)
    }

    /// True when the polynomial has no non-constant term.
    pub fn is_constant(&self) -> bool {
        self.iter().all(|(term, _)| term.is_none())
    }

    /// Coefficient of a given monomial, if present.
    pub fn coeff(&self, term: Product) -> Option<Expr> {
        match self {
            Poly::Empty => None,
            Poly::Single(t, c) => (*t == term).then_some(*c),
            Poly::Multi(terms) => terms.get(&term).copied(),
        }
    }

    pub fn iter(&self) -> PolyIter<'_> {
        match self {
            Poly::Empty => PolyIter::Empty,
            Poly::Single(term, coeff) => PolyIter::Single(Some((*term, *coeff))),
            Poly::Multi(terms) => PolyIter::Multi(terms.iter()),
        }
    }

    /// Adds `coeff` to the coefficient of `term`, promoting the
    /// representation as needed. Symbolic addition goes through the context
    /// so that constant coefficients fold.
    pub fn insert_or_add(&mut self, ctx: &Context, term: Product, coeff: Expr) {
        match self {
            Poly::Empty => *self = Poly::Single(term, coeff),
            Poly::Single(t, c) => {
                if *t == term {
                    *c = ctx.add(*c, coeff);
                } else {
                    let mut terms = HashMap::new();
                    terms.insert(*t, *c);
                    terms.insert(term, coeff);
                    *self = Poly::Multi(terms);
                }
            }
            Poly::Multi(terms) => {
                terms
                    .entry(term)
                    .and_modify(|c| *c = ctx.add(*c, coeff))
                    .or_insert(coeff);
            }
        }
    }

    /// Renders the polynomial as sorted `coeff * (vars)` lines for tests and
    /// debugging. Terms are ordered by monomial handle.
    pub fn display(&self, ctx: &Context) -> String {
        let mut terms: Vec<(Product, Expr)> = self.iter().collect();
        terms.sort_by_key(|(term, _)| *term);
        let rendered: Vec<String> = terms
            .iter()
            .map(|(term, coeff)| {
                format!("{} * {}", ctx.display_expr(*coeff), ctx.display_product(*term))
            })
            .collect();
        rendered.join(" + ")
    }
}

impl Default for Poly {
    fn default() -> Self {
        Poly::new()
    }
}

pub enum PolyIter<'a> {
    Empty,
    Single(Option<(Product, Expr)>),
    Multi(std::collections::hash_map::Iter<'a, Product, Expr>),
}

impl Iterator for PolyIter<'_> {
    type Item = (Product, Expr);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            PolyIter::Empty => None,
            PolyIter::Single(item) => item.take(),
            PolyIter::Multi(iter) => iter.next().map(|(&t, &c)| (t, c)),
        }
    }
}

/// Arithmetic on polynomials during compilation.
///
/// All operations mutate the left operand in place; multiplication is the
/// only one that allocates a fresh term map.
pub struct PolyBuilder<'a> {
    ctx: &'a Context,
}

impl<'a> PolyBuilder<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// The polynomial of a single variable leaf.
    ///
    /// Binary variables compile to one linear term. Spin variables are
    /// embedded into the binary domain right here, once, via `s = 2b - 1`:
    /// every monomial downstream of this point ranges over binary-valued
    /// factors only.
    pub fn variable(&self, var: Variable) -> Poly {
        let term = self.ctx.intern_product(&[var]);
        match self.ctx.var_type(var) {
            Vartype::Binary => Poly::Single(term, self.ctx.constant(1.0)),
            Vartype::Spin => {
                let mut terms = HashMap::new();
                terms.insert(term, self.ctx.constant(2.0));
                terms.insert(Product::NONE, self.ctx.constant(-1.0));
                Poly::Multi(terms)
            }
        }
    }

    /// A constant-only polynomial. Zero yields the empty polynomial.
    pub fn constant(&self, value: f64) -> Poly {
        if value == 0.0 {
            Poly::Empty
        } else {
            Poly::Single(Product::NONE, self.ctx.constant(value))
        }
    }

    /// A polynomial with a single symbolic coefficient on the constant term.
    pub fn symbol(&self, coeff: Expr) -> Poly {
        Poly::Single(Product::NONE, coeff)
    }

    /// Negates every coefficient in place.
    pub fn neg_assign(&self, poly: &mut Poly) {
        match poly {
            Poly::Empty => {}
            Poly::Single(_, c) => *c = self.ctx.neg(*c),
            Poly::Multi(terms) => {
                for c in terms.values_mut() {
                    *c = self.ctx.neg(*c);
                }
            }
        }
    }

    /// `lhs += rhs`, merging term maps.
    pub fn add_assign(&self, lhs: &mut Poly, rhs: Poly) {
        match rhs {
            Poly::Empty => {}
            Poly::Single(term, coeff) => lhs.insert_or_add(self.ctx, term, coeff),
            Poly::Multi(terms) => {
                for (term, coeff) in terms {
                    lhs.insert_or_add(self.ctx, term, coeff);
                }
            }
        }
    }

    /// `lhs *= rhs` by the distributive law. Monomial products go through
    /// the idempotent merge in the context, so `b * b` collapses to `b`.
    pub fn mul_assign(&self, lhs: &mut Poly, rhs: &Poly) {
        let result = match (&*lhs, rhs) {
            (Poly::Empty, _) | (_, Poly::Empty) => Poly::Empty,
            (Poly::Single(lt, lc), Poly::Single(rt, rc)) => {
                self.mul_single_single(*lt, *lc, *rt, *rc)
            }
            (Poly::Multi(terms), Poly::Single(rt, rc)) => {
                self.mul_multi_single(terms, *rt, *rc)
            }
            (Poly::Single(lt, lc), Poly::Multi(terms)) => {
                self.mul_multi_single(terms, *lt, *lc)
            }
            (Poly::Multi(lterms), Poly::Multi(rterms)) => {
                self.mul_multi_multi(lterms, rterms)
            }
        };
        *lhs = result;
    }

    fn mul_single_single(&self, lt: Product, lc: Expr, rt: Product, rc: Expr) -> Poly {
        Poly::Single(self.ctx.mul_products(lt, rt), self.ctx.mul(lc, rc))
    }

    fn mul_multi_single(&self, terms: &HashMap<Product, Expr>, t: Product, c: Expr) -> Poly {
        // Scaling by a constant term keeps every monomial distinct, so the
        // result can be built without collision handling.
        if t.is_none() {
            let scaled = terms
                .iter()
                .map(|(&term, &coeff)| (term, self.ctx.mul(coeff, c)))
                .collect();
            return Poly::Multi(scaled);
        }

        let mut result = Poly::Empty;
        for (&term, &coeff) in terms {
            result.insert_or_add(
                self.ctx,
                self.ctx.mul_products(term, t),
                self.ctx.mul(coeff, c),
            );
        }
        result
    }

    fn mul_multi_multi(
        &self,
        lterms: &HashMap<Product, Expr>,
        rterms: &HashMap<Product, Expr>,
    ) -> Poly {
        let mut result = Poly::Empty;
        for (&lt, &lc) in lterms {
            for (&rt, &rc) in rterms {
                result.insert_or_add(
                    self.ctx,
                    self.ctx.mul_products(lt, rt),
                    self.ctx.mul(lc, rc),
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ExprData};
    use test_log::test;

    fn coeff_value(ctx: &Context, poly: &Poly, term: Product) -> f64 {
        match ctx.expr_data(poly.coeff(term).expect("term missing")) {
            ExprData::Fp(v) => v,
            other => panic!("expected folded constant, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_promotes_representation() {
        let ctx = Context::new();
        let vs = ctx.create_anon_vars(2, Vartype::Binary);
        let px = ctx.intern_product(&[vs[0]]);
        let py = ctx.intern_product(&[vs[1]]);
        let one = ctx.constant(1.0);

        let mut poly = Poly::new();
        assert!(poly.is_empty());

        poly.insert_or_add(&ctx, px, one);
        assert!(matches!(poly, Poly::Single(..)));
        assert_eq!(poly.size(), 1);

        // Same monomial folds in place.
        poly.insert_or_add(&ctx, px, one);
        assert!(matches!(poly, Poly::Single(..)));
        assert_eq!(coeff_value(&ctx, &poly, px), 2.0);

        // A second monomial promotes to the map representation.
        poly.insert_or_add(&ctx, py, one);
        assert!(matches!(poly, Poly::Multi(..)));
        assert_eq!(poly.size(), 2);
    }

    #[test]
    fn test_binary_variable_leaf() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let v = ctx.create_anon_var(Vartype::Binary);
        let poly = b.variable(v);
        assert_eq!(poly.size(), 1);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[v])), 1.0);
    }

    #[test]
    fn test_spin_variable_embeds_into_binary() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let s = ctx.create_anon_var(Vartype::Spin);
        let poly = b.variable(s);
        // s = 2b - 1
        assert_eq!(poly.size(), 2);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[s])), 2.0);
        assert_eq!(coeff_value(&ctx, &poly, Product::NONE), -1.0);
    }

    #[test]
    fn test_zero_constant_is_empty() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        assert!(b.constant(0.0).is_empty());
        assert_eq!(b.constant(4.0).size(), 1);
    }

    #[test]
    fn test_add_and_neg() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let vs = ctx.create_anon_vars(2, Vartype::Binary);

        let mut poly = b.variable(vs[0]);
        b.add_assign(&mut poly, b.variable(vs[1]));
        b.add_assign(&mut poly, b.constant(3.0));
        assert_eq!(poly.size(), 3);

        b.neg_assign(&mut poly);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[vs[0]])), -1.0);
        assert_eq!(coeff_value(&ctx, &poly, Product::NONE), -3.0);
    }

    #[test]
    fn test_square_of_binary_sum() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let vs = ctx.create_anon_vars(2, Vartype::Binary);

        // (x + y)^2 = x + y + 2xy for binary x, y.
        let mut sum = b.variable(vs[0]);
        b.add_assign(&mut sum, b.variable(vs[1]));
        let square = sum.clone();
        let mut poly = sum;
        b.mul_assign(&mut poly, &square);

        assert_eq!(poly.size(), 3);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[vs[0]])), 1.0);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[vs[1]])), 1.0);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&vs)), 2.0);
    }

    #[test]
    fn test_constant_scale_fast_path() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let vs = ctx.create_anon_vars(2, Vartype::Binary);

        let mut poly = b.variable(vs[0]);
        b.add_assign(&mut poly, b.variable(vs[1]));
        b.mul_assign(&mut poly, &b.constant(2.5));

        assert_eq!(poly.size(), 2);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[vs[0]])), 2.5);
        assert_eq!(coeff_value(&ctx, &poly, ctx.intern_product(&[vs[1]])), 2.5);
    }

    #[test]
    fn test_mul_by_empty_annihilates() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let v = ctx.create_anon_var(Vartype::Binary);

        let mut poly = b.variable(v);
        b.mul_assign(&mut poly, &Poly::Empty);
        assert!(poly.is_empty());
    }

    #[test]
    fn test_symbolic_coefficient_survives() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let v = ctx.create_anon_var(Vartype::Binary);
        let w = ctx.placeholder("w");

        let mut poly = b.variable(v);
        b.mul_assign(&mut poly, &b.symbol(w));
        let coeff = poly.coeff(ctx.intern_product(&[v])).unwrap();
        assert_eq!(coeff, w);
    }

    #[test]
    fn test_display_orders_by_monomial() {
        let ctx = Context::new();
        let b = PolyBuilder::new(&ctx);
        let x = ctx.create_var("x", Vartype::Binary).unwrap();
        let y = ctx.create_var("y", Vartype::Binary).unwrap();

        let mut poly = b.constant(4.0);
        b.add_assign(&mut poly, b.variable(x));
        b.add_assign(&mut poly, b.variable(y));
        assert_eq!(poly.display(&ctx), "4 * () + 1 * ('x') + 1 * ('y')");
    }
}

//! The interning store.
//!
//! A [`Context`] owns every [`Variable`], [`Expr`], [`Product`] and
//! [`Condition`] created during one model-building session. All tables are
//! append-only arenas: entities are never deleted individually and are
//! released together when the context is dropped. Structural identity is
//! enforced where it matters for O(1) equality:
//!
//! - constants are interned by bit-identical value,
//! - placeholders are interned by name,
//! - products are interned by their exact sorted variable sequence,
//! - conditions are interned by `(operator, rhs)` pair.
//!
//! The context exposes a `&self` API over interior mutability, in the
//! manner of a BDD manager. It is single-threaded and not safe for
//! concurrent mutation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write;

use log::debug;

use crate::error::{Error, Result};
use crate::reference::{Condition, Expr, Product, Variable};
use crate::types::{CmpOp, Sample, Vartype};

/// N-ary list operators. Subtraction is rewritten to add-of-negate at
/// construction time and therefore has no tag here.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Op {
    Add,
    Mul,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Add => write!(f, "+"),
            Op::Mul => write!(f, "*"),
        }
    }
}

/// Payload of an expression node. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprData {
    /// A floating point constant.
    Fp(f64),
    /// A reference to a decision variable.
    Var(Variable),
    /// A named constant whose value arrives with the feed dict.
    Placeholder(String),
    /// A labeled sub-objective; transparent to polynomial structure.
    SubH { label: String, expr: Expr },
    /// A labeled constraint with its comparison condition.
    Constraint {
        label: String,
        expr: Expr,
        cond: Condition,
    },
    /// Unary negation.
    Neg(Expr),
    /// A flat n-ary sum or product.
    List { op: Op, items: Vec<Expr> },
}

/// Attributes of a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarData {
    /// Possibly empty for anonymous variables.
    pub name: String,
    pub vartype: Vartype,
}

pub struct Context {
    vars: RefCell<Vec<VarData>>,
    name_to_var: RefCell<HashMap<String, Variable>>,

    exprs: RefCell<Vec<ExprData>>,
    consts: RefCell<HashMap<u64, Expr>>,
    placeholders: RefCell<HashMap<String, Expr>>,

    products: RefCell<Vec<Vec<Variable>>>,
    product_index: RefCell<HashMap<Vec<Variable>, Product>>,

    conditions: RefCell<Vec<(CmpOp, f64)>>,
    condition_index: RefCell<HashMap<(CmpOp, u64), Condition>>,
}

impl Context {
    pub fn new() -> Self {
        let ctx = Self {
            vars: RefCell::new(Vec::new()),
            name_to_var: RefCell::new(HashMap::new()),
            exprs: RefCell::new(Vec::new()),
            consts: RefCell::new(HashMap::new()),
            placeholders: RefCell::new(HashMap::new()),
            products: RefCell::new(Vec::new()),
            product_index: RefCell::new(HashMap::new()),
            conditions: RefCell::new(Vec::new()),
            condition_index: RefCell::new(HashMap::new()),
        };
        // The equality-with-zero condition is pre-registered.
        let eqz = ctx.condition(CmpOp::Eq, 0.0);
        debug_assert_eq!(eqz.index(), 0);
        ctx
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("vars", &self.vars.borrow().len())
            .field("exprs", &self.exprs.borrow().len())
            .field("products", &self.products.borrow().len())
            .field("conditions", &self.conditions.borrow().len())
            .finish()
    }
}

// Variables.
impl Context {
    /// Creates a variable. A non-empty name must be unique within this
    /// context; an empty name creates an anonymous variable.
    pub fn create_var(&self, name: &str, vartype: Vartype) -> Result<Variable> {
        if name.is_empty() {
            return Ok(self.create_anon_var(vartype));
        }
        if self.name_to_var.borrow().contains_key(name) {
            return Err(Error::DuplicateVariable(name.to_string()));
        }

        let var = self.append_var(VarData {
            name: name.to_string(),
            vartype,
        });
        self.name_to_var.borrow_mut().insert(name.to_string(), var);
        debug!("{} = '{}'", var, name);
        Ok(var)
    }

    /// Creates an anonymous variable. Never fails.
    pub fn create_anon_var(&self, vartype: Vartype) -> Variable {
        let var = self.append_var(VarData {
            name: String::new(),
            vartype,
        });
        debug!("{} = <anon>", var);
        var
    }

    /// Creates `n` anonymous variables.
    pub fn create_anon_vars(&self, n: usize, vartype: Vartype) -> Vec<Variable> {
        (0..n).map(|_| self.create_anon_var(vartype)).collect()
    }

    fn append_var(&self, data: VarData) -> Variable {
        let mut vars = self.vars.borrow_mut();
        let var = Variable::from_index(vars.len());
        vars.push(data);
        var
    }

    pub fn num_vars(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn var_data(&self, var: Variable) -> VarData {
        self.vars.borrow()[var.index()].clone()
    }

    pub fn var_name(&self, var: Variable) -> String {
        self.vars.borrow()[var.index()].name.clone()
    }

    pub fn var_type(&self, var: Variable) -> Vartype {
        self.vars.borrow()[var.index()].vartype
    }

    /// Looks up a variable by its registered name.
    pub fn var_of(&self, name: &str) -> Option<Variable> {
        self.name_to_var.borrow().get(name).copied()
    }

    /// Converts every value of `sample` from the `from` domain into the
    /// respective variable's own domain.
    ///
    /// Samples come from outside the crate, so ids that name no variable of
    /// this context and values outside the `from` domain are errors, not
    /// panics.
    pub fn convert_sample(&self, sample: &Sample, from: Vartype) -> Result<Sample> {
        sample
            .iter()
            .map(|(&id, &value)| {
                if id as usize >= self.num_vars() {
                    return Err(Error::UnknownVariableId(id));
                }
                if !crate::types::is_valid_value(value, from) {
                    return Err(Error::InvalidValue {
                        value,
                        vartype: from,
                    });
                }
                let to = self.var_type(Variable::from_index(id as usize));
                Ok((id, crate::types::convert_value(value, from, to)))
            })
            .collect()
    }
}

// Products.
impl Context {
    /// Canonicalizes and interns a monomial: the sequence is sorted
    /// ascending by handle and dedup-interned by the exact sorted sequence.
    /// Repeated elements are preserved as given.
    pub fn intern_product(&self, vars: &[Variable]) -> Product {
        if vars.is_empty() {
            return Product::NONE;
        }
        let mut sorted = vars.to_vec();
        sorted.sort_unstable();
        self.intern_sorted(sorted)
    }

    fn intern_sorted(&self, vars: Vec<Variable>) -> Product {
        debug_assert!(vars.windows(2).all(|w| w[0] <= w[1]));
        if let Some(&p) = self.product_index.borrow().get(&vars) {
            return p;
        }

        let mut products = self.products.borrow_mut();
        let p = Product::from_index(products.len());
        products.push(vars.clone());
        drop(products);
        self.product_index.borrow_mut().insert(vars, p);
        debug!("{} interned", p);
        p
    }

    /// Multiplies two canonical monomials by merging their sorted variable
    /// sequences. The merge is idempotent (`b·b = b`): every monomial built
    /// by the compiler ranges over binary-valued variables, for which
    /// self-multiplication is the identity.
    pub fn mul_products(&self, lhs: Product, rhs: Product) -> Product {
        if self.dim_of(lhs) == 0 {
            return rhs;
        }
        if self.dim_of(rhs) == 0 {
            return lhs;
        }

        let (l, r) = {
            let products = self.products.borrow();
            (
                products[lhs.index()].clone(),
                products[rhs.index()].clone(),
            )
        };

        // Single-variable factors order by direct handle comparison.
        if l.len() == 1 && r.len() == 1 {
            let (a, b) = (l[0], r[0]);
            return if a == b {
                lhs
            } else if a < b {
                self.intern_sorted(vec![a, b])
            } else {
                self.intern_sorted(vec![b, a])
            };
        }

        let mut merged = Vec::with_capacity(l.len() + r.len());
        let (mut i, mut j) = (0, 0);
        while i < l.len() && j < r.len() {
            match l[i].cmp(&r[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(l[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(r[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(l[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&l[i..]);
        merged.extend_from_slice(&r[j..]);
        self.intern_sorted(merged)
    }

    /// Returns the variables of a product; empty for `Product::NONE`.
    pub fn product_vars(&self, p: Product) -> Vec<Variable> {
        if p.is_none() {
            return Vec::new();
        }
        self.products.borrow()[p.index()].clone()
    }

    /// Number of variables in the monomial.
    pub fn dim_of(&self, p: Product) -> usize {
        if p.is_none() {
            0
        } else {
            self.products.borrow()[p.index()].len()
        }
    }
}

// Expressions.
impl Context {
    /// Interns a floating point constant; bit-identical values share one
    /// handle for the lifetime of the context.
    pub fn constant(&self, value: f64) -> Expr {
        if let Some(&e) = self.consts.borrow().get(&value.to_bits()) {
            return e;
        }
        let e = self.insert_expr(ExprData::Fp(value));
        self.consts.borrow_mut().insert(value.to_bits(), e);
        e
    }

    /// Interns a placeholder, keyed by name only.
    pub fn placeholder(&self, name: &str) -> Expr {
        assert!(!name.is_empty(), "placeholder must have a non-empty name");
        if let Some(&e) = self.placeholders.borrow().get(name) {
            return e;
        }
        let e = self.insert_expr(ExprData::Placeholder(name.to_string()));
        self.placeholders
            .borrow_mut()
            .insert(name.to_string(), e);
        e
    }

    /// Creates a variable-reference node.
    pub fn variable(&self, var: Variable) -> Expr {
        self.insert_expr(ExprData::Var(var))
    }

    /// Wraps an expression as a labeled sub-objective.
    pub fn subh(&self, label: &str, expr: Expr) -> Expr {
        self.insert_expr(ExprData::SubH {
            label: label.to_string(),
            expr,
        })
    }

    /// Wraps an expression as a labeled constraint with a condition.
    pub fn constraint(&self, label: &str, expr: Expr, cond: Condition) -> Expr {
        self.insert_expr(ExprData::Constraint {
            label: label.to_string(),
            expr,
            cond,
        })
    }

    /// Negation, with constant folding before node construction.
    pub fn neg(&self, expr: Expr) -> Expr {
        if let Some(v) = self.as_fp(expr) {
            return self.constant(-v);
        }
        self.insert_expr(ExprData::Neg(expr))
    }

    pub fn add(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binlist(Op::Add, lhs, rhs)
    }

    /// Subtraction is always rewritten to add-of-negate.
    pub fn sub(&self, lhs: Expr, rhs: Expr) -> Expr {
        let neg_rhs = self.neg(rhs);
        self.add(lhs, neg_rhs)
    }

    pub fn mul(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binlist(Op::Mul, lhs, rhs)
    }

    pub fn expr_data(&self, expr: Expr) -> ExprData {
        self.exprs.borrow()[expr.index()].clone()
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.borrow().len()
    }

    /// The variable behind a variable-reference node, if it is one.
    pub fn expr_var(&self, expr: Expr) -> Option<Variable> {
        match &self.exprs.borrow()[expr.index()] {
            ExprData::Var(var) => Some(*var),
            _ => None,
        }
    }

    /// The name carried by a node: variable name, placeholder name, or
    /// sub-objective/constraint label.
    pub fn expr_name(&self, expr: Expr) -> Option<String> {
        match &self.exprs.borrow()[expr.index()] {
            ExprData::Var(var) => Some(self.var_name(*var)),
            ExprData::Placeholder(name) => Some(name.clone()),
            ExprData::SubH { label, .. } => Some(label.clone()),
            ExprData::Constraint { label, .. } => Some(label.clone()),
            _ => None,
        }
    }

    fn insert_expr(&self, data: ExprData) -> Expr {
        let mut exprs = self.exprs.borrow_mut();
        let e = Expr::from_index(exprs.len());
        exprs.push(data);
        e
    }

    fn as_fp(&self, expr: Expr) -> Option<f64> {
        match self.exprs.borrow()[expr.index()] {
            ExprData::Fp(v) => Some(v),
            _ => None,
        }
    }

    /// Builds an n-ary list node, folding constants first and merging into
    /// existing same-operator lists so that sums/products stay flat.
    fn binlist(&self, op: Op, lhs: Expr, rhs: Expr) -> Expr {
        if let Some(e) = self.constfold_binary(op, lhs, rhs) {
            return e;
        }

        let side_items = |e: Expr| match self.expr_data(e) {
            ExprData::List { op: side_op, items } if side_op == op => Some(items),
            _ => None,
        };

        let items = match (side_items(lhs), side_items(rhs)) {
            (Some(mut l), Some(r)) => {
                l.extend(r);
                l
            }
            (Some(mut l), None) => {
                l.push(rhs);
                l
            }
            (None, Some(r)) => {
                let mut items = Vec::with_capacity(r.len() + 1);
                items.push(lhs);
                items.extend(r);
                items
            }
            (None, None) => vec![lhs, rhs],
        };
        self.insert_expr(ExprData::List { op, items })
    }

    /// Folds before constructing a node, never after.
    fn constfold_binary(&self, op: Op, lhs: Expr, rhs: Expr) -> Option<Expr> {
        let lv = self.as_fp(lhs);
        let rv = self.as_fp(rhs);

        if let (Some(a), Some(b)) = (lv, rv) {
            return Some(match op {
                Op::Add => self.constant(a + b),
                Op::Mul => self.constant(a * b),
            });
        }

        // Additive identity and multiplicative absorption, symmetrically.
        if lv == Some(0.0) {
            return Some(match op {
                Op::Add => rhs,
                Op::Mul => self.constant(0.0),
            });
        }
        if rv == Some(0.0) {
            return Some(match op {
                Op::Add => lhs,
                Op::Mul => self.constant(0.0),
            });
        }

        // Multiplicative identity and sign flip.
        if op == Op::Mul {
            if let Some(v) = lv.or(rv) {
                let other = if lv.is_some() { rhs } else { lhs };
                if v == 1.0 {
                    return Some(other);
                }
                if v == -1.0 {
                    return Some(self.neg(other));
                }
            }
        }

        None
    }
}

// Conditions.
impl Context {
    /// Interns a `(operator, rhs)` condition.
    pub fn condition(&self, op: CmpOp, rhs: f64) -> Condition {
        let key = (op, rhs.to_bits());
        if let Some(&c) = self.condition_index.borrow().get(&key) {
            return c;
        }
        let mut conditions = self.conditions.borrow_mut();
        let c = Condition::from_index(conditions.len());
        conditions.push((op, rhs));
        drop(conditions);
        self.condition_index.borrow_mut().insert(key, c);
        c
    }

    /// The pre-registered equality-with-zero condition.
    pub fn eqz(&self) -> Condition {
        Condition::from_index(0)
    }

    pub fn condition_data(&self, cond: Condition) -> (CmpOp, f64) {
        self.conditions.borrow()[cond.index()]
    }

    pub fn num_conditions(&self) -> usize {
        self.conditions.borrow().len()
    }

    /// Evaluates `lhs <op> rhs` for the interned condition.
    pub fn apply_condition(&self, cond: Condition, lhs: f64) -> bool {
        let (op, rhs) = self.condition_data(cond);
        op.invoke(lhs, rhs)
    }
}

// Rendering.
impl Context {
    pub fn display_var(&self, var: Variable) -> String {
        let data = self.var_data(var);
        format!("{}('{}')", data.vartype, data.name)
    }

    /// Renders a product as its tuple of variable names, e.g. `('x', 'y')`.
    pub fn display_product(&self, p: Product) -> String {
        let mut out = String::from("(");
        for (i, var) in self.product_vars(p).iter().enumerate() {
            if i != 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "'{}'", self.var_name(*var));
        }
        out.push(')');
        out
    }

    /// Renders an expression in infix form.
    pub fn display_expr(&self, expr: Expr) -> String {
        let mut out = String::new();
        self.display_expr_into(&mut out, expr);
        out
    }

    fn display_expr_into(&self, out: &mut String, expr: Expr) {
        match self.expr_data(expr) {
            ExprData::Fp(v) => {
                let _ = write!(out, "{}", v);
            }
            ExprData::Var(var) => {
                let _ = write!(out, "'{}'", self.var_name(var));
            }
            ExprData::Placeholder(name) => {
                let _ = write!(out, "place('{}')", name);
            }
            ExprData::SubH { label, expr } => {
                let _ = write!(out, "subh('{}', ", label);
                self.display_expr_into(out, expr);
                out.push(')');
            }
            ExprData::Constraint { label, expr, cond } => {
                let (op, rhs) = self.condition_data(cond);
                let _ = write!(out, "constr('{}', {} {}, ", label, op, rhs);
                self.display_expr_into(out, expr);
                out.push(')');
            }
            ExprData::Neg(inner) => {
                out.push('-');
                self.display_expr_into(out, inner);
            }
            ExprData::List { op, items } => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        let _ = write!(out, " {} ", op);
                    }
                    self.display_expr_into(out, *item);
                }
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_create_vars() {
        let ctx = Context::new();
        let v0 = ctx.create_var("var", Vartype::Spin).unwrap();
        assert_eq!(v0.index(), 0);
        assert_eq!(ctx.var_name(v0), "var");
        assert_eq!(ctx.var_type(v0), Vartype::Spin);

        let v1 = ctx.create_anon_var(Vartype::Binary);
        assert_eq!(v1.index(), 1);
        assert_eq!(ctx.var_name(v1), "");

        let v2 = ctx.create_var("", Vartype::Binary).unwrap();
        assert_eq!(v2.index(), 2);

        let vs = ctx.create_anon_vars(3, Vartype::Binary);
        assert_eq!(vs.len(), 3);
        assert_eq!(vs[0].index(), 3);
        assert_eq!(vs[2].index(), 5);

        assert_eq!(ctx.var_of("var"), Some(v0));
        assert_eq!(ctx.var_of("nope"), None);
    }

    #[test]
    fn test_duplicate_name_is_an_error() {
        let ctx = Context::new();
        ctx.create_var("x", Vartype::Binary).unwrap();
        let err = ctx.create_var("x", Vartype::Binary).unwrap_err();
        assert_eq!(err, Error::DuplicateVariable("x".to_string()));
    }

    #[test]
    fn test_constant_interning() {
        let ctx = Context::new();
        let a = ctx.constant(1.25);
        let b = ctx.constant(1.25);
        assert_eq!(a, b);
        assert_ne!(a, ctx.constant(2.5));
    }

    #[test]
    fn test_constant_add_folds_without_list_node() {
        let ctx = Context::new();
        let a = ctx.constant(1.0);
        let b = ctx.constant(2.0);
        let before = ctx.num_exprs();
        let sum = ctx.add(a, b);
        assert_eq!(sum, ctx.constant(3.0));
        // Folding only interned the result constant; no list was built.
        assert_eq!(ctx.num_exprs(), before + 1);
    }

    #[test]
    fn test_placeholder_interned_by_name() {
        let ctx = Context::new();
        assert_eq!(ctx.placeholder("w"), ctx.placeholder("w"));
        assert_ne!(ctx.placeholder("w"), ctx.placeholder("v"));
    }

    #[test]
    fn test_identity_folds() {
        let ctx = Context::new();
        let x = ctx.variable(ctx.create_anon_var(Vartype::Binary));
        let zero = ctx.constant(0.0);
        let one = ctx.constant(1.0);
        let minus_one = ctx.constant(-1.0);

        assert_eq!(ctx.add(x, zero), x);
        assert_eq!(ctx.add(zero, x), x);
        assert_eq!(ctx.sub(x, zero), x);
        assert_eq!(ctx.mul(x, zero), zero);
        assert_eq!(ctx.mul(zero, x), zero);
        assert_eq!(ctx.mul(x, one), x);
        assert_eq!(ctx.mul(one, x), x);

        let neg = ctx.mul(x, minus_one);
        assert_eq!(ctx.expr_data(neg), ExprData::Neg(x));
    }

    #[test]
    fn test_sub_rewrites_to_add_of_negate() {
        let ctx = Context::new();
        let x = ctx.variable(ctx.create_anon_var(Vartype::Binary));
        let y = ctx.variable(ctx.create_anon_var(Vartype::Binary));
        let e = ctx.sub(x, y);
        match ctx.expr_data(e) {
            ExprData::List { op: Op::Add, items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], x);
                assert_eq!(ctx.expr_data(items[1]), ExprData::Neg(y));
            }
            other => panic!("expected Add list, got {:?}", other),
        }
    }

    #[test]
    fn test_lists_stay_flat() {
        let ctx = Context::new();
        let e: Vec<Expr> = ctx
            .create_anon_vars(4, Vartype::Binary)
            .into_iter()
            .map(|v| ctx.variable(v))
            .collect();

        // Left-leaning construction must still yield one flat list.
        let sum = ctx.add(ctx.add(ctx.add(e[0], e[1]), e[2]), e[3]);
        match ctx.expr_data(sum) {
            ExprData::List { op: Op::Add, items } => assert_eq!(items.len(), 4),
            other => panic!("expected Add list, got {:?}", other),
        }

        // Merging two lists of the same operator concatenates them.
        let both = ctx.add(ctx.add(e[0], e[1]), ctx.add(e[2], e[3]));
        match ctx.expr_data(both) {
            ExprData::List { op: Op::Add, items } => assert_eq!(items.len(), 4),
            other => panic!("expected Add list, got {:?}", other),
        }

        // A product inside a sum stays a separate node.
        let mixed = ctx.add(ctx.mul(e[0], e[1]), e[2]);
        match ctx.expr_data(mixed) {
            ExprData::List { op: Op::Add, items } => assert_eq!(items.len(), 2),
            other => panic!("expected Add list, got {:?}", other),
        }
    }

    #[test]
    fn test_product_canonical_identity() {
        let ctx = Context::new();
        let vs = ctx.create_anon_vars(3, Vartype::Binary);
        let p0 = ctx.intern_product(&[vs[0], vs[1], vs[2]]);
        let p1 = ctx.intern_product(&[vs[2], vs[0], vs[1]]);
        let p2 = ctx.intern_product(&[vs[1], vs[2], vs[0]]);
        assert_eq!(p0, p1);
        assert_eq!(p0, p2);
        assert_eq!(ctx.dim_of(p0), 3);
        assert_eq!(ctx.product_vars(p0), vs);
    }

    #[test]
    fn test_product_preserves_repeats() {
        let ctx = Context::new();
        let v = ctx.create_anon_var(Vartype::Binary);
        let single = ctx.intern_product(&[v]);
        let repeated = ctx.intern_product(&[v, v]);
        assert_ne!(single, repeated);
        assert_eq!(ctx.dim_of(repeated), 2);
    }

    #[test]
    fn test_empty_product() {
        let ctx = Context::new();
        assert_eq!(ctx.intern_product(&[]), Product::NONE);
        assert_eq!(ctx.dim_of(Product::NONE), 0);
    }

    #[test]
    fn test_mul_products() {
        let ctx = Context::new();
        let vs = ctx.create_anon_vars(3, Vartype::Binary);
        let px = ctx.intern_product(&[vs[0]]);
        let py = ctx.intern_product(&[vs[1]]);
        let pz = ctx.intern_product(&[vs[2]]);

        // Single-variable fast path orders by handle.
        assert_eq!(ctx.mul_products(py, px), ctx.intern_product(&[vs[0], vs[1]]));
        // Identity element.
        assert_eq!(ctx.mul_products(Product::NONE, px), px);
        assert_eq!(ctx.mul_products(px, Product::NONE), px);
        // Idempotence of binary monomials.
        assert_eq!(ctx.mul_products(px, px), px);
        let pxy = ctx.mul_products(px, py);
        assert_eq!(ctx.mul_products(pxy, py), pxy);
        // General merge.
        let pxyz = ctx.mul_products(pxy, pz);
        assert_eq!(pxyz, ctx.intern_product(&[vs[0], vs[1], vs[2]]));
    }

    #[test]
    fn test_conditions_interned() {
        let ctx = Context::new();
        assert_eq!(ctx.num_conditions(), 1); // eqz is pre-registered
        assert_eq!(ctx.condition(CmpOp::Eq, 0.0), ctx.eqz());
        let le = ctx.condition(CmpOp::Le, 1.0);
        assert_eq!(ctx.condition(CmpOp::Le, 1.0), le);
        assert_eq!(ctx.num_conditions(), 2);
        assert!(ctx.apply_condition(le, 0.5));
        assert!(!ctx.apply_condition(le, 1.5));
    }

    #[test]
    fn test_convert_sample() {
        let ctx = Context::new();
        ctx.create_var("s", Vartype::Spin).unwrap();
        ctx.create_var("b", Vartype::Binary).unwrap();

        let native = ctx
            .convert_sample(&Sample::from([(0, 0), (1, 1)]), Vartype::Binary)
            .unwrap();
        assert_eq!(native[&0], -1);
        assert_eq!(native[&1], 1);

        // Ids and values come from outside the crate; bad ones are errors.
        let err = ctx
            .convert_sample(&Sample::from([(7, 0)]), Vartype::Binary)
            .unwrap_err();
        assert_eq!(err, Error::UnknownVariableId(7));

        let err = ctx
            .convert_sample(&Sample::from([(0, 5)]), Vartype::Binary)
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidValue {
                value: 5,
                vartype: Vartype::Binary
            }
        );
    }

    #[test]
    fn test_display_expr() {
        let ctx = Context::new();
        let x = ctx.variable(ctx.create_var("x", Vartype::Binary).unwrap());
        let y = ctx.variable(ctx.create_var("y", Vartype::Binary).unwrap());
        let h = ctx.mul(ctx.add(x, y), ctx.constant(2.0));
        assert_eq!(ctx.display_expr(h), "(('x' + 'y') * 2)");
    }
}

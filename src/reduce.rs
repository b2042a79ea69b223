//! Degree reduction (quadratization) of multilinear terms.
//!
//! Solver targets accept terms of dimension at most 2, so every
//! higher-degree monomial is rewritten with ancilla variables: an ancilla
//! `q` stands for the conjunction `a AND b`, enforced by the penalty gadget
//!
//! ```text
//! Hc(q, a, b) = strength * coeff * (3q + ab - 2aq - 2bq)
//! ```
//!
//! which is zero exactly when `q = a AND b` and positive otherwise. A term
//! of dimension `d` spends `d - 2` ancillas: the first conjoins the two
//! leading variables, each following one conjoins the previous ancilla with
//! the next variable, and the quadratic remnant `coeff * x[d-1] * q[d-3]`
//! carries the original coefficient.
//!
//! The reducer emits into a caller-supplied [`TermSink`], which also gets a
//! chance to veto a term before any ancilla is allocated.

use log::debug;

use crate::context::Context;
use crate::reference::Variable;
use crate::types::Vartype;

/// Maximum dimension a sink is ever handed.
pub const REDUCE_LIMIT: usize = 2;

/// Default penalty scale for ancilla gadgets.
pub const DEFAULT_STRENGTH: f64 = 5.0;

/// Receiver of reduced (dimension <= 2) terms.
pub trait TermSink {
    /// Pre-filter, called once per incoming term before reduction.
    /// Returning `true` drops the term without allocating ancillas.
    fn ignore(&self, _term: &[Variable], _coeff: f64) -> bool {
        false
    }

    /// Receives a term of dimension at most [`REDUCE_LIMIT`]. Variables
    /// arrive sorted ascending by handle; the empty slice is the constant
    /// term.
    fn insert_or_add(&mut self, term: &[Variable], coeff: f64);
}

/// Rewrites terms above [`REDUCE_LIMIT`] and forwards everything to a sink.
pub struct Reducer<'a, S> {
    ctx: &'a Context,
    sink: &'a mut S,
    strength: f64,
    ancillas: Vec<Variable>,
}

impl<'a, S: TermSink> Reducer<'a, S> {
    pub fn new(ctx: &'a Context, sink: &'a mut S, strength: f64) -> Self {
        Self {
            ctx,
            sink,
            strength,
            ancillas: Vec::new(),
        }
    }

    /// Ancillas created so far, in creation order.
    pub fn ancillas(&self) -> &[Variable] {
        &self.ancillas
    }

    pub fn into_ancillas(self) -> Vec<Variable> {
        self.ancillas
    }

    /// Feeds one term through the sink filter and, if needed, the
    /// quadratization chain. `term` must be sorted ascending.
    pub fn insert(&mut self, term: &[Variable], coeff: f64) {
        if self.sink.ignore(term, coeff) {
            return;
        }
        if term.len() <= REDUCE_LIMIT {
            self.sink.insert_or_add(term, coeff);
            return;
        }
        self.reduce(term, coeff);
    }

    fn reduce(&mut self, term: &[Variable], coeff: f64) {
        let dim = term.len();
        let qs = self.ctx.create_anon_vars(dim - 2, Vartype::Binary);
        debug!("reducing dim-{} term with {} ancillas", dim, qs.len());

        self.insert_hc(qs[0], term[0], term[1], coeff);
        for i in 0..dim - 3 {
            self.insert_hc(qs[i + 1], qs[i], term[i + 2], coeff);
        }
        // The remnant carries the original coefficient: q[dim-3] equals the
        // conjunction of the first dim-1 variables at any penalty-free
        // assignment.
        self.insert_pair(term[dim - 1], qs[dim - 3], coeff);

        self.ancillas.extend(qs);
    }

    /// Emits the AND-enforcing gadget for `q = a AND b`.
    fn insert_hc(&mut self, q: Variable, a: Variable, b: Variable, coeff: f64) {
        let w = self.strength * coeff;
        self.sink.insert_or_add(&[q], 3.0 * w);
        self.insert_pair(a, b, w);
        self.insert_pair(a, q, -2.0 * w);
        self.insert_pair(b, q, -2.0 * w);
    }

    fn insert_pair(&mut self, a: Variable, b: Variable, coeff: f64) {
        let mut pair = [a, b];
        pair.sort_unstable();
        self.sink.insert_or_add(&pair, coeff);
    }
}

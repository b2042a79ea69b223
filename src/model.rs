//! The model façade: variable creation, fixing, compilation, QUBO/Ising
//! generation, and sample reporting in one place.
//!
//! A [`Model`] owns the [`Context`] and the set of fixed variables. The
//! generation methods run the compiled polynomial through the degree
//! [`Reducer`] into coefficient-map sinks; each has a `_dense` variant that
//! re-indexes the (sparse, append-ordered) variable ids into a contiguous
//! `0..n` range for solvers that require it, returning the
//! [`DenseIndex`] needed to decode solver output again.

use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;

use crate::compile::{Compiled, Compiler, EnergyEvaluator, EnergyObserver, PlaceholderExpander};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::express::{Array, Express};
use crate::reduce::{Reducer, TermSink, REDUCE_LIMIT};
use crate::reference::Variable;
use crate::types::{is_valid_value, FeedDict, Linear, Quadratic, Sample, Vartype};

pub struct Model {
    ctx: Context,
    /// Fixed values, keyed by variable index, in each variable's own domain.
    fixed: RefCell<Sample>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            ctx: Context::new(),
            fixed: RefCell::new(Sample::new()),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Creates a named decision variable.
    pub fn add_var(&self, name: &str, vartype: Vartype) -> Result<Express<'_>> {
        let var = self.ctx.create_var(name, vartype)?;
        Ok(Express::new(&self.ctx, self.ctx.variable(var)))
    }

    pub fn add_binary(&self, name: &str) -> Result<Express<'_>> {
        self.add_var(name, Vartype::Binary)
    }

    pub fn add_spin(&self, name: &str) -> Result<Express<'_>> {
        self.add_var(name, Vartype::Spin)
    }

    /// Creates a shaped collection of variables named
    /// `basename[i]...[k]`, with handle-contiguous expressions so the
    /// returned [`Array`] indexes by offset.
    pub fn add_vars(&self, basename: &str, shape: &[usize], vartype: Vartype) -> Result<Array<'_>> {
        assert!(!shape.is_empty(), "array shape must have at least one axis");
        let total: usize = shape.iter().product();
        assert!(total > 0, "array must have at least one element");
        let base = {
            let name = element_name(basename, shape, 0);
            let var = self.ctx.create_var(&name, vartype)?;
            self.ctx.variable(var)
        };
        for flat in 1..total {
            let name = element_name(basename, shape, flat);
            let var = self.ctx.create_var(&name, vartype)?;
            self.ctx.variable(var);
        }
        Ok(Array::new(&self.ctx, base, shape.to_vec()))
    }

    /// A named constant resolved at generation time via the feed dict.
    pub fn placeholder(&self, name: &str) -> Express<'_> {
        Express::new(&self.ctx, self.ctx.placeholder(name))
    }

    /// A floating point constant expression.
    pub fn constant(&self, value: f64) -> Express<'_> {
        Express::new(&self.ctx, self.ctx.constant(value))
    }

    /// Pins a variable to a value in its own domain. The variable vanishes
    /// from every subsequent compilation.
    pub fn fix(&self, expr: &Express<'_>, value: i32) -> Result<()> {
        let var = self.ctx.expr_var(expr.handle()).ok_or(Error::NotAVariable)?;
        let vartype = self.ctx.var_type(var);
        if !is_valid_value(value, vartype) {
            return Err(Error::InvalidValue { value, vartype });
        }
        debug!("fix {} = {}", var, value);
        self.fixed.borrow_mut().insert(var.index() as u32, value);
        Ok(())
    }

    /// Compiles an expression into a polynomial, substituting fixed
    /// variables.
    pub fn compile(&self, expr: Express<'_>) -> Compiled {
        let fixed = self.fixed.borrow();
        Compiler::new(&self.ctx, &fixed).compile(expr.handle())
    }

    /// Expands coefficients against `feed`, reduces every term to dimension
    /// at most 2, and drives the results into `sink`. Returns the ancillas
    /// created along the way.
    pub fn generate_into<S: TermSink>(
        &self,
        compiled: &Compiled,
        sink: &mut S,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<Vec<Variable>> {
        let expander = PlaceholderExpander::new(&self.ctx, feed);
        let mut reducer = Reducer::new(&self.ctx, sink, strength);
        for (term, coeff) in compiled.poly.iter() {
            let value = expander.expand(coeff)?;
            let vars = self.ctx.product_vars(term);
            reducer.insert(&vars, value);
        }
        Ok(reducer.into_ancillas())
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::new()
    }
}

fn element_name(basename: &str, shape: &[usize], flat: usize) -> String {
    let mut indices = vec![0; shape.len()];
    let mut rest = flat;
    for (axis, &extent) in shape.iter().enumerate().rev() {
        indices[axis] = rest % extent;
        rest /= extent;
    }
    let mut name = String::from(basename);
    for idx in indices {
        name.push_str(&format!("[{}]", idx));
    }
    name
}

/// Bidirectional mapping between sparse variable ids and the contiguous
/// `0..n` ids handed to a solver.
#[derive(Debug, Clone, Default)]
pub struct DenseIndex {
    to_sparse: Vec<u32>,
    from_sparse: HashMap<u32, u32>,
}

impl DenseIndex {
    fn encode(&mut self, sparse: u32) -> u32 {
        if let Some(&dense) = self.from_sparse.get(&sparse) {
            return dense;
        }
        let dense = self.to_sparse.len() as u32;
        self.to_sparse.push(sparse);
        self.from_sparse.insert(sparse, dense);
        dense
    }

    /// Number of distinct variables seen during generation.
    pub fn len(&self) -> usize {
        self.to_sparse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_sparse.is_empty()
    }

    pub fn to_sparse(&self, dense: u32) -> Option<u32> {
        self.to_sparse.get(dense as usize).copied()
    }

    pub fn to_dense(&self, sparse: u32) -> Option<u32> {
        self.from_sparse.get(&sparse).copied()
    }

    /// Rewrites a dense-keyed solver sample back into sparse variable ids.
    /// Keys outside the mapping are dropped.
    pub fn decode_sample(&self, sample: &Sample) -> Sample {
        sample
            .iter()
            .filter_map(|(&dense, &value)| self.to_sparse(dense).map(|sparse| (sparse, value)))
            .collect()
    }
}

enum Indexer {
    Sparse,
    Dense(DenseIndex),
}

impl Indexer {
    fn encode(&mut self, var: Variable) -> u32 {
        let sparse = var.index() as u32;
        match self {
            Indexer::Sparse => sparse,
            Indexer::Dense(index) => index.encode(sparse),
        }
    }
}

/// Accumulates linear/quadratic coefficients plus a constant offset.
struct BqmSink {
    indexer: Indexer,
    linear: Linear,
    quadratic: Quadratic,
    offset: f64,
}

impl BqmSink {
    fn new(indexer: Indexer) -> Self {
        Self {
            indexer,
            linear: Linear::new(),
            quadratic: Quadratic::new(),
            offset: 0.0,
        }
    }
}

impl TermSink for BqmSink {
    fn ignore(&self, _term: &[Variable], coeff: f64) -> bool {
        coeff == 0.0
    }

    fn insert_or_add(&mut self, term: &[Variable], coeff: f64) {
        match *term {
            [] => self.offset += coeff,
            [v] => {
                let i = self.indexer.encode(v);
                *self.linear.entry(i).or_insert(0.0) += coeff;
            }
            // x*x = x for binary-valued variables, so an equal-handle pair
            // is a linear term.
            [a, b] if a == b => {
                let i = self.indexer.encode(a);
                *self.linear.entry(i).or_insert(0.0) += coeff;
            }
            [a, b] => {
                let i = self.indexer.encode(a);
                let j = self.indexer.encode(b);
                let key = if i <= j { (i, j) } else { (j, i) };
                *self.quadratic.entry(key).or_insert(0.0) += coeff;
            }
            _ => unreachable!("term above dimension {} after reduction", REDUCE_LIMIT),
        }
    }
}

/// Like [`BqmSink`], but single-variable terms land on the matrix diagonal.
struct QuboSink {
    inner: BqmSink,
}

impl QuboSink {
    fn diagonal(&mut self, v: Variable, coeff: f64) {
        let i = self.inner.indexer.encode(v);
        *self.inner.quadratic.entry((i, i)).or_insert(0.0) += coeff;
    }
}

impl TermSink for QuboSink {
    fn ignore(&self, term: &[Variable], coeff: f64) -> bool {
        self.inner.ignore(term, coeff)
    }

    fn insert_or_add(&mut self, term: &[Variable], coeff: f64) {
        match *term {
            [v] => self.diagonal(v, coeff),
            [a, b] if a == b => self.diagonal(a, coeff),
            _ => self.inner.insert_or_add(term, coeff),
        }
    }
}

// Generation.
impl Model {
    /// Generates binary-quadratic-model coefficients:
    /// `(linear, quadratic, offset)` keyed by sparse variable ids.
    pub fn create_bqm_params(
        &self,
        compiled: &Compiled,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<(Linear, Quadratic, f64)> {
        let mut sink = BqmSink::new(Indexer::Sparse);
        self.generate_into(compiled, &mut sink, feed, strength)?;
        Ok((sink.linear, sink.quadratic, sink.offset))
    }

    /// [`Model::create_bqm_params`] with dense re-indexing.
    pub fn create_bqm_params_dense(
        &self,
        compiled: &Compiled,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<(Linear, Quadratic, f64, DenseIndex)> {
        let mut sink = BqmSink::new(Indexer::Dense(DenseIndex::default()));
        self.generate_into(compiled, &mut sink, feed, strength)?;
        let index = match sink.indexer {
            Indexer::Dense(index) => index,
            Indexer::Sparse => unreachable!(),
        };
        Ok((sink.linear, sink.quadratic, sink.offset, index))
    }

    /// Generates an upper-triangular QUBO matrix with single-variable terms
    /// on the diagonal, plus the constant offset.
    pub fn create_qubo(
        &self,
        compiled: &Compiled,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<(Quadratic, f64)> {
        let mut sink = QuboSink {
            inner: BqmSink::new(Indexer::Sparse),
        };
        self.generate_into(compiled, &mut sink, feed, strength)?;
        Ok((sink.inner.quadratic, sink.inner.offset))
    }

    /// [`Model::create_qubo`] with dense re-indexing.
    pub fn create_qubo_dense(
        &self,
        compiled: &Compiled,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<(Quadratic, f64, DenseIndex)> {
        let mut sink = QuboSink {
            inner: BqmSink::new(Indexer::Dense(DenseIndex::default())),
        };
        self.generate_into(compiled, &mut sink, feed, strength)?;
        let index = match sink.inner.indexer {
            Indexer::Dense(index) => index,
            Indexer::Sparse => unreachable!(),
        };
        Ok((sink.inner.quadratic, sink.inner.offset, index))
    }

    /// Generates Ising coefficients `(h, j, offset)` by converting the BQM
    /// form into the spin domain via `x = (s + 1) / 2`.
    pub fn create_ising(
        &self,
        compiled: &Compiled,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<(Linear, Quadratic, f64)> {
        let (linear, quadratic, offset) = self.create_bqm_params(compiled, feed, strength)?;
        Ok(bqm_to_ising(linear, quadratic, offset))
    }

    /// [`Model::create_ising`] with dense re-indexing.
    pub fn create_ising_dense(
        &self,
        compiled: &Compiled,
        feed: &FeedDict,
        strength: f64,
    ) -> Result<(Linear, Quadratic, f64, DenseIndex)> {
        let (linear, quadratic, offset, index) =
            self.create_bqm_params_dense(compiled, feed, strength)?;
        let (h, j, offset) = bqm_to_ising(linear, quadratic, offset);
        Ok((h, j, offset, index))
    }
}

/// `a·x = a/2·s + a/2` and `b·x_u·x_v = b/4·(s_u·s_v + s_u + s_v + 1)`.
fn bqm_to_ising(linear: Linear, quadratic: Quadratic, mut offset: f64) -> (Linear, Quadratic, f64) {
    let mut h = Linear::new();
    let mut j = Quadratic::new();
    for (i, a) in linear {
        *h.entry(i).or_insert(0.0) += a / 2.0;
        offset += a / 2.0;
    }
    for ((u, v), b) in quadratic {
        *j.entry((u, v)).or_insert(0.0) += b / 4.0;
        *h.entry(u).or_insert(0.0) += b / 4.0;
        *h.entry(v).or_insert(0.0) += b / 4.0;
        offset += b / 4.0;
    }
    (h, j, offset)
}

/// Sample evaluation results.
#[derive(Debug, Clone)]
pub struct Report {
    /// Energy of the compiled expression (penalty terms excluded).
    pub energy: f64,
    /// Sampled values keyed by variable name, in each variable's own
    /// domain.
    pub sample: HashMap<String, i32>,
    /// Fixed values keyed by variable name.
    pub fixed: HashMap<String, i32>,
    /// Energies of labeled sub-objectives.
    pub subh_energies: HashMap<String, f64>,
    /// `(broken, energy)` per labeled constraint; a constraint is broken
    /// when its comparison does not hold.
    pub constraint_energies: HashMap<String, (bool, f64)>,
}

impl Report {
    /// Value of a variable by name, falling back to the fixed set.
    pub fn value(&self, name: &str) -> Option<i32> {
        self.sample
            .get(name)
            .or_else(|| self.fixed.get(name))
            .copied()
    }

    /// Constraints sorted by label; with `only_broken`, satisfied ones are
    /// filtered out.
    pub fn constraints(&self, only_broken: bool) -> Vec<(&str, bool, f64)> {
        let mut out: Vec<(&str, bool, f64)> = self
            .constraint_energies
            .iter()
            .filter(|(_, &(broken, _))| broken || !only_broken)
            .map(|(label, &(broken, energy))| (label.as_str(), broken, energy))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

#[derive(Default)]
struct ReportObserver {
    subs: HashMap<String, f64>,
    constraints: HashMap<String, (bool, f64)>,
}

impl EnergyObserver for ReportObserver {
    fn sub_objective(&mut self, label: &str, energy: f64) {
        self.subs.insert(label.to_string(), energy);
    }

    fn constraint(&mut self, label: &str, energy: f64, satisfied: bool) {
        self.constraints.insert(label.to_string(), (!satisfied, energy));
    }
}

// Reporting.
impl Model {
    /// Evaluates a solver sample against a compiled expression.
    ///
    /// `sample` is keyed by sparse variable ids with values in the
    /// `vartype` domain the solver reported in; values are converted to
    /// each variable's own domain first. Ids naming no variable of this
    /// model and values outside the reporting domain are rejected;
    /// variables missing from both the sample and the fixed set raise
    /// [`Error::UnsampledVariable`].
    pub fn report(
        &self,
        compiled: &Compiled,
        sample: &Sample,
        vartype: Vartype,
        feed: &FeedDict,
    ) -> Result<Report> {
        let native = self.ctx.convert_sample(sample, vartype)?;
        let fixed = self.fixed.borrow().clone();

        let mut var_value = |var: Variable| -> Result<f64> {
            let id = var.index() as u32;
            native
                .get(&id)
                .or_else(|| fixed.get(&id))
                .map(|&v| v as f64)
                .ok_or_else(|| Error::UnsampledVariable(self.decode_var_name(id)))
        };

        let mut observer = ReportObserver::default();
        let evaluator = EnergyEvaluator::new(&self.ctx, feed);
        let energy = evaluator.energy(compiled.root, &mut var_value, &mut observer)?;

        let decode = |values: &Sample| -> HashMap<String, i32> {
            values
                .iter()
                .map(|(&id, &value)| (self.decode_var_name(id), value))
                .collect()
        };

        Ok(Report {
            energy,
            sample: decode(&native),
            fixed: decode(&fixed),
            subh_energies: observer.subs,
            constraint_energies: observer.constraints,
        })
    }

    /// [`Model::report`] for a dense-keyed solver sample.
    pub fn report_dense(
        &self,
        compiled: &Compiled,
        sample: &Sample,
        index: &DenseIndex,
        vartype: Vartype,
        feed: &FeedDict,
    ) -> Result<Report> {
        self.report(compiled, &index.decode_sample(sample), vartype, feed)
    }

    /// The display name of a variable id: its registered name, or a
    /// synthesized one for anonymous variables, made unique against the
    /// registered names.
    pub fn decode_var_name(&self, id: u32) -> String {
        let var = Variable::from_index(id as usize);
        let name = self.ctx.var_name(var);
        if !name.is_empty() {
            return name;
        }
        let mut candidate = format!("_{}", var);
        while self.ctx.var_of(&candidate).is_some() {
            candidate.push('_');
        }
        candidate
    }

    /// Rewrites linear coefficients to be keyed by variable name.
    pub fn decode_linear(&self, linear: &Linear) -> HashMap<String, f64> {
        linear
            .iter()
            .map(|(&id, &coeff)| (self.decode_var_name(id), coeff))
            .collect()
    }

    /// Rewrites quadratic coefficients to be keyed by variable-name pairs.
    pub fn decode_quadratic(&self, quadratic: &Quadratic) -> HashMap<(String, String), f64> {
        quadratic
            .iter()
            .map(|(&(u, v), &coeff)| {
                ((self.decode_var_name(u), self.decode_var_name(v)), coeff)
            })
            .collect()
    }
}

//! # qubo-rs: a QUBO/Ising compiler in Rust
//!
//! **`qubo-rs`** turns symbolic expressions over binary and spin decision
//! variables into **QUBO** (quadratic unconstrained binary optimization)
//! and **Ising** objectives consumable by annealers and other
//! combinatorial-optimization solvers. It compiles and generates models; it
//! does not solve them.
//!
//! ## How it works
//!
//! Expressions are built as a hash-consed AST inside a [`Context`][crate::context::Context]:
//! constants, placeholders, products, and conditions are interned so that
//! structural equality is a handle comparison. Compilation lowers the AST
//! into a sparse multilinear polynomial whose coefficients stay *symbolic*,
//! so named [placeholders][crate::context::Context::placeholder] are
//! resolved only at generation time against a feed dict. Terms above degree
//! 2 are quadratized with ancilla variables and AND-enforcing penalty
//! gadgets before they reach the coefficient sinks.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: everything goes through the
//!   [`Context`][crate::context::Context] (usually via the
//!   [`Model`][crate::model::Model] façade), ensuring hash consing and
//!   canonical monomials.
//! - **Operator Syntax**: [`Express`][crate::express::Express] handles
//!   support `+`, `-`, `*` against each other and `f64`, plus `pow`,
//!   labeled sub-objectives, and comparison-based constraints.
//! - **Spin and Binary Domains**: spin variables are embedded into the
//!   binary domain (`s = 2b - 1`) exactly once, at the variable leaf.
//! - **Deferred Coefficients**: placeholders let one compiled model be
//!   generated many times with different weights.
//! - **Reports**: solver samples are evaluated back on the original AST
//!   with per-sub-objective and per-constraint energies.
//!
//! ## Basic Usage
//!
//! ```rust
//! use qubo_rs::model::Model;
//! use qubo_rs::reduce::DEFAULT_STRENGTH;
//!
//! let model = Model::new();
//! let x = model.add_binary("x")?;
//! let y = model.add_binary("y")?;
//!
//! // H = (x + y - 1)^2
//! let h = (x + y - 1.0).pow(2)?;
//!
//! let compiled = model.compile(h);
//! let feed = Default::default();
//! let (qubo, offset) = model.create_qubo(&compiled, &feed, DEFAULT_STRENGTH)?;
//!
//! assert_eq!(offset, 1.0);
//! assert_eq!(qubo[&(0, 1)], 2.0);
//! # Ok::<(), qubo_rs::error::Error>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`model`]**: the [`Model`][crate::model::Model] façade: variables,
//!   fixing, compilation, QUBO/BQM/Ising generation, reports.
//! - **[`context`]**: the interning store behind everything.
//! - **[`express`]**: operator-overloaded expression building.
//! - **[`compile`]**, **[`poly`]**, **[`reduce`]**: the compilation
//!   pipeline, for callers that need custom term sinks.

pub mod compile;
pub mod context;
pub mod error;
pub mod express;
pub mod model;
pub mod poly;
pub mod reduce;
pub mod reference;
pub mod types;

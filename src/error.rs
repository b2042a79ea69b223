//! Caller-visible errors.
//!
//! Everything here is a precondition violation reachable from caller input.
//! Internal invariant violations (a reduced term still above dimension 2 at
//! final emission, an out-of-range handle) are defects and panic instead.

use thiserror::Error;

use crate::types::Vartype;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("a variable named `{0}` already exists")]
    DuplicateVariable(String),

    #[error("exponent must be at least 1")]
    ZeroExponent,

    #[error("division by zero")]
    DivisionByZero,

    #[error("placeholder `{0}` is not present in the feed dict")]
    MissingPlaceholder(String),

    #[error("variable `{0}` appeared where only a constant expression is valid")]
    NonConstant(String),

    #[error("`fix` expects a variable expression")]
    NotAVariable,

    #[error("value {value} is not valid for a {vartype} variable")]
    InvalidValue { value: i32, vartype: Vartype },

    #[error("variable `{0}` is missing from the sample")]
    UnsampledVariable(String),

    #[error("sample refers to unknown variable id {0}")]
    UnknownVariableId(u32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

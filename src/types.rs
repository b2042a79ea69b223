//! Variable domains, comparison operators, and the sample/feed aliases
//! shared across the crate.

use std::collections::HashMap;
use std::fmt;

/// The domain of a decision variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Vartype {
    /// Spin variables take values in `{-1, +1}`.
    Spin,
    /// Binary variables take values in `{0, 1}`.
    Binary,
}

impl fmt::Display for Vartype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vartype::Spin => write!(f, "Spin"),
            Vartype::Binary => write!(f, "Binary"),
        }
    }
}

/// Checks whether `value` is a member of the given domain.
pub fn is_valid_value(value: i32, vartype: Vartype) -> bool {
    match vartype {
        Vartype::Spin => value == -1 || value == 1,
        Vartype::Binary => value == 0 || value == 1,
    }
}

/// Converts a domain value between `Spin` and `Binary` encodings
/// (`s = 2b - 1`).
///
/// The value must be valid for `from`.
pub fn convert_value(value: i32, from: Vartype, to: Vartype) -> i32 {
    debug_assert!(is_valid_value(value, from), "invalid domain value");
    match (from, to) {
        (Vartype::Spin, Vartype::Binary) => (value + 1) / 2,
        (Vartype::Binary, Vartype::Spin) => 2 * value - 1,
        _ => value,
    }
}

/// A comparison operator against a numeric right-hand side.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    /// Applies the comparison to `lhs <op> rhs`.
    pub fn invoke(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        };
        write!(f, "{}", s)
    }
}

/// An assignment of domain values to variables, keyed by variable index.
///
/// Depending on whether a dense re-indexing adapter was used the keys are
/// either original (sparse) indices or contiguous `0..n` solver indices.
pub type Sample = HashMap<u32, i32>;

/// Placeholder name to value mapping, supplied at generation time only.
pub type FeedDict = HashMap<String, f64>;

/// Linear (single-variable) coefficients of a generated model.
pub type Linear = HashMap<u32, f64>;

/// Quadratic (variable-pair) coefficients of a generated model.
pub type Quadratic = HashMap<(u32, u32), f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_values() {
        assert!(is_valid_value(-1, Vartype::Spin));
        assert!(is_valid_value(1, Vartype::Spin));
        assert!(!is_valid_value(0, Vartype::Spin));
        assert!(is_valid_value(0, Vartype::Binary));
        assert!(is_valid_value(1, Vartype::Binary));
        assert!(!is_valid_value(-1, Vartype::Binary));
    }

    #[test]
    fn test_convert_value() {
        assert_eq!(convert_value(-1, Vartype::Spin, Vartype::Binary), 0);
        assert_eq!(convert_value(1, Vartype::Spin, Vartype::Binary), 1);
        assert_eq!(convert_value(0, Vartype::Binary, Vartype::Spin), -1);
        assert_eq!(convert_value(1, Vartype::Binary, Vartype::Spin), 1);
        assert_eq!(convert_value(1, Vartype::Binary, Vartype::Binary), 1);
    }

    #[test]
    fn test_cmp_invoke() {
        assert!(CmpOp::Eq.invoke(0.0, 0.0));
        assert!(CmpOp::Ne.invoke(1.0, 0.0));
        assert!(CmpOp::Gt.invoke(2.0, 1.0));
        assert!(CmpOp::Ge.invoke(1.0, 1.0));
        assert!(CmpOp::Lt.invoke(0.5, 1.0));
        assert!(CmpOp::Le.invoke(1.0, 1.0));
        assert!(!CmpOp::Eq.invoke(1.0, 0.0));
    }
}

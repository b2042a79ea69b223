//! Opaque integer handles for the entities owned by a [`Context`][crate::context::Context].
//!
//! Handles are `u32` newtypes with 0 reserved as the `none` sentinel, so live
//! handles are 1-indexed. Equality and ordering are O(1) by construction:
//! the owning store guarantees that structurally identical content maps to
//! the same handle wherever interning applies.

use std::fmt;

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            /// The invalid sentinel handle.
            pub const NONE: Self = Self(0);

            /// Creates a handle from a 0-based arena index.
            pub fn from_index(index: usize) -> Self {
                assert!(index < u32::MAX as usize, "handle index out of bounds");
                Self(index as u32 + 1)
            }

            /// Returns the 0-based arena index.
            ///
            /// # Panics
            ///
            /// Panics if the handle is the `none` sentinel.
            pub fn index(self) -> usize {
                assert!(self.is_valid(), "`none` handle has no index");
                self.0 as usize - 1
            }

            pub fn is_none(self) -> bool {
                self.0 == 0
            }

            pub fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}{}", $prefix, self.0 - 1)
                } else {
                    write!(f, "{}(none)", $prefix)
                }
            }
        }
    };
}

handle!(
    /// A decision variable.
    ///
    /// Variables are created once, are immutable, and live for the lifetime
    /// of the owning `Context`. Handles are assigned monotonically starting
    /// above the `none` sentinel.
    Variable,
    'v'
);

handle!(
    /// An expression node in the append-only expression table.
    Expr,
    'e'
);

handle!(
    /// A canonical monomial: an ascending-sorted sequence of variables.
    ///
    /// Two products built from the same sequence of variables anywhere in
    /// the system map to the same handle. `Product::NONE` is the empty
    /// product and keys the constant term of a polynomial.
    Product,
    'p'
);

handle!(
    /// An interned `(comparison operator, right-hand side)` pair.
    Condition,
    'c'
);

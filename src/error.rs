//! Typed errors at the crate's validation boundary.
//!
//! The two Dantzig drivers in [`crate::fast`] and [`crate::basic`] never
//! return a `Result`: per the error-handling design, their preconditions are
//! the caller's responsibility and numerical breakdown is a soft, in-band
//! outcome reported through [`crate::diagnostics`], not a propagated error.
//! [`LcpError`] exists one level up, at the checked constructor
//! ([`crate::BoxedLcp::try_new`]) a caller passes through before the
//! unchecked kernel is reachable at all.

use derive_more::{Display, Error};
use problemo::Problem;
use problemo::common::IntoCommonProblem;

/// Errors raised while validating inputs before a solve, or while factoring
/// a clamped block that the caller promised was SPD.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq)]
pub enum LcpError {
    /// `n == 0`; the problem must have at least one variable.
    #[display("n must be positive, got {n}")]
    EmptyProblem {
        /// The offending dimension.
        n: usize,
    },

    /// One of the parallel vectors did not have length `n`.
    #[display("expected a length-{expected} vector, got length {actual}")]
    DimensionMismatch {
        /// Required length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// `nskip < n`; the padded leading dimension must cover every column.
    #[display("nskip ({nskip}) must be at least n ({n})")]
    NskipTooSmall {
        /// Problem size.
        n: usize,
        /// Supplied leading dimension.
        nskip: usize,
    },

    /// `nub` was not in `0..=n`.
    #[display("nub ({nub}) must be at most n ({n})")]
    NubOutOfRange {
        /// Problem size.
        n: usize,
        /// Supplied unbounded-prefix count.
        nub: usize,
    },

    /// `lo[index] > 0` or `hi[index] < 0` for some `index >= nub`.
    #[display("bounds at index {index} must satisfy lo <= 0 <= hi")]
    BoundsViolated {
        /// The offending index.
        index: usize,
    },

    /// `findex[index] >= 0` for an index inside the unbounded prefix.
    #[display("findex[{index}] must be negative for indices inside the unbounded prefix")]
    FindexViolatesPrefix {
        /// The offending index.
        index: usize,
    },

    /// A diagonal pivot of the LDLᵀ factorization was not greater than the
    /// configured tolerance. Under the caller's SPD contract this cannot
    /// happen for the clamped block built by the checked constructor; it is
    /// reported as a typed error regardless so `factor_ldlt` is independently
    /// testable against non-SPD inputs.
    #[display("non-positive pivot at column {pivot_col}")]
    NonPositivePivot {
        /// The column where the pivot was found to be non-positive.
        pivot_col: usize,
    },

    /// A non-finite value (NaN/∞) appeared where a finite one was required.
    #[display("non-finite value encountered at column {pivot_col}")]
    NonFinite {
        /// The column being processed when the non-finite value appeared.
        pivot_col: usize,
    },

    /// `SolveConfig::row_pointers` was set to `true`. The row-pointer
    /// swap mode is deliberately left unimplemented, matching the source
    /// this crate is derived from, which raises at runtime rather than
    /// supporting it.
    #[display("row-pointer storage mode is not implemented")]
    RowPointersUnsupported,
}

impl From<LcpError> for Problem {
    fn from(err: LcpError) -> Self {
        err.to_string().gloss()
    }
}

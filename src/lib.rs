//! A boxed Linear Complementarity Problem (LCP) solver built around
//! Dantzig's principal-pivoting algorithm over an incrementally
//! maintained LDLᵀ factorization of the clamped submatrix.
//!
//! This is the inner numerical kernel of a rigid-body constraint
//! stepper: given a dense symmetric positive (semi-)definite system
//! `A*x = b + w` with per-index box bounds `lo <= x <= hi` (and
//! optionally a friction-coupling linkage via `findex`), it produces a
//! complementary `(x, w)` pair by introducing variables one at a time
//! and updating — never refactoring — the factorization of the active
//! ("clamped") set as it evolves.
//!
//! Two unchecked entry points do the actual solving: [`fast::solve_lcp`]
//! (the lo/hi bounded driver with optional friction coupling) and
//! [`basic::solve_lcp_basic`] (the non-negativity-only driver used for
//! validation and simpler cases). Both are internal kernels: their
//! preconditions are the caller's responsibility, matching how the
//! rest of this crate's dense factorization primitives treat their own
//! preconditions as debug assertions rather than recoverable errors.
//! [`BoxedLcp`] sits one level up as the checked constructor a caller
//! passes through before either kernel is reachable at all.

pub mod basic;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fast;
pub mod lcp;
pub mod linalg;
pub mod permuted;
pub mod selftest;

pub use config::{NubPolicy, SelfTestConfig, SolveConfig};
pub use diagnostics::{Diagnostics, StderrDiagnostics, VecDiagnostics};
pub use error::LcpError;
pub use permuted::NO_FINDEX;

/// The element type this crate solves over. The source this crate is
/// derived from supports both `f32` and `f64` builds with different
/// `nskip` padding policies (pad-to-4 for single, pad-to-2 for double);
/// this crate targets `f64` only and pads to a multiple of 2.
pub type E = f64;

/// Round `n` up to the next multiple of the padding this crate uses
/// for `nskip` (2, matching the source's own double-precision padding
/// policy). Callers building their own `A` buffer can use this to size
/// it; `BoxedLcp::try_new` accepts any `nskip >= n`, padded or not.
pub fn pad(n: usize) -> usize {
    n.div_ceil(2) * 2
}

/// A validated boxed LCP, ready to be solved through the fast driver.
///
/// Construction (`try_new`) is the crate's single fallible entry
/// point: it checks every precondition that would otherwise be a
/// violation (dimensions, `nskip`, `nub` range, `lo <= 0 <= hi` for
/// indices at or beyond `nub`, and the `findex` unbounded-prefix
/// contract) and returns a typed [`LcpError`] rather than panicking.
/// Once a `BoxedLcp` exists, [`BoxedLcp::solve`] is infallible in the
/// type system: it returns the solved `(x, w)` pair directly, with
/// numerical breakdown reported only through the supplied
/// [`Diagnostics`] sink, never as an `Err`.
#[derive(Debug, Clone)]
pub struct BoxedLcp {
    n: usize,
    nskip: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    lo: Vec<f64>,
    hi: Vec<f64>,
    nub: usize,
    findex: Option<Vec<i64>>,
    config: SolveConfig,
}

impl BoxedLcp {
    /// Validate and package a dense LCP for solving.
    ///
    /// `a` must be `n * nskip` long, row-major, with only the lower
    /// triangle meaningful. `b`, `lo`, `hi` (and `findex`, if present)
    /// must each have length `n`.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        n: usize,
        nskip: usize,
        a: Vec<f64>,
        b: Vec<f64>,
        lo: Vec<f64>,
        hi: Vec<f64>,
        nub: usize,
        findex: Option<Vec<i64>>,
        config: SolveConfig,
    ) -> Result<Self, LcpError> {
        if n == 0 {
            return Err(LcpError::EmptyProblem { n });
        }
        if nskip < n {
            return Err(LcpError::NskipTooSmall { n, nskip });
        }
        if a.len() != n * nskip {
            return Err(LcpError::DimensionMismatch {
                expected: n * nskip,
                actual: a.len(),
            });
        }
        let expect_len = |actual: usize| -> Result<(), LcpError> {
            if actual == n {
                Ok(())
            } else {
                Err(LcpError::DimensionMismatch { expected: n, actual })
            }
        };
        expect_len(b.len())?;
        expect_len(lo.len())?;
        expect_len(hi.len())?;
        if let Some(f) = &findex {
            expect_len(f.len())?;
        }
        if nub > n {
            return Err(LcpError::NubOutOfRange { n, nub });
        }
        if config.row_pointers {
            return Err(LcpError::RowPointersUnsupported);
        }
        for i in nub..n {
            if lo[i] > 0.0 || hi[i] < 0.0 {
                return Err(LcpError::BoundsViolated { index: i });
            }
        }
        if let Some(f) = &findex {
            for i in 0..nub {
                if f[i] >= 0 {
                    return Err(LcpError::FindexViolatesPrefix { index: i });
                }
            }
        }

        Ok(Self {
            n,
            nskip,
            a,
            b,
            lo,
            hi,
            nub,
            findex,
            config,
        })
    }

    /// Problem size.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Solve this problem with the fast (lo/hi bounded, friction-coupled)
    /// driver, reporting any numerical breakdown through `diagnostics`.
    /// Returns `(x, w)`, both length `n`, in the caller's original index
    /// order.
    pub fn solve(&self, diagnostics: &mut dyn Diagnostics) -> (Vec<f64>, Vec<f64>) {
        let mut x = vec![0.0; self.n];
        let mut w = vec![0.0; self.n];
        fast::solve_lcp(
            self.n,
            self.nskip,
            &self.a,
            &mut x,
            &self.b,
            &mut w,
            self.nub,
            &self.lo,
            &self.hi,
            self.findex.as_deref(),
            &self.config,
            diagnostics,
        );
        (x, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_rounds_up_to_even() {
        assert_eq!(pad(1), 2);
        assert_eq!(pad(2), 2);
        assert_eq!(pad(7), 8);
    }

    #[test]
    fn try_new_rejects_empty_problem() {
        let err = BoxedLcp::try_new(
            0,
            0,
            vec![],
            vec![],
            vec![],
            vec![],
            0,
            None,
            SolveConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, LcpError::EmptyProblem { n: 0 });
    }

    #[test]
    fn try_new_rejects_bounds_violation() {
        let err = BoxedLcp::try_new(
            1,
            2,
            vec![2.0, 0.0],
            vec![1.0],
            vec![1.0],
            vec![f64::INFINITY],
            0,
            None,
            SolveConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, LcpError::BoundsViolated { index: 0 });
    }

    #[test]
    fn try_new_rejects_findex_inside_unbounded_prefix() {
        let a = vec![2.0, 0.0, 0.0, 2.0];
        let err = BoxedLcp::try_new(
            2,
            2,
            a,
            vec![1.0, 1.0],
            vec![f64::NEG_INFINITY, 0.0],
            vec![f64::INFINITY, f64::INFINITY],
            1,
            Some(vec![0, -1]),
            SolveConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, LcpError::FindexViolatesPrefix { index: 0 });
    }

    #[test]
    fn try_new_rejects_row_pointer_mode() {
        let a = vec![2.0];
        let cfg = SolveConfig {
            row_pointers: true,
            ..SolveConfig::default()
        };
        let err = BoxedLcp::try_new(
            1,
            1,
            a,
            vec![1.0],
            vec![0.0],
            vec![f64::INFINITY],
            0,
            None,
            cfg,
        )
        .unwrap_err();
        assert_eq!(err, LcpError::RowPointersUnsupported);
    }

    #[test]
    fn solve_round_trips_a_simple_problem() {
        let boxed = BoxedLcp::try_new(
            1,
            1,
            vec![2.0],
            vec![3.0],
            vec![0.0],
            vec![f64::INFINITY],
            0,
            None,
            SolveConfig::default(),
        )
        .unwrap();
        let mut sink = VecDiagnostics::new();
        let (x, w) = boxed.solve(&mut sink);
        assert!((x[0] - 1.5).abs() < 1e-9);
        assert!(w[0].abs() < 1e-9);
        assert!(sink.lines().is_empty());
    }
}

//! Tolerances and toggles a caller may want to persist or hot-reload
//! alongside the rest of a simulation's own configuration.

use serde::{Deserialize, Serialize};

/// Solver tolerances for a single [`crate::solve_lcp`] / [`crate::solve_lcp_basic`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveConfig {
    /// Pivot floor for `factor_ldlt`: a diagonal pivot at or below this
    /// value is reported as [`crate::error::LcpError::NonPositivePivot`]
    /// rather than accepted.
    pub singular_tol: f64,
    /// Breakdown guard for the inner pivoting loop: a step `s <= breakdown_eps`
    /// is treated as numerical breakdown rather than a valid (possibly zero)
    /// step.
    pub breakdown_eps: f64,
    /// Row-pointer swap mode. Always rejected at the validation boundary
    /// today; see [`crate::error::LcpError::RowPointersUnsupported`].
    pub row_pointers: bool,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            singular_tol: 1e-12,
            breakdown_eps: 0.0,
            row_pointers: false,
        }
    }
}

/// How the self-test harness picks the unbounded-prefix size `nub` for each
/// generated problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NubPolicy {
    /// Always use the same `nub` for every generated problem.
    Fixed(usize),
    /// Draw `nub` uniformly from `0..n` for each generated problem.
    Random,
}

impl Default for NubPolicy {
    fn default() -> Self {
        Self::Fixed(50)
    }
}

/// Configuration for [`crate::selftest::test_solve_lcp`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelfTestConfig {
    /// Size of each generated random SPD problem.
    pub n: usize,
    /// Number of random problems to generate and solve.
    pub problem_count: usize,
    /// How `nub` is chosen per problem.
    pub nub: NubPolicy,
    /// Solver tolerances applied to every generated problem.
    pub solve: SolveConfig,
    /// Maximum allowed `||A*x - b - w||_inf`.
    pub residual_tol: f64,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            n: 100,
            problem_count: 1000,
            nub: NubPolicy::default(),
            solve: SolveConfig::default(),
            residual_tol: 1e-9,
        }
    }
}

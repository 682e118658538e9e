//! The fast (lo/hi bounded, friction-coupled) Dantzig driver.
//!
//! This is the hot path of the whole crate: one principal-pivoting pass
//! over `[nub, n)`, each index either placed cheaply or driven to a
//! boundary through a sequence of search-direction steps against the
//! incrementally maintained factorization of `A[C,C]`.

use crate::config::SolveConfig;
use crate::diagnostics::Diagnostics;
use crate::error::LcpError;
use crate::lcp;
use crate::linalg::dense::{factor_ldlt, solve_ldlt};
use crate::permuted::{BoundState, PermutedProblem};

/// Unwrap a factorization result that the caller's SPD contract promises
/// cannot fail. Debug builds get a descriptive panic; release builds still
/// panic (via `unreachable!`) rather than silently running with a garbage
/// factor, matching the "non-SPD clamped block: assertion" taxonomy.
fn assert_ok<T>(result: Result<T, LcpError>) -> T {
    match result {
        Ok(v) => v,
        Err(err) => {
            debug_assert!(false, "clamped block factorization failed: {err}");
            unreachable!("clamped block factorization failed under the caller's SPD contract")
        }
    }
}

/// The smallest positive step along a search direction and what to do when
/// it is reached.
enum PivotCmd {
    /// cmd 1: `w[i]` reached zero — `i` joins `C`.
    EnterC,
    /// cmd 2: `x[i]` reached `lo[i]` — `i` joins `N` pinned low.
    PinLo,
    /// cmd 3: `x[i]` reached `hi[i]` — `i` joins `N` pinned high.
    PinHi,
    /// cmd 4: `w[k]` (`k` in `N`) reached zero — `k` moves to `C`.
    NToC(usize),
    /// cmd 5/6: `x[k]` (`k` in `C`) reached one of its bounds — `k` moves
    /// to `N` pinned at `bound`.
    CToN { k: usize, bound: BoundState },
}

/// Solve the lo/hi bounded LCP `A*x = b + w` with optional friction
/// coupling via `findex`, in place over `x` and `w`.
///
/// `a` is row-major with leading dimension `nskip >= n`; only its lower
/// triangle is read. Preconditions (`n > 0`, `nskip >= n`, `nub <= n`,
/// `lo[i] <= 0 <= hi[i]` for `i >= nub`, `findex[i] < 0` for `i < nub`) are
/// the caller's responsibility — see [`crate::BoxedLcp`] for a checked
/// entry point that validates them before this function is reachable.
#[allow(clippy::too_many_arguments)]
pub fn solve_lcp(
    n: usize,
    nskip: usize,
    a: &[f64],
    x: &mut [f64],
    b: &[f64],
    w: &mut [f64],
    nub: usize,
    lo: &[f64],
    hi: &[f64],
    findex: Option<&[i64]>,
    cfg: &SolveConfig,
    diagnostics: &mut dyn Diagnostics,
) {
    debug_assert!(n > 0, "n must be positive");
    debug_assert!(nskip >= n, "nskip must cover n");
    debug_assert!(nub <= n, "nub must be at most n");

    if nub >= n {
        // The whole problem is unbounded: a plain linear solve.
        let mut l = a.to_vec();
        let mut d = vec![0.0; n];
        assert_ok(factor_ldlt(&mut l, &mut d, n, nskip, cfg.singular_tol));
        let mut solved = b.to_vec();
        solve_ldlt(&l, &d, &mut solved, n, nskip);
        x.copy_from_slice(&solved);
        w.fill(0.0);
        return;
    }

    let mut problem = PermutedProblem::new(
        n,
        nskip,
        a.to_vec(),
        b.to_vec(),
        lo.to_vec(),
        hi.to_vec(),
        findex.map(<[i64]>::to_vec),
    );

    let mut nub = nub;
    prescan_unbounded(&mut problem, &mut nub);
    partition_friction_rows(&mut problem, nub);

    assert_ok(problem.factor_initial(nub, cfg));

    let mut friction_finalized = false;
    let mut unperm_scratch = vec![0.0; n];

    let mut i = nub;
    while i < n {
        if !friction_finalized && is_friction(&problem, i) {
            finalize_friction_bounds(&mut problem, i, &mut unperm_scratch);
            friction_finalized = true;
        }

        let wi = lcp::aic_dot_qc(&problem, i, &problem.x) + lcp::ain_dot_qn(&problem, i, &problem.x)
            - problem.b[i];
        problem.w[i] = wi;

        if cheap_place(&mut problem, i, cfg) {
            i += 1;
            continue;
        }

        if run_pivoting_loop(&mut problem, i, cfg) {
            i += 1;
        } else {
            diagnostics.report(&format!(
                "numerical breakdown in fast driver at permuted index {i}"
            ));
            for k in i..n {
                problem.x[k] = 0.0;
                problem.w[k] = 0.0;
            }
            break;
        }
    }

    problem.unpermute_into(x, w);
}

/// Move every remaining free index (`lo = -inf`, `hi = +inf`, no friction
/// coupling) down into the unbounded prefix, growing `nub`.
fn prescan_unbounded(problem: &mut PermutedProblem, nub: &mut usize) {
    let mut k = *nub;
    while k < problem.n {
        let free = problem.lo[k] == f64::NEG_INFINITY
            && problem.hi[k] == f64::INFINITY
            && problem.findex.as_ref().is_none_or(|f| f[k] < 0);
        if free {
            problem.swap_problem(k, *nub);
            *nub += 1;
        }
        k += 1;
    }
}

/// Move every friction row (`findex[k] >= 0`) to the very end of
/// `[nub, n)`. Relative order within each group is not preserved.
fn partition_friction_rows(problem: &mut PermutedProblem, nub: usize) {
    if problem.findex.is_none() {
        return;
    }
    let mut boundary = nub;
    for k in nub..problem.n {
        let non_friction = problem.findex.as_ref().unwrap()[k] < 0;
        if non_friction {
            problem.swap_problem(k, boundary);
            boundary += 1;
        }
    }
}

fn is_friction(problem: &PermutedProblem, i: usize) -> bool {
    problem.findex.as_ref().is_some_and(|f| f[i] >= 0)
}

/// Un-permute `x` into `scratch` (keyed by original index) and finalize the
/// lo/hi bounds of every row from `i` onward whose `findex` is set.
fn finalize_friction_bounds(problem: &mut PermutedProblem, i: usize, scratch: &mut [f64]) {
    for k in 0..problem.n {
        scratch[problem.p[k]] = problem.x[k];
    }
    for k in i..problem.n {
        let fi = match &problem.findex {
            Some(f) => f[k],
            None => continue,
        };
        if fi < 0 {
            continue;
        }
        let magnitude = (problem.hi[k] * scratch[fi as usize]).abs();
        problem.hi[k] = magnitude;
        problem.lo[k] = -magnitude;
    }
}

/// Try to place `i` without entering the pivoting loop: a zero lower bound
/// with non-negative residual, a zero upper bound with non-positive
/// residual, or an already-zero residual (degenerate membership in `C`).
fn cheap_place(problem: &mut PermutedProblem, i: usize, cfg: &SolveConfig) -> bool {
    let wi = problem.w[i];
    if problem.lo[i] == 0.0 && wi >= 0.0 {
        lcp::pin_at_bound(problem, i, BoundState::Lo);
        lcp::transfer_i_to_n(problem);
        return true;
    }
    if problem.hi[i] == 0.0 && wi <= 0.0 {
        lcp::pin_at_bound(problem, i, BoundState::Hi);
        lcp::transfer_i_to_n(problem);
        return true;
    }
    if wi == 0.0 {
        assert_ok(lcp::transfer_i_to_c(problem, i, cfg));
        return true;
    }
    false
}

/// Drive index `i` through the pivoting loop until it lands in `C` or `N`.
/// Returns `false` on numerical breakdown (the caller is responsible for
/// zeroing the tail and un-permuting).
fn run_pivoting_loop(problem: &mut PermutedProblem, i: usize, cfg: &SolveConfig) -> bool {
    loop {
        let dir = if problem.w[i] <= 0.0 { 1.0 } else { -1.0 };
        let nc = problem.nc;

        // `(L, d)` is stored in factorization-row order, which only agrees
        // with position order while `c` is the identity; gather the solve's
        // right-hand side through `c[]` and scatter the solution back the
        // same way so every position-indexed consumer below sees `delta_x`
        // in position order regardless of how `C` has been compacted.
        let mut delta_row = vec![0.0; nc];
        for k in 0..nc {
            delta_row[k] = -dir * problem.a_sym(i, problem.c[k]);
        }
        solve_ldlt(&problem.l, &problem.d, &mut delta_row, nc, problem.nskip);

        let mut delta_x = vec![0.0; problem.n];
        for k in 0..nc {
            delta_x[problem.c[k]] = delta_row[k];
        }
        delta_x[i] = dir;

        let mut delta_w = vec![0.0; problem.n];
        lcp::matvec_n_from_c(problem, &delta_x[..nc], &mut delta_w);
        lcp::axpy_col_signed_n(problem, &mut delta_w, dir, i);
        delta_w[i] = lcp::aic_dot_qc(problem, i, &delta_x) + lcp::aii(problem, i) * dir;

        let Some((s, cmd)) = find_step(problem, i, dir, &delta_x, &delta_w) else {
            return false;
        };
        if s <= cfg.breakdown_eps {
            return false;
        }

        lcp::axpy_c(&mut problem.x, nc, s, &delta_x);
        problem.x[i] += s * dir;
        lcp::axpy_n(&mut problem.w, nc, problem.nn, s, &delta_w);
        problem.w[i] += s * delta_w[i];

        match cmd {
            PivotCmd::EnterC => {
                assert_ok(lcp::transfer_i_to_c(problem, i, cfg));
                return true;
            }
            PivotCmd::PinLo => {
                lcp::pin_at_bound(problem, i, BoundState::Lo);
                lcp::transfer_i_to_n(problem);
                return true;
            }
            PivotCmd::PinHi => {
                lcp::pin_at_bound(problem, i, BoundState::Hi);
                lcp::transfer_i_to_n(problem);
                return true;
            }
            PivotCmd::NToC(k) => {
                assert_ok(lcp::transfer_i_from_n_to_c(problem, k, cfg));
            }
            PivotCmd::CToN { k, bound } => {
                lcp::transfer_i_from_c_to_n(problem, k);
                lcp::pin_at_bound(problem, k, bound);
            }
        }
    }
}

/// Find the smallest strictly-positive step along `(delta_x, delta_w)`
/// that hits a boundary, and which boundary it is. Ties are broken by
/// candidate-class order (1, 2, 3, 4 over `N` in position order, 5/6 over
/// `C` in position order): later candidates only displace the incumbent
/// when strictly smaller.
fn find_step(
    problem: &PermutedProblem,
    i: usize,
    dir: f64,
    delta_x: &[f64],
    delta_w: &[f64],
) -> Option<(f64, PivotCmd)> {
    let mut best: Option<(f64, PivotCmd)> = None;
    let mut consider = |s: f64, cmd: PivotCmd, best: &mut Option<(f64, PivotCmd)>| {
        if s.is_finite() && s > 0.0 && best.as_ref().is_none_or(|(bs, _)| s < *bs) {
            *best = Some((s, cmd));
        }
    };

    // Candidate 1: w[i] reaches zero.
    if delta_w[i] != 0.0 {
        consider(-problem.w[i] / delta_w[i], PivotCmd::EnterC, &mut best);
    }
    // Candidates 2/3: x[i] reaches one of its own bounds.
    consider(
        (problem.lo[i] - problem.x[i]) / dir,
        PivotCmd::PinLo,
        &mut best,
    );
    consider(
        (problem.hi[i] - problem.x[i]) / dir,
        PivotCmd::PinHi,
        &mut best,
    );
    // Candidate 4: an N-member's residual reaches zero.
    for k in problem.nc..problem.nc + problem.nn {
        if problem.lo[k] == 0.0 && problem.hi[k] == 0.0 {
            continue;
        }
        if delta_w[k] == 0.0 {
            continue;
        }
        consider(-problem.w[k] / delta_w[k], PivotCmd::NToC(k), &mut best);
    }
    // Candidates 5/6: a C-member (beyond the unbounded prefix) reaches one
    // of its bounds.
    for k in problem.nub..problem.nc {
        if delta_x[k] == 0.0 {
            continue;
        }
        consider(
            (problem.lo[k] - problem.x[k]) / delta_x[k],
            PivotCmd::CToN {
                k,
                bound: BoundState::Lo,
            },
            &mut best,
        );
        consider(
            (problem.hi[k] - problem.x[k]) / delta_x[k],
            PivotCmd::CToN {
                k,
                bound: BoundState::Hi,
            },
            &mut best,
        );
    }

    best
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::diagnostics::VecDiagnostics;

    fn run(
        n: usize,
        a: &[f64],
        b: &[f64],
        lo: &[f64],
        hi: &[f64],
        nub: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut x = vec![0.0; n];
        let mut w = vec![0.0; n];
        let mut sink = VecDiagnostics::new();
        solve_lcp(
            n,
            n,
            a,
            &mut x,
            b,
            &mut w,
            nub,
            lo,
            hi,
            None,
            &SolveConfig::default(),
            &mut sink,
        );
        (x, w)
    }

    #[test]
    fn scenario_1_single_free_index() {
        let (x, w) = run(1, &[2.0], &[3.0], &[0.0], &[f64::INFINITY], 0);
        assert!((x[0] - 1.5).abs() < 1e-9);
        assert!(w[0].abs() < 1e-9);
    }

    #[test]
    fn scenario_2_pinned_at_lo() {
        let (x, w) = run(1, &[2.0], &[-3.0], &[0.0], &[f64::INFINITY], 0);
        assert!(x[0].abs() < 1e-9);
        assert!((w[0] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_3_mixed_two_variable() {
        let a = [2.0, 0.0, 0.0, 2.0];
        let (x, w) = run(2, &a, &[1.0, -1.0], &[0.0, 0.0], &[f64::INFINITY; 2], 0);
        assert!((x[0] - 0.5).abs() < 1e-9);
        assert!(x[1].abs() < 1e-9);
        assert!(w[0].abs() < 1e-9);
        assert!((w[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_4_all_unbounded_shortcut() {
        let a = [4.0, 0.0, 1.0, 3.0];
        let (x, w) = run(
            2,
            &a,
            &[1.0, 2.0],
            &[f64::NEG_INFINITY; 2],
            &[f64::INFINITY; 2],
            2,
        );
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-9);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-9);
        assert!(w[0].abs() < 1e-9);
        assert!(w[1].abs() < 1e-9);
    }

    #[test]
    fn scenario_5_hi_clamping() {
        let a = [2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0];
        let lo = [-1.0, -1.0, -1.0];
        let hi = [0.25, 0.25, 1.0];
        let (x, w) = run(3, &a, &[1.0, 1.0, 1.0], &lo, &hi, 0);
        assert!((x[0] - 0.25).abs() < 1e-9);
        assert!((x[1] - 0.25).abs() < 1e-9);
        assert!((x[2] - 0.5).abs() < 1e-9);
        assert!((w[0] - (-0.5)).abs() < 1e-9);
        assert!((w[1] - (-0.5)).abs() < 1e-9);
        assert!(w[2].abs() < 1e-9);
    }

    #[test]
    fn friction_coupling_finalizes_bounds_once() {
        // Index 1 is a friction row scaled against index 0's solved x; hi
        // starts as a coefficient (1.5) and is finalized to
        // |1.5 * x[0]| at the point index 1 is first visited.
        let a = [2.0, 0.0, 0.0, 2.0];
        let b = [1.0, 0.5];
        let lo = [0.0, -1.0];
        let hi = [f64::INFINITY, 1.5];
        let findex = [-1i64, 0];
        let mut x = vec![0.0; 2];
        let mut w = vec![0.0; 2];
        let mut sink = VecDiagnostics::new();
        solve_lcp(
            2,
            2,
            &a,
            &mut x,
            &b,
            &mut w,
            0,
            &lo,
            &hi,
            Some(&findex),
            &SolveConfig::default(),
            &mut sink,
        );
        // x[0] solves 2*x0 = 1 + w0 with lo=0: x0 = 0.5, w0 = 0.
        assert!((x[0] - 0.5).abs() < 1e-9);
        // finalized hi[1] = |1.5 * 0.5| = 0.75, lo[1] = -0.75; b[1]=0.5 is
        // within (-0.75, 0.75) so index 1 lands in C with w[1] = 0.
        assert!((x[1] - 0.25).abs() < 1e-9);
        assert!(w[1].abs() < 1e-9);
    }

    #[rstest]
    fn diagonal_system_solves_regardless_of_unbounded_prefix_size(
        #[values(0, 1, 2, 3)] nub: usize,
    ) {
        // A 3x3 diagonal SPD system with every variable free: the answer
        // (x = b / diag) must come out the same whether the unbounded
        // prefix is pre-scanned from nub=0 or supplied directly.
        let a = [2.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 6.0];
        let b = [2.0, 8.0, 12.0];
        let lo = [f64::NEG_INFINITY; 3];
        let hi = [f64::INFINITY; 3];
        let (x, w) = run(3, &a, &b, &lo, &hi, nub);
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 2.0).abs() < 1e-9);
        assert!((x[2] - 2.0).abs() < 1e-9);
        for wi in w {
            assert!(wi.abs() < 1e-9);
        }
    }
}

//! The basic driver. Same `C`/`N` bookkeeping and incremental factor
//! as the fast driver, stripped to pure non-negativity: no `findex`, no
//! unbounded prefix, `dir` fixed at `+1`, and the own-bound candidates (2,
//! 3, 6) that only matter with a finite `hi` don't exist here.

use crate::config::SolveConfig;
use crate::error::LcpError;
use crate::lcp;
use crate::permuted::{BoundState, PermutedProblem};

fn assert_ok<T>(result: Result<T, LcpError>) -> T {
    match result {
        Ok(v) => v,
        Err(err) => {
            debug_assert!(false, "clamped block factorization failed: {err}");
            unreachable!("clamped block factorization failed under the caller's SPD contract")
        }
    }
}

enum PivotCmd {
    /// cmd 1: `w[i]` reached zero — `i` joins `C`.
    EnterC,
    /// cmd 4: `w[k]` (`k` in `N`) reached zero — `k` moves to `C`.
    NToC(usize),
    /// cmd 5: `x[k]` (`k` in `C`) reached its lower bound — `k` moves to
    /// `N`, pinned low.
    CToLo(usize),
}

/// Solve the non-negativity LCP `A*x = b + w`, `x >= lo`, `w >= 0` (`hi` is
/// expected to be `+inf` everywhere), `x . (w - ...)` componentwise
/// complementary, in place over `x` and `w`.
///
/// Unlike [`crate::fast::solve_lcp`] this always un-permutes before
/// returning, even on numerical breakdown — there is no early-return path
/// that skips it.
pub fn solve_lcp_basic(
    n: usize,
    nskip: usize,
    a: &[f64],
    x: &mut [f64],
    b: &[f64],
    w: &mut [f64],
    lo: &[f64],
    hi: &[f64],
) {
    debug_assert!(n > 0, "n must be positive");
    debug_assert!(nskip >= n, "nskip must cover n");

    let cfg = SolveConfig::default();
    let mut problem = PermutedProblem::new(
        n,
        nskip,
        a.to_vec(),
        b.to_vec(),
        lo.to_vec(),
        hi.to_vec(),
        None,
    );
    assert_ok(problem.factor_initial(0, &cfg));

    let mut i = 0;
    while i < n {
        let wi = lcp::aic_dot_qc(&problem, i, &problem.x) + lcp::ain_dot_qn(&problem, i, &problem.x)
            - problem.b[i];
        problem.w[i] = wi;

        if cheap_place(&mut problem, i, &cfg) {
            i += 1;
            continue;
        }

        if run_pivoting_loop(&mut problem, i, &cfg) {
            i += 1;
        } else {
            for k in i..n {
                problem.x[k] = 0.0;
                problem.w[k] = 0.0;
            }
            break;
        }
    }

    problem.unpermute_into(x, w);
}

fn cheap_place(problem: &mut PermutedProblem, i: usize, cfg: &SolveConfig) -> bool {
    let wi = problem.w[i];
    if wi == 0.0 {
        assert_ok(lcp::transfer_i_to_c(problem, i, cfg));
        return true;
    }
    if wi > 0.0 {
        lcp::pin_at_bound(problem, i, BoundState::Lo);
        lcp::transfer_i_to_n(problem);
        return true;
    }
    false
}

fn run_pivoting_loop(problem: &mut PermutedProblem, i: usize, cfg: &SolveConfig) -> bool {
    loop {
        let nc = problem.nc;

        // Gather through `c[]` (factorization-row order != position order
        // once a non-tail removal has compacted `C`) and scatter the
        // solution back through `c[]` before anything below reads `delta_x`
        // by position.
        let mut delta_row = vec![0.0; nc];
        for k in 0..nc {
            delta_row[k] = -problem.a_sym(i, problem.c[k]);
        }
        crate::linalg::dense::solve_ldlt(&problem.l, &problem.d, &mut delta_row, nc, problem.nskip);

        let mut delta_x = vec![0.0; problem.n];
        for k in 0..nc {
            delta_x[problem.c[k]] = delta_row[k];
        }
        delta_x[i] = 1.0;

        let mut delta_w = vec![0.0; problem.n];
        lcp::matvec_n_from_c(problem, &delta_x[..nc], &mut delta_w);
        lcp::axpy_col_signed_n(problem, &mut delta_w, 1.0, i);
        delta_w[i] = lcp::aic_dot_qc(problem, i, &delta_x) + lcp::aii(problem, i);

        let Some((s, cmd)) = find_step(problem, i, &delta_x, &delta_w) else {
            return false;
        };
        if s <= cfg.breakdown_eps {
            return false;
        }

        lcp::axpy_c(&mut problem.x, nc, s, &delta_x);
        problem.x[i] += s;
        lcp::axpy_n(&mut problem.w, nc, problem.nn, s, &delta_w);
        problem.w[i] += s * delta_w[i];

        match cmd {
            PivotCmd::EnterC => {
                assert_ok(lcp::transfer_i_to_c(problem, i, cfg));
                return true;
            }
            PivotCmd::NToC(k) => {
                assert_ok(lcp::transfer_i_from_n_to_c(problem, k, cfg));
            }
            PivotCmd::CToLo(k) => {
                lcp::transfer_i_from_c_to_n(problem, k);
                lcp::pin_at_bound(problem, k, BoundState::Lo);
            }
        }
    }
}

fn find_step(
    problem: &PermutedProblem,
    i: usize,
    delta_x: &[f64],
    delta_w: &[f64],
) -> Option<(f64, PivotCmd)> {
    let mut best: Option<(f64, PivotCmd)> = None;
    let mut consider = |s: f64, cmd: PivotCmd, best: &mut Option<(f64, PivotCmd)>| {
        if s.is_finite() && s > 0.0 && best.as_ref().is_none_or(|(bs, _)| s < *bs) {
            *best = Some((s, cmd));
        }
    };

    if delta_w[i] != 0.0 {
        consider(-problem.w[i] / delta_w[i], PivotCmd::EnterC, &mut best);
    }
    for k in problem.nc..problem.nc + problem.nn {
        if delta_w[k] == 0.0 {
            continue;
        }
        consider(-problem.w[k] / delta_w[k], PivotCmd::NToC(k), &mut best);
    }
    for k in problem.nub..problem.nc {
        if delta_x[k] == 0.0 {
            continue;
        }
        consider(
            (problem.lo[k] - problem.x[k]) / delta_x[k],
            PivotCmd::CToLo(k),
            &mut best,
        );
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(n: usize, a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut x = vec![0.0; n];
        let mut w = vec![0.0; n];
        let lo = vec![0.0; n];
        let hi = vec![f64::INFINITY; n];
        solve_lcp_basic(n, n, a, &mut x, b, &mut w, &lo, &hi);
        (x, w)
    }

    #[test]
    fn single_unconstrained_solution() {
        let (x, w) = run(1, &[2.0], &[3.0]);
        assert!((x[0] - 1.5).abs() < 1e-9);
        assert!(w[0].abs() < 1e-9);
    }

    #[test]
    fn single_pinned_at_zero() {
        let (x, w) = run(1, &[2.0], &[-3.0]);
        assert!(x[0].abs() < 1e-9);
        assert!((w[0] - (-3.0)).abs() < 1e-9);
    }

    #[test]
    fn two_variable_mixed() {
        let a = [2.0, 0.0, 0.0, 2.0];
        let (x, w) = run(2, &a, &[1.0, -1.0]);
        assert!((x[0] - 0.5).abs() < 1e-9);
        assert!(x[1].abs() < 1e-9);
        assert!(w[0].abs() < 1e-9);
        assert!((w[1] - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn three_variable_coupled() {
        // A = [[4,0,0],[0,3,1],[0,1,3]], b chosen so x2 is driven to 0 and
        // x1/x3 solve the reduced 2x2 system.
        let a = [4.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 1.0, 3.0];
        let (x, w) = run(3, &a, &[1.0, -2.0, 1.0]);
        assert!(x[0] > 0.0);
        assert!(w[0].abs() < 1e-9);
        for k in 0..3 {
            assert!(x[k] >= -1e-9);
            assert!(w[k] >= -1e-9);
            assert!((x[k] * w[k]).abs() < 1e-6);
        }
    }
}

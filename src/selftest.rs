//! The self-test harness. Generates random dense SPD boxed LCPs,
//! solves each with the fast driver, and checks the residual and KKT
//! conditions the driver promises to satisfy.
//!
//! Random matrix generation reuses this crate's own
//! [`crate::linalg::dense::make_random_matrix`] / `seeded_rng`, the same
//! `faer::rand`/`faer::stats` facilities this codebase's dense
//! factorization tests already rely on.

use std::time::Duration;

use faer::rand::RngCore;

use crate::config::{NubPolicy, SelfTestConfig};
use crate::diagnostics::Diagnostics;
use crate::fast::solve_lcp;
use crate::linalg::dense::{clear_upper_triangle, make_random_matrix, multiply2, seeded_rng};

/// Classification tolerance for the three KKT segments. Looser than the
/// residual tolerance because `x`/`w` can carry more accumulated error
/// than the single `A*x - b - w` combination does.
const KKT_TOL: f64 = 1e-6;

/// Outcome of one generated problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KktClass {
    AtLo,
    AtHi,
    Interior,
}

/// Aggregate results of [`test_solve_lcp`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelfTestReport {
    /// Number of problems generated and solved.
    pub problems_run: usize,
    /// Number of problems whose residual exceeded `residual_tol`.
    pub residual_failures: usize,
    /// Number of indices (summed over all problems) that did not land on
    /// any of the three KKT segments within [`KKT_TOL`].
    pub kkt_failures: usize,
    /// Indices (summed over all problems) pinned at their lower bound.
    pub at_lo: usize,
    /// Indices (summed over all problems) pinned at their upper bound.
    pub at_hi: usize,
    /// Indices (summed over all problems) strictly interior (`w = 0`).
    pub interior: usize,
    /// Wall-clock time spent generating and solving every problem.
    pub elapsed: Duration,
}

impl SelfTestReport {
    /// `true` if every problem's residual and every index's KKT
    /// classification passed.
    pub fn all_passed(&self) -> bool {
        self.residual_failures == 0 && self.kkt_failures == 0
    }
}

/// Run [`SelfTestConfig::problem_count`] random SPD boxed LCPs through the
/// fast driver, reporting pass/fail lines to `diagnostics` and returning
/// the aggregate counts.
pub fn test_solve_lcp(cfg: &SelfTestConfig, diagnostics: &mut dyn Diagnostics) -> SelfTestReport {
    let n = cfg.n;
    let nskip = crate::pad(n);
    let mut rng = seeded_rng(0xbeef_1234);
    let mut report = SelfTestReport {
        problems_run: cfg.problem_count,
        ..Default::default()
    };

    let started = std::time::Instant::now();
    for problem_idx in 0..cfg.problem_count {
        let a_prime = make_random_matrix(n, nskip, &mut rng);
        let mut a = vec![0.0; n * nskip];
        multiply2(&mut a, &a_prime, &a_prime, n, nskip);
        clear_upper_triangle(&mut a, n, nskip);

        let nub = match cfg.nub {
            NubPolicy::Fixed(k) => k.min(n),
            NubPolicy::Random => (rng.next_u64() % (n as u64 + 1)) as usize,
        };

        let mut lo = vec![0.0; n];
        let mut hi = vec![0.0; n];
        let mut x_feasible = vec![0.0; n];
        for i in 0..n {
            if i < nub {
                lo[i] = f64::NEG_INFINITY;
                hi[i] = f64::INFINITY;
                x_feasible[i] = uniform(&mut rng, -1.0, 1.0);
            } else {
                let span = uniform(&mut rng, 0.1, 2.0);
                lo[i] = -span;
                hi[i] = uniform(&mut rng, 0.1, 2.0);
                x_feasible[i] = uniform(&mut rng, lo[i], hi[i]);
            }
        }

        let b_exact = sym_matvec(&a, &x_feasible, n, nskip);
        let b: Vec<f64> = b_exact
            .iter()
            .map(|&v| v + uniform(&mut rng, -1e-6, 1e-6))
            .collect();

        let mut x = vec![0.0; n];
        let mut w = vec![0.0; n];
        solve_lcp(
            n, nskip, &a, &mut x, &b, &mut w, nub, &lo, &hi, None, &cfg.solve, diagnostics,
        );

        let residual = sym_matvec(&a, &x, n, nskip)
            .iter()
            .zip(b.iter().zip(w.iter()))
            .map(|(axi, (bi, wi))| (axi - bi - wi).abs())
            .fold(0.0_f64, f64::max);
        if residual > cfg.residual_tol {
            report.residual_failures += 1;
            diagnostics.report(&format!(
                "problem {problem_idx}: residual {residual:e} exceeds tolerance {:e}",
                cfg.residual_tol
            ));
        }

        for i in 0..n {
            match classify(x[i], w[i], lo[i], hi[i]) {
                Some(KktClass::AtLo) => report.at_lo += 1,
                Some(KktClass::AtHi) => report.at_hi += 1,
                Some(KktClass::Interior) => report.interior += 1,
                None => {
                    report.kkt_failures += 1;
                    diagnostics.report(&format!(
                        "problem {problem_idx}: index {i} failed KKT classification \
                         (x={}, w={}, lo={}, hi={})",
                        x[i], w[i], lo[i], hi[i]
                    ));
                }
            }
        }
    }
    report.elapsed = started.elapsed();

    diagnostics.report(&format!(
        "test_solve_lcp: {} problems, {} residual failures, {} kkt failures \
         (lo={}, hi={}, interior={}), {:?} elapsed",
        report.problems_run,
        report.residual_failures,
        report.kkt_failures,
        report.at_lo,
        report.at_hi,
        report.interior,
        report.elapsed
    ));
    report
}

fn classify(x: f64, w: f64, lo: f64, hi: f64) -> Option<KktClass> {
    if (x - lo).abs() <= KKT_TOL && w >= -KKT_TOL {
        return Some(KktClass::AtLo);
    }
    if (x - hi).abs() <= KKT_TOL && w <= KKT_TOL {
        return Some(KktClass::AtHi);
    }
    if w.abs() <= KKT_TOL && x >= lo - KKT_TOL && x <= hi + KKT_TOL {
        return Some(KktClass::Interior);
    }
    None
}

fn uniform(rng: &mut impl RngCore, lo: f64, hi: f64) -> f64 {
    let frac = (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
    lo + frac * (hi - lo)
}

/// `A * v` treating `a` as fully symmetric (only the lower triangle is
/// stored; the upper triangle is read through its mirrored entry).
fn sym_matvec(a: &[f64], v: &[f64], n: usize, nskip: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    for i in 0..n {
        let mut acc = 0.0;
        for j in 0..n {
            let val = if i >= j {
                a[i * nskip + j]
            } else {
                a[j * nskip + i]
            };
            acc = val.mul_add(v[j], acc);
        }
        out[i] = acc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::VecDiagnostics;

    #[test]
    fn small_battery_passes() {
        let cfg = SelfTestConfig {
            n: 12,
            problem_count: 20,
            nub: NubPolicy::Fixed(4),
            ..SelfTestConfig::default()
        };
        let mut sink = VecDiagnostics::new();
        let report = test_solve_lcp(&cfg, &mut sink);
        assert_eq!(report.problems_run, 20);
        assert!(report.all_passed(), "sink lines: {:?}", sink.lines());
        assert!(report.at_lo + report.at_hi + report.interior > 0);
    }

    #[test]
    fn random_nub_policy_also_passes() {
        let cfg = SelfTestConfig {
            n: 10,
            problem_count: 10,
            nub: NubPolicy::Random,
            ..SelfTestConfig::default()
        };
        let mut sink = VecDiagnostics::new();
        let report = test_solve_lcp(&cfg, &mut sink);
        assert!(report.all_passed(), "sink lines: {:?}", sink.lines());
    }

    #[test]
    fn classify_handles_all_three_segments() {
        assert_eq!(classify(0.0, 1.0, 0.0, 5.0), Some(KktClass::AtLo));
        assert_eq!(classify(5.0, -1.0, 0.0, 5.0), Some(KktClass::AtHi));
        assert_eq!(classify(2.0, 0.0, 0.0, 5.0), Some(KktClass::Interior));
        assert_eq!(classify(2.0, 1.0, 0.0, 5.0), None);
    }
}

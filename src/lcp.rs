//! The LCP object — index-set bookkeeping and the restricted
//! dot-products / AXPYs the Dantzig drivers need, expressed directly over a
//! [`PermutedProblem`]'s contiguous `C`/`N` slices.

use crate::config::SolveConfig;
use crate::error::LcpError;
use crate::linalg::dense::{dot, dot_offset};
use crate::linalg::update::{append_row_to_factor, remove_from_factor};
use crate::permuted::{BoundState, PermutedProblem};

/// `A[i,i]`.
#[inline]
pub fn aii(problem: &PermutedProblem, i: usize) -> f64 {
    problem.a_at(i, i)
}

/// `sum_{k<nC} A[i,k] * q[k]`.
#[inline]
pub fn aic_dot_qc(problem: &PermutedProblem, i: usize, q: &[f64]) -> f64 {
    dot(problem.a_row(i), 0, q, problem.nc)
}

/// `sum_{k=nC..nC+nN} A[i,k] * q[k]`.
#[inline]
pub fn ain_dot_qn(problem: &PermutedProblem, i: usize, q: &[f64]) -> f64 {
    dot_offset(problem.a_row(i), problem.nc, q, problem.nc, problem.nn)
}

/// `pC[0..nC] += s * qC[0..nC]` (restricted AXPY over the clamped prefix).
/// Takes `nc` directly, rather than `&PermutedProblem`, so callers can pass
/// a slice borrowed from the same struct (e.g. `problem.x`) without a
/// double-borrow.
pub fn axpy_c(dst: &mut [f64], nc: usize, s: f64, q: &[f64]) {
    for k in 0..nc {
        dst[k] += s * q[k];
    }
}

/// `pN += s * qN` over the contiguous `[nC, nC+nN)` segment.
pub fn axpy_n(dst: &mut [f64], nc: usize, nn: usize, s: f64, q: &[f64]) {
    for k in nc..nc + nn {
        dst[k] += s * q[k];
    }
}

/// `p[N] = A[N,C] * qC`: dense matrix-vector across the `N`-block rows and
/// `C`-block columns.
pub fn matvec_n_from_c(problem: &PermutedProblem, q_c: &[f64], out: &mut [f64]) {
    for k in problem.nc..problem.nc + problem.nn {
        out[k] = aic_dot_qc(problem, k, q_c);
    }
}

/// `p[N] += sign * A[:, i]` restricted to `N` — a column-wise AXPY reading
/// through the symmetric accessor since only the lower triangle is stored.
pub fn axpy_col_signed_n(problem: &PermutedProblem, out: &mut [f64], sign: f64, i: usize) {
    for k in problem.nc..problem.nc + problem.nn {
        out[k] += sign * problem.a_sym(k, i);
    }
}

/// Append `i` into `C`: fold its row into the incremental factor, then move
/// it to position `nC` (the tail of the clamped block) and bump `nC`.
///
/// Returns the `Dℓ` scratch vector the factor update produced, so the
/// driver can reuse it as the right-hand side of the search-direction
/// solve without repeating the triangular solve.
pub fn transfer_i_to_c(
    problem: &mut PermutedProblem,
    i: usize,
    cfg: &SolveConfig,
) -> Result<Vec<f64>, LcpError> {
    let a_row = problem.a_row(i).to_vec();
    let a_ii = problem.a_at(i, i);
    let nub = problem.nub;
    let nc = problem.nc;

    let dl = append_row_to_factor(
        &mut problem.l,
        &mut problem.d,
        &a_row,
        a_ii,
        &problem.c,
        nc,
        problem.nskip,
        nub,
    );
    let pivot = 1.0 / problem.d[nc];
    if !pivot.is_finite() || pivot <= cfg.singular_tol {
        return Err(LcpError::NonPositivePivot { pivot_col: nc });
    }

    problem.swap_problem(i, nc);
    // `C` stores *positions*, and positions `0..nC` are exactly the clamped
    // set at all times; the new member now lives at position `nc` (not at
    // its pre-swap position `i`), so that is the value recorded here.
    problem.c[nc] = nc;
    problem.nc += 1;
    Ok(dl)
}

/// Mark `i` as joining `N`. Under the outer loop's invariant `i` already
/// sits at position `nC + nN`, so no swap is required; only `nN` grows.
pub fn transfer_i_to_n(problem: &mut PermutedProblem) {
    problem.nn += 1;
}

/// Identical to [`transfer_i_to_c`] except `nN` is decremented (the index
/// was already counted in `N` and is moving to `C` instead).
pub fn transfer_i_from_n_to_c(
    problem: &mut PermutedProblem,
    i: usize,
    cfg: &SolveConfig,
) -> Result<Vec<f64>, LcpError> {
    let dl = transfer_i_to_c(problem, i, cfg)?;
    problem.nn -= 1;
    Ok(dl)
}

/// Remove `i` from `C`: locate its slot in `C[]`, apply the symmetric
/// factor downdate, compact `C[]`, move position `i` to the new tail of
/// the clamped block (`nC - 1`), decrement `nC`, and grow `N`.
pub fn transfer_i_from_c_to_n(problem: &mut PermutedProblem, i: usize) {
    let j = problem.c[..problem.nc]
        .iter()
        .position(|&pos| pos == i)
        .expect("index being removed from C must be present in C");

    remove_from_factor(&mut problem.l, &mut problem.d, problem.nc, j, problem.nskip);
    for k in j..(problem.nc - 1) {
        problem.c[k] = problem.c[k + 1];
    }

    let tail = problem.nc - 1;
    problem.nc -= 1;
    problem.swap_problem(i, tail);
    if i != tail {
        // Whichever still-clamped member was sitting at `tail` just moved
        // to `i`; its slot in `C[]` still says `tail` and must be
        // repointed, or the next `append_row_to_factor` gather would read
        // the wrong row.
        if let Some(slot) = problem.c[..problem.nc].iter().position(|&pos| pos == tail) {
            problem.c[slot] = i;
        }
    }
    problem.nn += 1;
}

/// Set `x[i]` and `state[i]` to pin a non-clamped index at one of its
/// bounds.
pub fn pin_at_bound(problem: &mut PermutedProblem, i: usize, bound: BoundState) {
    problem.x[i] = match bound {
        BoundState::Lo => problem.lo[i],
        BoundState::Hi => problem.hi[i],
    };
    problem.state[i] = bound;
}

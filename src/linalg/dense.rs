//! Dense BLAS-lite primitives: LDLᵀ factor/solve, triangular solves, fused
//! dot products, and the handful of whole-matrix utilities the self-test
//! needs. Every buffer here is row-major with leading dimension `nskip`;
//! callers are responsible for `nskip >= n`.
//!
//! The inner loops are written as `f64::mul_add` chains rather than plain
//! `+=`/`*` so the compiler can fuse them into a single instruction where
//! the target supports it — the same trick this codebase's other dense
//! kernels already rely on.

use faer::Mat;
use faer::rand::SeedableRng;
use faer::rand::rngs::StdRng;
use faer::stats::DistributionExt;
use faer::stats::prelude::{CwiseMatDistribution, StandardNormal};

use crate::error::LcpError;

#[inline]
fn at(buf: &[f64], row: usize, col: usize, nskip: usize) -> f64 {
    buf[row * nskip + col]
}

#[inline]
fn set_at(buf: &mut [f64], row: usize, col: usize, nskip: usize, value: f64) {
    buf[row * nskip + col] = value;
}

/// Fused dot product of `a[a_off..a_off+n]` against `b[0..n]`.
pub fn dot(a: &[f64], a_off: usize, b: &[f64], n: usize) -> f64 {
    let mut acc = 0.0;
    for k in 0..n {
        acc = a[a_off + k].mul_add(b[k], acc);
    }
    acc
}

/// Fused dot product of `a[a_off..a_off+n]` against `b[b_off..b_off+n]`.
pub fn dot_offset(a: &[f64], a_off: usize, b: &[f64], b_off: usize, n: usize) -> f64 {
    let mut acc = 0.0;
    for k in 0..n {
        acc = a[a_off + k].mul_add(b[b_off + k], acc);
    }
    acc
}

/// Zero an entire buffer.
pub fn set_zero(buf: &mut [f64]) {
    buf.fill(0.0);
}

/// Zero the strict upper triangle of an `n x n` block, leaving the lower
/// triangle (the only semantically meaningful part of `A`) untouched.
pub fn clear_upper_triangle(a: &mut [f64], n: usize, nskip: usize) {
    for i in 0..n {
        for j in (i + 1)..n {
            set_at(a, i, j, nskip, 0.0);
        }
    }
}

/// `max_i |a[i] - b[i]|` over two equal-length buffers.
pub fn max_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0_f64, f64::max)
}

/// Forward substitution: solve `L*y = b` in place, where `L` is the
/// unit-lower-triangular `n x n` block of `l` (leading dimension `nskip`).
/// `b` is overwritten with `y`.
pub fn solve_l1(l: &[f64], b: &mut [f64], n: usize, nskip: usize) {
    for i in 0..n {
        let acc = dot(&l[i * nskip..], 0, b, i);
        b[i] -= acc;
    }
}

/// Backward substitution: solve `L^T*y = b` in place against the same `L`
/// used by [`solve_l1`]. `b` is overwritten with `y`.
pub fn solve_l1t(l: &[f64], b: &mut [f64], n: usize, nskip: usize) {
    for i in (0..n).rev() {
        let mut acc = 0.0;
        for k in (i + 1)..n {
            acc = at(l, k, i, nskip).mul_add(b[k], acc);
        }
        b[i] -= acc;
    }
}

/// Solve `(L*D*L^T)*x = b` in place, writing `x` over `b`.
pub fn solve_ldlt(l: &[f64], d: &[f64], b: &mut [f64], n: usize, nskip: usize) {
    solve_l1(l, b, n, nskip);
    for i in 0..n {
        b[i] *= d[i];
    }
    solve_l1t(l, b, n, nskip);
}

/// In-place LDLᵀ factorization of the `n x n` lower triangle of `a`
/// (leading dimension `nskip`). On success, `a`'s strict lower triangle
/// holds `L` (unit diagonal implicit) and `d[i]` holds `1/D[i,i]`.
///
/// Fails if a diagonal pivot is not strictly greater than `tol`; under the
/// caller's SPD contract this does not happen for a correctly constructed
/// clamped block, but the primitive reports it rather than asserting so it
/// stays independently testable.
pub fn factor_ldlt(a: &mut [f64], d: &mut [f64], n: usize, nskip: usize, tol: f64) -> Result<(), LcpError> {
    let mut y = vec![0.0; n];
    for j in 0..n {
        for k in 0..j {
            y[k] = at(a, j, k, nskip);
        }
        solve_l1(a, &mut y[..j], j, nskip);

        let mut cross = 0.0;
        for k in 0..j {
            let l_jk = y[k] * d[k];
            cross = l_jk.mul_add(y[k], cross);
            set_at(a, j, k, nskip, l_jk);
        }

        let pivot = at(a, j, j, nskip) - cross;
        if !pivot.is_finite() {
            return Err(LcpError::NonFinite { pivot_col: j });
        }
        if pivot <= tol {
            return Err(LcpError::NonPositivePivot { pivot_col: j });
        }
        d[j] = 1.0 / pivot;
    }
    Ok(())
}

/// `c = a * b` over three `n x n` blocks sharing leading dimension `nskip`.
pub fn multiply0(c: &mut [f64], a: &[f64], b: &[f64], n: usize, nskip: usize) {
    for i in 0..n {
        for j in 0..n {
            let mut acc = 0.0;
            for k in 0..n {
                acc = at(a, i, k, nskip).mul_add(at(b, k, j, nskip), acc);
            }
            set_at(c, i, j, nskip, acc);
        }
    }
}

/// `c = a * b^T` over three `n x n` blocks sharing leading dimension `nskip`.
pub fn multiply2(c: &mut [f64], a: &[f64], b: &[f64], n: usize, nskip: usize) {
    for i in 0..n {
        for j in 0..n {
            let mut acc = 0.0;
            for k in 0..n {
                acc = at(a, i, k, nskip).mul_add(at(b, j, k, nskip), acc);
            }
            set_at(c, i, j, nskip, acc);
        }
    }
}

/// Fill a fresh `n x n` buffer (leading dimension `nskip`, zero-padded) with
/// independent standard-normal entries, for the self-test's random problem
/// generation.
pub fn make_random_matrix(n: usize, nskip: usize, rng: &mut StdRng) -> Vec<f64> {
    let sample: Mat<f64> = CwiseMatDistribution {
        nrows: n,
        ncols: n,
        dist: StandardNormal,
    }
    .sample(rng);

    let mut buf = vec![0.0; n * nskip];
    for i in 0..n {
        for j in 0..n {
            set_at(&mut buf, i, j, nskip, sample[(i, j)]);
        }
    }
    buf
}

/// Seed a fresh generator the way the self-test's battery of random
/// problems does, so individual tests can reproduce a specific draw.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

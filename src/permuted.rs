//! The permuted problem state. A single dense buffer `a` plus a
//! handful of parallel vectors, kept aligned under every row/column swap,
//! with an incrementally maintained LDLᵀ factor of the clamped block
//! layered on top.

use crate::config::SolveConfig;
use crate::error::LcpError;
use crate::linalg::dense::{factor_ldlt, solve_ldlt};

/// Sentinel stored in `findex` for an index with no friction coupling.
pub const NO_FINDEX: i64 = -1;

/// Which bound a non-clamped index currently sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BoundState {
    /// `x[i] == lo[i]`.
    Lo = 0,
    /// `x[i] == hi[i]`.
    Hi = 1,
}

/// The dense permuted LCP state: `A, x, b, w, lo, hi` under permutation `p`,
/// the active-set bookkeeping `C`/`nC`/`nN`, and the incremental LDLᵀ factor
/// `(L, d)` of `A[C,C]`.
///
/// Every array here is indexed in *permuted* (position) space except `p`
/// itself, which maps position -> original index. All scratch is owned by
/// this value and dropped with it; nothing survives across solves.
#[allow(non_snake_case)]
pub struct PermutedProblem {
    pub(crate) n: usize,
    pub(crate) nskip: usize,

    /// Row-major `n x n` buffer, leading dimension `nskip`. Only the lower
    /// triangle is meaningful.
    pub(crate) a: Vec<f64>,
    pub(crate) x: Vec<f64>,
    pub(crate) b: Vec<f64>,
    pub(crate) w: Vec<f64>,
    pub(crate) lo: Vec<f64>,
    pub(crate) hi: Vec<f64>,
    pub(crate) p: Vec<usize>,
    pub(crate) state: Vec<BoundState>,
    pub(crate) findex: Option<Vec<i64>>,

    /// Active-set permutation: `c[0..nc]` holds the positions of the
    /// clamped indices, in factorization order.
    pub(crate) c: Vec<usize>,
    pub(crate) nc: usize,
    pub(crate) nn: usize,

    /// LDLᵀ factor of `A[C,C]`, same layout as `a`.
    pub(crate) l: Vec<f64>,
    pub(crate) d: Vec<f64>,

    /// Size of the unbounded prefix; positions `< nub` never move once the
    /// initial factorization is built (see DESIGN NOTES, the "nub
    /// optimization").
    pub(crate) nub: usize,
}

impl PermutedProblem {
    /// Build a fresh permuted problem over `n` variables with padded
    /// leading dimension `nskip`. `a` must already be `n * nskip` long,
    /// row-major, lower-triangle meaningful. `p` starts as the identity
    /// permutation and `state` starts at `Lo` for every index.
    pub fn new(
        n: usize,
        nskip: usize,
        a: Vec<f64>,
        b: Vec<f64>,
        lo: Vec<f64>,
        hi: Vec<f64>,
        findex: Option<Vec<i64>>,
    ) -> Self {
        debug_assert_eq!(a.len(), n * nskip);
        debug_assert_eq!(b.len(), n);
        debug_assert_eq!(lo.len(), n);
        debug_assert_eq!(hi.len(), n);
        if let Some(f) = &findex {
            debug_assert_eq!(f.len(), n);
        }

        Self {
            n,
            nskip,
            a,
            x: vec![0.0; n],
            b,
            w: vec![0.0; n],
            lo,
            hi,
            p: (0..n).collect(),
            state: vec![BoundState::Lo; n],
            findex,
            c: vec![0; n],
            nc: 0,
            nn: 0,
            l: vec![0.0; n * nskip],
            d: vec![0.0; n],
            nub: 0,
        }
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn a_at(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.nskip + col]
    }

    #[inline]
    pub fn a_row(&self, row: usize) -> &[f64] {
        &self.a[row * self.nskip..row * self.nskip + self.n]
    }

    /// Read `A[i,j]` regardless of which of `i, j` is larger, since only
    /// the lower triangle is stored.
    #[inline]
    pub fn a_sym(&self, i: usize, j: usize) -> f64 {
        if i >= j {
            self.a_at(i, j)
        } else {
            self.a_at(j, i)
        }
    }

    /// Symmetric swap of positions `i1` and `i2` in `a`'s lower triangle.
    /// Touches only the lower triangle; no-op if `i1 == i2`.
    pub fn swap_rows_and_cols(&mut self, i1: usize, i2: usize) {
        if i1 == i2 {
            return;
        }
        let (lo_pos, hi_pos) = if i1 < i2 { (i1, i2) } else { (i2, i1) };
        let nskip = self.nskip;

        // Diagonal entries.
        let d_lo = self.a[lo_pos * nskip + lo_pos];
        let d_hi = self.a[hi_pos * nskip + hi_pos];
        self.a[lo_pos * nskip + lo_pos] = d_hi;
        self.a[hi_pos * nskip + hi_pos] = d_lo;

        // Rows strictly between lo_pos and hi_pos: column lo_pos <-> row
        // hi_pos's entry at that column.
        for k in (lo_pos + 1)..hi_pos {
            let a_k_lo = self.a[k * nskip + lo_pos];
            let a_hi_k = self.a[hi_pos * nskip + k];
            self.a[k * nskip + lo_pos] = a_hi_k;
            self.a[hi_pos * nskip + k] = a_k_lo;
        }

        // Rows before lo_pos: swap the two columns.
        for k in 0..lo_pos {
            let a_k_lo = self.a[lo_pos * nskip + k];
            let a_k_hi = self.a[hi_pos * nskip + k];
            self.a[lo_pos * nskip + k] = a_k_hi;
            self.a[hi_pos * nskip + k] = a_k_lo;
        }

        // Rows after hi_pos: swap the two columns.
        for k in (hi_pos + 1)..self.n {
            let a_k_lo = self.a[k * nskip + lo_pos];
            let a_k_hi = self.a[k * nskip + hi_pos];
            self.a[k * nskip + lo_pos] = a_k_hi;
            self.a[k * nskip + hi_pos] = a_k_lo;
        }
    }

    /// Symmetric swap of positions `i1` and `i2` across `a` and every
    /// parallel vector (`x, b, w, lo, hi, p, state, findex`). `i1 <= i2`
    /// is expected but not required; this is a no-op when `i1 == i2`.
    pub fn swap_problem(&mut self, i1: usize, i2: usize) {
        if i1 == i2 {
            return;
        }
        self.swap_rows_and_cols(i1, i2);
        self.x.swap(i1, i2);
        self.b.swap(i1, i2);
        self.w.swap(i1, i2);
        self.lo.swap(i1, i2);
        self.hi.swap(i1, i2);
        self.p.swap(i1, i2);
        self.state.swap(i1, i2);
        if let Some(f) = &mut self.findex {
            f.swap(i1, i2);
        }
    }

    /// Factor `A[0..nub, 0..nub]` and solve for `x` on that prefix,
    /// initializing `C = [0..nub)`, `nC = nub`, `nN = 0`. Zeros `w` on the
    /// prefix.
    pub fn factor_initial(&mut self, nub: usize, cfg: &SolveConfig) -> Result<(), LcpError> {
        self.nub = nub;
        for k in 0..nub {
            self.c[k] = k;
        }
        self.nc = nub;
        self.nn = 0;
        if nub == 0 {
            return Ok(());
        }

        for i in 0..nub {
            self.l[i * self.nskip..i * self.nskip + nub]
                .copy_from_slice(&self.a[i * self.nskip..i * self.nskip + nub]);
        }
        factor_ldlt(&mut self.l, &mut self.d, nub, self.nskip, cfg.singular_tol)?;

        self.x[..nub].copy_from_slice(&self.b[..nub]);
        solve_ldlt(&self.l, &self.d, &mut self.x[..nub], nub, self.nskip);
        self.w[..nub].fill(0.0);
        Ok(())
    }

    /// Un-permute `x` and `w` into caller-supplied output buffers keyed by
    /// the original index `p[k]`.
    pub fn unpermute_into(&self, x_out: &mut [f64], w_out: &mut [f64]) {
        for k in 0..self.n {
            let orig = self.p[k];
            x_out[orig] = self.x[k];
            w_out[orig] = self.w[k];
        }
    }
}

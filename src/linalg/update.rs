//! Incremental maintenance of the clamped block's LDLᵀ factor. The
//! driver never refactors from scratch — every transfer into or out of `C`
//! touches the factor with O(nC) (append) or O(nC²) (remove) work instead.

use super::dense::{dot, dot_offset};

/// Compute the `ℓ`/`Dℓ` columns for appending row/column `i` to a clamped
/// block of size `nc`, and fold them into the factor as row `nc` of `l`/`d`.
///
/// `a_row` is `A[i, ..]` read directly (leading dimension `nskip`). The
/// first `nub` entries of any row are unpermuted by construction (see
/// DESIGN NOTES), so they are gathered straight from `a_row`; the remaining
/// `nc - nub` entries are gathered through `c[nub..nc]`, which holds the
/// permuted positions of the clamped set beyond the unbounded prefix.
///
/// Returns the `Dℓ` scratch vector (length `nc`) so the caller can reuse it
/// as the right-hand side of the search-direction solve without repeating
/// the triangular solve that produced it.
pub fn append_row_to_factor(
    l: &mut [f64],
    d: &mut [f64],
    a_row: &[f64],
    a_ii: f64,
    c: &[usize],
    nc: usize,
    nskip: usize,
    nub: usize,
) -> Vec<f64> {
    let mut dl = vec![0.0; nc];
    for k in 0..nub.min(nc) {
        dl[k] = a_row[k];
    }
    for k in nub..nc {
        dl[k] = a_row[c[k]];
    }

    // Forward-substitute L*Dl = a' in place, scaling by d as we go so the
    // `l` row we write out is already `ell[j] = Dl[j] * d[j]`.
    let mut ell = vec![0.0; nc];
    for j in 0..nc {
        let acc = dot(&l[j * nskip..], 0, &dl, j);
        dl[j] -= acc;
        ell[j] = dl[j] * d[j];
    }

    for (j, &v) in ell.iter().enumerate() {
        l[nc * nskip + j] = v;
    }

    let cross = dot_offset(&ell, 0, &dl, 0, nc);
    d[nc] = 1.0 / (a_ii - cross);

    dl
}

/// Remove position `j` (0-indexed within the clamped block of size `nc`)
/// from the factorization of a block of size `nc`, leaving a valid LDLᵀ
/// factorization of the remaining `nc - 1` rows/columns in place at their
/// original positions (the caller is responsible for compacting `C`).
///
/// Deleting row/column `j` does not change any surviving entry of `A`, so
/// the trailing block `A[j+1.., j+1..]` is exactly what it was before — but
/// `L`'s column `j` was carrying part of that block's factorization, and
/// discarding it without compensation would under-count by
/// `L[:,j] * D[j,j] * L[:,j]^T`. The trailing rows therefore need a rank-1
/// *update* (not downdate) by that outer product before row/column `j` can
/// simply be dropped and the rest compacted.
pub fn remove_from_factor(l: &mut [f64], d: &mut [f64], nc: usize, j: usize, nskip: usize) {
    if j < nc - 1 {
        let d_j = 1.0 / d[j];
        let mut v: Vec<f64> = (j + 1..nc).map(|i| l[i * nskip + j]).collect();
        let mut sigma = d_j;

        for (a, jj) in (j + 1..nc).enumerate() {
            let d_old = 1.0 / d[jj];
            let v_jj = v[a];
            let d_new = d_old + sigma * v_jj * v_jj;
            let beta = sigma * v_jj / d_new;
            let ratio = d_old / d_new;

            for (b, kk) in (jj + 1..nc).enumerate() {
                let old_l = l[kk * nskip + jj];
                let old_v = v[a + 1 + b];
                l[kk * nskip + jj] = old_l * ratio + beta * old_v;
                v[a + 1 + b] = old_v - v_jj * old_l;
            }

            sigma *= ratio;
            d[jj] = 1.0 / d_new;
        }
    }

    // Compact: row/column j is gone, rows/columns j+1..nc shift down by one.
    for row in (j + 1)..nc {
        for col in 0..j {
            l[(row - 1) * nskip + col] = l[row * nskip + col];
        }
        for col in (j + 1)..row {
            l[(row - 1) * nskip + (col - 1)] = l[row * nskip + col];
        }
    }
    for k in (j + 1)..nc {
        d[k - 1] = d[k];
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::linalg::dense::{factor_ldlt, solve_ldlt};

    fn spd3() -> Vec<f64> {
        // [[4,0,0],[2,5,0],[1,1,3]] lower triangle of a 3x3 SPD matrix.
        vec![4.0, 0.0, 0.0, 2.0, 5.0, 0.0, 1.0, 1.0, 3.0]
    }

    #[test]
    fn append_matches_full_refactor() {
        let n = 3;
        let nskip = n;
        let a = spd3();

        // Incrementally build the 3x3 factor one row at a time starting
        // from an empty block.
        let mut l = vec![0.0; n * nskip];
        let mut d = vec![0.0; n];
        let c = [0usize, 1, 2];

        for i in 0..n {
            let a_row = &a[i * nskip..i * nskip + n];
            append_row_to_factor(&mut l, &mut d, a_row, a[i * nskip + i], &c, i, nskip, 0);
        }

        let mut a_full = a.clone();
        let mut d_full = vec![0.0; n];
        factor_ldlt(&mut a_full, &mut d_full, n, nskip, 1e-12).unwrap();

        for i in 0..n {
            assert_abs_diff_eq!(d[i], d_full[i], epsilon = 1e-10);
            for j in 0..i {
                assert_abs_diff_eq!(l[i * nskip + j], a_full[i * nskip + j], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn remove_middle_then_solve_matches_direct_2x2() {
        let n = 3;
        let nskip = n;
        let mut a = spd3();
        let mut d = vec![0.0; n];
        factor_ldlt(&mut a, &mut d, n, nskip, 1e-12).unwrap();

        remove_from_factor(&mut a, &mut d, n, 1, nskip);

        // Remaining rows/cols {0, 2} should now factor the 2x2 submatrix
        // [[4,0],[1,3]] at positions (0, 2) -> but entries live at rows
        // 0 and 1 post-removal (row 2 shifted up).
        let sub = [4.0, 0.0, 1.0, 3.0];
        let mut sub_full = sub.clone();
        let mut d_sub = vec![0.0; 2];
        factor_ldlt(&mut sub_full, &mut d_sub, 2, 2, 1e-12).unwrap();

        assert!((d[0] - d_sub[0]).abs() < 1e-10);
        assert!((d[1] - d_sub[1]).abs() < 1e-10);
        assert!((a[1 * nskip + 0] - sub_full[1 * 2 + 0]).abs() < 1e-10);

        let mut b = vec![1.0, 2.0];
        let l_sub: Vec<f64> = (0..2).flat_map(|r| a[r * nskip..r * nskip + 2].to_vec()).collect();
        solve_ldlt(&l_sub, &[d[0], d[1]], &mut b, 2, 2);

        let mut b_expected = vec![1.0, 2.0];
        solve_ldlt(&sub_full, &d_sub, &mut b_expected, 2, 2);
        for (got, want) in b.iter().zip(b_expected.iter()) {
            assert!((got - want).abs() < 1e-9);
        }
    }
}

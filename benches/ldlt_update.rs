//! Micro-benchmark of the fused dot products underlying the triangular
//! solves and the incremental factor update, across a handful of
//! clamped-block sizes.

use boxed_lcp::linalg::dense::{dot, dot_offset, make_random_matrix, seeded_rng, solve_ldlt};
use boxed_lcp::linalg::update::append_row_to_factor;

fn main() {
    divan::main();
}

const SIZES: &[usize] = &[8, 32, 128, 512];

#[divan::bench(args = SIZES)]
fn dot_product(bencher: divan::Bencher, n: usize) {
    let mut rng = seeded_rng(1);
    let a = make_random_matrix(1, n, &mut rng);
    let b = make_random_matrix(1, n, &mut rng);
    bencher.bench_local(|| dot(&a, 0, &b, n));
}

#[divan::bench(args = SIZES)]
fn dot_product_offset(bencher: divan::Bencher, n: usize) {
    let mut rng = seeded_rng(2);
    let a = make_random_matrix(1, 2 * n, &mut rng);
    let b = make_random_matrix(1, 2 * n, &mut rng);
    bencher.bench_local(|| dot_offset(&a, n / 2, &b, n / 4, n / 2));
}

#[divan::bench(args = SIZES)]
fn solve_ldlt_roundtrip(bencher: divan::Bencher, n: usize) {
    let nskip = n;
    let mut rng = seeded_rng(3);
    let a_prime = make_random_matrix(n, nskip, &mut rng);
    let mut a = vec![0.0; n * nskip];
    boxed_lcp::linalg::dense::multiply2(&mut a, &a_prime, &a_prime, n, nskip);
    boxed_lcp::linalg::dense::clear_upper_triangle(&mut a, n, nskip);
    let mut d = vec![0.0; n];
    boxed_lcp::linalg::dense::factor_ldlt(&mut a, &mut d, n, nskip, 1e-12).unwrap();
    let b = make_random_matrix(1, n, &mut rng);

    bencher.bench_local(|| {
        let mut rhs = b.clone();
        solve_ldlt(&a, &d, &mut rhs, n, nskip);
        rhs
    });
}

#[divan::bench(args = SIZES)]
fn append_row_to_factor_bench(bencher: divan::Bencher, n: usize) {
    let nskip = n + 1;
    let mut rng = seeded_rng(4);
    let a_prime = make_random_matrix(n + 1, nskip, &mut rng);
    let mut a = vec![0.0; (n + 1) * nskip];
    boxed_lcp::linalg::dense::multiply2(&mut a, &a_prime, &a_prime, n + 1, nskip);
    boxed_lcp::linalg::dense::clear_upper_triangle(&mut a, n + 1, nskip);

    let mut l = vec![0.0; (n + 1) * nskip];
    let mut d = vec![0.0; n + 1];
    l[..n * nskip].copy_from_slice(&a[..n * nskip]);
    boxed_lcp::linalg::dense::factor_ldlt(&mut l, &mut d, n, nskip, 1e-12).unwrap();

    let c: Vec<usize> = (0..n).collect();
    let a_row = a[n * nskip..n * nskip + nskip].to_vec();
    let a_ii = a[n * nskip + n];

    bencher.bench_local(|| {
        let mut l2 = l.clone();
        let mut d2 = d.clone();
        append_row_to_factor(&mut l2, &mut d2, &a_row, a_ii, &c, n, nskip, 0)
    });
}

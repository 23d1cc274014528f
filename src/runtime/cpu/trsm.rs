//! Column-major dense triangular solve for the CPU backend
//!
//! Operands are addressed through raw pointers rather than slices: an
//! L-panel solves against its own leading block, so `A` and `B` are
//! interleaved column by column inside one allocation. The regions touched
//! never overlap, but no slice over either could be formed without aliasing.

use crate::runtime::{Diag, Side, Transpose, TrsmParams};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Below this many entries of `B` the solve stays on the calling thread
#[cfg(feature = "rayon")]
const PARALLEL_THRESHOLD: usize = 1 << 14;

/// Rows per task for right-side solves
#[cfg(feature = "rayon")]
const ROW_BLOCK: usize = 64;

#[inline(always)]
unsafe fn op_a(a: *const f64, lda: usize, trans: Transpose, i: usize, j: usize) -> f64 {
    unsafe {
        match trans {
            Transpose::NoTrans => *a.add(i + j * lda),
            Transpose::Trans => *a.add(j + i * lda),
        }
    }
}

/// Solve `op(A) * x = alpha * b` for a single column `b`.
unsafe fn solve_left_column(params: &TrsmParams, a: *const f64, lda: usize, col: *mut f64) {
    let m = params.m;
    let unit = params.diag == Diag::Unit;

    unsafe {
        if params.alpha != 1.0 {
            for i in 0..m {
                *col.add(i) *= params.alpha;
            }
        }

        if params.op_is_lower() {
            for i in 0..m {
                let mut xi = *col.add(i);
                if !unit {
                    xi /= op_a(a, lda, params.trans, i, i);
                    *col.add(i) = xi;
                }
                if xi == 0.0 {
                    continue;
                }
                for r in i + 1..m {
                    *col.add(r) -= xi * op_a(a, lda, params.trans, r, i);
                }
            }
        } else {
            for i in (0..m).rev() {
                let mut xi = *col.add(i);
                if !unit {
                    xi /= op_a(a, lda, params.trans, i, i);
                    *col.add(i) = xi;
                }
                if xi == 0.0 {
                    continue;
                }
                for r in 0..i {
                    *col.add(r) -= xi * op_a(a, lda, params.trans, r, i);
                }
            }
        }
    }
}

/// Solve `X * op(A) = alpha * B` restricted to rows `rows` of `B`.
unsafe fn solve_right_rows(
    params: &TrsmParams,
    a: *const f64,
    lda: usize,
    b: *mut f64,
    ldb: usize,
    rows: std::ops::Range<usize>,
) {
    let n = params.n;
    let unit = params.diag == Diag::Unit;

    unsafe {
        if params.alpha != 1.0 {
            for j in 0..n {
                for r in rows.clone() {
                    *b.add(r + j * ldb) *= params.alpha;
                }
            }
        }

        let eliminate = |j: usize, k: usize| {
            let f = op_a(a, lda, params.trans, k, j);
            if f != 0.0 {
                for r in rows.clone() {
                    *b.add(r + j * ldb) -= f * *b.add(r + k * ldb);
                }
            }
        };

        if params.op_is_lower() {
            for j in (0..n).rev() {
                for k in j + 1..n {
                    eliminate(j, k);
                }
                if !unit {
                    let d = op_a(a, lda, params.trans, j, j);
                    for r in rows.clone() {
                        *b.add(r + j * ldb) /= d;
                    }
                }
            }
        } else {
            for j in 0..n {
                for k in 0..j {
                    eliminate(j, k);
                }
                if !unit {
                    let d = op_a(a, lda, params.trans, j, j);
                    for r in rows.clone() {
                        *b.add(r + j * ldb) /= d;
                    }
                }
            }
        }
    }
}

/// Column-major `dtrsm`, solved in place over `b`.
///
/// Each right-hand side is solved by the same sequence of operations no
/// matter how the work is split across threads, so results are identical
/// with and without the `rayon` feature.
///
/// # Safety
///
/// `a` must reference an `order x order` matrix with leading dimension `lda`
/// and `b` an `m x n` matrix with leading dimension `ldb`; the regions
/// referenced through `a` and written through `b` must not overlap.
pub(crate) unsafe fn dtrsm(
    params: &TrsmParams,
    a: *const f64,
    lda: usize,
    b: *mut f64,
    ldb: usize,
) {
    let (m, n) = (params.m, params.n);
    if m == 0 || n == 0 {
        return;
    }

    #[cfg(feature = "rayon")]
    {
        if m * n >= PARALLEL_THRESHOLD {
            let a_addr = a as usize;
            let b_addr = b as usize;
            match params.side {
                Side::Left => {
                    (0..n).into_par_iter().for_each(|j| unsafe {
                        let b_ptr = b_addr as *mut f64;
                        solve_left_column(params, a_addr as *const f64, lda, b_ptr.add(j * ldb));
                    });
                }
                Side::Right => {
                    (0..m.div_ceil(ROW_BLOCK)).into_par_iter().for_each(|blk| unsafe {
                        let start = blk * ROW_BLOCK;
                        let end = (start + ROW_BLOCK).min(m);
                        solve_right_rows(
                            params,
                            a_addr as *const f64,
                            lda,
                            b_addr as *mut f64,
                            ldb,
                            start..end,
                        );
                    });
                }
            }
            return;
        }
    }

    unsafe {
        match params.side {
            Side::Left => {
                for j in 0..n {
                    solve_left_column(params, a, lda, b.add(j * ldb));
                }
            }
            Side::Right => solve_right_rows(params, a, lda, b, ldb, 0..m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::FillMode;

    fn params(
        side: Side,
        fill: FillMode,
        trans: Transpose,
        diag: Diag,
        m: usize,
        n: usize,
    ) -> TrsmParams {
        TrsmParams {
            side,
            fill,
            trans,
            diag,
            m,
            n,
            alpha: 1.0,
        }
    }

    /// Dense column-major op(A) with the unreferenced triangle zeroed
    fn effective_a(p: &TrsmParams, a: &[f64], lda: usize) -> Vec<f64> {
        let k = p.order();
        let mut out = vec![0.0; k * k];
        for j in 0..k {
            for i in 0..k {
                let v = match p.trans {
                    Transpose::NoTrans => a[i + j * lda],
                    Transpose::Trans => a[j + i * lda],
                };
                let keep = if p.op_is_lower() { i >= j } else { i <= j };
                out[i + j * k] = if i == j && p.diag == Diag::Unit {
                    1.0
                } else if keep {
                    v
                } else {
                    0.0
                };
            }
        }
        out
    }

    fn matmul(a: &[f64], ar: usize, ac: usize, b: &[f64], bc: usize) -> Vec<f64> {
        let mut c = vec![0.0; ar * bc];
        for j in 0..bc {
            for k in 0..ac {
                for i in 0..ar {
                    c[i + j * ar] += a[i + k * ar] * b[k + j * ac];
                }
            }
        }
        c
    }

    fn check_solve(p: TrsmParams) {
        let k = p.order();
        // off-diagonals scaled by 1/k keep unit-diagonal solves from growing
        let lda = k + 1;
        let mut a = vec![0.0; lda * k];
        for j in 0..k {
            for i in 0..k {
                a[i + j * lda] = if i == j {
                    4.0 + i as f64
                } else {
                    (0.25 * ((i * 3 + j * 5) % 7) as f64 - 0.5) / k as f64
                };
            }
        }
        let b: Vec<f64> = (0..p.m * p.n).map(|x| (x as f64 * 0.37).sin() + 1.0).collect();
        let mut x = b.clone();
        unsafe { dtrsm(&p, a.as_ptr(), lda, x.as_mut_ptr(), p.m) };

        let op = effective_a(&p, &a, lda);
        let recon = match p.side {
            Side::Left => matmul(&op, k, k, &x, p.n),
            Side::Right => matmul(&x, p.m, p.n, &op, p.n),
        };
        for (i, (r, e)) in recon.iter().zip(b.iter()).enumerate() {
            assert!(
                (r - e * p.alpha).abs() <= 1e-10 * e.abs().max(1.0),
                "{:?}: entry {} reconstructs to {} instead of {}",
                p,
                i,
                r,
                e * p.alpha
            );
        }
    }

    #[test]
    fn test_all_modes_reconstruct_rhs() {
        for side in [Side::Left, Side::Right] {
            for fill in [FillMode::Lower, FillMode::Upper] {
                for trans in [Transpose::NoTrans, Transpose::Trans] {
                    for diag in [Diag::NonUnit, Diag::Unit] {
                        check_solve(params(side, fill, trans, diag, 5, 4));
                    }
                }
            }
        }
    }

    #[test]
    fn test_alpha_scales_rhs() {
        let mut p = params(Side::Left, FillMode::Lower, Transpose::NoTrans, Diag::Unit, 3, 2);
        p.alpha = -2.5;
        check_solve(p);
        p.side = Side::Right;
        check_solve(p);
    }

    #[test]
    fn test_large_solve_crosses_parallel_threshold() {
        check_solve(params(Side::Right, FillMode::Upper, Transpose::NoTrans, Diag::NonUnit, 300, 60));
        check_solve(params(Side::Left, FillMode::Lower, Transpose::NoTrans, Diag::Unit, 60, 300));
    }

    #[test]
    fn test_interleaved_operands_in_one_buffer() {
        // 2 diagonal rows on top of 3 off-diagonal rows, ld = 5
        let ld = 5;
        let mut buf = vec![
            2.0, 0.0, 1.0, 2.0, 3.0, // column 0
            1.0, 4.0, 5.0, 4.0, 3.0, // column 1
        ];
        let p = params(Side::Right, FillMode::Upper, Transpose::NoTrans, Diag::NonUnit, 3, 2);
        unsafe {
            let base = buf.as_mut_ptr();
            dtrsm(&p, base as *const f64, ld, base.add(2), ld);
        }
        // diagonal block untouched
        assert_eq!(&buf[0..2], &[2.0, 0.0]);
        assert_eq!(&buf[5..7], &[1.0, 4.0]);
        // row 0 of B: [1, 5] -> x0 = 0.5, x1 = (5 - 0.5) / 4
        assert_eq!(buf[2], 0.5);
        assert_eq!(buf[7], 4.5 / 4.0);
    }
}

//! Host dense factorization of a supernode's diagonal block

use crate::panel::SupernodeTable;

/// Options for the host factorization kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorOptions {
    /// Replace pivots smaller than the threshold by `±thresh` (default: true)
    ///
    /// When disabled, tiny pivots are kept as they are and only an exact
    /// zero is reported through the status.
    pub replace_tiny_pivot: bool,
}

impl Default for FactorOptions {
    fn default() -> Self {
        Self {
            replace_tiny_pivot: true,
        }
    }
}

/// Counters accumulated across kernel calls
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactorStats {
    /// Number of pivots replaced by `±thresh`
    pub tiny_pivots: usize,
    /// Floating-point operations performed
    pub flops: f64,
}

/// Host dense LU of a `ksupsz x ksupsz` diagonal block
///
/// Implementations factor `diag` in place (unit-lower `L` below the
/// diagonal, `U` on and above it), copy the rows of `U` into `u`, and
/// return a status: `0` on success, otherwise the 1-based global column of
/// the first singular pivot.
///
/// Both buffers are column-major with the given leading dimensions. The
/// block size and the global column of its first column are taken from
/// `xsup` for supernode `k`.
pub trait DiagFactorKernel {
    /// Factor supernode `k`'s diagonal block in place
    #[allow(clippy::too_many_arguments)]
    fn factor(
        &mut self,
        k: usize,
        diag: &mut [f64],
        ldd: usize,
        u: &mut [f64],
        ldu: usize,
        thresh: f64,
        xsup: &SupernodeTable,
        options: &FactorOptions,
        stats: &mut FactorStats,
    ) -> i32;
}

/// Right-looking LU without row exchanges, with tiny-pivot replacement
///
/// Pivots with `|p| < thresh` are replaced by `thresh` carrying the sign of
/// `p` when [`FactorOptions::replace_tiny_pivot`] is set. A pivot that is
/// still exactly zero sets the status (first occurrence only); its column
/// is left unscaled and does not update the trailing block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdLu;

impl DiagFactorKernel for ThresholdLu {
    fn factor(
        &mut self,
        k: usize,
        diag: &mut [f64],
        ldd: usize,
        u: &mut [f64],
        ldu: usize,
        thresh: f64,
        xsup: &SupernodeTable,
        options: &FactorOptions,
        stats: &mut FactorStats,
    ) -> i32 {
        let n = xsup.supernode_size(k);
        let fst_col = xsup.first_column(k);
        let mut info = 0;

        for j in 0..n {
            let jj = j + j * ldd;
            if options.replace_tiny_pivot && diag[jj].abs() < thresh {
                diag[jj] = if diag[jj] < 0.0 { -thresh } else { thresh };
                stats.tiny_pivots += 1;
            }

            for l in j..n {
                u[j + l * ldu] = diag[j + l * ldd];
            }

            let pivot = diag[jj];
            if pivot == 0.0 {
                if info == 0 {
                    info = (fst_col + j + 1) as i32;
                }
                continue;
            }

            let rest = n - j - 1;
            let inv = 1.0 / pivot;
            for i in j + 1..n {
                diag[i + j * ldd] *= inv;
            }
            for l in j + 1..n {
                let ujl = diag[j + l * ldd];
                if ujl == 0.0 {
                    continue;
                }
                for i in j + 1..n {
                    diag[i + l * ldd] -= diag[i + j * ldd] * ujl;
                }
            }
            stats.flops += (rest + 2 * rest * rest) as f64;
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        n: usize,
        block: &mut [f64],
        ldd: usize,
        thresh: f64,
        options: FactorOptions,
    ) -> (Vec<f64>, i32, FactorStats) {
        let xsup = SupernodeTable::from_sizes(&[3, n]).unwrap();
        let mut u = vec![0.0; n * n];
        let mut stats = FactorStats::default();
        let info = ThresholdLu.factor(1, block, ldd, &mut u, n, thresh, &xsup, &options, &mut stats);
        (u, info, stats)
    }

    #[test]
    fn test_two_by_two() {
        // [[4, 2], [2, 3]]
        let mut block = vec![4.0, 2.0, 2.0, 3.0];
        let (u, info, stats) = run(2, &mut block, 2, 0.0, FactorOptions::default());
        assert_eq!(info, 0);
        assert_eq!(block, vec![4.0, 0.5, 2.0, 2.0]);
        assert_eq!(u, vec![4.0, 0.0, 2.0, 2.0]);
        assert_eq!(stats.flops, 3.0);
        assert_eq!(stats.tiny_pivots, 0);
    }

    #[test]
    fn test_reconstructs_padded_block() {
        let n = 5;
        let ldd = 7;
        let a = |i: usize, j: usize| {
            if i == j {
                10.0 + i as f64
            } else {
                ((i * 3 + j * 5) % 7) as f64 - 3.0
            }
        };
        let mut block = vec![f64::NAN; ldd * n];
        for j in 0..n {
            for i in 0..n {
                block[i + j * ldd] = a(i, j);
            }
        }

        let (u, info, _) = run(n, &mut block, ldd, 1e-10, FactorOptions::default());
        assert_eq!(info, 0);

        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for p in 0..=i.min(j) {
                    let l = if p == i { 1.0 } else { block[i + p * ldd] };
                    sum += l * u[p + j * n];
                }
                assert!((sum - a(i, j)).abs() < 1e-12, "({}, {}): {} vs {}", i, j, sum, a(i, j));
            }
        }
        // padding rows untouched
        assert!(block[n].is_nan());
    }

    #[test]
    fn test_zero_pivot_reports_global_column() {
        // [[0, 1], [1, 1]]
        let mut block = vec![0.0, 1.0, 1.0, 1.0];
        let options = FactorOptions {
            replace_tiny_pivot: false,
        };
        let (_, info, stats) = run(2, &mut block, 2, 1e-6, options);
        // supernode 1 starts at global column 3
        assert_eq!(info, 4);
        assert_eq!(stats.tiny_pivots, 0);
    }

    #[test]
    fn test_tiny_pivots_replaced_with_sign() {
        let mut block = vec![1e-12, 1.0, 1.0, 2.0];
        let (u, info, stats) = run(2, &mut block, 2, 1e-6, FactorOptions::default());
        assert_eq!(info, 0);
        assert_eq!(stats.tiny_pivots, 1);
        assert_eq!(u[0], 1e-6);

        let mut block = vec![-1e-12, 1.0, 1.0, 2.0];
        let (u, _, _) = run(2, &mut block, 2, 1e-6, FactorOptions::default());
        assert_eq!(u[0], -1e-6);
    }
}

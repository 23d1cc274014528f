//! Common test utilities
#![allow(dead_code)]

use lupanel::panel::{ColBlock, LPanel, RowBlock, UPanel};
use lupanel::runtime::Runtime;
use lupanel::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
#[cfg(feature = "cuda")]
use lupanel::runtime::cuda::{CudaClient, CudaDevice, CudaRuntime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Create a CPU client and device for testing
pub fn create_cpu_client() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);
    (client, device)
}

/// Create a CUDA client and device, returning None if CUDA is unavailable
#[cfg(feature = "cuda")]
pub fn create_cuda_client() -> Option<(CudaClient, CudaDevice)> {
    if !lupanel::runtime::cuda::is_cuda_available() {
        return None;
    }
    let device = CudaDevice::new(0);
    let client = CudaClient::new(device.clone()).ok()?;
    Some((client, device))
}

/// Seeded generator so failures reproduce
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Row blocks of the given sizes with consecutive global rows starting at `first_row`
pub fn row_blocks(first_gid: i64, first_row: i64, sizes: &[usize]) -> Vec<RowBlock> {
    let mut row = first_row;
    sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let rows = (row..row + n as i64).collect();
            row += n as i64 + 1;
            RowBlock::new(first_gid + 2 * i as i64, rows)
        })
        .collect()
}

/// Column blocks of the given sizes with consecutive global columns starting at `first_col`
pub fn col_blocks(first_gid: i64, first_col: i64, sizes: &[usize]) -> Vec<ColBlock> {
    let mut col = first_col;
    sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let cols = (col..col + n as i64).collect();
            col += n as i64 + 2;
            ColBlock::new(first_gid + 3 * i as i64, cols)
        })
        .collect()
}

/// Random values in [-1, 1)
pub fn random_values(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// L-panel with random values; with `have_diag` the first block is a
/// diagonally dominant `ksupsz x ksupsz` diagonal block
pub fn random_lpanel(rng: &mut StdRng, ksupsz: usize, off_sizes: &[usize], have_diag: bool) -> LPanel {
    let mut sizes = Vec::new();
    if have_diag {
        sizes.push(ksupsz);
    }
    sizes.extend_from_slice(off_sizes);
    let blocks = row_blocks(1, 0, &sizes);
    let nzrows: usize = sizes.iter().sum();

    let mut values = random_values(rng, nzrows * ksupsz);
    if have_diag {
        for j in 0..ksupsz {
            values[j + j * nzrows] = ksupsz as f64 + 1.0 + rng.random_range(0.0..1.0);
        }
    }
    LPanel::new(ksupsz, &blocks, have_diag, values).unwrap()
}

/// U-panel with random values
pub fn random_upanel(rng: &mut StdRng, ksupsz: usize, sizes: &[usize]) -> UPanel {
    let blocks = col_blocks(4, 100, sizes);
    let nzcols: usize = sizes.iter().sum();
    UPanel::new(ksupsz, &blocks, random_values(rng, ksupsz * nzcols)).unwrap()
}

//! CPU/CUDA parity of the panel engine
//!
//! Skipped at runtime when no CUDA device is present.
#![cfg(feature = "cuda")]

mod common;

use common::{assert_allclose_f64, create_cpu_client, create_cuda_client, random_lpanel, random_upanel, rng};
use lupanel::prelude::*;
use lupanel::runtime::TrsmOps;

/// Factor the diagonal block, solve both panels, and return the refreshed host panels
fn supernode_step<R: Runtime>(client: &R::Client, mut lpanel: LPanel, mut upanel: UPanel) -> (LPanel, UPanel, i32)
where
    R::Client: TrsmOps<R>,
{
    let ksupsz = lpanel.ncols();
    let xsup = SupernodeTable::from_sizes(&[ksupsz]).unwrap();
    let lmirror = copy_to_device::<R, _>(client, &lpanel).unwrap();
    let umirror = copy_to_device::<R, _>(client, &upanel).unwrap();

    let mut diag = vec![0.0; ksupsz * ksupsz];
    let mut u = vec![0.0; ksupsz * ksupsz];
    let info = factor_diag_block(
        client,
        &lpanel,
        &lmirror,
        0,
        &xsup,
        &mut diag,
        ksupsz,
        &mut u,
        ksupsz,
        1e-10,
        &mut ThresholdLu,
        &FactorOptions::default(),
        &mut FactorStats::default(),
    )
    .unwrap();

    let d = lpanel.diag_block(&lmirror).unwrap();
    l_panel_solve(client, &lpanel, &lmirror, d).unwrap();
    u_panel_solve(client, &upanel, &umirror, d).unwrap();
    client.synchronize().unwrap();

    copy_from_device(client, &mut lpanel, &lmirror).unwrap();
    copy_from_device(client, &mut upanel, &umirror).unwrap();
    (lpanel, upanel, info)
}

#[test]
fn test_supernode_step_parity() {
    let Some((cuda_client, _)) = create_cuda_client() else {
        return;
    };
    let (cpu_client, _) = create_cpu_client();
    let mut rng = rng(17);
    let lpanel = random_lpanel(&mut rng, 8, &[5, 64, 3], true);
    let upanel = random_upanel(&mut rng, 8, &[4, 30]);

    let (cpu_l, cpu_u, cpu_info) = supernode_step::<CpuRuntime>(&cpu_client, lpanel.clone(), upanel.clone());
    let (gpu_l, gpu_u, gpu_info) = supernode_step::<CudaRuntime>(&cuda_client, lpanel, upanel);

    assert_eq!(cpu_info, gpu_info);
    assert_allclose_f64(gpu_l.values(), cpu_l.values(), 1e-10, 1e-12, "L-panel");
    assert_allclose_f64(gpu_u.values(), cpu_u.values(), 1e-10, 1e-12, "U-panel");
}

#[test]
fn test_cuda_empty_panel_never_allocates() {
    let Some((client, _)) = create_cuda_client() else {
        return;
    };
    let panel = UPanel::empty();
    let mirror = copy_to_device::<CudaRuntime, _>(&client, &panel).unwrap();
    assert!(mirror.is_empty());
    assert_eq!(client.allocator().allocation_count(), 0);
}

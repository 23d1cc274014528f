//! CUDA runtime implementation
//!
//! This module keeps panel mirrors in GPU memory via NVIDIA CUDA using cudarc.
//!
//! # Features
//!
//! - `CudaDevice` - Represents a CUDA GPU device
//! - `CudaClient` - Owns one stream and a cuBLAS handle bound to it
//! - `CudaRuntime` - Implements the generic Runtime trait
//!
//! Allocations are stream-ordered (`cuMemAllocAsync`/`cuMemFreeAsync`) on
//! the allocating client's stream. Transfers are issued on the client's
//! stream and synchronized before returning. Triangular solves go through
//! `cublasDtrsm` and are not synchronized.
//!
//! # Errors
//!
//! Allocation failures surface as `Error::DeviceOutOfMemory`, copy failures
//! as `Error::DeviceTransferFailed` and cuBLAS failures as `Error::Kernel`.

mod cache;
mod client;
mod device;
mod runtime;

pub use client::{CudaAllocator, CudaClient};
pub use device::CudaDevice;
pub use runtime::CudaRuntime;

/// Get the default CUDA device (device 0)
pub fn cuda_device() -> CudaDevice {
    CudaDevice::new(0)
}

/// Whether at least one CUDA device is usable
pub fn is_cuda_available() -> bool {
    CudaDevice::count().is_ok_and(|n| n > 0)
}

//! CPU runtime implementation
//!
//! The CPU runtime uses aligned heap allocations as its "device" memory and
//! provides the reference implementation of the dense triangular solve.
//! Every stream is synchronous: a dispatch has finished by the time the call
//! returns, and `synchronize` is a no-op.
//!
//! With the `rayon` feature, triangular solves split their independent
//! right-hand sides (columns for left-side solves, row ranges for
//! right-side solves) across the global thread pool.

mod client;
mod device;
mod runtime;
pub(crate) mod trsm;

pub use client::{CpuAllocator, CpuClient};
pub use device::CpuDevice;
pub use runtime::CpuRuntime;

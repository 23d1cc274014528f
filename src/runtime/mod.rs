//! Runtime backends for panel storage and dense kernels
//!
//! This module defines the `Runtime` trait and provides implementations
//! for the compute backends a panel mirror can live on (CPU, CUDA).
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity, blocking transfers)
//! ├── Device (identifies a specific GPU/CPU)
//! ├── Client (owns one execution stream, dispatches kernels)
//! ├── Allocator (device memory with allocation tracking)
//! └── TrsmOps (device-resident dense triangular solve)
//! ```
//!
//! The CPU backend treats host heap memory as "device" memory. It is the
//! reference backend and the one the test suite runs against.

mod allocator;
pub mod blas;
mod traits;

pub mod cpu;

#[cfg(test)]
pub(crate) mod fault;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use allocator::{Allocator, DefaultAllocator};
pub use blas::{DeviceMatrix, Diag, FillMode, Side, Transpose, TrsmOps, TrsmParams};
pub use traits::{Device, Runtime, RuntimeClient};

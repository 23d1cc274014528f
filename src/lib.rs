//! # lupanel
//!
//! **Accelerator-resident supernodal L/U panels for sparse LU factorization.**
//!
//! lupanel keeps the host and device copies of a supernodal factorization's
//! L- and U-panels consistent, and provides the device-side primitives a
//! factorization driver builds on: panel triangular solves against a
//! factored diagonal block, and the host round trip that factors that block.
//!
//! ## Components
//!
//! - **Panels** ([`panel`]): host-resident index and value arrays of one
//!   supernode's L or U data
//! - **Mirrors** ([`mirror`]): device replicas of panels, sized once at creation
//! - **Transfer** ([`transfer`]): blocking host/device copies and verification
//! - **Dispatch** ([`dispatch`]): asynchronous L- and U-panel triangular solves
//! - **Diagonal pipeline** ([`diag`]): pull, factor on the host, push back
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lupanel::prelude::*;
//!
//! let client = CpuRuntime::default_client(&CpuRuntime::default_device());
//! let panel = LPanel::new(ksupsz, &blocks, true, values)?;
//! let mirror = copy_to_device::<CpuRuntime, _>(&client, &panel)?;
//!
//! let info = factor_diag_block(
//!     &client, &panel, &mirror, k, &xsup,
//!     &mut diag, ksupsz, &mut u, ksupsz,
//!     1e-3, &mut ThresholdLu, &FactorOptions::default(), &mut stats,
//! )?;
//! l_panel_solve(&client, &panel, &mirror, panel.diag_block(&mirror).unwrap())?;
//! client.synchronize()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cpu` (default): CPU backend
//! - `cuda`: NVIDIA CUDA backend (cuBLAS triangular solves)
//! - `rayon` (default): Multi-threaded CPU triangular solves

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diag;
pub mod dispatch;
pub mod error;
pub mod mirror;
pub mod panel;
pub mod runtime;
pub mod transfer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, VerifyMode};
    pub use crate::diag::{
        DiagFactorKernel, FactorOptions, FactorStats, ThresholdLu, factor_diag_block,
    };
    pub use crate::dispatch::{l_panel_solve, u_panel_solve};
    pub use crate::error::{Error, Result};
    pub use crate::mirror::Mirror;
    pub use crate::panel::{ColBlock, LPanel, Panel, RowBlock, SupernodeTable, UPanel};
    pub use crate::runtime::{Allocator, Device, DeviceMatrix, Runtime, RuntimeClient, TrsmOps};
    pub use crate::transfer::{Verification, copy_from_device, copy_to_device, verify};

    #[cfg(feature = "cpu")]
    pub use crate::runtime::cpu::CpuRuntime;

    #[cfg(feature = "cuda")]
    pub use crate::runtime::cuda::CudaRuntime;
}

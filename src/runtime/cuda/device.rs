//! CUDA Device implementation
//!
//! Provides CUDA device abstraction using cudarc for direct GPU control.

use crate::error::Result;
use crate::runtime::Device;

/// CUDA Device using cudarc
///
/// Represents a single GPU device. Used by CudaClient for context and
/// stream management.
#[derive(Clone, Debug)]
pub struct CudaDevice {
    /// Index of the GPU device (0, 1, 2, ...)
    pub(crate) index: usize,
}

impl CudaDevice {
    /// Create a new CUDA device
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Number of CUDA devices visible to the driver
    pub fn count() -> Result<usize> {
        cudarc::driver::result::init()?;
        Ok(cudarc::driver::result::device::get_count()? as usize)
    }
}

impl Device for CudaDevice {
    fn id(&self) -> usize {
        self.index
    }

    fn name(&self) -> String {
        format!("cuda:{}", self.index)
    }
}

impl Default for CudaDevice {
    fn default() -> Self {
        Self::new(0)
    }
}

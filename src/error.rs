//! Error types for lupanel
//!
//! Only recoverable conditions live here. Programming errors (a panel and
//! its mirror disagreeing about emptiness, values diverging during
//! verification) are assertion failures, and numerical failures from the
//! host factorization kernel are plain status codes returned to the caller.

use thiserror::Error;

/// Result type alias using lupanel's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Direction of a host/device transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Host memory to device memory
    HostToDevice,
    /// Device memory to host memory
    DeviceToHost,
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::HostToDevice => write!(f, "host-to-device"),
            TransferDirection::DeviceToHost => write!(f, "device-to-host"),
        }
    }
}

/// Errors that can occur in panel engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// Device allocation failed
    #[error("Device out of memory: failed to allocate {size} bytes")]
    DeviceOutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// A host/device copy failed
    #[error("Device transfer failed ({direction}, {bytes} bytes): {reason}")]
    DeviceTransferFailed {
        /// Direction of the failed copy
        direction: TransferDirection,
        /// Number of bytes that were being copied
        bytes: usize,
        /// Backend-specific description
        reason: String,
    },

    /// Panel index metadata is inconsistent
    #[error("Malformed panel index: {reason}")]
    MalformedIndex {
        /// What is wrong with the index
        reason: String,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A device dense kernel reported failure
    #[error("Kernel error: {0}")]
    Kernel(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),

    /// CUDA driver error
    #[cfg(feature = "cuda")]
    #[error("CUDA error: {0}")]
    Cuda(#[from] cudarc::driver::DriverError),
}

impl Error {
    /// Create a malformed index error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedIndex {
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a transfer failure error
    pub fn transfer(direction: TransferDirection, bytes: usize, reason: impl Into<String>) -> Self {
        Self::DeviceTransferFailed {
            direction,
            bytes,
            reason: reason.into(),
        }
    }
}

//! CUDA Client implementation
//!
//! CudaClient owns a stream and a cuBLAS handle bound to it.
//!
//! # Thread Safety
//!
//! `CudaClient` is `Clone` and can be shared across threads. The underlying
//! CUDA context and stream are reference-counted via `Arc`. However, CUDA
//! operations must be performed on the thread that owns the context or after
//! calling `context.bind_to_thread()`.

use cudarc::cublas::CudaBlas;
use cudarc::cublas::sys::{
    cublasDiagType_t, cublasDtrsm_v2, cublasFillMode_t, cublasOperation_t, cublasSetStream_v2,
    cublasSideMode_t, cublasStatus_t,
};
use cudarc::driver::safe::{CudaContext, CudaStream};
use std::sync::Arc;

use super::CudaRuntime;
use super::cache::{is_cuda_context_valid, log_cuda_memory_error};
use super::device::CudaDevice;
use crate::error::{Error, Result};
use crate::runtime::blas::validate_trsm;
use crate::runtime::{
    DefaultAllocator, DeviceMatrix, Diag, FillMode, RuntimeClient, Side, Transpose, TrsmOps,
    TrsmParams,
};

/// CUDA allocator: stream-ordered allocations on the client's stream
pub type CudaAllocator = DefaultAllocator<Arc<CudaStream>>;

fn cuda_allocate(size_bytes: usize, stream: &Arc<CudaStream>) -> Result<u64> {
    unsafe {
        let mut ptr: u64 = 0;
        let result = cudarc::driver::sys::cuMemAllocAsync(&mut ptr, size_bytes, stream.cu_stream());
        if result == cudarc::driver::sys::CUresult::CUDA_SUCCESS {
            return Ok(ptr);
        }

        // Pending stream-ordered frees may be holding the memory
        if let Err(e) = stream.synchronize() {
            log::warn!(
                target: "lupanel",
                "stream synchronization before allocation retry failed: {:?}",
                e
            );
        }
        let result = cudarc::driver::sys::cuMemAllocAsync(&mut ptr, size_bytes, stream.cu_stream());
        if result == cudarc::driver::sys::CUresult::CUDA_SUCCESS {
            return Ok(ptr);
        }

        log::warn!(
            target: "lupanel",
            "cuMemAllocAsync of {} bytes failed: {:?}",
            size_bytes,
            result
        );
        Err(Error::DeviceOutOfMemory { size: size_bytes })
    }
}

fn cuda_deallocate(ptr: u64, _size_bytes: usize, stream: &Arc<CudaStream>) {
    if ptr == 0 {
        return;
    }

    unsafe {
        // Check if CUDA context is still valid before attempting free
        if !is_cuda_context_valid() {
            // Context is gone - memory will be reclaimed by driver
            return;
        }

        let result = cudarc::driver::sys::cuMemFreeAsync(ptr, stream.cu_stream());

        // Log failures but don't panic - deallocation errors are typically benign
        if result != cudarc::driver::sys::CUresult::CUDA_SUCCESS
            && result != cudarc::driver::sys::CUresult::CUDA_ERROR_ILLEGAL_ADDRESS
        {
            log_cuda_memory_error("cuMemFreeAsync", ptr, result);
        }
    }
}

/// CUDA Runtime Client
///
/// Owns one stream of a CUDA context and a cuBLAS handle bound to it.
/// Panel solves are issued on this stream and return before they finish.
#[derive(Clone)]
pub struct CudaClient {
    /// GPU device index
    pub(crate) device: CudaDevice,

    /// CUDA context for this device (owns GPU context)
    pub(crate) context: Arc<CudaContext>,

    /// Stream on which all work is issued
    pub(crate) stream: Arc<CudaStream>,

    /// cuBLAS handle for triangular solves
    pub(crate) cublas: Arc<CudaBlas>,

    /// Allocator for memory management
    pub(crate) allocator: CudaAllocator,
}

impl std::fmt::Debug for CudaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaClient")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl CudaClient {
    /// Create a new CUDA client for a device.
    ///
    /// This initializes the CUDA context, creates a stream, and sets up cuBLAS.
    ///
    /// # Errors
    ///
    /// Returns an error if context creation (e.g., invalid device ID), stream
    /// creation or cuBLAS initialization fails.
    pub fn new(device: CudaDevice) -> Result<Self> {
        let context = CudaContext::new(device.index)?;

        // Bind context to current thread for proper cuBLAS operation
        context.bind_to_thread()?;

        let stream = context.new_stream()?;
        let allocator = DefaultAllocator::new(stream.clone(), cuda_allocate, cuda_deallocate);
        Self::on_stream(device, context, stream, allocator)
    }

    fn on_stream(
        device: CudaDevice,
        context: Arc<CudaContext>,
        stream: Arc<CudaStream>,
        allocator: CudaAllocator,
    ) -> Result<Self> {
        let cublas = CudaBlas::new(stream.clone())
            .map_err(|e| Error::Backend(format!("failed to initialize cuBLAS: {:?}", e)))?;

        Ok(Self {
            device,
            context,
            stream,
            cublas: Arc::new(cublas),
            allocator,
        })
    }

    /// Get reference to the CUDA stream.
    #[inline]
    pub fn stream(&self) -> &CudaStream {
        &self.stream
    }

    /// Get reference to the CUDA context.
    #[inline]
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// Get reference to the cuBLAS handle.
    #[inline]
    pub fn cublas(&self) -> &CudaBlas {
        &self.cublas
    }
}

impl RuntimeClient<CudaRuntime> for CudaClient {
    fn device(&self) -> &CudaDevice {
        &self.device
    }

    fn synchronize(&self) -> Result<()> {
        self.stream.synchronize().map_err(|e| {
            log::warn!(target: "lupanel", "stream synchronization failed: {:?}", e);
            Error::from(e)
        })
    }

    fn allocator(&self) -> &CudaAllocator {
        &self.allocator
    }

    fn fork_stream(&self) -> Result<Self> {
        let stream = self.context.new_stream()?;
        let allocator = self.allocator.with_context(stream.clone());
        Self::on_stream(self.device.clone(), self.context.clone(), stream, allocator)
    }

    fn stream_id(&self) -> usize {
        self.stream.cu_stream() as usize
    }
}

/// Convert a dimension to cuBLAS's 32-bit integer
pub(crate) fn blas_int(arg: &'static str, v: usize) -> Result<i32> {
    i32::try_from(v).map_err(|_| {
        Error::invalid_argument(arg, format!("{} exceeds the cuBLAS limit of {}", v, i32::MAX))
    })
}

impl TrsmOps<CudaRuntime> for CudaClient {
    fn trsm(&self, params: &TrsmParams, a: DeviceMatrix, b: DeviceMatrix) -> Result<()> {
        if !validate_trsm(params, a, b)? {
            return Ok(());
        }

        let side = match params.side {
            Side::Left => cublasSideMode_t::CUBLAS_SIDE_LEFT,
            Side::Right => cublasSideMode_t::CUBLAS_SIDE_RIGHT,
        };
        let fill = match params.fill {
            FillMode::Lower => cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
            FillMode::Upper => cublasFillMode_t::CUBLAS_FILL_MODE_UPPER,
        };
        let trans = match params.trans {
            Transpose::NoTrans => cublasOperation_t::CUBLAS_OP_N,
            Transpose::Trans => cublasOperation_t::CUBLAS_OP_T,
        };
        let diag = match params.diag {
            Diag::NonUnit => cublasDiagType_t::CUBLAS_DIAG_NON_UNIT,
            Diag::Unit => cublasDiagType_t::CUBLAS_DIAG_UNIT,
        };
        let alpha = params.alpha;
        let m = blas_int("m", params.m)?;
        let n = blas_int("n", params.n)?;
        let lda = blas_int("lda", a.ld)?;
        let ldb = blas_int("ldb", b.ld)?;

        unsafe {
            let handle = *self.cublas.handle();

            let status = cublasSetStream_v2(handle, self.stream.cu_stream() as _);
            if status != cublasStatus_t::CUBLAS_STATUS_SUCCESS {
                return Err(Error::Kernel(format!("cublasSetStream failed: {:?}", status)));
            }

            let status = cublasDtrsm_v2(
                handle,
                side,
                fill,
                trans,
                diag,
                m,
                n,
                &alpha,
                a.ptr as *const f64,
                lda,
                b.ptr as *mut f64,
                ldb,
            );
            if status != cublasStatus_t::CUBLAS_STATUS_SUCCESS {
                return Err(Error::Kernel(format!(
                    "cuBLAS triangular solve ({} x {}) failed: {:?}",
                    params.m, params.n, status
                )));
            }
        }
        Ok(())
    }
}

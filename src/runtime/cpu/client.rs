//! CPU client and allocator implementation

use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::device::CpuDevice;
use super::runtime::CpuRuntime;
use super::trsm::dtrsm;
use crate::error::{Error, Result};
use crate::runtime::blas::validate_trsm;
use crate::runtime::{DefaultAllocator, DeviceMatrix, RuntimeClient, TrsmOps, TrsmParams};

/// Alignment of every CPU "device" allocation (AVX-512 friendly)
const CPU_ALIGN: usize = 64;

static NEXT_STREAM_ID: AtomicUsize = AtomicUsize::new(0);

/// CPU client for operation dispatch
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
    allocator: CpuAllocator,
    stream_id: usize,
}

impl CpuClient {
    /// Create a new CPU client
    pub fn new(device: CpuDevice) -> Self {
        let allocator = create_cpu_allocator(device.clone());
        Self {
            device,
            allocator,
            stream_id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) -> Result<()> {
        // CPU operations are synchronous, nothing to do
        Ok(())
    }

    fn allocator(&self) -> &CpuAllocator {
        &self.allocator
    }

    fn fork_stream(&self) -> Result<Self> {
        Ok(Self {
            device: self.device.clone(),
            allocator: self.allocator.clone(),
            stream_id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    fn stream_id(&self) -> usize {
        self.stream_id
    }
}

impl TrsmOps<CpuRuntime> for CpuClient {
    fn trsm(&self, params: &TrsmParams, a: DeviceMatrix, b: DeviceMatrix) -> Result<()> {
        if !validate_trsm(params, a, b)? {
            return Ok(());
        }
        // SAFETY: both operands are CPU allocations handed out by this
        // runtime; validate_trsm checked the leading dimensions cover the
        // referenced regions and the caller guarantees they do not overlap.
        unsafe {
            dtrsm(params, a.ptr as *const f64, a.ld, b.ptr as *mut f64, b.ld);
        }
        Ok(())
    }
}

/// CPU-specific allocator type alias
pub type CpuAllocator = DefaultAllocator<CpuDevice>;

/// Create a CPU allocator for the given device
fn create_cpu_allocator(device: CpuDevice) -> CpuAllocator {
    DefaultAllocator::new(device, cpu_allocate, cpu_deallocate)
}

fn cpu_allocate(size: usize, _dev: &CpuDevice) -> Result<u64> {
    let layout = AllocLayout::from_size_align(size, CPU_ALIGN)
        .map_err(|_| Error::DeviceOutOfMemory { size })?;
    // SAFETY: size is non-zero (DefaultAllocator short-circuits zero-sized requests).
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(Error::DeviceOutOfMemory { size });
    }
    Ok(ptr as u64)
}

fn cpu_deallocate(ptr: u64, size: usize, _dev: &CpuDevice) {
    if let Ok(layout) = AllocLayout::from_size_align(size, CPU_ALIGN) {
        // SAFETY: ptr was returned by cpu_allocate with this exact layout.
        unsafe {
            dealloc(ptr as *mut u8, layout);
        }
    }
}

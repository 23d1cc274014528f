//! Test runtime whose allocations and copies fail on demand
//!
//! Memory and copies are the CPU backend's. A [`FaultClient`] counts
//! allocations and copies (flat and pitched alike, 0-based) and fails the
//! one it was told to, so error paths of the engine can be driven
//! deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::cpu::{CpuAllocator, CpuClient, CpuDevice, CpuRuntime};
use super::{Allocator, DefaultAllocator, Runtime, RuntimeClient};
use crate::error::{Error, Result, TransferDirection};

#[derive(Debug)]
pub(crate) struct FaultPlan {
    heap: CpuAllocator,
    allocs: AtomicUsize,
    copies: AtomicUsize,
    fail_alloc_at: Option<usize>,
    fail_copy_at: Option<usize>,
}

fn hits(counter: &AtomicUsize, at: Option<usize>) -> bool {
    let n = counter.fetch_add(1, Ordering::Relaxed);
    at == Some(n)
}

pub(crate) type FaultAllocator = DefaultAllocator<Arc<FaultPlan>>;

fn fault_allocate(size: usize, plan: &Arc<FaultPlan>) -> Result<u64> {
    if hits(&plan.allocs, plan.fail_alloc_at) {
        return Err(Error::DeviceOutOfMemory { size });
    }
    plan.heap.allocate(size)
}

fn fault_deallocate(ptr: u64, size: usize, plan: &Arc<FaultPlan>) {
    plan.heap.deallocate(ptr, size);
}

#[derive(Clone, Debug, Default)]
pub(crate) struct FaultRuntime;

#[derive(Clone, Debug)]
pub(crate) struct FaultClient {
    cpu: CpuClient,
    plan: Arc<FaultPlan>,
    allocator: FaultAllocator,
}

impl FaultClient {
    /// Fail the `fail_alloc_at`-th allocation and the `fail_copy_at`-th copy
    pub(crate) fn new(fail_alloc_at: Option<usize>, fail_copy_at: Option<usize>) -> Self {
        let cpu = CpuClient::new(CpuDevice::new());
        let plan = Arc::new(FaultPlan {
            heap: cpu.allocator().clone(),
            allocs: AtomicUsize::new(0),
            copies: AtomicUsize::new(0),
            fail_alloc_at,
            fail_copy_at,
        });
        let allocator = DefaultAllocator::new(Arc::clone(&plan), fault_allocate, fault_deallocate);
        Self {
            cpu,
            plan,
            allocator,
        }
    }

    fn check_copy(&self, direction: TransferDirection, bytes: usize) -> Result<()> {
        if hits(&self.plan.copies, self.plan.fail_copy_at) {
            return Err(Error::transfer(direction, bytes, "injected failure"));
        }
        Ok(())
    }
}

impl RuntimeClient<FaultRuntime> for FaultClient {
    fn device(&self) -> &CpuDevice {
        self.cpu.device()
    }

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    fn allocator(&self) -> &FaultAllocator {
        &self.allocator
    }

    fn fork_stream(&self) -> Result<Self> {
        Ok(Self {
            cpu: self.cpu.fork_stream()?,
            plan: Arc::clone(&self.plan),
            allocator: self.allocator.clone(),
        })
    }

    fn stream_id(&self) -> usize {
        self.cpu.stream_id()
    }
}

impl Runtime for FaultRuntime {
    type Device = CpuDevice;
    type Client = FaultClient;
    type Allocator = FaultAllocator;

    fn name() -> &'static str {
        "fault"
    }

    fn copy_to_device(client: &FaultClient, src: &[u8], dst: u64) -> Result<()> {
        client.check_copy(TransferDirection::HostToDevice, src.len())?;
        CpuRuntime::copy_to_device(&client.cpu, src, dst)
    }

    fn copy_from_device(client: &FaultClient, src: u64, dst: &mut [u8]) -> Result<()> {
        client.check_copy(TransferDirection::DeviceToHost, dst.len())?;
        CpuRuntime::copy_from_device(&client.cpu, src, dst)
    }

    fn copy_2d_from_device(
        client: &FaultClient,
        src: u64,
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()> {
        client.check_copy(TransferDirection::DeviceToHost, width_bytes * height)?;
        CpuRuntime::copy_2d_from_device(
            &client.cpu,
            src,
            src_pitch,
            dst,
            dst_pitch,
            width_bytes,
            height,
        )
    }

    fn copy_2d_to_device(
        client: &FaultClient,
        src: &[u8],
        src_pitch: usize,
        dst: u64,
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()> {
        client.check_copy(TransferDirection::HostToDevice, width_bytes * height)?;
        CpuRuntime::copy_2d_to_device(
            &client.cpu,
            src,
            src_pitch,
            dst,
            dst_pitch,
            width_bytes,
            height,
        )
    }

    fn default_device() -> CpuDevice {
        CpuDevice::new()
    }

    fn default_client(_device: &CpuDevice) -> FaultClient {
        FaultClient::new(None, None)
    }
}

//! Memory allocator traits and default implementation
//!
//! Every device buffer a mirror owns is obtained through an `Allocator`.
//! Allocators keep live counters so callers (and tests) can observe that
//! empty panels never touch device memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;

/// Memory allocator trait for runtime backends
pub trait Allocator: Clone + Send + Sync {
    /// Allocate memory of given size
    ///
    /// Returns a device pointer (u64). A zero-byte request returns the null
    /// handle `0` without touching the device.
    /// Returns `Err(DeviceOutOfMemory)` if the backend cannot satisfy it.
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Deallocate memory
    fn deallocate(&self, ptr: u64, size_bytes: usize);

    /// Get the total live allocated bytes
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }

    /// Get the number of successful allocations made so far
    fn allocation_count(&self) -> usize {
        0
    }
}

/// Shared allocation counters
#[derive(Debug, Default)]
struct AllocationStats {
    live_bytes: AtomicUsize,
    allocations: AtomicUsize,
}

impl AllocationStats {
    fn record_alloc(&self, size_bytes: usize) {
        self.live_bytes.fetch_add(size_bytes, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_free(&self, size_bytes: usize) {
        self.live_bytes.fetch_sub(size_bytes, Ordering::Relaxed);
    }

    fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }
}

/// Default allocator that delegates to backend functions
///
/// Clones share their counters, so a client and every stream forked from
/// it report the same totals.
#[derive(Clone, Debug)]
pub struct DefaultAllocator<D> {
    context: D,
    allocate_fn: fn(usize, &D) -> Result<u64>,
    deallocate_fn: fn(u64, usize, &D),
    stats: Arc<AllocationStats>,
}

impl<D: Clone + Send + Sync> DefaultAllocator<D> {
    /// Create a new default allocator
    pub fn new(
        context: D,
        allocate_fn: fn(usize, &D) -> Result<u64>,
        deallocate_fn: fn(u64, usize, &D),
    ) -> Self {
        Self {
            context,
            allocate_fn,
            deallocate_fn,
            stats: Arc::new(AllocationStats::default()),
        }
    }

    /// Same backend functions and counters, different context
    pub fn with_context(&self, context: D) -> Self {
        Self {
            context,
            allocate_fn: self.allocate_fn,
            deallocate_fn: self.deallocate_fn,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<D: Clone + Send + Sync> Allocator for DefaultAllocator<D> {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }
        let ptr = (self.allocate_fn)(size_bytes, &self.context)?;
        self.stats.record_alloc(size_bytes);
        Ok(ptr)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }
        (self.deallocate_fn)(ptr, size_bytes, &self.context);
        self.stats.record_free(size_bytes);
    }

    fn allocated_bytes(&self) -> usize {
        self.stats.live_bytes()
    }

    fn allocation_count(&self) -> usize {
        self.stats.allocations()
    }
}

//! Trait for runtime clients that own an execution stream

use super::Runtime;
use crate::error::Result;

/// A handle bound to one execution stream on one device
///
/// Work issued through the same client executes in issue order. Work issued
/// through different clients (different streams) has no implicit ordering;
/// callers that need one must `synchronize` in between.
///
/// Clients are caller-owned. Dispatching on the same client from several
/// host threads without external synchronization is not supported.
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Block until all work issued on this client's stream has completed
    fn synchronize(&self) -> Result<()>;

    /// Get the allocator for this client
    fn allocator(&self) -> &R::Allocator;

    /// Create a new client on the same device with its own stream
    fn fork_stream(&self) -> Result<Self>;

    /// Identifier of the stream this client dispatches on
    fn stream_id(&self) -> usize;
}

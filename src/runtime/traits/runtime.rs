//! Core trait for compute backends

use crate::error::Result;

/// Core trait for compute backends
///
/// `Runtime` abstracts over the memory space a panel mirror lives in.
/// It uses static dispatch via generics for zero-cost abstraction.
///
/// All transfers are blocking from the host's point of view: they are issued
/// on the client's stream and the call returns once the bytes have landed.
/// Pitched (2D) copies move `height` rows of `width_bytes` each, reading
/// consecutive rows `src_pitch` bytes apart and writing them `dst_pitch`
/// bytes apart. For column-major dense blocks a "row" of the copy is one
/// column of the matrix.
///
/// # Example
///
/// ```ignore
/// let device = CpuRuntime::default_device();
/// let client = CpuRuntime::default_client(&device);
/// let ptr = client.allocator().allocate(1024)?;
/// CpuRuntime::copy_to_device(&client, &bytes, ptr)?;
/// client.allocator().deallocate(ptr, 1024);
/// ```
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: super::Device;

    /// Client for dispatching operations
    type Client: super::RuntimeClient<Self>;

    /// Memory allocator type
    type Allocator: crate::runtime::Allocator;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Copy data from host to device
    fn copy_to_device(client: &Self::Client, src: &[u8], dst: u64) -> Result<()>;

    /// Copy data from device to host
    fn copy_from_device(client: &Self::Client, src: u64, dst: &mut [u8]) -> Result<()>;

    /// Pitched copy from device to host
    ///
    /// `dst` must hold at least `(height - 1) * dst_pitch + width_bytes` bytes.
    fn copy_2d_from_device(
        client: &Self::Client,
        src: u64,
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()>;

    /// Pitched copy from host to device
    ///
    /// `src` must hold at least `(height - 1) * src_pitch + width_bytes` bytes.
    fn copy_2d_to_device(
        client: &Self::Client,
        src: &[u8],
        src_pitch: usize,
        dst: u64,
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()>;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the default client for a device
    fn default_client(device: &Self::Device) -> Self::Client;
}

/// Validate the arguments of a pitched copy against the host buffer length
pub(crate) fn validate_pitched(
    arg: &'static str,
    host_len: usize,
    host_pitch: usize,
    device_pitch: usize,
    width_bytes: usize,
    height: usize,
) -> Result<()> {
    use crate::error::Error;

    if height == 0 || width_bytes == 0 {
        return Ok(());
    }
    if host_pitch < width_bytes || device_pitch < width_bytes {
        return Err(Error::invalid_argument(
            arg,
            format!(
                "pitch smaller than row width (host {}, device {}, width {})",
                host_pitch, device_pitch, width_bytes
            ),
        ));
    }
    let needed = (height - 1) * host_pitch + width_bytes;
    if host_len < needed {
        return Err(Error::invalid_argument(
            arg,
            format!("host buffer holds {} bytes, copy needs {}", host_len, needed),
        ));
    }
    Ok(())
}

//! Device-resident replicas of panels
//!
//! A [`Mirror`] owns the device allocations holding a copy of one panel's
//! index and value arrays. It is sized exactly to the panel at creation
//! time and never resized; if the panel's shape changes the caller must
//! create a new mirror.
//!
//! Device memory is released when the mirror is dropped. Dispatches are
//! asynchronous on backends with real streams, so a mirror must outlive
//! every solve that references it: synchronize the stream before dropping.

use std::marker::PhantomData;

use crate::error::Result;
use crate::panel::Panel;
use crate::runtime::{Allocator, DeviceMatrix, Runtime, RuntimeClient};

/// One owned device allocation of `len` elements of `T`
pub struct DeviceBuffer<R: Runtime, T> {
    ptr: u64,
    len: usize,
    allocator: R::Allocator,
    _elem: PhantomData<T>,
}

impl<R: Runtime, T: bytemuck::Pod> DeviceBuffer<R, T> {
    /// Allocate room for `len` elements on the client's device
    pub fn alloc(client: &R::Client, len: usize) -> Result<Self> {
        let allocator = client.allocator().clone();
        let ptr = allocator.allocate(len * std::mem::size_of::<T>())?;
        Ok(Self {
            ptr,
            len,
            allocator,
            _elem: PhantomData,
        })
    }

    /// Device address of the first element
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// Blocking upload of `src`, which must have exactly `len` elements
    pub fn upload(&self, client: &R::Client, src: &[T]) -> Result<()> {
        assert_eq!(
            src.len(),
            self.len,
            "upload of {} elements into a device buffer of {}",
            src.len(),
            self.len
        );
        R::copy_to_device(client, bytemuck::cast_slice(src), self.ptr)
    }

    /// Blocking download into `dst`, which must have exactly `len` elements
    pub fn download(&self, client: &R::Client, dst: &mut [T]) -> Result<()> {
        assert_eq!(
            dst.len(),
            self.len,
            "download of a device buffer of {} elements into {}",
            self.len,
            dst.len()
        );
        R::copy_from_device(client, self.ptr, bytemuck::cast_slice_mut(dst))
    }
}

impl<R: Runtime, T> Drop for DeviceBuffer<R, T> {
    fn drop(&mut self) {
        self.allocator
            .deallocate(self.ptr, self.len * std::mem::size_of::<T>());
    }
}

impl<R: Runtime, T> std::fmt::Debug for DeviceBuffer<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("runtime", &R::name())
            .field("ptr", &format_args!("0x{:x}", self.ptr))
            .field("len", &self.len)
            .finish()
    }
}

#[derive(Debug)]
struct MirrorBuffers<R: Runtime> {
    index: DeviceBuffer<R, i64>,
    values: DeviceBuffer<R, f64>,
}

/// Device replica of one panel
///
/// Either empty (the panel has no blocks and nothing was allocated) or
/// holding exactly one index buffer and one value buffer.
#[derive(Debug)]
pub struct Mirror<R: Runtime> {
    buffers: Option<MirrorBuffers<R>>,
}

impl<R: Runtime> Default for Mirror<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: Runtime> Mirror<R> {
    /// A mirror of an empty panel
    pub fn empty() -> Self {
        Self { buffers: None }
    }

    pub(crate) fn from_buffers(index: DeviceBuffer<R, i64>, values: DeviceBuffer<R, f64>) -> Self {
        Self {
            buffers: Some(MirrorBuffers { index, values }),
        }
    }

    /// Whether the mirror holds no device buffers
    pub fn is_empty(&self) -> bool {
        self.buffers.is_none()
    }

    /// Number of index entries on the device
    pub fn index_len(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.index.len())
    }

    /// Number of values on the device
    pub fn value_len(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.values.len())
    }

    /// Total device bytes owned by this mirror
    pub fn device_bytes(&self) -> usize {
        self.buffers
            .as_ref()
            .map_or(0, |b| b.index.size_bytes() + b.values.size_bytes())
    }

    /// Device index buffer
    pub fn index_buffer(&self) -> Option<&DeviceBuffer<R, i64>> {
        self.buffers.as_ref().map(|b| &b.index)
    }

    /// Device value buffer
    pub fn value_buffer(&self) -> Option<&DeviceBuffer<R, f64>> {
        self.buffers.as_ref().map(|b| &b.values)
    }

    /// The value buffer viewed as a column-major matrix with leading dimension `ld`
    pub fn values_matrix(&self, ld: usize) -> Option<DeviceMatrix> {
        self.value_buffer().map(|v| DeviceMatrix::new(v.ptr(), ld))
    }

    /// Assert that the mirror and `panel` are simultaneously empty or non-empty
    pub(crate) fn assert_matches<P: Panel>(&self, panel: &P) {
        assert_eq!(
            panel.is_empty(),
            self.is_empty(),
            "panel and mirror must be simultaneously empty or non-empty"
        );
    }

    /// Download the device value array into a fresh host vector
    pub fn read_values(&self, client: &R::Client) -> Result<Vec<f64>> {
        match self.value_buffer() {
            Some(values) => {
                let mut out = vec![0.0; values.len()];
                values.download(client, &mut out)?;
                Ok(out)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Download the device index array into a fresh host vector
    pub fn read_index(&self, client: &R::Client) -> Result<Vec<i64>> {
        match self.index_buffer() {
            Some(index) => {
                let mut out = vec![0; index.len()];
                index.download(client, &mut out)?;
                Ok(out)
            }
            None => Ok(Vec::new()),
        }
    }
}

impl<R: Runtime> Drop for Mirror<R> {
    fn drop(&mut self) {
        if let Some(b) = &self.buffers {
            log::debug!(
                target: "lupanel",
                "releasing {} mirror: {} index entries, {} values",
                R::name(),
                b.index.len(),
                b.values.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::CpuRuntime;

    #[test]
    fn test_buffer_released_on_drop() {
        let client = CpuRuntime::default_client(&CpuRuntime::default_device());
        {
            let buf = DeviceBuffer::<CpuRuntime, f64>::alloc(&client, 16).unwrap();
            assert_eq!(buf.size_bytes(), 128);
            assert_eq!(client.allocator().allocated_bytes(), 128);
        }
        assert_eq!(client.allocator().allocated_bytes(), 0);
        assert_eq!(client.allocator().allocation_count(), 1);
    }

    #[test]
    fn test_upload_download() {
        let client = CpuRuntime::default_client(&CpuRuntime::default_device());
        let buf = DeviceBuffer::<CpuRuntime, i64>::alloc(&client, 4).unwrap();
        buf.upload(&client, &[3, -1, 4, 1]).unwrap();
        let mut out = [0i64; 4];
        buf.download(&client, &mut out).unwrap();
        assert_eq!(out, [3, -1, 4, 1]);
    }

    #[test]
    #[should_panic(expected = "upload of 3 elements")]
    fn test_upload_length_mismatch_panics() {
        let client = CpuRuntime::default_client(&CpuRuntime::default_device());
        let buf = DeviceBuffer::<CpuRuntime, f64>::alloc(&client, 4).unwrap();
        let _ = buf.upload(&client, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_mirror() {
        let m = Mirror::<CpuRuntime>::empty();
        assert!(m.is_empty());
        assert_eq!(m.value_len(), 0);
        assert_eq!(m.device_bytes(), 0);
        assert!(m.values_matrix(4).is_none());
    }
}

//! CUDA runtime implementation

use std::ffi::c_void;

use cudarc::driver::sys::{CUDA_MEMCPY2D, CUmemorytype, CUresult};

use super::cache::get_or_create_client;
use super::client::{CudaAllocator, CudaClient};
use super::device::CudaDevice;
use crate::error::{Error, Result, TransferDirection};
use crate::runtime::Runtime;
use crate::runtime::traits::runtime::validate_pitched;

/// CUDA Runtime adapter
///
/// Implements the generic Runtime trait for CUDA backend.
/// Uses cudarc for direct GPU control.
#[derive(Clone, Debug, Default)]
pub struct CudaRuntime;

/// Wait for a copy issued on the client's stream, mapping failures to transfer errors
fn finish_copy(
    client: &CudaClient,
    result: CUresult,
    direction: TransferDirection,
    bytes: usize,
) -> Result<()> {
    if result != CUresult::CUDA_SUCCESS {
        return Err(Error::transfer(direction, bytes, format!("{:?}", result)));
    }
    client
        .stream
        .synchronize()
        .map_err(|e| Error::transfer(direction, bytes, format!("{:?}", e)))
}

impl Runtime for CudaRuntime {
    type Device = CudaDevice;
    type Client = CudaClient;
    type Allocator = CudaAllocator;

    fn name() -> &'static str {
        "cuda"
    }

    fn copy_to_device(client: &Self::Client, src: &[u8], dst: u64) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        if dst == 0 {
            return Err(Error::transfer(
                TransferDirection::HostToDevice,
                src.len(),
                "null device handle",
            ));
        }
        client.context.bind_to_thread()?;

        let result = unsafe {
            cudarc::driver::sys::cuMemcpyHtoDAsync_v2(
                dst,
                src.as_ptr() as *const c_void,
                src.len(),
                client.stream.cu_stream(),
            )
        };
        finish_copy(client, result, TransferDirection::HostToDevice, src.len())
    }

    fn copy_from_device(client: &Self::Client, src: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if src == 0 {
            return Err(Error::transfer(
                TransferDirection::DeviceToHost,
                dst.len(),
                "null device handle",
            ));
        }
        client.context.bind_to_thread()?;

        let result = unsafe {
            cudarc::driver::sys::cuMemcpyDtoHAsync_v2(
                dst.as_mut_ptr() as *mut c_void,
                src,
                dst.len(),
                client.stream.cu_stream(),
            )
        };
        finish_copy(client, result, TransferDirection::DeviceToHost, dst.len())
    }

    fn copy_2d_from_device(
        client: &Self::Client,
        src: u64,
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()> {
        validate_pitched("dst", dst.len(), dst_pitch, src_pitch, width_bytes, height)?;
        if width_bytes == 0 || height == 0 {
            return Ok(());
        }
        let bytes = width_bytes * height;
        if src == 0 {
            return Err(Error::transfer(
                TransferDirection::DeviceToHost,
                bytes,
                "null device handle",
            ));
        }
        client.context.bind_to_thread()?;

        let copy = CUDA_MEMCPY2D {
            srcXInBytes: 0,
            srcY: 0,
            srcMemoryType: CUmemorytype::CU_MEMORYTYPE_DEVICE,
            srcHost: std::ptr::null(),
            srcDevice: src,
            srcArray: std::ptr::null_mut(),
            srcPitch: src_pitch,
            dstXInBytes: 0,
            dstY: 0,
            dstMemoryType: CUmemorytype::CU_MEMORYTYPE_HOST,
            dstHost: dst.as_mut_ptr() as *mut c_void,
            dstDevice: 0,
            dstArray: std::ptr::null_mut(),
            dstPitch: dst_pitch,
            WidthInBytes: width_bytes,
            Height: height,
        };
        let result =
            unsafe { cudarc::driver::sys::cuMemcpy2DAsync_v2(&copy, client.stream.cu_stream()) };
        finish_copy(client, result, TransferDirection::DeviceToHost, bytes)
    }

    fn copy_2d_to_device(
        client: &Self::Client,
        src: &[u8],
        src_pitch: usize,
        dst: u64,
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()> {
        validate_pitched("src", src.len(), src_pitch, dst_pitch, width_bytes, height)?;
        if width_bytes == 0 || height == 0 {
            return Ok(());
        }
        let bytes = width_bytes * height;
        if dst == 0 {
            return Err(Error::transfer(
                TransferDirection::HostToDevice,
                bytes,
                "null device handle",
            ));
        }
        client.context.bind_to_thread()?;

        let copy = CUDA_MEMCPY2D {
            srcXInBytes: 0,
            srcY: 0,
            srcMemoryType: CUmemorytype::CU_MEMORYTYPE_HOST,
            srcHost: src.as_ptr() as *const c_void,
            srcDevice: 0,
            srcArray: std::ptr::null_mut(),
            srcPitch: src_pitch,
            dstXInBytes: 0,
            dstY: 0,
            dstMemoryType: CUmemorytype::CU_MEMORYTYPE_DEVICE,
            dstHost: std::ptr::null_mut(),
            dstDevice: dst,
            dstArray: std::ptr::null_mut(),
            dstPitch: dst_pitch,
            WidthInBytes: width_bytes,
            Height: height,
        };
        let result =
            unsafe { cudarc::driver::sys::cuMemcpy2DAsync_v2(&copy, client.stream.cu_stream()) };
        finish_copy(client, result, TransferDirection::HostToDevice, bytes)
    }

    fn default_device() -> Self::Device {
        CudaDevice::new(0)
    }

    /// Cached client for `device`
    ///
    /// # Panics
    ///
    /// If no CUDA context can be created for the device. Use
    /// [`CudaClient::new`] to handle that case.
    fn default_client(device: &Self::Device) -> Self::Client {
        match get_or_create_client(device) {
            Ok(client) => client,
            Err(e) => panic!("failed to create CUDA client for device {}: {}", device.index, e),
        }
    }
}

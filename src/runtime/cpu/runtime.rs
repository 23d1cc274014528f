//! CPU runtime implementation

use super::client::{CpuAllocator, CpuClient};
use super::device::CpuDevice;
use crate::error::{Error, Result, TransferDirection};
use crate::runtime::Runtime;
use crate::runtime::traits::runtime::validate_pitched;

/// CPU compute runtime
///
/// This is the default runtime that works on any platform.
/// Device memory is host heap memory, so every transfer is a `memcpy`.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

fn null_handle(direction: TransferDirection, bytes: usize) -> Error {
    Error::transfer(direction, bytes, "null device handle")
}

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;
    type Allocator = CpuAllocator;

    fn name() -> &'static str {
        "cpu"
    }

    fn copy_to_device(_client: &Self::Client, src: &[u8], dst: u64) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        if dst == 0 {
            return Err(null_handle(TransferDirection::HostToDevice, src.len()));
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(_client: &Self::Client, src: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if src == 0 {
            return Err(null_handle(TransferDirection::DeviceToHost, dst.len()));
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    fn copy_2d_from_device(
        _client: &Self::Client,
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
        if src == 0 {
            return Err(null_handle(
                TransferDirection::DeviceToHost,
                width_bytes * height,
            ));
        }

        let src_base = src as *const u8;
        for row in 0..height {
            let out = &mut dst[row * dst_pitch..row * dst_pitch + width_bytes];
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src_base.add(row * src_pitch),
                    out.as_mut_ptr(),
                    width_bytes,
                );
            }
        }
        Ok(())
    }

    fn copy_2d_to_device(
        _client: &Self::Client,
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
        if dst == 0 {
            return Err(null_handle(
                TransferDirection::HostToDevice,
                width_bytes * height,
            ));
        }

        let dst_base = dst as *mut u8;
        for row in 0..height {
            let input = &src[row * src_pitch..row * src_pitch + width_bytes];
            unsafe {
                std::ptr::copy_nonoverlapping(
                    input.as_ptr(),
                    dst_base.add(row * dst_pitch),
                    width_bytes,
                );
            }
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn default_client(device: &Self::Device) -> Self::Client {
        CpuClient::new(device.clone())
    }
}

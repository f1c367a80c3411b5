//! Library-side buffer allocations for the raw handle namespace.
//!
//! Bulk numeric data handed over by scripts is copied into a [`DeviceBuffer`]
//! and bound to filter images from there; results are copied back out after
//! execution. Render-target denoising does not go through these, it binds
//! the target's own storage as shared images.

use crate::device::Device;
use crate::sys;
use crate::Error;
use bytemuck::{cast_slice, cast_slice_mut};

/// An owned OIDN buffer. Released when dropped.
pub struct DeviceBuffer {
    raw: sys::OIDNBuffer,
    device: Device,
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

impl DeviceBuffer {
    /// Allocates a buffer of the given size in bytes.
    ///
    /// # Errors
    ///
    /// Returns the device's error, or [`Error::OutOfMemory`] if it left no
    /// message.
    pub fn new(device: &Device, byte_size: usize) -> Result<Self, Error> {
        let raw = unsafe { sys::oidnNewBuffer(device.raw(), byte_size) };
        if raw.is_null() {
            return Err(device
                .take_error()
                .unwrap_or(Error::OutOfMemory { bytes: byte_size }));
        }
        Ok(Self {
            raw,
            device: device.clone(),
        })
    }

    /// Allocates a buffer holding a copy of `data`.
    pub fn from_f32s(device: &Device, data: &[f32]) -> Result<Self, Error> {
        let buf = Self::new(device, std::mem::size_of_val(data))?;
        buf.write_f32s(data);
        Ok(buf)
    }

    /// Allocates a zero-initialized buffer of `len` floats.
    pub fn zeroed_f32s(device: &Device, len: usize) -> Result<Self, Error> {
        Self::from_f32s(device, &vec![0.0f32; len])
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        unsafe { sys::oidnGetBufferSize(self.raw) }
    }

    /// Number of f32 elements this buffer holds.
    pub fn len_f32s(&self) -> usize {
        self.size() / std::mem::size_of::<f32>()
    }

    /// Copies `src` into the buffer. `src` must not exceed the buffer size.
    pub fn write_f32s(&self, src: &[f32]) {
        let bytes: &[u8] = cast_slice(src);
        assert!(bytes.len() <= self.size());
        unsafe { sys::oidnWriteBuffer(self.raw, 0, bytes.len(), bytes.as_ptr() as *const _) };
    }

    /// Copies the start of the buffer into `dst`. `dst` must not exceed the
    /// buffer size.
    pub fn read_f32s(&self, dst: &mut [f32]) {
        let bytes: &mut [u8] = cast_slice_mut(dst);
        assert!(bytes.len() <= self.size());
        unsafe { sys::oidnReadBuffer(self.raw, 0, bytes.len(), bytes.as_mut_ptr() as *mut _) };
    }

    pub(crate) fn raw(&self) -> sys::OIDNBuffer {
        self.raw
    }

    /// Device this buffer was allocated on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        unsafe { sys::oidnReleaseBuffer(self.raw) }
    }
}

unsafe impl Send for DeviceBuffer {}

//! OIDN logical device. One is created per denoise invocation by the
//! high-level paths; script-held devices from the raw namespace live until
//! the wrapper object is collected.

use crate::sys;
use crate::Error;
use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::Arc;

/// Returns the first unqueried error for the current thread (e.g. from a
/// failed device creation) and clears it. Can be called without a device to
/// check why [`Device::new`] failed.
pub fn take_global_error() -> Option<Error> {
    take_error_raw(ptr::null_mut())
}

fn take_error_raw(device: sys::OIDNDevice) -> Option<Error> {
    let mut msg_ptr: *const std::ffi::c_char = ptr::null();
    let code = unsafe { sys::oidnGetDeviceError(device, &mut msg_ptr) };
    if code == sys::OIDNError::None {
        return None;
    }
    let message = if msg_ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(msg_ptr).to_string_lossy().into_owned() }
    };
    Some(Error::Oidn { code: code as u32, message })
}

struct DeviceInner {
    raw: sys::OIDNDevice,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        unsafe { sys::oidnReleaseDevice(self.raw) }
    }
}

unsafe impl Send for DeviceInner {}
unsafe impl Sync for DeviceInner {}

/// Open Image Denoise logical device.
///
/// Cloning is cheap (shared handle); the underlying device is released
/// exactly once, when the last clone drops. Filters hold a clone, so a
/// device can never be released out from under a live filter.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").finish_non_exhaustive()
    }
}

impl Device {
    /// Creates a device using the default backend (auto-selects CPU or GPU
    /// when available) and commits it.
    ///
    /// # Errors
    ///
    /// Returns the library's error when no backend is available, or
    /// [`Error::DeviceCreationFailed`] if it left no message.
    pub fn new() -> Result<Self, Error> {
        Self::with_type(sys::OIDNDeviceType::Default)
    }

    /// Creates a CPU-only device (most portable).
    pub fn cpu() -> Result<Self, Error> {
        Self::with_type(sys::OIDNDeviceType::CPU)
    }

    fn with_type(device_type: sys::OIDNDeviceType) -> Result<Self, Error> {
        let raw = unsafe { sys::oidnNewDevice(device_type) };
        if raw.is_null() {
            let err = take_global_error().unwrap_or(Error::DeviceCreationFailed);
            log::warn!("device creation failed: {err}");
            return Err(err);
        }
        unsafe { sys::oidnCommitDevice(raw) };
        Ok(Self {
            inner: Arc::new(DeviceInner { raw }),
        })
    }

    /// Gets an integer device parameter (e.g. `"version"`).
    pub fn get_int(&self, name: &str) -> i32 {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnGetDeviceInt(self.raw(), c_name.as_ptr()) }
    }

    /// Returns the first unqueried error on this device and clears it.
    pub fn take_error(&self) -> Option<Error> {
        take_error_raw(self.raw())
    }

    /// Waits for all outstanding operations on this device to complete.
    /// Required before readback on asynchronous (GPU) backends.
    pub fn sync(&self) {
        unsafe { sys::oidnSyncDevice(self.raw()) };
    }

    pub(crate) fn raw(&self) -> sys::OIDNDevice {
        self.inner.raw
    }
}

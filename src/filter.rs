//! Denoising filters: the typed RT wrapper used by render-target denoising,
//! the generic filter driven by the raw handle namespace, and aux
//! prefiltering.

use crate::buffer::DeviceBuffer;
use crate::device::Device;
use crate::sys;
use crate::target::{self, AuxKind};
use crate::Error;
use std::ffi::CString;
use std::os::raw::c_void;

/// Filter quality vs performance trade-off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Quality {
    /// Default (high quality).
    #[default]
    Default,
    /// Fast, for interactive preview.
    Fast,
    /// Balanced, for interactive use.
    Balanced,
    /// High, for final frames.
    High,
}

impl Quality {
    fn to_raw(self) -> sys::OIDNQuality {
        match self {
            Quality::Default => sys::OIDNQuality::Default,
            Quality::Fast => sys::OIDNQuality::Fast,
            Quality::Balanced => sys::OIDNQuality::Balanced,
            Quality::High => sys::OIDNQuality::High,
        }
    }
}

/// A filter created by type name (e.g. `"RT"`).
///
/// Owns a [`Device`] clone, so the device outlives every filter created on
/// it. The underlying handle is released when the filter drops, on every
/// exit path.
pub struct Filter {
    device: Device,
    raw: sys::OIDNFilter,
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter").finish_non_exhaustive()
    }
}

impl Filter {
    /// Creates a filter of the given type.
    ///
    /// # Errors
    ///
    /// Returns the device's error, or [`Error::FilterCreationFailed`] if it
    /// left no message.
    pub fn new(device: &Device, type_name: &str) -> Result<Self, Error> {
        let c_name = CString::new(type_name).map_err(|_| Error::FilterCreationFailed)?;
        let raw = unsafe { sys::oidnNewFilter(device.raw(), c_name.as_ptr()) };
        if raw.is_null() {
            return Err(device.take_error().unwrap_or(Error::FilterCreationFailed));
        }
        Ok(Self {
            device: device.clone(),
            raw,
        })
    }

    /// Binds a three-channel float image stored in an owned buffer.
    pub fn set_image(&self, name: &str, buffer: &DeviceBuffer, width: u32, height: u32) {
        let c_name = CString::new(name).unwrap();
        unsafe {
            sys::oidnSetFilterImage(
                self.raw,
                c_name.as_ptr(),
                buffer.raw(),
                sys::OIDNFormat::Float3,
                width as usize,
                height as usize,
                0,
                0,
                0,
            );
        }
    }

    /// Binds a three-channel float image over caller-owned memory
    /// (zero-copy). The library only borrows the pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `width * height * 3` floats that stay
    /// valid and unmoved until the filter has executed or the image is
    /// unset.
    pub unsafe fn set_shared_image(
        &self,
        name: &str,
        ptr: *mut c_void,
        width: u32,
        height: u32,
    ) {
        let c_name = CString::new(name).unwrap();
        sys::oidnSetSharedFilterImage(
            self.raw,
            c_name.as_ptr(),
            ptr,
            sys::OIDNFormat::Float3,
            width as usize,
            height as usize,
            0,
            0,
            0,
        );
    }

    /// Unbinds a previously bound image.
    pub fn unset_image(&self, name: &str) {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnUnsetFilterImage(self.raw, c_name.as_ptr()) };
    }

    /// Sets a boolean parameter (e.g. `"hdr"`, `"srgb"`, `"cleanAux"`).
    pub fn set_bool(&self, name: &str, value: bool) {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnSetFilterBool(self.raw, c_name.as_ptr(), value) };
    }

    /// Gets a boolean parameter.
    pub fn get_bool(&self, name: &str) -> bool {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnGetFilterBool(self.raw, c_name.as_ptr()) }
    }

    /// Sets an integer parameter (e.g. `"quality"`).
    pub fn set_int(&self, name: &str, value: i32) {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnSetFilterInt(self.raw, c_name.as_ptr(), value) };
    }

    /// Gets an integer parameter.
    pub fn get_int(&self, name: &str) -> i32 {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnGetFilterInt(self.raw, c_name.as_ptr()) }
    }

    /// Sets a float parameter (e.g. `"inputScale"`).
    pub fn set_float(&self, name: &str, value: f32) {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnSetFilterFloat(self.raw, c_name.as_ptr(), value) };
    }

    /// Gets a float parameter.
    pub fn get_float(&self, name: &str) -> f32 {
        let c_name = CString::new(name).unwrap();
        unsafe { sys::oidnGetFilterFloat(self.raw, c_name.as_ptr()) }
    }

    /// Commits all parameter changes. Must be called before execute.
    pub fn commit(&self) {
        unsafe { sys::oidnCommitFilter(self.raw) };
    }

    /// Executes the filter on the calling thread.
    pub fn execute(&self) {
        unsafe { sys::oidnExecuteFilter(self.raw) };
    }

    /// Device this filter belongs to.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Drop for Filter {
    fn drop(&mut self) {
        unsafe { sys::oidnReleaseFilter(self.raw) }
    }
}

unsafe impl Send for Filter {}

/// Ray tracing denoising filter over borrowed render-target storage.
///
/// Binds the caller's color buffer as both input and output, so the denoise
/// happens in place; albedo and normal guides are borrowed read-only.
pub struct RtFilter {
    inner: Filter,
    width: u32,
    height: u32,
    hdr: bool,
    srgb: bool,
    clean_aux: bool,
    quality: Quality,
}

impl std::fmt::Debug for RtFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtFilter")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("hdr", &self.hdr)
            .field("srgb", &self.srgb)
            .field("clean_aux", &self.clean_aux)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

impl RtFilter {
    /// Creates a new RT filter.
    pub fn new(device: &Device) -> Result<Self, Error> {
        Ok(Self {
            inner: Filter::new(device, "RT")?,
            width: 0,
            height: 0,
            hdr: true,
            srgb: false,
            clean_aux: false,
            quality: Quality::Default,
        })
    }

    /// Image dimensions (must be set before execute).
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> &mut Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Whether the input is HDR. Default: true.
    pub fn set_hdr(&mut self, hdr: bool) -> &mut Self {
        self.hdr = hdr;
        self
    }

    /// Whether the input is sRGB-encoded LDR. Default: false.
    pub fn set_srgb(&mut self, srgb: bool) -> &mut Self {
        self.srgb = srgb;
        self
    }

    /// Whether albedo/normal are noise-free. Default: false.
    pub fn set_clean_aux(&mut self, clean: bool) -> &mut Self {
        self.clean_aux = clean;
        self
    }

    /// Filter quality. Default: library default.
    pub fn set_quality(&mut self, quality: Quality) -> &mut Self {
        self.quality = quality;
        self
    }

    /// Denoises `color` in place. Must hold `width * height * 3` floats.
    pub fn execute_in_place(&self, color: &mut [f32]) -> Result<(), Error> {
        self.execute_in_place_with_aux(color, None, None)
    }

    /// Denoises `color` in place, guided by optional albedo and normal
    /// buffers (each `width * height * 3` floats).
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`] or [`Error::BufferLength`] on shape
    /// problems, or the library's error after execution. Either way every
    /// handle is released; the color buffer is only touched by a successful
    /// execution or a partial one the library itself aborted.
    pub fn execute_in_place_with_aux(
        &self,
        color: &mut [f32],
        albedo: Option<&[f32]>,
        normal: Option<&[f32]>,
    ) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::EmptyImage);
        }
        target::check_len("color", self.width, self.height, color.len())?;
        if let Some(a) = albedo {
            target::check_len("albedo", self.width, self.height, a.len())?;
        }
        if let Some(n) = normal {
            target::check_len("normal", self.width, self.height, n.len())?;
        }

        let color_ptr = color.as_mut_ptr() as *mut c_void;
        unsafe {
            self.inner
                .set_shared_image("color", color_ptr, self.width, self.height);
            // Rebind or unbind the guides every call; a pointer left over
            // from a previous execution must never survive into this one.
            match albedo {
                Some(a) => self.inner.set_shared_image(
                    "albedo",
                    a.as_ptr() as *mut c_void,
                    self.width,
                    self.height,
                ),
                None => self.inner.unset_image("albedo"),
            }
            match normal {
                Some(n) => self.inner.set_shared_image(
                    "normal",
                    n.as_ptr() as *mut c_void,
                    self.width,
                    self.height,
                ),
                None => self.inner.unset_image("normal"),
            }
            // Output aliases the color buffer: the denoise is self-modifying.
            self.inner
                .set_shared_image("output", color_ptr, self.width, self.height);
        }
        self.inner.set_bool("hdr", self.hdr);
        self.inner.set_bool("srgb", self.srgb);
        self.inner.set_bool("cleanAux", self.clean_aux);
        self.inner.set_int("quality", self.quality.to_raw() as i32);

        self.inner.commit();
        log::debug!(
            "denoising {}x{} (albedo: {}, normal: {}, hdr: {}, srgb: {}, cleanAux: {})",
            self.width,
            self.height,
            albedo.is_some(),
            normal.is_some(),
            self.hdr,
            self.srgb,
            self.clean_aux
        );
        self.inner.execute();
        // Asynchronous backends finish here; the borrow must not outlive it.
        self.inner.device().sync();

        if let Some(e) = self.inner.device().take_error() {
            return Err(e);
        }
        Ok(())
    }
}

/// Denoises a noisy guide buffer in place, independently of the primary
/// pass: a filter bound only to the guide's own image name, with output
/// aliasing the same memory.
///
/// # Errors
///
/// Shape errors as in [`RtFilter::execute_in_place_with_aux`]; library
/// errors have their message prefixed with the guide being prefiltered.
pub fn prefilter_aux_in_place(
    device: &Device,
    kind: AuxKind,
    data: &mut [f32],
    width: u32,
    height: u32,
) -> Result<(), Error> {
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage);
    }
    let name = kind.image_name();
    target::check_len(name, width, height, data.len())?;

    let filter = Filter::new(device, "RT")?;
    let ptr = data.as_mut_ptr() as *mut c_void;
    unsafe {
        filter.set_shared_image(name, ptr, width, height);
        filter.set_shared_image("output", ptr, width, height);
    }
    filter.commit();
    log::debug!("prefiltering {name} {width}x{height}");
    filter.execute();
    device.sync();

    if let Some(err) = device.take_error() {
        return Err(match err {
            Error::Oidn { code, message } => Error::Oidn {
                code,
                message: format!("while prefiltering {name}: {message}"),
            },
            other => other,
        });
    }
    Ok(())
}

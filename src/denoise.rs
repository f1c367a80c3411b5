//! One-call denoising of a color buffer with optional guide buffers.
//!
//! This is the path behind the render-target methods: validate everything
//! up front, prefilter guides the caller flagged as noisy, then run the
//! primary pass in place.

use crate::device::Device;
use crate::filter::{prefilter_aux_in_place, Quality, RtFilter};
use crate::target::{self, AuxKind};
use crate::Error;

/// Options for a one-call denoise.
#[derive(Clone, Debug)]
pub struct DenoiseOptions {
    /// `true` if the image is HDR (linear, possibly > 1.0).
    pub hdr: bool,
    /// `true` if the image is sRGB-encoded LDR. Mutually exclusive with
    /// `hdr`.
    pub srgb: bool,
    /// Caller asserts the guide buffers are already noise-free.
    pub clean_aux: bool,
    /// The albedo guide is itself noisy and must be prefiltered.
    pub albedo_noisy: bool,
    /// The normal guide is itself noisy and must be prefiltered.
    pub normal_noisy: bool,
    /// Quality vs performance.
    pub quality: Quality,
}

impl Default for DenoiseOptions {
    fn default() -> Self {
        Self {
            hdr: true,
            srgb: false,
            clean_aux: false,
            albedo_noisy: false,
            normal_noisy: false,
            quality: Quality::Default,
        }
    }
}

impl DenoiseOptions {
    /// Rejects contradictory settings.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hdr && self.srgb {
            return Err(Error::ExclusiveToneMapping);
        }
        Ok(())
    }
}

/// Denoises `color` in place, guided by optional albedo and normal buffers.
///
/// Guides flagged noisy in `options` are first denoised in place themselves,
/// independently, and then used as noise-free inputs to the primary pass
/// (`cleanAux` is set for it). All buffers must hold `width * height * 3`
/// floats. A fresh device is created for the call and released on return.
///
/// # Errors
///
/// Configuration errors are returned before any library resource is
/// created. Library errors abort the call immediately; work already written
/// into a buffer by a completed prefilter is not rolled back.
pub fn denoise_in_place(
    width: u32,
    height: u32,
    color: &mut [f32],
    mut albedo: Option<&mut [f32]>,
    mut normal: Option<&mut [f32]>,
    options: &DenoiseOptions,
) -> Result<(), Error> {
    options.validate()?;
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage);
    }
    target::check_len("color", width, height, color.len())?;
    if let Some(a) = albedo.as_deref() {
        target::check_len("albedo", width, height, a.len())?;
    }
    if let Some(n) = normal.as_deref() {
        target::check_len("normal", width, height, n.len())?;
    }

    let device = Device::new()?;

    let mut prefiltered = false;
    if options.albedo_noisy {
        if let Some(a) = albedo.as_deref_mut() {
            prefilter_aux_in_place(&device, AuxKind::Albedo, a, width, height)?;
            prefiltered = true;
        }
    }
    if options.normal_noisy {
        if let Some(n) = normal.as_deref_mut() {
            prefilter_aux_in_place(&device, AuxKind::Normal, n, width, height)?;
            prefiltered = true;
        }
    }

    let mut filter = RtFilter::new(&device)?;
    filter
        .set_dimensions(width, height)
        .set_hdr(options.hdr)
        .set_srgb(options.srgb)
        .set_clean_aux(options.clean_aux || prefiltered)
        .set_quality(options.quality);
    filter.execute_in_place_with_aux(color, albedo.as_deref(), normal.as_deref())
}

//! Error type shared by the denoising wrappers and the binding layer.
//!
//! See [`Error`] for the main error type returned by public APIs.

/// Errors from OIDN or from input validation.
///
/// Library-reported errors carry the device's message verbatim. Validation
/// errors name the offending image so script-side messages stay actionable.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The library reported an error (polled from the device error slot).
    #[error("denoiser error ({code}): {message}")]
    Oidn { code: u32, message: String },

    /// Device creation failed (e.g. no supported backend).
    #[error("failed to create denoising device")]
    DeviceCreationFailed,

    /// Filter creation failed.
    #[error("failed to create denoising filter")]
    FilterCreationFailed,

    /// Native buffer allocation failed.
    #[error("failed to allocate {bytes} byte denoiser buffer")]
    OutOfMemory { bytes: usize },

    /// Width or height is zero.
    #[error("image dimensions must be non-zero")]
    EmptyImage,

    /// A buffer does not hold `width * height * 3` floats.
    #[error("{image} buffer holds {actual} floats, expected {expected} ({width}x{height}x3)")]
    BufferLength {
        image: &'static str,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// An auxiliary buffer does not match the color buffer's size.
    #[error("{image} buffer is {width}x{height} but the color buffer is {color_width}x{color_height}")]
    AuxSizeMismatch {
        image: &'static str,
        width: u32,
        height: u32,
        color_width: u32,
        color_height: u32,
    },

    /// A buffer is not in the required three-channel float format.
    #[error("{image} buffer must be in the {expected} format, got {format}")]
    FormatMismatch {
        image: &'static str,
        expected: &'static str,
        format: String,
    },

    /// `hdr` and `srgb` were both requested.
    #[error("hdr and srgb are mutually exclusive")]
    ExclusiveToneMapping,
}

impl Error {
    /// Whether this is an input/configuration error (as opposed to a failure
    /// reported by the library or the allocator).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::EmptyImage
                | Error::BufferLength { .. }
                | Error::AuxSizeMismatch { .. }
                | Error::FormatMismatch { .. }
                | Error::ExclusiveToneMapping
        )
    }
}

//! Render-target collaborator contract and buffer validation.
//!
//! Render targets are owned by the host's rendering extension; this module
//! only describes the shape a target must report before its storage may be
//! handed to the denoiser, and the checks that run before any library
//! resources are committed.

use crate::Error;

/// Pixel format identifier a render target must report for denoising:
/// three packed 32-bit float channels per pixel.
pub const FORMAT_RGB32F: &str = "rgb32f";

/// Channels per pixel in a denoisable buffer.
pub const CHANNELS: usize = 3;

/// Auxiliary guide image kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuxKind {
    Albedo,
    Normal,
}

impl AuxKind {
    /// The filter image name this guide binds to.
    pub fn image_name(self) -> &'static str {
        match self {
            AuxKind::Albedo => "albedo",
            AuxKind::Normal => "normal",
        }
    }
}

/// Shape and format of a render target, as reported by the host object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl TargetDesc {
    /// Float count of the target's pixel storage.
    pub fn expected_len(&self) -> usize {
        expected_len(self.width, self.height)
    }
}

/// Float count of a `width` x `height` three-channel image.
pub fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// Validates the primary color target: non-zero dimensions, rgb32f format.
pub fn check_color(desc: &TargetDesc) -> Result<(), Error> {
    if desc.width == 0 || desc.height == 0 {
        return Err(Error::EmptyImage);
    }
    check_format("color", desc)
}

/// Validates a guide target against the color target: rgb32f format and an
/// exact width/height match.
pub fn check_aux(kind: AuxKind, desc: &TargetDesc, color: &TargetDesc) -> Result<(), Error> {
    check_format(kind.image_name(), desc)?;
    if desc.width != color.width || desc.height != color.height {
        return Err(Error::AuxSizeMismatch {
            image: kind.image_name(),
            width: desc.width,
            height: desc.height,
            color_width: color.width,
            color_height: color.height,
        });
    }
    Ok(())
}

fn check_format(image: &'static str, desc: &TargetDesc) -> Result<(), Error> {
    if desc.format != FORMAT_RGB32F {
        return Err(Error::FormatMismatch {
            image,
            expected: FORMAT_RGB32F,
            format: desc.format.clone(),
        });
    }
    Ok(())
}

/// Validates that a borrowed pixel buffer holds `width * height * 3` floats.
pub fn check_len(
    image: &'static str,
    width: u32,
    height: u32,
    actual: usize,
) -> Result<(), Error> {
    let expected = expected_len(width, height);
    if actual != expected {
        return Err(Error::BufferLength {
            image,
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb32f(width: u32, height: u32) -> TargetDesc {
        TargetDesc {
            width,
            height,
            format: FORMAT_RGB32F.to_string(),
        }
    }

    #[test]
    fn color_requires_nonzero_dimensions() {
        assert!(matches!(check_color(&rgb32f(0, 4)), Err(Error::EmptyImage)));
        assert!(check_color(&rgb32f(4, 4)).is_ok());
    }

    #[test]
    fn color_requires_rgb32f() {
        let desc = TargetDesc {
            width: 4,
            height: 4,
            format: "rgba8".to_string(),
        };
        let err = check_color(&desc).unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { image: "color", .. }));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn aux_must_match_color_size() {
        let color = rgb32f(4, 4);
        let err = check_aux(AuxKind::Albedo, &rgb32f(2, 2), &color).unwrap_err();
        match err {
            Error::AuxSizeMismatch { image, width, height, color_width, color_height } => {
                assert_eq!(image, "albedo");
                assert_eq!((width, height), (2, 2));
                assert_eq!((color_width, color_height), (4, 4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(check_aux(AuxKind::Normal, &rgb32f(4, 4), &color).is_ok());
    }

    #[test]
    fn aux_format_is_checked_before_size() {
        let color = rgb32f(4, 4);
        let bad = TargetDesc {
            width: 2,
            height: 2,
            format: "rgb16f".to_string(),
        };
        let err = check_aux(AuxKind::Normal, &bad, &color).unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { image: "normal", .. }));
    }

    #[test]
    fn buffer_length_must_be_w_h_3() {
        assert!(check_len("color", 4, 4, 48).is_ok());
        let err = check_len("color", 4, 4, 47).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferLength { expected: 48, actual: 47, .. }
        ));
    }
}

//! # oidn-py
//!
//! [Intel Open Image Denoise](https://www.openimagedenoise.org) (OIDN) for engine-embedded Python.
//! Gives the host's render targets an in-place `denoise` method and exposes a raw device/filter
//! namespace for scripts that want per-attribute control.
//!
//! This crate targets **OIDN 2.4.x**. All denoising is delegated to the library; the code here
//! marshals script values, validates render-target buffers, and keeps device/filter handles from
//! leaking across error paths.
//!
//! ## Setup
//!
//! Build and install OIDN 2.4.x (e.g. from <https://github.com/OpenImageDenoise/oidn>), then either:
//!
//! - Set **`OIDN_DIR`** to the install directory (containing `include/` and `lib/`), or
//! - Use **pkg-config** (Linux/macOS) with `OpenImageDenoise` installed.
//!
//! Build the extension module with `maturin build --features extension-module`.
//!
//! ## Example: from the embedded interpreter
//!
//! ```python
//! import oidn_py
//! oidn_py.attach("my_render_ext")   # or the render extension calls
//!                                   # oidn_py.register_render_target(RenderTarget) itself
//!
//! rt.denoise(albedo=albedo_rt, normal=normal_rt,
//!            albedo_noisy=True, normal_noisy=True)
//! ```
//!
//! ## Example: denoise CPU buffers from Rust
//!
//! ```ignore
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use oidn_py::{Device, RtFilter};
//!
//! let device = Device::new()?;
//! let mut filter = RtFilter::new(&device)?;
//! filter.set_dimensions(width, height).set_hdr(true);
//! filter.execute_in_place(&mut color_rgb_f32)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod denoise;
pub mod device;
pub mod error;
pub mod filter;
#[cfg(feature = "python")]
mod python;
mod sys;
pub mod target;

#[cfg(test)]
mod tests;

pub use buffer::DeviceBuffer;
pub use denoise::{denoise_in_place, DenoiseOptions};
pub use device::{take_global_error, Device};
pub use error::Error;
pub use filter::{prefilter_aux_in_place, Filter, Quality, RtFilter};
pub use target::{AuxKind, TargetDesc, CHANNELS, FORMAT_RGB32F};

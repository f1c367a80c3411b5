//! Python binding layer: render-target denoise methods, the raw handle
//! namespace, and extension registration.
//!
//! Render targets are duck-typed host objects from the engine's rendering
//! extension. The contract: `is_valid()`, `get_width()`, `get_height()`,
//! `get_format()` returning [`FORMAT_RGB32F`], and `get_data()` returning a
//! writable float32 numpy array of shape `(height, width, 3)` viewing the
//! target's own storage. Denoising writes back through that view, in place.

use crate::buffer::DeviceBuffer;
use crate::denoise::{denoise_in_place, DenoiseOptions};
use crate::device::Device;
use crate::filter::Filter;
use crate::target::{self, AuxKind, TargetDesc, FORMAT_RGB32F};
use crate::Error;
use numpy::PyReadwriteArray3;
use pyo3::exceptions::{PyMemoryError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyType};
use pyo3::{wrap_pyfunction, wrap_pyfunction_bound};
use std::collections::HashMap;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        match err {
            e if e.is_invalid_input() => PyValueError::new_err(e.to_string()),
            e @ Error::OutOfMemory { .. } => PyMemoryError::new_err(e.to_string()),
            e => PyRuntimeError::new_err(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Render-target extraction
// ---------------------------------------------------------------------------

/// A validated borrow of a host render target: its reported shape plus a
/// writable view of its pixel storage. The write borrow is taken up front,
/// so passing the same target twice fails instead of aliasing.
struct TargetRef<'py> {
    desc: TargetDesc,
    data: PyReadwriteArray3<'py, f32>,
}

impl<'py> TargetRef<'py> {
    fn pixels(&mut self, role: &'static str) -> PyResult<&mut [f32]> {
        self.data.as_slice_mut().map_err(|_| {
            PyValueError::new_err(format!(
                "{role} render target data must be C-contiguous"
            ))
        })
    }
}

fn extract_target<'py>(obj: &Bound<'py, PyAny>, role: &'static str) -> PyResult<TargetRef<'py>> {
    let valid: bool = obj.call_method0("is_valid")?.extract()?;
    if !valid {
        return Err(PyValueError::new_err(format!(
            "{role} render target is invalid"
        )));
    }
    let width: u32 = obj.call_method0("get_width")?.extract()?;
    let height: u32 = obj.call_method0("get_height")?.extract()?;
    let format: String = obj.call_method0("get_format")?.extract()?;
    let data: PyReadwriteArray3<'py, f32> =
        obj.call_method0("get_data")?.extract().map_err(|_| {
            PyTypeError::new_err(format!(
                "{role} render target data must be a writable float32 array of shape (height, width, 3)"
            ))
        })?;

    let dims = data.as_array().dim();
    if dims != (height as usize, width as usize, target::CHANNELS) {
        return Err(PyValueError::new_err(format!(
            "{role} render target data has shape {:?}, expected ({}, {}, {})",
            dims,
            height,
            width,
            target::CHANNELS
        )));
    }

    Ok(TargetRef {
        desc: TargetDesc {
            width,
            height,
            format,
        },
        data,
    })
}

/// Shared body of the three render-target methods. The outer `PyResult`
/// carries protocol and configuration failures (always raised); the inner
/// result carries the denoise outcome so the boolean variant can choose.
fn run_denoise(
    rt: &Bound<'_, PyAny>,
    albedo_rt: Option<&Bound<'_, PyAny>>,
    normal_rt: Option<&Bound<'_, PyAny>>,
    options: &DenoiseOptions,
) -> PyResult<Result<(), Error>> {
    options.validate()?;

    let mut color = extract_target(rt, "color")?;
    target::check_color(&color.desc)?;

    let mut albedo = albedo_rt
        .map(|obj| extract_target(obj, "albedo"))
        .transpose()?;
    if let Some(a) = &albedo {
        target::check_aux(AuxKind::Albedo, &a.desc, &color.desc)?;
    }
    let mut normal = normal_rt
        .map(|obj| extract_target(obj, "normal"))
        .transpose()?;
    if let Some(n) = &normal {
        target::check_aux(AuxKind::Normal, &n.desc, &color.desc)?;
    }

    let (width, height) = (color.desc.width, color.desc.height);
    let color_pixels = color.pixels("color")?;
    let albedo_pixels = match albedo.as_mut() {
        Some(t) => Some(t.pixels("albedo")?),
        None => None,
    };
    let normal_pixels = match normal.as_mut() {
        Some(t) => Some(t.pixels("normal")?),
        None => None,
    };

    Ok(denoise_in_place(
        width,
        height,
        color_pixels,
        albedo_pixels,
        normal_pixels,
        options,
    ))
}

// ---------------------------------------------------------------------------
// Render-target methods
// ---------------------------------------------------------------------------

/// Implementation behind `RenderTarget.denoise()`: the one-click shape.
/// HDR tone mode, guides treated as clean (prefiltered first when flagged
/// noisy). Raises on any failure.
#[pyfunction]
#[pyo3(signature = (rt, albedo=None, normal=None, albedo_noisy=false, normal_noisy=false))]
fn denoise_render_target(
    rt: &Bound<'_, PyAny>,
    albedo: Option<&Bound<'_, PyAny>>,
    normal: Option<&Bound<'_, PyAny>>,
    albedo_noisy: bool,
    normal_noisy: bool,
) -> PyResult<()> {
    let options = DenoiseOptions {
        hdr: true,
        clean_aux: true,
        albedo_noisy,
        normal_noisy,
        ..Default::default()
    };
    run_denoise(rt, albedo, normal, &options)?.map_err(PyErr::from)
}

/// Implementation behind `RenderTarget.try_denoise()`: invalid input still
/// raises, but a denoiser failure returns `False` instead.
#[pyfunction]
#[pyo3(signature = (rt, hdr, clean_aux, albedo=None, normal=None))]
fn try_denoise_render_target(
    rt: &Bound<'_, PyAny>,
    hdr: bool,
    clean_aux: bool,
    albedo: Option<&Bound<'_, PyAny>>,
    normal: Option<&Bound<'_, PyAny>>,
) -> PyResult<bool> {
    let options = DenoiseOptions {
        hdr,
        clean_aux,
        ..Default::default()
    };
    match run_denoise(rt, albedo, normal, &options)? {
        Ok(()) => Ok(true),
        Err(err) if err.is_invalid_input() => Err(err.into()),
        Err(err) => {
            log::warn!("denoise failed: {err}");
            Ok(false)
        }
    }
}

const RECOGNIZED_OPTIONS: [&str; 6] = [
    "albedo",
    "normal",
    "albedo_noisy",
    "normal_noisy",
    "hdr",
    "srgb",
];

/// Implementation behind `RenderTarget.denoise_with(options)`.
///
/// Recognized keys: `albedo`, `normal`, `albedo_noisy`, `normal_noisy`,
/// `hdr`, `srgb`. The noisy flag is mandatory whenever the matching guide
/// is supplied; it has no default here.
#[pyfunction]
fn denoise_render_target_with(
    rt: &Bound<'_, PyAny>,
    options: &Bound<'_, PyDict>,
) -> PyResult<()> {
    for key in options.keys() {
        let key: String = key
            .extract()
            .map_err(|_| PyTypeError::new_err("option keys must be strings"))?;
        if !RECOGNIZED_OPTIONS.contains(&key.as_str()) {
            return Err(PyValueError::new_err(format!(
                "unrecognized option {key:?}; recognized options are {}",
                RECOGNIZED_OPTIONS.join(", ")
            )));
        }
    }

    let albedo = dict_target(options, "albedo")?;
    let normal = dict_target(options, "normal")?;
    let albedo_noisy = dict_flag(options, "albedo_noisy")?;
    let normal_noisy = dict_flag(options, "normal_noisy")?;
    if albedo.is_some() && albedo_noisy.is_none() {
        return Err(PyValueError::new_err(
            "albedo supplied without albedo_noisy; the flag has no default",
        ));
    }
    if normal.is_some() && normal_noisy.is_none() {
        return Err(PyValueError::new_err(
            "normal supplied without normal_noisy; the flag has no default",
        ));
    }

    let opts = DenoiseOptions {
        hdr: dict_flag(options, "hdr")?.unwrap_or(false),
        srgb: dict_flag(options, "srgb")?.unwrap_or(false),
        // A supplied guide is either prefiltered here or asserted clean by
        // its (mandatory) noisy flag being false.
        clean_aux: albedo.is_some() || normal.is_some(),
        albedo_noisy: albedo_noisy.unwrap_or(false),
        normal_noisy: normal_noisy.unwrap_or(false),
        ..Default::default()
    };
    run_denoise(rt, albedo.as_ref(), normal.as_ref(), &opts)?.map_err(PyErr::from)
}

/// A render-target entry in the options dict; an explicit `None` counts as
/// absent.
fn dict_target<'py>(
    options: &Bound<'py, PyDict>,
    key: &str,
) -> PyResult<Option<Bound<'py, PyAny>>> {
    Ok(options.get_item(key)?.filter(|v| !v.is_none()))
}

fn dict_flag(options: &Bound<'_, PyDict>, key: &'static str) -> PyResult<Option<bool>> {
    match options.get_item(key)? {
        Some(v) if !v.is_none() => v
            .extract::<bool>()
            .map(Some)
            .map_err(|_| PyTypeError::new_err(format!("option {key:?} must be a bool"))),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Raw handle namespace
// ---------------------------------------------------------------------------

struct BoundImage {
    buffer: DeviceBuffer,
    width: u32,
    height: u32,
}

/// A denoising device held by the script. Released when the wrapper is
/// collected (and no filter created on it is still alive).
#[pyclass(name = "Device", module = "oidn_py")]
pub struct RawDevice {
    device: Device,
}

#[pymethods]
impl RawDevice {
    /// Creates a ray tracing denoising filter on this device.
    fn new_raytracing_filter(&self) -> PyResult<RawFilter> {
        Ok(RawFilter {
            filter: Filter::new(&self.device, "RT").map_err(PyErr::from)?,
            images: HashMap::new(),
        })
    }

    /// Returns and clears the device's error slot: `None`, or a
    /// `(code, message)` tuple with the library's message verbatim.
    fn get_error(&self) -> Option<(u32, String)> {
        self.device.take_error().map(|err| match err {
            Error::Oidn { code, message } => (code, message),
            other => (0, other.to_string()),
        })
    }
}

/// A ray tracing filter with per-attribute bindings. Bulk data handed in
/// through `set_shared_image` is copied into library-side buffers owned by
/// this object; the `output` binding doubles as the readback source for
/// `execute`. Everything is released when the wrapper is collected.
#[pyclass(name = "RaytracingFilter", module = "oidn_py")]
pub struct RawFilter {
    filter: Filter,
    images: HashMap<String, BoundImage>,
}

#[pymethods]
impl RawFilter {
    /// Binds the named image (`"color"`, `"albedo"`, `"normal"`,
    /// `"output"`). `data` is either a sequence of `width * height * 3`
    /// numbers, copied element by element into a fresh native buffer, or an
    /// int element count for a zero-initialized buffer (the usual choice
    /// for `"output"`).
    fn set_shared_image(
        &mut self,
        name: &str,
        data: &Bound<'_, PyAny>,
        width: u32,
        height: u32,
    ) -> PyResult<()> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage.into());
        }
        let expected = target::expected_len(width, height);

        let buffer = if let Ok(count) = data.extract::<usize>() {
            if count != expected {
                return Err(PyValueError::new_err(format!(
                    "image {name:?} element count {count} does not match {width}x{height}x3 = {expected}"
                )));
            }
            DeviceBuffer::zeroed_f32s(self.filter.device(), count)
        } else {
            let values: Vec<f32> = data.extract().map_err(|_| {
                PyTypeError::new_err(format!(
                    "image {name:?} data must be a sequence of numbers or an element count"
                ))
            })?;
            if values.len() != expected {
                return Err(PyValueError::new_err(format!(
                    "image {name:?} holds {} floats, expected {expected} ({width}x{height}x3)",
                    values.len()
                )));
            }
            DeviceBuffer::from_f32s(self.filter.device(), &values)
        }
        .map_err(PyErr::from)?;

        self.filter.set_image(name, &buffer, width, height);
        self.images
            .insert(name.to_string(), BoundImage { buffer, width, height });
        Ok(())
    }

    /// Sets a boolean filter attribute (e.g. `"hdr"`, `"srgb"`,
    /// `"cleanAux"`).
    fn set1b(&self, name: &str, value: bool) {
        self.filter.set_bool(name, value);
    }

    /// Commits attribute changes. Must be called before `execute`.
    fn commit(&self) {
        self.filter.commit();
    }

    /// Runs the filter and returns the denoised output as a new list of
    /// floats, index-aligned with the input ordering.
    fn execute(&self) -> PyResult<Vec<f32>> {
        let output = self.images.get("output").ok_or_else(|| {
            PyValueError::new_err("no output image bound; set_shared_image(\"output\", ...) first")
        })?;

        self.filter.execute();
        self.filter.device().sync();
        if let Some(err) = self.filter.device().take_error() {
            return Err(err.into());
        }

        let mut result = vec![0.0f32; target::expected_len(output.width, output.height)];
        output.buffer.read_f32s(&mut result);
        Ok(result)
    }
}

/// Creates a denoising device using the best available backend.
#[pyfunction]
fn create_device() -> PyResult<RawDevice> {
    Ok(RawDevice {
        device: Device::new().map_err(PyErr::from)?,
    })
}

// ---------------------------------------------------------------------------
// Extension registration
// ---------------------------------------------------------------------------

// Plain Python functions bind as instance methods when set on a class;
// native functions do not, so the injected methods go through this shim.
const RT_METHOD_SHIM: &str = r#"
def denoise(self, albedo=None, normal=None, albedo_noisy=False, normal_noisy=False):
    """Denoise this render target in place (HDR, guides assumed clean)."""
    return _denoise_render_target(self, albedo, normal, albedo_noisy, normal_noisy)

def try_denoise(self, hdr, clean_aux, albedo=None, normal=None):
    """Denoise this render target in place; returns False instead of raising on a denoiser error."""
    return _try_denoise_render_target(self, hdr, clean_aux, albedo, normal)

def denoise_with(self, options):
    """Denoise this render target in place, configured by an options dict."""
    return _denoise_render_target_with(self, options)
"#;

const RT_METHOD_NAMES: [&str; 3] = ["denoise", "try_denoise", "denoise_with"];

/// Registers the denoise methods on a render-target class.
///
/// This is the hook a rendering extension calls from its own init with its
/// render-target class. Registration failures raise and abort the load;
/// they are never ignored.
#[pyfunction]
fn register_render_target(py: Python<'_>, cls: &Bound<'_, PyAny>) -> PyResult<()> {
    let cls = cls.downcast::<PyType>().map_err(|_| {
        PyTypeError::new_err("register_render_target expects the render-target class")
    })?;

    let scope = PyDict::new_bound(py);
    scope.set_item(
        "_denoise_render_target",
        wrap_pyfunction_bound!(denoise_render_target, py)?,
    )?;
    scope.set_item(
        "_try_denoise_render_target",
        wrap_pyfunction_bound!(try_denoise_render_target, py)?,
    )?;
    scope.set_item(
        "_denoise_render_target_with",
        wrap_pyfunction_bound!(denoise_render_target_with, py)?,
    )?;
    py.run_bound(RT_METHOD_SHIM, Some(&scope), None)?;

    for name in RT_METHOD_NAMES {
        let method = scope
            .get_item(name)?
            .ok_or_else(|| PyRuntimeError::new_err("render-target method shim is incomplete"))?;
        cls.setattr(name, method)?;
    }
    log::info!(
        "denoise methods registered on {}",
        cls.name().map(|n| n.to_string()).unwrap_or_default()
    );
    Ok(())
}

/// Looks up `RenderTarget` on an already-loadable rendering extension and
/// registers the denoise methods on it. For hosts whose render extension
/// does not call [`register_render_target`] itself. A missing module or
/// attribute raises; the failure is fatal, not ignored.
#[pyfunction]
fn attach(py: Python<'_>, module_name: &str) -> PyResult<()> {
    let module = py.import_bound(module_name)?;
    let cls = module.getattr("RenderTarget")?;
    register_render_target(py, &cls)
}

#[pymodule]
fn oidn_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // RUST_LOG controls extension logging; ignore re-init from reload.
    let _ = env_logger::try_init();

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("FORMAT_RGB32F", FORMAT_RGB32F)?;
    m.add_class::<RawDevice>()?;
    m.add_class::<RawFilter>()?;
    m.add_function(wrap_pyfunction!(create_device, m)?)?;
    m.add_function(wrap_pyfunction!(register_render_target, m)?)?;
    m.add_function(wrap_pyfunction!(attach, m)?)?;
    m.add_function(wrap_pyfunction!(denoise_render_target, m)?)?;
    m.add_function(wrap_pyfunction!(try_denoise_render_target, m)?)?;
    m.add_function(wrap_pyfunction!(denoise_render_target_with, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_py<F: FnOnce(Python<'_>)>(f: F) {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(f);
    }

    // The checks below all fire before any render target is touched, so a
    // placeholder object stands in for one.

    #[test]
    fn dict_variant_requires_noisy_flag_with_guide() {
        with_py(|py| {
            let rt = py.None().into_bound(py);
            let options = PyDict::new_bound(py);
            options.set_item("albedo", 1).unwrap();
            let err = denoise_render_target_with(&rt, &options).unwrap_err();
            assert!(err.is_instance_of::<PyValueError>(py));
            assert!(err.to_string().contains("albedo_noisy"));
        });
    }

    #[test]
    fn dict_variant_rejects_unknown_keys() {
        with_py(|py| {
            let rt = py.None().into_bound(py);
            let options = PyDict::new_bound(py);
            options.set_item("exposure", 1.5).unwrap();
            let err = denoise_render_target_with(&rt, &options).unwrap_err();
            assert!(err.is_instance_of::<PyValueError>(py));
            assert!(err.to_string().contains("exposure"));
        });
    }

    #[test]
    fn dict_variant_rejects_hdr_with_srgb() {
        with_py(|py| {
            let rt = py.None().into_bound(py);
            let options = PyDict::new_bound(py);
            options.set_item("hdr", true).unwrap();
            options.set_item("srgb", true).unwrap();
            let err = denoise_render_target_with(&rt, &options).unwrap_err();
            assert!(err.is_instance_of::<PyValueError>(py));
            assert!(err.to_string().contains("mutually exclusive"));
        });
    }

    #[test]
    fn registration_rejects_non_class() {
        with_py(|py| {
            let not_a_class = 42i64.into_py(py).into_bound(py);
            let err = register_render_target(py, &not_a_class).unwrap_err();
            assert!(err.is_instance_of::<PyTypeError>(py));
        });
    }

    #[test]
    fn registered_methods_bind_as_instance_methods() {
        with_py(|py| {
            let scope = PyDict::new_bound(py);
            py.run_bound(
                "class FakeTarget:\n    def is_valid(self):\n        return False\n",
                Some(&scope),
                None,
            )
            .unwrap();
            let cls = scope.get_item("FakeTarget").unwrap().unwrap();
            register_render_target(py, &cls).unwrap();

            for name in RT_METHOD_NAMES {
                assert!(cls.hasattr(name).unwrap());
            }

            // The injected method receives the instance: the invalid target
            // is rejected by the validation that runs first.
            let instance = cls.call0().unwrap();
            let err = instance.call_method0("denoise").unwrap_err();
            assert!(err.is_instance_of::<PyValueError>(py));
            assert!(err.to_string().contains("invalid"));
        });
    }
}

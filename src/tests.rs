//! Unit tests. Tests that execute a filter require OIDN to be built and
//! linked; validation tests return before any library resource is created.

use crate::{
    denoise_in_place, prefilter_aux_in_place, AuxKind, DenoiseOptions, Device, DeviceBuffer,
    Error, Filter, Quality, RtFilter,
};

// ---------------------------------------------------------------------------
// Validation (no library calls)
// ---------------------------------------------------------------------------

#[test]
fn options_reject_hdr_and_srgb() {
    let options = DenoiseOptions {
        hdr: true,
        srgb: true,
        ..Default::default()
    };
    assert!(matches!(
        options.validate(),
        Err(Error::ExclusiveToneMapping)
    ));

    let mut color = vec![0.0f32; 4 * 4 * 3];
    let err = denoise_in_place(4, 4, &mut color, None, None, &options).unwrap_err();
    assert!(matches!(err, Error::ExclusiveToneMapping));
}

#[test]
fn default_options_are_hdr_with_no_asserted_guides() {
    let options = DenoiseOptions::default();
    assert!(options.hdr);
    assert!(!options.srgb);
    assert!(!options.clean_aux);
    assert!(options.validate().is_ok());
}

#[test]
fn denoise_rejects_zero_dimensions() {
    let mut color = vec![0.0f32; 3];
    let err = denoise_in_place(0, 1, &mut color, None, None, &DenoiseOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::EmptyImage));
}

#[test]
fn denoise_rejects_wrong_color_length() {
    let mut color = vec![0.0f32; 10];
    let err = denoise_in_place(4, 4, &mut color, None, None, &DenoiseOptions::default())
        .unwrap_err();
    match err {
        Error::BufferLength { image, expected, actual, .. } => {
            assert_eq!(image, "color");
            assert_eq!(expected, 48);
            assert_eq!(actual, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Rejected before anything ran, so nothing was written.
    assert!(color.iter().all(|&v| v == 0.0));
}

#[test]
fn denoise_rejects_undersized_albedo() {
    let mut color = vec![0.5f32; 4 * 4 * 3];
    let mut albedo = vec![0.5f32; 2 * 2 * 3];
    let err = denoise_in_place(
        4,
        4,
        &mut color,
        Some(&mut albedo),
        None,
        &DenoiseOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::BufferLength { image: "albedo", .. }));
    assert!(color.iter().all(|&v| v == 0.5));
    assert!(albedo.iter().all(|&v| v == 0.5));
}

#[test]
fn error_messages_name_the_offending_image() {
    let err = Error::AuxSizeMismatch {
        image: "albedo",
        width: 2,
        height: 2,
        color_width: 4,
        color_height: 4,
    };
    let msg = err.to_string();
    assert!(msg.contains("albedo"));
    assert!(msg.contains("2x2"));
    assert!(msg.contains("4x4"));

    let err = Error::FormatMismatch {
        image: "normal",
        expected: crate::FORMAT_RGB32F,
        format: "rgba8".to_string(),
    };
    assert!(err.to_string().contains("normal"));
    assert!(err.is_invalid_input());
}

// ---------------------------------------------------------------------------
// Execution (require OIDN at runtime)
// ---------------------------------------------------------------------------

fn noisy_image(width: u32, height: u32, base: f32) -> Vec<f32> {
    let n = (width * height * 3) as usize;
    (0..n)
        .map(|i| {
            let x = (i as u64).wrapping_mul(0x9e3779b97f4a7c15);
            base + ((x >> 40) as f32 / (1 << 24) as f32 - 0.5) * 0.2
        })
        .collect()
}

#[test]
fn denoise_4x4_ldr_populates_output() {
    let mut color = noisy_image(4, 4, 0.5);
    let options = DenoiseOptions {
        hdr: false,
        ..Default::default()
    };
    denoise_in_place(4, 4, &mut color, None, None, &options).expect("denoise");
    assert_eq!(color.len(), 4 * 4 * 3);
    assert!(color.iter().all(|v| v.is_finite()));
}

#[test]
fn denoise_with_clean_guides_leaves_them_untouched() {
    let mut color = noisy_image(8, 8, 0.5);
    let mut albedo = vec![0.5f32; 8 * 8 * 3];
    let mut normal: Vec<f32> = (0..8 * 8)
        .flat_map(|_| [0.0f32, 0.0, 1.0])
        .collect();
    let albedo_before = albedo.clone();
    let normal_before = normal.clone();

    let options = DenoiseOptions {
        clean_aux: true,
        ..Default::default()
    };
    denoise_in_place(
        8,
        8,
        &mut color,
        Some(&mut albedo),
        Some(&mut normal),
        &options,
    )
    .expect("denoise with guides");

    // Guides were not flagged noisy, so no prefilter ran over them.
    assert_eq!(albedo, albedo_before);
    assert_eq!(normal, normal_before);
    assert!(color.iter().all(|v| v.is_finite()));
}

#[test]
fn prefilter_denoises_guide_in_place() {
    let device = Device::new().expect("device");
    let mut albedo = noisy_image(8, 8, 0.5);
    prefilter_aux_in_place(&device, AuxKind::Albedo, &mut albedo, 8, 8).expect("prefilter");
    assert_eq!(albedo.len(), 8 * 8 * 3);
    assert!(albedo.iter().all(|v| v.is_finite()));
}

#[test]
fn rt_filter_rejects_unset_dimensions() {
    let device = Device::new().expect("device");
    let filter = RtFilter::new(&device).expect("filter");
    let mut color = vec![0.0f32; 3];
    let err = filter.execute_in_place(&mut color).unwrap_err();
    assert!(matches!(err, Error::EmptyImage));
}

#[test]
fn rt_filter_rejects_wrong_buffer_length() {
    let device = Device::new().expect("device");
    let mut filter = RtFilter::new(&device).expect("filter");
    filter.set_dimensions(4, 4).set_quality(Quality::Fast);
    let mut color = vec![0.0f32; 10];
    let err = filter.execute_in_place(&mut color).unwrap_err();
    assert!(matches!(err, Error::BufferLength { image: "color", .. }));
}

#[test]
fn device_reports_library_version() {
    let device = Device::new().expect("device");
    assert!(device.get_int("version") > 0);
}

#[test]
fn device_buffer_reports_size() {
    let device = Device::new().expect("device");
    let buffer = DeviceBuffer::zeroed_f32s(&device, 48).expect("buffer");
    assert_eq!(buffer.size(), 48 * 4);
    assert_eq!(buffer.len_f32s(), 48);
}

#[test]
fn raw_filter_round_trip_is_index_aligned() {
    let device = Device::new().expect("device");
    let filter = Filter::new(&device, "RT").expect("filter");

    let n = 4 * 4 * 3;
    let input = noisy_image(4, 4, 0.5);
    let color = DeviceBuffer::from_f32s(&device, &input).expect("color buffer");
    let output = DeviceBuffer::zeroed_f32s(&device, n).expect("output buffer");

    filter.set_image("color", &color, 4, 4);
    filter.set_image("output", &output, 4, 4);
    filter.set_bool("hdr", false);
    filter.commit();
    filter.execute();
    device.sync();
    assert!(device.take_error().is_none());

    let mut result = vec![0.0f32; n];
    output.read_f32s(&mut result);
    assert_eq!(result.len(), n);
    assert!(result.iter().all(|v| v.is_finite()));
    // Smoothing a near-constant image stays near the constant at every index.
    assert!(result.iter().all(|v| (v - 0.5).abs() < 0.3));
}

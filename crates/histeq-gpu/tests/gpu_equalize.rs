//! GPU integration tests. Requires a real wgpu adapter; each test skips
//! itself when none is available.
//!
//! Run with: `cargo test -p histeq-gpu`
//!
//! Every pass is checked against the histeq-core CPU reference, which the
//! kernels are rounding-matched to (half-up), so comparisons are exact.

use std::sync::{Mutex, OnceLock};

use histeq_core::{Histogram, RasterImage, SampleBuffer, build_histogram, cumulate, equalize, remap};
use histeq_gpu::{EqualizePipeline, GpuContext, GpuError};

fn gpu_test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Create a test context, or `None` when the machine has no usable adapter.
fn create_test_context() -> Option<GpuContext> {
    match GpuContext::new(None) {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

/// Deterministic 3-channel test image with uneven per-channel spreads.
fn color_fixture(width: u32, height: u32) -> RasterImage {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.push(((x * 13 + y * 7) % 256) as u8);
            samples.push(((x * x + y) % 200) as u8);
            samples.push((64 + (x + y) % 64) as u8);
        }
    }
    RasterImage::new(width, height, 3, SampleBuffer::U8(samples)).unwrap()
}

#[test]
fn gpu_histogram_matches_cpu_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let image = color_fixture(31, 17);
    let gpu = pipeline.build_histogram(&image).expect("histogram stage");
    let cpu = build_histogram(&image);
    assert_eq!(gpu, cpu);

    for c in 0..3 {
        let sum: u32 = gpu.channel(c).iter().sum();
        assert_eq!(sum, image.pixel_count(), "channel {c} sum");
    }
}

#[test]
fn gpu_scan_matches_cpu_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let image = color_fixture(16, 16);
    let histogram = build_histogram(&image);
    let gpu = pipeline.cumulate(&histogram).expect("scan stage");
    let cpu = cumulate(&histogram);
    assert_eq!(gpu, cpu);

    for c in 0..3 {
        assert_eq!(gpu.pixel_count(c), image.pixel_count());
        for pair in gpu.channel(c).windows(2) {
            assert!(pair[0] <= pair[1], "channel {c} not non-decreasing");
        }
    }
}

#[test]
fn gpu_equalize_matches_cpu_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let image = color_fixture(37, 23);
    let gpu = pipeline.equalize(&image).expect("full pipeline");
    let cpu = equalize(&image).unwrap();
    assert_eq!(gpu.image, cpu);

    // The reported intermediates obey the stage invariants too.
    for c in 0..3 {
        let sum: u32 = gpu.histogram.channel(c).iter().sum();
        assert_eq!(sum, image.pixel_count());
        assert_eq!(gpu.cumulative.pixel_count(c), image.pixel_count());
    }
}

#[test]
fn gpu_equalize_uniform_image_is_a_no_op() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let image = RasterImage::new(8, 8, 1, SampleBuffer::U8(vec![142; 64])).unwrap();
    let out = pipeline.equalize(&image).expect("full pipeline");
    assert_eq!(out.image, image);
}

#[test]
fn gpu_equalize_preserves_shape_and_depth() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let samples: Vec<u16> = (0..6 * 4).map(|i| (i * 2000) as u16).collect();
    let image = RasterImage::new(6, 4, 1, SampleBuffer::U16(samples)).unwrap();
    let out = pipeline.equalize(&image).expect("full pipeline");
    assert_eq!(out.image.width(), image.width());
    assert_eq!(out.image.height(), image.height());
    assert_eq!(out.image.channels(), image.channels());
    assert_eq!(out.image.depth(), image.depth());
}

#[test]
fn gpu_remap_through_a_foreign_map_matches_cpu_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    // The map comes from a smaller image whose lowest sample is 10; the
    // remapped image has a different pixel count and contains samples below
    // that bin. Both must anchor to the map's own totals, not the image's.
    let map_source = RasterImage::new(
        4,
        4,
        1,
        SampleBuffer::U8((0..16u8).map(|i| 10 + i * 16).collect()),
    )
    .unwrap();
    let map = cumulate(&build_histogram(&map_source));
    let image = RasterImage::new(
        8,
        8,
        1,
        SampleBuffer::U8((0..64).map(|i| (i * 4 % 256) as u8).collect()),
    )
    .unwrap();

    let gpu = pipeline.remap(&image, &map).expect("remap stage");
    let cpu = remap(&image, &map).unwrap();
    assert_eq!(gpu, cpu);
}

#[test]
fn gpu_cumulate_rejects_malformed_histogram_before_dispatch() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let histogram = Histogram {
        counts: vec![0; 100],
        channels: 1,
    };
    let err = pipeline.cumulate(&histogram).unwrap_err();
    assert!(matches!(err, GpuError::Shape(_)), "got {err}");
}

#[test]
fn gpu_remap_rejects_mismatched_map_before_dispatch() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = create_test_context() else {
        return;
    };
    let pipeline = EqualizePipeline::new(&context);

    let image = color_fixture(4, 4);
    let gray = RasterImage::new(4, 4, 1, SampleBuffer::U8(vec![0; 16])).unwrap();
    let map = cumulate(&build_histogram(&gray));
    let err = pipeline.remap(&image, &map).unwrap_err();
    assert!(matches!(err, GpuError::Shape(_)), "got {err}");
}

//! Image decode/encode and conversion to the pipeline's sample layout.

use std::path::Path;

use histeq_core::{RasterImage, SampleBuffer, ShapeError};
use image::{DynamicImage, ImageBuffer, Luma, Rgb};

/// Errors that can occur while loading or saving images.
#[derive(Debug, thiserror::Error)]
pub enum ImageFileError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("decoded image has an invalid shape: {0}")]
    Shape(#[from] ShapeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load an image from disk into a [`RasterImage`].
///
/// 16-bit sources stay 16-bit (the pipeline normalizes internally and
/// widens back on output). `grayscale` collapses color input to
/// single-channel luminance before equalization.
pub fn load_image(path: &Path, grayscale: bool) -> Result<RasterImage, ImageFileError> {
    let img = image::open(path).map_err(ImageFileError::Decode)?;
    let sixteen_bit = matches!(
        img.color(),
        image::ColorType::L16 | image::ColorType::La16 | image::ColorType::Rgb16 | image::ColorType::Rgba16
    );
    let single_channel = grayscale || !img.color().has_color();

    let (width, height) = (img.width(), img.height());
    let (channels, samples) = match (single_channel, sixteen_bit) {
        (true, false) => (1, SampleBuffer::U8(img.to_luma8().into_raw())),
        (true, true) => (1, SampleBuffer::U16(img.to_luma16().into_raw())),
        (false, false) => (3, SampleBuffer::U8(img.to_rgb8().into_raw())),
        (false, true) => (3, SampleBuffer::U16(img.to_rgb16().into_raw())),
    };
    Ok(RasterImage::new(width, height, channels, samples)?)
}

/// Save a [`RasterImage`] to disk; format chosen from the file extension.
pub fn save_image(path: &Path, image: &RasterImage) -> Result<(), ImageFileError> {
    let (width, height) = (image.width(), image.height());
    let dynamic = match (image.channels(), image.samples()) {
        (1, SampleBuffer::U8(data)) => DynamicImage::ImageLuma8(
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data.clone())
                .expect("shape invariant holds"),
        ),
        (3, SampleBuffer::U8(data)) => DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data.clone())
                .expect("shape invariant holds"),
        ),
        (1, SampleBuffer::U16(data)) => DynamicImage::ImageLuma16(
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, data.clone())
                .expect("shape invariant holds"),
        ),
        (3, SampleBuffer::U16(data)) => DynamicImage::ImageRgb16(
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, data.clone())
                .expect("shape invariant holds"),
        ),
        // RasterImage::new only admits 1 or 3 channels.
        _ => unreachable!("channel count validated at construction"),
    };
    dynamic.save(path).map_err(ImageFileError::Encode)?;
    Ok(())
}

//! Raster image representation for the equalization pipeline.

use std::borrow::Cow;
use std::fmt;

use crate::error::ShapeError;

/// Supported bit depths for source images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDepth {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
}

impl fmt::Display for SampleDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U16 => write!(f, "16-bit"),
        }
    }
}

/// Channel-interleaved sample storage at the source bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> SampleDepth {
        match self {
            Self::U8(_) => SampleDepth::U8,
            Self::U16(_) => SampleDepth::U16,
        }
    }
}

/// Normalize a 16-bit sample to 8-bit with round-half-up semantics:
/// `round(v * 255 / 65535)`. Exact at the endpoints (0 → 0, 65535 → 255).
pub fn normalize_u16_to_u8(v: u16) -> u8 {
    ((u32::from(v) * 255 + 32767) / 65535) as u8
}

/// Widen an 8-bit sample back to 16-bit by bit replication (`v * 257`),
/// so 0 → 0 and 255 → 65535.
pub fn widen_u8_to_u16(v: u8) -> u16 {
    u16::from(v) * 257
}

/// A dense, channel-interleaved raster image.
///
/// Invariant, enforced at construction: `samples.len() == width * height *
/// channels`. The pipeline reads it immutably and produces a new image of
/// identical dimensions and depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: u32,
    samples: SampleBuffer,
}

impl RasterImage {
    /// Construct an image, validating the shape invariants.
    pub fn new(
        width: u32,
        height: u32,
        channels: u32,
        samples: SampleBuffer,
    ) -> Result<Self, ShapeError> {
        if channels != 1 && channels != 3 {
            return Err(ShapeError::ChannelCount(channels));
        }
        if width == 0 || height == 0 {
            return Err(ShapeError::EmptyArea { width, height });
        }
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(ShapeError::BufferLength {
                width,
                height,
                channels,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn depth(&self) -> SampleDepth {
        self.samples.depth()
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Samples reduced to the 8-bit range the binning scheme expects.
    ///
    /// 8-bit images borrow; 16-bit images are normalized per
    /// [`normalize_u16_to_u8`].
    pub fn samples_u8(&self) -> Cow<'_, [u8]> {
        match &self.samples {
            SampleBuffer::U8(v) => Cow::Borrowed(v.as_slice()),
            SampleBuffer::U16(v) => {
                Cow::Owned(v.iter().map(|&s| normalize_u16_to_u8(s)).collect())
            }
        }
    }

    /// Rebuild an image of this image's shape and depth from 8-bit samples,
    /// widening back to 16-bit where the source was 16-bit.
    pub fn with_samples_u8(&self, samples: Vec<u8>) -> Result<Self, ShapeError> {
        let buffer = match self.depth() {
            SampleDepth::U8 => SampleBuffer::U8(samples),
            SampleDepth::U16 => {
                SampleBuffer::U16(samples.iter().map(|&s| widen_u8_to_u16(s)).collect())
            }
        };
        Self::new(self.width, self.height, self.channels, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_bad_buffer_length() {
        let err = RasterImage::new(2, 2, 1, SampleBuffer::U8(vec![0; 3])).unwrap_err();
        assert!(matches!(err, ShapeError::BufferLength { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn construction_rejects_zero_area() {
        let err = RasterImage::new(0, 4, 1, SampleBuffer::U8(vec![])).unwrap_err();
        assert_eq!(err, ShapeError::EmptyArea { width: 0, height: 4 });
        let err = RasterImage::new(4, 0, 3, SampleBuffer::U8(vec![])).unwrap_err();
        assert_eq!(err, ShapeError::EmptyArea { width: 4, height: 0 });
    }

    #[test]
    fn construction_rejects_bad_channel_count() {
        let err = RasterImage::new(1, 1, 2, SampleBuffer::U8(vec![0, 0])).unwrap_err();
        assert_eq!(err, ShapeError::ChannelCount(2));
    }

    #[test]
    fn normalization_is_exact_at_endpoints() {
        assert_eq!(normalize_u16_to_u8(0), 0);
        assert_eq!(normalize_u16_to_u8(65535), 255);
    }

    #[test]
    fn normalization_rounds_half_up() {
        // 256/65535 * 255 = 0.996 → 1; 257/65535 * 255 = 1.0 → 1.
        assert_eq!(normalize_u16_to_u8(256), 1);
        assert_eq!(normalize_u16_to_u8(257), 1);
        // 32767/65535 * 255 = 127.498 → 127.
        assert_eq!(normalize_u16_to_u8(32767), 127);
        // 32768/65535 * 255 = 127.502 → 128.
        assert_eq!(normalize_u16_to_u8(32768), 128);
    }

    #[test]
    fn widening_inverts_normalization_at_endpoints() {
        assert_eq!(widen_u8_to_u16(0), 0);
        assert_eq!(widen_u8_to_u16(255), 65535);
        for v in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(normalize_u16_to_u8(widen_u8_to_u16(v)), v);
        }
    }

    #[test]
    fn samples_u8_borrows_for_8bit_sources() {
        let img = RasterImage::new(2, 1, 1, SampleBuffer::U8(vec![7, 9])).unwrap();
        assert!(matches!(img.samples_u8(), Cow::Borrowed(_)));
    }

    #[test]
    fn with_samples_u8_preserves_depth() {
        let img = RasterImage::new(1, 2, 1, SampleBuffer::U16(vec![0, 65535])).unwrap();
        let rebuilt = img.with_samples_u8(vec![0, 255]).unwrap();
        assert_eq!(rebuilt.depth(), SampleDepth::U16);
        assert_eq!(rebuilt.samples(), &SampleBuffer::U16(vec![0, 65535]));
    }
}

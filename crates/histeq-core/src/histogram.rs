//! Histogram and cumulative map types, plus CPU reference implementations
//! of the three pipeline stages.
//!
//! The GPU passes in `histeq-gpu` implement the same contracts; these
//! functions are the test oracle and the shape/precondition logic shared
//! with the device path.

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;
use crate::image::RasterImage;

/// Number of intensity bins per channel. Samples are depth-normalized to
/// 8-bit before binning, so this is fixed at 256.
pub const BIN_COUNT: usize = 256;

/// Per-channel intensity bin counts, channel-major: all bins for channel 0,
/// then channel 1, and so on. Each channel's counts sum to the pixel count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u32>,
    pub channels: u32,
}

impl Histogram {
    /// Bin counts for one channel.
    pub fn channel(&self, c: u32) -> &[u32] {
        let base = c as usize * BIN_COUNT;
        &self.counts[base..base + BIN_COUNT]
    }

    /// Precondition check: does `counts` hold exactly `channels` blocks of
    /// [`BIN_COUNT`] bins? The fields are public, so device entry points
    /// verify this before sizing buffers from it.
    pub fn check_shape(&self) -> Result<(), ShapeError> {
        let expected = self.channels as usize * BIN_COUNT;
        if self.channels == 0 || self.counts.len() != expected {
            return Err(ShapeError::BinLayout {
                channels: self.channels,
                expected,
                actual: self.counts.len(),
            });
        }
        Ok(())
    }
}

/// Inclusive per-channel prefix sums over a [`Histogram`], same channel-major
/// layout. Entries are non-decreasing within a channel and the last entry of
/// each channel equals that channel's pixel count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeMap {
    pub counts: Vec<u32>,
    pub channels: u32,
    /// First nonzero cumulative value per channel, used to anchor the remap
    /// normalization. Equals the channel's pixel count when every pixel sits
    /// in a single bin.
    pub cdf_min: Vec<u32>,
}

impl CumulativeMap {
    /// Cumulative counts for one channel.
    pub fn channel(&self, c: u32) -> &[u32] {
        let base = c as usize * BIN_COUNT;
        &self.counts[base..base + BIN_COUNT]
    }

    /// Pixel count recorded in one channel (its last cumulative entry).
    pub fn pixel_count(&self, c: u32) -> u32 {
        self.channel(c)[BIN_COUNT - 1]
    }

    /// Precondition check: does this map's layout match the image's
    /// channel/bin layout? Reported before any remap work is dispatched.
    pub fn check_against(&self, image: &RasterImage) -> Result<(), ShapeError> {
        let map_bins = self.counts.len() / self.channels.max(1) as usize;
        if self.channels != image.channels()
            || self.counts.len() != self.channels as usize * BIN_COUNT
            || self.cdf_min.len() != self.channels as usize
        {
            return Err(ShapeError::MapMismatch {
                map_channels: self.channels,
                map_bins,
                image_channels: image.channels(),
                image_bins: BIN_COUNT,
            });
        }
        Ok(())
    }
}

/// Scatter-increment every sample into its channel's bins.
pub fn build_histogram(image: &RasterImage) -> Histogram {
    let channels = image.channels();
    let mut counts = vec![0u32; channels as usize * BIN_COUNT];
    let samples = image.samples_u8();
    for pixel in samples.chunks_exact(channels as usize) {
        for (c, &value) in pixel.iter().enumerate() {
            counts[c * BIN_COUNT + value as usize] += 1;
        }
    }
    Histogram { counts, channels }
}

/// Inclusive prefix sum per channel, recording each channel's first nonzero
/// cumulative value along the way.
pub fn cumulate(histogram: &Histogram) -> CumulativeMap {
    let channels = histogram.channels;
    let mut counts = vec![0u32; histogram.counts.len()];
    let mut cdf_min = vec![0u32; channels as usize];
    for c in 0..channels {
        let base = c as usize * BIN_COUNT;
        let mut running = 0u32;
        for i in 0..BIN_COUNT {
            running += histogram.counts[base + i];
            counts[base + i] = running;
            if cdf_min[c as usize] == 0 && running > 0 {
                cdf_min[c as usize] = running;
            }
        }
    }
    CumulativeMap {
        counts,
        channels,
        cdf_min,
    }
}

/// Remap one 8-bit sample through the normalized cumulative curve.
///
/// Rounding is half-up (`floor(x + 0.5)`), matching the device kernel.
/// A zero-variance channel (`cdf_min == pixel_count`) passes through.
pub fn remap_sample(value: u8, cdf: &[u32], cdf_min: u32, pixel_count: u32) -> u8 {
    if cdf_min >= pixel_count {
        return value;
    }
    let numer = cdf[value as usize].saturating_sub(cdf_min) as f32;
    let span = (pixel_count - cdf_min) as f32;
    (numer / span * 255.0 + 0.5).floor() as u8
}

/// Apply the cumulative map to every pixel, per channel.
///
/// The output image has the input's dimensions, channel count, and depth.
/// Map/image layout mismatches are reported before any work.
pub fn remap(image: &RasterImage, map: &CumulativeMap) -> Result<RasterImage, ShapeError> {
    map.check_against(image)?;
    let channels = image.channels() as usize;
    let samples = image.samples_u8();
    let mut out = Vec::with_capacity(samples.len());
    for pixel in samples.chunks_exact(channels) {
        for (c, &value) in pixel.iter().enumerate() {
            let cdf = map.channel(c as u32);
            out.push(remap_sample(
                value,
                cdf,
                map.cdf_min[c],
                map.pixel_count(c as u32),
            ));
        }
    }
    image.with_samples_u8(out)
}

/// Convenience: the full three-stage pipeline on the CPU.
pub fn equalize(image: &RasterImage) -> Result<RasterImage, ShapeError> {
    let histogram = build_histogram(image);
    let map = cumulate(&histogram);
    remap(image, &map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::SampleBuffer;

    fn gray(width: u32, height: u32, samples: Vec<u8>) -> RasterImage {
        RasterImage::new(width, height, 1, SampleBuffer::U8(samples)).unwrap()
    }

    /// 16x16 grayscale ramp covering all 256 values exactly once.
    fn full_ramp() -> RasterImage {
        gray(16, 16, (0..=255).collect())
    }

    #[test]
    fn histogram_sums_to_pixel_count_per_channel() {
        let samples: Vec<u8> = (0..12 * 9 * 3).map(|i| (i * 7 % 256) as u8).collect();
        let image = RasterImage::new(12, 9, 3, SampleBuffer::U8(samples)).unwrap();
        let histogram = build_histogram(&image);
        for c in 0..3 {
            let sum: u32 = histogram.channel(c).iter().sum();
            assert_eq!(sum, image.pixel_count(), "channel {c}");
        }
    }

    #[test]
    fn cumulative_map_is_non_decreasing_and_ends_at_pixel_count() {
        let samples: Vec<u8> = (0..40).map(|i| (i * 13 % 256) as u8).collect();
        let image = gray(8, 5, samples);
        let map = cumulate(&build_histogram(&image));
        let channel = map.channel(0);
        for pair in channel.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(map.pixel_count(0), image.pixel_count());
    }

    #[test]
    fn two_by_two_extremes_scenario() {
        let image = gray(2, 2, vec![0, 0, 255, 255]);
        let histogram = build_histogram(&image);
        assert_eq!(histogram.channel(0)[0], 2);
        assert_eq!(histogram.channel(0)[255], 2);
        assert_eq!(histogram.channel(0)[1..255].iter().sum::<u32>(), 0);

        let map = cumulate(&histogram);
        assert_eq!(map.channel(0)[0], 2);
        assert!(map.channel(0)[1..255].iter().all(|&v| v == 2));
        assert_eq!(map.channel(0)[255], 4);
        assert_eq!(map.cdf_min[0], 2);

        let out = remap(&image, &map).unwrap();
        assert_eq!(out.samples(), &SampleBuffer::U8(vec![0, 0, 255, 255]));
    }

    #[test]
    fn uniform_image_is_a_no_op() {
        let image = gray(4, 4, vec![93; 16]);
        let out = equalize(&image).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn degenerate_channel_passes_through_while_others_stretch() {
        // Channel 0 is flat; channels 1 and 2 span part of the range.
        let mut samples = Vec::new();
        for i in 0..4u8 {
            samples.extend_from_slice(&[50, i * 10, 100 + i * 20]);
        }
        let image = RasterImage::new(2, 2, 3, SampleBuffer::U8(samples)).unwrap();
        let out = equalize(&image).unwrap();
        let SampleBuffer::U8(out_samples) = out.samples() else {
            panic!("expected 8-bit output");
        };
        // Flat channel untouched.
        for pixel in out_samples.chunks_exact(3) {
            assert_eq!(pixel[0], 50);
        }
        // Non-degenerate channels end up stretched to the full range.
        let ch1: Vec<u8> = out_samples.chunks_exact(3).map(|p| p[1]).collect();
        let ch2: Vec<u8> = out_samples.chunks_exact(3).map(|p| p[2]).collect();
        assert_eq!(ch1, vec![0, 85, 170, 255]);
        assert_eq!(ch2, vec![0, 85, 170, 255]);
    }

    #[test]
    fn remap_is_monotonic_per_channel() {
        let samples: Vec<u8> = (0..64).map(|i| (i * i % 256) as u8).collect();
        let image = gray(8, 8, samples);
        let map = cumulate(&build_histogram(&image));
        let mut previous = 0u8;
        for value in 0..=255u8 {
            let mapped = remap_sample(value, map.channel(0), map.cdf_min[0], map.pixel_count(0));
            assert!(mapped >= previous, "remap({value}) regressed");
            previous = mapped;
        }
    }

    #[test]
    fn equalizing_a_linear_map_is_idempotent() {
        // A full ramp has a linear cumulative map, so equalization is exact
        // identity and re-equalizing changes nothing.
        let image = full_ramp();
        let once = equalize(&image).unwrap();
        assert_eq!(once, image);
        let twice = equalize(&once).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn output_preserves_shape_and_depth() {
        let samples: Vec<u16> = (0..24).map(|i| i * 2500).collect();
        let image = RasterImage::new(4, 2, 3, SampleBuffer::U16(samples)).unwrap();
        let out = equalize(&image).unwrap();
        assert_eq!(out.width(), image.width());
        assert_eq!(out.height(), image.height());
        assert_eq!(out.channels(), image.channels());
        assert_eq!(out.depth(), image.depth());
        assert_eq!(out.sample_count(), image.sample_count());
    }

    #[test]
    fn check_shape_rejects_wrong_bin_layout() {
        let short = Histogram {
            counts: vec![0; 100],
            channels: 1,
        };
        assert!(matches!(
            short.check_shape().unwrap_err(),
            ShapeError::BinLayout { expected: 256, actual: 100, .. }
        ));
        let good = Histogram {
            counts: vec![0; 3 * BIN_COUNT],
            channels: 3,
        };
        assert!(good.check_shape().is_ok());
    }

    #[test]
    fn remap_tolerates_samples_below_the_maps_first_bin() {
        // The map comes from an image whose lowest sample is 10 and whose
        // pixel count differs from the remapped image's. Samples below bin
        // 10 anchor to 0 instead of wrapping.
        let map_source = gray(4, 4, (0..16u8).map(|i| 10 + i * 16).collect());
        let map = cumulate(&build_histogram(&map_source));
        let image = gray(8, 8, (0..64).map(|i| (i * 4 % 256) as u8).collect());
        let out = remap(&image, &map).unwrap();
        let SampleBuffer::U8(out_samples) = out.samples() else {
            panic!("expected 8-bit output");
        };
        assert_eq!(out_samples[0], 0);
        assert_eq!(*out_samples.iter().max().unwrap(), 255);
    }

    #[test]
    fn remap_rejects_mismatched_map() {
        let image = RasterImage::new(2, 2, 3, SampleBuffer::U8(vec![0; 12])).unwrap();
        let map = cumulate(&build_histogram(&gray(2, 2, vec![0; 4])));
        let err = remap(&image, &map).unwrap_err();
        assert!(matches!(err, ShapeError::MapMismatch { map_channels: 1, image_channels: 3, .. }));
    }

    #[test]
    fn output_samples_stay_in_range_and_hit_extremes() {
        let image = gray(4, 2, vec![10, 10, 20, 30, 40, 50, 60, 60]);
        let out = equalize(&image).unwrap();
        let SampleBuffer::U8(out_samples) = out.samples() else {
            panic!("expected 8-bit output");
        };
        assert_eq!(*out_samples.iter().min().unwrap(), 0);
        assert_eq!(*out_samples.iter().max().unwrap(), 255);
    }
}

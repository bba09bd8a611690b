//! GPU buffer management for the equalization pipeline.
//!
//! Buffers are stage-scoped: freshly allocated per pipeline invocation,
//! never shared across runs.

use histeq_core::{BIN_COUNT, CumulativeMap, Histogram, RasterImage};
use wgpu::util::DeviceExt;

/// Handle to image samples stored as a storage buffer of `u32`, one sample
/// per element, channel-interleaved like the host layout.
pub struct GpuImageHandle {
    pub buffer: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl GpuImageHandle {
    /// Upload an image's depth-normalized samples to the GPU.
    pub fn upload(device: &wgpu::Device, image: &RasterImage) -> Self {
        let widened: Vec<u32> = image.samples_u8().iter().map(|&s| u32::from(s)).collect();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("histeq_image_upload"),
            contents: bytemuck::cast_slice(&widened),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            width: image.width(),
            height: image.height(),
            channels: image.channels(),
        }
    }

    /// Create an uninitialized sample buffer of the same shape for output.
    pub fn create_output(device: &wgpu::Device, width: u32, height: u32, channels: u32) -> Self {
        let size = u64::from(width) * u64::from(height) * u64::from(channels) * 4;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histeq_image_output"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            width,
            height,
            channels,
        }
    }

    /// Pixel count (not sample count).
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    /// Buffer size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.sample_count() as u64 * 4
    }
}

/// Bin-shaped buffers shared by the three passes: atomic bin counts, the
/// cumulative map, and the per-channel cdf-min side buffer.
pub struct HistogramBuffers {
    pub bins: wgpu::Buffer,
    pub cumulative: wgpu::Buffer,
    pub cdf_min: wgpu::Buffer,
    pub channels: u32,
}

impl HistogramBuffers {
    /// Create all bin buffers, zeroed. The histogram pass additionally
    /// clears `bins` on its encoder before dispatch.
    pub fn new(device: &wgpu::Device, channels: u32) -> Self {
        let bins = create_bin_buffer(device, "histeq_bins_buffer", channels, None);
        let cumulative = create_bin_buffer(device, "histeq_cumulative_buffer", channels, None);
        let cdf_min = create_cdf_min_buffer(device, channels, None);
        Self {
            bins,
            cumulative,
            cdf_min,
            channels,
        }
    }

    /// Create bin buffers with `bins` pre-filled from a host histogram,
    /// for running the scan stage on its own.
    pub fn with_histogram(device: &wgpu::Device, histogram: &Histogram) -> Self {
        let channels = histogram.channels;
        let bins = create_bin_buffer(device, "histeq_bins_buffer", channels, Some(&histogram.counts));
        let cumulative = create_bin_buffer(device, "histeq_cumulative_buffer", channels, None);
        let cdf_min = create_cdf_min_buffer(device, channels, None);
        Self {
            bins,
            cumulative,
            cdf_min,
            channels,
        }
    }

    /// Create bin buffers with the cumulative map and cdf-min pre-filled
    /// from the host, for running the remap stage on its own.
    pub fn with_map(device: &wgpu::Device, map: &CumulativeMap) -> Self {
        let channels = map.channels;
        let bins = create_bin_buffer(device, "histeq_bins_buffer", channels, None);
        let cumulative =
            create_bin_buffer(device, "histeq_cumulative_buffer", channels, Some(&map.counts));
        let cdf_min = create_cdf_min_buffer(device, channels, Some(&map.cdf_min));
        Self {
            bins,
            cumulative,
            cdf_min,
            channels,
        }
    }

    /// Number of `u32` entries in the bin and cumulative buffers.
    pub fn bin_len(&self) -> usize {
        self.channels as usize * BIN_COUNT
    }
}

fn create_bin_buffer(
    device: &wgpu::Device,
    label: &str,
    channels: u32,
    contents: Option<&[u32]>,
) -> wgpu::Buffer {
    match contents {
        Some(counts) => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(counts),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        }),
        None => device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: u64::from(channels) * BIN_COUNT as u64 * 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }),
    }
}

fn create_cdf_min_buffer(
    device: &wgpu::Device,
    channels: u32,
    contents: Option<&[u32]>,
) -> wgpu::Buffer {
    match contents {
        Some(values) => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("histeq_cdf_min_buffer"),
            contents: bytemuck::cast_slice(values),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        }),
        None => device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histeq_cdf_min_buffer"),
            size: u64::from(channels) * 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }),
    }
}

//! Pipeline driver: sequences histogram → scan → remap and owns every
//! host/device transfer between stages.
//!
//! No kernel logic lives here. Each stage is submitted and waited on
//! individually, with no cross-stage overlap; stage boundaries double as
//! the read-after-all-writes barrier the scan needs.

use std::time::{Duration, Instant};

use histeq_core::{CumulativeMap, Histogram, RasterImage};

use crate::buffers::{GpuImageHandle, HistogramBuffers};
use crate::context::GpuContext;
use crate::error::GpuError;
use crate::histogram_pass::HistogramPass;
use crate::readback::{download_u32, wait_idle};
use crate::remap_pass::RemapPass;
use crate::scan_pass::ScanPass;

/// Wall-clock duration of each pipeline phase. Observability only; the
/// stages are synchronous, so host-side spans bracket the device work.
///
/// `histogram` and `scan` include retrieval of their results (those stage
/// contracts are synchronous through readback); `download` is the final
/// output image transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub upload: Duration,
    pub histogram: Duration,
    pub scan: Duration,
    pub remap: Duration,
    pub download: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.upload + self.histogram + self.scan + self.remap + self.download
    }
}

/// Everything a pipeline run produces: the equalized image plus the
/// intermediate histogram and cumulative map for textual reporting.
pub struct EqualizeOutput {
    pub image: RasterImage,
    pub histogram: Histogram,
    pub cumulative: CumulativeMap,
    pub timings: StageTimings,
}

/// Orchestrates the full equalization pipeline on one compute environment.
///
/// The compiled passes are shared read-only across stages and across
/// repeated invocations; image and bin buffers are freshly allocated per
/// invocation and have no identity across runs.
pub struct EqualizePipeline {
    device: wgpu::Device,
    queue: wgpu::Queue,
    histogram_pass: HistogramPass,
    scan_pass: ScanPass,
    remap_pass: RemapPass,
}

impl EqualizePipeline {
    /// Compile all three kernel programs on the context's device.
    pub fn new(context: &GpuContext) -> Self {
        let device = context.device.clone();
        let queue = context.queue.clone();
        let histogram_pass = HistogramPass::new(&device);
        let scan_pass = ScanPass::new(&device);
        let remap_pass = RemapPass::new(&device);
        Self {
            device,
            queue,
            histogram_pass,
            scan_pass,
            remap_pass,
        }
    }

    /// Run the full pipeline: upload → histogram → scan → remap → download.
    pub fn equalize(&self, image: &RasterImage) -> Result<EqualizeOutput, GpuError> {
        let start = Instant::now();
        let source = GpuImageHandle::upload(&self.device, image);
        let buffers = HistogramBuffers::new(&self.device, image.channels());
        let output = GpuImageHandle::create_output(
            &self.device,
            image.width(),
            image.height(),
            image.channels(),
        );
        let upload = start.elapsed();
        tracing::debug!(?upload, pixels = image.pixel_count(), "image uploaded");

        let start = Instant::now();
        let histogram = self.run_histogram(&source, &buffers)?;
        let histogram_time = start.elapsed();
        tracing::debug!(elapsed = ?histogram_time, "histogram stage complete");

        let start = Instant::now();
        let cumulative = self.run_scan(&buffers)?;
        let scan_time = start.elapsed();
        tracing::debug!(elapsed = ?scan_time, "scan stage complete");

        let start = Instant::now();
        self.run_remap(&source, &buffers, &output)?;
        let remap_time = start.elapsed();
        tracing::debug!(elapsed = ?remap_time, "remap stage complete");

        let start = Instant::now();
        let result = self.download_image(&output, image)?;
        let download = start.elapsed();
        tracing::debug!(?download, "output image downloaded");

        Ok(EqualizeOutput {
            image: result,
            histogram,
            cumulative,
            timings: StageTimings {
                upload,
                histogram: histogram_time,
                scan: scan_time,
                remap: remap_time,
                download,
            },
        })
    }

    /// Stage 1 on its own: build the per-channel histogram of an image.
    /// Blocks until the device-side counts are retrieved.
    pub fn build_histogram(&self, image: &RasterImage) -> Result<Histogram, GpuError> {
        let source = GpuImageHandle::upload(&self.device, image);
        let buffers = HistogramBuffers::new(&self.device, image.channels());
        self.run_histogram(&source, &buffers)
    }

    /// Stage 2 on its own: cumulate a host-side histogram. Bin layout
    /// mismatches are reported before any dispatch.
    pub fn cumulate(&self, histogram: &Histogram) -> Result<CumulativeMap, GpuError> {
        histogram.check_shape()?;
        let buffers = HistogramBuffers::with_histogram(&self.device, histogram);
        self.run_scan(&buffers)
    }

    /// Stage 3 on its own: remap an image through a host-side cumulative
    /// map. Layout mismatches are reported before any dispatch.
    pub fn remap(
        &self,
        image: &RasterImage,
        map: &CumulativeMap,
    ) -> Result<RasterImage, GpuError> {
        map.check_against(image)?;
        let source = GpuImageHandle::upload(&self.device, image);
        let buffers = HistogramBuffers::with_map(&self.device, map);
        let output = GpuImageHandle::create_output(
            &self.device,
            image.width(),
            image.height(),
            image.channels(),
        );
        self.run_remap(&source, &buffers, &output)?;
        self.download_image(&output, image)
    }

    fn run_histogram(
        &self,
        source: &GpuImageHandle,
        buffers: &HistogramBuffers,
    ) -> Result<Histogram, GpuError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histeq_histogram_encoder"),
            });
        self.histogram_pass
            .dispatch(&self.device, &self.queue, source, buffers, &mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));

        let counts = download_u32(
            &self.device,
            &self.queue,
            &buffers.bins,
            buffers.bin_len(),
            "histogram",
        )?;
        Ok(Histogram {
            counts,
            channels: buffers.channels,
        })
    }

    fn run_scan(&self, buffers: &HistogramBuffers) -> Result<CumulativeMap, GpuError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histeq_scan_encoder"),
            });
        self.scan_pass
            .dispatch(&self.device, &self.queue, buffers, &mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));

        let counts = download_u32(
            &self.device,
            &self.queue,
            &buffers.cumulative,
            buffers.bin_len(),
            "scan",
        )?;
        let cdf_min = download_u32(
            &self.device,
            &self.queue,
            &buffers.cdf_min,
            buffers.channels as usize,
            "scan",
        )?;
        Ok(CumulativeMap {
            counts,
            channels: buffers.channels,
            cdf_min,
        })
    }

    fn run_remap(
        &self,
        source: &GpuImageHandle,
        buffers: &HistogramBuffers,
        output: &GpuImageHandle,
    ) -> Result<(), GpuError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histeq_remap_encoder"),
            });
        self.remap_pass.dispatch(
            &self.device,
            &self.queue,
            source,
            buffers,
            output,
            &mut encoder,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        wait_idle(&self.device, "remap")
    }

    fn download_image(
        &self,
        output: &GpuImageHandle,
        original: &RasterImage,
    ) -> Result<RasterImage, GpuError> {
        let widened = download_u32(
            &self.device,
            &self.queue,
            &output.buffer,
            output.sample_count(),
            "download",
        )?;
        let samples: Vec<u8> = widened.iter().map(|&s| s as u8).collect();
        Ok(original.with_samples_u8(samples)?)
    }
}

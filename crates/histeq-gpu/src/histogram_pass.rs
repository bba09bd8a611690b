//! Histogram builder pass: per-pixel scatter-increment into atomic bins.

use crate::buffers::{GpuImageHandle, HistogramBuffers};
use crate::shader::{create_pass_pipeline, pad2, storage_ro_entry, storage_rw_entry, uniform_entry};

/// Manages the `histogram.wgsl` compute pipeline and its resources.
///
/// One invocation per pixel; the channel loop runs inside the invocation so
/// a pixel's samples are binned by a single unit of work. Increments to
/// shared bins are atomic since concurrent pixels may hit the same bin.
pub struct HistogramPass {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    params_buf: wgpu::Buffer,
}

impl HistogramPass {
    /// Create the histogram pipeline. Compiles `histogram.wgsl`.
    pub fn new(device: &wgpu::Device) -> Self {
        let (pipeline, layout) = create_pass_pipeline(
            device,
            "histogram",
            include_str!("../shaders/histogram.wgsl"),
            "build_histogram",
            &[
                storage_ro_entry(0),
                storage_rw_entry(1),
                uniform_entry(2, 16),
            ],
        );

        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histeq_histogram_params"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            layout,
            params_buf,
        }
    }

    /// Record the histogram pass onto the encoder. Clears the bin buffer
    /// first so counts start from zero every invocation.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &GpuImageHandle,
        buffers: &HistogramBuffers,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let pixel_count = image.pixel_count();
        queue.write_buffer(
            &self.params_buf,
            0,
            bytemuck::cast_slice(&pad2(pixel_count, image.channels)),
        );

        encoder.clear_buffer(&buffers.bins, 0, None);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("histeq_histogram_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: image.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.bins.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params_buf.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("histeq_histogram_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(pixel_count.div_ceil(256), 1, 1);
    }
}

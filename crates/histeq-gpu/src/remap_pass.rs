//! Pixel remapper pass: gather through the normalized cumulative curve.

use crate::buffers::{GpuImageHandle, HistogramBuffers};
use crate::shader::{create_pass_pipeline, pad2, storage_ro_entry, storage_rw_entry, uniform_entry};

/// Manages the `remap.wgsl` compute pipeline and its resources.
///
/// One invocation per pixel reads and writes all of that pixel's channels,
/// so each cumulative lookup happens exactly once per sample. Channels with
/// zero variance (`cdf_min == pixel_count`) pass through unchanged.
pub struct RemapPass {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    params_buf: wgpu::Buffer,
}

impl RemapPass {
    /// Create the remap pipeline. Compiles `remap.wgsl`.
    pub fn new(device: &wgpu::Device) -> Self {
        let (pipeline, layout) = create_pass_pipeline(
            device,
            "remap",
            include_str!("../shaders/remap.wgsl"),
            "remap_pixels",
            &[
                storage_ro_entry(0),
                storage_ro_entry(1),
                storage_ro_entry(2),
                storage_rw_entry(3),
                uniform_entry(4, 16),
            ],
        );

        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histeq_remap_params"),
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

    /// Record the remap pass onto the encoder, writing into `output`.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &GpuImageHandle,
        buffers: &HistogramBuffers,
        output: &GpuImageHandle,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let pixel_count = source.pixel_count();
        queue.write_buffer(
            &self.params_buf,
            0,
            bytemuck::cast_slice(&pad2(pixel_count, source.channels)),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("histeq_remap_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: source.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.cumulative.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.cdf_min.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.params_buf.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("histeq_remap_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(pixel_count.div_ceil(256), 1, 1);
    }
}

//! Cumulative scanner pass: per-channel inclusive prefix sum.
//!
//! One invocation per channel walks its 256 bins sequentially. At 256
//! entries a work-efficient scan tree buys nothing, so this favors
//! determinism: the whole histogram is finalized before this pass runs
//! (driver sequencing), and each channel is scanned by exactly one unit.

use crate::buffers::HistogramBuffers;
use crate::shader::{create_pass_pipeline, pad, storage_ro_entry, storage_rw_entry, uniform_entry};

/// Manages the `scan.wgsl` compute pipeline and its resources.
pub struct ScanPass {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    params_buf: wgpu::Buffer,
}

impl ScanPass {
    /// Create the scan pipeline. Compiles `scan.wgsl`.
    pub fn new(device: &wgpu::Device) -> Self {
        let (pipeline, layout) = create_pass_pipeline(
            device,
            "scan",
            include_str!("../shaders/scan.wgsl"),
            "scan_channels",
            &[
                storage_ro_entry(0),
                storage_rw_entry(1),
                storage_rw_entry(2),
                uniform_entry(3, 16),
            ],
        );

        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histeq_scan_params"),
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

    /// Record the scan pass onto the encoder. Writes the cumulative buffer
    /// and the per-channel cdf-min side buffer.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        buffers: &HistogramBuffers,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        queue.write_buffer(
            &self.params_buf,
            0,
            bytemuck::cast_slice(&pad(buffers.channels)),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("histeq_scan_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.bins.as_entire_binding(),
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
                    resource: self.params_buf.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("histeq_scan_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(buffers.channels.div_ceil(64), 1, 1);
    }
}

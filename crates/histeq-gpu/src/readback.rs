//! GPU-to-CPU readback: staging copy, map, and blocking poll.
//!
//! Every transfer here is synchronous: the pipeline driver issues one
//! stage, waits for its results, then issues the next.

use std::sync::mpsc;

use crate::error::GpuError;

/// Copy a `u32` storage buffer to a staging buffer, block until the device
/// finishes, and return its contents. `stage` names the pipeline stage for
/// error context.
pub fn download_u32(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    len: usize,
    stage: &'static str,
) -> Result<Vec<u32>, GpuError> {
    let byte_size = len as u64 * 4;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("histeq_staging"),
        size: byte_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("histeq_readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, byte_size);
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = mpsc::channel();
    staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|source| GpuError::Poll { stage, source })?;

    match rx.try_recv() {
        Ok(Ok(())) => {}
        Ok(Err(source)) => return Err(GpuError::BufferMap { stage, source }),
        Err(_) => return Err(GpuError::MapLost { stage }),
    }

    let data = staging.slice(..).get_mapped_range();
    let values: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();
    Ok(values)
}

/// Block until all work submitted so far has completed on the device.
pub fn wait_idle(device: &wgpu::Device, stage: &'static str) -> Result<(), GpuError> {
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|source| GpuError::Poll { stage, source })?;
    Ok(())
}

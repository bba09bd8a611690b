//! Compute environment construction and adapter enumeration.
//!
//! The device, queue, and compiled programs are an explicitly constructed
//! object passed by reference into the pipeline; nothing here is ambient
//! global state. Created once per run, dropped at process exit.

use crate::error::GpuError;

/// The selected compute device and its dispatch queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Select an adapter and create a device + queue on it.
    ///
    /// `adapter_index` picks from [`list_adapters`] order; `None` lets wgpu
    /// choose a high-performance adapter.
    pub fn new(adapter_index: Option<usize>) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = match adapter_index {
            Some(index) => {
                let mut adapters = instance.enumerate_adapters(wgpu::Backends::all());
                let available = adapters.len();
                if index >= available {
                    return Err(GpuError::AdapterIndex { index, available });
                }
                adapters.swap_remove(index)
            }
            None => pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            }))?,
        };

        let adapter_info = adapter.get_info();
        tracing::info!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "selected adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("histeq_device"),
            ..Default::default()
        }))?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}

/// Enumerate every adapter wgpu can see, for `--list-devices` style output.
pub fn list_adapters() -> Vec<wgpu::AdapterInfo> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .map(|adapter| adapter.get_info())
        .collect()
}

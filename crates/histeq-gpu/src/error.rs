use histeq_core::ShapeError;

/// Fatal device errors plus the precondition class from `histeq-core`.
///
/// Device errors abort the current pipeline run and are never retried;
/// each variant names the stage it arose in.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("adapter request failed: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("adapter index {index} out of range ({available} available)")]
    AdapterIndex { index: usize, available: usize },
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("device poll failed in {stage} stage: {source}")]
    Poll {
        stage: &'static str,
        source: wgpu::PollError,
    },
    #[error("buffer readback failed in {stage} stage: {source}")]
    BufferMap {
        stage: &'static str,
        source: wgpu::BufferAsyncError,
    },
    #[error("buffer readback in {stage} stage never completed")]
    MapLost { stage: &'static str },
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

//! Histeq GPU — wgpu-based compute pipeline for histogram equalization.
//!
//! This crate owns all GPU resources. Three compute passes (histogram
//! build, per-channel scan, pixel remap) are sequenced by
//! [`pipeline::EqualizePipeline`], which also owns every host/device
//! transfer. `histeq-core` provides the data model and the CPU reference
//! the integration tests compare against.

pub mod buffers;
pub mod context;
pub mod error;
pub mod histogram_pass;
pub mod pipeline;
pub mod readback;
pub mod remap_pass;
pub mod scan_pass;
mod shader;

pub use context::{GpuContext, list_adapters};
pub use error::GpuError;
pub use pipeline::{EqualizeOutput, EqualizePipeline, StageTimings};

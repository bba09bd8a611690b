//! Histeq Core — domain layer for histogram equalization.
//!
//! This crate contains the image and histogram data model, depth
//! normalization, and CPU reference implementations of all three pipeline
//! stages. No GPU or framework dependencies — `histeq-gpu` builds on top
//! of it and its integration tests use these functions as the oracle.

pub mod error;
pub mod histogram;
pub mod image;

// Re-exports for convenience.
pub use error::ShapeError;
pub use histogram::{
    BIN_COUNT, CumulativeMap, Histogram, build_histogram, cumulate, equalize, remap,
};
pub use image::{RasterImage, SampleBuffer, SampleDepth};

/// Precondition violations: shapes that don't line up, reported before any
/// device work is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error(
        "sample buffer has {actual} samples, expected {width}x{height}x{channels} = {expected}"
    )]
    BufferLength {
        width: u32,
        height: u32,
        channels: u32,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported channel count {0} (expected 1 or 3)")]
    ChannelCount(u32),
    #[error("image has zero area ({width}x{height})")]
    EmptyArea { width: u32, height: u32 },
    #[error("histogram has {actual} bins for {channels} channels, expected {expected}")]
    BinLayout {
        channels: u32,
        expected: usize,
        actual: usize,
    },
    #[error(
        "cumulative map has {map_channels} channels x {map_bins} bins, image has {image_channels} channels x {image_bins} bins"
    )]
    MapMismatch {
        map_channels: u32,
        map_bins: usize,
        image_channels: u32,
        image_bins: usize,
    },
}

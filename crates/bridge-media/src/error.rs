//! Error handling for the frame/queue/reframer crate.

use thiserror::Error;

/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;

/// Errors raised constructing or operating on audio frames and queues.
#[derive(Error, Debug)]
pub enum MediaError {
    /// A buffer handed to `AudioFrame::new` was not exactly `F` bytes.
    #[error("audio frame must be exactly {expected} bytes, got {actual}")]
    WrongFrameSize { expected: usize, actual: usize },

    /// An unsupported `(sample_rate, frame_bytes)` pair was requested.
    #[error("unsupported sample config: {sample_rate}Hz / {frame_bytes} bytes per frame")]
    UnsupportedSampleConfig { sample_rate: u32, frame_bytes: usize },
}

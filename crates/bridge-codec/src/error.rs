//! Error handling for the codec crate.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by µ-law/A-law encode and decode paths.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Inbound frame length did not match any recognized telephony-codec
    /// or PCM16 length (§7 `CodecMismatch`).
    #[error("frame size mismatch: {len} bytes is not a recognized telephony or PCM16 frame size")]
    FrameSizeMismatch { len: usize },

    /// An `audioOutput` payload had an odd byte length after base64
    /// decode; the trailing byte breaks 16-bit sample alignment.
    #[error("odd-length PCM16 payload ({len} bytes); trailing byte dropped")]
    OddPcmLength { len: usize },
}

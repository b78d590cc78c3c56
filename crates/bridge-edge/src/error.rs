//! Errors surfaced by the edge media adapter.

use thiserror::Error;

/// Failures an [`crate::session::EdgeSession`] can hit while bridging a call.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("bridge wire protocol error: {0}")]
    Wire(#[from] rvoip_bridge_wire::WireError),

    #[error("codec error: {0}")]
    Codec(#[from] rvoip_bridge_codec::CodecError),

    #[error("media error: {0}")]
    Media(#[from] rvoip_bridge_media::MediaError),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("host rejected a write: no write codec negotiated yet")]
    TelephonyWriteRejected,

    #[error("host reported codec {0:?}, which this adapter cannot bridge")]
    UnsupportedHostCodec(String),

    #[error("bridge connection closed before the call ended")]
    BridgeClosed,
}

pub type Result<T> = std::result::Result<T, EdgeError>;

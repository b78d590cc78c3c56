//! Error kinds for the bridge session service (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("protocol framing error: {0}")]
    ProtocolFraming(#[from] rvoip_bridge_wire::WireError),

    #[error("transport closed: {0}")]
    TransportClosed(String),

    #[error("codec mismatch: {0}")]
    CodecMismatch(String),

    #[error("AI transport error: {0}")]
    Transport(String),

    #[error("tool invocation failed: {0}")]
    ToolInvocationFailure(String),

    #[error("media error: {0}")]
    Media(#[from] rvoip_bridge_media::MediaError),

    #[error("codec error: {0}")]
    Codec(#[from] rvoip_bridge_codec::CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed AI event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

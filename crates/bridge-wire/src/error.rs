//! Error handling for handshake parsing and wire framing.

use thiserror::Error;

/// Result type alias for wire-protocol operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Malformed-protocol and short-read errors (§7 `ProtocolFraming`).
///
/// `TransportClosed` (peer closed cleanly) is represented separately, as
/// `Ok(None)` from the read functions that can observe it — it is not an
/// error, it's the expected end of a call.
#[derive(Error, Debug)]
pub enum WireError {
    /// The handshake line exceeded the maximum accepted length before a
    /// `\n` was seen.
    #[error("handshake line exceeded {max} bytes without a newline")]
    HandshakeTooLong { max: usize },

    /// Neither the JSON nor the legacy colon-delimited handshake grammar
    /// matched.
    #[error("unparsable handshake: {reason}")]
    MalformedHandshake { reason: String },

    /// A tag byte on the bridge->edge stream was neither `0x01` (audio)
    /// nor `0x02` (control).
    #[error("unrecognized wire tag {tag:#04x}")]
    UnknownTag { tag: u8 },

    /// A control record declared a length at or above the 1 KiB cap.
    #[error("control record length {len} exceeds the 1024-byte cap")]
    ControlTooLarge { len: u32 },

    /// The connection closed mid-frame (after some but not all of an
    /// expected exact-size read had arrived).
    #[error("peer closed mid-frame: got {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },

    /// Underlying I/O error from the socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

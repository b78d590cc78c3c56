//! The TCP wire protocol between the edge media adapter and the bridge
//! session service (§4.4): handshake parsing, tagged-record framing, and
//! the control-message schema.

pub mod control;
pub mod error;
pub mod framing;
pub mod handshake;

pub use control::ControlMessage;
pub use error::{Result, WireError};
pub use framing::{read_exact_or_eof, read_tagged_record, write_audio_record, write_control_record, TaggedRecord, MAX_CONTROL_LEN, TAG_AUDIO, TAG_CONTROL};
pub use handshake::{parse_handshake, read_handshake_line, HandshakeRecord};

//! The control-message schema (§3, §6): a short JSON object with a
//! mandatory `type` field. `hangup` is the only type the core must
//! implement; unknown types MUST be tolerated by readers.

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// A control-channel message. Carries arbitrary extra fields so a
/// deployment can extend the schema without this crate rejecting them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

impl ControlMessage {
    /// The one control message this core must emit: `{"type":"hangup"}`.
    pub fn hangup() -> Self {
        Self { kind: "hangup".to_string(), extra: Map::new() }
    }

    /// Whether this message is the mandatory hangup type.
    pub fn is_hangup(&self) -> bool {
        self.kind == "hangup"
    }

    /// Serialize to the UTF-8 JSON bytes that go on the wire after the
    /// `0x02` tag and length prefix.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse a control payload. Unknown `type` values are accepted (and
    /// simply won't match `is_hangup`) — only malformed JSON is an error.
    pub fn from_json_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

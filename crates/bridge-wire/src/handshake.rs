//! The one-shot handshake record (§3, §4.4).
//!
//! The handshake MUST be read byte-by-byte straight off the raw stream
//! until the terminating `\n` — never through a buffered/line-oriented
//! reader, which could pre-read audio bytes past the newline (the
//! "handshake over-read" regression this protocol is designed against,
//! §4.4, §8 scenario 6).

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, WireError};

/// Upper bound on handshake line length, well above any realistic
/// handshake but far short of a DoS-sized allocation.
const MAX_HANDSHAKE_LEN: usize = 4096;

/// A parsed, defaulted handshake record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRecord {
    pub call_uuid: String,
    pub caller: String,
    pub sample_rate: u32,
    pub channels: u8,
    pub format: String,
}

impl Default for HandshakeRecord {
    fn default() -> Self {
        Self {
            call_uuid: uuid::Uuid::new_v4().to_string(),
            caller: "Unknown".to_string(),
            sample_rate: 8000,
            channels: 1,
            format: "PCM16".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct JsonHandshake {
    call_uuid: Option<String>,
    caller: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u8>,
    format: Option<String>,
}

/// Read the raw handshake line from `reader`, one byte at a time, up to
/// and excluding the terminating `\n`. Never wraps `reader` in a
/// `BufReader` — the caller passes the live socket directly so that not
/// one byte of post-handshake audio is consumed here.
pub async fn read_handshake_line<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte).await?;
        if byte[0] == b'\n' {
            return Ok(line);
        }
        line.push(byte[0]);
        if line.len() > MAX_HANDSHAKE_LEN {
            return Err(WireError::HandshakeTooLong { max: MAX_HANDSHAKE_LEN });
        }
    }
}

/// Parse a handshake line (JSON or legacy colon-delimited), applying the
/// defaults in §3/§4.4 for any field the grammar leaves unspecified.
pub fn parse_handshake(line: &[u8]) -> Result<HandshakeRecord> {
    let text = std::str::from_utf8(line)
        .map_err(|e| WireError::MalformedHandshake { reason: e.to_string() })?
        .trim();

    if text.starts_with('{') {
        parse_json_handshake(text)
    } else {
        parse_legacy_handshake(text)
    }
}

fn parse_json_handshake(text: &str) -> Result<HandshakeRecord> {
    let parsed: JsonHandshake = serde_json::from_str(text)
        .map_err(|e| WireError::MalformedHandshake { reason: format!("invalid JSON handshake: {e}") })?;
    let defaults = HandshakeRecord::default();
    Ok(HandshakeRecord {
        call_uuid: parsed.call_uuid.unwrap_or(defaults.call_uuid),
        caller: parsed.caller.unwrap_or(defaults.caller),
        sample_rate: parsed.sample_rate.unwrap_or(defaults.sample_rate),
        channels: parsed.channels.unwrap_or(defaults.channels),
        format: parsed.format.unwrap_or(defaults.format),
    })
}

/// `NOVA_SESSION:<uuid>:CALLER:<caller>[:SR:<n>:CH:<n>:FORMAT:<s>]`
fn parse_legacy_handshake(text: &str) -> Result<HandshakeRecord> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 4 || parts[0] != "NOVA_SESSION" || parts[2] != "CALLER" {
        return Err(WireError::MalformedHandshake {
            reason: format!("does not match NOVA_SESSION grammar: {text:?}"),
        });
    }

    let mut record = HandshakeRecord {
        call_uuid: parts[1].to_string(),
        caller: parts[3].to_string(),
        ..HandshakeRecord::default()
    };

    // Optional trailing KEY:VALUE pairs.
    let mut i = 4;
    while i + 1 < parts.len() {
        match parts[i] {
            "SR" => {
                record.sample_rate = parts[i + 1].parse().unwrap_or(record.sample_rate);
            }
            "CH" => {
                record.channels = parts[i + 1].parse().unwrap_or(record.channels);
            }
            "FORMAT" => {
                record.format = parts[i + 1].to_string();
            }
            _ => {}
        }
        i += 2;
    }

    Ok(record)
}

//! Post-handshake tagged-record framing (§4.4).
//!
//! Edge -> bridge: a bare stream of `F`-byte PCM16 payloads, no header.
//! Bridge -> edge: tagged records — `0x01` + exactly `F` bytes of audio,
//! or `0x02` + a 4-byte big-endian length + that many bytes of JSON.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, WireError};

/// Bridge -> edge audio record tag.
pub const TAG_AUDIO: u8 = 0x01;
/// Bridge -> edge control record tag.
pub const TAG_CONTROL: u8 = 0x02;
/// Control payloads strictly under this many bytes (§3, §4.4).
pub const MAX_CONTROL_LEN: u32 = 1024;

/// A decoded bridge -> edge record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedRecord {
    /// `0x01` + exactly `frame_bytes` bytes of PCM16.
    Audio(Vec<u8>),
    /// `0x02` + length-prefixed JSON payload.
    Control(Vec<u8>),
}

/// Read exactly `n` bytes, looping on short reads. Returns `Ok(None)` if
/// the peer closed cleanly before any byte of this read arrived (the
/// frame-boundary EOF case); returns `Err(ShortRead)` if it closed after
/// delivering part of the frame.
pub async fn read_exact_or_eof<R: AsyncRead + Unpin>(reader: &mut R, n: usize) -> Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0usize;
    while filled < n {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(WireError::ShortRead { got: filled, expected: n })
            };
        }
        filled += read;
    }
    Ok(Some(buf))
}

/// Read one tagged record (tag byte + payload) from the bridge -> edge
/// stream. `frame_bytes` is the call's negotiated `F`. Returns `Ok(None)`
/// on a clean peer close at a record boundary.
pub async fn read_tagged_record<R: AsyncRead + Unpin>(
    reader: &mut R,
    frame_bytes: usize,
) -> Result<Option<TaggedRecord>> {
    let mut tag = [0u8; 1];
    match reader.read(&mut tag).await? {
        0 => return Ok(None),
        _ => {}
    }

    match tag[0] {
        TAG_AUDIO => {
            let payload = read_exact_or_eof(reader, frame_bytes).await?.ok_or(WireError::ShortRead {
                got: 0,
                expected: frame_bytes,
            })?;
            Ok(Some(TaggedRecord::Audio(payload)))
        }
        TAG_CONTROL => {
            let len_bytes = read_exact_or_eof(reader, 4).await?.ok_or(WireError::ShortRead { got: 0, expected: 4 })?;
            let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
            if len >= MAX_CONTROL_LEN {
                return Err(WireError::ControlTooLarge { len });
            }
            let payload = read_exact_or_eof(reader, len as usize).await?.ok_or(WireError::ShortRead {
                got: 0,
                expected: len as usize,
            })?;
            Ok(Some(TaggedRecord::Control(payload)))
        }
        other => Err(WireError::UnknownTag { tag: other }),
    }
}

/// Write one `0x01`-tagged audio record. `frame` must be exactly `F`
/// bytes — the wire format has no length prefix for audio, so the caller
/// is responsible for that invariant (upstream, [`rvoip_bridge_media::AudioFrame`]
/// enforces it at construction).
pub async fn write_audio_record<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(&[TAG_AUDIO]).await?;
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Write one `0x02`-tagged control record. Fails if `payload` is at or
/// above the 1 KiB cap.
pub async fn write_control_record<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u32;
    if len >= MAX_CONTROL_LEN {
        return Err(WireError::ControlTooLarge { len });
    }
    writer.write_all(&[TAG_CONTROL]).await?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

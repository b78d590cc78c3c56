//! The uplink half (edge -> AI), spec §4.6: read exactly one frame's
//! worth of bytes off the edge socket at a time. [`BridgeSession`]'s
//! `run_io_loop` drives this directly (rather than spawning a separate
//! uplink task) since the AI side exposes one combined send+recv
//! transport handle rather than an independently-sendable half.
//!
//! [`BridgeSession`]: crate::session::BridgeSession

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{BridgeError, Result};

/// Read exactly `frame_bytes` from `reader` in a bounded loop, looping on
/// short reads and surfacing a clean peer close as `Ok(None)` only at a
/// frame boundary (spec §4.6, §8 "short read on audio socket").
pub(crate) async fn read_frame_exact<R: AsyncRead + Unpin>(reader: &mut R, frame_bytes: usize) -> Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; frame_bytes];
    let mut filled = 0;
    while filled < frame_bytes {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(BridgeError::ProtocolFraming(rvoip_bridge_wire::WireError::ShortRead {
                    got: filled,
                    expected: frame_bytes,
                }))
            };
        }
        filled += read;
    }
    Ok(Some(buf))
}

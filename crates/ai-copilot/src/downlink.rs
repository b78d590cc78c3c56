//! The downlink task (AI -> edge), spec §4.6: paces dequeued PCM16
//! frames onto the edge socket on a monotonic 20 ms grid, catching up by
//! at most half a frame after a late write and never bursting.

use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::time::Instant;
use tracing::{info, warn};

use rvoip_bridge_media::queue::FrameQueue;
use rvoip_bridge_wire::framing::write_audio_record;

use crate::error::Result;

const TICK: Duration = Duration::from_millis(20);
const CATCH_UP_FLOOR: Duration = Duration::from_millis(10);

/// Drain `queue` onto `writer` as tagged `0x01` audio records, one per
/// tick, until the queue is closed (poisoned) or a write fails. Returns
/// `writer` back to the caller so the session can reuse the same socket
/// afterward (e.g. to emit a hangup control record, §4.6).
pub async fn run_downlink<W: AsyncWrite + Unpin>(mut writer: W, queue: FrameQueue) -> Result<W> {
    let mut next_deadline = Instant::now() + TICK;

    loop {
        let frame = match queue.take().await {
            Some(frame) => frame,
            None => {
                info!("downstream queue closed, ending downlink");
                return Ok(writer);
            }
        };

        let now = Instant::now();
        if now < next_deadline {
            tokio::time::sleep(next_deadline - now).await;
        } else {
            warn!(late_by_ms = (now - next_deadline).as_millis(), "downlink pacer running behind, catching up");
        }

        write_audio_record(&mut writer, frame.as_bytes()).await?;

        let now = Instant::now();
        // Never bursts: advance a full tick from the prior deadline, but
        // never let the next deadline sit more than half a frame behind
        // "now" even after a very late write (§3, §4.6).
        next_deadline = std::cmp::max(next_deadline + TICK, now + CATCH_UP_FLOOR);
    }
}

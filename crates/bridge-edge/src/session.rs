//! The edge-side call state machine (spec §4.5): one [`EdgeSession`] per
//! inbound call, answering the leg, bridging its audio to the session
//! service over TCP, and pumping the main loop on a soft 20 ms deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rvoip_bridge_codec::g711::{self, Variant};
use rvoip_bridge_media::frame::SampleConfig;
use rvoip_bridge_media::queue::FrameQueue;
use rvoip_bridge_wire::framing::{read_tagged_record, TaggedRecord};
use rvoip_bridge_wire::handshake::HandshakeRecord;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::error::{EdgeError, Result};
use crate::host::{HangupCause, InboundFrame, OutboundFrame, ReadCodec, TelephonyHost, WriteCodec};

/// The call's lifecycle, mirroring spec §4.5's state machine exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Init,
    WaitingMedia,
    Active,
    Closing,
    Done,
}

/// The soft scheduling budget for one main-loop iteration.
const TICK_BUDGET: Duration = Duration::from_millis(20);
/// The host-leg frame length (bytes) at/above which a frame is treated as
/// real audio rather than comfort noise.
const REAL_AUDIO_MIN_LEN: usize = 160;

/// A single bridged call: owns the host handle, the bridge TCP socket,
/// and the downstream queue the receive task feeds.
pub struct EdgeSession<H: TelephonyHost + 'static> {
    host: Arc<H>,
    sample_config: SampleConfig,
    state: AtomicBool, // true while ACTIVE-or-earlier; flipped false to drive CLOSING
    media_ready: AtomicBool,
    downstream: FrameQueue,
}

impl<H: TelephonyHost + 'static> EdgeSession<H> {
    /// Connect to the bridge at `bridge_addr`, send the handshake built
    /// from `handshake`, spawn the downstream-receive task, answer the
    /// call, and run the main loop to completion. Returns once the call
    /// has reached `DONE`.
    pub async fn run(host: Arc<H>, bridge_addr: &str, handshake: HandshakeRecord) -> Result<()> {
        let sample_config = SampleConfig::from_sample_rate(handshake.sample_rate)
            .unwrap_or_else(SampleConfig::default);

        host.answer()?;

        let stream = match TcpStream::connect(bridge_addr).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not reach bridge session service");
                host.play_error_prompt();
                host.hangup(HangupCause::BridgeLost);
                return Err(EdgeError::Io(e));
            }
        };
        stream.set_nodelay(true).ok();

        let mut write_half;
        let read_half;
        {
            let (r, w) = tokio::io::split(stream);
            read_half = r;
            write_half = w;
        }

        let handshake_line = format!(
            "{{\"call_uuid\":\"{}\",\"caller\":\"{}\",\"sample_rate\":{},\"channels\":1,\"format\":\"PCM16\"}}\n",
            handshake.call_uuid, handshake.caller, handshake.sample_rate
        );
        write_half.write_all(handshake_line.as_bytes()).await?;
        write_half.flush().await?;

        let session = Arc::new(EdgeSession {
            host: host.clone(),
            sample_config,
            state: AtomicBool::new(true),
            media_ready: AtomicBool::new(false),
            downstream: FrameQueue::new(rvoip_bridge_media::queue::DEFAULT_CAPACITY),
        });

        let recv_session = session.clone();
        let recv_task = tokio::spawn(async move {
            recv_session.downstream_receive_loop(read_half).await;
        });

        session.main_loop(write_half).await;

        session.downstream.close();
        let _ = recv_task.await;

        info!(call_uuid = %handshake.call_uuid, "call finished");
        Ok(())
    }

    fn running(&self) -> bool {
        self.state.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.state.store(false, Ordering::Release);
    }

    /// The main loop of spec §4.5, steps 1-6, driven until the call ends.
    async fn main_loop(&self, mut write_half: WriteHalf<TcpStream>) {
        let mut state = CallState::WaitingMedia;

        while self.running() {
            let tick_start = tokio::time::Instant::now();

            match self.host.read_frame() {
                Ok(Some(inbound)) => {
                    if inbound.data.len() >= REAL_AUDIO_MIN_LEN {
                        self.media_ready.store(true, Ordering::Release);
                        if state == CallState::WaitingMedia {
                            state = CallState::Active;
                            debug!("first real inbound frame observed, call now ACTIVE");
                        }
                        if let Err(e) = self.forward_uplink(&mut write_half, &inbound).await {
                            error!(error = %e, "uplink write failed, ending call");
                            self.stop();
                            break;
                        }
                    }
                    // Comfort-noise / sub-threshold frames are ignored per step 2.
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "host read_frame failed, ending call");
                    self.stop();
                    break;
                }
            }

            if self.media_ready.load(Ordering::Acquire) {
                if let Some(write_codec) = self.host.write_codec() {
                    if let Some(frame) = self.downstream.try_take() {
                        if let Err(e) = self.drive_downstream_write(frame.as_bytes(), write_codec) {
                            warn!(error = %e, "write to telephony leg rejected");
                        }
                    }
                }
            }

            let elapsed = tick_start.elapsed();
            if elapsed < TICK_BUDGET {
                tokio::time::sleep(TICK_BUDGET - elapsed).await;
            }
        }

        let _ = state; // CLOSING/DONE are externally observable via host.hangup(); no further transition needed here.
    }

    async fn forward_uplink(&self, write_half: &mut WriteHalf<TcpStream>, inbound: &InboundFrame) -> Result<()> {
        let pcm16 = match inbound.codec {
            ReadCodec::Pcm16 => inbound.data.clone(),
            ReadCodec::MuLaw => g711::decode_frame(Variant::MuLaw, &inbound.data),
            ReadCodec::ALaw => g711::decode_frame(Variant::ALaw, &inbound.data),
        };
        write_audio_record_raw(write_half, &pcm16).await
    }

    fn drive_downstream_write(&self, pcm16: &[u8], write_codec: WriteCodec) -> Result<()> {
        let encoded = match write_codec {
            WriteCodec::Pcm16 => pcm16.to_vec(),
            WriteCodec::MuLaw => g711::encode_frame(Variant::MuLaw, pcm16),
            WriteCodec::ALaw => g711::encode_frame(Variant::ALaw, pcm16),
        };
        self.host.write_frame(OutboundFrame { data: encoded, codec: write_codec })
    }

    /// Blocking-style (but async) downstream-receive task: one tagged
    /// record per iteration, straight off the bridge socket.
    async fn downstream_receive_loop(&self, mut read_half: ReadHalf<TcpStream>) {
        let frame_bytes = self.sample_config.frame_bytes();
        loop {
            match read_tagged_record(&mut read_half, frame_bytes).await {
                Ok(Some(TaggedRecord::Audio(payload))) => {
                    match rvoip_bridge_media::frame::AudioFrame::new(bytes::Bytes::from(payload), self.sample_config) {
                        Ok(frame) => self.downstream.push(frame),
                        Err(e) => warn!(error = %e, "bridge sent a malformed audio record, dropping it"),
                    }
                }
                Ok(Some(TaggedRecord::Control(payload))) => {
                    if let Ok(msg) = rvoip_bridge_wire::ControlMessage::from_json_bytes(&payload) {
                        if msg.is_hangup() {
                            info!("received hangup control from bridge");
                            self.stop();
                            self.host.hangup(HangupCause::BridgeRequested);
                            break;
                        }
                    }
                }
                Ok(None) => {
                    debug!("bridge closed the connection");
                    self.stop();
                    self.host.hangup(HangupCause::BridgeLost);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "downstream-receive error, ending call");
                    self.stop();
                    self.host.hangup(HangupCause::BridgeLost);
                    break;
                }
            }
        }
    }
}

async fn write_audio_record_raw(write_half: &mut WriteHalf<TcpStream>, pcm16: &[u8]) -> Result<()> {
    // Edge -> bridge is a bare PCM16 stream, no tag byte (spec §4.4).
    write_half.write_all(pcm16).await?;
    write_half.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedHost;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn handshake() -> HandshakeRecord {
        HandshakeRecord {
            call_uuid: "call-1".into(),
            caller: "+15550001".into(),
            sample_rate: 8000,
            channels: 1,
            format: "PCM16".into(),
        }
    }

    #[tokio::test]
    async fn session_answers_and_forwards_real_audio_once_write_codec_is_set() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();

        let accept_task = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (mut r, _w) = tokio::io::split(socket);
            // Drain the handshake line.
            let mut buf = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                tokio::io::AsyncReadExt::read_exact(&mut r, &mut byte).await.unwrap();
                if byte[0] == b'\n' {
                    break;
                }
                buf.push(byte[0]);
            }
            buf
        });

        let host = Arc::new(SimulatedHost::new());
        host.push_inbound(InboundFrame { data: vec![0xFFu8; 160], codec: ReadCodec::MuLaw });
        host.set_write_codec(WriteCodec::MuLaw);

        let host_for_run = host.clone();
        let run_task = tokio::spawn(async move {
            let _ = tokio::time::timeout(
                Duration::from_millis(200),
                EdgeSession::run(host_for_run, &addr.to_string(), handshake()),
            )
            .await;
        });

        let line = accept_task.await.unwrap();
        assert!(String::from_utf8(line).unwrap().contains("call-1"));

        host.hangup(HangupCause::CallerHangup);
        let _ = run_task.await;

        assert!(host.was_answered());
    }

    #[tokio::test]
    async fn comfort_noise_frames_do_not_set_media_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let host = Arc::new(SimulatedHost::new());
        host.push_inbound(InboundFrame { data: vec![0u8; 2], codec: ReadCodec::MuLaw });

        let session = EdgeSession {
            host: host.clone(),
            sample_config: SampleConfig::default(),
            state: AtomicBool::new(true),
            media_ready: AtomicBool::new(false),
            downstream: FrameQueue::new(rvoip_bridge_media::queue::DEFAULT_CAPACITY),
        };

        if let Ok(Some(inbound)) = session.host.read_frame() {
            assert!(inbound.data.len() < REAL_AUDIO_MIN_LEN);
        } else {
            panic!("expected queued frame");
        }
        assert!(!session.media_ready.load(Ordering::Acquire));
        let _ = addr;
    }

    #[test]
    fn write_is_rejected_without_a_negotiated_codec() {
        let host = SimulatedHost::new();
        let err = host
            .write_frame(OutboundFrame { data: vec![0u8; 160], codec: WriteCodec::MuLaw })
            .unwrap_err();
        assert!(matches!(err, EdgeError::TelephonyWriteRejected));
    }
}

//! One call's bridge-side session (spec §4.6): reads the edge handshake,
//! opens the AI provider connection, drives the outbound session/prompt
//! sequence, then runs the uplink and downlink halves concurrently until
//! either side ends the call.
//!
//! The AI transport is a single `&mut dyn AiTransport` (send + recv on
//! one handle), so uplink sends and inbound AI dispatch share one task
//! rather than racing two tasks over the same handle — a `tokio::select!`
//! loop, not a pair of spawned workers, is what keeps that safe.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{split, AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

use rvoip_bridge_media::frame::SampleConfig;
use rvoip_bridge_media::queue::{FrameQueue, DEFAULT_CAPACITY};
use rvoip_bridge_media::reframer::Reframer;
use rvoip_bridge_wire::control::ControlMessage;
use rvoip_bridge_wire::framing::write_control_record;
use rvoip_bridge_wire::handshake::{parse_handshake, read_handshake_line};

use crate::ai::driver::{AiSessionDriver, AiTransport};
use crate::ai::tools::{HangupTool, ToolRegistry};
use crate::ai::transport::WebSocketAiTransport;
use crate::barge_in::BargeInState;
use crate::config::{ListenerConfig, PromptConfigRegistry};
use crate::downlink::run_downlink;
use crate::error::Result;
use crate::uplink::read_frame_exact;

/// Wall-clock milliseconds since the epoch, for barge-in timestamps.
/// Isolated in one place so the rest of the session logic only ever
/// threads an injected `now_ms` (§4.8 test determinism).
fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Runs one accepted edge connection end to end. Construct once per
/// listener and call [`BridgeSession::run`] per socket.
pub struct BridgeSession {
    prompts: Arc<PromptConfigRegistry>,
    listener: ListenerConfig,
}

impl BridgeSession {
    pub fn new(prompts: Arc<PromptConfigRegistry>, listener: ListenerConfig) -> Self {
        Self { prompts, listener }
    }

    /// Drive one call over `socket` until it ends, in whichever direction
    /// that happens (edge close, AI close, or the hangup tool firing).
    /// Errors here are per-call: the caller (the listener's accept loop)
    /// logs and moves on rather than treating this as fatal to the
    /// service (§7: a single call's failure must not take others down).
    pub async fn run(&self, mut socket: TcpStream) -> Result<()> {
        socket.set_nodelay(true).ok();

        let line = read_handshake_line(&mut socket).await?;
        let handshake = parse_handshake(&line)?;
        let sample_config = SampleConfig::from_sample_rate(handshake.sample_rate)?;
        info!(
            call_uuid = %handshake.call_uuid,
            caller = %handshake.caller,
            sample_rate = handshake.sample_rate,
            started_at = %chrono::Utc::now().to_rfc3339(),
            "accepted edge connection"
        );

        let queue = FrameQueue::new(DEFAULT_CAPACITY);
        let reframer = Reframer::new(sample_config, queue);
        let barge_in = Arc::new(BargeInState::new());

        let (hangup_tx, mut hangup_rx) = mpsc::unbounded_channel::<()>();
        let tools = ToolRegistry::new().register(
            "hangupTool",
            Arc::new(HangupTool::new(move || {
                let _ = hangup_tx.send(());
            })),
        );

        let mut driver = AiSessionDriver::new(handshake.call_uuid.clone(), reframer, barge_in, tools);
        let downstream = driver.downstream_queue();

        let mut transport = WebSocketAiTransport::connect(&self.listener.ai_provider_url).await?;
        let prompt_config = self.prompts.select(&handshake.caller).clone();
        driver.start_session(&mut transport, &prompt_config, &handshake.caller, handshake.sample_rate).await?;

        let (edge_read, edge_write) = split(socket);
        let downlink_handle = tokio::spawn(run_downlink(edge_write, downstream.clone()));

        let outcome = self
            .run_io_loop(&mut driver, &mut transport, edge_read, sample_config, &mut hangup_rx)
            .await;

        downstream.close();
        let _ = transport.close().await;

        let edge_write = match downlink_handle.await {
            Ok(Ok(writer)) => Some(writer),
            Ok(Err(e)) => {
                warn!(error = %e, "downlink task ended with an error");
                None
            }
            Err(e) => {
                warn!(error = %e, "downlink task panicked");
                None
            }
        };

        if matches!(outcome, Ok(CallEnd::HangupRequested)) {
            if let Some(mut writer) = edge_write {
                if let Err(e) = self.emit_hangup(&mut writer).await {
                    warn!(error = %e, "failed to emit hangup control record");
                }
            }
        }

        outcome.map(|_| ())
    }

    async fn run_io_loop<R: AsyncRead + Unpin>(
        &self,
        driver: &mut AiSessionDriver,
        transport: &mut dyn AiTransport,
        mut edge_read: R,
        sample_config: SampleConfig,
        hangup_rx: &mut mpsc::UnboundedReceiver<()>,
    ) -> Result<CallEnd> {
        let frame_bytes = sample_config.frame_bytes();
        let sample_rate = sample_config.sample_rate();
        let mut uplink_opened = false;

        loop {
            tokio::select! {
                frame = read_frame_exact(&mut edge_read, frame_bytes) => {
                    match frame? {
                        Some(bytes) => {
                            if !uplink_opened {
                                driver.open_audio_input(transport, sample_rate).await?;
                                uplink_opened = true;
                            }
                            driver.send_audio_input(transport, &bytes).await?;
                        }
                        None => {
                            info!(call_uuid = %driver.call_uuid(), "edge socket closed, ending call");
                            return Ok(CallEnd::EdgeClosed);
                        }
                    }
                }
                chunk = transport.recv() => {
                    match chunk? {
                        Some(bytes) => {
                            driver.handle_inbound_chunk(transport, &bytes, now_ms()).await?;
                        }
                        None => {
                            warn!(call_uuid = %driver.call_uuid(), "AI provider closed the connection");
                            return Ok(CallEnd::AiClosed);
                        }
                    }
                }
                _ = hangup_rx.recv() => {
                    info!(call_uuid = %driver.call_uuid(), "hangup tool fired, ending call");
                    return Ok(CallEnd::HangupRequested);
                }
            }
        }
    }

    /// §4.6: emit the hangup control record, then hold the connection
    /// open briefly so the edge side has a chance to read and act on it
    /// before the socket goes away.
    async fn emit_hangup<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        let payload = ControlMessage::hangup().to_json_bytes()?;
        write_control_record(writer, &payload).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallEnd {
    EdgeClosed,
    AiClosed,
    HangupRequested,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptConfig;

    #[test]
    fn now_ms_is_positive_and_monotone_enough_for_logging() {
        let a = now_ms();
        let b = now_ms();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn listener_config_carries_an_ai_provider_url() {
        let listener = ListenerConfig::default().with_ai_provider_url("wss://example.test/session");
        assert_eq!(listener.ai_provider_url, "wss://example.test/session");
    }

    #[test]
    fn bridge_session_can_be_constructed_from_a_registry() {
        let registry = Arc::new(PromptConfigRegistry::default());
        let _session = BridgeSession::new(registry, ListenerConfig::default());
        let _ = PromptConfig::default_for("+15550001");
    }
}

//! The AI session driver (spec §4.7): drives the outbound event sequence
//! and dispatches inbound events against the reframer, the barge-in
//! state, and the tool registry.

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, info, warn};

use rvoip_bridge_codec::g711::drop_odd_trailing_byte;
use rvoip_bridge_media::reframer::Reframer;

use crate::ai::events::{
    encode_outbound_chunk, AudioInputBody, AudioInputConfiguration, AudioOutputConfiguration, CompletionStart,
    ContentEndBody, ContentStartBody, InboundEvent, OutboundEvent, PromptStartBody, Role, SessionStartBody,
    TextInputBody, TextOutputConfiguration, ToolConfiguration, ToolResultBody, ToolSpecWire,
};
use crate::ai::tools::{ToolInvocation, ToolRegistry};
use crate::barge_in::BargeInState;
use crate::config::PromptConfig;
use crate::error::{BridgeError, Result};

/// The provider-agnostic transport the driver speaks over: one chunk per
/// `send`, one chunk (or `None` on clean close) per `recv`. A real
/// implementation wraps a `tokio-tungstenite` WebSocket or an HTTP/2
/// event stream; tests use an in-memory double.
#[async_trait]
pub trait AiTransport: Send {
    async fn send(&mut self, bytes: Vec<u8>) -> Result<()>;
    async fn recv(&mut self) -> Result<Option<Vec<u8>>>;
    async fn close(&mut self) -> Result<()>;
}

/// Everything buffered about a tool invocation between its `toolUse`
/// event and the matching `contentEnd{type=TOOL}`.
struct PendingTool {
    invocation: ToolInvocation,
}

/// Drives one call's AI session: owns the reframer and barge-in state
/// the downlink pacer reads from, and the tool registry invoked on
/// `toolUse`/`contentEnd{type=TOOL}` pairs.
pub struct AiSessionDriver {
    call_uuid: String,
    content_name: String,
    prompt_name: String,
    reframer: Reframer,
    barge_in: std::sync::Arc<BargeInState>,
    tools: ToolRegistry,
    pending_tool: Option<PendingTool>,
}

impl AiSessionDriver {
    pub fn new(call_uuid: impl Into<String>, reframer: Reframer, barge_in: std::sync::Arc<BargeInState>, tools: ToolRegistry) -> Self {
        let call_uuid = call_uuid.into();
        Self {
            prompt_name: call_uuid.clone(),
            content_name: uuid::Uuid::new_v4().to_string(),
            call_uuid,
            reframer,
            barge_in,
            tools,
            pending_tool: None,
        }
    }

    /// Outbound steps 1-3 of §4.7: open the session, the prompt, and the
    /// seeded system prompt, in that fixed order.
    pub async fn start_session(&self, transport: &mut dyn AiTransport, config: &PromptConfig, caller: &str, sample_rate: u32) -> Result<()> {
        self.emit(transport, OutboundEvent::SessionStart(SessionStartBody {
            temperature: config.sampling.temperature,
            top_p: config.sampling.top_p,
            max_tokens: config.sampling.max_tokens,
        }))
        .await?;

        self.emit(transport, OutboundEvent::PromptStart(PromptStartBody {
            prompt_name: self.prompt_name.clone(),
            text_output_configuration: TextOutputConfiguration { media_type: "text/plain".to_string() },
            audio_output_configuration: AudioOutputConfiguration {
                media_type: "audio/lpcm".to_string(),
                sample_rate,
                sample_size: 16,
                channels: 1,
                voice_id: config.voice_id.clone(),
                encoding: "base64".to_string(),
            },
            tool_configuration: ToolConfiguration {
                tools: config
                    .tools
                    .iter()
                    .map(|t| ToolSpecWire { name: t.name.clone(), description: t.description.clone(), input_schema: t.input_schema.clone() })
                    .collect(),
            },
        }))
        .await?;

        self.emit(transport, OutboundEvent::TextInput(TextInputBody {
            prompt_name: self.prompt_name.clone(),
            content_name: uuid::Uuid::new_v4().to_string(),
            role: Role::System,
            content: config.system_prompt_for_caller(caller),
        }))
        .await
    }

    /// Outbound step 4: the first uplink frame opens a fresh AUDIO
    /// content segment; every frame after that is a plain `audioInput`.
    pub async fn open_audio_input(&self, transport: &mut dyn AiTransport, sample_rate: u32) -> Result<()> {
        self.emit(transport, OutboundEvent::ContentStart(ContentStartBody {
            prompt_name: self.prompt_name.clone(),
            content_name: self.content_name.clone(),
            content_type: "AUDIO".to_string(),
            interactive: true,
            audio_input_configuration: Some(AudioInputConfiguration {
                media_type: "audio/lpcm".to_string(),
                sample_rate,
                sample_size: 16,
                channels: 1,
                encoding: "base64".to_string(),
                audio_type: "SPEECH".to_string(),
            }),
        }))
        .await
    }

    pub async fn send_audio_input(&self, transport: &mut dyn AiTransport, frame: &[u8]) -> Result<()> {
        self.emit(transport, OutboundEvent::AudioInput(AudioInputBody {
            prompt_name: self.prompt_name.clone(),
            content_name: self.content_name.clone(),
            role: Role::User,
            content: base64::engine::general_purpose::STANDARD.encode(frame),
        }))
        .await
    }

    /// A shared handle to the downstream queue the downlink pacer reads
    /// (spec §4.6 downlink thread, §4.3).
    pub fn downstream_queue(&self) -> rvoip_bridge_media::queue::FrameQueue {
        self.reframer.queue().clone()
    }

    pub fn barge_in(&self) -> std::sync::Arc<BargeInState> {
        self.barge_in.clone()
    }

    /// Dispatch one inbound chunk (spec §4.7 inbound handling rules).
    /// `now_ms` is injected so the barge-in watchdog and timestamps are
    /// deterministic under test.
    pub async fn handle_inbound_chunk(&mut self, transport: &mut dyn AiTransport, chunk: &[u8], now_ms: i64) -> Result<()> {
        let event = crate::ai::events::parse_inbound_chunk(chunk).map_err(|e| {
            warn!(error = %e, "unrecognized AI event type, ignoring (tolerated per spec)");
            e
        });
        let event = match event {
            Ok(event) => event,
            Err(_) => return Ok(()), // unknown events are tolerated, not fatal (§6)
        };
        self.handle_inbound_event(transport, event, now_ms).await
    }

    async fn handle_inbound_event(&mut self, transport: &mut dyn AiTransport, event: InboundEvent, now_ms: i64) -> Result<()> {
        match event {
            InboundEvent::CompletionStart(CompletionStart { prompt_name }) => {
                if let Some(name) = prompt_name {
                    self.prompt_name = name;
                }
                self.barge_in.clear();
            }
            InboundEvent::ContentStart(start) => {
                if matches!(start.role, Role::Assistant | Role::User) {
                    self.barge_in.clear();
                }
            }
            InboundEvent::TextOutput(text) => {
                if text.is_interrupt_marker() {
                    self.barge_in.set(now_ms);
                    self.reframer.clear();
                } else {
                    debug!(content = %text.content, "assistant text output");
                }
            }
            InboundEvent::AudioOutput(audio) => {
                self.handle_audio_output(audio, now_ms)?;
            }
            InboundEvent::ContentEnd(end) => {
                self.handle_content_end(transport, end, now_ms).await?;
            }
            InboundEvent::CompletionEnd(end) => {
                info!(stop_reason = ?end.stop_reason, "AI completion ended");
            }
            InboundEvent::UserInterrupt(_) => {
                self.barge_in.set(now_ms);
                self.reframer.clear();
            }
            InboundEvent::UsageEvent(usage) => {
                debug!(counters = ?usage.counters, "AI usage event");
            }
            InboundEvent::ToolUse(tool_use) => {
                self.pending_tool = Some(PendingTool {
                    invocation: ToolInvocation {
                        tool_use_id: tool_use.tool_use_id,
                        tool_name: tool_use.tool_name,
                        content: tool_use.content,
                    },
                });
            }
        }
        Ok(())
    }

    fn handle_audio_output(&mut self, audio: crate::ai::events::AudioOutput, now_ms: i64) -> Result<()> {
        if self.barge_in.is_set_with_watchdog(now_ms) {
            debug!("discarding audioOutput while barge-in flag is set");
            return Ok(());
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(audio.content.as_bytes())
            .map_err(|e| BridgeError::CodecMismatch(format!("invalid base64 audioOutput: {e}")))?;
        let aligned = drop_odd_trailing_byte(&decoded);
        self.reframer.append(aligned);
        Ok(())
    }

    async fn handle_content_end(&mut self, transport: &mut dyn AiTransport, end: crate::ai::events::ContentEnd, now_ms: i64) -> Result<()> {
        if end.is_tool_content() {
            if let Some(pending) = self.pending_tool.take() {
                self.run_tool(transport, pending.invocation).await?;
            }
            return Ok(());
        }

        if end.is_interrupt() {
            self.barge_in.set(now_ms);
            self.reframer.clear();
            return Ok(());
        }

        if matches!(end.role, Some(Role::Assistant)) {
            self.reframer.end_of_turn();
        }
        Ok(())
    }

    async fn run_tool(&mut self, transport: &mut dyn AiTransport, invocation: ToolInvocation) -> Result<()> {
        let tool_use_id = invocation.tool_use_id.clone();
        let outcome = self.tools.dispatch(invocation).await;

        self.emit(transport, OutboundEvent::ToolResult(ToolResultBody {
            prompt_name: self.prompt_name.clone(),
            tool_use_id,
            content: outcome.as_result_content(),
        }))
        .await?;

        self.emit(transport, OutboundEvent::ContentEnd(ContentEndBody {
            prompt_name: self.prompt_name.clone(),
            content_name: self.content_name.clone(),
        }))
        .await
    }

    async fn emit(&self, transport: &mut dyn AiTransport, event: OutboundEvent) -> Result<()> {
        let bytes = encode_outbound_chunk(&event)?;
        transport.send(bytes).await
    }

    pub fn call_uuid(&self) -> &str {
        &self.call_uuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvoip_bridge_media::frame::SampleConfig;
    use rvoip_bridge_media::queue::FrameQueue;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl AiTransport for RecordingTransport {
        async fn send(&mut self, bytes: Vec<u8>) -> Result<()> {
            self.sent.push(bytes);
            Ok(())
        }
        async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn driver() -> (AiSessionDriver, FrameQueue) {
        let queue = FrameQueue::new(rvoip_bridge_media::queue::DEFAULT_CAPACITY);
        let reframer = Reframer::new(SampleConfig::NARROWBAND, queue.clone());
        let driver = AiSessionDriver::new("call-1", reframer, Arc::new(BargeInState::new()), ToolRegistry::new());
        (driver, queue)
    }

    #[tokio::test]
    async fn audio_output_is_reframed_into_the_downstream_queue() {
        let (mut driver, queue) = driver();
        let mut transport = RecordingTransport::default();
        let pcm = vec![0x11u8; 320];
        let chunk = format!(
            r#"{{"event":{{"audioOutput":{{"content":"{}","role":"ASSISTANT"}}}}}}"#,
            base64::engine::general_purpose::STANDARD.encode(&pcm)
        );
        driver.handle_inbound_chunk(&mut transport, chunk.as_bytes(), 0).await.unwrap();
        assert_eq!(queue.try_take().unwrap().as_bytes(), pcm.as_slice());
    }

    #[tokio::test]
    async fn audio_output_is_discarded_while_barge_in_is_set() {
        let (mut driver, queue) = driver();
        let mut transport = RecordingTransport::default();
        driver.barge_in.set(0);
        let chunk = format!(
            r#"{{"event":{{"audioOutput":{{"content":"{}","role":"ASSISTANT"}}}}}}"#,
            base64::engine::general_purpose::STANDARD.encode(vec![0x22u8; 320])
        );
        driver.handle_inbound_chunk(&mut transport, chunk.as_bytes(), 0).await.unwrap();
        assert!(queue.try_take().is_none());
    }

    #[tokio::test]
    async fn user_interrupt_sets_barge_in_and_clears_the_queue() {
        let (mut driver, queue) = driver();
        let mut transport = RecordingTransport::default();
        queue.push(rvoip_bridge_media::frame::AudioFrame::silence(SampleConfig::NARROWBAND));
        let chunk = br#"{"event":{"userInterrupt":{}}}"#;
        driver.handle_inbound_chunk(&mut transport, chunk, 100).await.unwrap();
        assert!(driver.barge_in.is_set());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn content_start_assistant_clears_barge_in() {
        let (mut driver, _queue) = driver();
        let mut transport = RecordingTransport::default();
        driver.barge_in.set(0);
        let chunk = br#"{"event":{"contentStart":{"role":"ASSISTANT"}}}"#;
        driver.handle_inbound_chunk(&mut transport, chunk, 0).await.unwrap();
        assert!(!driver.barge_in.is_set());
    }

    #[tokio::test]
    async fn content_end_assistant_without_interrupt_flushes_end_of_turn() {
        let (mut driver, queue) = driver();
        let mut transport = RecordingTransport::default();
        driver.reframer.append(&[0xAAu8; 50]);
        let chunk = br#"{"event":{"contentEnd":{"stopReason":"END_TURN","role":"ASSISTANT"}}}"#;
        driver.handle_inbound_chunk(&mut transport, chunk, 0).await.unwrap();
        // One zero-padded tail frame plus one comfort-silence frame.
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn content_end_with_interrupt_stop_reason_sets_barge_in() {
        let (mut driver, queue) = driver();
        let mut transport = RecordingTransport::default();
        queue.push(rvoip_bridge_media::frame::AudioFrame::silence(SampleConfig::NARROWBAND));
        let chunk = br#"{"event":{"contentEnd":{"stopReason":"user_Interruption","role":"ASSISTANT"}}}"#;
        driver.handle_inbound_chunk(&mut transport, chunk, 0).await.unwrap();
        assert!(driver.barge_in.is_set());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn tool_use_then_tool_content_end_emits_tool_result_and_content_end() {
        let (mut driver, _queue) = driver();
        let mut transport = RecordingTransport::default();
        let tool_use_chunk = br#"{"event":{"toolUse":{"toolUseId":"tu1","toolName":"hangupTool","content":"{}"}}}"#;
        driver.handle_inbound_chunk(&mut transport, tool_use_chunk, 0).await.unwrap();

        let content_end_chunk = br#"{"event":{"contentEnd":{"type":"TOOL"}}}"#;
        driver.handle_inbound_chunk(&mut transport, content_end_chunk, 0).await.unwrap();

        assert_eq!(transport.sent.len(), 2);
        assert!(String::from_utf8_lossy(&transport.sent[0]).contains("toolResult"));
        assert!(String::from_utf8_lossy(&transport.sent[1]).contains("contentEnd"));
    }

    #[tokio::test]
    async fn unknown_event_types_are_tolerated() {
        let (mut driver, _queue) = driver();
        let mut transport = RecordingTransport::default();
        let chunk = br#"{"event":{"somethingUnrecognized":{}}}"#;
        assert!(driver.handle_inbound_chunk(&mut transport, chunk, 0).await.is_ok());
    }

    #[tokio::test]
    async fn session_start_sequence_emits_in_order() {
        let (driver, _queue) = driver();
        let mut transport = RecordingTransport::default();
        let config = PromptConfig::default_for("+15550001");
        driver.start_session(&mut transport, &config, "+15550001", 8000).await.unwrap();
        assert_eq!(transport.sent.len(), 3);
        assert!(String::from_utf8_lossy(&transport.sent[0]).contains("sessionStart"));
        assert!(String::from_utf8_lossy(&transport.sent[1]).contains("promptStart"));
        assert!(String::from_utf8_lossy(&transport.sent[2]).contains("textInput"));
    }
}

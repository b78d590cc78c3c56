//! End-to-end scenarios against the AI session driver and its downstream
//! queue/downlink, standing in for the six concrete scenarios a full
//! accepted-connection run would exercise: a full turn's worth of audio
//! reaching the edge socket as tagged records, a mid-speech interrupt
//! clearing the queue, and the AI-initiated hangup's acknowledge-then-
//! defer sequence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use rvoip_ai_copilot::ai::tools::{HangupTool, ToolRegistry};
use rvoip_ai_copilot::downlink::run_downlink;
use rvoip_ai_copilot::{AiSessionDriver, AiTransport, BargeInState, Result};
use rvoip_bridge_media::frame::SampleConfig;
use rvoip_bridge_media::queue::{FrameQueue, DEFAULT_CAPACITY};
use rvoip_bridge_media::reframer::Reframer;
use rvoip_bridge_wire::framing::TAG_AUDIO;

#[derive(Default)]
struct NullTransport {
    sent: Vec<Vec<u8>>,
}

#[async_trait]
impl AiTransport for NullTransport {
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

fn driver_with_queue(tools: ToolRegistry) -> (AiSessionDriver, FrameQueue) {
    let queue = FrameQueue::new(DEFAULT_CAPACITY);
    let reframer = Reframer::new(SampleConfig::NARROWBAND, queue.clone());
    let driver = AiSessionDriver::new("call-e2e", reframer, Arc::new(BargeInState::new()), tools);
    (driver, queue)
}

fn audio_output_chunk(pcm: &[u8]) -> Vec<u8> {
    format!(
        r#"{{"event":{{"audioOutput":{{"content":"{}","role":"ASSISTANT"}}}}}}"#,
        base64::engine::general_purpose::STANDARD.encode(pcm)
    )
    .into_bytes()
}

/// Scenario: the AI sends 1000 bytes of PCM16 then ends its turn cleanly.
/// Expect exactly 5 tagged `0x01` audio records on the wire (3 full
/// frames from `append`, one zero-padded tail frame, one comfort-silence
/// frame), with no control record mixed in.
#[tokio::test]
async fn happy_path_audio_then_end_turn_yields_five_tagged_frames() {
    let (mut driver, queue) = driver_with_queue(ToolRegistry::new());
    let mut transport = NullTransport::default();

    let pcm: Vec<u8> = (0..1000u32).map(|i| (i % 250) as u8).collect();
    driver.handle_inbound_chunk(&mut transport, &audio_output_chunk(&pcm), 0).await.unwrap();

    let end_turn = br#"{"event":{"contentEnd":{"stopReason":"END_TURN","role":"ASSISTANT"}}}"#;
    driver.handle_inbound_chunk(&mut transport, end_turn, 0).await.unwrap();
    assert_eq!(queue.len(), 5);

    queue.close();
    let mut writer = Vec::new();
    run_downlink(&mut writer, queue).await.unwrap();

    assert_eq!(writer.len(), 5 * (1 + 320));
    for i in 0..5 {
        assert_eq!(writer[i * (1 + 320)], TAG_AUDIO);
    }
}

/// Scenario: a `userInterrupt` mid-utterance must empty the downstream
/// queue immediately and set the barge-in flag, discarding whatever the
/// AI had already queued for playback.
#[tokio::test]
async fn barge_in_mid_speech_clears_the_downstream_queue() {
    let (mut driver, queue) = driver_with_queue(ToolRegistry::new());
    let mut transport = NullTransport::default();

    driver.handle_inbound_chunk(&mut transport, &audio_output_chunk(&vec![7u8; 640]), 0).await.unwrap();
    assert_eq!(queue.len(), 2);

    let interrupt = br#"{"event":{"userInterrupt":{}}}"#;
    driver.handle_inbound_chunk(&mut transport, interrupt, 100).await.unwrap();

    assert!(queue.is_empty());
    assert!(driver.barge_in().is_set());
}

/// Scenario: `toolUse{hangupTool}` followed by `contentEnd{type=TOOL}`
/// acknowledges immediately, then fires the deferred hangup callback
/// only after the configured delay — never synchronously.
#[tokio::test]
async fn ai_initiated_hangup_acknowledges_then_defers_the_callback() {
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_for_closure = fired.clone();
    let tool =
        HangupTool::new(move || { fired_for_closure.fetch_add(1, Ordering::SeqCst); }).with_delay(Duration::from_millis(20));
    let tools = ToolRegistry::new().register("hangupTool", Arc::new(tool));
    let (mut driver, _queue) = driver_with_queue(tools);
    let mut transport = NullTransport::default();

    let tool_use = br#"{"event":{"toolUse":{"toolUseId":"tu-1","toolName":"hangupTool","content":"{}"}}}"#;
    driver.handle_inbound_chunk(&mut transport, tool_use, 0).await.unwrap();

    let content_end = br#"{"event":{"contentEnd":{"type":"TOOL"}}}"#;
    driver.handle_inbound_chunk(&mut transport, content_end, 0).await.unwrap();

    assert_eq!(transport.sent.len(), 2);
    assert!(String::from_utf8_lossy(&transport.sent[0]).contains("acknowledged"));
    assert_eq!(fired.load(Ordering::SeqCst), 0, "callback must not fire synchronously");

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

//! The tagged AI event union (spec §3, §4.7): a closed set of inbound
//! variants parsed from the provider's chunked event stream, and the
//! outbound variants this driver produces. Each chunk on the wire is a
//! JSON object with a single `event` property holding one of these
//! tagged shapes — modeled here as an externally tagged enum rather than
//! dynamic dispatch on a handler hierarchy (§9 redesign note).

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// The four roles used across content segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Assistant,
    User,
    System,
    Tool,
}

/// One inbound event from the AI provider, matching spec §3's closed set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InboundEvent {
    CompletionStart(CompletionStart),
    ContentStart(ContentStart),
    TextOutput(TextOutput),
    AudioOutput(AudioOutput),
    ToolUse(ToolUse),
    ContentEnd(ContentEnd),
    CompletionEnd(CompletionEnd),
    UserInterrupt(UserInterrupt),
    UsageEvent(UsageEvent),
}

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    event: InboundEvent,
}

/// Parse one chunk of the event stream into its tagged inbound event.
pub fn parse_inbound_chunk(bytes: &[u8]) -> serde_json::Result<InboundEvent> {
    let envelope: InboundEnvelope = serde_json::from_slice(bytes)?;
    Ok(envelope.event)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStart {
    #[serde(default)]
    pub prompt_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStart {
    pub role: Role,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOutput {
    pub content: String,
    pub role: Role,
}

impl TextOutput {
    /// Whether this text output carries the literal interrupt marker
    /// (§4.7: `{ "interrupted" : true }`).
    pub fn is_interrupt_marker(&self) -> bool {
        self.content.contains("\"interrupted\"") && self.content.contains("true")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioOutput {
    pub content: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub tool_use_id: String,
    pub tool_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEnd {
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
}

impl ContentEnd {
    /// §4.7/§9: any `stopReason` containing "INTERRUPT" (case-insensitive)
    /// is a barge-in signal.
    pub fn is_interrupt(&self) -> bool {
        self.stop_reason
            .as_deref()
            .map(|reason| reason.to_uppercase().contains("INTERRUPT"))
            .unwrap_or(false)
    }

    pub fn is_tool_content(&self) -> bool {
        self.content_type.as_deref() == Some("TOOL")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEnd {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInterrupt {}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageEvent {
    #[serde(flatten)]
    pub counters: Map<String, serde_json::Value>,
}

// --- Outbound events (driven by this crate toward the AI provider) ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioOutputConfiguration {
    pub media_type: String,
    pub sample_rate: u32,
    pub sample_size: u32,
    pub channels: u32,
    pub voice_id: String,
    pub encoding: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInputConfiguration {
    pub media_type: String,
    pub sample_rate: u32,
    pub sample_size: u32,
    pub channels: u32,
    pub encoding: String,
    pub audio_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOutputConfiguration {
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpecWire {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfiguration {
    pub tools: Vec<ToolSpecWire>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartBody {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptStartBody {
    pub prompt_name: String,
    pub text_output_configuration: TextOutputConfiguration,
    pub audio_output_configuration: AudioOutputConfiguration,
    pub tool_configuration: ToolConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInputBody {
    pub prompt_name: String,
    pub content_name: String,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStartBody {
    pub prompt_name: String,
    pub content_name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_input_configuration: Option<AudioInputConfiguration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInputBody {
    pub prompt_name: String,
    pub content_name: String,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultBody {
    pub prompt_name: String,
    pub tool_use_id: String,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEndBody {
    pub prompt_name: String,
    pub content_name: String,
}

/// The outbound event union (spec §4.7 steps 1-6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutboundEvent {
    SessionStart(SessionStartBody),
    PromptStart(PromptStartBody),
    TextInput(TextInputBody),
    ContentStart(ContentStartBody),
    AudioInput(AudioInputBody),
    ToolResult(ToolResultBody),
    ContentEnd(ContentEndBody),
}

#[derive(Debug, Serialize)]
struct OutboundEnvelope<'a> {
    event: &'a OutboundEvent,
}

/// Serialize one outbound event into the `{"event": {...}}` envelope the
/// wire format requires.
pub fn encode_outbound_chunk(event: &OutboundEvent) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&OutboundEnvelope { event })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_start() {
        let chunk = br#"{"event":{"completionStart":{"promptName":"p1"}}}"#;
        let event = parse_inbound_chunk(chunk).unwrap();
        assert!(matches!(event, InboundEvent::CompletionStart(ref c) if c.prompt_name.as_deref() == Some("p1")));
    }

    #[test]
    fn parses_content_end_with_interrupt_stop_reason() {
        let chunk = br#"{"event":{"contentEnd":{"stopReason":"USER_INTERRUPTION","role":"ASSISTANT"}}}"#;
        let event = parse_inbound_chunk(chunk).unwrap();
        match event {
            InboundEvent::ContentEnd(end) => assert!(end.is_interrupt()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn content_end_without_interrupt_stop_reason_is_not_an_interrupt() {
        let end = ContentEnd { stop_reason: Some("END_TURN".to_string()), role: Some(Role::Assistant), content_type: None };
        assert!(!end.is_interrupt());
    }

    #[test]
    fn text_output_detects_interrupt_marker() {
        let text = TextOutput { content: r#"{ "interrupted" : true }"#.to_string(), role: Role::Assistant };
        assert!(text.is_interrupt_marker());
        let clean = TextOutput { content: "hello there".to_string(), role: Role::Assistant };
        assert!(!clean.is_interrupt_marker());
    }

    #[test]
    fn unknown_event_type_fails_to_parse_and_is_tolerated_by_the_driver() {
        let chunk = br#"{"event":{"somethingNew":{}}}"#;
        assert!(parse_inbound_chunk(chunk).is_err());
    }

    #[test]
    fn outbound_session_start_encodes_under_event_envelope() {
        let event = OutboundEvent::SessionStart(SessionStartBody { temperature: 0.7, top_p: 0.9, max_tokens: 1024 });
        let bytes = encode_outbound_chunk(&event).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"event":{"sessionStart":"#));
    }
}

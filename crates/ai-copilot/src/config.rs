//! Per-call configuration: sampling parameters, the system prompt, the
//! voice, and the tool set, selected from caller/called identity at call
//! start (spec §4.6 step 2, §4.7).
//!
//! Grounded in the builder style of the client configuration in the
//! telephony stack this workspace descends from: a plain data struct with
//! `with_*` setters consuming and returning `Self`, plus a small set of
//! named presets instead of a full rules engine.

use std::collections::HashMap;

use rvoip_bridge_media::frame::SampleConfig;

/// Sampling parameters sent in the AI provider's `sessionStart` event.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { temperature: 0.7, top_p: 0.9, max_tokens: 1024 }
    }
}

/// One tool the AI provider may invoke, described for `promptStart`'s
/// tool configuration as name + description + a JSON-Schema input shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A full per-call prompt configuration, selected by caller/called
/// identity at call start. A deployment is expected to carry several of
/// these (different system prompts, voices, tool sets per line of
/// business); [`PromptConfig::default_for`] is the single built-in
/// fallback.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub voice_id: String,
    pub sampling: SamplingConfig,
    pub tools: Vec<ToolSpec>,
}

impl PromptConfig {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            voice_id: "matthew".to_string(),
            sampling: SamplingConfig::default(),
            tools: Vec::new(),
        }
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    /// Augment the system prompt with the caller's identity, as spec
    /// §4.6 step 2 requires ("seeded from a prompt configuration
    /// selected by caller/called identity").
    pub fn system_prompt_for_caller(&self, caller: &str) -> String {
        format!("{}\n\nThe caller's phone number is {caller}.", self.system_prompt)
    }

    /// The one built-in prompt configuration, registering the hangup
    /// tool every deployment needs.
    pub fn default_for(_caller: &str) -> Self {
        Self::new(
            "You are a helpful phone assistant. Keep responses brief and conversational, \
             as this is a live phone call.",
        )
        .with_tool(ToolSpec {
            name: "hangupTool".to_string(),
            description: "End the call after saying goodbye.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
            }),
        })
    }
}

/// Selects a [`PromptConfig`] for an incoming call. The registry is a
/// finite, deployment-configured map keyed by caller or called identity;
/// §9 calls for a compile-time/closed registry rather than reflection-
/// based discovery.
pub struct PromptConfigRegistry {
    by_caller: HashMap<String, PromptConfig>,
    default: PromptConfig,
}

impl PromptConfigRegistry {
    pub fn new(default: PromptConfig) -> Self {
        Self { by_caller: HashMap::new(), default }
    }

    pub fn with_override(mut self, caller: impl Into<String>, config: PromptConfig) -> Self {
        self.by_caller.insert(caller.into(), config);
        self
    }

    pub fn select(&self, caller: &str) -> &PromptConfig {
        self.by_caller.get(caller).unwrap_or(&self.default)
    }
}

impl Default for PromptConfigRegistry {
    fn default() -> Self {
        Self::new(PromptConfig::default_for("Unknown"))
    }
}

/// The TCP listener's own configuration (the `bridge-session` binary).
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub bind_addr: String,
    pub frame_ms: u64,
    pub default_sample_config: SampleConfig,
    pub ai_provider_url: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8085".to_string(),
            frame_ms: 20,
            default_sample_config: SampleConfig::NARROWBAND,
            ai_provider_url: "wss://localhost:9443/ai-session".to_string(),
        }
    }
}

impl ListenerConfig {
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    pub fn with_frame_ms(mut self, frame_ms: u64) -> Self {
        self.frame_ms = frame_ms;
        self
    }

    pub fn with_ai_provider_url(mut self, ai_provider_url: impl Into<String>) -> Self {
        self.ai_provider_url = ai_provider_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_config_registers_hangup_tool() {
        let config = PromptConfig::default_for("+15550001");
        assert!(config.tools.iter().any(|t| t.name == "hangupTool"));
    }

    #[test]
    fn registry_falls_back_to_default_for_unknown_callers() {
        let registry = PromptConfigRegistry::default();
        let selected = registry.select("+19995551234");
        assert_eq!(selected.voice_id, "matthew");
    }

    #[test]
    fn registry_honors_per_caller_override() {
        let registry = PromptConfigRegistry::new(PromptConfig::default_for("Unknown"))
            .with_override("+15550001", PromptConfig::new("VIP line prompt").with_voice_id("joanna"));
        assert_eq!(registry.select("+15550001").voice_id, "joanna");
        assert_eq!(registry.select("+19995551234").voice_id, "matthew");
    }

    #[test]
    fn system_prompt_includes_caller_identity() {
        let config = PromptConfig::default_for("Unknown");
        let prompt = config.system_prompt_for_caller("+15550001");
        assert!(prompt.contains("+15550001"));
    }
}

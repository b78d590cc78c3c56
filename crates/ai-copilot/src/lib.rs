//! `rvoip-ai-copilot`: the bridge-side session service that speaks the
//! edge media adapter's wire protocol on one side and a speech-to-speech
//! AI provider's event stream on the other.
//!
//! One [`session::BridgeSession`] per accepted TCP connection: it parses
//! the call handshake, opens the AI provider connection via
//! [`ai::transport::WebSocketAiTransport`], and runs the
//! [`uplink`]/[`downlink`] halves against the shared [`ai::driver::AiSessionDriver`].

pub mod ai;
pub mod barge_in;
pub mod config;
pub mod downlink;
pub mod error;
pub mod session;
pub mod uplink;

pub use ai::{AiSessionDriver, AiTransport};
pub use barge_in::BargeInState;
pub use config::{ListenerConfig, PromptConfig, PromptConfigRegistry};
pub use error::{BridgeError, Result};
pub use session::BridgeSession;

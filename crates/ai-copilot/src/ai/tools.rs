//! The tool registry (spec §4.7, §9): a closed, compile-time-registered
//! mapping from tool name to handler, built once at call start rather
//! than discovered via reflection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

/// What a `toolUse` event carries once its matching `contentEnd{type=TOOL}`
/// has arrived and the full content is available.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_use_id: String,
    pub tool_name: String,
    pub content: String,
}

/// The result a handler produces, serialized back as a `toolResult` event.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub status: ToolStatus,
    pub body: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Acknowledged,
    Error,
}

impl ToolOutcome {
    pub fn acknowledged(body: Value) -> Self {
        Self { status: ToolStatus::Acknowledged, body }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            body: serde_json::json!({ "status": "error", "message": message.into() }),
        }
    }

    /// The JSON object serialized into `toolResult.content` (§7:
    /// `ToolInvocationFailure` is never fatal, surfaced as `status=error`).
    pub fn as_result_content(&self) -> Value {
        match self.status {
            ToolStatus::Acknowledged => {
                let mut obj = self.body.clone();
                if let Value::Object(ref mut map) = obj {
                    map.entry("status").or_insert_with(|| Value::String("acknowledged".to_string()));
                }
                obj
            }
            ToolStatus::Error => self.body.clone(),
        }
    }
}

/// A tool handler. Handlers must not block the AI event receive path
/// (§4.7): long work should be spawned and the registry invoked again
/// later via whatever completion mechanism the caller wires up — this
/// trait just describes one invocation's synchronous contract.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, invocation: &ToolInvocation) -> ToolOutcome;
}

/// The one required tool: acknowledges immediately and schedules a
/// deferred hangup via the callback it was built with (§4.7: "schedules
/// a short (~3s) deferred callback that emits the hangup control
/// message").
pub struct HangupTool<F>
where
    F: Fn() + Send + Sync + 'static,
{
    delay: Duration,
    on_deferred_hangup: Arc<F>,
}

impl<F> HangupTool<F>
where
    F: Fn() + Send + Sync + 'static,
{
    pub fn new(on_deferred_hangup: F) -> Self {
        Self { delay: Duration::from_secs(3), on_deferred_hangup: Arc::new(on_deferred_hangup) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl<F> ToolHandler for HangupTool<F>
where
    F: Fn() + Send + Sync + 'static,
{
    async fn invoke(&self, invocation: &ToolInvocation) -> ToolOutcome {
        info!(tool_use_id = %invocation.tool_use_id, "hangup tool invoked, deferring call teardown");
        let callback = self.delay;
        let on_deferred_hangup = self.on_deferred_hangup.clone();
        tokio::spawn(async move {
            tokio::time::sleep(callback).await;
            on_deferred_hangup();
        });
        ToolOutcome::acknowledged(serde_json::json!({ "status": "acknowledged" }))
    }
}

/// The finite, per-call set of tools available to the AI provider,
/// selected from the [`crate::config::PromptConfig`] at call start.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Look up and run a tool by name. Unknown tool names are a
    /// `ToolInvocationFailure`, serialized the same as any other tool
    /// error rather than propagated as a fatal error (§7).
    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolOutcome {
        match self.handlers.get(&invocation.tool_name) {
            Some(handler) => handler.invoke(&invocation).await,
            None => {
                warn!(tool_name = %invocation.tool_name, "no handler registered for tool");
                ToolOutcome::error(format!("no handler registered for tool '{}'", invocation.tool_name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn invocation(tool_name: &str) -> ToolInvocation {
        ToolInvocation { tool_use_id: "t1".to_string(), tool_name: tool_name.to_string(), content: "{}".to_string() }
    }

    #[tokio::test]
    async fn unknown_tool_returns_an_error_outcome_not_a_panic() {
        let registry = ToolRegistry::new();
        let outcome = registry.dispatch(invocation("doesNotExist")).await;
        assert_eq!(outcome.status, ToolStatus::Error);
    }

    #[tokio::test]
    async fn hangup_tool_acknowledges_immediately_and_defers_the_callback() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_for_closure = fired.clone();
        let tool = HangupTool::new(move || fired_for_closure.store(true, Ordering::SeqCst))
            .with_delay(Duration::from_millis(10));
        let registry = ToolRegistry::new().register("hangupTool", Arc::new(tool));

        let outcome = registry.dispatch(invocation("hangupTool")).await;
        assert_eq!(outcome.status, ToolStatus::Acknowledged);
        assert!(!fired.load(Ordering::SeqCst), "callback must not fire synchronously");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst), "deferred callback should have fired by now");
    }
}

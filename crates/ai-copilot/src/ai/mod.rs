//! The AI session driver (spec §4.7): the event-stream protocol shapes,
//! the tool registry, and the driver that ties the two together against
//! an [`driver::AiTransport`].

pub mod driver;
pub mod events;
pub mod tools;
pub mod transport;

pub use driver::{AiSessionDriver, AiTransport};
pub use events::{InboundEvent, OutboundEvent, Role};
pub use tools::{ToolHandler, ToolInvocation, ToolOutcome, ToolRegistry};
pub use transport::WebSocketAiTransport;

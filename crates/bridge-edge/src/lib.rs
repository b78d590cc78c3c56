//! The edge media adapter (§4.5): the component embedded in the
//! softswitch process that answers a call, establishes the TCP
//! connection to the bridge session service, and pumps audio in both
//! directions on a soft 20 ms tick.
//!
//! Call signaling (SIP dialog state, RTP negotiation, ringing) lives
//! entirely on the other side of [`host::TelephonyHost`] and is out of
//! scope for this crate by design.

pub mod error;
pub mod host;
pub mod session;

pub use error::{EdgeError, Result};
pub use host::{HangupCause, InboundFrame, OutboundFrame, ReadCodec, TelephonyHost, WriteCodec};
pub use session::{CallState, EdgeSession};

//! Bit-exact G.711 codec used on the telephony leg of the Nova bridge.
//!
//! This crate is a pure, allocation-conscious leaf: no I/O, no async, no
//! frame queues. It is shared by `rvoip-bridge-edge` (encode/decode on
//! every 20ms tick) and exists standalone so it can be fuzzed and
//! benchmarked independently of the rest of the bridge.

pub mod error;
pub mod g711;

pub use error::{CodecError, Result};
pub use g711::Variant;

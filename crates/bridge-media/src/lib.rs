//! Audio frames, the drop-oldest frame queue, and the PCM reframer shared
//! by the edge media adapter and the bridge session service.

pub mod error;
pub mod frame;
pub mod queue;
pub mod reframer;

pub use error::{MediaError, Result};
pub use frame::{AudioFrame, SampleConfig};
pub use queue::FrameQueue;
pub use reframer::Reframer;

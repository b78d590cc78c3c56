//! The boundary between this crate and whatever softswitch it is embedded
//! in. Everything call-signaling (SIP dialog state, RTP negotiation,
//! ringing) is out of scope here — `TelephonyHost` is the narrow surface
//! the edge session needs from the host: answer, read a frame, write a
//! frame, and hang up.
//!
//! A real integration implements this trait against the host's native
//! call object (an RTP leg, a FreeSWITCH channel, a media gateway socket).
//! [`SimulatedHost`] is a bare in-memory double used by the harness binary
//! and the test suite so the session state machine can be exercised
//! without a real softswitch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// The telephony-side codec a frame arrived in, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCodec {
    MuLaw,
    ALaw,
    Pcm16,
}

/// The telephony-side codec the host currently wants outbound audio in.
/// `None` (via [`TelephonyHost::write_codec`]) means the host hasn't
/// finished negotiating yet and writes must be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCodec {
    MuLaw,
    ALaw,
    Pcm16,
}

/// One frame of inbound (caller -> bridge) audio as the host delivered it.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub data: Vec<u8>,
    pub codec: ReadCodec,
}

/// One frame of outbound (bridge -> caller) audio, already encoded into
/// the host's negotiated write codec.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub data: Vec<u8>,
    pub codec: WriteCodec,
}

/// Why the call ended, for logging and any host-side billing/CDR hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangupCause {
    /// The bridge session asked for a clean hangup (AI tool call, or the
    /// AI end of the call closing the stream).
    BridgeRequested,
    /// The bridge's TCP connection died unexpectedly.
    BridgeLost,
    /// The caller's leg hung up first; nothing further to bridge.
    CallerHangup,
}

/// The host-facing surface the edge session needs. Implementors own
/// whatever call-signaling machinery sits underneath (SIP, RTP, a PBX
/// API) — none of that is visible here by design.
pub trait TelephonyHost: Send + Sync {
    /// Answer the call. Idempotent: calling it twice is a no-op.
    fn answer(&self) -> crate::error::Result<()>;

    /// Non-blocking poll for the next inbound frame. `Ok(None)` means
    /// nothing is ready this tick — the caller should continue its
    /// soft-deadline loop rather than block.
    fn read_frame(&self) -> crate::error::Result<Option<InboundFrame>>;

    /// Write one outbound frame to the caller leg. Returns
    /// [`crate::error::EdgeError::TelephonyWriteRejected`] if
    /// [`TelephonyHost::write_codec`] is still `None`.
    fn write_frame(&self, frame: OutboundFrame) -> crate::error::Result<()>;

    /// The host's currently negotiated write codec, once known.
    fn write_codec(&self) -> Option<WriteCodec>;

    /// Tear down the call leg with a cause, for logging/CDR purposes.
    fn hangup(&self, cause: HangupCause);

    /// Best-effort local error tone/prompt, played when the bridge
    /// connection cannot be established or drops mid-call and no AI
    /// voice is available to apologize. Hosts without a prompt player
    /// may leave this a no-op.
    fn play_error_prompt(&self) {}
}

/// An in-memory [`TelephonyHost`] double: feeds frames from a preloaded
/// queue and records everything written back, for the harness binary and
/// integration tests.
pub struct SimulatedHost {
    answered: AtomicBool,
    inbound: Mutex<VecDeque<InboundFrame>>,
    outbound: Mutex<Vec<OutboundFrame>>,
    write_codec: Mutex<Option<WriteCodec>>,
    hangup_cause: Mutex<Option<HangupCause>>,
    error_prompts_played: AtomicBool,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            answered: AtomicBool::new(false),
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(Vec::new()),
            write_codec: Mutex::new(None),
            hangup_cause: Mutex::new(None),
            error_prompts_played: AtomicBool::new(false),
        }
    }

    /// Queue a frame for the next `read_frame` call to return.
    pub fn push_inbound(&self, frame: InboundFrame) {
        self.inbound.lock().push_back(frame);
    }

    /// Simulate the host finishing codec negotiation.
    pub fn set_write_codec(&self, codec: WriteCodec) {
        *self.write_codec.lock() = Some(codec);
    }

    pub fn was_answered(&self) -> bool {
        self.answered.load(Ordering::Acquire)
    }

    pub fn outbound_frames(&self) -> Vec<OutboundFrame> {
        self.outbound.lock().clone()
    }

    pub fn hangup_cause(&self) -> Option<HangupCause> {
        *self.hangup_cause.lock()
    }

    pub fn error_prompt_played(&self) -> bool {
        self.error_prompts_played.load(Ordering::Acquire)
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TelephonyHost for SimulatedHost {
    fn answer(&self) -> crate::error::Result<()> {
        self.answered.store(true, Ordering::Release);
        Ok(())
    }

    fn read_frame(&self) -> crate::error::Result<Option<InboundFrame>> {
        Ok(self.inbound.lock().pop_front())
    }

    fn write_frame(&self, frame: OutboundFrame) -> crate::error::Result<()> {
        if self.write_codec.lock().is_none() {
            return Err(crate::error::EdgeError::TelephonyWriteRejected);
        }
        self.outbound.lock().push(frame);
        Ok(())
    }

    fn write_codec(&self) -> Option<WriteCodec> {
        *self.write_codec.lock()
    }

    fn hangup(&self, cause: HangupCause) {
        *self.hangup_cause.lock() = Some(cause);
    }

    fn play_error_prompt(&self) {
        self.error_prompts_played.store(true, Ordering::Release);
    }
}

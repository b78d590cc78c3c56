//! The PCM reframer (§4.3): converts arbitrary-sized byte chunks from the
//! AI provider into exact `F`-byte [`AudioFrame`]s on a [`FrameQueue`].
//!
//! This is the single place in the system where "whatever size chunk the
//! AI happened to send" meets the fixed 20ms grid; every other component
//! downstream of it can assume `F`-byte frames. `append`, `end_of_turn`,
//! and `clear` are serialized under one mutex because inbound AI events
//! can arrive on a thread distinct from the downlink pacer (§5).

use parking_lot::Mutex;

use crate::frame::{AudioFrame, SampleConfig};
use crate::queue::FrameQueue;

struct State {
    residual: Vec<u8>,
}

/// Byte accumulator feeding a [`FrameQueue`] with exactly `F`-byte frames.
pub struct Reframer {
    config: SampleConfig,
    queue: FrameQueue,
    state: Mutex<State>,
}

impl Reframer {
    /// Build a reframer over the given queue, for the call's `(R, F)`.
    pub fn new(config: SampleConfig, queue: FrameQueue) -> Self {
        Self {
            config,
            queue,
            state: Mutex::new(State { residual: Vec::with_capacity(config.frame_bytes()) }),
        }
    }

    /// The queue frames are emitted into.
    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    /// Append opaque bytes; emits one [`AudioFrame`] per complete `F`-byte
    /// boundary crossed, leaving fewer than `F` residual bytes buffered.
    pub fn append(&self, bytes: &[u8]) {
        let f = self.config.frame_bytes();
        let mut state = self.state.lock();
        state.residual.extend_from_slice(bytes);

        let mut offset = 0;
        while state.residual.len() - offset >= f {
            let chunk = state.residual[offset..offset + f].to_vec();
            offset += f;
            // AudioFrame::new cannot fail here: chunk.len() == f by construction.
            let frame = AudioFrame::new(chunk, self.config)
                .expect("reframer always slices exactly F bytes");
            self.queue.push(frame);
        }
        state.residual.drain(0..offset);
        debug_assert!(state.residual.len() < f);
    }

    /// End the current assistant turn: zero-pad any residual up to `F` and
    /// enqueue it, then enqueue exactly one comfort-silence frame.
    pub fn end_of_turn(&self) {
        let f = self.config.frame_bytes();
        let mut state = self.state.lock();

        if !state.residual.is_empty() {
            let mut padded = std::mem::take(&mut state.residual);
            padded.resize(f, 0);
            let frame = AudioFrame::new(padded, self.config)
                .expect("padded residual is exactly F bytes");
            self.queue.push(frame);
        }
        self.queue.push(AudioFrame::silence(self.config));
        debug_assert!(state.residual.len() < f);
    }

    /// Barge-in: discard the residual accumulator and empty the downstream
    /// queue. Does not close the queue — the call continues.
    pub fn clear(&self) {
        self.state.lock().residual.clear();
        self.queue.clear();
    }

    /// End of call: discard residual and close the queue (wakes the
    /// downlink pacer with end-of-stream).
    pub fn close(&self) {
        self.state.lock().residual.clear();
        self.queue.close();
    }
}

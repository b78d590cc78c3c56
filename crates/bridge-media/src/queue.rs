//! The bounded, drop-oldest, poisonable frame queue (§4.2).
//!
//! One queue exists per direction per call. The producer side
//! (`push`) never blocks: once the queue is at capacity the oldest
//! frame is evicted before the new one is inserted, and a dropped-frame
//! counter is incremented. The consumer side (`take`) blocks until a
//! frame is available or the queue has been closed, in which case it
//! keeps returning `None` forever — `close` doesn't need to re-inject
//! anything because the poison state is a sticky flag, not a value
//! that gets consumed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::frame::AudioFrame;

/// Default capacity: `ceil(8s / 20ms) = 400` frames.
pub const DEFAULT_CAPACITY: usize = 400;

struct Inner {
    queue: Mutex<VecDeque<AudioFrame>>,
    capacity: usize,
    dropped: AtomicU64,
    poisoned: std::sync::atomic::AtomicBool,
    notify: Notify,
}

/// A bounded FIFO of [`AudioFrame`]s with drop-oldest overflow and a
/// poison sentinel for clean consumer shutdown.
///
/// Cheaply `Clone`-able: clones share the same underlying queue, so the
/// producer task and consumer task each hold their own handle to one
/// queue rather than fighting over a borrow.
#[derive(Clone)]
pub struct FrameQueue {
    inner: Arc<Inner>,
}

impl FrameQueue {
    /// Create a new queue with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                dropped: AtomicU64::new(0),
                poisoned: std::sync::atomic::AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Non-blocking push. If the queue is at capacity the oldest frame
    /// is dropped (and the dropped-frame counter incremented) before the
    /// new frame is inserted. A push after `close()` is a no-op: there is
    /// no consumer left to deliver it to.
    pub fn push(&self, frame: AudioFrame) {
        if self.inner.poisoned.load(Ordering::Acquire) {
            return;
        }
        {
            let mut q = self.inner.queue.lock();
            if q.len() >= self.inner.capacity {
                q.pop_front();
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            }
            q.push_back(frame);
        }
        self.inner.notify.notify_one();
    }

    /// Blocks until a frame is available or the queue is poisoned, in
    /// which case it returns `None` (end-of-stream). Safe to call
    /// repeatedly after poisoning — it keeps returning `None`.
    pub async fn take(&self) -> Option<AudioFrame> {
        loop {
            if let Some(frame) = self.inner.queue.lock().pop_front() {
                return Some(frame);
            }
            if self.inner.poisoned.load(Ordering::Acquire) {
                return None;
            }
            // Wait for either a push or a close. Re-check afterward since
            // notify_waiters can race a spurious wakeup with another
            // consumer (there should only be one, but this stays correct
            // even if that invariant is ever relaxed).
            let notified = self.inner.notify.notified();
            if self.inner.queue.lock().is_empty() && !self.inner.poisoned.load(Ordering::Acquire) {
                notified.await;
            }
        }
    }

    /// Non-blocking pop: returns immediately with `None` if the queue is
    /// currently empty, regardless of poison state. Useful for draining a
    /// queue from synchronous code (tests, teardown) without an executor.
    pub fn try_take(&self) -> Option<AudioFrame> {
        self.inner.queue.lock().pop_front()
    }

    /// Idempotently poison the queue, waking any blocked consumer.
    pub fn close(&self) {
        self.inner.poisoned.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.poisoned.load(Ordering::Acquire)
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Whether the queue currently holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of frames dropped due to overflow since construction.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Drain and discard all currently buffered frames without closing
    /// the queue (used by barge-in, §4.8).
    pub fn clear(&self) {
        self.inner.queue.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SampleConfig;

    fn frame(byte: u8) -> AudioFrame {
        AudioFrame::new(vec![byte; 320], SampleConfig::NARROWBAND).unwrap()
    }

    #[tokio::test]
    async fn push_then_take_preserves_order() {
        let q = FrameQueue::new(4);
        q.push(frame(1));
        q.push(frame(2));
        assert_eq!(q.take().await.unwrap().as_bytes()[0], 1);
        assert_eq!(q.take().await.unwrap().as_bytes()[0], 2);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts_exactly() {
        let q = FrameQueue::new(2);
        q.push(frame(1));
        q.push(frame(2));
        q.push(frame(3)); // drops 1
        q.push(frame(4)); // drops 2
        assert_eq!(q.dropped_count(), 2);
        assert_eq!(q.take().await.unwrap().as_bytes()[0], 3);
        assert_eq!(q.take().await.unwrap().as_bytes()[0], 4);
    }

    #[tokio::test]
    async fn push_never_blocks_at_capacity() {
        let q = FrameQueue::new(1);
        for i in 0..1000u16 {
            q.push(frame((i % 255) as u8));
        }
        assert_eq!(q.len(), 1);
        assert_eq!(q.dropped_count(), 999);
    }

    #[tokio::test]
    async fn take_blocks_until_push() {
        let q = FrameQueue::new(4);
        let q2 = q.clone();
        let waiter = tokio::spawn(async move { q2.take().await });
        tokio::task::yield_now().await;
        q.push(frame(7));
        let got = waiter.await.unwrap();
        assert_eq!(got.unwrap().as_bytes()[0], 7);
    }

    #[tokio::test]
    async fn close_unblocks_consumer_with_none() {
        let q = FrameQueue::new(4);
        let q2 = q.clone();
        let waiter = tokio::spawn(async move { q2.take().await });
        tokio::task::yield_now().await;
        q.close();
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_poison_sticks() {
        let q = FrameQueue::new(4);
        q.close();
        q.close();
        assert!(q.take().await.is_none());
        assert!(q.take().await.is_none());
    }

    #[tokio::test]
    async fn push_after_close_is_a_no_op() {
        let q = FrameQueue::new(4);
        q.close();
        q.push(frame(9));
        assert!(q.take().await.is_none());
    }

    #[tokio::test]
    async fn clear_empties_queue_without_closing() {
        let q = FrameQueue::new(4);
        q.push(frame(1));
        q.push(frame(2));
        q.clear();
        assert!(q.is_empty());
        assert!(!q.is_closed());
    }
}

//! Single-slot frame hand-off between a landmark source and one worker.
//!
//! The slot holds at most one pending frame. Pushing while a frame is
//! pending replaces it, so the worker always processes the most recent
//! frame and never more than one frame at a time.

use crate::pipeline::{FrameInput, Tracker, TrackingOutput};
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

struct SlotState<T> {
    pending: Option<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
    dropped: AtomicU64,
}

/// Depth-1 queue with drop-oldest overwrite
pub struct FrameSlot<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for FrameSlot<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    /// Create an empty, open slot
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SlotState {
                    pending: None,
                    closed: false,
                }),
                ready: Condvar::new(),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        // A panicking holder cannot leave the slot half-written
        self.shared.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Offer a frame, replacing any pending one
    ///
    /// Returns `true` if a pending frame was dropped. Frames pushed after
    /// [`close`](Self::close) are discarded and count as dropped.
    pub fn push(&self, frame: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        let replaced = state.pending.replace(frame).is_some();
        drop(state);

        if replaced {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.ready.notify_one();
        replaced
    }

    /// Take the pending frame without waiting
    pub fn try_recv(&self) -> Option<T> {
        self.lock().pending.take()
    }

    /// Wait for a frame; `None` once the slot is closed and drained
    pub fn recv(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.pending.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = self
                .shared
                .ready
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Stop accepting frames and wake the consumer
    ///
    /// A frame already pending is still delivered.
    pub fn close(&self) {
        self.lock().closed = true;
        self.shared.ready.notify_all();
    }

    /// Whether the slot has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of frames overwritten or rejected so far
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Run `tracker` on a worker thread fed from `slot`
///
/// Each processed frame's output is sent on `outputs`. The worker exits when
/// the slot is closed and drained, or when the receiver hangs up, and
/// returns the tracker so its state can be inspected or reused.
pub fn spawn_worker(
    mut tracker: Tracker,
    slot: FrameSlot<FrameInput>,
    outputs: Sender<TrackingOutput>,
) -> JoinHandle<Tracker> {
    thread::spawn(move || {
        info!("Tracking worker started");
        while let Some(frame) = slot.recv() {
            let output = tracker.process(frame);
            if outputs.send(output).is_err() {
                debug!("Output receiver dropped, stopping worker");
                slot.close();
                break;
            }
        }
        info!(
            "Tracking worker stopped after {} frames ({} dropped)",
            tracker.frames_processed(),
            slot.dropped()
        );
        tracker
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_overwrites_pending() {
        let slot = FrameSlot::new();
        assert!(!slot.push(1));
        assert!(slot.push(2));
        assert!(slot.push(3));
        assert_eq!(slot.dropped(), 2);
        assert_eq!(slot.try_recv(), Some(3));
        assert_eq!(slot.try_recv(), None);
    }

    #[test]
    fn test_close_drains_then_ends() {
        let slot = FrameSlot::new();
        slot.push(7);
        slot.close();
        assert!(slot.is_closed());
        assert_eq!(slot.recv(), Some(7));
        assert_eq!(slot.recv(), None);
        assert!(slot.push(8));
    }

    #[test]
    fn test_recv_wakes_on_push() {
        let slot = FrameSlot::new();
        let consumer = slot.clone();
        let handle = thread::spawn(move || consumer.recv());
        slot.push(42);
        assert_eq!(handle.join().unwrap(), Some(42));
    }

    #[test]
    fn test_recv_wakes_on_close() {
        let slot: FrameSlot<u32> = FrameSlot::new();
        let consumer = slot.clone();
        let handle = thread::spawn(move || consumer.recv());
        slot.close();
        assert_eq!(handle.join().unwrap(), None);
    }
}

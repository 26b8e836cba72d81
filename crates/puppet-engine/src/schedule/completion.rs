use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use super::FrameSlot;

/// Callback handed to the graphics backend; fired once the submitted work
/// for a frame has finished, on whatever thread the backend chooses.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Message posted back to the scheduling context when a frame completes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameCompletion {
    pub slot: FrameSlot,
    pub completed_at: Instant,
}

/// Sending half of the completion channel. Safe to move to any thread.
///
/// Holds no reference to scheduler state: once the receiving side is dropped,
/// notifications are discarded.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: Sender<FrameCompletion>,
}

impl CompletionSender {
    /// Posts a completion for `slot`, stamped with the current time.
    pub fn notify(&self, slot: FrameSlot) {
        let message = FrameCompletion {
            slot,
            completed_at: Instant::now(),
        };
        // A closed channel means the scheduler is gone; nothing left to release.
        let _ = self.tx.send(message);
    }

    /// Wraps [`notify`](Self::notify) in a one-shot backend callback.
    pub fn callback(&self, slot: FrameSlot) -> CompletionCallback {
        let sender = self.clone();
        Box::new(move || sender.notify(slot))
    }
}

/// Receiving half, owned by the scheduler and drained on its own context.
#[derive(Debug)]
pub struct CompletionQueue {
    rx: Receiver<FrameCompletion>,
}

impl CompletionQueue {
    pub fn channel() -> (CompletionSender, CompletionQueue) {
        let (tx, rx) = mpsc::channel();
        (CompletionSender { tx }, CompletionQueue { rx })
    }

    /// Takes every pending completion, oldest first.
    pub fn drain(&self) -> Vec<FrameCompletion> {
        let mut batch: Vec<_> = self.rx.try_iter().collect();
        batch.sort_by_key(|c| c.completed_at);
        batch
    }
}

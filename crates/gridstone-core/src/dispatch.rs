//! Closure marshaling across threads.
//!
//! Source objects may announce changes from any thread, but consumers
//! usually want to react on one well-known thread. A [`Dispatcher`] is the
//! seam: callers hand it boxed closures and it decides where they run.
//! [`ImmediateDispatcher`] runs them inline; [`QueuedDispatcher`] parks them
//! on a channel until a host loop pumps [`drain`].
//!
//! [`drain`]: QueuedDispatcher::drain

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use crate::logging::targets;

/// A boxed closure handed to a dispatcher.
pub type DispatchFn = Box<dyn FnOnce() + Send>;

/// Decides on which thread marshaled closures run.
pub trait Dispatcher: Send + Sync {
    /// Run or enqueue `f`.
    fn invoke(&self, f: DispatchFn);
}

/// Runs closures inline on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn invoke(&self, f: DispatchFn) {
        f();
    }
}

/// Parks closures on an unbounded channel until the owning thread pumps
/// them with [`drain`](Self::drain).
pub struct QueuedDispatcher {
    sender: Sender<DispatchFn>,
    receiver: Receiver<DispatchFn>,
}

impl QueuedDispatcher {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Run every queued closure on the calling thread. Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut count = 0;
        while let Ok(f) = self.receiver.try_recv() {
            f();
            count += 1;
        }
        if count > 0 {
            trace!(target: targets::DISPATCH, count, "drained queued invocations");
        }
        count
    }

    /// How many closures are waiting.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Dispatcher for QueuedDispatcher {
    fn invoke(&self, f: DispatchFn) {
        // The receiver lives on self, so the channel cannot be disconnected.
        let _ = self.sender.send(f);
    }
}

impl Default for QueuedDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(QueuedDispatcher: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_immediate_runs_inline() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        ImmediateDispatcher.invoke(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queued_waits_for_drain() {
        let queue = QueuedDispatcher::new();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let r = ran.clone();
            queue.invoke(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(queue.pending(), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        assert_eq!(queue.drain(), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.drain(), 0);
    }

    #[test]
    fn test_queued_from_other_threads() {
        let queue = Arc::new(QueuedDispatcher::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let ran = ran.clone();
                std::thread::spawn(move || {
                    queue.invoke(Box::new(move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                    }));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.drain(), 4);
        assert_eq!(ran.load(Ordering::SeqCst), 4);
    }
}

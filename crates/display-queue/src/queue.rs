//! Bounded frame queue

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Default queue capacity (frames)
pub const DEFAULT_CAPACITY: usize = 2;

#[derive(Debug, Default)]
struct Counters {
    pushed: AtomicU64,
    dropped: AtomicU64,
    popped: AtomicU64,
}

/// Queue statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pushed: u64,
    pub dropped: u64,
    pub popped: u64,
}

/// Create a queue holding at most `capacity` frames (minimum 1)
pub fn display_queue<T>(capacity: usize) -> (FrameProducer<T>, FrameConsumer<T>) {
    let capacity = capacity.max(1);
    let (tx, rx) = bounded(capacity);
    let counters = Arc::new(Counters::default());

    (
        FrameProducer {
            tx,
            counters: Arc::clone(&counters),
        },
        FrameConsumer {
            rx,
            capacity,
            counters,
        },
    )
}

/// Capture side of the queue
#[derive(Debug, Clone)]
pub struct FrameProducer<T> {
    tx: Sender<T>,
    counters: Arc<Counters>,
}

impl<T> FrameProducer<T> {
    /// Enqueue without blocking. A rejected frame is handed back inside the
    /// error: `Full` when the consumer is behind, `Disconnected` when it is
    /// gone.
    pub fn try_push(&self, frame: T) -> Result<(), TrySendError<T>> {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.counters.pushed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Display queue rejected frame (full: {})", e.is_full());
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }
}

/// Display side of the queue
#[derive(Debug, Clone)]
pub struct FrameConsumer<T> {
    rx: Receiver<T>,
    capacity: usize,
    counters: Arc<Counters>,
}

impl<T> FrameConsumer<T> {
    /// Oldest queued frame, if any. Never blocks.
    pub fn pop(&self) -> Option<T> {
        let frame = self.rx.try_recv().ok()?;
        self.counters.popped.fetch_add(1, Ordering::Relaxed);
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill ratio (0.0 - 1.0)
    pub fn fill_ratio(&self) -> f32 {
        self.len() as f32 / self.capacity as f32
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.counters.pushed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            popped: self.counters.popped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_and_pop_in_order() {
        let (tx, rx) = display_queue(DEFAULT_CAPACITY);
        tx.try_push(1).unwrap();
        tx.try_push(2).unwrap();
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), Some(2));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_full_queue_returns_frame() {
        let (tx, rx) = display_queue(2);
        tx.try_push("a").unwrap();
        tx.try_push("b").unwrap();
        assert!(tx.is_full());

        match tx.try_push("c") {
            Err(TrySendError::Full(frame)) => assert_eq!(frame, "c"),
            other => panic!("expected Full, got {:?}", other),
        }
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.stats(), QueueStats { pushed: 2, dropped: 1, popped: 0 });
    }

    #[test]
    fn test_disconnected_consumer() {
        let (tx, rx) = display_queue(2);
        drop(rx);
        assert!(matches!(tx.try_push(7), Err(TrySendError::Disconnected(7))));
    }

    #[test]
    fn test_fill_ratio() {
        let (tx, rx) = display_queue(4);
        assert_eq!(rx.fill_ratio(), 0.0);
        tx.try_push(0).unwrap();
        assert!((rx.fill_ratio() - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (tx, rx) = display_queue(0);
        assert_eq!(rx.capacity(), 1);
        tx.try_push(1).unwrap();
        assert!(tx.try_push(2).is_err());
    }

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            capacity in 1usize..5,
            ops in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let (tx, rx) = display_queue(capacity);
            for (i, push) in ops.into_iter().enumerate() {
                if push {
                    let _ = tx.try_push(i);
                } else {
                    rx.pop();
                }
                prop_assert!(rx.len() <= capacity);
            }
            let stats = rx.stats();
            prop_assert_eq!(stats.pushed - stats.popped, rx.len() as u64);
        }
    }
}

//! Display Queue
//!
//! Bounded hand-off between the capture thread and the display tick.
//! Neither side ever blocks: a full queue rejects the frame, an empty one
//! yields nothing.

mod queue;

pub use crossbeam_channel::TrySendError;
pub use queue::{display_queue, FrameConsumer, FrameProducer, QueueStats, DEFAULT_CAPACITY};

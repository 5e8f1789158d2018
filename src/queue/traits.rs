//! Traits for the queue system
//!
//! `Consumer` is the read/write capability set shared by a plain queue and a
//! consumer group. The protocol layer resolves a target to one of them and
//! programs only against this trait.

use crate::queue::{QueueResult, Stats};

/// Something items can be taken from and returned to
pub trait Consumer: Send + Sync {
    /// Remove and return the next item
    fn get_next(&self) -> QueueResult<Vec<u8>>;

    /// Return an item taken by `get_next` so it is served again
    fn put_back(&self, value: &[u8]) -> QueueResult<()>;

    /// Return the next item without consuming it
    fn peek(&self) -> QueueResult<Vec<u8>>;

    /// Number of items this consumer can still read
    fn length(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.length() < 1
    }

    /// Discard everything this consumer can currently read
    fn flush(&self) -> QueueResult<()>;

    /// Open-read accounting for this consumer
    fn stats(&self) -> &Stats;
}

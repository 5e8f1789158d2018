//! Persistent Queue Component
//!
//! A durable FIFO queue of opaque byte values, stored in an embedded ordered
//! key-value store (sled). Items are appended at the tail and consumed from
//! the head; an item taken with `get_next` can be returned with `put_back`
//! so it is served again first.
//!
//! # Overview
//!
//! - **Exclusive queues** own a store directory named after the queue.
//! - **Shared queues** live inside another store under a key prefix. Consumer
//!   groups use these for their retry buffers.
//! - **Consumer**: the capability trait the protocol layer programs against,
//!   implemented by queues and consumer groups alike.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use stashq::queue::{Consumer, Queue};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Queue::open("jobs", "./data")?;
//! queue.enqueue(b"first")?;
//! queue.enqueue(b"second")?;
//!
//! let value = queue.get_next()?;
//! assert_eq!(value, b"first");
//!
//! // give it back; it is served again before "second"
//! queue.put_back(&value)?;
//! assert_eq!(queue.peek()?, b"first");
//! # Ok(())
//! # }
//! ```

mod error;
mod internal;
mod item;
mod stats;
mod traits;

pub use error::{QueueError, QueueResult};
pub use internal::Queue;
pub use item::{decode_key, encode_key, Item};
pub use stats::Stats;
pub use traits::Consumer;

#[cfg(test)]
mod tests;

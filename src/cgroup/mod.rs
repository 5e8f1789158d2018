//! Consumer Groups
//!
//! Independent readers over one shared source queue. Each group keeps a
//! persisted cursor (the last source id it consumed) and a private retry
//! buffer for items it put back; neither touches the source's items, so any
//! number of groups can fan out over the same data.
//!
//! ```text
//!   source queue:   [ 1 | 2 | 3 | 4 | 5 | 6 ]
//!                         ^           ^
//!                    group "a"    group "b"     (cursors in _.metadata)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use stashq::cgroup::CGQueue;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = CGQueue::open("events", "./data")?;
//! queue.enqueue(b"hello")?;
//!
//! let audit = queue.consumer_group("audit")?;
//! let mailer = queue.consumer_group("mailer")?;
//! assert_eq!(audit.get_next()?, b"hello");
//! assert_eq!(mailer.get_next()?, b"hello");
//!
//! // the source itself is untouched
//! assert_eq!(queue.length(), 1);
//! # Ok(())
//! # }
//! ```

mod cgqueue;
mod group;
mod manager;

pub use cgqueue::CGQueue;
pub use group::{cursor_key, retry_prefix, ConsumerGroup, MAX_READ_RETRIES};
pub use manager::CGManager;

#[cfg(test)]
mod tests;

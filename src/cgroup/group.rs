//! A single consumer group: a persisted cursor over a source queue plus a
//! private retry buffer

use crate::core::sync::handle_mutex_poison;
use crate::core::validation::{check_group_name, NameCheck, MAX_QUEUE_NAME_LEN};
use crate::queue::{Consumer, Item, Queue, QueueError, QueueResult, Stats};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Upper bound on re-reads when the source moves under a group read
pub const MAX_READ_RETRIES: usize = 100;

/// Store key holding the cursor of group `name`
pub fn cursor_key(name: &str) -> Vec<u8> {
    format!("{}{}", CURSOR_PREFIX, name).into_bytes()
}

/// Key prefix of the retry buffer of group `name`
pub fn retry_prefix(name: &str) -> Vec<u8> {
    format!("_r:{}:", name).into_bytes()
}

pub(crate) const CURSOR_PREFIX: &str = "_c:";

/// An independent reader over a source queue
///
/// Items are never removed from the source by a group; the group only
/// advances its own cursor. Items put back land in the retry buffer and
/// are served before the cursor moves again.
pub struct ConsumerGroup {
    name: String,
    source: Arc<Queue>,
    db: sled::Db,
    cursor: Mutex<u64>,
    failed_reads: Queue,
    stats: Stats,
}

impl std::fmt::Debug for ConsumerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerGroup")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("failed_reads", &self.failed_reads.length())
            .finish()
    }
}

impl ConsumerGroup {
    /// Open the group `name` over `source`, keeping its state in `db`
    ///
    /// A group seen for the first time starts at the source's current head.
    pub fn open(
        name: &str,
        source: Arc<Queue>,
        db: sled::Db,
        data_dir: impl AsRef<Path>,
    ) -> QueueResult<Self> {
        validate_group_name(name)?;

        let (head, tail) = source.bounds();
        let cursor = match db.get(cursor_key(name))? {
            Some(raw) => decode_cursor(name, &raw)?,
            None => {
                write_cursor(&db, name, head)?;
                head
            }
        };
        // a source recreated underneath us restarts its ids
        let cursor = if cursor > tail {
            write_cursor(&db, name, head)?;
            head
        } else {
            cursor
        };

        let failed_reads = Queue::open_shared(
            &format!("{}.{}", source.name(), name),
            data_dir,
            retry_prefix(name),
            db.clone(),
        )?;

        Ok(Self {
            name: name.to_string(),
            source,
            db,
            cursor: Mutex::new(cursor),
            failed_reads,
            stats: Stats::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The queue this group reads from
    pub fn source(&self) -> &Arc<Queue> {
        &self.source
    }

    /// Id of the last source item this group consumed
    pub fn cursor(&self) -> QueueResult<u64> {
        Ok(*self.lock_cursor()?)
    }

    /// Items waiting in the retry buffer
    pub fn failed_reads(&self) -> &Queue {
        &self.failed_reads
    }

    pub fn get_next(&self) -> QueueResult<Vec<u8>> {
        match self.failed_reads.get_next() {
            Ok(value) => return Ok(value),
            Err(QueueError::Empty) => {}
            Err(e) => return Err(e),
        }

        let mut cursor = self.lock_cursor()?;
        let item = self.next_source_item(*cursor)?;
        write_cursor(&self.db, &self.name, item.id)?;
        *cursor = item.id;
        Ok(item.value)
    }

    pub fn put_back(&self, value: &[u8]) -> QueueResult<()> {
        self.failed_reads.enqueue(value)
    }

    pub fn peek(&self) -> QueueResult<Vec<u8>> {
        match self.failed_reads.peek() {
            Ok(value) => return Ok(value),
            Err(QueueError::Empty) => {}
            Err(e) => return Err(e),
        }

        let cursor = self.lock_cursor()?;
        Ok(self.next_source_item(*cursor)?.value)
    }

    pub fn length(&self) -> u64 {
        let cursor = match self.lock_cursor() {
            Ok(cursor) => *cursor,
            Err(_) => return self.failed_reads.length(),
        };
        let (head, tail) = self.source.bounds();
        let pending = if cursor >= head {
            tail.saturating_sub(cursor)
        } else {
            tail.saturating_sub(head)
        };
        pending + self.failed_reads.length()
    }

    pub fn is_empty(&self) -> bool {
        self.length() < 1
    }

    /// Drop the retry buffer and move the cursor back to the source head
    pub fn reset(&self) -> QueueResult<()> {
        let mut cursor = self.lock_cursor()?;
        self.failed_reads.delete_all()?;
        let head = self.source.head();
        write_cursor(&self.db, &self.name, head)?;
        *cursor = head;
        Ok(())
    }

    /// Drop the retry buffer, forget the persisted cursor and close the group
    ///
    /// Handles still held elsewhere fail with `Closed` afterwards, so they
    /// cannot write the cursor back.
    pub fn delete(&self) -> QueueResult<()> {
        let mut cursor = self.lock_cursor()?;
        self.failed_reads.delete_all()?;
        self.db.remove(cursor_key(&self.name))?;
        *cursor = 0;
        self.failed_reads.close()
    }

    /// Release the retry buffer's handle on the shared store
    pub fn close(&self) -> QueueResult<()> {
        self.failed_reads.close()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Resolve the next unread source item after `cursor`
    fn next_source_item(&self, cursor: u64) -> QueueResult<Item> {
        for _ in 0..MAX_READ_RETRIES {
            let (head, tail) = self.source.bounds();
            if cursor >= tail {
                return Err(QueueError::Empty);
            }
            let read = if cursor < head {
                self.source.read_item_by_offset(0)
            } else {
                self.source.read_item_by_id(cursor + 1)
            };
            match read {
                Ok(item) => return Ok(item),
                // the source moved between the bounds check and the read
                Err(QueueError::OutOfBounds { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(QueueError::OutOfBounds { id: cursor + 1 })
    }

    fn lock_cursor(&self) -> QueueResult<MutexGuard<'_, u64>> {
        let cursor = handle_mutex_poison(self.cursor.lock(), |message| QueueError::Poisoned {
            message,
        })?;
        if self.failed_reads.is_closed() {
            return Err(QueueError::Closed {
                name: format!("{}.{}", self.source.name(), self.name),
            });
        }
        Ok(cursor)
    }
}

impl Consumer for ConsumerGroup {
    fn get_next(&self) -> QueueResult<Vec<u8>> {
        ConsumerGroup::get_next(self)
    }

    fn put_back(&self, value: &[u8]) -> QueueResult<()> {
        ConsumerGroup::put_back(self, value)
    }

    fn peek(&self) -> QueueResult<Vec<u8>> {
        ConsumerGroup::peek(self)
    }

    fn length(&self) -> u64 {
        ConsumerGroup::length(self)
    }

    fn flush(&self) -> QueueResult<()> {
        self.reset()
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

pub(crate) fn validate_group_name(name: &str) -> QueueResult<()> {
    match check_group_name(name) {
        NameCheck::Valid => Ok(()),
        NameCheck::InvalidCharacters => Err(QueueError::InvalidName {
            name: name.to_string(),
        }),
        NameCheck::TooLong => Err(QueueError::NameTooLong {
            len: name.len(),
            max: MAX_QUEUE_NAME_LEN,
        }),
    }
}

fn write_cursor(db: &sled::Db, name: &str, cursor: u64) -> QueueResult<()> {
    db.insert(cursor_key(name), &cursor.to_be_bytes())?;
    Ok(())
}

fn decode_cursor(name: &str, raw: &[u8]) -> QueueResult<u64> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| QueueError::CorruptKey {
        message: format!("cursor of group '{}' is {} bytes", name, raw.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

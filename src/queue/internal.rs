//! Persistent FIFO queue over an ordered key-value store
//!
//! Items live under `prefix + id` where `id` is a big-endian u64. The live
//! window is `(head, tail]`: `head` is the id of the last consumed item and
//! `tail` the id of the last enqueued one. Neither is persisted; both are
//! recovered on open by scanning the first and last keys under the prefix.
//!
//! A queue either owns its store exclusively (one directory per queue) or
//! shares a store opened by someone else, in which case its keys carry a
//! namespace prefix and the queue can not be flushed.

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::core::validation::{check_queue_name, NameCheck, MAX_QUEUE_NAME_LEN};
use crate::queue::item::{decode_key, encode_key, Item};
use crate::queue::{Consumer, QueueError, QueueResult, Stats};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct QueueState {
    db: Option<sled::Db>,
    head: u64,
    tail: u64,
}

/// A named, persistent FIFO queue
pub struct Queue {
    name: String,
    data_dir: PathBuf,
    prefix: Vec<u8>,
    exclusive: bool,
    stats: Stats,
    state: RwLock<QueueState>,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (head, tail) = self.bounds();
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("data_dir", &self.data_dir)
            .field("prefix", &String::from_utf8_lossy(&self.prefix))
            .field("exclusive", &self.exclusive)
            .field("head", &head)
            .field("tail", &tail)
            .finish()
    }
}

impl Queue {
    /// Open (or create) the queue stored in `data_dir/name`
    pub fn open(name: &str, data_dir: impl AsRef<Path>) -> QueueResult<Self> {
        validate_name(name)?;
        let data_dir = data_dir.as_ref().to_path_buf();
        let db = sled::open(data_dir.join(name))?;
        let (head, tail) = recover_bounds(&db, b"")?;

        Ok(Self {
            name: name.to_string(),
            data_dir,
            prefix: Vec::new(),
            exclusive: true,
            stats: Stats::new(),
            state: RwLock::new(QueueState {
                db: Some(db),
                head,
                tail,
            }),
        })
    }

    /// Open a queue living inside a store owned by someone else
    ///
    /// Every key of this queue starts with `prefix`. `name` is used only for
    /// reporting and is not validated.
    pub fn open_shared(
        name: &str,
        data_dir: impl AsRef<Path>,
        prefix: impl Into<Vec<u8>>,
        db: sled::Db,
    ) -> QueueResult<Self> {
        let prefix = prefix.into();
        let (head, tail) = recover_bounds(&db, &prefix)?;

        Ok(Self {
            name: name.to_string(),
            data_dir: data_dir.as_ref().to_path_buf(),
            prefix,
            exclusive: false,
            stats: Stats::new(),
            state: RwLock::new(QueueState {
                db: Some(db),
                head,
                tail,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the queue's store lives in
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.name)
    }

    pub fn is_shared(&self) -> bool {
        !self.exclusive
    }

    pub fn head(&self) -> u64 {
        self.bounds().0
    }

    pub fn tail(&self) -> u64 {
        self.bounds().1
    }

    /// Consistent `(head, tail)` snapshot
    pub fn bounds(&self) -> (u64, u64) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.head, state.tail)
    }

    pub fn length(&self) -> u64 {
        let (head, tail) = self.bounds();
        tail.saturating_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.length() < 1
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// `true` once `close` or `destroy` has released the store
    pub fn is_closed(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.db.is_none()
    }

    /// Append a value at the tail
    pub fn enqueue(&self, value: &[u8]) -> QueueResult<()> {
        let mut state = self.write_state()?;
        let id = state.tail + 1;
        self.store(&state)?
            .insert(encode_key(&self.prefix, id), value)?;
        state.tail = id;
        Ok(())
    }

    /// Remove and return the item right after head
    pub fn get_next(&self) -> QueueResult<Vec<u8>> {
        let mut state = self.write_state()?;
        let item = self.read_item(&state, state.head + 1)?;
        self.store(&state)?.remove(&item.key)?;
        state.head = item.id;
        Ok(item.value)
    }

    /// Store `value` at the current head position and step head back
    pub fn put_back(&self, value: &[u8]) -> QueueResult<()> {
        let mut state = self.write_state()?;
        if state.head < 1 {
            return Err(QueueError::InvalidHeadValue);
        }
        self.store(&state)?
            .insert(encode_key(&self.prefix, state.head), value)?;
        state.head -= 1;
        Ok(())
    }

    /// The next item's value, without consuming it
    pub fn peek(&self) -> QueueResult<Vec<u8>> {
        let state = self.read_state()?;
        Ok(self.read_item(&state, state.head + 1)?.value)
    }

    /// Read the item with absolute id `id`
    pub fn read_item_by_id(&self, id: u64) -> QueueResult<Item> {
        let state = self.read_state()?;
        self.read_item(&state, id)
    }

    /// Read the item `offset` positions after head (0 is the next item)
    pub fn read_item_by_offset(&self, offset: u64) -> QueueResult<Item> {
        let state = self.read_state()?;
        let id = state
            .head
            .checked_add(offset)
            .and_then(|id| id.checked_add(1))
            .ok_or(QueueError::OutOfBounds { id: u64::MAX })?;
        self.read_item(&state, id)
    }

    /// Delete every key under this queue's prefix and reset head and tail
    pub fn delete_all(&self) -> QueueResult<()> {
        let mut state = self.write_state()?;
        let db = self.store(&state)?;
        let mut batch = sled::Batch::default();
        for entry in db.scan_prefix(&self.prefix) {
            let (key, _) = entry?;
            batch.remove(key);
        }
        db.apply_batch(batch)?;
        state.head = 0;
        state.tail = 0;
        Ok(())
    }

    /// Drop all items by recreating the store directory
    ///
    /// Only allowed on queues that own their store.
    pub fn flush(&self) -> QueueResult<()> {
        if !self.exclusive {
            return Err(QueueError::SharedFlush {
                name: self.name.clone(),
            });
        }
        let mut state = self.write_state()?;
        if let Some(db) = state.db.take() {
            db.flush()?;
        }
        remove_store_dir(&self.path())?;
        state.db = Some(sled::open(self.path())?);
        state.head = 0;
        state.tail = 0;
        Ok(())
    }

    /// Release the store; later operations fail with `Closed`
    pub fn close(&self) -> QueueResult<()> {
        let mut state = self.write_state()?;
        if let Some(db) = state.db.take() {
            if self.exclusive {
                db.flush()?;
            }
        }
        Ok(())
    }

    /// Close the queue and remove its directory (exclusive queues only)
    pub fn destroy(&self) -> QueueResult<()> {
        self.close()?;
        if self.exclusive {
            remove_store_dir(&self.path())?;
        }
        Ok(())
    }

    fn read_item(&self, state: &QueueState, id: u64) -> QueueResult<Item> {
        if id <= state.head || id > state.tail {
            if state.head == state.tail {
                return Err(QueueError::Empty);
            }
            return Err(QueueError::OutOfBounds { id });
        }
        let key = encode_key(&self.prefix, id);
        match self.store(state)?.get(&key)? {
            Some(value) => Ok(Item {
                id,
                key,
                value: value.to_vec(),
            }),
            None => Err(QueueError::OutOfBounds { id }),
        }
    }

    fn store<'a>(&self, state: &'a QueueState) -> QueueResult<&'a sled::Db> {
        state.db.as_ref().ok_or_else(|| QueueError::Closed {
            name: self.name.clone(),
        })
    }

    fn read_state(&self) -> QueueResult<RwLockReadGuard<'_, QueueState>> {
        handle_rwlock_read(self.state.read(), |message| QueueError::Poisoned { message })
    }

    fn write_state(&self) -> QueueResult<RwLockWriteGuard<'_, QueueState>> {
        handle_rwlock_write(self.state.write(), |message| QueueError::Poisoned { message })
    }
}

impl Consumer for Queue {
    fn get_next(&self) -> QueueResult<Vec<u8>> {
        Queue::get_next(self)
    }

    fn put_back(&self, value: &[u8]) -> QueueResult<()> {
        Queue::put_back(self, value)
    }

    fn peek(&self) -> QueueResult<Vec<u8>> {
        Queue::peek(self)
    }

    fn length(&self) -> u64 {
        Queue::length(self)
    }

    fn flush(&self) -> QueueResult<()> {
        Queue::flush(self)
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

fn validate_name(name: &str) -> QueueResult<()> {
    match check_queue_name(name) {
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

/// First key minus one and last key under `prefix`, or (0, 0) when empty
fn recover_bounds(db: &sled::Db, prefix: &[u8]) -> QueueResult<(u64, u64)> {
    let mut entries = db.scan_prefix(prefix);
    let first = match entries.next() {
        Some(entry) => decode_key(prefix, &entry?.0)?,
        None => return Ok((0, 0)),
    };
    let last = match entries.next_back() {
        Some(entry) => decode_key(prefix, &entry?.0)?,
        None => first,
    };
    Ok((first.saturating_sub(1), last))
}

fn remove_store_dir(path: &Path) -> QueueResult<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

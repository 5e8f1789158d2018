//! A source queue bound to its consumer groups under one name
//!
//! On-disk layout for queue `name`:
//!
//! ```text
//! <data_dir>/<name>/<name>        source queue store
//! <data_dir>/<name>/_.metadata    cursors and retry buffers of all groups
//! ```

use crate::cgroup::{CGManager, ConsumerGroup};
use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::queue::{Consumer, Queue, QueueError, QueueResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const METADATA_DIR: &str = "_.metadata";

struct Parts {
    source: Arc<Queue>,
    manager: CGManager,
}

/// A queue together with its consumer groups
///
/// Reads and writes hold a shared lock on the parts, so a whole-queue flush
/// (which recreates both stores) never overlaps an in-flight operation.
pub struct CGQueue {
    name: String,
    data_dir: PathBuf,
    parts: RwLock<Option<Parts>>,
}

impl std::fmt::Debug for CGQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CGQueue")
            .field("name", &self.name)
            .field("path", &self.path())
            .finish()
    }
}

impl CGQueue {
    /// Open (or create) queue `name` below `data_dir`
    pub fn open(name: &str, data_dir: impl AsRef<Path>) -> QueueResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let parts = open_parts(name, &data_dir.join(name))?;
        Ok(Self {
            name: name.to_string(),
            data_dir,
            parts: RwLock::new(Some(parts)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding both stores of this queue
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.name)
    }

    /// Run `f` against the plain queue (`None`) or the named consumer group
    pub fn with_consumer<T>(
        &self,
        group: Option<&str>,
        f: impl FnOnce(&dyn Consumer) -> QueueResult<T>,
    ) -> QueueResult<T> {
        let parts = self.read_parts()?;
        let parts = self.live_parts(&parts)?;
        match group {
            None => f(parts.source.as_ref()),
            Some(name) => {
                let group = parts.manager.get_or_create(name)?;
                f(group.as_ref())
            }
        }
    }

    pub fn enqueue(&self, value: &[u8]) -> QueueResult<()> {
        let parts = self.read_parts()?;
        self.live_parts(&parts)?.source.enqueue(value)
    }

    pub fn get_next(&self) -> QueueResult<Vec<u8>> {
        self.with_consumer(None, |queue| queue.get_next())
    }

    pub fn put_back(&self, value: &[u8]) -> QueueResult<()> {
        self.with_consumer(None, |queue| queue.put_back(value))
    }

    pub fn peek(&self) -> QueueResult<Vec<u8>> {
        self.with_consumer(None, |queue| queue.peek())
    }

    /// Items in the source queue; 0 once closed
    pub fn length(&self) -> u64 {
        self.with_consumer(None, |queue| Ok(queue.length()))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.length() < 1
    }

    pub fn head(&self) -> QueueResult<u64> {
        let parts = self.read_parts()?;
        Ok(self.live_parts(&parts)?.source.head())
    }

    pub fn tail(&self) -> QueueResult<u64> {
        let parts = self.read_parts()?;
        Ok(self.live_parts(&parts)?.source.tail())
    }

    /// Open reads held against the plain queue
    pub fn open_reads(&self) -> i64 {
        self.with_consumer(None, |queue| Ok(queue.stats().open_reads()))
            .unwrap_or_default()
    }

    /// The consumer group `name`, created on first use
    pub fn consumer_group(&self, name: &str) -> QueueResult<Arc<ConsumerGroup>> {
        let parts = self.read_parts()?;
        self.live_parts(&parts)?.manager.get_or_create(name)
    }

    pub fn delete_consumer_group(&self, name: &str) -> QueueResult<()> {
        let parts = self.read_parts()?;
        self.live_parts(&parts)?.manager.delete(name)
    }

    /// Snapshot of all consumer groups, ordered by name
    pub fn consumer_group_iter(&self) -> QueueResult<Vec<(String, Arc<ConsumerGroup>)>> {
        let parts = self.read_parts()?;
        self.live_parts(&parts)?.manager.iter()
    }

    /// Reset the source and every consumer group by recreating the directory
    pub fn flush(&self) -> QueueResult<()> {
        let mut parts = self.write_parts()?;
        if let Some(old) = parts.take() {
            close_parts(&old)?;
        }
        remove_dir(&self.path())?;
        *parts = Some(open_parts(&self.name, &self.path())?);
        Ok(())
    }

    /// Close both stores; later operations fail with `Closed`
    pub fn close(&self) -> QueueResult<()> {
        let mut parts = self.write_parts()?;
        if let Some(old) = parts.take() {
            close_parts(&old)?;
        }
        Ok(())
    }

    /// Close the queue and delete its directory
    pub fn destroy(&self) -> QueueResult<()> {
        self.close()?;
        remove_dir(&self.path())?;
        Ok(())
    }

    fn live_parts<'a>(&self, parts: &'a Option<Parts>) -> QueueResult<&'a Parts> {
        parts.as_ref().ok_or_else(|| QueueError::Closed {
            name: self.name.clone(),
        })
    }

    fn read_parts(&self) -> QueueResult<RwLockReadGuard<'_, Option<Parts>>> {
        handle_rwlock_read(self.parts.read(), |message| QueueError::Poisoned { message })
    }

    fn write_parts(&self) -> QueueResult<RwLockWriteGuard<'_, Option<Parts>>> {
        handle_rwlock_write(self.parts.write(), |message| QueueError::Poisoned { message })
    }
}

fn open_parts(name: &str, dir: &Path) -> QueueResult<Parts> {
    let source = Arc::new(Queue::open(name, dir)?);
    let db = sled::open(dir.join(METADATA_DIR))?;
    let manager = CGManager::open(Arc::clone(&source), db, dir)?;
    Ok(Parts { source, manager })
}

fn close_parts(parts: &Parts) -> QueueResult<()> {
    parts.manager.close()?;
    parts.source.close()
}

fn remove_dir(path: &Path) -> QueueResult<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

//! Queue Repository
//!
//! Process wide registry of the queues under one data directory, plus the
//! server counters reported by `stats`. Each sub-directory of the data
//! directory is one queue (see [`CGQueue`]).

mod stats;

pub use stats::{ServerStats, StatItem};

use crate::cgroup::CGQueue;
use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::core::validation::{check_queue_name, NameCheck};
use crate::core::version::server_version;
use crate::queue::{QueueError, QueueResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

type QueueMap = HashMap<String, Arc<CGQueue>>;

pub struct QueueRepository {
    data_path: PathBuf,
    queues: RwLock<QueueMap>,
    create_lock: Mutex<()>,
    stats: ServerStats,
}

impl std::fmt::Debug for QueueRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueRepository")
            .field("data_path", &self.data_path)
            .field("queues", &self.count())
            .finish()
    }
}

impl QueueRepository {
    /// Open the repository rooted at `data_dir`, creating it when absent
    pub fn open(data_dir: impl AsRef<Path>) -> QueueResult<Self> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let data_path = data_dir.as_ref().canonicalize()?;

        let repository = Self {
            data_path,
            queues: RwLock::new(HashMap::new()),
            create_lock: Mutex::new(()),
            stats: ServerStats::new(server_version()),
        };
        repository.load_existing()?;
        Ok(repository)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// The queue `name`, opened (and created) on first use
    pub fn get_queue(&self, name: &str) -> QueueResult<Arc<CGQueue>> {
        if let Some(queue) = self.read_queues()?.get(name) {
            return Ok(Arc::clone(queue));
        }

        let _guard = self.lock_creation()?;
        if let Some(queue) = self.read_queues()?.get(name) {
            return Ok(Arc::clone(queue));
        }

        let queue = Arc::new(CGQueue::open(name, &self.data_path)?);
        self.write_queues()?
            .insert(name.to_string(), Arc::clone(&queue));
        log::info!("queue '{}' created", name);
        Ok(queue)
    }

    /// The queue `name` if it is already open
    pub fn find_queue(&self, name: &str) -> QueueResult<Option<Arc<CGQueue>>> {
        Ok(self.read_queues()?.get(name).cloned())
    }

    /// Remove queue `name` and its directory; no-op when absent
    ///
    /// Holds the creation lock until the directory is gone, so a concurrent
    /// `get_queue` cannot reopen the store while it is being removed.
    pub fn delete_queue(&self, name: &str) -> QueueResult<()> {
        let _guard = self.lock_creation()?;
        let removed = self.write_queues()?.remove(name);
        if let Some(queue) = removed {
            queue.destroy()?;
            log::info!("queue '{}' deleted", name);
        }
        Ok(())
    }

    /// Recreate queue `name` empty
    pub fn flush_queue(&self, name: &str) -> QueueResult<Arc<CGQueue>> {
        self.delete_queue(name)?;
        self.get_queue(name)
    }

    pub fn delete_all_queues(&self) -> QueueResult<()> {
        let _guard = self.lock_creation()?;
        let queues: Vec<_> = self.write_queues()?.drain().collect();
        for (_, queue) in queues {
            queue.destroy()?;
        }
        Ok(())
    }

    pub fn flush_all_queues(&self) -> QueueResult<()> {
        let queues = self.queues()?;
        for (_, queue) in queues {
            queue.flush()?;
        }
        Ok(())
    }

    /// Close every queue; the registry is empty afterwards
    pub fn close_all_queues(&self) -> QueueResult<()> {
        let _guard = self.lock_creation()?;
        let queues: Vec<_> = self.write_queues()?.drain().collect();
        let mut first_error = None;
        for (name, queue) in queues {
            if let Err(e) = queue.close() {
                log::error!("queue '{}': close failed: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn count(&self) -> usize {
        self.queues
            .read()
            .map(|queues| queues.len())
            .unwrap_or_default()
    }

    /// Snapshot of all open queues, ordered by name
    pub fn queues(&self) -> QueueResult<Vec<(String, Arc<CGQueue>)>> {
        let mut snapshot: Vec<_> = self
            .read_queues()?
            .iter()
            .map(|(name, queue)| (name.clone(), Arc::clone(queue)))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(snapshot)
    }

    /// Server counters followed by per queue and per group lines
    pub fn full_stats(&self) -> QueueResult<Vec<StatItem>> {
        let mut items = self.stats.items();
        for (name, queue) in self.queues()? {
            items.push(StatItem::new(format!("queue_{}_items", name), queue.length()));
            items.push(StatItem::new(
                format!("queue_{}_open_transactions", name),
                queue.open_reads(),
            ));
            let groups = match queue.consumer_group_iter() {
                Ok(groups) => groups,
                // deleted or flushed concurrently
                Err(QueueError::Closed { .. }) => continue,
                Err(e) => return Err(e),
            };
            for (group_name, group) in groups {
                items.push(StatItem::new(
                    format!("queue_{}.{}_items", name, group_name),
                    group.length(),
                ));
                items.push(StatItem::new(
                    format!("queue_{}.{}_open_transactions", name, group_name),
                    group.stats().open_reads(),
                ));
            }
        }
        Ok(items)
    }

    fn load_existing(&self) -> QueueResult<()> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.data_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if check_queue_name(&name) != NameCheck::Valid {
                log::warn!("skipping '{}': not a queue directory", name);
                continue;
            }
            names.push(name);
        }
        names.sort();

        for name in names {
            let queue = self.get_queue(&name)?;
            log::info!(
                "queue \"{}\": size {}, head {}, tail {}",
                name,
                queue.length(),
                queue.head()?,
                queue.tail()?
            );
        }
        Ok(())
    }

    fn lock_creation(&self) -> QueueResult<MutexGuard<'_, ()>> {
        handle_mutex_poison(self.create_lock.lock(), |message| QueueError::Poisoned { message })
    }

    fn read_queues(&self) -> QueueResult<RwLockReadGuard<'_, QueueMap>> {
        handle_rwlock_read(self.queues.read(), |message| QueueError::Poisoned { message })
    }

    fn write_queues(&self) -> QueueResult<RwLockWriteGuard<'_, QueueMap>> {
        handle_rwlock_write(self.queues.write(), |message| QueueError::Poisoned { message })
    }
}

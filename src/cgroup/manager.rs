//! Registry of the consumer groups of one source queue

use crate::cgroup::group::{validate_group_name, ConsumerGroup, CURSOR_PREFIX};
use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::queue::{Queue, QueueError, QueueResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Lazily populated map of group name to group
///
/// All groups of a source share one store for their cursors and retry
/// buffers. At most one `ConsumerGroup` exists per name.
pub struct CGManager {
    source: Arc<Queue>,
    db: sled::Db,
    data_dir: PathBuf,
    groups: RwLock<HashMap<String, Arc<ConsumerGroup>>>,
    create_lock: Mutex<()>,
}

impl CGManager {
    /// Bind to `source` and rebuild every group persisted in `db`
    pub fn open(source: Arc<Queue>, db: sled::Db, data_dir: impl AsRef<Path>) -> QueueResult<Self> {
        let manager = Self {
            source,
            db,
            data_dir: data_dir.as_ref().to_path_buf(),
            groups: RwLock::new(HashMap::new()),
            create_lock: Mutex::new(()),
        };

        for name in manager.persisted_names()? {
            manager.get_or_create(&name)?;
        }
        Ok(manager)
    }

    /// Return the group `name`, creating it on first use
    pub fn get_or_create(&self, name: &str) -> QueueResult<Arc<ConsumerGroup>> {
        if let Some(group) = self.lookup(name)? {
            return Ok(group);
        }

        let _guard = self.lock_creation()?;
        if let Some(group) = self.lookup(name)? {
            return Ok(group);
        }

        let group = Arc::new(ConsumerGroup::open(
            name,
            Arc::clone(&self.source),
            self.db.clone(),
            &self.data_dir,
        )?);
        self.write_groups()?
            .insert(name.to_string(), Arc::clone(&group));
        Ok(group)
    }

    /// Remove the group `name` and its persisted state; no-op when absent
    ///
    /// The creation lock is held until the old group is closed, so a
    /// concurrent `get_or_create` cannot reopen its retry buffer early.
    pub fn delete(&self, name: &str) -> QueueResult<()> {
        let _guard = self.lock_creation()?;
        let removed = self.write_groups()?.remove(name);
        if let Some(group) = removed {
            group.delete()?;
        }
        Ok(())
    }

    /// Point-in-time snapshot of all groups, ordered by name
    pub fn iter(&self) -> QueueResult<Vec<(String, Arc<ConsumerGroup>)>> {
        let groups = self.read_groups()?;
        let mut snapshot: Vec<_> = groups
            .iter()
            .map(|(name, group)| (name.clone(), Arc::clone(group)))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(snapshot)
    }

    pub fn count(&self) -> usize {
        self.groups
            .read()
            .map(|groups| groups.len())
            .unwrap_or_default()
    }

    /// Close every group and flush the shared store
    pub fn close(&self) -> QueueResult<()> {
        let _guard = self.lock_creation()?;
        let groups: Vec<_> = self.write_groups()?.drain().collect();
        for (_, group) in groups {
            group.close()?;
        }
        self.db.flush()?;
        Ok(())
    }

    fn persisted_names(&self) -> QueueResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.db.scan_prefix(CURSOR_PREFIX) {
            let (key, _) = entry?;
            let name = key
                .strip_prefix(CURSOR_PREFIX.as_bytes())
                .map(|raw| String::from_utf8_lossy(raw).into_owned())
                .unwrap_or_default();
            // written by something else; not ours to serve
            if validate_group_name(&name).is_ok() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn lock_creation(&self) -> QueueResult<MutexGuard<'_, ()>> {
        handle_mutex_poison(self.create_lock.lock(), |message| QueueError::Poisoned {
            message,
        })
    }

    fn lookup(&self, name: &str) -> QueueResult<Option<Arc<ConsumerGroup>>> {
        Ok(self.read_groups()?.get(name).cloned())
    }

    fn read_groups(
        &self,
    ) -> QueueResult<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<ConsumerGroup>>>> {
        handle_rwlock_read(self.groups.read(), |message| QueueError::Poisoned {
            message,
        })
    }

    fn write_groups(
        &self,
    ) -> QueueResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<ConsumerGroup>>>> {
        handle_rwlock_write(self.groups.write(), |message| QueueError::Poisoned {
            message,
        })
    }
}

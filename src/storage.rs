// Manages the on-disk subscriber list.
//
// Every operation takes an exclusive lock on a sidecar `.lock` file, reads the
// whole list, and (for writes) replaces it through a temp file + rename. That
// makes each add/remove/list individually atomic across tasks and processes.
use crate::context::AppContext;
use crate::error::StoreError;
use crate::store::{SubscriberId, SubscriberRegistry, normalize_id};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUBSCRIBERS_FILENAME: &str = "subscribers.json";

// Increment this when changing the on-disk layout.
// - v1: { version, subscribers: [..] }
const SUBSCRIBER_STORAGE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Default)]
struct SubscriberFileData {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    subscribers: BTreeSet<SubscriberId>,
}

/// Accepted file shapes. A bare array is what a hand-written file looks like.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Versioned(SubscriberFileData),
    Bare(BTreeSet<SubscriberId>),
}

pub struct LocalStorage;

impl LocalStorage {
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive lock tied to `file_path`.
    pub fn with_lock<F, T, E>(file_path: &Path, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<std::io::Error>,
    {
        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
        path: P,
        contents: C,
    ) -> std::io::Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}

/// JSON-file backed subscriber registry.
#[derive(Debug, Clone)]
pub struct FileSubscriberStore {
    path: PathBuf,
}

impl FileSubscriberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the context's default location.
    pub fn open(ctx: &dyn AppContext) -> anyhow::Result<Self> {
        Ok(Self::new(ctx.get_subscribers_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file without locking. Callers hold the lock.
    fn load_internal(path: &Path) -> Result<BTreeSet<SubscriberId>, StoreError> {
        if !path.exists() {
            return Ok(BTreeSet::new());
        }
        let json = fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Ok(BTreeSet::new());
        }
        match serde_json::from_str::<OnDisk>(&json)? {
            OnDisk::Versioned(data) => {
                if data.version > SUBSCRIBER_STORAGE_VERSION {
                    log::warn!(
                        "{} was written by a newer version (v{}); reading it as v{}",
                        path.display(),
                        data.version,
                        SUBSCRIBER_STORAGE_VERSION
                    );
                }
                Ok(data.subscribers)
            }
            OnDisk::Bare(ids) => Ok(ids),
        }
    }

    fn save_internal(path: &Path, subscribers: BTreeSet<SubscriberId>) -> Result<(), StoreError> {
        let data = SubscriberFileData {
            version: SUBSCRIBER_STORAGE_VERSION,
            subscribers,
        };
        let json = serde_json::to_string_pretty(&data)?;
        LocalStorage::atomic_write(path, json)?;
        Ok(())
    }

    /// Lock, load, apply `f`, and persist only when `f` reports a change.
    fn modify<F>(&self, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut BTreeSet<SubscriberId>) -> bool,
    {
        LocalStorage::with_lock(&self.path, || {
            let mut ids = Self::load_internal(&self.path)?;
            let changed = f(&mut ids);
            if changed {
                Self::save_internal(&self.path, ids)?;
            }
            Ok(changed)
        })
    }
}

impl SubscriberRegistry for FileSubscriberStore {
    fn add(&self, id: &str) -> Result<bool, StoreError> {
        let id = normalize_id(id)?;
        let added = self.modify(|ids| ids.insert(id.to_string()))?;
        if added {
            log::info!("Subscriber {} added", id);
        }
        Ok(added)
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let id = normalize_id(id)?;
        let removed = self.modify(|ids| ids.remove(id))?;
        if removed {
            log::info!("Subscriber {} removed", id);
        }
        Ok(removed)
    }

    fn list_active(&self) -> Result<BTreeSet<SubscriberId>, StoreError> {
        LocalStorage::with_lock(&self.path, || Self::load_internal(&self.path))
    }
}

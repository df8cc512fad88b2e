// File: src/store.rs
// The set of active subscribers, as seen by the scheduler.
use crate::error::StoreError;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

/// Opaque destination identifier (a chat id for the Telegram notifier).
pub type SubscriberId = String;

/// Persistent set of subscriber ids.
///
/// Every call is individually atomic. `add` and `remove` are idempotent and
/// report whether the set actually changed.
pub trait SubscriberRegistry: Send + Sync + std::fmt::Debug {
    fn add(&self, id: &str) -> Result<bool, StoreError>;
    fn remove(&self, id: &str) -> Result<bool, StoreError>;
    fn list_active(&self) -> Result<BTreeSet<SubscriberId>, StoreError>;
}

/// Trims `id` and rejects values that cannot be a destination.
pub fn normalize_id(id: &str) -> Result<&str, StoreError> {
    let id = id.trim();
    if id.is_empty() || id.chars().any(char::is_control) {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(id)
}

#[derive(Debug, Default)]
pub struct MemorySubscriberStore {
    ids: Mutex<BTreeSet<SubscriberId>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SubscriberId>,
    {
        Self {
            ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl SubscriberRegistry for MemorySubscriberStore {
    fn add(&self, id: &str) -> Result<bool, StoreError> {
        let id = normalize_id(id)?;
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.insert(id.to_string()))
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let id = normalize_id(id)?;
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.remove(id))
    }

    fn list_active(&self) -> Result<BTreeSet<SubscriberId>, StoreError> {
        let ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.clone())
    }
}

//! Progress persistence contract.
//!
//! A `ProgressStore` holds exactly one `SchedulingState` per (user, item) pair.
//! Review submission goes through `update`, which must read, transform and write
//! a key as a single atomic step so that concurrent reviews of the same item
//! cannot lose a transition.

use crate::scheduler::SchedulingState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Compound key addressing one user's progress on one item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressKey {
    pub user_id: String,
    pub item_id: String,
}

impl ProgressKey {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.item_id)
    }
}

/// Persistence failure
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A stored timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// A lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::SystemIoFailure
                    | rusqlite::ErrorCode::DiskFull
            ),
            StoreError::Unavailable(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable holder of scheduling state, keyed by (user, item)
pub trait ProgressStore: Send + Sync {
    /// Current state for a key, if the item was ever reviewed
    fn get(&self, key: &ProgressKey) -> Result<Option<SchedulingState>>;

    /// Overwrite the state for a key
    fn set(&self, key: &ProgressKey, state: &SchedulingState) -> Result<()>;

    /// Atomically read the state for `key`, pass it to `f`, and store what `f`
    /// returns. Returns the stored state. `f` runs exactly once whenever this
    /// returns `Ok`.
    fn update(
        &self,
        key: &ProgressKey,
        f: &mut dyn FnMut(Option<SchedulingState>) -> SchedulingState,
    ) -> Result<SchedulingState>;

    /// Keys of a user's items whose next review date is at or before `now`
    fn due_keys(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ProgressKey>>;

    /// Every state stored for a user
    fn states_for_user(&self, user_id: &str) -> Result<Vec<SchedulingState>>;
}

/// Process-local store, used in tests and for ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<ProgressKey, SchedulingState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ProgressKey, SchedulingState>>> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &ProgressKey) -> Result<Option<SchedulingState>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &ProgressKey, state: &SchedulingState) -> Result<()> {
        self.lock()?.insert(key.clone(), state.clone());
        Ok(())
    }

    fn update(
        &self,
        key: &ProgressKey,
        f: &mut dyn FnMut(Option<SchedulingState>) -> SchedulingState,
    ) -> Result<SchedulingState> {
        let mut entries = self.lock()?;
        let next = f(entries.get(key).cloned());
        entries.insert(key.clone(), next.clone());
        Ok(next)
    }

    fn due_keys(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ProgressKey>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(key, state)| key.user_id == user_id && state.is_due(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn states_for_user(&self, user_id: &str) -> Result<Vec<SchedulingState>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(_, state)| state.clone())
            .collect())
    }
}

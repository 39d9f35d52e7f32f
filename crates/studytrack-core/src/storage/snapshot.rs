//! Persistence helpers binding a store to one timer's key.
//!
//! Writes are one-shot and best-effort: a failing store is logged and
//! otherwise ignored, leaving the timer to run in memory.

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::kv::KvStore;
use crate::error::TimerError;
use crate::timer::TimerState;

#[derive(Clone)]
pub struct TimerStore {
    store: Rc<dyn KvStore>,
    key: String,
}

impl std::fmt::Debug for TimerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerStore").field("key", &self.key).finish()
    }
}

impl TimerStore {
    pub fn new(store: Rc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Same backing store, key `<key>:<suffix>`.
    pub fn scoped(&self, suffix: &str) -> Self {
        Self {
            store: Rc::clone(&self.store),
            key: format!("{}:{suffix}", self.key),
        }
    }

    /// Read the persisted snapshot.
    ///
    /// Store failures read as "nothing persisted". A value that is present
    /// but unparseable is returned as `InvalidState` so the caller can
    /// discard it.
    pub fn load_state(&self) -> Result<Option<TimerState>, TimerError> {
        match self.read() {
            Some(raw) => TimerState::from_json(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn save_state(&self, state: &TimerState) {
        self.save_json(state);
    }

    pub fn load_json<T: DeserializeOwned>(&self) -> Option<T> {
        let raw = self.read()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "ignoring malformed persisted value");
                None
            }
        }
    }

    pub fn save_json<T: Serialize>(&self, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to encode persisted value");
                return;
            }
        };
        if let Err(err) = self.store.set(&self.key, &json) {
            tracing::warn!(key = %self.key, error = %err, "failed to persist value");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %err, "failed to clear persisted value");
        }
    }

    fn read(&self) -> Option<String> {
        match self.store.get(&self.key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read persisted value");
                None
            }
        }
    }
}

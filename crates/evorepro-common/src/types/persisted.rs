//! PersistedData - generic key-value data that travels with checkpoints
//!
//! Components that must survive a restart (the archive, the genome id
//! allocator) store a JSON snapshot of themselves here under a fixed key.
//! Values are kept as [`serde_json::Value`] so a checkpoint can carry entries
//! whose Rust type is only known to the component that owns them.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CheckpointError, Result};

/// String-keyed store of persisted component state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedData {
    entries: BTreeMap<String, serde_json::Value>,
}

impl PersistedData {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether an entry exists under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Decode the entry stored under `key`
    ///
    /// Returns `Ok(None)` when the key is absent and an error when the entry
    /// exists but cannot be decoded as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    CheckpointError::Corrupt {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                    .into()
                }),
            None => Ok(None),
        }
    }

    /// Encode `value` and store it under `key`, replacing any previous entry
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let encoded = serde_json::to_value(value)?;
        self.entries.insert(key.into(), encoded);
        Ok(())
    }

    /// Raw JSON entry under `key`
    pub fn raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// Iterate over stored keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been persisted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Settings persistence for Linkscope tools.
//!
//! Tuning knobs (node caps, batch windows, log capacity) are plain serde
//! structs owned by the crates they parameterize. Each one carries its
//! storage key as a [`SettingsValue`] impl, so the [`SettingsService`]
//! surface is fully typed: callers name a type, never a string, and two
//! settings can't collide on a key without colliding in code review.
//! Stores only ever see raw blobs through the [`SettingsStore`] port.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A persistable settings value with a stable storage key.
///
/// The key is the value's logical name; filesystem stores turn it into a
/// file name (`TopologyTuning::KEY = "topology"` becomes
/// `topology.json`). Values must be `Default` so a missing file always
/// has a well-defined reading.
pub trait SettingsValue: Serialize + DeserializeOwned + Default {
    /// Logical storage key. Lowercase, no path separators.
    const KEY: &'static str;
}

/// Storage port for raw settings blobs, keyed by [`SettingsValue::KEY`].
pub trait SettingsStore {
    /// Load a raw settings blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, SettingsError>;
    /// Persist a raw settings blob, replacing any previous one.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), SettingsError>;
}

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// No platform config directory could be resolved.
    #[error("no platform config directory")]
    NoConfigDir,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Typed settings access over a [`SettingsStore`].
///
/// Handles serialization and the missing-value policy; the store only
/// moves bytes.
pub struct SettingsService<S> {
    store: S,
}

impl<S> SettingsService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> SettingsService<S>
where
    S: SettingsStore,
{
    /// Load the persisted `T`, or `Ok(None)` when it was never saved.
    /// An empty blob reads as absent rather than as a parse error.
    pub fn load<T: SettingsValue>(&self) -> Result<Option<T>, SettingsError> {
        match self.store.load_raw(T::KEY) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(SettingsError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist `value` under its own key.
    pub fn save<T: SettingsValue>(&self, value: &T) -> Result<(), SettingsError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(T::KEY, &data)
    }

    /// Load `T`, falling back to `T::default()` when absent, and persist
    /// the default so the user has a file to edit on first run.
    pub fn load_or_init<T: SettingsValue>(&self) -> Result<T, SettingsError> {
        if let Some(value) = self.load()? {
            return Ok(value);
        }
        let value = T::default();
        self.save(&value)?;
        Ok(value)
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed [`SettingsStore`] for Linkscope tools (uses the
//! platform config dir).
//!
//! One JSON file per settings key. Writes go through a temp file and a
//! rename, so a crash mid-save leaves the previous file intact instead
//! of a torn blob the next load would reject.

use directories::ProjectDirs;
use linkscope_app_core::settings::{SettingsError, SettingsStore};
use std::fs;
use std::path::PathBuf;

/// Store settings as JSON files under the platform config directory.
pub struct FsSettingsStore {
    base: PathBuf,
}

impl FsSettingsStore {
    /// Create a store rooted at the user config directory
    /// (e.g., `~/.config/Linkscope`).
    pub fn new() -> Result<Self, SettingsError> {
        let proj = ProjectDirs::from("dev", "linkscope", "Linkscope")
            .ok_or(SettingsError::NoConfigDir)?;
        Self::with_base(proj.config_dir())
    }

    /// Create a store rooted at an explicit directory (tests, portable mode).
    pub fn with_base(base: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl SettingsStore for FsSettingsStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, SettingsError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(SettingsError::NotFound),
            Err(err) => Err(SettingsError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), SettingsError> {
        fs::create_dir_all(&self.base)?;
        let path = self.path_for(key);
        let staging = self.base.join(format!("{key}.json.tmp"));
        fs::write(&staging, data)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}

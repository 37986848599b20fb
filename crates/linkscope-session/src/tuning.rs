// SPDX-License-Identifier: Apache-2.0
//! Persisted tuning knobs for the session layer.

use linkscope_app_core::settings::SettingsValue;
use serde::{Deserialize, Serialize};

use crate::log::DEFAULT_LOG_CAPACITY;

/// Session layer knobs, loaded at startup alongside the topology tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Maximum retained traversal log entries.
    pub log_capacity: usize,
    /// Minimum milliseconds between chart recomputations while running.
    pub chart_resample_ms: u64,
}

impl SettingsValue for SessionTuning {
    const KEY: &'static str = "session";
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            chart_resample_ms: 200,
        }
    }
}

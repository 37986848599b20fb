// SPDX-License-Identifier: Apache-2.0
//! Persisted tuning knobs for the topology engine.
//!
//! Flat serde struct so a hand-edited config file stays forgiving: every
//! field has a default and unknown strategies simply fall back. Durations
//! are stored as integer milliseconds.

use std::time::Duration;

use linkscope_app_core::settings::SettingsValue;
use serde::{Deserialize, Serialize};

use crate::batch::{BatchPolicy, DEFAULT_MAX_BATCH, DEFAULT_MIN_BATCH, DEFAULT_SCALING_FACTOR};
use crate::ingest::{
    CapStrategy, DEFAULT_HUB_THRESHOLD, DEFAULT_MAX_FRONTIER, DEFAULT_MAX_NODES,
    DEFAULT_SAFE_SLOTS,
};

/// Which rendered-set bound to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapKind {
    /// Flat rendered-node cap.
    #[default]
    Flat,
    /// Roots + explored neighborhood + bounded fringe.
    Frontier,
}

/// Which flush scheduling to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    /// Fixed debounce window.
    #[default]
    Debounce,
    /// Volume threshold scaled by graph size, with an idle timeout.
    Adaptive,
}

/// Topology engine knobs, loaded at startup and persisted once when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyTuning {
    /// Cap strategy selector.
    pub cap_strategy: CapKind,
    /// Flat cap on rendered nodes.
    pub max_nodes: usize,
    /// Frontier: dereference-order slots rendered unconditionally.
    pub safe_slots: usize,
    /// Frontier: rendered fringe budget.
    pub max_frontier: usize,
    /// Out-degree at which a node is flagged as a hub.
    pub hub_threshold: usize,
    /// Flush policy selector.
    pub batch_policy: BatchKind,
    /// Debounce window in milliseconds.
    pub batch_window_ms: u64,
    /// Adaptive threshold floor.
    pub min_batch: usize,
    /// Adaptive threshold ceiling.
    pub max_batch: usize,
    /// Adaptive discovered-node divisor.
    pub scaling_factor: usize,
    /// Adaptive idle timeout in milliseconds.
    pub flush_timeout_ms: u64,
}

impl Default for TopologyTuning {
    fn default() -> Self {
        Self {
            cap_strategy: CapKind::Flat,
            max_nodes: DEFAULT_MAX_NODES,
            safe_slots: DEFAULT_SAFE_SLOTS,
            max_frontier: DEFAULT_MAX_FRONTIER,
            hub_threshold: DEFAULT_HUB_THRESHOLD,
            batch_policy: BatchKind::Debounce,
            batch_window_ms: 100,
            min_batch: DEFAULT_MIN_BATCH,
            max_batch: DEFAULT_MAX_BATCH,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            flush_timeout_ms: 250,
        }
    }
}

impl SettingsValue for TopologyTuning {
    const KEY: &'static str = "topology";
}

impl TopologyTuning {
    /// Resolved cap strategy.
    #[must_use]
    pub fn cap(&self) -> CapStrategy {
        match self.cap_strategy {
            CapKind::Flat => CapStrategy::FlatCap {
                max_nodes: self.max_nodes,
            },
            CapKind::Frontier => CapStrategy::Frontier {
                safe_slots: self.safe_slots,
                max_frontier: self.max_frontier,
            },
        }
    }

    /// Resolved flush policy.
    #[must_use]
    pub fn policy(&self) -> BatchPolicy {
        match self.batch_policy {
            BatchKind::Debounce => BatchPolicy::Debounce {
                window: Duration::from_millis(self.batch_window_ms),
            },
            BatchKind::Adaptive => BatchPolicy::Adaptive {
                min_batch: self.min_batch,
                max_batch: self.max_batch,
                scaling_factor: self.scaling_factor,
                flush_timeout: Duration::from_millis(self.flush_timeout_ms),
            },
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Debounced and adaptive flush scheduling for pending diffs.
//!
//! The ingestor buffers changes; this module decides *when* the buffer is
//! handed to subscribers. No wall clock is sampled here: hosts pass `now`
//! explicitly and drive [`DiffBatcher::poll`] from their own tick loop, so
//! tests can steer time without sleeping.

use std::time::{Duration, Instant};

/// Default debounce window between the first buffered change and its flush.
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(100);
/// Default adaptive threshold floor.
pub const DEFAULT_MIN_BATCH: usize = 8;
/// Default adaptive threshold ceiling.
pub const DEFAULT_MAX_BATCH: usize = 64;
/// Default divisor applied to the discovered-node total when growing the
/// adaptive threshold.
pub const DEFAULT_SCALING_FACTOR: usize = 50;
/// Default adaptive idle timeout: flush this long after the last change.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// A cancellable one-shot deadline.
#[derive(Debug, Clone, Copy)]
pub struct DebounceTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// Timer firing `window` after each (re)schedule.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm the timer if it is not already armed.
    pub fn schedule(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
    }

    /// Arm the timer, pushing back any existing deadline.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True while a deadline is armed.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// True when an armed deadline has passed.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

/// When buffered changes are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Flush a fixed window after the first buffered change; changes
    /// arriving inside the window fold into the same flush.
    Debounce {
        /// Delay between first change and flush.
        window: Duration,
    },
    /// Flush when enough changes pile up, where "enough" grows with the
    /// discovered universe, or after an idle timeout since the last change.
    Adaptive {
        /// Threshold floor.
        min_batch: usize,
        /// Threshold ceiling.
        max_batch: usize,
        /// Discovered-node divisor; larger graphs tolerate larger batches.
        scaling_factor: usize,
        /// Flush this long after the most recent change regardless of count.
        flush_timeout: Duration,
    },
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::Debounce {
            window: DEFAULT_BATCH_WINDOW,
        }
    }
}

impl BatchPolicy {
    /// Adaptive policy with the stock parameters.
    #[must_use]
    pub fn adaptive() -> Self {
        Self::Adaptive {
            min_batch: DEFAULT_MIN_BATCH,
            max_batch: DEFAULT_MAX_BATCH,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

/// Tracks buffered-change volume and tells the owner when to flush.
///
/// The owner reports changes via [`DiffBatcher::note_changes`], ticks via
/// [`DiffBatcher::poll`], and acknowledges every flush it performs with
/// [`DiffBatcher::flushed`].
#[derive(Debug)]
pub struct DiffBatcher {
    policy: BatchPolicy,
    timer: DebounceTimer,
    buffered: usize,
}

impl Default for DiffBatcher {
    fn default() -> Self {
        Self::new(BatchPolicy::default())
    }
}

impl DiffBatcher {
    /// Batcher for the given policy.
    #[must_use]
    pub fn new(policy: BatchPolicy) -> Self {
        let window = match policy {
            BatchPolicy::Debounce { window } => window,
            BatchPolicy::Adaptive { flush_timeout, .. } => flush_timeout,
        };
        Self {
            policy,
            timer: DebounceTimer::new(window),
            buffered: 0,
        }
    }

    /// Record `added` freshly buffered changes. Returns `true` when the
    /// owner should flush immediately instead of waiting for a deadline.
    pub fn note_changes(&mut self, added: usize, total_discovered: usize, now: Instant) -> bool {
        if added == 0 {
            return false;
        }
        self.buffered += added;
        match self.policy {
            BatchPolicy::Debounce { .. } => {
                self.timer.schedule(now);
                false
            }
            BatchPolicy::Adaptive {
                min_batch,
                max_batch,
                scaling_factor,
                ..
            } => {
                let threshold =
                    max_batch.min(min_batch + total_discovered / scaling_factor.max(1));
                if self.buffered >= threshold {
                    return true;
                }
                // Idle timeout counts from the most recent change.
                self.timer.reset(now);
                false
            }
        }
    }

    /// Cooperative tick. Returns `true` when a deadline has expired with
    /// changes still buffered.
    #[must_use]
    pub fn poll(&self, now: Instant) -> bool {
        self.buffered > 0 && self.timer.is_due(now)
    }

    /// Acknowledge that the owner flushed the pending diff.
    pub fn flushed(&mut self) {
        self.buffered = 0;
        self.timer.cancel();
    }

    /// Changes buffered since the last flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffered
    }
}

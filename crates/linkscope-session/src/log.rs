// SPDX-License-Identifier: Apache-2.0
//! Bounded drop-oldest trail of traversal events.

use std::collections::VecDeque;

/// Default capacity of the traversal log.
pub const DEFAULT_LOG_CAPACITY: usize = 5000;

/// Severity of a traversal log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Routine traversal progress.
    Info,
    /// Something recoverable went sideways.
    Warn,
    /// A failure that affected the query.
    Error,
}

/// One recorded traversal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Milliseconds since the owning query started.
    pub at_ms: u64,
    /// What happened.
    pub message: String,
}

/// Ring of the most recent traversal events. When full, the oldest entry
/// is dropped to make room, so a slow reader can never grow it unboundedly.
#[derive(Debug)]
pub struct TraversalLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for TraversalLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl TraversalLog {
    /// Log holding at most `capacity` entries; a zero capacity keeps one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, dropping the oldest when full.
    pub fn push<S: Into<String>>(&mut self, level: LogLevel, at_ms: u64, message: S) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            level,
            at_ms,
            message: message.into(),
        });
    }

    /// Entries in arrival order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been logged (or everything was cleared).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

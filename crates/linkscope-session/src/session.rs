// SPDX-License-Identifier: Apache-2.0
//! The per-session coordinator tying registry, metrics, and log together.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::log::{LogLevel, TraversalLog};
use crate::metrics::{MetricsRecorder, QueryMetricsSnapshot};
use crate::registry::{LoadingCallback, QueryStreamRegistry};
use crate::stream::{QueryToken, StreamError, StreamHandle};
use crate::tuning::SessionTuning;

/// Failure surfaced to the controller. By the time the caller sees this,
/// the session has already torn down the failed query and is ready for the
/// next one.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A live result stream failed mid-query.
    #[error("query stream failed: {0}")]
    Stream(#[from] StreamError),
}

/// Coordinates the lifecycle of one query session.
///
/// Owns the stream registry, the metrics recorder, and the traversal log;
/// every token-carrying entry point silently ignores stale tokens, so
/// callbacks left over from a replaced query cannot touch its successor.
#[derive(Default)]
pub struct QuerySession {
    registry: QueryStreamRegistry,
    metrics: MetricsRecorder,
    log: TraversalLog,
}

impl QuerySession {
    /// Session configured from persisted tuning.
    #[must_use]
    pub fn new(tuning: &SessionTuning) -> Self {
        Self {
            registry: QueryStreamRegistry::new(),
            metrics: MetricsRecorder::new(Duration::from_millis(tuning.chart_resample_ms)),
            log: TraversalLog::new(tuning.log_capacity),
        }
    }

    /// Install the streams of a newly issued query; any previous set is
    /// torn down first.
    pub fn register_streams(
        &mut self,
        streams: Vec<Box<dyn StreamHandle>>,
        on_loading: LoadingCallback,
    ) -> QueryToken {
        self.registry.register(streams, on_loading)
    }

    /// The query began executing.
    pub fn on_query_start(&mut self, now: Instant) {
        self.metrics.start(now);
        self.log.clear();
        self.log.push(LogLevel::Info, 0, "query started");
    }

    /// One result arrived on the stream set behind `token`. Recorded
    /// immediately; stale tokens are ignored.
    pub fn on_result_arrived(&mut self, token: QueryToken, now: Instant) {
        if !self.registry.is_live(token) {
            tracing::debug!(token = token.value(), "ignoring stale result");
            return;
        }
        self.metrics.result_arrived(now);
    }

    /// One stream of the set behind `token` ended. When the last one does,
    /// the query completes naturally.
    pub fn on_query_end(&mut self, token: QueryToken, now: Instant) {
        if self.registry.on_stream_end(token) {
            let at = self.offset_ms(now);
            self.metrics.end(now);
            self.log.push(LogLevel::Info, at, "query completed");
        }
    }

    /// A stream failed. The session resets itself (streams destroyed,
    /// metrics cancelled) and the error is handed back to the caller.
    /// Stale tokens are swallowed entirely.
    pub fn on_stream_error(
        &mut self,
        token: QueryToken,
        err: StreamError,
        now: Instant,
    ) -> Result<(), EngineError> {
        if !self.registry.is_live(token) {
            tracing::debug!(token = token.value(), error = %err, "ignoring stale stream error");
            return Ok(());
        }
        let at = self.offset_ms(now);
        self.registry.cancel();
        self.metrics.cancel(now);
        self.log
            .push(LogLevel::Error, at, format!("query failed: {err}"));
        Err(EngineError::Stream(err))
    }

    /// User-initiated stop: registry teardown, then metrics cancel.
    /// Returns `false` when there was nothing to stop.
    pub fn stop_active_query(&mut self, now: Instant) -> bool {
        if !self.registry.cancel() {
            return false;
        }
        let at = self.offset_ms(now);
        self.metrics.cancel(now);
        self.log.push(LogLevel::Info, at, "query cancelled");
        true
    }

    /// Full teardown back to a blank session: any active streams are
    /// destroyed through the registry, metrics return to `Idle` with
    /// nothing recorded, and the log is emptied. Unlike
    /// [`Self::stop_active_query`], nothing of the previous run is kept
    /// around for inspection.
    pub fn reset(&mut self) {
        self.registry.cancel();
        self.metrics.reset();
        self.log.clear();
    }

    /// Streams in the active set; zero when idle.
    #[must_use]
    pub fn active_stream_count(&self) -> usize {
        self.registry.active_len()
    }

    /// The metrics recorder, for derived readings.
    #[must_use]
    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Copy of the current metrics state.
    #[must_use]
    pub fn metrics_snapshot(&self) -> QueryMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The traversal log.
    #[must_use]
    pub fn log(&self) -> &TraversalLog {
        &self.log
    }

    /// Append a traversal event at the current query offset.
    pub fn log_event<S: Into<String>>(&mut self, level: LogLevel, message: S, now: Instant) {
        let at = self.offset_ms(now);
        self.log.push(level, at, message);
    }

    fn offset_ms(&self, now: Instant) -> u64 {
        let elapsed = self.metrics.elapsed(now).unwrap_or(Duration::ZERO);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

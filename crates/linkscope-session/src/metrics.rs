// SPDX-License-Identifier: Apache-2.0
//! Per-query result metrics: arrival times, throughput, and a resampled
//! chart series.
//!
//! The recorder is a small state machine, `Idle -> Running -> {Ended |
//! Cancelled}`, reset back to `Idle` by the next `start`. Arrivals are
//! recorded immediately and unbatched; only the derived chart series is
//! throttled, since recomputing it on every arrival would dominate hot
//! streams.

use std::time::{Duration, Instant};

/// Default minimum interval between chart recomputations while running.
pub const DEFAULT_CHART_RESAMPLE: Duration = Duration::from_millis(200);
/// Number of buckets in the resampled chart series.
pub const CHART_BUCKETS: usize = 50;

/// Lifecycle phase of the metrics recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// No query has started (or the recorder was reset).
    Idle,
    /// A query is running and accepting arrivals.
    Running,
    /// The query completed naturally.
    Ended,
    /// The query was cancelled.
    Cancelled,
}

/// One point of the cumulative-results chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPoint {
    /// Milliseconds since the query started.
    pub at_ms: u64,
    /// Results that had arrived by then.
    pub cumulative: usize,
}

/// Snapshot of the recorder's state.
///
/// `arrival_ms` is non-decreasing and always has exactly `result_count`
/// entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMetricsSnapshot {
    /// When the query started, if it has.
    pub start_time: Option<Instant>,
    /// When the query ended or was cancelled, if it has.
    pub end_time: Option<Instant>,
    /// Results recorded so far.
    pub result_count: usize,
    /// Arrival offsets in milliseconds since start.
    pub arrival_ms: Vec<u64>,
    /// True while the phase is `Running`.
    pub is_running: bool,
}

/// Records result arrivals for the current query.
#[derive(Debug)]
pub struct MetricsRecorder {
    phase: QueryPhase,
    started: Option<Instant>,
    ended: Option<Instant>,
    arrival_ms: Vec<u64>,
    chart: Vec<ChartPoint>,
    last_chart: Option<Instant>,
    resample: Duration,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_RESAMPLE)
    }
}

impl MetricsRecorder {
    /// Recorder with the given chart recompute throttle.
    #[must_use]
    pub fn new(resample: Duration) -> Self {
        Self {
            phase: QueryPhase::Idle,
            started: None,
            ended: None,
            arrival_ms: Vec::new(),
            chart: Vec::new(),
            last_chart: None,
            resample,
        }
    }

    /// Begin a fresh run, discarding any previous one.
    pub fn start(&mut self, now: Instant) {
        self.reset();
        self.phase = QueryPhase::Running;
        self.started = Some(now);
    }

    /// Record one result arrival. Ignored outside `Running`.
    pub fn result_arrived(&mut self, now: Instant) {
        if self.phase != QueryPhase::Running {
            tracing::debug!(phase = ?self.phase, "arrival outside running phase ignored");
            return;
        }
        let at = self.offset_ms(now);
        // Monotonic clock, but clamp anyway so the series never regresses.
        let at = self.arrival_ms.last().map_or(at, |&last| at.max(last));
        self.arrival_ms.push(at);
        if self
            .last_chart
            .is_none_or(|last| now.duration_since(last) >= self.resample)
        {
            self.recompute_chart(now);
        }
    }

    /// Mark natural completion; forces a final chart recompute.
    pub fn end(&mut self, now: Instant) {
        self.finish(QueryPhase::Ended, now);
    }

    /// Mark cancellation; forces a final chart recompute.
    pub fn cancel(&mut self, now: Instant) {
        self.finish(QueryPhase::Cancelled, now);
    }

    fn finish(&mut self, phase: QueryPhase, now: Instant) {
        if self.phase != QueryPhase::Running {
            return;
        }
        self.phase = phase;
        self.ended = Some(now);
        self.recompute_chart(now);
    }

    /// Back to `Idle` with everything cleared.
    pub fn reset(&mut self) {
        self.phase = QueryPhase::Idle;
        self.started = None;
        self.ended = None;
        self.arrival_ms.clear();
        self.chart.clear();
        self.last_chart = None;
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    /// Time the query has been (or was) running.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started
            .map(|started| self.ended.unwrap_or(now).duration_since(started))
    }

    /// Results per second over the elapsed time, zero before start.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self, now: Instant) -> f64 {
        let Some(elapsed) = self.elapsed(now) else {
            return 0.0;
        };
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.arrival_ms.len() as f64 / secs
    }

    /// The most recently computed chart series.
    #[must_use]
    pub fn chart_series(&self) -> &[ChartPoint] {
        &self.chart
    }

    /// Results recorded so far.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.arrival_ms.len()
    }

    /// Copy of the recorder's state.
    #[must_use]
    pub fn snapshot(&self) -> QueryMetricsSnapshot {
        QueryMetricsSnapshot {
            start_time: self.started,
            end_time: self.ended,
            result_count: self.arrival_ms.len(),
            arrival_ms: self.arrival_ms.clone(),
            is_running: self.phase == QueryPhase::Running,
        }
    }

    fn offset_ms(&self, now: Instant) -> u64 {
        let elapsed = self
            .started
            .map_or(Duration::ZERO, |started| now.duration_since(started));
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Resample the cumulative-results series over the elapsed span.
    fn recompute_chart(&mut self, now: Instant) {
        self.last_chart = Some(now);
        self.chart.clear();
        let span = self.offset_ms(self.ended.unwrap_or(now));
        if span == 0 {
            self.chart.push(ChartPoint {
                at_ms: 0,
                cumulative: self.arrival_ms.len(),
            });
            return;
        }
        let buckets = CHART_BUCKETS as u64;
        for b in 0..=buckets {
            let t = span * b / buckets;
            let cumulative = self.arrival_ms.partition_point(|&at| at <= t);
            self.chart.push(ChartPoint {
                at_ms: t,
                cumulative,
            });
        }
    }
}

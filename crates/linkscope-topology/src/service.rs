// SPDX-License-Identifier: Apache-2.0
//! The surface a rendering layer talks to: one service per query session.

use std::time::Instant;

use crate::batch::{BatchPolicy, DiffBatcher};
use crate::hub::{DiffSink, SubscriptionHub, SubscriptionId};
use crate::ingest::{CapStrategy, TopologyIngestor};
use crate::model::GraphCounts;
use crate::snapshot::TopologySnapshot;
use crate::tuning::TopologyTuning;

/// Composes ingestion, flush scheduling, and subscriber fan-out.
///
/// A new query gets a fresh service; nothing carries over between queries.
#[derive(Default)]
pub struct TopologyService {
    ingestor: TopologyIngestor,
    batcher: DiffBatcher,
    hub: SubscriptionHub,
}

impl TopologyService {
    /// Service with explicit cap, hub threshold, and flush policy.
    #[must_use]
    pub fn new(cap: CapStrategy, hub_threshold: usize, policy: BatchPolicy) -> Self {
        Self {
            ingestor: TopologyIngestor::new(cap, hub_threshold),
            batcher: DiffBatcher::new(policy),
            hub: SubscriptionHub::new(),
        }
    }

    /// Service configured from persisted tuning.
    #[must_use]
    pub fn from_tuning(tuning: &TopologyTuning) -> Self {
        Self::new(tuning.cap(), tuning.hub_threshold, tuning.policy())
    }

    /// Fold one snapshot into the canonical state and schedule (or, when
    /// the policy demands, perform) a flush.
    pub fn ingest(&mut self, snapshot: &TopologySnapshot, now: Instant) {
        let changes = self.ingestor.ingest(snapshot);
        tracing::debug!(
            changes,
            discovered = self.ingestor.discovered_node_count(),
            rendered = self.ingestor.rendered_node_count(),
            "snapshot ingested"
        );
        if self
            .batcher
            .note_changes(changes, self.ingestor.discovered_node_count(), now)
        {
            self.flush_now();
        }
    }

    /// Cooperative tick; flushes a due batch. Returns `true` when a flush
    /// happened.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.batcher.poll(now) {
            self.flush_now();
            return true;
        }
        false
    }

    /// Deliver whatever is pending immediately (query end, shutdown).
    pub fn flush_now(&mut self) {
        if self.ingestor.has_pending() {
            let diff = self.ingestor.take_pending();
            tracing::debug!(
                nodes = diff.nodes.len(),
                edges = diff.edges.len(),
                statuses = diff.statuses.len(),
                "flushing diff"
            );
            self.hub.broadcast(&diff);
        }
        self.batcher.flushed();
    }

    /// Subscribe a sink; it is hydrated with the full current state first
    /// when any state exists.
    pub fn subscribe(&mut self, sink: DiffSink) -> SubscriptionId {
        let hydration = self.ingestor.hydration_payload();
        self.hub.subscribe(sink, hydration.as_ref())
    }

    /// Remove a subscription. Returns `false` for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Discovered-universe totals (not capped by rendering).
    #[must_use]
    pub fn counts(&self) -> GraphCounts {
        self.ingestor.counts()
    }

    /// Every discovered URI, sorted.
    #[must_use]
    pub fn discovered_uris(&self) -> Vec<String> {
        self.ingestor.discovered_uris()
    }

    /// Nodes currently admitted to the rendered set.
    #[must_use]
    pub fn rendered_node_count(&self) -> usize {
        self.ingestor.rendered_node_count()
    }
}

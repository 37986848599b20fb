// SPDX-License-Identifier: Apache-2.0
//! Fan-out of graph payloads to subscribers, with late-join hydration.

use crate::model::GraphPayload;

/// Error a sink may return; delivery to siblings continues regardless.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Subscriber callback receiving each payload.
pub type DiffSink = Box<dyn FnMut(&GraphPayload) -> Result<(), SinkError>>;

/// Handle identifying one subscription.
pub type SubscriptionId = u64;

/// Ordered set of diff subscribers.
///
/// Payloads are delivered in subscription order. A sink that returns an
/// error is logged and skipped for that delivery only; it stays subscribed
/// until explicitly removed.
#[derive(Default)]
pub struct SubscriptionHub {
    sinks: Vec<(SubscriptionId, DiffSink)>,
    next_id: SubscriptionId,
}

impl SubscriptionHub {
    /// Empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink. When `hydration` is present the sink synchronously
    /// receives it before any future broadcast, so a late subscriber starts
    /// from the full current state.
    pub fn subscribe(
        &mut self,
        mut sink: DiffSink,
        hydration: Option<&GraphPayload>,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = self.next_id;
        if let Some(payload) = hydration {
            if let Err(err) = sink(payload) {
                tracing::warn!(subscription = id, error = %err, "hydration delivery failed");
            }
        }
        self.sinks.push((id, sink));
        id
    }

    /// Remove a sink. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sid, _)| *sid != id);
        self.sinks.len() != before
    }

    /// Deliver `payload` to every sink in subscription order. Empty
    /// payloads are not delivered.
    pub fn broadcast(&mut self, payload: &GraphPayload) {
        if payload.is_empty() {
            return;
        }
        for (id, sink) in &mut self.sinks {
            if let Err(err) = sink(payload) {
                tracing::warn!(subscription = *id, error = %err, "diff delivery failed");
            }
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Canonical graph state and incremental diff computation.
//!
//! [`TopologyIngestor`] exclusively owns the canonical node/edge/status
//! maps. Each call to [`TopologyIngestor::ingest`] folds one raw snapshot
//! into that state and buffers whatever changed into a pending `Append`
//! diff. Ingestion is idempotent: re-ingesting a snapshot that introduces
//! nothing new buffers nothing.
//!
//! Admission runs nodes, then edges, then statuses, so every edge endpoint
//! and status id delivered in a diff is backed by an admitted node at or
//! before that diff.

use crate::model::{
    DerefStatus, GraphCounts, GraphPayload, NodeId, NodeKind, NodeStatus, PayloadMode,
    TopologyEdge, TopologyNode,
};
use crate::snapshot::{host_of, is_metadata_uri, short_label, NodeIndex, TopologySnapshot};
use rustc_hash::{FxHashMap, FxHashSet};

/// Default rendered-node cap for the flat strategy.
pub const DEFAULT_MAX_NODES: usize = 200;
/// Default out-degree at which a node is considered a hub.
pub const DEFAULT_HUB_THRESHOLD: usize = 3;
/// Default number of unconditionally rendered dereference-order slots for
/// the frontier strategy.
pub const DEFAULT_SAFE_SLOTS: usize = 25;
/// Default budget of discovered-but-unexplored children for the frontier
/// strategy.
pub const DEFAULT_MAX_FRONTIER: usize = 150;

/// How the rendered set is bounded.
///
/// Two strategies exist in the product's history and are deliberately both
/// supported; neither is "more correct" without product input. Status
/// upgrades for already-rendered nodes are exempt from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapStrategy {
    /// Stop admitting new nodes and edges once the rendered set reaches
    /// `max_nodes`. The check runs once per ingestion, so a single burst
    /// snapshot may finish slightly above the cap.
    FlatCap {
        /// Rendered-node cap.
        max_nodes: usize,
    },
    /// Always render roots and the first `safe_slots` dereferenced nodes;
    /// render children of those "safe" nodes until `max_frontier` budget is
    /// spent, then lock frontier admission.
    Frontier {
        /// Dereference-order slots rendered unconditionally.
        safe_slots: usize,
        /// Budget of rendered not-yet-explored children.
        max_frontier: usize,
    },
}

impl Default for CapStrategy {
    fn default() -> Self {
        Self::FlatCap {
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// Owns the canonical, deduplicated graph state for one query session and
/// computes batched diffs from raw snapshots.
pub struct TopologyIngestor {
    cap: CapStrategy,
    hub_threshold: usize,
    nodes: FxHashMap<NodeId, TopologyNode>,
    edges: FxHashMap<String, TopologyEdge>,
    statuses: FxHashMap<NodeId, DerefStatus>,
    /// Dedup table: `(host, short_label)` of the keeper node.
    label_keeper: FxHashMap<(Option<String>, String), NodeId>,
    /// Duplicate index -> keeper id. Duplicates never enter `nodes`, so a
    /// reported node is never retracted later.
    aliases: FxHashMap<NodeId, NodeId>,
    /// Discovered universe, rebuilt from each snapshot's URI dictionary.
    discovered_nodes: FxHashSet<String>,
    discovered_edges: usize,
    frontier_spent: usize,
    pending: GraphPayload,
}

impl Default for TopologyIngestor {
    fn default() -> Self {
        Self::new(CapStrategy::default(), DEFAULT_HUB_THRESHOLD)
    }
}

impl TopologyIngestor {
    /// Create an ingestor with the given cap strategy and hub threshold.
    #[must_use]
    pub fn new(cap: CapStrategy, hub_threshold: usize) -> Self {
        Self {
            cap,
            hub_threshold,
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            statuses: FxHashMap::default(),
            label_keeper: FxHashMap::default(),
            aliases: FxHashMap::default(),
            discovered_nodes: FxHashSet::default(),
            discovered_edges: 0,
            frontier_spent: 0,
            pending: GraphPayload::empty(PayloadMode::Append),
        }
    }

    /// Fold one snapshot into the canonical state. Returns the number of
    /// changes buffered into the pending diff by this call.
    pub fn ingest(&mut self, snap: &TopologySnapshot) -> usize {
        let mut changes = 0;

        // Discovered-universe stats are independent of truncation: the out
        // adjacency counts every link, the URI dictionary every document.
        self.discovered_edges = snap.adjacency_out.values().map(Vec::len).sum();
        self.discovered_nodes = snap.uri_to_index.keys().cloned().collect();

        // Truncation is decided once per ingestion, before admission.
        let flat_truncated = match self.cap {
            CapStrategy::FlatCap { max_nodes } => self.nodes.len() >= max_nodes,
            CapStrategy::Frontier { .. } => false,
        };
        let safe: FxHashSet<NodeIndex> = match self.cap {
            CapStrategy::Frontier { safe_slots, .. } => snap
                .dereference_order
                .iter()
                .take(safe_slots)
                .copied()
                .collect(),
            CapStrategy::FlatCap { .. } => FxHashSet::default(),
        };

        changes += self.admit_nodes(snap, flat_truncated, &safe);
        if !flat_truncated {
            changes += self.admit_edges(snap);
        }
        changes += self.upgrade_statuses(snap);

        changes
    }

    /// Node admission. Runs before edges and statuses so every edge
    /// endpoint and status id resolves against the canonical set.
    fn admit_nodes(
        &mut self,
        snap: &TopologySnapshot,
        flat_truncated: bool,
        safe: &FxHashSet<NodeIndex>,
    ) -> usize {
        let mut changes = 0;
        let mut indices: Vec<NodeIndex> = snap.index_to_uri.keys().copied().collect();
        indices.sort_unstable();

        for idx in indices {
            let Some(uri) = snap.uri_of(idx) else { continue };
            if is_metadata_uri(uri) {
                continue;
            }
            let id = idx.to_string();
            if self.nodes.contains_key(&id) || self.aliases.contains_key(&id) {
                continue;
            }

            // Dedup before cap accounting: a duplicate of an existing
            // keeper is the same logical resource rediscovered under a new
            // index, so it costs no budget and is aliased even while
            // truncated (its later edges and statuses flow to the keeper).
            let label = short_label(uri);
            let key = (host_of(uri), label.clone());
            if let Some(keeper) = self.label_keeper.get(&key) {
                self.aliases.insert(id, keeper.clone());
                continue;
            }

            let is_root = snap.parents_of(idx).is_empty();
            if !self.admit_under_cap(snap, idx, is_root, flat_truncated, safe) {
                continue;
            }

            let node = TopologyNode {
                id: id.clone(),
                label: uri.to_string(),
                short_label: label,
                kind: if is_root { NodeKind::Root } else { NodeKind::Node },
            };
            self.label_keeper.insert(key, id.clone());
            self.nodes.insert(id.clone(), node.clone());
            self.pending.nodes.push(node);
            changes += 1;
        }
        changes
    }

    fn admit_under_cap(
        &mut self,
        snap: &TopologySnapshot,
        idx: NodeIndex,
        is_root: bool,
        flat_truncated: bool,
        safe: &FxHashSet<NodeIndex>,
    ) -> bool {
        match self.cap {
            CapStrategy::FlatCap { .. } => !flat_truncated,
            CapStrategy::Frontier { max_frontier, .. } => {
                if is_root || safe.contains(&idx) {
                    return true;
                }
                // Frontier: a child of the seed or of the explored
                // neighborhood, paid for from a bounded fringe budget.
                let parent_is_safe = snap
                    .parents_of(idx)
                    .iter()
                    .any(|p| safe.contains(p) || snap.parents_of(*p).is_empty());
                if parent_is_safe && self.frontier_spent < max_frontier {
                    self.frontier_spent += 1;
                    return true;
                }
                false
            }
        }
    }

    fn admit_edges(&mut self, snap: &TopologySnapshot) -> usize {
        let mut changes = 0;
        let mut sources: Vec<NodeIndex> = snap.adjacency_out.keys().copied().collect();
        sources.sort_unstable();

        for src in sources {
            let src_id = self.resolve_index(src);
            if !self.nodes.contains_key(&src_id) {
                continue;
            }
            for &tgt in snap.children_of(src) {
                if snap.uri_of(tgt).is_some_and(is_metadata_uri) {
                    continue;
                }
                let tgt_id = self.resolve_index(tgt);
                if !self.nodes.contains_key(&tgt_id) {
                    continue;
                }
                // Rewired duplicates must not produce keeper self-loops.
                if src_id == tgt_id {
                    continue;
                }
                let edge = TopologyEdge::between(&src_id, &tgt_id);
                if self.edges.contains_key(&edge.id) {
                    continue;
                }
                self.edges.insert(edge.id.clone(), edge.clone());
                self.pending.edges.push(edge);
                changes += 1;
            }
        }
        changes
    }

    /// Status transitions are exempt from truncation: a node admitted
    /// before the cap was reached can still be upgraded.
    fn upgrade_statuses(&mut self, snap: &TopologySnapshot) -> usize {
        let mut changes = 0;

        for &idx in &snap.dereference_order {
            let id = self.resolve_index(idx);
            if !self.nodes.contains_key(&id) {
                continue;
            }
            if self.statuses.get(&id) != Some(&DerefStatus::Dereferenced) {
                self.statuses.insert(id.clone(), DerefStatus::Dereferenced);
                self.pending.statuses.push(NodeStatus {
                    id,
                    status: DerefStatus::Dereferenced,
                });
                changes += 1;
            }
        }

        let mut sources: Vec<NodeIndex> = snap.adjacency_out.keys().copied().collect();
        sources.sort_unstable();
        for idx in sources {
            if snap.children_of(idx).len() < self.hub_threshold {
                continue;
            }
            let id = self.resolve_index(idx);
            if !self.nodes.contains_key(&id) || self.statuses.contains_key(&id) {
                continue;
            }
            self.statuses.insert(id.clone(), DerefStatus::Hub);
            self.pending.statuses.push(NodeStatus {
                id,
                status: DerefStatus::Hub,
            });
            changes += 1;
        }

        changes
    }

    fn resolve_index(&self, idx: NodeIndex) -> NodeId {
        let id = idx.to_string();
        self.aliases.get(&id).cloned().unwrap_or(id)
    }

    /// True when a non-empty diff is waiting to be flushed.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the pending diff, leaving an empty one behind.
    pub fn take_pending(&mut self) -> GraphPayload {
        std::mem::replace(&mut self.pending, GraphPayload::empty(PayloadMode::Append))
    }

    /// Full current state as a `Replace` payload for hydration, or `None`
    /// when nothing has been admitted yet. Deterministically ordered.
    #[must_use]
    pub fn hydration_payload(&self) -> Option<GraphPayload> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut nodes: Vec<TopologyNode> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| numeric_id(&n.id));
        let mut edges: Vec<TopologyEdge> = self.edges.values().cloned().collect();
        edges.sort_by_key(|e| (numeric_id(&e.source), numeric_id(&e.target)));
        let mut statuses: Vec<NodeStatus> = self
            .statuses
            .iter()
            .map(|(id, status)| NodeStatus {
                id: id.clone(),
                status: *status,
            })
            .collect();
        statuses.sort_by_key(|s| numeric_id(&s.id));
        Some(GraphPayload {
            mode: PayloadMode::Replace,
            nodes,
            edges,
            statuses,
        })
    }

    /// Totals over the discovered universe (not the rendered subset).
    #[must_use]
    pub fn counts(&self) -> GraphCounts {
        GraphCounts {
            nodes: self.discovered_nodes.len(),
            edges: self.discovered_edges,
        }
    }

    /// Every discovered URI, sorted.
    #[must_use]
    pub fn discovered_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.discovered_nodes.iter().cloned().collect();
        uris.sort_unstable();
        uris
    }

    /// Number of nodes currently admitted to the rendered set.
    #[must_use]
    pub fn rendered_node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of discovered nodes (for adaptive batch thresholds).
    #[must_use]
    pub fn discovered_node_count(&self) -> usize {
        self.discovered_nodes.len()
    }
}

fn numeric_id(id: &str) -> u64 {
    id.parse().unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::snapshot::UpdateKind;

    fn snapshot(
        uris: &[(NodeIndex, &str)],
        edges: &[(NodeIndex, NodeIndex)],
        deref_order: &[NodeIndex],
    ) -> TopologySnapshot {
        let mut snap = TopologySnapshot::new(UpdateKind::Discover);
        for &(idx, uri) in uris {
            snap.index_to_uri.insert(idx, uri.to_string());
            snap.uri_to_index.insert(uri.to_string(), idx);
        }
        for &(src, tgt) in edges {
            snap.adjacency_out.entry(src).or_default().push(tgt);
            snap.adjacency_in.entry(tgt).or_default().push(src);
        }
        snap.dereference_order = deref_order.to_vec();
        snap
    }

    #[test]
    fn classifies_roots_by_missing_incoming_adjacency() {
        let mut ingestor = TopologyIngestor::default();
        let snap = snapshot(
            &[(0, "https://a.example/card#me"), (1, "https://a.example/posts/1")],
            &[(0, 1)],
            &[],
        );
        ingestor.ingest(&snap);

        let diff = ingestor.take_pending();
        assert_eq!(diff.nodes.len(), 2);
        assert_eq!(diff.nodes[0].kind, NodeKind::Root);
        assert_eq!(diff.nodes[1].kind, NodeKind::Node);
        assert_eq!(diff.edges.len(), 1);
        assert_eq!(diff.edges[0].id, "0->1");
    }

    #[test]
    fn reingesting_the_same_snapshot_buffers_nothing() {
        let mut ingestor = TopologyIngestor::default();
        let snap = snapshot(
            &[(0, "https://a.example/card#me"), (1, "https://a.example/posts/1")],
            &[(0, 1)],
            &[0],
        );
        assert!(ingestor.ingest(&snap) > 0);
        ingestor.take_pending();
        assert_eq!(ingestor.ingest(&snap), 0);
        assert!(!ingestor.has_pending());
    }

    #[test]
    fn metadata_uris_are_never_admitted() {
        let mut ingestor = TopologyIngestor::default();
        let snap = snapshot(
            &[(0, "https://a.example/card#me"), (1, "https://a.example/posts.meta")],
            &[(0, 1)],
            &[],
        );
        ingestor.ingest(&snap);
        let diff = ingestor.take_pending();
        assert_eq!(diff.nodes.len(), 1);
        assert!(diff.edges.is_empty());
    }

    #[test]
    fn flat_cap_blocks_new_nodes_but_not_status_upgrades() {
        let mut ingestor = TopologyIngestor::new(CapStrategy::FlatCap { max_nodes: 2 }, 3);
        let first = snapshot(
            &[(0, "https://a.example/zero"), (1, "https://a.example/one")],
            &[(0, 1)],
            &[],
        );
        ingestor.ingest(&first);
        ingestor.take_pending();
        assert_eq!(ingestor.rendered_node_count(), 2);

        // Cap reached: the new node and its edge must not surface, but the
        // dereference of an already-rendered node must.
        let second = snapshot(
            &[
                (0, "https://a.example/zero"),
                (1, "https://a.example/one"),
                (2, "https://a.example/two"),
            ],
            &[(0, 1), (1, 2)],
            &[0],
        );
        ingestor.ingest(&second);
        let diff = ingestor.take_pending();
        assert!(diff.nodes.is_empty());
        assert!(diff.edges.is_empty());
        assert_eq!(diff.statuses.len(), 1);
        assert_eq!(diff.statuses[0].id, "0");
        assert_eq!(diff.statuses[0].status, DerefStatus::Dereferenced);

        // Discovered totals keep counting past the cap.
        assert_eq!(ingestor.counts().nodes, 3);
        assert_eq!(ingestor.counts().edges, 2);
    }

    #[test]
    fn frontier_cap_admits_roots_safe_nodes_and_bounded_fringe() {
        let mut ingestor = TopologyIngestor::new(
            CapStrategy::Frontier {
                safe_slots: 1,
                max_frontier: 1,
            },
            3,
        );
        // Root 0 -> {1, 2, 3}; only node 1 is dereferenced (safe).
        let snap = snapshot(
            &[
                (0, "https://a.example/root"),
                (1, "https://a.example/one"),
                (2, "https://a.example/two"),
                (3, "https://a.example/three"),
            ],
            &[(0, 1), (0, 2), (0, 3)],
            &[1],
        );
        ingestor.ingest(&snap);
        let diff = ingestor.take_pending();

        // Root always; node 1 via safe slot; exactly one of {2, 3} from the
        // frontier budget (index order makes it node 2).
        let ids: Vec<&str> = diff.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);

        // Later snapshots cannot grow the fringe once the budget is spent.
        let grown = snapshot(
            &[
                (0, "https://a.example/root"),
                (1, "https://a.example/one"),
                (2, "https://a.example/two"),
                (3, "https://a.example/three"),
                (4, "https://a.example/four"),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4)],
            &[1],
        );
        ingestor.ingest(&grown);
        let diff = ingestor.take_pending();
        assert!(diff.nodes.is_empty());
    }

    #[test]
    fn duplicate_labels_alias_to_the_keeper_and_rewire_edges() {
        let mut ingestor = TopologyIngestor::default();
        // Indices 1 and 2 decode to the same label on the same host; 2 is
        // the duplicate. Edge 0->2 must surface as 0->1.
        let snap = snapshot(
            &[
                (0, "https://a.example/card#me"),
                (1, "https://a.example/posts/1"),
                (2, "https://a.example/posts%2F1"),
            ],
            &[(0, 1), (0, 2)],
            &[],
        );
        ingestor.ingest(&snap);
        let diff = ingestor.take_pending();

        let labels: Vec<&str> = diff.nodes.iter().map(|n| n.short_label.as_str()).collect();
        assert_eq!(labels, vec!["/card#me", "/posts/1"]);
        assert_eq!(diff.edges.len(), 1);
        assert_eq!(diff.edges[0].id, "0->1");

        // Dereferencing the duplicate index upgrades the keeper.
        let deref = snapshot(
            &[
                (0, "https://a.example/card#me"),
                (1, "https://a.example/posts/1"),
                (2, "https://a.example/posts%2F1"),
            ],
            &[(0, 1), (0, 2)],
            &[2],
        );
        ingestor.ingest(&deref);
        let diff = ingestor.take_pending();
        assert_eq!(diff.statuses.len(), 1);
        assert_eq!(diff.statuses[0].id, "1");
    }

    #[test]
    fn identical_paths_on_distinct_hosts_do_not_merge() {
        let mut ingestor = TopologyIngestor::default();
        let snap = snapshot(
            &[
                (0, "https://a.example/profile/card"),
                (1, "https://b.example/profile/card"),
            ],
            &[],
            &[],
        );
        ingestor.ingest(&snap);
        let diff = ingestor.take_pending();
        assert_eq!(diff.nodes.len(), 2);
    }

    #[test]
    fn duplicate_rewiring_never_creates_self_loops() {
        let mut ingestor = TopologyIngestor::default();
        // 1 and 2 are duplicates; the link 1->2 would become 1->1.
        let snap = snapshot(
            &[
                (1, "https://a.example/posts/1"),
                (2, "https://a.example/posts%2F1"),
            ],
            &[(1, 2)],
            &[],
        );
        ingestor.ingest(&snap);
        let diff = ingestor.take_pending();
        assert_eq!(diff.nodes.len(), 1);
        assert!(diff.edges.is_empty());
    }

    #[test]
    fn hub_status_set_at_threshold_and_superseded_by_dereference() {
        let mut ingestor = TopologyIngestor::new(CapStrategy::default(), 2);
        let snap = snapshot(
            &[
                (0, "https://a.example/hub"),
                (1, "https://a.example/one"),
                (2, "https://a.example/two"),
            ],
            &[(0, 1), (0, 2)],
            &[],
        );
        ingestor.ingest(&snap);
        let diff = ingestor.take_pending();
        assert_eq!(diff.statuses.len(), 1);
        assert_eq!(diff.statuses[0].status, DerefStatus::Hub);

        // Dereference wins and never reverts.
        let mut deref = snap.clone();
        deref.dereference_order = vec![0];
        ingestor.ingest(&deref);
        let diff = ingestor.take_pending();
        assert_eq!(diff.statuses.len(), 1);
        assert_eq!(diff.statuses[0].status, DerefStatus::Dereferenced);

        ingestor.ingest(&deref);
        assert!(!ingestor.has_pending());
    }

    #[test]
    fn hydration_contains_the_union_of_all_diffs() {
        let mut ingestor = TopologyIngestor::default();
        let first = snapshot(
            &[(0, "https://a.example/card#me"), (1, "https://a.example/posts/1")],
            &[(0, 1)],
            &[],
        );
        ingestor.ingest(&first);
        let d1 = ingestor.take_pending();

        let second = snapshot(
            &[
                (0, "https://a.example/card#me"),
                (1, "https://a.example/posts/1"),
                (2, "https://a.example/posts/2"),
            ],
            &[(0, 1), (1, 2)],
            &[0],
        );
        ingestor.ingest(&second);
        let d2 = ingestor.take_pending();

        let hydration = ingestor.hydration_payload().unwrap();
        assert_eq!(hydration.mode, PayloadMode::Replace);
        assert_eq!(hydration.nodes.len(), d1.nodes.len() + d2.nodes.len());
        assert_eq!(hydration.edges.len(), d1.edges.len() + d2.edges.len());
        assert_eq!(
            hydration.statuses.len(),
            d1.statuses.len() + d2.statuses.len()
        );

        // Self-consistency: every edge endpoint and status id is a node.
        let ids: FxHashSet<&str> = hydration.nodes.iter().map(|n| n.id.as_str()).collect();
        for edge in &hydration.edges {
            assert!(ids.contains(edge.source.as_str()));
            assert!(ids.contains(edge.target.as_str()));
        }
        for status in &hydration.statuses {
            assert!(ids.contains(status.id.as_str()));
        }
    }

    #[test]
    fn hydration_is_none_before_any_admission() {
        let ingestor = TopologyIngestor::default();
        assert!(ingestor.hydration_payload().is_none());
    }
}

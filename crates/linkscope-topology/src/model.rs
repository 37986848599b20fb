// SPDX-License-Identifier: Apache-2.0
//! Canonical render-ready graph entities and the diff payloads built from
//! them. Pure data with serde derive, shared between the ingestion engine
//! and whatever paints the graph.

use serde::{Deserialize, Serialize};

/// Stable identity of a rendered node: the decimal string form of its
/// snapshot index.
pub type NodeId = String;

/// Node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A seed document: no incoming adjacency when admitted.
    Root,
    /// Any other discovered document.
    Node,
}

/// Renderable node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Stable identifier.
    pub id: NodeId,
    /// Full document URI.
    pub label: String,
    /// Human-readable label (decoded path, or hostname).
    pub short_label: String,
    /// Node classification.
    pub kind: NodeKind,
}

/// Renderable edge. Identity is derived from its endpoints, which makes
/// edge dedup idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEdge {
    /// Derived identifier, `"<source>-><target>"`.
    pub id: String,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
}

impl TopologyEdge {
    /// Build an edge between two admitted nodes; the id is derived.
    #[must_use]
    pub fn between(source: &str, target: &str) -> Self {
        Self {
            id: format!("{source}->{target}"),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// Fetch status of a rendered node. Monotonic: once `Dereferenced`, a node
/// never reverts; `Hub` may still upgrade to `Dereferenced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerefStatus {
    /// The document behind this node has been fully fetched.
    Dereferenced,
    /// The node links out to many documents (high out-degree).
    Hub,
}

/// Status record delivered in diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Node the status applies to.
    pub id: NodeId,
    /// Current status.
    pub status: DerefStatus,
}

/// How a payload's contents relate to what the subscriber already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadMode {
    /// The entire known state; used to hydrate new subscribers.
    Replace,
    /// Only what changed since the last flush.
    Append,
}

/// One delivery to subscribers: nodes, then edges, then statuses.
///
/// Self-consistency invariant: within a `Replace` payload every edge
/// endpoint and every status id appears in `nodes`; within an `Append`
/// payload they appear in `nodes` or in some earlier delivered payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPayload {
    /// Replace or append semantics.
    pub mode: PayloadMode,
    /// Newly admitted (or, for `Replace`, all) nodes.
    pub nodes: Vec<TopologyNode>,
    /// Newly admitted (or all) edges.
    pub edges: Vec<TopologyEdge>,
    /// Status transitions (or all current statuses).
    pub statuses: Vec<NodeStatus>,
}

impl GraphPayload {
    /// Empty payload with the given mode.
    #[must_use]
    pub fn empty(mode: PayloadMode) -> Self {
        Self {
            mode,
            nodes: Vec::new(),
            edges: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// True when the payload carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.statuses.is_empty()
    }
}

/// Totals over the *discovered* universe, independent of any rendering cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    /// Every URI the tracker has seen.
    pub nodes: usize,
    /// Every link the tracker has seen.
    pub edges: usize,
}

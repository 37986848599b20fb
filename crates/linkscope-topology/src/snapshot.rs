// SPDX-License-Identifier: Apache-2.0
//! Raw topology snapshots as emitted by the external traversal tracker.
//!
//! Snapshots are passive value types: the tracker owns them, the ingestor
//! reads them once per emission and never mutates them. Missing adjacency
//! entries read as empty lists so a sparse or malformed snapshot can never
//! fault the ingestion path.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Index assigned to a document by the traversal tracker.
pub type NodeIndex = u32;

/// Whether a snapshot was emitted for a discovery or a dereference event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// A new document or link entered the topology.
    Discover,
    /// A previously discovered document finished fetching.
    Dereference,
}

/// Point-in-time description of everything the traversal engine has
/// discovered so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// What triggered this emission.
    pub update_kind: UpdateKind,
    /// Incoming adjacency: node index to the indices linking to it.
    pub adjacency_in: FxHashMap<NodeIndex, Vec<NodeIndex>>,
    /// Outgoing adjacency: node index to the indices it links to.
    pub adjacency_out: FxHashMap<NodeIndex, Vec<NodeIndex>>,
    /// Index to document URI.
    pub index_to_uri: FxHashMap<NodeIndex, String>,
    /// Document URI to index.
    pub uri_to_index: FxHashMap<String, NodeIndex>,
    /// Node indices in the order they were fully fetched.
    pub dereference_order: Vec<NodeIndex>,
    /// Child endpoint of the most recently discovered link, if any.
    pub child_node: Option<NodeIndex>,
    /// Parent endpoint of the most recently discovered link, if any.
    pub parent_node: Option<NodeIndex>,
}

impl TopologySnapshot {
    /// Empty snapshot for the given update kind.
    #[must_use]
    pub fn new(update_kind: UpdateKind) -> Self {
        Self {
            update_kind,
            adjacency_in: FxHashMap::default(),
            adjacency_out: FxHashMap::default(),
            index_to_uri: FxHashMap::default(),
            uri_to_index: FxHashMap::default(),
            dereference_order: Vec::new(),
            child_node: None,
            parent_node: None,
        }
    }

    /// Indices linking to `node`. Absent entries read as empty.
    #[must_use]
    pub fn parents_of(&self, node: NodeIndex) -> &[NodeIndex] {
        self.adjacency_in.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Indices `node` links to. Absent entries read as empty.
    #[must_use]
    pub fn children_of(&self, node: NodeIndex) -> &[NodeIndex] {
        self.adjacency_out.get(&node).map_or(&[], Vec::as_slice)
    }

    /// URI recorded for `node`, if the dictionary knows it.
    #[must_use]
    pub fn uri_of(&self, node: NodeIndex) -> Option<&str> {
        self.index_to_uri.get(&node).map(String::as_str)
    }
}

/// Suffix marking auxiliary metadata documents; never admitted to the graph.
pub const METADATA_SUFFIX: &str = ".meta";

/// True when `uri` names a metadata document.
#[must_use]
pub fn is_metadata_uri(uri: &str) -> bool {
    uri.ends_with(METADATA_SUFFIX)
}

/// Human-readable label for a document URI.
///
/// Path + query + fragment, percent-decoded; the hostname when the path is
/// empty or `/`; the raw input when it does not parse as a URL at all.
#[must_use]
pub fn short_label(uri: &str) -> String {
    let Ok(parsed) = url::Url::parse(uri) else {
        return uri.to_string();
    };
    let mut label = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        label.push('?');
        label.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        label.push('#');
        label.push_str(fragment);
    }
    if label.is_empty() || label == "/" {
        return parsed.host_str().unwrap_or(uri).to_string();
    }
    match percent_encoding::percent_decode_str(&label).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => label,
    }
}

/// Host component of `uri`, when it parses.
#[must_use]
pub fn host_of(uri: &str) -> Option<String> {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.host_str().map(ToOwned::to_owned))
}

// SPDX-License-Identifier: Apache-2.0
//! Traversal engine handle and a deterministic scripted double.
//!
//! The engine is an explicit handle owned by the controller and passed
//! into every query call, never a process-wide singleton. The console only
//! ships the mock; a real link-traversal backend implements the same trait.

use linkscope_session::{StreamError, StreamHandle};
use linkscope_topology::{NodeIndex, TopologySnapshot, UpdateKind};

/// One scripted emission during query execution.
#[derive(Debug, Clone)]
pub enum TraversalEvent {
    /// The traversal tracker emitted a fresh topology snapshot.
    Topology(TopologySnapshot),
    /// One bindings row arrived on the result stream.
    Binding,
    /// The result stream ended.
    End,
}

/// Everything one query execution hands back to the controller.
pub struct QueryExecution {
    /// Live stream handles to register with the session.
    pub streams: Vec<Box<dyn StreamHandle>>,
    /// Emissions in the order the engine produces them.
    pub events: Vec<TraversalEvent>,
}

/// A link-traversal query engine.
pub trait TraversalEngine {
    /// Execute `query`, returning the streams and scripted emissions.
    fn execute(&mut self, query: &str) -> QueryExecution;
}

/// Stream double that tolerates exactly one teardown.
#[derive(Debug, Default)]
struct MockStream {
    destroyed: bool,
}

impl StreamHandle for MockStream {
    fn destroy(&mut self) -> Result<(), StreamError> {
        if self.destroyed {
            return Err(StreamError::AlreadyDestroyed);
        }
        self.destroyed = true;
        Ok(())
    }
}

/// Replays a fixed SolidBench-flavored pod traversal: a seed profile card,
/// its posts and comments, and a friend's pod reached through the seed.
/// No network, fully deterministic.
#[derive(Debug, Default)]
pub struct MockTraversalEngine;

impl MockTraversalEngine {
    /// Fresh engine handle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

const POD_A: &str = "https://solidbench.example/pods/00000000000000000065";
const POD_B: &str = "https://solidbench.example/pods/00000000000000000143";

struct ScriptBuilder {
    uris: Vec<(NodeIndex, String)>,
    links: Vec<(NodeIndex, NodeIndex)>,
    deref_order: Vec<NodeIndex>,
    events: Vec<TraversalEvent>,
}

impl ScriptBuilder {
    fn new() -> Self {
        Self {
            uris: Vec::new(),
            links: Vec::new(),
            deref_order: Vec::new(),
            events: Vec::new(),
        }
    }

    fn document(&mut self, idx: NodeIndex, uri: &str) -> &mut Self {
        self.uris.push((idx, uri.to_string()));
        self
    }

    fn link(&mut self, src: NodeIndex, tgt: NodeIndex) -> &mut Self {
        self.links.push((src, tgt));
        self
    }

    fn dereference(&mut self, idx: NodeIndex) -> &mut Self {
        self.deref_order.push(idx);
        self
    }

    /// Emit a snapshot of everything accumulated so far.
    fn emit(&mut self, kind: UpdateKind) -> &mut Self {
        let mut snap = TopologySnapshot::new(kind);
        for (idx, uri) in &self.uris {
            snap.index_to_uri.insert(*idx, uri.clone());
            snap.uri_to_index.insert(uri.clone(), *idx);
        }
        for &(src, tgt) in &self.links {
            snap.adjacency_out.entry(src).or_default().push(tgt);
            snap.adjacency_in.entry(tgt).or_default().push(src);
        }
        snap.dereference_order.clone_from(&self.deref_order);
        if let Some(&(src, tgt)) = self.links.last() {
            snap.parent_node = Some(src);
            snap.child_node = Some(tgt);
        }
        self.events.push(TraversalEvent::Topology(snap));
        self
    }

    fn binding(&mut self) -> &mut Self {
        self.events.push(TraversalEvent::Binding);
        self
    }

    fn finish(&mut self) -> Vec<TraversalEvent> {
        self.events.push(TraversalEvent::End);
        std::mem::take(&mut self.events)
    }
}

impl TraversalEngine for MockTraversalEngine {
    fn execute(&mut self, query: &str) -> QueryExecution {
        tracing::info!(query, "executing scripted traversal");

        let mut script = ScriptBuilder::new();
        script
            .document(0, &format!("{POD_A}/profile/card#me"))
            .emit(UpdateKind::Discover);
        script
            .document(1, &format!("{POD_A}/posts/2024-01-07"))
            .document(2, &format!("{POD_A}/posts/2024-02-19"))
            .document(3, &format!("{POD_A}/posts/2024-02-19.meta"))
            .link(0, 1)
            .link(0, 2)
            .link(0, 3)
            .dereference(0)
            .emit(UpdateKind::Dereference);
        script.binding().binding();
        script
            .document(4, &format!("{POD_A}/comments/2024-02-20"))
            .link(2, 4)
            .dereference(2)
            .emit(UpdateKind::Dereference);
        script.binding();
        script
            .document(5, &format!("{POD_B}/profile/card#me"))
            .link(0, 5)
            .link(5, 4)
            .dereference(4)
            .emit(UpdateKind::Dereference);
        script.binding();

        QueryExecution {
            streams: vec![Box::<MockStream>::default()],
            events: script.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_destroy_reports_already_destroyed() {
        let mut stream = MockStream::default();
        assert!(stream.destroy().is_ok());
        assert!(matches!(
            stream.destroy(),
            Err(StreamError::AlreadyDestroyed)
        ));
    }

    #[test]
    fn script_is_deterministic_and_ends_exactly_once() {
        let mut engine = MockTraversalEngine::new();
        let first = engine.execute("SELECT * WHERE { ?s ?p ?o }");
        let second = engine.execute("SELECT * WHERE { ?s ?p ?o }");
        assert_eq!(first.events.len(), second.events.len());

        let ends = first
            .events
            .iter()
            .filter(|e| matches!(e, TraversalEvent::End))
            .count();
        assert_eq!(ends, 1);
        assert!(matches!(first.events.last(), Some(TraversalEvent::End)));
        assert_eq!(first.streams.len(), 1);
    }

    #[test]
    fn snapshots_grow_monotonically() {
        let mut engine = MockTraversalEngine::new();
        let run = engine.execute("q");
        let mut last_nodes = 0;
        for event in &run.events {
            if let TraversalEvent::Topology(snap) = event {
                assert!(snap.index_to_uri.len() >= last_nodes);
                last_nodes = snap.index_to_uri.len();
            }
        }
        assert!(last_nodes >= 5);
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Topology ingestion and diff engine for Linkscope.
//!
//! A link-traversal query engine pushes an unbounded stream of topology
//! snapshots (documents discovered, links found, documents dereferenced)
//! while a query runs. This crate turns that stream into a bounded,
//! deduplicated, render-ready graph model: the [`ingest::TopologyIngestor`]
//! owns the canonical node/edge/status sets and buffers incremental diffs,
//! the [`batch::DiffBatcher`] collapses bursts into single flushes, and the
//! [`hub::SubscriptionHub`] replays full state to late subscribers before
//! streaming appends. [`service::TopologyService`] composes the three behind
//! the surface a rendering layer talks to.
//!
//! Everything here is single-threaded and cooperative: no entry point
//! blocks, and timing flows through explicit `Instant` parameters so hosts
//! (and tests) own the clock.

pub mod batch;
pub mod hub;
pub mod ingest;
pub mod model;
pub mod service;
pub mod snapshot;
pub mod tuning;

pub use batch::{BatchPolicy, DebounceTimer, DiffBatcher};
pub use hub::{DiffSink, SinkError, SubscriptionHub, SubscriptionId};
pub use ingest::{CapStrategy, TopologyIngestor};
pub use model::{
    DerefStatus, GraphCounts, GraphPayload, NodeKind, NodeStatus, PayloadMode, TopologyEdge,
    TopologyNode,
};
pub use service::TopologyService;
pub use snapshot::{NodeIndex, TopologySnapshot, UpdateKind};
pub use tuning::{BatchKind, CapKind, TopologyTuning};

// SPDX-License-Identifier: Apache-2.0
//! Query stream lifecycle coordination for Linkscope.
//!
//! A running query owns a set of live result streams plus the bookkeeping
//! around them: which set is current, how many results arrived and when,
//! and what the traversal reported along the way. This crate coordinates
//! that lifecycle: the [`registry::QueryStreamRegistry`] enforces the
//! at-most-one-active-set rule and hands out generation tokens, the
//! [`metrics::MetricsRecorder`] tracks arrivals and derived rates, the
//! [`log::TraversalLog`] keeps a bounded trail, and
//! [`session::QuerySession`] ties the three together behind the controller
//! surface.
//!
//! Like the topology engine, nothing here samples a clock: callers pass
//! `Instant`s in, which keeps the whole crate deterministic under test.

pub mod log;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod stream;
pub mod tuning;

pub use log::{LogEntry, LogLevel, TraversalLog};
pub use metrics::{ChartPoint, MetricsRecorder, QueryMetricsSnapshot, QueryPhase};
pub use registry::{LoadingCallback, QueryStreamRegistry};
pub use session::{EngineError, QuerySession};
pub use stream::{QueryToken, StreamError, StreamHandle};
pub use tuning::SessionTuning;

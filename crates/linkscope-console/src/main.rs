// SPDX-License-Identifier: Apache-2.0
//! Headless Linkscope demo console.
//!
//! Wires the topology engine and the query session coordinator together
//! and drives a scripted traversal end-to-end: one query to natural
//! completion, a second one demonstrating stream-set replacement, and a
//! third cancelled mid-flight.

mod engine;

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use engine::{MockTraversalEngine, QueryExecution, TraversalEngine, TraversalEvent};

use linkscope_app_core::settings::{SettingsService, SettingsValue};
use linkscope_config_fs::FsSettingsStore;
use linkscope_session::{QuerySession, QueryToken, SessionTuning};
use linkscope_topology::{TopologyService, TopologyTuning};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ConsolePrefs {
    /// Milliseconds between scripted emissions.
    tick_ms: u64,
}

impl Default for ConsolePrefs {
    fn default() -> Self {
        Self { tick_ms: 20 }
    }
}

impl SettingsValue for ConsolePrefs {
    const KEY: &'static str = "console";
}

fn load_settings<T: SettingsValue>(settings: Option<&SettingsService<FsSettingsStore>>) -> T {
    let Some(svc) = settings else {
        return T::default();
    };
    match svc.load_or_init() {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key = T::KEY, error = %err, "settings unavailable, using defaults");
            T::default()
        }
    }
}

/// Fresh topology service with a logging subscriber attached.
fn topology_service(tuning: &TopologyTuning) -> TopologyService {
    let mut topo = TopologyService::from_tuning(tuning);
    topo.subscribe(Box::new(|payload| {
        info!(
            mode = ?payload.mode,
            nodes = payload.nodes.len(),
            edges = payload.edges.len(),
            statuses = payload.statuses.len(),
            "graph payload delivered"
        );
        Ok(())
    }));
    topo
}

/// Feed scripted emissions through the engines, pacing them on tokio time.
/// Stops early after `cancel_after` events when given.
async fn drive(
    session: &mut QuerySession,
    topo: &mut TopologyService,
    token: QueryToken,
    events: Vec<TraversalEvent>,
    tick: Duration,
    cancel_after: Option<usize>,
) {
    session.on_query_start(Instant::now());
    for (step, event) in events.into_iter().enumerate() {
        if Some(step) == cancel_after {
            session.stop_active_query(Instant::now());
            topo.flush_now();
            return;
        }
        let now = Instant::now();
        match event {
            TraversalEvent::Topology(snapshot) => topo.ingest(&snapshot, now),
            TraversalEvent::Binding => session.on_result_arrived(token, now),
            TraversalEvent::End => {
                topo.flush_now();
                session.on_query_end(token, now);
            }
        }
        topo.poll(Instant::now());
        tokio::time::sleep(tick).await;
    }
    topo.poll(Instant::now());
}

fn report(label: &str, session: &QuerySession, topo: &TopologyService) {
    let now = Instant::now();
    let metrics = session.metrics_snapshot();
    let counts = topo.counts();
    info!(
        query = label,
        results = metrics.result_count,
        running = metrics.is_running,
        throughput = session.metrics().throughput(now),
        discovered_nodes = counts.nodes,
        discovered_edges = counts.edges,
        rendered_nodes = topo.rendered_node_count(),
        log_entries = session.log().len(),
        "query finished"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Settings (best-effort): defaults are persisted on first run so the
    // user has files to edit.
    let settings: Option<SettingsService<FsSettingsStore>> =
        FsSettingsStore::new().map(SettingsService::new).ok();
    let prefs: ConsolePrefs = load_settings(settings.as_ref());
    let topo_tuning: TopologyTuning = load_settings(settings.as_ref());
    let session_tuning: SessionTuning = load_settings(settings.as_ref());
    let tick = Duration::from_millis(prefs.tick_ms);

    let mut engine = MockTraversalEngine::new();
    let mut session = QuerySession::new(&session_tuning);

    // Query 1: runs to natural completion.
    let mut topo = topology_service(&topo_tuning);
    let QueryExecution { streams, events } = engine.execute("SELECT ?post WHERE { ?creator foaf:made ?post }");
    let token = session.register_streams(
        streams,
        Box::new(|loading| info!(loading, "loading state changed")),
    );
    drive(&mut session, &mut topo, token, events, tick, None).await;
    report("discover-posts", &session, &topo);

    // Query 2: registering its streams replaces (and tears down) whatever
    // query 1 left behind; a fresh topology service starts from scratch.
    let mut topo = topology_service(&topo_tuning);
    let QueryExecution { streams, events } = engine.execute("SELECT ?comment WHERE { ?post sioc:reply ?comment }");
    let token = session.register_streams(
        streams,
        Box::new(|loading| info!(loading, "loading state changed")),
    );
    drive(&mut session, &mut topo, token, events, tick, None).await;
    report("discover-comments", &session, &topo);

    // Query 3: cancelled mid-flight.
    let mut topo = topology_service(&topo_tuning);
    let QueryExecution { streams, events } = engine.execute("SELECT ?friend WHERE { ?me foaf:knows ?friend }");
    let token = session.register_streams(
        streams,
        Box::new(|loading| info!(loading, "loading state changed")),
    );
    drive(&mut session, &mut topo, token, events, tick, Some(4)).await;
    report("discover-friends", &session, &topo);

    Ok(())
}

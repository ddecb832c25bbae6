//! Fan-out of cell output and analysis results to connected clients.

use std::sync::Arc;
use std::time::Duration;

use chaos_grid_core::CellId;
use chaos_grid_orchestrator::OutputSink;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::protocol::{
    encode, AnalysisCompletedParams, CellExitedParams, CellOutputParams, Event, EVENT_ANALYSIS_COMPLETED,
    EVENT_CELL_EXITED, EVENT_CELL_OUTPUT,
};
use crate::state::DaemonState;

/// Encodes session output as protocol events on the PTY reader threads.
///
/// A single channel keeps per-cell ordering intact on the way to clients.
pub struct EventSink {
    tx: mpsc::UnboundedSender<String>,
}

impl EventSink {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, event: Event) {
        if self.tx.send(encode(&event)).is_err() {
            debug!("event pump stopped, dropping event");
        }
    }
}

impl OutputSink for EventSink {
    fn output(&self, cell_id: &CellId, data: &str) {
        self.send(Event::new(EVENT_CELL_OUTPUT, CellOutputParams { cell_id, data }));
    }

    fn exited(&self, cell_id: &CellId, exit_code: Option<i32>) {
        self.send(Event::new(EVENT_CELL_EXITED, CellExitedParams { cell_id, exit_code }));
    }
}

/// Forward encoded events to every client until the sink is dropped.
pub fn spawn_pump(mut rx: mpsc::UnboundedReceiver<String>, state: Arc<DaemonState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            state.broadcast_to_all_clients(line).await;
        }
        debug!("event pump exited");
    })
}

/// Analyze every `period` and broadcast non-empty results.
pub fn spawn_auto_analyze(state: Arc<DaemonState>, period: Duration) -> JoinHandle<()> {
    info!(period = ?period, "auto-analysis enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match state.orchestrator.analyze(None).await {
                Ok(result) if result.is_empty() => debug!("auto-analysis produced nothing"),
                Ok(result) => {
                    let event = Event::new(EVENT_ANALYSIS_COMPLETED, AnalysisCompletedParams { result: &result });
                    state.broadcast_to_all_clients(encode(&event)).await;
                }
                Err(e) => warn!(error = %e, "auto-analysis failed"),
            }
        }
    })
}

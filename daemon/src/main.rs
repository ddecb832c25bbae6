mod config;
mod connection;
mod events;
mod handlers;
mod protocol;
mod state;

use std::sync::Arc;

use chaos_grid_orchestrator::analysis::gemini_factory;
use chaos_grid_orchestrator::{LazyModelClient, NativePtyBackend, Orchestrator};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Args;
use events::EventSink;
use state::DaemonState;

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_json);

    let config = args.orchestrator_config()?;
    info!(data_dir = %config.data_dir.display(), "data directory");

    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir)?;
        info!(data_dir = %config.data_dir.display(), "created data directory");
    }

    if !args.listen.starts_with("127.") && !args.listen.starts_with("localhost") && !args.listen.starts_with("[::1]") {
        warn!(listen = %args.listen, "listening on a non-loopback address; the daemon has no client auth");
    }

    let (sink, event_rx) = EventSink::channel();
    let client = LazyModelClient::new(gemini_factory(args.model.clone()));
    let orchestrator = Orchestrator::start(config, Arc::new(NativePtyBackend), client, sink).await;

    let state = Arc::new(DaemonState::new(Arc::new(orchestrator)));
    events::spawn_pump(event_rx, state.clone());
    if let Some(period) = args.auto_analyze_interval() {
        events::spawn_auto_analyze(state.clone(), period);
    }

    let listener = TcpListener::bind(&args.listen).await?;
    info!(listen = %args.listen, "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        connection::handle_client(stream, state).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                let killed = state.orchestrator.kill_all().await;
                info!(killed = killed.len(), "shutting down");
                return Ok(());
            }
        }
    }
}

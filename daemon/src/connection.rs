use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::handlers;
use crate::protocol::{encode, ErrorResponse, Request, INVALID_PARAMS};
use crate::state::{ClientId, DaemonState};

/// Handle a single client connection
pub async fn handle_client(stream: TcpStream, state: Arc<DaemonState>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (client_id, event_rx) = state.register_client().await;
    let clients = state.client_count().await;
    info!(peer = %peer, client_id, clients, "client connected");

    let (reader, writer) = stream.into_split();
    if let Err(e) = serve(reader, writer, state.clone(), client_id, event_rx).await {
        debug!(peer = %peer, client_id, error = %e, "client error");
    }

    state.unregister_client(client_id).await;
    info!(peer = %peer, client_id, "client disconnected");
}

async fn serve<R, W>(
    reader: R,
    mut writer: W,
    state: Arc<DaemonState>,
    client_id: ClientId,
    mut event_rx: mpsc::UnboundedReceiver<String>,
) -> Result<(), std::io::Error>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // `next_line` keeps partial input across cancellation, so an event
    // arriving mid-request does not lose bytes.
    let mut lines = BufReader::new(reader).lines();

    // Main loop: read requests and forward events
    loop {
        tokio::select! {
            // Read request from client
            result = lines.next_line() => {
                match result {
                    Ok(None) => break, // EOF
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            let response = process_request(trimmed, state.clone(), client_id).await;
                            writer.write_all(response.as_bytes()).await?;
                            writer.write_all(b"\n").await?;
                        }
                    }
                    Err(e) => {
                        debug!(client_id, error = %e, "read error");
                        break;
                    }
                }
            }

            // Forward events to client
            Some(event) = event_rx.recv() => {
                if let Err(e) = writer.write_all(event.as_bytes()).await {
                    error!(client_id, error = %e, "failed to write event");
                    return Err(e);
                }
                writer.write_all(b"\n").await?;
            }
        }
    }

    Ok(())
}

/// Process a single request and return the JSON response line
async fn process_request(line: &str, state: Arc<DaemonState>, client_id: ClientId) -> String {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handlers::dispatch(&request, state, client_id).await,
        Err(e) => encode(&ErrorResponse::new(0, INVALID_PARAMS, format!("Invalid JSON: {e}"))),
    }
}

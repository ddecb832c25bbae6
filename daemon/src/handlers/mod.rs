pub mod analysis;
pub mod cells;
pub mod launch;

use std::sync::Arc;
use std::time::Instant;

use chaos_grid_core::CellId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::protocol::*;
use crate::state::{ClientId, DaemonState};

/// Dispatch a request to the appropriate handler
pub async fn dispatch(request: &Request, state: Arc<DaemonState>, client_id: ClientId) -> String {
    let start = Instant::now();
    let method = request.method.as_str();
    let id = request.id;

    debug!(id, method, client_id, "dispatch");

    let reply = match method {
        METHOD_SPAWN => cells::handle_spawn(request, &state).await,
        METHOD_WRITE => cells::handle_write(request, &state).await,
        METHOD_RESIZE => cells::handle_resize(request, &state).await,
        METHOD_KILL => cells::handle_kill(request, &state).await,
        METHOD_KILL_ALL => cells::handle_kill_all(request, &state).await,
        METHOD_SET_THEME => cells::handle_set_theme(request, &state).await,
        METHOD_GET_CELLS => cells::handle_get_cells(request, &state).await,
        METHOD_LAUNCH_CELL => launch::handle_launch_cell(request, &state).await,
        METHOD_LAUNCH_CELLS => launch::handle_launch_cells(request, &state).await,
        METHOD_LAUNCH_ALL => launch::handle_launch_all(request, &state).await,
        METHOD_ANALYZE => analysis::handle_analyze(request, &state).await,
        _ => {
            warn!(method, "unknown method");
            error(request.id, INVALID_PARAMS, format!("Unknown method: {}", request.method))
        }
    };

    let elapsed = start.elapsed();
    match reply {
        Ok(line) => {
            debug!(id, method, elapsed = ?elapsed, "request ok");
            line
        }
        Err(line) => {
            info!(id, method, elapsed = ?elapsed, "request failed");
            line
        }
    }
}

/// A handler's encoded response line: `Ok` for a result, `Err` for an error.
pub(crate) type Reply = Result<String, String>;

pub(crate) fn success<T: Serialize>(id: u64, result: T) -> Reply {
    Ok(encode(&SuccessResponse::new(id, result)))
}

pub(crate) fn error(id: u64, code: &'static str, message: impl Into<String>) -> Reply {
    Err(error_line(id, code, message))
}

fn error_line(id: u64, code: &'static str, message: impl Into<String>) -> String {
    encode(&ErrorResponse::new(id, code, message))
}

/// Decode the request params; absent params decode as `{}`.
pub(crate) fn parse_params<T: DeserializeOwned>(request: &Request) -> Result<T, String> {
    let params = match &request.params {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(params)
        .map_err(|e| error_line(request.id, INVALID_PARAMS, format!("Invalid params: {e}")))
}

/// Resolve a cell id, rejecting ids outside the configured grid. Like
/// [`parse_params`], the error is a ready-to-send response line.
pub(crate) fn grid_cell(request: &Request, state: &DaemonState, raw: &str) -> Result<CellId, String> {
    let cell_id = CellId::new(raw);
    if state.orchestrator.is_cell(&cell_id) {
        Ok(cell_id)
    } else {
        Err(error_line(request.id, INVALID_PARAMS, format!("Unknown cell: {raw}")))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{call, state};
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unknown_method_is_invalid_params() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let response = call(&state, "terminal_open", json!({})).await;
        assert_eq!(response["id"], json!(7));
        assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn missing_params_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let response = call(&state, METHOD_SPAWN, json!({"cellId": "cell-0"})).await;
        assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn cells_outside_the_grid_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        for (method, params) in [
            (METHOD_SPAWN, json!({"cellId": "cell-9", "cols": 80, "rows": 24})),
            (METHOD_WRITE, json!({"cellId": "cell-01", "data": "ls\n"})),
            (METHOD_SET_THEME, json!({"cellId": "nope", "theme": "x"})),
        ] {
            let response = call(&state, method, params).await;
            assert_eq!(response["error"]["code"], json!(INVALID_PARAMS), "{method}");
        }
    }

    #[tokio::test]
    async fn output_mentioning_error_is_still_a_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(chaos_grid_storage::SNAPSHOT_FILE),
            r#"{"cell-0": "{\"error\": \"disk full\"}"}"#,
        )
        .unwrap();
        let state = state(&dir).await;
        let request = Request {
            id: 3,
            method: METHOD_GET_CELLS.to_string(),
            params: Value::Null,
        };

        let reply = cells::handle_get_cells(&request, &state).await;
        let line = reply.expect("get_cells succeeds");
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["result"]["cells"][0]["lastOutput"], json!(r#"{"error": "disk full"}"#));
    }
}

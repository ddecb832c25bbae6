use chaos_grid_core::CellId;
use chaos_grid_orchestrator::LaunchError;
use tracing::warn;

use super::{error, grid_cell, parse_params, success, Reply};
use crate::protocol::*;
use crate::state::DaemonState;

fn launch_error(id: u64, e: LaunchError) -> Reply {
    warn!(error = %e, "launch failed");
    let code = match e {
        LaunchError::Spawn(_) => SPAWN_FAILED,
        LaunchError::Session(_) => SESSION_IO,
    };
    error(id, code, e.to_string())
}

pub async fn handle_launch_cell(request: &Request, state: &DaemonState) -> Reply {
    let params: LaunchCellParams = parse_params(request)?;
    let cell_id = grid_cell(request, state, &params.cell_id)?;

    match state
        .orchestrator
        .launch_cell(&cell_id, params.work_dir.as_deref(), params.tool_cmd.as_deref())
        .await
    {
        Ok(launched) => success(request.id, LaunchCellResult { launched }),
        Err(e) => launch_error(request.id, e),
    }
}

pub async fn handle_launch_cells(request: &Request, state: &DaemonState) -> Reply {
    let params: LaunchCellsParams = parse_params(request)?;
    // Validate the whole batch before touching any cell.
    let cell_ids = params
        .cell_ids
        .iter()
        .map(|raw| grid_cell(request, state, raw))
        .collect::<Result<Vec<CellId>, String>>()?;

    match state
        .orchestrator
        .launch_cells(&cell_ids, &params.work_dirs, params.tool_cmd.as_deref())
        .await
    {
        Ok(cell_ids) => success(request.id, CellIdsResult { cell_ids }),
        Err(e) => launch_error(request.id, e),
    }
}

pub async fn handle_launch_all(request: &Request, state: &DaemonState) -> Reply {
    let params: LaunchAllParams = parse_params(request)?;

    match state.orchestrator.launch_all(params.tool_cmd.as_deref()).await {
        Ok(cell_ids) => success(request.id, CellIdsResult { cell_ids }),
        Err(e) => launch_error(request.id, e),
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{call, state};
    use crate::protocol::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn one_bad_id_rejects_the_whole_batch() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let response = call(
            &state,
            METHOD_LAUNCH_CELLS,
            json!({"cellIds": ["cell-0", "cell-77"], "workDirs": ["/tmp"]}),
        )
        .await;
        assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
        assert!(!state.orchestrator.exists(&chaos_grid_core::CellId::from_index(0)).await);
    }

    #[tokio::test]
    async fn empty_batch_launches_nothing() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let response = call(&state, METHOD_LAUNCH_CELLS, json!({"cellIds": []})).await;
        assert_eq!(response["result"], json!({"cellIds": []}));
    }
}

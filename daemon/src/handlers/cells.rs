use chaos_grid_orchestrator::SessionError;
use tracing::warn;

use super::{error, grid_cell, parse_params, success, Reply};
use crate::protocol::*;
use crate::state::DaemonState;

fn session_error(id: u64, e: SessionError) -> Reply {
    warn!(error = %e, "session I/O failed");
    error(id, SESSION_IO, e.to_string())
}

pub async fn handle_spawn(request: &Request, state: &DaemonState) -> Reply {
    let params: SpawnParams = parse_params(request)?;
    let cell_id = grid_cell(request, state, &params.cell_id)?;

    match state.orchestrator.spawn(&cell_id, params.cols, params.rows).await {
        Ok(pid) => success(request.id, SpawnResult { pid }),
        Err(e) => {
            warn!(cell_id = %cell_id, error = %e, "spawn failed");
            error(request.id, SPAWN_FAILED, e.to_string())
        }
    }
}

pub async fn handle_write(request: &Request, state: &DaemonState) -> Reply {
    let params: WriteParams = parse_params(request)?;
    let cell_id = grid_cell(request, state, &params.cell_id)?;

    match state.orchestrator.write(&cell_id, params.data.as_bytes()).await {
        Ok(()) => success(request.id, OkResult { ok: true }),
        Err(e) => session_error(request.id, e),
    }
}

pub async fn handle_resize(request: &Request, state: &DaemonState) -> Reply {
    let params: ResizeParams = parse_params(request)?;
    let cell_id = grid_cell(request, state, &params.cell_id)?;

    match state.orchestrator.resize(&cell_id, params.cols, params.rows).await {
        Ok(()) => success(request.id, OkResult { ok: true }),
        Err(e) => session_error(request.id, e),
    }
}

pub async fn handle_kill(request: &Request, state: &DaemonState) -> Reply {
    let params: CellParams = parse_params(request)?;
    let cell_id = grid_cell(request, state, &params.cell_id)?;

    state.orchestrator.kill(&cell_id).await;
    success(request.id, OkResult { ok: true })
}

pub async fn handle_kill_all(request: &Request, state: &DaemonState) -> Reply {
    let cell_ids = state.orchestrator.kill_all().await;
    success(request.id, CellIdsResult { cell_ids })
}

pub async fn handle_set_theme(request: &Request, state: &DaemonState) -> Reply {
    let params: SetThemeParams = parse_params(request)?;
    let cell_id = grid_cell(request, state, &params.cell_id)?;

    let ok = state.orchestrator.set_theme(&cell_id, params.theme.trim());
    success(request.id, OkResult { ok })
}

pub async fn handle_get_cells(request: &Request, state: &DaemonState) -> Reply {
    success(
        request.id,
        GetCellsResult {
            cells: state.orchestrator.get_cells(),
        },
    )
}

use chaos_grid_core::{AnalysisResult, CellId, CellState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC request from client
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub id: u64,
    pub result: Value,
}

/// JSON-RPC error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub id: u64,
    pub error: RpcError,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: &'static str,
    pub message: String,
}

/// Server→Client event (no id)
#[derive(Debug, Serialize)]
pub struct Event {
    pub method: &'static str,
    pub params: Value,
}

// Error codes
pub const INVALID_PARAMS: &str = "invalid_params";
pub const SPAWN_FAILED: &str = "spawn_failed";
pub const SESSION_IO: &str = "session_io";
pub const CONFIG_ERROR: &str = "config_error";
pub const MODEL_ERROR: &str = "model_error";
pub const INTERNAL_ERROR: &str = "internal_error";

// Method names
pub const METHOD_SPAWN: &str = "spawn";
pub const METHOD_WRITE: &str = "write";
pub const METHOD_RESIZE: &str = "resize";
pub const METHOD_KILL: &str = "kill";
pub const METHOD_KILL_ALL: &str = "kill_all";
pub const METHOD_LAUNCH_CELL: &str = "launch_cell";
pub const METHOD_LAUNCH_CELLS: &str = "launch_cells";
pub const METHOD_LAUNCH_ALL: &str = "launch_all";
pub const METHOD_SET_THEME: &str = "set_theme";
pub const METHOD_GET_CELLS: &str = "get_cells";
pub const METHOD_ANALYZE: &str = "analyze";

// Event names
pub const EVENT_CELL_OUTPUT: &str = "cell_output";
pub const EVENT_CELL_EXITED: &str = "cell_exited";
pub const EVENT_ANALYSIS_COMPLETED: &str = "analysis_completed";

// --- Request params ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnParams {
    pub cell_id: String,
    pub cols: u16,
    pub rows: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParams {
    pub cell_id: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeParams {
    pub cell_id: String,
    pub cols: u16,
    pub rows: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellParams {
    pub cell_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchCellParams {
    pub cell_id: String,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub tool_cmd: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchCellsParams {
    pub cell_ids: Vec<String>,
    /// Paired with `cell_ids` by position; missing entries mean no directory.
    #[serde(default)]
    pub work_dirs: Vec<String>,
    #[serde(default)]
    pub tool_cmd: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchAllParams {
    #[serde(default)]
    pub tool_cmd: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetThemeParams {
    pub cell_id: String,
    #[serde(alias = "label")]
    pub theme: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    #[serde(default)]
    pub language: Option<String>,
}

// --- Response types ---

#[derive(Debug, Serialize)]
pub struct OkResult {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct SpawnResult {
    pub pid: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LaunchCellResult {
    pub launched: bool,
}

#[derive(Debug, Serialize)]
pub struct CellIdsResult {
    #[serde(rename = "cellIds")]
    pub cell_ids: Vec<CellId>,
}

#[derive(Debug, Serialize)]
pub struct GetCellsResult {
    pub cells: Vec<CellState>,
}

// --- Event params ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellOutputParams<'a> {
    pub cell_id: &'a CellId,
    pub data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellExitedParams<'a> {
    pub cell_id: &'a CellId,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisCompletedParams<'a> {
    pub result: &'a AnalysisResult,
}

// --- Helpers ---

/// Last-resort line when a response cannot be serialized.
/// Serialize a response or event as one protocol line (without the newline).
pub fn encode<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|_| {
        format!(r#"{{"id":0,"error":{{"code":"{INTERNAL_ERROR}","message":"failed to encode message"}}}}"#)
    })
}

impl SuccessResponse {
    pub fn new<T: Serialize>(id: u64, result: T) -> Self {
        Self {
            id,
            result: serde_json::to_value(result).unwrap_or(Value::Null),
        }
    }
}

impl ErrorResponse {
    pub fn new(id: u64, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            id,
            error: RpcError {
                code,
                message: message.into(),
            },
        }
    }
}

impl Event {
    pub fn new<T: Serialize>(method: &'static str, params: T) -> Self {
        Self {
            method,
            params: serde_json::to_value(params).unwrap_or(Value::Null),
        }
    }
}

use chaos_grid_orchestrator::AnalysisError;
use tracing::warn;

use super::{error, parse_params, success, Reply};
use crate::protocol::*;
use crate::state::DaemonState;

pub async fn handle_analyze(request: &Request, state: &DaemonState) -> Reply {
    let params: AnalyzeParams = parse_params(request)?;

    match state.orchestrator.analyze(params.language.as_deref()).await {
        Ok(result) => success(request.id, result),
        Err(e) => {
            warn!(error = %e, "analysis failed");
            let code = match e {
                AnalysisError::Config(_) => CONFIG_ERROR,
                AnalysisError::Model(_) => MODEL_ERROR,
            };
            error(request.id, code, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{call, state};
    use crate::protocol::*;
    use chaos_grid_storage::SNAPSHOT_FILE;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn idle_grid_analyzes_without_credential() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let response = call(&state, METHOD_ANALYZE, json!(null)).await;
        assert_eq!(response["result"], json!({"summaries": {}, "ideas": []}));
    }

    #[tokio::test]
    async fn active_grid_without_credential_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE), r#"{"cell-1": "npm test"}"#).unwrap();
        let state = state(&dir).await;

        let response = call(&state, METHOD_ANALYZE, json!({"language": "German"})).await;
        assert_eq!(response["error"]["code"], json!(CONFIG_ERROR));
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("GEMINI_API_KEY"));
    }
}

use std::path::PathBuf;
use std::time::Duration;

use chaos_grid_core::{AnalysisMode, ConfigError, GridLayout};
use chaos_grid_orchestrator::analysis::AnalysisConfig;
use chaos_grid_orchestrator::{LaunchConfig, OrchestratorConfig, ShellConfig};
use clap::Parser;

/// Chaos Grid daemon - a grid of PTY shells with periodic cross-cell analysis
#[derive(Parser, Debug)]
#[command(name = "chaos-grid-daemon")]
pub struct Args {
    /// Bind address
    #[arg(long, env = "CHAOS_GRID_LISTEN", default_value = "127.0.0.1:4740")]
    pub listen: String,

    /// Data directory (snapshots and analysis history)
    #[arg(long, env = "CHAOS_GRID_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Shell started in each cell
    #[arg(long, env = "SHELL", default_value = "/bin/bash")]
    pub shell: String,

    /// Grid columns
    #[arg(long, env = "CHAOS_GRID_COLUMNS", default_value_t = 3)]
    pub columns: usize,

    /// Total number of cells
    #[arg(long, env = "CHAOS_GRID_CELLS", default_value_t = 9)]
    pub cells: usize,

    /// Command typed into a cell by the launch methods
    #[arg(
        long,
        env = "CHAOS_GRID_TOOL_CMD",
        default_value = chaos_grid_orchestrator::launcher::DEFAULT_TOOL_CMD
    )]
    pub tool_cmd: String,

    /// Delay between spawning a shell and typing into it
    #[arg(long, env = "CHAOS_GRID_SETTLE_DELAY_MS", default_value_t = 500)]
    pub settle_delay_ms: u64,

    /// Prompt style: flow or uniform
    #[arg(long, env = "CHAOS_GRID_ANALYSIS_MODE", default_value = "flow")]
    pub analysis_mode: AnalysisMode,

    /// Number of analyses kept on disk
    #[arg(long, env = "CHAOS_GRID_HISTORY_CAP", default_value_t = chaos_grid_storage::DEFAULT_HISTORY_CAP)]
    pub history_cap: usize,

    /// Run an analysis every N seconds and broadcast the result
    #[arg(long, env = "CHAOS_GRID_AUTO_ANALYZE_SECS")]
    pub auto_analyze_secs: Option<u64>,

    /// Gemini model
    #[arg(
        long,
        env = "CHAOS_GRID_GEMINI_MODEL",
        default_value = chaos_grid_gemini::DEFAULT_MODEL
    )]
    pub model: String,

    /// Environment variables removed from spawned shells
    #[arg(
        long,
        env = "CHAOS_GRID_SCRUB_ENV",
        value_delimiter = ',',
        default_value = "CLAUDECODE,CLAUDE_CODE_ENTRYPOINT,npm_config_prefix"
    )]
    pub scrub_env: Vec<String>,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(chaos_grid_storage::default_data_dir)
    }

    pub fn auto_analyze_interval(&self) -> Option<Duration> {
        self.auto_analyze_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, ConfigError> {
        let layout = GridLayout::new(self.columns, self.cells)?;
        if self.history_cap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history_cap".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(OrchestratorConfig {
            layout,
            shell: ShellConfig {
                shell: self.shell.clone(),
                scrub_env: self
                    .scrub_env
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                ..ShellConfig::default()
            },
            launch: LaunchConfig {
                tool_cmd: self.tool_cmd.clone(),
                settle_delay: Duration::from_millis(self.settle_delay_ms),
                ..LaunchConfig::default()
            },
            analysis: AnalysisConfig {
                mode: self.analysis_mode,
                ..AnalysisConfig::default()
            },
            history_cap: self.history_cap,
            data_dir: self.data_dir(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let argv = std::iter::once("chaos-grid-daemon").chain(args.iter().copied());
        Args::try_parse_from(argv).expect("args to parse")
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--listen",
            "127.0.0.1:9000",
            "--columns",
            "4",
            "--cells",
            "8",
            "--analysis-mode",
            "uniform",
            "--scrub-env",
            "FOO, BAR",
            "--settle-delay-ms",
            "0",
        ]);
        assert_eq!(args.listen, "127.0.0.1:9000");

        let config = args.orchestrator_config().expect("config");
        assert_eq!(config.layout.columns(), 4);
        assert_eq!(config.layout.cell_count(), 8);
        assert_eq!(config.analysis.mode, AnalysisMode::Uniform);
        assert_eq!(config.shell.scrub_env, vec!["FOO", "BAR"]);
        assert_eq!(config.launch.settle_delay, Duration::ZERO);
    }

    #[test]
    fn unknown_analysis_mode_is_rejected() {
        let result = Args::try_parse_from(["chaos-grid-daemon", "--analysis-mode", "sideways"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_columns_is_a_config_error() {
        let args = parse(&["--columns", "0"]);
        assert!(matches!(
            args.orchestrator_config(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn zero_auto_analyze_means_off() {
        assert_eq!(parse(&["--auto-analyze-secs", "0"]).auto_analyze_interval(), None);
        assert_eq!(
            parse(&["--auto-analyze-secs", "30"]).auto_analyze_interval(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn explicit_data_dir_wins() {
        let args = parse(&["--data-dir", "/tmp/grid"]);
        assert_eq!(args.data_dir(), PathBuf::from("/tmp/grid"));
    }
}

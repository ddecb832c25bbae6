// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::Arc;

use chaos_grid_core::{AnalysisResult, CellId, CellState, GridLayout};
use chaos_grid_storage::{default_data_dir, HistoryStore, OutputSnapshotStore, SnapshotWriter, DEFAULT_HISTORY_CAP};
use tracing::info;

use crate::analysis::{AnalysisConfig, Aggregator, LazyModelClient};
use crate::cells::CellStore;
use crate::error::{AnalysisError, LaunchError, SessionError, SpawnError};
use crate::launcher::{CommandInjector, LaunchConfig};
use crate::pty::PtyBackend;
use crate::registry::{SessionRegistry, ShellConfig};
use crate::sink::OutputSink;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
	pub layout: GridLayout,
	pub shell: ShellConfig,
	pub launch: LaunchConfig,
	pub analysis: AnalysisConfig,
	pub history_cap: usize,
	pub data_dir: PathBuf,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			layout: GridLayout::default(),
			shell: ShellConfig::default(),
			launch: LaunchConfig::default(),
			analysis: AnalysisConfig::default(),
			history_cap: DEFAULT_HISTORY_CAP,
			data_dir: default_data_dir(),
		}
	}
}

/// Everything a front end drives: sessions, launches, themes and analysis.
pub struct Orchestrator {
	cells: Arc<CellStore>,
	registry: Arc<SessionRegistry>,
	injector: CommandInjector,
	aggregator: Aggregator,
	sink: Arc<dyn OutputSink>,
}

impl Orchestrator {
	/// Restore persisted cell output and wire up the components. Must run
	/// inside a tokio runtime; the snapshot writer task is started here.
	pub async fn start(
		config: OrchestratorConfig,
		backend: Arc<dyn PtyBackend>,
		client: LazyModelClient,
		sink: Arc<dyn OutputSink>,
	) -> Self {
		let snapshot_store = OutputSnapshotStore::new(&config.data_dir);
		let restored = snapshot_store.load_or_empty().await;
		let (snapshots, _writer) = SnapshotWriter::spawn(snapshot_store, restored.clone());

		let cells = Arc::new(CellStore::new(config.layout, &restored));
		let registry = Arc::new(SessionRegistry::new(
			backend,
			config.shell,
			cells.clone(),
			Some(snapshots),
		));
		let injector = CommandInjector::new(registry.clone(), config.launch, sink.clone());
		let history = Arc::new(HistoryStore::new(&config.data_dir, config.history_cap));
		let aggregator = Aggregator::new(cells.clone(), history, client, config.analysis);

		info!(
			columns = config.layout.columns(),
			cells = config.layout.cell_count(),
			restored = restored.len(),
			data_dir = %config.data_dir.display(),
			"orchestrator started"
		);

		Self {
			cells,
			registry,
			injector,
			aggregator,
			sink,
		}
	}

	pub fn layout(&self) -> &GridLayout {
		self.cells.layout()
	}

	/// Whether `cell_id` names a position of this grid.
	pub fn is_cell(&self, cell_id: &CellId) -> bool {
		self.cells.contains(cell_id)
	}

	pub async fn spawn(&self, cell_id: &CellId, cols: u16, rows: u16) -> Result<Option<u32>, SpawnError> {
		self.registry.spawn(cell_id, cols, rows, self.sink.clone()).await
	}

	pub async fn write(&self, cell_id: &CellId, data: &[u8]) -> Result<(), SessionError> {
		self.registry.write(cell_id, data).await
	}

	pub async fn resize(&self, cell_id: &CellId, cols: u16, rows: u16) -> Result<(), SessionError> {
		self.registry.resize(cell_id, cols, rows).await
	}

	pub async fn kill(&self, cell_id: &CellId) {
		self.registry.kill(cell_id).await
	}

	pub async fn kill_all(&self) -> Vec<CellId> {
		self.registry.kill_all().await
	}

	pub async fn exists(&self, cell_id: &CellId) -> bool {
		self.registry.exists(cell_id).await
	}

	pub async fn launch_cell(
		&self,
		cell_id: &CellId,
		work_dir: Option<&str>,
		tool_cmd: Option<&str>,
	) -> Result<bool, LaunchError> {
		self.injector.ensure_and_launch(cell_id, work_dir, tool_cmd).await
	}

	pub async fn launch_cells(
		&self,
		cell_ids: &[CellId],
		work_dirs: &[String],
		tool_cmd: Option<&str>,
	) -> Result<Vec<CellId>, LaunchError> {
		self.injector.launch_cells(cell_ids, work_dirs, tool_cmd).await
	}

	/// Launch the tool in every cell of the grid, in grid order.
	pub async fn launch_all(&self, tool_cmd: Option<&str>) -> Result<Vec<CellId>, LaunchError> {
		let ids = self.layout().cell_ids();
		self.injector.launch_cells(&ids, &[], tool_cmd).await
	}

	pub fn set_theme(&self, cell_id: &CellId, theme: &str) -> bool {
		self.cells.set_theme(cell_id, theme)
	}

	/// Every cell, in grid order.
	pub fn get_cells(&self) -> Vec<CellState> {
		self.cells.snapshot()
	}

	pub async fn analyze(&self, language: Option<&str>) -> Result<AnalysisResult, AnalysisError> {
		self.aggregator.analyze(language).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{wait_until, CannedModel, MockBackend, RecordingSink};
	use chaos_grid_core::CellStatus;
	use chaos_grid_storage::SNAPSHOT_FILE;
	use std::time::Duration;
	use tempfile::TempDir;

	fn config(dir: &TempDir) -> OrchestratorConfig {
		OrchestratorConfig {
			shell: ShellConfig {
				shell: "/bin/sh".to_string(),
				args: vec![],
				scrub_env: vec![],
				cwd: None,
			},
			launch: LaunchConfig {
				settle_delay: Duration::ZERO,
				..LaunchConfig::default()
			},
			data_dir: dir.path().to_path_buf(),
			..OrchestratorConfig::default()
		}
	}

	async fn start(dir: &TempDir, backend: Arc<MockBackend>) -> Orchestrator {
		Orchestrator::start(
			config(dir),
			backend,
			LazyModelClient::ready(CannedModel::replying("{}")),
			RecordingSink::new(),
		)
		.await
	}

	#[tokio::test]
	async fn launch_all_issues_one_command_per_cell() {
		let dir = TempDir::new().unwrap();
		let backend = Arc::new(MockBackend::default());
		let orch = start(&dir, backend.clone()).await;
		let running = CellId::from_index(1);
		orch.spawn(&running, 100, 30).await.unwrap();

		let launched = orch.launch_all(Some("tool")).await.unwrap();

		assert_eq!(launched, orch.layout().cell_ids());
		assert_eq!(backend.spawn_count(), 9);
		assert_eq!(backend.processes_for(&running).len(), 1);
		for id in &launched {
			let procs = backend.processes_for(id);
			assert_eq!(procs[0].written(), "tool\n", "cell {id}");
		}
	}

	#[tokio::test]
	async fn restored_snapshot_seeds_last_output() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join(SNAPSHOT_FILE), r#"{"cell-4": "previous run"}"#).unwrap();

		let orch = start(&dir, Arc::new(MockBackend::default())).await;
		let cells = orch.get_cells();

		assert_eq!(cells.len(), 9);
		assert_eq!(cells[4].last_output, "previous run");
		assert_eq!(cells[4].status, CellStatus::Idle);
		assert!(cells[0].last_output.is_empty());
	}

	#[tokio::test]
	async fn output_is_snapshotted_to_disk() {
		let dir = TempDir::new().unwrap();
		let backend = Arc::new(MockBackend::default());
		let orch = start(&dir, backend.clone()).await;
		let id = CellId::from_index(2);

		orch.spawn(&id, 80, 24).await.unwrap();
		backend.process(0).emit("hello from cell two");

		let path = dir.path().join(SNAPSHOT_FILE);
		wait_until(|| {
			std::fs::read_to_string(&path)
				.map(|s| s.contains("hello from cell two"))
				.unwrap_or(false)
		})
		.await;
		assert_eq!(orch.get_cells()[2].status, CellStatus::Active);
	}

	#[tokio::test]
	async fn kill_then_write_is_a_noop() {
		let dir = TempDir::new().unwrap();
		let backend = Arc::new(MockBackend::default());
		let orch = start(&dir, backend.clone()).await;
		let id = CellId::from_index(0);

		orch.spawn(&id, 80, 24).await.unwrap();
		orch.kill(&id).await;

		assert!(!orch.exists(&id).await);
		orch.write(&id, b"ls\n").await.unwrap();
		assert_eq!(backend.process(0).written(), "");
		assert_eq!(orch.get_cells()[0].pid, None);
	}

	#[tokio::test]
	async fn themes_only_apply_to_grid_cells() {
		let dir = TempDir::new().unwrap();
		let orch = start(&dir, Arc::new(MockBackend::default())).await;

		assert!(orch.set_theme(&CellId::from_index(3), "Reading"));
		assert!(!orch.set_theme(&CellId::new("cell-42"), "Nowhere"));
		assert!(!orch.is_cell(&CellId::new("bogus")));
		assert_eq!(orch.get_cells()[3].theme, "Reading");
	}
}

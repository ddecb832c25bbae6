// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Persisted tails of cell output, so a restart can show what each cell
//! last printed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chaos_grid_core::{tail_bytes, CellId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::atomic::{read_json, write_json};
use crate::error::StorageResult;

pub const SNAPSHOT_FILE: &str = "cell-outputs.json";
pub const SNAPSHOT_RETAIN_BYTES: usize = 5000;

/// `cell-outputs.json`: an object mapping cell id to its last output.
#[derive(Debug, Clone)]
pub struct OutputSnapshotStore {
	path: PathBuf,
}

impl OutputSnapshotStore {
	pub fn new(data_dir: &Path) -> Self {
		Self {
			path: data_dir.join(SNAPSHOT_FILE),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub async fn load(&self) -> StorageResult<BTreeMap<String, String>> {
		Ok(read_json(&self.path).await?.unwrap_or_default())
	}

	/// Like [`load`](Self::load), but a failure is logged and yields nothing.
	pub async fn load_or_empty(&self) -> BTreeMap<String, String> {
		match self.load().await {
			Ok(map) => map,
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "failed to load output snapshots");
				BTreeMap::new()
			}
		}
	}

	pub async fn save(&self, snapshots: &BTreeMap<String, String>) -> StorageResult<()> {
		write_json(&self.path, snapshots).await
	}
}

/// Non-blocking handle to the background task that owns the snapshot file.
///
/// Safe to call from the blocking PTY reader threads. The task exits, after
/// a final write, once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
	tx: mpsc::UnboundedSender<(CellId, String)>,
}

impl SnapshotWriter {
	/// Start the writer task on the current runtime, seeded with `initial`.
	pub fn spawn(
		store: OutputSnapshotStore,
		initial: BTreeMap<String, String>,
	) -> (Self, JoinHandle<()>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let handle = tokio::spawn(run_writer(store, initial, rx));
		(Self { tx }, handle)
	}

	pub fn record(&self, cell_id: &CellId, output: &str) {
		let tail = tail_bytes(output, SNAPSHOT_RETAIN_BYTES).to_string();
		if self.tx.send((cell_id.clone(), tail)).is_err() {
			debug!(cell_id = %cell_id, "snapshot writer has stopped");
		}
	}
}

async fn run_writer(
	store: OutputSnapshotStore,
	mut snapshots: BTreeMap<String, String>,
	mut rx: mpsc::UnboundedReceiver<(CellId, String)>,
) {
	while let Some((cell_id, tail)) = rx.recv().await {
		snapshots.insert(cell_id.to_string(), tail);

		// Coalesce whatever else is already queued into a single write.
		while let Ok((cell_id, tail)) = rx.try_recv() {
			snapshots.insert(cell_id.to_string(), tail);
		}

		if let Err(e) = store.save(&snapshots).await {
			warn!(path = %store.path().display(), error = %e, "failed to persist output snapshots");
		}
	}
	debug!("snapshot writer stopped");
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn writer_persists_latest_tail_per_cell() {
		let dir = TempDir::new().unwrap();
		let store = OutputSnapshotStore::new(dir.path());
		let (writer, task) = SnapshotWriter::spawn(store.clone(), BTreeMap::new());

		writer.record(&CellId::from_index(0), "first");
		writer.record(&CellId::from_index(0), "second");
		writer.record(&CellId::from_index(3), "other");
		drop(writer);
		task.await.unwrap();

		let saved = store.load().await.unwrap();
		assert_eq!(saved["cell-0"], "second");
		assert_eq!(saved["cell-3"], "other");
	}

	#[tokio::test]
	async fn writer_keeps_seeded_cells_and_truncates() {
		let dir = TempDir::new().unwrap();
		let store = OutputSnapshotStore::new(dir.path());
		let mut seed = BTreeMap::new();
		seed.insert("cell-8".to_string(), "restored".to_string());
		let (writer, task) = SnapshotWriter::spawn(store.clone(), seed);

		let long = "x".repeat(SNAPSHOT_RETAIN_BYTES + 100);
		writer.record(&CellId::from_index(1), &long);
		drop(writer);
		task.await.unwrap();

		let saved = store.load().await.unwrap();
		assert_eq!(saved["cell-8"], "restored");
		assert_eq!(saved["cell-1"].len(), SNAPSHOT_RETAIN_BYTES);
	}

	#[tokio::test]
	async fn corrupt_snapshot_file_loads_empty() {
		let dir = TempDir::new().unwrap();
		let store = OutputSnapshotStore::new(dir.path());
		tokio::fs::write(store.path(), b"nope").await.unwrap();
		assert!(store.load_or_empty().await.is_empty());
	}
}

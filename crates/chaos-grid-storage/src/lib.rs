// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Local persistence for Chaos Grid.
//!
//! Everything here is best effort: callers log and discard [`StorageError`]s
//! rather than failing the operation that triggered the write.

pub mod atomic;
pub mod error;
pub mod history;
pub mod snapshots;

use std::path::PathBuf;

pub use atomic::{read_json, write_atomic, write_json};
pub use error::{StorageError, StorageResult};
pub use history::{HistoryStore, DEFAULT_HISTORY_CAP, HISTORY_FILE};
pub use snapshots::{OutputSnapshotStore, SnapshotWriter, SNAPSHOT_FILE, SNAPSHOT_RETAIN_BYTES};

/// Platform data directory for Chaos Grid, e.g. `~/.local/share/chaos-grid`.
pub fn default_data_dir() -> PathBuf {
	dirs::data_dir()
		.unwrap_or_else(std::env::temp_dir)
		.join("chaos-grid")
}

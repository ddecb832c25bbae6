// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use chaos_grid_core::HistoryEntry;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::atomic::{read_json, write_json};
use crate::error::StorageResult;

pub const HISTORY_FILE: &str = "analysis-history.json";
pub const DEFAULT_HISTORY_CAP: usize = 20;

/// Capped, append-only log of past analyses in `analysis-history.json`.
///
/// Entries are stored oldest first. The in-process mutex serializes
/// read-modify-write; concurrent processes are last-writer-wins.
pub struct HistoryStore {
	path: PathBuf,
	cap: usize,
	lock: Mutex<()>,
}

impl HistoryStore {
	pub fn new(data_dir: &Path, cap: usize) -> Self {
		Self {
			path: data_dir.join(HISTORY_FILE),
			cap: cap.max(1),
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn cap(&self) -> usize {
		self.cap
	}

	/// All entries, oldest first. A missing file is an empty history.
	pub async fn load_all(&self) -> StorageResult<Vec<HistoryEntry>> {
		Ok(read_json(&self.path).await?.unwrap_or_default())
	}

	/// Up to `n` most recent entries, oldest first.
	pub async fn recent(&self, n: usize) -> StorageResult<Vec<HistoryEntry>> {
		let mut entries = self.load_all().await?;
		let skip = entries.len().saturating_sub(n);
		entries.drain(..skip);
		Ok(entries)
	}

	pub async fn append(&self, entry: HistoryEntry) -> StorageResult<()> {
		let _guard = self.lock.lock().await;

		let mut entries = match self.load_all().await {
			Ok(entries) => entries,
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "unreadable history, starting fresh");
				Vec::new()
			}
		};

		entries.push(entry);
		let overflow = entries.len().saturating_sub(self.cap);
		entries.drain(..overflow);

		write_json(&self.path, &entries).await?;
		debug!(count = entries.len(), cap = self.cap, "appended analysis history entry");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chaos_grid_core::AnalysisResult;
	use chrono::{Duration, Utc};
	use std::collections::BTreeMap;
	use tempfile::TempDir;

	fn entry(n: usize) -> HistoryEntry {
		let mut result = AnalysisResult::empty();
		result.ideas.push(format!("idea {n}"));
		let mut entry = HistoryEntry::from_result(&result, BTreeMap::new());
		entry.timestamp = Utc::now() + Duration::seconds(n as i64);
		entry
	}

	#[tokio::test]
	async fn missing_file_is_empty() {
		let dir = TempDir::new().unwrap();
		let store = HistoryStore::new(dir.path(), 20);
		assert!(store.load_all().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn append_past_cap_keeps_most_recent_in_order() {
		let dir = TempDir::new().unwrap();
		let cap = 4;
		let store = HistoryStore::new(dir.path(), cap);

		for n in 0..cap + 5 {
			store.append(entry(n)).await.unwrap();
		}

		let ideas: Vec<String> = store
			.load_all()
			.await
			.unwrap()
			.into_iter()
			.map(|e| e.ideas[0].clone())
			.collect();
		assert_eq!(ideas, vec!["idea 5", "idea 6", "idea 7", "idea 8"]);
	}

	#[tokio::test]
	async fn recent_returns_tail_oldest_first() {
		let dir = TempDir::new().unwrap();
		let store = HistoryStore::new(dir.path(), 20);
		for n in 0..8 {
			store.append(entry(n)).await.unwrap();
		}

		let recent = store.recent(3).await.unwrap();
		let ideas: Vec<&str> = recent.iter().map(|e| e.ideas[0].as_str()).collect();
		assert_eq!(ideas, vec!["idea 5", "idea 6", "idea 7"]);
	}

	#[tokio::test]
	async fn corrupt_file_is_replaced_on_append() {
		let dir = TempDir::new().unwrap();
		let store = HistoryStore::new(dir.path(), 20);
		tokio::fs::write(store.path(), b"[{broken").await.unwrap();

		assert!(store.load_all().await.is_err());
		store.append(entry(1)).await.unwrap();
		assert_eq!(store.load_all().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn concurrent_appends_are_not_lost() {
		let dir = TempDir::new().unwrap();
		let store = std::sync::Arc::new(HistoryStore::new(dir.path(), 50));

		let mut handles = Vec::new();
		for n in 0..10 {
			let store = store.clone();
			handles.push(tokio::spawn(async move { store.append(entry(n)).await }));
		}
		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		assert_eq!(store.load_all().await.unwrap().len(), 10);
	}
}

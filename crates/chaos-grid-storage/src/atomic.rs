// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{IoContext, StorageError, StorageResult};

/// Write `contents` to `path` via a sibling `.tmp` file and a rename, so
/// readers never observe a half-written file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
	if let Some(parent) = path.parent() {
		tokio::fs::create_dir_all(parent).await.at(parent)?;
	}

	let mut tmp_name = path.as_os_str().to_owned();
	tmp_name.push(".tmp");
	let tmp_path = Path::new(&tmp_name);

	tokio::fs::write(tmp_path, contents).await.at(tmp_path)?;
	tokio::fs::rename(tmp_path, path).await.at(path)?;

	debug!(path = %path.display(), bytes = contents.len(), "wrote file atomically");
	Ok(())
}

/// Read and parse a JSON file. A missing file is `Ok(None)`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
	let contents = match tokio::fs::read_to_string(path).await {
		Ok(c) => c,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			debug!(path = %path.display(), "file not found");
			return Ok(None);
		}
		Err(source) => {
			return Err(StorageError::Io {
				path: path.to_path_buf(),
				source,
			})
		}
	};
	Ok(Some(serde_json::from_str(&contents)?))
}

pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
	let json = serde_json::to_vec_pretty(value)?;
	write_atomic(path, &json).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;
	use tempfile::TempDir;

	#[tokio::test]
	async fn missing_file_reads_as_none() {
		let dir = TempDir::new().unwrap();
		let value: Option<Vec<u32>> = read_json(&dir.path().join("absent.json")).await.unwrap();
		assert!(value.is_none());
	}

	#[tokio::test]
	async fn write_creates_parent_and_leaves_no_tmp() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nested").join("state.json");
		let mut map = BTreeMap::new();
		map.insert("cell-0", "hello");
		write_json(&path, &map).await.unwrap();

		let back: BTreeMap<String, String> = read_json(&path).await.unwrap().unwrap();
		assert_eq!(back["cell-0"], "hello");
		assert!(!dir.path().join("nested").join("state.json.tmp").exists());
	}

	#[tokio::test]
	async fn corrupt_file_is_a_serialization_error() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("bad.json");
		tokio::fs::write(&path, b"{not json").await.unwrap();
		let err = read_json::<Vec<u32>>(&path).await.unwrap_err();
		assert!(matches!(err, crate::StorageError::Serialization(_)));
	}
}

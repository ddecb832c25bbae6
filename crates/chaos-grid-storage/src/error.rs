// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub(crate) trait IoContext<T> {
	fn at(self, path: &std::path::Path) -> StorageResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
	fn at(self, path: &std::path::Path) -> StorageResult<T> {
		self.map_err(|source| StorageError::Io {
			path: path.to_path_buf(),
			source,
		})
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chaos_grid_core::{CellId, ConfigError, ModelError};
use thiserror::Error;

/// Failure to start a session. Nothing is registered when this is returned.
#[derive(Debug, Error)]
pub enum SpawnError {
	#[error("failed to open pty: {0}")]
	OpenPty(String),

	#[error("failed to spawn {shell}: {message}")]
	Spawn { shell: String, message: String },

	#[error("failed to open pty reader: {0}")]
	Reader(String),

	#[error("failed to open pty writer: {0}")]
	Writer(String),
}

/// I/O failure on a live session.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("session {cell_id} I/O error: {source}")]
	Io {
		cell_id: CellId,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Error)]
pub enum LaunchError {
	#[error(transparent)]
	Spawn(#[from] SpawnError),

	#[error(transparent)]
	Session(#[from] SessionError),
}

/// Why a model response could not be turned into a result.
#[derive(Debug, Error)]
pub enum ExtractError {
	#[error("no JSON object found in model response")]
	NotFound,

	#[error("malformed JSON in model response: {0}")]
	Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
	#[error("analysis is not configured: {0}")]
	Config(#[from] ConfigError),

	#[error("model call failed: {0}")]
	Model(#[from] ModelError),
}

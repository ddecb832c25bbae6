// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::env::SecretEnvError;

/// Configuration problems. Raised lazily by whichever feature needs the value.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("missing credential: {0}")]
	MissingCredential(String),

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error(transparent)]
	SecretEnv(#[from] SecretEnvError),
}

/// Errors from the external analysis model.
#[derive(Clone, Debug, Error)]
pub enum ModelError {
	#[error("HTTP error: {0}")]
	Http(String),

	#[error("API error: {0}")]
	Api(String),

	#[error("Request timed out")]
	Timeout,

	#[error("Invalid response: {0}")]
	InvalidResponse(String),

	#[error("Rate limited: retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },
}

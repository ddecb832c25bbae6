// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

const CELL_PREFIX: &str = "cell-";

/// Identifier of one grid position, e.g. `cell-4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn from_index(index: usize) -> Self {
		Self(format!("{CELL_PREFIX}{index}"))
	}

	/// Grid index encoded in the id, if it has the `cell-<n>` form.
	pub fn index(&self) -> Option<usize> {
		self.0.strip_prefix(CELL_PREFIX)?.parse().ok()
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CellId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CellId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for CellId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// Coarse activity status of a cell as shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
	#[default]
	Idle,
	Active,
	/// Reserved for the UI; the orchestrator never assigns it.
	Thinking,
}

/// Snapshot of one grid position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
	pub id: CellId,
	pub theme: String,
	pub pid: Option<u32>,
	pub last_output: String,
	pub status: CellStatus,
	/// Milliseconds since the Unix epoch.
	pub updated_at: i64,
}

impl CellState {
	/// A fresh idle cell, optionally seeded with output restored from disk.
	pub fn idle(id: CellId, last_output: String) -> Self {
		Self {
			id,
			theme: String::new(),
			pid: None,
			last_output,
			status: CellStatus::Idle,
			updated_at: now_millis(),
		}
	}

	pub fn has_output(&self) -> bool {
		!self.last_output.is_empty()
	}

	pub fn touch(&mut self) {
		self.updated_at = now_millis();
	}
}

pub fn now_millis() -> i64 {
	Utc::now().timestamp_millis()
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Grid geometry and the column-derived cell roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::CellId;
use crate::error::ConfigError;

/// Semantic role of a grid column, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
	/// What is being built and shipped.
	Supply,
	/// What the user has decided to own.
	Will,
	/// What comes in from outside.
	Stimulus,
}

impl Role {
	pub const ALL: [Role; 3] = [Role::Stimulus, Role::Will, Role::Supply];

	pub fn label(&self) -> &'static str {
		match self {
			Role::Supply => "Supply",
			Role::Will => "Will",
			Role::Stimulus => "Stimulus",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Shape of the grid: how many cells and how many columns they wrap into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
	columns: usize,
	cell_count: usize,
}

impl Default for GridLayout {
	fn default() -> Self {
		Self {
			columns: 3,
			cell_count: 9,
		}
	}
}

impl GridLayout {
	pub fn new(columns: usize, cell_count: usize) -> Result<Self, ConfigError> {
		if columns == 0 {
			return Err(ConfigError::InvalidValue {
				key: "columns".to_string(),
				message: "grid needs at least one column".to_string(),
			});
		}
		if cell_count == 0 {
			return Err(ConfigError::InvalidValue {
				key: "cells".to_string(),
				message: "grid needs at least one cell".to_string(),
			});
		}
		Ok(Self {
			columns,
			cell_count,
		})
	}

	pub fn columns(&self) -> usize {
		self.columns
	}

	pub fn cell_count(&self) -> usize {
		self.cell_count
	}

	/// All cell ids in row-major order.
	pub fn cell_ids(&self) -> Vec<CellId> {
		(0..self.cell_count).map(CellId::from_index).collect()
	}

	pub fn contains(&self, id: &CellId) -> bool {
		id.index().is_some_and(|i| i < self.cell_count)
	}

	/// Role of a cell. The columns are split into three equal bands;
	/// ids that do not parse are treated as index 0.
	pub fn role_of(&self, id: &CellId) -> Role {
		let column = id.index().unwrap_or(0) % self.columns;
		match column * 3 / self.columns {
			0 => Role::Supply,
			1 => Role::Will,
			_ => Role::Stimulus,
		}
	}
}

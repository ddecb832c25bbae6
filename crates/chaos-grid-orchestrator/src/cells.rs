// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chaos_grid_core::{CellId, CellState, CellStatus, GridLayout};

/// Per-cell state for every position of the grid.
///
/// The key set is fixed at construction. Each cell has its own lock, so no
/// operation ever holds more than one cell at a time.
#[derive(Debug)]
pub struct CellStore {
	layout: GridLayout,
	cells: Vec<Mutex<CellState>>,
}

impl CellStore {
	/// Create every cell of `layout` as idle, restoring `lastOutput` from
	/// `restored` where present.
	pub fn new(layout: GridLayout, restored: &BTreeMap<String, String>) -> Self {
		let cells = layout
			.cell_ids()
			.into_iter()
			.map(|id| {
				let output = restored.get(id.as_str()).cloned().unwrap_or_default();
				Mutex::new(CellState::idle(id, output))
			})
			.collect();
		Self { layout, cells }
	}

	pub fn layout(&self) -> &GridLayout {
		&self.layout
	}

	fn slot(&self, id: &CellId) -> Option<MutexGuard<'_, CellState>> {
		let cell = self.cells.get(id.index()?)?;
		let guard = cell.lock().unwrap_or_else(|e| e.into_inner());
		// "cell-01" parses to index 1 but is not that cell.
		(guard.id == *id).then_some(guard)
	}

	pub fn contains(&self, id: &CellId) -> bool {
		self.slot(id).is_some()
	}

	pub fn get(&self, id: &CellId) -> Option<CellState> {
		self.slot(id).map(|c| c.clone())
	}

	/// Consistent per-cell clones, in grid order.
	pub fn snapshot(&self) -> Vec<CellState> {
		self.cells
			.iter()
			.map(|c| c.lock().unwrap_or_else(|e| e.into_inner()).clone())
			.collect()
	}

	/// Current theme of every cell, keyed by id.
	pub fn themes(&self) -> BTreeMap<String, String> {
		self.snapshot()
			.into_iter()
			.map(|c| (c.id.to_string(), c.theme))
			.collect()
	}

	/// Apply `f` to one cell. Returns false for ids outside the grid.
	pub fn update(&self, id: &CellId, f: impl FnOnce(&mut CellState)) -> bool {
		match self.slot(id) {
			Some(mut cell) => {
				f(&mut cell);
				true
			}
			None => false,
		}
	}

	pub fn set_theme(&self, id: &CellId, theme: &str) -> bool {
		self.update(id, |c| {
			c.theme = theme.to_string();
			c.touch();
		})
	}

	pub fn mark_spawned(&self, id: &CellId, pid: Option<u32>) {
		self.update(id, |c| {
			c.pid = pid;
			c.status = CellStatus::Active;
			c.touch();
		});
	}

	pub fn mark_output(&self, id: &CellId, tail: String) {
		self.update(id, |c| {
			c.last_output = tail;
			c.status = CellStatus::Active;
			c.touch();
		});
	}

	/// Like [`mark_output`](Self::mark_output), but only while `live` holds.
	///
	/// `live` is read under the cell lock. Whoever clears it before calling
	/// [`mark_idle`](Self::mark_idle) is therefore never overwritten. `also`
	/// runs under the same lock when the update applies.
	pub fn mark_output_while(&self, id: &CellId, live: &AtomicBool, tail: String, also: impl FnOnce()) -> bool {
		let Some(mut cell) = self.slot(id) else {
			return false;
		};
		if !live.load(Ordering::SeqCst) {
			return false;
		}
		also();
		cell.last_output = tail;
		cell.status = CellStatus::Active;
		cell.touch();
		true
	}

	pub fn mark_idle(&self, id: &CellId) {
		self.update(id, |c| {
			c.pid = None;
			c.status = CellStatus::Idle;
			c.touch();
		});
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chaos_grid_core::CellId;

/// Receives streamed session output.
///
/// Called from blocking reader threads, so implementations must not block
/// for long. Output for a given cell arrives in order.
pub trait OutputSink: Send + Sync {
	fn output(&self, cell_id: &CellId, data: &str);

	/// The session's output stream ended.
	fn exited(&self, _cell_id: &CellId, _exit_code: Option<i32>) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
	fn output(&self, _cell_id: &CellId, _data: &str) {}
}

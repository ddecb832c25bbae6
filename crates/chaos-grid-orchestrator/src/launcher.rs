// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Command injection: make sure a cell has a shell, then type a launch
//! command into it.

use std::sync::Arc;
use std::time::Duration;

use chaos_grid_core::CellId;
use tracing::{debug, info};

use crate::error::LaunchError;
use crate::registry::SessionRegistry;
use crate::sink::OutputSink;

pub const DEFAULT_TOOL_CMD: &str = "claude --dangerously-skip-permissions";
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct LaunchConfig {
	/// Used when a caller passes no tool command, or a blank one.
	pub tool_cmd: String,
	/// Time given to a freshly spawned shell before anything is typed into
	/// it. A fixed delay, not a readiness handshake.
	pub settle_delay: Duration,
	pub cols: u16,
	pub rows: u16,
}

impl Default for LaunchConfig {
	fn default() -> Self {
		Self {
			tool_cmd: DEFAULT_TOOL_CMD.to_string(),
			settle_delay: DEFAULT_SETTLE_DELAY,
			cols: DEFAULT_COLS,
			rows: DEFAULT_ROWS,
		}
	}
}

/// The line typed into a shell to start the tool, optionally in `work_dir`.
pub fn launch_command(work_dir: Option<&str>, tool_cmd: &str) -> String {
	match work_dir.map(str::trim) {
		Some(dir) if !dir.is_empty() => format!("mkdir -p {dir} && cd {dir} && {tool_cmd}\n"),
		_ => format!("{tool_cmd}\n"),
	}
}

pub struct CommandInjector {
	registry: Arc<SessionRegistry>,
	config: LaunchConfig,
	sink: Arc<dyn OutputSink>,
}

impl CommandInjector {
	pub fn new(registry: Arc<SessionRegistry>, config: LaunchConfig, sink: Arc<dyn OutputSink>) -> Self {
		Self {
			registry,
			config,
			sink,
		}
	}

	fn resolve_tool_cmd<'a>(&'a self, tool_cmd: Option<&'a str>) -> &'a str {
		match tool_cmd {
			Some(cmd) if !cmd.trim().is_empty() => cmd,
			_ => &self.config.tool_cmd,
		}
	}

	/// Spawn a session for `cell_id` if it has none, then send the launch
	/// command. Returns whether a session received the command.
	pub async fn ensure_and_launch(
		&self,
		cell_id: &CellId,
		work_dir: Option<&str>,
		tool_cmd: Option<&str>,
	) -> Result<bool, LaunchError> {
		let spawned = self
			.registry
			.ensure(cell_id, self.config.cols, self.config.rows, self.sink.clone())
			.await?;
		if spawned {
			debug!(cell_id = %cell_id, delay = ?self.config.settle_delay, "waiting for shell to settle");
			tokio::time::sleep(self.config.settle_delay).await;
		}

		let command = launch_command(work_dir, self.resolve_tool_cmd(tool_cmd));
		let delivered = self.registry.send_command(cell_id, command.as_bytes()).await?;
		info!(cell_id = %cell_id, spawned, delivered, "launch command sent");
		Ok(delivered)
	}

	/// Launch in each of `cell_ids` in order, with `work_dirs[i]` as the
	/// working directory of the `i`th cell. Stops at the first spawn failure.
	pub async fn launch_cells(
		&self,
		cell_ids: &[CellId],
		work_dirs: &[String],
		tool_cmd: Option<&str>,
	) -> Result<Vec<CellId>, LaunchError> {
		let mut launched = Vec::with_capacity(cell_ids.len());
		for (idx, cell_id) in cell_ids.iter().enumerate() {
			let work_dir = work_dirs.get(idx).map(String::as_str);
			self.ensure_and_launch(cell_id, work_dir, tool_cmd).await?;
			launched.push(cell_id.clone());
		}
		Ok(launched)
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Process backend: how a session's shell is actually started.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use chaos_grid_core::CellId;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::debug;

use crate::error::SpawnError;

/// Directories prepended to `PATH` so tools installed by common package
/// managers resolve from a login shell.
pub const PATH_PREFIX: &str = "/usr/local/bin:/opt/homebrew/bin:/usr/bin:/bin";

/// Variables removed from the inherited environment by default. These leak
/// from a parent agent session and change how a nested `claude` behaves.
pub const DEFAULT_SCRUBBED_ENV: [&str; 3] = ["CLAUDECODE", "CLAUDE_CODE_ENTRYPOINT", "npm_config_prefix"];

/// Everything needed to start one session.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
	pub cell_id: CellId,
	pub shell: String,
	pub args: Vec<String>,
	/// Complete environment; nothing else is inherited.
	pub env: Vec<(String, String)>,
	pub cwd: Option<PathBuf>,
	pub cols: u16,
	pub rows: u16,
}

/// Control side of a running session.
pub trait PtyControl: Send {
	fn write(&mut self, data: &[u8]) -> io::Result<()>;
	fn resize(&mut self, cols: u16, rows: u16) -> io::Result<()>;
	fn kill(&mut self) -> io::Result<()>;
	/// `Some(exit_code)` once the process has exited.
	fn try_wait(&mut self) -> io::Result<Option<i32>>;
}

pub struct SpawnedPty {
	pub pid: Option<u32>,
	/// Blocking output stream; returns `Ok(0)` once the process side closes.
	pub reader: Box<dyn Read + Send>,
	pub control: Box<dyn PtyControl>,
}

/// Starts processes in pseudo-terminals.
pub trait PtyBackend: Send + Sync {
	fn spawn(&self, spec: SpawnSpec) -> Result<SpawnedPty, SpawnError>;
}

/// Build the environment for a new shell from `inherited`: drop `scrub`,
/// prepend [`PATH_PREFIX`] to `PATH` and force `TERM=xterm-256color`.
pub fn sanitized_env<I>(inherited: I, scrub: &[String]) -> Vec<(String, String)>
where
	I: IntoIterator<Item = (String, String)>,
{
	let mut saw_path = false;
	let mut env: Vec<(String, String)> = inherited
		.into_iter()
		.filter(|(key, _)| !scrub.iter().any(|s| s == key) && key != "TERM")
		.map(|(key, value)| {
			if key == "PATH" {
				saw_path = true;
				let path = if value.is_empty() {
					PATH_PREFIX.to_string()
				} else {
					format!("{PATH_PREFIX}:{value}")
				};
				(key, path)
			} else {
				(key, value)
			}
		})
		.collect();

	if !saw_path {
		env.push(("PATH".to_string(), PATH_PREFIX.to_string()));
	}
	env.push(("TERM".to_string(), "xterm-256color".to_string()));
	env
}

/// The current process environment, skipping entries that are not UTF-8.
pub fn inherited_env() -> impl Iterator<Item = (String, String)> {
	std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
	PtySize {
		rows: rows.max(2),
		cols: cols.max(2),
		pixel_width: 0,
		pixel_height: 0,
	}
}

/// [`PtyBackend`] backed by the platform pty via `portable-pty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtyBackend;

impl PtyBackend for NativePtyBackend {
	fn spawn(&self, spec: SpawnSpec) -> Result<SpawnedPty, SpawnError> {
		let pty_system = native_pty_system();
		let pair = pty_system
			.openpty(pty_size(spec.cols, spec.rows))
			.map_err(|e| SpawnError::OpenPty(e.to_string()))?;

		let mut cmd = CommandBuilder::new(&spec.shell);
		cmd.args(&spec.args);
		if let Some(cwd) = &spec.cwd {
			cmd.cwd(cwd);
		}
		cmd.env_clear();
		for (key, value) in &spec.env {
			cmd.env(key, value);
		}

		let child = pair.slave.spawn_command(cmd).map_err(|e| SpawnError::Spawn {
			shell: spec.shell.clone(),
			message: e.to_string(),
		})?;
		let pid = child.process_id();

		let reader = pair
			.master
			.try_clone_reader()
			.map_err(|e| SpawnError::Reader(e.to_string()))?;
		let writer = pair
			.master
			.take_writer()
			.map_err(|e| SpawnError::Writer(e.to_string()))?;

		// The child holds its own handle to the slave side.
		drop(pair.slave);

		debug!(cell_id = %spec.cell_id, pid = ?pid, shell = %spec.shell, "spawned pty process");

		Ok(SpawnedPty {
			pid,
			reader,
			control: Box::new(NativeControl {
				master: pair.master,
				writer,
				child,
			}),
		})
	}
}

struct NativeControl {
	master: Box<dyn MasterPty + Send>,
	writer: Box<dyn Write + Send>,
	child: Box<dyn Child + Send + Sync>,
}

impl PtyControl for NativeControl {
	fn write(&mut self, data: &[u8]) -> io::Result<()> {
		self.writer.write_all(data)?;
		self.writer.flush()
	}

	fn resize(&mut self, cols: u16, rows: u16) -> io::Result<()> {
		self.master
			.resize(pty_size(cols, rows))
			.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
	}

	fn kill(&mut self) -> io::Result<()> {
		self.child.kill()
	}

	fn try_wait(&mut self) -> io::Result<Option<i32>> {
		Ok(self
			.child
			.try_wait()?
			.map(|status| status.exit_code() as i32))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	fn default_scrub() -> Vec<String> {
		DEFAULT_SCRUBBED_ENV.iter().map(|s| s.to_string()).collect()
	}

	fn get<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
		env.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	#[test]
	fn scrubbed_keys_are_removed() {
		let env = sanitized_env(
			vars(&[
				("CLAUDECODE", "1"),
				("CLAUDE_CODE_ENTRYPOINT", "cli"),
				("npm_config_prefix", "/x"),
				("HOME", "/home/u"),
			]),
			&default_scrub(),
		);
		assert_eq!(get(&env, "CLAUDECODE"), None);
		assert_eq!(get(&env, "CLAUDE_CODE_ENTRYPOINT"), None);
		assert_eq!(get(&env, "npm_config_prefix"), None);
		assert_eq!(get(&env, "HOME"), Some("/home/u"));
	}

	#[test]
	fn path_is_prefixed_and_term_forced() {
		let env = sanitized_env(vars(&[("PATH", "/home/u/bin"), ("TERM", "dumb")]), &[]);
		assert_eq!(get(&env, "PATH"), Some("/usr/local/bin:/opt/homebrew/bin:/usr/bin:/bin:/home/u/bin"));
		assert_eq!(get(&env, "TERM"), Some("xterm-256color"));
		assert_eq!(env.iter().filter(|(k, _)| k == "TERM").count(), 1);
	}

	#[test]
	fn missing_path_gets_defaults() {
		let env = sanitized_env(Vec::new(), &[]);
		assert_eq!(get(&env, "PATH"), Some(PATH_PREFIX));
	}

	#[test]
	fn size_is_clamped_to_two_by_two() {
		let size = pty_size(0, 1);
		assert_eq!((size.cols, size.rows), (2, 2));
	}
}

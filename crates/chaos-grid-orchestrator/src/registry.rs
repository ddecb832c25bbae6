// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The session registry: at most one live process per cell.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chaos_grid_core::CellId;
use chaos_grid_storage::{SnapshotWriter, SNAPSHOT_RETAIN_BYTES};
use tokio::runtime::Handle;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::buffer::{OutputBuffer, Utf8Decoder};
use crate::cells::CellStore;
use crate::error::{SessionError, SpawnError};
use crate::pty::{inherited_env, sanitized_env, PtyBackend, PtyControl, SpawnSpec, DEFAULT_SCRUBBED_ENV};
use crate::sink::OutputSink;

const READ_CHUNK: usize = 4096;

/// How new shells are started.
#[derive(Debug, Clone)]
pub struct ShellConfig {
	pub shell: String,
	/// `-l` starts a login shell so profile scripts (nvm, rbenv, ...) run.
	pub args: Vec<String>,
	pub scrub_env: Vec<String>,
	/// Working directory; `None` lets the backend decide.
	pub cwd: Option<PathBuf>,
}

impl Default for ShellConfig {
	fn default() -> Self {
		Self {
			shell: std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string()),
			args: vec!["-l".to_string()],
			scrub_env: DEFAULT_SCRUBBED_ENV.iter().map(|s| s.to_string()).collect(),
			cwd: dirs::home_dir(),
		}
	}
}

type SessionMap = Arc<RwLock<HashMap<CellId, Arc<Session>>>>;

struct Session {
	generation: u64,
	pid: Option<u32>,
	/// Cleared when the session is replaced or killed; its reader then stops
	/// publishing.
	live: Arc<AtomicBool>,
	control: Mutex<Box<dyn PtyControl>>,
	buffer: Arc<OutputBuffer>,
}

impl Session {
	async fn terminate(&self, cell_id: &CellId) {
		self.live.store(false, Ordering::SeqCst);
		let mut control = self.control.lock().await;
		if let Err(e) = control.kill() {
			debug!(cell_id = %cell_id, generation = self.generation, error = %e, "kill failed, process likely gone");
		}
	}
}

/// Owns every live session, keyed by cell id.
///
/// Lifecycle changes to one cell (spawn, ensure, kill) are serialized by a
/// per-cell lock, so starting a shell never blocks I/O on other cells.
pub struct SessionRegistry {
	backend: Arc<dyn PtyBackend>,
	shell: ShellConfig,
	cells: Arc<CellStore>,
	snapshots: Option<SnapshotWriter>,
	sessions: SessionMap,
	lifecycle: StdMutex<HashMap<CellId, Arc<Mutex<()>>>>,
	next_generation: AtomicU64,
}

impl SessionRegistry {
	pub fn new(
		backend: Arc<dyn PtyBackend>,
		shell: ShellConfig,
		cells: Arc<CellStore>,
		snapshots: Option<SnapshotWriter>,
	) -> Self {
		Self {
			backend,
			shell,
			cells,
			snapshots,
			sessions: Arc::new(RwLock::new(HashMap::new())),
			lifecycle: StdMutex::new(HashMap::new()),
			next_generation: AtomicU64::new(1),
		}
	}

	fn lifecycle_lock(&self, cell_id: &CellId) -> Arc<Mutex<()>> {
		let mut locks = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
		locks.entry(cell_id.clone()).or_default().clone()
	}

	/// Start a fresh session for `cell_id`, terminating any existing one
	/// first. Returns the OS pid when the platform reports one.
	pub async fn spawn(
		&self,
		cell_id: &CellId,
		cols: u16,
		rows: u16,
		sink: Arc<dyn OutputSink>,
	) -> Result<Option<u32>, SpawnError> {
		let lock = self.lifecycle_lock(cell_id);
		let _lifecycle = lock.lock().await;

		let old = self.sessions.write().await.remove(cell_id);
		if let Some(old) = old {
			info!(cell_id = %cell_id, generation = old.generation, "replacing existing session");
			old.terminate(cell_id).await;
			self.cells.mark_idle(cell_id);
		}

		self.start(cell_id, cols, rows, sink).await
	}

	/// Spawn only if `cell_id` has no session. Returns whether one was started.
	pub async fn ensure(
		&self,
		cell_id: &CellId,
		cols: u16,
		rows: u16,
		sink: Arc<dyn OutputSink>,
	) -> Result<bool, SpawnError> {
		let lock = self.lifecycle_lock(cell_id);
		let _lifecycle = lock.lock().await;

		if self.exists(cell_id).await {
			return Ok(false);
		}
		self.start(cell_id, cols, rows, sink).await?;
		Ok(true)
	}

	/// Caller holds the cell's lifecycle lock.
	async fn start(
		&self,
		cell_id: &CellId,
		cols: u16,
		rows: u16,
		sink: Arc<dyn OutputSink>,
	) -> Result<Option<u32>, SpawnError> {
		let spec = SpawnSpec {
			cell_id: cell_id.clone(),
			shell: self.shell.shell.clone(),
			args: self.shell.args.clone(),
			env: sanitized_env(inherited_env(), &self.shell.scrub_env),
			cwd: self.shell.cwd.clone(),
			cols,
			rows,
		};
		let shell = spec.shell.clone();

		// openpty and fork block; keep them off the runtime workers.
		let backend = self.backend.clone();
		let spawned = tokio::task::spawn_blocking(move || backend.spawn(spec))
			.await
			.map_err(|e| SpawnError::Spawn {
				shell,
				message: e.to_string(),
			})??;
		let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

		let session = Arc::new(Session {
			generation,
			pid: spawned.pid,
			live: Arc::new(AtomicBool::new(true)),
			control: Mutex::new(spawned.control),
			buffer: Arc::new(OutputBuffer::with_retention(SNAPSHOT_RETAIN_BYTES)),
		});

		// Held until the session is registered, so a reader that ends at once
		// still finds its own generation when it reaps.
		let mut sessions = self.sessions.write().await;

		let reader = OutputReader {
			cell_id: cell_id.clone(),
			generation,
			live: session.live.clone(),
			buffer: session.buffer.clone(),
			cells: self.cells.clone(),
			snapshots: self.snapshots.clone(),
			sink,
			sessions: self.sessions.clone(),
			runtime: Handle::current(),
		};
		let thread = std::thread::Builder::new()
			.name(format!("pty-reader-{cell_id}"))
			.spawn(move || reader.run(spawned.reader));
		if let Err(e) = thread {
			session.live.store(false, Ordering::SeqCst);
			if let Ok(mut control) = session.control.try_lock() {
				let _ = control.kill();
			}
			return Err(SpawnError::Reader(e.to_string()));
		}

		sessions.insert(cell_id.clone(), session);
		self.cells.mark_spawned(cell_id, spawned.pid);

		info!(cell_id = %cell_id, pid = ?spawned.pid, generation, cols, rows, "session spawned");
		Ok(spawned.pid)
	}

	async fn get(&self, cell_id: &CellId) -> Option<Arc<Session>> {
		self.sessions.read().await.get(cell_id).cloned()
	}

	/// Forward raw input. A missing session is a no-op.
	pub async fn write(&self, cell_id: &CellId, data: &[u8]) -> Result<(), SessionError> {
		self.send_command(cell_id, data).await.map(|_| ())
	}

	/// Write `data` to the session input, returning whether a session received it.
	pub async fn send_command(&self, cell_id: &CellId, data: &[u8]) -> Result<bool, SessionError> {
		let Some(session) = self.get(cell_id).await else {
			debug!(cell_id = %cell_id, "write to absent session ignored");
			return Ok(false);
		};
		let mut control = session.control.lock().await;
		control.write(data).map_err(|source| SessionError::Io {
			cell_id: cell_id.clone(),
			source,
		})?;
		Ok(true)
	}

	/// Propagate a new geometry (at least 2 × 2). A missing session is a no-op.
	pub async fn resize(&self, cell_id: &CellId, cols: u16, rows: u16) -> Result<(), SessionError> {
		let Some(session) = self.get(cell_id).await else {
			return Ok(());
		};
		let mut control = session.control.lock().await;
		control
			.resize(cols.max(2), rows.max(2))
			.map_err(|source| SessionError::Io {
				cell_id: cell_id.clone(),
				source,
			})
	}

	/// Terminate and forget the session. Idempotent.
	pub async fn kill(&self, cell_id: &CellId) {
		let lock = self.lifecycle_lock(cell_id);
		let _lifecycle = lock.lock().await;
		self.kill_locked(cell_id).await;
	}

	async fn kill_locked(&self, cell_id: &CellId) -> bool {
		let removed = self.sessions.write().await.remove(cell_id);
		match removed {
			Some(session) => {
				session.terminate(cell_id).await;
				self.cells.mark_idle(cell_id);
				info!(cell_id = %cell_id, generation = session.generation, "session killed");
				true
			}
			None => false,
		}
	}

	/// Kill every session, returning the ids that were live, in grid order.
	pub async fn kill_all(&self) -> Vec<CellId> {
		let mut ids: Vec<CellId> = self
			.lifecycle
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.keys()
			.cloned()
			.collect();
		ids.sort_by_key(|id| id.index());

		let mut killed = Vec::new();
		for cell_id in ids {
			let lock = self.lifecycle_lock(&cell_id);
			let _lifecycle = lock.lock().await;
			if self.kill_locked(&cell_id).await {
				killed.push(cell_id);
			}
		}
		info!(count = killed.len(), "all sessions killed");
		killed
	}

	pub async fn exists(&self, cell_id: &CellId) -> bool {
		self.sessions.read().await.contains_key(cell_id)
	}

	pub async fn pid(&self, cell_id: &CellId) -> Option<u32> {
		self.get(cell_id).await.and_then(|s| s.pid)
	}

	/// Last `n` bytes of the live session's buffer.
	pub async fn tail(&self, cell_id: &CellId, n: usize) -> Option<String> {
		self.get(cell_id).await.map(|s| s.buffer.tail(n))
	}

	pub async fn live_count(&self) -> usize {
		self.sessions.read().await.len()
	}
}

/// State moved onto a session's blocking reader thread.
struct OutputReader {
	cell_id: CellId,
	generation: u64,
	live: Arc<AtomicBool>,
	buffer: Arc<OutputBuffer>,
	cells: Arc<CellStore>,
	snapshots: Option<SnapshotWriter>,
	sink: Arc<dyn OutputSink>,
	sessions: SessionMap,
	runtime: Handle,
}

impl OutputReader {
	fn run(self, mut reader: Box<dyn Read + Send>) {
		let mut decoder = Utf8Decoder::new();
		let mut buf = [0u8; READ_CHUNK];

		loop {
			match reader.read(&mut buf) {
				Ok(0) => break,
				Ok(n) => {
					let text = decoder.decode(&buf[..n]);
					self.publish(&text);
				}
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
				Err(e) => {
					// EIO is how Linux reports the slave side closing.
					debug!(cell_id = %self.cell_id, error = %e, "pty read ended");
					break;
				}
			}
		}
		let rest = decoder.finish();
		self.publish(&rest);

		debug!(cell_id = %self.cell_id, generation = self.generation, "output stream ended");
		self.runtime.spawn(reap(
			self.cell_id,
			self.generation,
			self.sessions,
			self.cells,
			self.sink,
		));
	}

	fn publish(&self, text: &str) {
		if text.is_empty() {
			return;
		}
		let display = self.buffer.append(text);
		let persisted = self.buffer.tail(SNAPSHOT_RETAIN_BYTES);

		// Kill and respawn clear `live` before marking the cell idle, and the
		// check happens under the cell lock, so a late chunk cannot revive it.
		let applied = self.cells.mark_output_while(&self.cell_id, &self.live, display, || {
			if let Some(snapshots) = &self.snapshots {
				snapshots.record(&self.cell_id, &persisted);
			}
		});
		if applied {
			self.sink.output(&self.cell_id, text);
		}
	}
}

/// Remove a session whose output ended, unless it has already been replaced.
async fn reap(
	cell_id: CellId,
	generation: u64,
	sessions: SessionMap,
	cells: Arc<CellStore>,
	sink: Arc<dyn OutputSink>,
) {
	let mut exit_code = None;
	{
		let mut sessions = sessions.write().await;
		let current = matches!(sessions.get(&cell_id), Some(s) if s.generation == generation);
		if current {
			if let Some(session) = sessions.remove(&cell_id) {
				session.live.store(false, Ordering::SeqCst);
				let mut control = session.control.lock().await;
				exit_code = match control.try_wait() {
					Ok(Some(code)) => Some(code),
					Ok(None) => {
						// Stream closed but the process lingers; don't leave it orphaned.
						let _ = control.kill();
						None
					}
					Err(e) => {
						warn!(cell_id = %cell_id, error = %e, "failed to collect exit status");
						None
					}
				};
			}
			cells.mark_idle(&cell_id);
			info!(cell_id = %cell_id, generation, exit_code = ?exit_code, "session exited");
		} else {
			debug!(cell_id = %cell_id, generation, "stale reader finished, session already replaced");
		}
	}
	sink.exited(&cell_id, exit_code);
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory process backend, sinks and model clients for tests.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chaos_grid_core::{CellId, ModelClient, ModelError};

use crate::error::SpawnError;
use crate::pty::{PtyBackend, PtyControl, SpawnSpec, SpawnedPty};
use crate::sink::OutputSink;

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn wait_until(cond: impl Fn() -> bool) {
	for _ in 0..200 {
		if cond() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("condition not met within 2s");
}

/// One fake process started by [`MockBackend`].
pub struct MockProcess {
	spec: SpawnSpec,
	pid: u32,
	alive: AtomicBool,
	exit_code: Mutex<Option<i32>>,
	written: Mutex<Vec<u8>>,
	size: Mutex<(u16, u16)>,
	output: Mutex<Option<Sender<Vec<u8>>>>,
}

impl MockProcess {
	pub fn spec(&self) -> SpawnSpec {
		self.spec.clone()
	}

	pub fn pid(&self) -> Option<u32> {
		Some(self.pid)
	}

	pub fn is_alive(&self) -> bool {
		self.alive.load(Ordering::SeqCst)
	}

	pub fn written(&self) -> String {
		String::from_utf8_lossy(&self.written.lock().unwrap()).into_owned()
	}

	pub fn size(&self) -> (u16, u16) {
		*self.size.lock().unwrap()
	}

	/// Make the process print `data`.
	pub fn emit(&self, data: &str) {
		if let Some(tx) = self.output.lock().unwrap().as_ref() {
			let _ = tx.send(data.as_bytes().to_vec());
		}
	}

	/// Make the process exit on its own.
	pub fn exit(&self, code: i32) {
		*self.exit_code.lock().unwrap() = Some(code);
		self.stop();
	}

	fn stop(&self) {
		self.alive.store(false, Ordering::SeqCst);
		self.output.lock().unwrap().take();
	}
}

struct MockReader {
	rx: Receiver<Vec<u8>>,
	pending: Vec<u8>,
}

impl Read for MockReader {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if self.pending.is_empty() {
			match self.rx.recv() {
				Ok(chunk) => self.pending = chunk,
				Err(_) => return Ok(0),
			}
		}
		let n = buf.len().min(self.pending.len());
		buf[..n].copy_from_slice(&self.pending[..n]);
		self.pending.drain(..n);
		Ok(n)
	}
}

struct MockControl {
	process: Arc<MockProcess>,
}

impl PtyControl for MockControl {
	fn write(&mut self, data: &[u8]) -> io::Result<()> {
		if !self.process.is_alive() {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, "process exited"));
		}
		self.process.written.lock().unwrap().extend_from_slice(data);
		Ok(())
	}

	fn resize(&mut self, cols: u16, rows: u16) -> io::Result<()> {
		*self.process.size.lock().unwrap() = (cols, rows);
		Ok(())
	}

	fn kill(&mut self) -> io::Result<()> {
		self.process.stop();
		Ok(())
	}

	fn try_wait(&mut self) -> io::Result<Option<i32>> {
		if self.process.is_alive() {
			Ok(None)
		} else {
			Ok(Some(self.process.exit_code.lock().unwrap().unwrap_or(-1)))
		}
	}
}

/// Records every spawn so tests can assert on process ownership.
#[derive(Default)]
pub struct MockBackend {
	processes: Mutex<Vec<Arc<MockProcess>>>,
	next_pid: AtomicU32,
	fail_next: AtomicBool,
}

impl MockBackend {
	pub fn fail_next_spawn(&self) {
		self.fail_next.store(true, Ordering::SeqCst);
	}

	pub fn spawn_count(&self) -> usize {
		self.processes.lock().unwrap().len()
	}

	/// The `n`th process spawned, across all cells.
	pub fn process(&self, n: usize) -> Arc<MockProcess> {
		self.processes.lock().unwrap()[n].clone()
	}

	pub fn processes_for(&self, cell_id: &CellId) -> Vec<Arc<MockProcess>> {
		self.processes
			.lock()
			.unwrap()
			.iter()
			.filter(|p| &p.spec.cell_id == cell_id)
			.cloned()
			.collect()
	}

	pub fn live_for(&self, cell_id: &CellId) -> usize {
		self.processes_for(cell_id)
			.iter()
			.filter(|p| p.is_alive())
			.count()
	}

	pub fn live_total(&self) -> usize {
		self.processes
			.lock()
			.unwrap()
			.iter()
			.filter(|p| p.is_alive())
			.count()
	}
}

impl PtyBackend for MockBackend {
	fn spawn(&self, spec: SpawnSpec) -> Result<SpawnedPty, SpawnError> {
		if self.fail_next.swap(false, Ordering::SeqCst) {
			return Err(SpawnError::Spawn {
				shell: spec.shell,
				message: "No such file or directory".to_string(),
			});
		}
		// One live process per cell, ever.
		assert_eq!(self.live_for(&spec.cell_id), 0, "spawned over a live process");

		let (tx, rx) = mpsc::channel();
		let process = Arc::new(MockProcess {
			size: Mutex::new((spec.cols, spec.rows)),
			spec,
			pid: 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst),
			alive: AtomicBool::new(true),
			exit_code: Mutex::new(None),
			written: Mutex::new(Vec::new()),
			output: Mutex::new(Some(tx)),
		});
		self.processes.lock().unwrap().push(process.clone());

		Ok(SpawnedPty {
			pid: Some(process.pid),
			reader: Box::new(MockReader {
				rx,
				pending: Vec::new(),
			}),
			control: Box::new(MockControl { process }),
		})
	}
}

/// Collects everything sent to it.
#[derive(Default)]
pub struct RecordingSink {
	output: Mutex<Vec<(CellId, String)>>,
	exits: Mutex<Vec<(CellId, Option<i32>)>>,
}

impl RecordingSink {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn output_for(&self, cell_id: &CellId) -> String {
		self.output
			.lock()
			.unwrap()
			.iter()
			.filter(|(id, _)| id == cell_id)
			.map(|(_, data)| data.as_str())
			.collect()
	}

	pub fn exits(&self) -> Vec<(CellId, Option<i32>)> {
		self.exits.lock().unwrap().clone()
	}
}

impl OutputSink for RecordingSink {
	fn output(&self, cell_id: &CellId, data: &str) {
		self.output
			.lock()
			.unwrap()
			.push((cell_id.clone(), data.to_string()));
	}

	fn exited(&self, cell_id: &CellId, exit_code: Option<i32>) {
		self.exits.lock().unwrap().push((cell_id.clone(), exit_code));
	}
}

/// Model client returning a canned response and counting calls.
pub struct CannedModel {
	response: Result<String, ModelError>,
	calls: AtomicUsize,
	prompts: Mutex<Vec<String>>,
}

impl CannedModel {
	pub fn replying(text: &str) -> Arc<Self> {
		Arc::new(Self {
			response: Ok(text.to_string()),
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
		})
	}

	pub fn failing(error: ModelError) -> Arc<Self> {
		Arc::new(Self {
			response: Err(error),
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
		})
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_prompt(&self) -> Option<String> {
		self.prompts.lock().unwrap().last().cloned()
	}
}

#[async_trait]
impl ModelClient for CannedModel {
	async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.prompts.lock().unwrap().push(prompt.to_string());
		self.response.clone()
	}
}

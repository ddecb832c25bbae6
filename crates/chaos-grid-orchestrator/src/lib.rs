// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session orchestration for Chaos Grid.
//!
//! Each grid cell is backed by at most one PTY shell. The [`SessionRegistry`]
//! owns those processes and streams their output into per-cell buffers and
//! the [`CellStore`]; the [`CommandInjector`] types launch commands into
//! them; the [`analysis`] module periodically batches every active cell
//! into one model call. [`Orchestrator`] wires all of it together.

pub mod analysis;
pub mod buffer;
pub mod cells;
pub mod error;
pub mod launcher;
pub mod orchestrator;
pub mod pty;
pub mod registry;
pub mod sink;

#[cfg(test)]
mod testing;

pub use analysis::{gemini_factory, AnalysisConfig, Aggregator, LazyModelClient};
pub use buffer::{OutputBuffer, OUTPUT_CAP};
pub use cells::CellStore;
pub use error::{AnalysisError, ExtractError, LaunchError, SessionError, SpawnError};
pub use launcher::{CommandInjector, LaunchConfig};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use pty::{NativePtyBackend, PtyBackend, PtyControl, SpawnSpec, SpawnedPty};
pub use registry::{SessionRegistry, ShellConfig};
pub use sink::{NullSink, OutputSink};

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Instant;

use chaos_grid_core::{AnalysisMode, AnalysisResult, CellState, HistoryEntry};
use chaos_grid_storage::HistoryStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::LazyModelClient;
use super::extract::parse_response;
use super::prompt::build_prompt;
use crate::cells::CellStore;
use crate::error::{AnalysisError, ExtractError};

pub const DEFAULT_HISTORY_WINDOW: usize = 5;
pub const DEFAULT_LANGUAGE: &str = "English";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
	pub mode: AnalysisMode,
	/// Number of past analyses rendered into the prompt.
	pub history_window: usize,
	/// Answer language when the caller gives none.
	pub language: String,
}

impl Default for AnalysisConfig {
	fn default() -> Self {
		Self {
			mode: AnalysisMode::default(),
			history_window: DEFAULT_HISTORY_WINDOW,
			language: DEFAULT_LANGUAGE.to_string(),
		}
	}
}

/// Batches every active cell into one model call and records the outcome.
pub struct Aggregator {
	cells: Arc<CellStore>,
	history: Arc<HistoryStore>,
	client: LazyModelClient,
	config: AnalysisConfig,
	// Serializes analyses so history appends never interleave.
	gate: Mutex<()>,
}

impl Aggregator {
	pub fn new(
		cells: Arc<CellStore>,
		history: Arc<HistoryStore>,
		client: LazyModelClient,
		config: AnalysisConfig,
	) -> Self {
		Self {
			cells,
			history,
			client,
			config,
			gate: Mutex::new(()),
		}
	}

	pub fn config(&self) -> &AnalysisConfig {
		&self.config
	}

	/// Run one analysis. Calls queue behind each other.
	///
	/// With no active cells this returns the empty result without touching
	/// the model. An unusable model response also yields the empty result
	/// and leaves history alone.
	pub async fn analyze(&self, language: Option<&str>) -> Result<AnalysisResult, AnalysisError> {
		let _gate = self.gate.lock().await;
		let started = Instant::now();

		let active: Vec<CellState> = self
			.cells
			.snapshot()
			.into_iter()
			.filter(CellState::has_output)
			.collect();
		if active.is_empty() {
			debug!("no active cells, skipping analysis");
			return Ok(AnalysisResult::empty());
		}

		let history = match self.history.recent(self.config.history_window).await {
			Ok(entries) => entries,
			Err(e) => {
				warn!(error = %e, "failed to load analysis history, continuing without it");
				Vec::new()
			}
		};

		let language = match language.map(str::trim) {
			Some(lang) if !lang.is_empty() => lang,
			_ => self.config.language.as_str(),
		};
		let prompt = build_prompt(self.config.mode, self.cells.layout(), &active, &history, language);

		let client = self.client.get().await?;
		let response = client.generate(&prompt).await?;

		let result = match parse_response(&response) {
			Ok(result) => result,
			Err(ExtractError::NotFound) => {
				warn!(response_len = response.len(), "model response held no JSON object");
				return Ok(AnalysisResult::empty());
			}
			Err(ExtractError::Malformed(e)) => {
				warn!(error = %e, "model response held malformed JSON");
				return Ok(AnalysisResult::empty());
			}
		};

		// Themes as they are now, after the model call, not at prompt time.
		let entry = HistoryEntry::from_result(&result, self.cells.themes());
		if let Err(e) = self.history.append(entry).await {
			warn!(error = %e, "failed to persist analysis history");
		}

		info!(
			active_cells = active.len(),
			summaries = result.summaries.len(),
			ideas = result.ideas.len(),
			model = client.model_name(),
			elapsed = ?started.elapsed(),
			"analysis completed"
		);
		Ok(result)
	}
}

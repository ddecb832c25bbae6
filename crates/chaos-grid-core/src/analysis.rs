// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the aggregator frames the active cells in its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
	/// Cells grouped by role, with a Stimulus → Will → Supply flow report.
	#[default]
	Flow,
	/// Cells listed uniformly; summaries and ideas only.
	Uniform,
}

impl FromStr for AnalysisMode {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"flow" => Ok(AnalysisMode::Flow),
			"uniform" => Ok(AnalysisMode::Uniform),
			_ => Err(ConfigError::InvalidValue {
				key: "analysis_mode".to_string(),
				message: format!("unknown analysis mode '{s}', expected 'flow' or 'uniform'"),
			}),
		}
	}
}

/// Health of the Stimulus → Will → Supply flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAnalysis {
	pub stimuli_to_will: String,
	pub will_to_supply: String,
	pub stuck: String,
	pub next: String,
}

/// Outcome of one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
	#[serde(default)]
	pub summaries: BTreeMap<String, String>,
	#[serde(default)]
	pub ideas: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub flow: Option<FlowAnalysis>,
}

impl AnalysisResult {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.summaries.is_empty() && self.ideas.is_empty() && self.flow.is_none()
	}
}

/// One persisted analysis, with the cell themes that were current at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
	pub timestamp: DateTime<Utc>,
	#[serde(default)]
	pub summaries: BTreeMap<String, String>,
	#[serde(default)]
	pub themes: BTreeMap<String, String>,
	#[serde(default)]
	pub ideas: Vec<String>,
}

impl HistoryEntry {
	pub fn from_result(result: &AnalysisResult, themes: BTreeMap<String, String>) -> Self {
		Self {
			timestamp: Utc::now(),
			summaries: result.summaries.clone(),
			themes,
			ideas: result.ideas.clone(),
		}
	}

	/// Display label for a cell: its theme at the time, else the raw id.
	pub fn label_for<'a>(&'a self, cell_id: &'a str) -> &'a str {
		match self.themes.get(cell_id) {
			Some(theme) if !theme.trim().is_empty() => theme,
			_ => cell_id,
		}
	}
}

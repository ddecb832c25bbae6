// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Pulling a structured result out of free-form model text.

use std::collections::BTreeMap;

use chaos_grid_core::{AnalysisResult, FlowAnalysis};
use serde_json::Value;

use crate::error::ExtractError;

/// The span from the first `{` to the last `}`, inclusive.
pub fn json_span(text: &str) -> Result<&str, ExtractError> {
	let start = text.find('{').ok_or(ExtractError::NotFound)?;
	let end = text.rfind('}').ok_or(ExtractError::NotFound)?;
	if end <= start {
		return Err(ExtractError::NotFound);
	}
	Ok(&text[start..=end])
}

/// Parse a model response. Missing or wrongly-typed fields fall back to
/// their empty values; `flow` survives only if all four fields are strings.
pub fn parse_response(text: &str) -> Result<AnalysisResult, ExtractError> {
	let value: Value = serde_json::from_str(json_span(text)?)?;

	let summaries = value
		.get("summaries")
		.and_then(|v| serde_json::from_value::<BTreeMap<String, String>>(v.clone()).ok())
		.unwrap_or_default();

	let ideas = value
		.get("ideas")
		.and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
		.unwrap_or_default();

	let flow = value.get("flow").and_then(parse_flow);

	Ok(AnalysisResult {
		summaries,
		ideas,
		flow,
	})
}

fn parse_flow(v: &Value) -> Option<FlowAnalysis> {
	let field = |name: &str| v.get(name)?.as_str().map(str::to_string);
	Some(FlowAnalysis {
		stimuli_to_will: field("stimuli_to_will")?,
		will_to_supply: field("will_to_supply")?,
		stuck: field("stuck")?,
		next: field("next")?,
	})
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gemini API types and conversions.

use chaos_grid_core::{ModelError, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
	pub api_key: SecretString,
	/// Model name (e.g., "gemini-2.5-flash").
	pub model: String,
	pub base_url: String,
}

impl GeminiConfig {
	pub fn new(api_key: SecretString) -> Self {
		Self {
			api_key,
			model: DEFAULT_MODEL.to_string(),
			base_url: DEFAULT_BASE_URL.to_string(),
		}
	}

	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.model = model.into();
		self
	}

	/// Sets a custom base URL.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}
}

/// generateContent request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
	pub contents: Vec<GeminiContent>,
}

impl GeminiRequest {
	/// A single user turn carrying `prompt`.
	pub fn from_prompt(prompt: &str) -> Self {
		Self {
			contents: vec![GeminiContent {
				role: Some("user".to_string()),
				parts: vec![GeminiPart {
					text: Some(prompt.to_string()),
				}],
			}],
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
	/// "user" or "model".
	#[serde(skip_serializing_if = "Option::is_none")]
	pub role: Option<String>,
	#[serde(default)]
	pub parts: Vec<GeminiPart>,
}

/// A content part. Non-text parts deserialize with `text: None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
	#[serde(default)]
	pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
	pub content: Option<GeminiContent>,
	/// Finish reason (e.g., "STOP", "MAX_TOKENS").
	pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiError {
	pub error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorDetail {
	pub message: String,
	/// e.g. "INVALID_ARGUMENT".
	pub status: Option<String>,
}

impl GeminiErrorDetail {
	pub fn describe(&self) -> String {
		match &self.status {
			Some(status) => format!("{status}: {}", self.message),
			None => self.message.clone(),
		}
	}
}

impl GeminiResponse {
	/// Concatenated text of the first candidate.
	pub fn into_text(self) -> Result<String, ModelError> {
		let candidate = self
			.candidates
			.into_iter()
			.next()
			.ok_or_else(|| ModelError::InvalidResponse("Gemini response had no candidates".to_string()))?;

		let text: String = candidate
			.content
			.map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
			.unwrap_or_default();
		if text.is_empty() {
			warn!(finish_reason = ?candidate.finish_reason, "Gemini candidate carried no text");
		}

		Ok(text)
	}
}

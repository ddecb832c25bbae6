// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gemini client implementation.

use std::time::Duration;

use async_trait::async_trait;
use chaos_grid_core::{ModelClient, ModelError};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument, trace};

use crate::types::{GeminiConfig, GeminiError, GeminiRequest, GeminiResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the Gemini `generateContent` endpoint, authenticated with an
/// API key.
#[derive(Clone)]
pub struct GeminiClient {
	config: GeminiConfig,
	http_client: Client,
}

impl std::fmt::Debug for GeminiClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GeminiClient")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl GeminiClient {
	pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
		let http_client = Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| ModelError::Http(format!("Failed to create HTTP client: {e}")))?;

		info!(model = %config.model, "Initialized Gemini client");

		Ok(Self {
			config,
			http_client,
		})
	}

	fn generate_content_url(&self) -> String {
		format!(
			"{}/models/{}:generateContent",
			self.config.base_url.trim_end_matches('/'),
			self.config.model
		)
	}

	async fn send_request(&self, request: &GeminiRequest) -> Result<reqwest::Response, ModelError> {
		let url = self.generate_content_url();
		debug!(url = %url, "Sending request to Gemini");
		trace!(request = ?request, "Request payload");

		let response = self
			.http_client
			.post(&url)
			.header("x-goog-api-key", self.config.api_key.expose())
			.json(request)
			.send()
			.await
			.map_err(|e| {
				error!(error = %e, "HTTP request failed");
				if e.is_timeout() {
					ModelError::Timeout
				} else {
					ModelError::Http(e.to_string())
				}
			})?;

		let status = response.status();
		debug!(status = %status, "Received response");

		if status == StatusCode::TOO_MANY_REQUESTS {
			let retry_after_secs = response
				.headers()
				.get(reqwest::header::RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|v| v.parse().ok());
			return Err(ModelError::RateLimited { retry_after_secs });
		}

		if !status.is_success() {
			let error_body = response.text().await.unwrap_or_default();
			error!(status = %status, body = %error_body, "API error response");

			let message = match serde_json::from_str::<GeminiError>(&error_body) {
				Ok(api_error) => api_error.error.describe(),
				Err(_) => error_body,
			};
			return Err(ModelError::Api(format!("{status}: {message}")));
		}

		Ok(response)
	}
}

#[async_trait]
impl ModelClient for GeminiClient {
	#[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_bytes = prompt.len()))]
	async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
		let request = GeminiRequest::from_prompt(prompt);
		let response = self.send_request(&request).await?;

		let body = response.text().await.map_err(|e| {
			error!(error = %e, "Failed to read response body");
			ModelError::Http(e.to_string())
		})?;
		trace!(body = %body, "Response body");

		let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
			error!(error = %e, "Failed to parse response");
			ModelError::InvalidResponse(format!("Failed to parse response: {e}"))
		})?;

		let text = parsed.into_text()?;
		info!(response_bytes = text.len(), "Gemini request finished");
		Ok(text)
	}

	fn model_name(&self) -> &str {
		&self.config.model
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::ModelError;

/// A text-in, text-out language model.
///
/// The aggregator calls `generate` exactly once per analysis pass and parses
/// the structured result out of the returned text itself.
#[async_trait]
pub trait ModelClient: Send + Sync {
	async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

	/// Model identifier, for logs.
	fn model_name(&self) -> &str {
		"unknown"
	}
}

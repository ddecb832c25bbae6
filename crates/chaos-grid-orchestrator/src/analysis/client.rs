// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use chaos_grid_core::{load_secret_env, ConfigError, ModelClient};
use chaos_grid_gemini::{GeminiClient, GeminiConfig};
use tokio::sync::OnceCell;
use tracing::info;

/// Environment variable holding the Gemini API key (or `..._FILE`).
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub type ClientFactory = Box<dyn Fn() -> Result<Arc<dyn ModelClient>, ConfigError> + Send + Sync>;

/// A model client built on first use.
///
/// Configuration problems surface from [`get`](Self::get) instead of at
/// startup, so the rest of the system works without a credential. A failed
/// construction is not cached.
pub struct LazyModelClient {
	cell: OnceCell<Arc<dyn ModelClient>>,
	factory: ClientFactory,
}

impl LazyModelClient {
	pub fn new(factory: ClientFactory) -> Self {
		Self {
			cell: OnceCell::new(),
			factory,
		}
	}

	/// Already-built client.
	pub fn ready(client: Arc<dyn ModelClient>) -> Self {
		Self {
			cell: OnceCell::new_with(Some(client)),
			factory: Box::new(|| -> Result<Arc<dyn ModelClient>, ConfigError> {
				Err(ConfigError::InvalidValue {
					key: "model_client".to_string(),
					message: "client was provided pre-built".to_string(),
				})
			}),
		}
	}

	pub async fn get(&self) -> Result<Arc<dyn ModelClient>, ConfigError> {
		self.cell
			.get_or_try_init(|| async { (self.factory)() })
			.await
			.cloned()
	}
}

/// Builds a [`GeminiClient`] from `GEMINI_API_KEY` / `GEMINI_API_KEY_FILE`.
pub fn gemini_factory(model: String) -> ClientFactory {
	gemini_factory_from(GEMINI_API_KEY_ENV, model)
}

fn gemini_factory_from(key_var: &'static str, model: String) -> ClientFactory {
	Box::new(move || -> Result<Arc<dyn ModelClient>, ConfigError> {
		let api_key = load_secret_env(key_var)?
			.ok_or_else(|| ConfigError::MissingCredential(format!("set {key_var} or {key_var}_FILE")))?;
		let client = GeminiClient::new(GeminiConfig::new(api_key).with_model(model.clone())).map_err(|e| {
			ConfigError::InvalidValue {
				key: "gemini_client".to_string(),
				message: e.to_string(),
			}
		})?;
		info!(model = %model, "model client ready");
		Ok(Arc::new(client) as Arc<dyn ModelClient>)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::CannedModel;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[tokio::test]
	async fn missing_key_is_config_error() {
		let lazy = LazyModelClient::new(gemini_factory_from(
			"CHAOS_GRID_TEST_ABSENT_GEMINI_KEY",
			"gemini-2.5-flash".to_string(),
		));
		let err = lazy.get().await.err().unwrap();
		assert!(matches!(err, ConfigError::MissingCredential(_)));
	}

	#[tokio::test]
	async fn key_from_env_builds_client() {
		std::env::set_var("CHAOS_GRID_TEST_PRESENT_GEMINI_KEY", "k");
		let lazy = LazyModelClient::new(gemini_factory_from(
			"CHAOS_GRID_TEST_PRESENT_GEMINI_KEY",
			"gemini-2.0-flash".to_string(),
		));
		let client = lazy.get().await.unwrap();
		assert_eq!(client.model_name(), "gemini-2.0-flash");
		std::env::remove_var("CHAOS_GRID_TEST_PRESENT_GEMINI_KEY");
	}

	#[tokio::test]
	async fn factory_runs_once_after_success() {
		let built = Arc::new(AtomicUsize::new(0));
		let counter = built.clone();
		let lazy = LazyModelClient::new(Box::new(move || -> Result<Arc<dyn ModelClient>, ConfigError> {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(CannedModel::replying("{}") as Arc<dyn ModelClient>)
		}));

		lazy.get().await.unwrap();
		lazy.get().await.unwrap();
		assert_eq!(built.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn failure_is_retried_on_next_use() {
		let attempts = Arc::new(AtomicUsize::new(0));
		let counter = attempts.clone();
		let lazy = LazyModelClient::new(Box::new(move || -> Result<Arc<dyn ModelClient>, ConfigError> {
			if counter.fetch_add(1, Ordering::SeqCst) == 0 {
				Err(ConfigError::MissingCredential("first try".to_string()))
			} else {
				Ok(CannedModel::replying("{}") as Arc<dyn ModelClient>)
			}
		}));

		assert!(lazy.get().await.is_err());
		assert!(lazy.get().await.is_ok());
		assert_eq!(attempts.load(Ordering::SeqCst), 2);
	}
}

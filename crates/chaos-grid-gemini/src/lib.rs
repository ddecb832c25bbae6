// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Google Gemini client used by the Chaos Grid analysis aggregator.
//!
//! Only non-streaming text generation is needed: one prompt in, one text
//! response out.

mod client;
mod types;

pub use client::GeminiClient;
pub use types::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

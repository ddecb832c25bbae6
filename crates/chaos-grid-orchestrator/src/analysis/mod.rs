// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cross-cell analysis: one prompt built from every active cell and recent
//! history, one model call, one structured result.

mod aggregator;
mod client;
mod extract;
mod prompt;

pub use aggregator::{AnalysisConfig, Aggregator, DEFAULT_HISTORY_WINDOW, DEFAULT_LANGUAGE};
pub use client::{gemini_factory, ClientFactory, LazyModelClient, GEMINI_API_KEY_ENV};
pub use extract::{json_span, parse_response};
pub use prompt::{build_prompt, format_history, FLOW_TAIL_BYTES, UNIFORM_TAIL_BYTES};

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Core domain types for Chaos Grid.
//!
//! A grid is a fixed set of cells, each backed (at most) by one interactive
//! shell session. This crate holds the types shared by the orchestrator, the
//! storage layer, the model client and the daemon.

pub mod analysis;
pub mod cell;
pub mod env;
pub mod error;
pub mod grid;
pub mod model;
pub mod secret;
pub mod text;

pub use analysis::*;
pub use cell::*;
pub use env::{load_secret_env, SecretEnvError};
pub use error::*;
pub use grid::*;
pub use model::*;
pub use secret::{SecretString, REDACTED};
pub use text::tail_bytes;

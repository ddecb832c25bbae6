// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded per-session output buffer and the UTF-8 decoder feeding it.

use std::sync::{Mutex, MutexGuard};

use chaos_grid_core::tail_bytes;

/// Observable capacity of an output buffer, in bytes.
pub const OUTPUT_CAP: usize = 2000;

/// Append-only text buffer whose display tail is the last [`OUTPUT_CAP`]
/// bytes.
///
/// Storage keeps at least `retain` bytes (never less than [`OUTPUT_CAP`]) and
/// grows to twice that before compacting, so compaction is amortized across
/// many chunks.
#[derive(Debug)]
pub struct OutputBuffer {
	retain: usize,
	inner: Mutex<String>,
}

impl Default for OutputBuffer {
	fn default() -> Self {
		Self::with_retention(OUTPUT_CAP)
	}
}

impl OutputBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// A buffer that can serve tails of up to `retain` bytes.
	pub fn with_retention(retain: usize) -> Self {
		Self {
			retain: retain.max(OUTPUT_CAP),
			inner: Mutex::new(String::new()),
		}
	}

	pub fn retention(&self) -> usize {
		self.retain
	}

	fn lock(&self) -> MutexGuard<'_, String> {
		self.inner.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Append a chunk and return the new `tail(OUTPUT_CAP)`.
	pub fn append(&self, chunk: &str) -> String {
		let mut buf = self.lock();
		buf.push_str(chunk);
		if buf.len() > self.retain * 2 {
			let kept = tail_bytes(&buf, self.retain).to_string();
			*buf = kept;
		}
		tail_bytes(&buf, OUTPUT_CAP).to_string()
	}

	/// At most the last `n` bytes, never splitting a character.
	pub fn tail(&self, n: usize) -> String {
		tail_bytes(&self.lock(), n).to_string()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}
}

/// Incremental UTF-8 decoder for PTY reads.
///
/// A read may end in the middle of a multi-byte character; those bytes are
/// carried into the next call instead of being replaced. Invalid sequences
/// become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
	carry: Vec<u8>,
}

impl Utf8Decoder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn decode(&mut self, bytes: &[u8]) -> String {
		let mut input = std::mem::take(&mut self.carry);
		input.extend_from_slice(bytes);

		let mut out = String::with_capacity(input.len());
		let mut rest = input.as_slice();
		loop {
			match std::str::from_utf8(rest) {
				Ok(valid) => {
					out.push_str(valid);
					break;
				}
				Err(e) => {
					let (valid, after) = rest.split_at(e.valid_up_to());
					// Checked by from_utf8 above.
					out.push_str(std::str::from_utf8(valid).unwrap_or_default());
					match e.error_len() {
						Some(len) => {
							out.push(char::REPLACEMENT_CHARACTER);
							rest = &after[len..];
						}
						None => {
							self.carry = after.to_vec();
							break;
						}
					}
				}
			}
		}
		out
	}

	/// Flush whatever is left at end of stream.
	pub fn finish(&mut self) -> String {
		let carry = std::mem::take(&mut self.carry);
		String::from_utf8_lossy(&carry).into_owned()
	}
}

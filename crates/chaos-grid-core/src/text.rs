// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

/// The last `max_bytes` bytes of `s`, advanced to the next character boundary
/// so a multi-byte character is never split. May be slightly shorter than
/// `max_bytes`.
pub fn tail_bytes(s: &str, max_bytes: usize) -> &str {
	if s.len() <= max_bytes {
		return s;
	}
	let mut start = s.len() - max_bytes;
	while !s.is_char_boundary(start) {
		start += 1;
	}
	&s[start..]
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Prompt construction for the cross-cell analysis.

use std::fmt::Write as _;

use chaos_grid_core::{tail_bytes, AnalysisMode, CellState, GridLayout, HistoryEntry, Role};

/// Bytes of each cell's output included in flow mode.
pub const FLOW_TAIL_BYTES: usize = 600;
/// Bytes of each cell's output included in uniform mode.
pub const UNIFORM_TAIL_BYTES: usize = 800;

const NO_ACTIVE_CELLS: &str = "  (no active cells)";

const FLOW_PREAMBLE: &str = "\
You are the control tower analysing the flow of one person's intellectual work.

The work is organised in three layers:
- Stimulus (what comes in from outside) -> Will (what they make their own) -> Supply (what they build and put out)

Assess whether this vertical flow is working.";

const FLOW_FORMAT: &str = r#"## Output format (JSON only, no markdown)
{
  "summaries": {
    "<cellId>": "one sentence on what is happening in this cell"
  },
  "ideas": [
    "2-3 concrete actions or discoveries that come from combining Stimulus and Will"
  ],
  "flow": {
    "stimuli_to_will": "is Stimulus being turned into Will, and if so into what",
    "will_to_supply": "is Will landing in Supply, and if so what is being built",
    "stuck": "where the flow is blocked and why (or \"nothing stuck\")",
    "next": "the single most important action right now"
  }
}"#;

const UNIFORM_PREAMBLE: &str = "\
You are the control tower watching several terminal sessions that one person runs side by side.

Summarise what each session is doing and look for patterns across them.";

const UNIFORM_FORMAT: &str = r#"## Output format (JSON only, no markdown)
{
  "summaries": {
    "<cellId>": "one sentence on what is happening in this cell"
  },
  "ideas": [
    "2-3 concrete actions or connections suggested by looking across the sessions"
  ]
}"#;

/// `[cell-3]` or `[cell-3 | Theme]`.
fn cell_label(cell: &CellState) -> String {
	let theme = cell.theme.trim();
	if theme.is_empty() {
		format!("[{}]", cell.id)
	} else {
		format!("[{} | {}]", cell.id, theme)
	}
}

fn format_cells<'a>(cells: impl IntoIterator<Item = &'a CellState>, tail: usize) -> Option<String> {
	let blocks: Vec<String> = cells
		.into_iter()
		.map(|c| format!("  {}\n{}", cell_label(c), tail_bytes(&c.last_output, tail)))
		.collect();
	(!blocks.is_empty()).then(|| blocks.join("\n---\n"))
}

/// Render past analyses oldest first as a timestamp followed by one
/// `[theme or id] summary` line per cell.
pub fn format_history(history: &[HistoryEntry]) -> String {
	history
		.iter()
		.map(|entry| {
			let mut block = entry.timestamp.to_rfc3339();
			for (cell_id, summary) in &entry.summaries {
				let _ = write!(block, "\n  [{}] {}", entry.label_for(cell_id), summary);
			}
			block
		})
		.collect::<Vec<_>>()
		.join("\n\n")
}

fn history_section(history: &[HistoryEntry]) -> String {
	if history.is_empty() {
		String::new()
	} else {
		format!("## Recent session history\n{}\n\n", format_history(history))
	}
}

fn layer_heading(role: Role) -> &'static str {
	match role {
		Role::Stimulus => "### Stimulus layer (what is coming in from outside)",
		Role::Will => "### Will layer (what is being made their own)",
		Role::Supply => "### Supply layer (what is being built and put out)",
	}
}

/// Build the single analysis prompt. `active` must already be filtered to
/// cells with output.
pub fn build_prompt(
	mode: AnalysisMode,
	layout: &GridLayout,
	active: &[CellState],
	history: &[HistoryEntry],
	language: &str,
) -> String {
	let mut prompt = String::new();

	match mode {
		AnalysisMode::Flow => {
			prompt.push_str(FLOW_PREAMBLE);
			prompt.push_str("\n\n");
			prompt.push_str(&history_section(history));
			prompt.push_str("## Current sessions\n");
			for role in Role::ALL {
				let cells = active.iter().filter(|c| layout.role_of(&c.id) == role);
				let body = format_cells(cells, FLOW_TAIL_BYTES).unwrap_or_else(|| NO_ACTIVE_CELLS.to_string());
				let _ = write!(prompt, "\n{}\n{}\n", layer_heading(role), body);
			}
			prompt.push('\n');
			prompt.push_str(FLOW_FORMAT);
		}
		AnalysisMode::Uniform => {
			prompt.push_str(UNIFORM_PREAMBLE);
			prompt.push_str("\n\n");
			prompt.push_str(&history_section(history));
			prompt.push_str("## Active sessions\n");
			let body = format_cells(active, UNIFORM_TAIL_BYTES).unwrap_or_else(|| NO_ACTIVE_CELLS.to_string());
			prompt.push_str(&body);
			prompt.push_str("\n\n");
			prompt.push_str(UNIFORM_FORMAT);
		}
	}

	let _ = write!(prompt, "\n\nWrite every text value in {language}.");
	prompt
}

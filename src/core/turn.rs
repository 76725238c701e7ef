//! Per-session transcript accumulation.
//!
//! Upstream transcription arrives as small chunks. The accumulator keeps the
//! running text of the current turn for both directions and hands out a
//! snapshot when the upstream marks the turn complete.

use serde::{Deserialize, Serialize};

/// Finalized text of one conversational turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTurn {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Default)]
pub struct TurnAccumulator {
    input: String,
    output: String,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of the user's transcript and return the cumulative
    /// input text. Whitespace-only chunks are ignored and yield `None`.
    pub fn append_input(&mut self, chunk: &str) -> Option<&str> {
        if chunk.trim().is_empty() {
            return None;
        }
        self.input.push_str(chunk);
        Some(&self.input)
    }

    /// Append a chunk of the model's transcript and return the cumulative
    /// output text. Empty chunks yield `None`.
    pub fn append_output(&mut self, chunk: &str) -> Option<&str> {
        if chunk.is_empty() {
            return None;
        }
        self.output.push_str(chunk);
        Some(&self.output)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }

    /// Take both buffers, leaving the accumulator empty for the next turn
    pub fn complete(&mut self) -> CompletedTurn {
        CompletedTurn {
            input: std::mem::take(&mut self.input),
            output: std::mem::take(&mut self.output),
        }
    }

    /// Discard both buffers without producing a turn
    pub fn reset(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}

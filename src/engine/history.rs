// Gyan Engine — History Accumulator
//
// Owns the conversation: an append-only, insertion-ordered list of turns.
// The request payload is derived from it on every dispatch and never stored.
//
// The full history is resent on every call; there is no windowing or
// summarization, so request size grows linearly with the session.

use crate::atoms::types::{Content, GenerateContentRequest, Part, Turn};

/// Trimmed input, or `None` when it is blank.
pub fn normalize_input(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[derive(Debug, Clone, Default)]
pub struct HistoryAccumulator {
    turns: Vec<Turn>,
}

impl HistoryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn with the trimmed text.
    /// Blank input is rejected: nothing is appended and `None` is returned.
    pub fn append_user_turn(&mut self, text: &str) -> Option<&[Turn]> {
        let trimmed = normalize_input(text)?;
        self.turns.push(Turn::user(trimmed));
        Some(&self.turns)
    }

    /// Append a model turn unconditionally. Used for real replies and for
    /// synthesized fallback messages alike.
    pub fn append_model_turn(&mut self, text: &str) -> &[Turn] {
        self.turns.push(Turn::model(text));
        &self.turns
    }

    /// The whole conversation mapped to the generation API's request shape.
    pub fn to_request_payload(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: self
                .turns
                .iter()
                .map(|turn| Content {
                    role: turn.role().as_wire_str().to_string(),
                    parts: vec![Part { text: turn.text().to_string() }],
                })
                .collect(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

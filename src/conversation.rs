//! Conversation timeline
//!
//! An ordered sequence of turns with upsert-by-partial semantics: a running
//! transcript updates in place instead of appending duplicate entries. At
//! most one provisional turn exists at any time and it is always the last
//! entry; the final transcript always wins over partials.

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The human side of the conversation
    User,
    /// The remote assistant
    Assistant,
}

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it
    pub speaker: Speaker,

    /// What was said
    pub text: String,

    /// Still subject to revision (live transcript)
    pub provisional: bool,
}

impl Turn {
    /// Create a settled turn
    #[must_use]
    pub fn finalized(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            provisional: false,
        }
    }

    /// Create a provisional user turn (live transcript)
    #[must_use]
    pub fn provisional(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            provisional: true,
        }
    }
}

/// Ordered sequence of turns, rendered top-to-bottom
///
/// Append/update only. The sole removal is the replacement of a provisional
/// turn when its final text arrives (or when finalization fails).
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Create an empty log
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Remove any provisional turn, then append a settled turn
    ///
    /// Used for typed input and for assistant replies.
    pub fn append_final(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.discard_provisional();
        self.turns.push(Turn::finalized(speaker, text));
    }

    /// Update the live transcript in place
    ///
    /// Replaces the text of the trailing provisional turn, or appends one if
    /// none exists.
    pub fn upsert_partial(&mut self, text: impl Into<String>) {
        if let Some(last) = self.turns.last_mut() {
            if last.provisional {
                last.text = text.into();
                return;
            }
        }
        self.turns.push(Turn::provisional(text));
    }

    /// Settle the live transcript as the session's user turn
    ///
    /// The provisional entry is replaced, never duplicated.
    pub fn commit_partial(&mut self, text: impl Into<String>) {
        self.append_final(Speaker::User, text);
    }

    /// Remove the provisional turn if present
    ///
    /// Returns whether one was removed.
    pub fn discard_provisional(&mut self) -> bool {
        if self.turns.last().is_some_and(|t| t.provisional) {
            self.turns.pop();
            return true;
        }
        false
    }

    /// The turns in conversation order
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns
    #[must_use]
    pub const fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation holds no turns
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether a live transcript is currently displayed
    #[must_use]
    pub fn has_provisional(&self) -> bool {
        self.turns.last().is_some_and(|t| t.provisional)
    }
}

//! Merges streamed transcript fragments into conversation turns.
//!
//! Finalized turns live in an append-only log. The turn that is still
//! streaming lives in a separate partial slot and only joins the log when it
//! is finalized: on a turn boundary, when the other speaker starts a new
//! turn, or when a tool/system/typed turn is inserted. Finalizing a turn also
//! resets that speaker's accumulator, so nothing can mutate it afterwards.

use super::suggestions::extract_suggestions;
use super::turn::{ConversationTurn, GroundingChunk, Speaker};

#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    log: Vec<ConversationTurn>,
    partial: Option<ConversationTurn>,
    input_text: String,
    output_text: String,
    grounding: Vec<GroundingChunk>,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a user transcript fragment
    ///
    /// Returns false (and changes nothing) for an empty fragment.
    pub fn push_input_fragment(&mut self, fragment: &str) -> bool {
        self.push_fragment(Speaker::User, fragment)
    }

    /// Apply an assistant transcript fragment
    pub fn push_output_fragment(&mut self, fragment: &str) -> bool {
        self.push_fragment(Speaker::Assistant, fragment)
    }

    /// Remember citations for the assistant turn being streamed
    pub fn add_grounding(&mut self, chunks: &[GroundingChunk]) {
        self.grounding.extend_from_slice(chunks);
    }

    /// Turn boundary: finalize whatever is streaming and reset accumulators
    pub fn complete_turn(&mut self) {
        self.finalize_partial();
        self.input_text.clear();
        self.output_text.clear();
        self.grounding.clear();
    }

    /// Insert a tool activity turn (never partial, never merged)
    pub fn push_tool(&mut self, text: impl Into<String>) {
        self.finalize_partial();
        self.log.push(ConversationTurn::new(Speaker::Tool, text));
    }

    /// Insert a typed user message
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.finalize_partial();
        self.log.push(ConversationTurn::new(Speaker::User, text));
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.finalize_partial();
        self.log.push(ConversationTurn::system(text));
    }

    /// Drop transient system notices
    pub fn clear_system(&mut self) {
        self.log.retain(|t| t.speaker != Speaker::System);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Replace the conversation with previously saved turns
    pub fn restore(&mut self, turns: Vec<ConversationTurn>) {
        self.clear();
        self.log = turns
            .into_iter()
            .map(|mut t| {
                t.is_partial = false;
                t
            })
            .collect();
    }

    /// Snapshot of the conversation: finalized log, then the streaming turn
    pub fn turns(&self) -> Vec<ConversationTurn> {
        let mut turns = self.log.clone();
        turns.extend(self.partial.iter().cloned());
        turns
    }

    /// Finalized, non-system turns worth persisting
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.log
            .iter()
            .filter(|t| t.speaker != Speaker::System)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty() && self.partial.is_none()
    }

    pub fn len(&self) -> usize {
        self.log.len() + usize::from(self.partial.is_some())
    }

    /// The turn currently streaming, if any
    pub fn partial(&self) -> Option<&ConversationTurn> {
        self.partial.as_ref()
    }

    fn push_fragment(&mut self, speaker: Speaker, fragment: &str) -> bool {
        if fragment.is_empty() {
            return false;
        }

        if self.partial.as_ref().is_some_and(|p| p.speaker != speaker) {
            self.finalize_partial();
        }

        let accumulator = match speaker {
            Speaker::User => &mut self.input_text,
            _ => &mut self.output_text,
        };
        accumulator.push_str(fragment);
        let text = accumulator.clone();

        match &mut self.partial {
            Some(turn) => turn.text = text,
            None => self.partial = Some(ConversationTurn::partial(speaker, text)),
        }
        true
    }

    fn finalize_partial(&mut self) {
        let Some(mut turn) = self.partial.take() else {
            return;
        };
        turn.is_partial = false;

        match turn.speaker {
            Speaker::User => {
                turn.text = std::mem::take(&mut self.input_text);
            }
            Speaker::Assistant => {
                let (text, suggestions) = extract_suggestions(&std::mem::take(&mut self.output_text));
                turn.text = text;
                turn.suggestions = suggestions;
                if !self.grounding.is_empty() {
                    turn.grounding = Some(std::mem::take(&mut self.grounding));
                }
            }
            _ => {}
        }

        if !turn.text.trim().is_empty() || turn.suggestions.is_some() {
            self.log.push(turn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::GroundingSource;

    #[test]
    fn fragments_replace_partial_text() {
        let mut r = TranscriptReconciler::new();
        r.push_input_fragment("What's ");
        r.push_input_fragment("the weather");

        let partial = r.partial().unwrap();
        assert_eq!(partial.speaker, Speaker::User);
        assert_eq!(partial.text, "What's the weather");
        assert!(partial.is_partial);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn finalized_turn_is_not_mutated_by_later_fragments() {
        let mut r = TranscriptReconciler::new();
        r.push_input_fragment("Hi");
        r.push_output_fragment("Hello");
        r.push_input_fragment(" again");

        let turns = r.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text, "Hi");
        assert!(!turns[0].is_partial);
        assert_eq!(turns[1].text, "Hello");
        assert!(!turns[1].is_partial);
        // The user accumulator was reset when "Hi" was finalized
        assert_eq!(turns[2].text, " again");
        assert!(turns[2].is_partial);
    }

    #[test]
    fn empty_fragment_changes_nothing() {
        let mut r = TranscriptReconciler::new();
        assert!(!r.push_output_fragment(""));
        assert!(r.is_empty());

        r.push_input_fragment("x");
        assert!(!r.push_output_fragment(""));
        assert!(r.partial().is_some_and(|p| p.speaker == Speaker::User));
    }

    #[test]
    fn grounding_only_on_finalized_assistant_turn() {
        let mut r = TranscriptReconciler::new();
        let chunk = GroundingChunk {
            web: Some(GroundingSource {
                uri: "https://example.com".into(),
                title: "Example".into(),
            }),
            maps: None,
        };
        r.add_grounding(&[chunk.clone()]);
        r.push_output_fragment("See the source.");
        assert!(r.partial().unwrap().grounding.is_none());

        r.complete_turn();
        assert_eq!(r.turns()[0].grounding, Some(vec![chunk]));
    }

    #[test]
    fn tool_turn_finalizes_streaming_turn() {
        let mut r = TranscriptReconciler::new();
        r.push_output_fragment("Let me check");
        r.push_tool("Consulting maps...");

        let turns = r.turns();
        assert_eq!(turns.len(), 2);
        assert!(!turns[0].is_partial);
        assert_eq!(turns[1].speaker, Speaker::Tool);
        assert!(r.partial().is_none());
    }

    #[test]
    fn history_excludes_system_and_partial_turns() {
        let mut r = TranscriptReconciler::new();
        r.push_system("Connecting...");
        r.push_user_text("hello");
        r.push_output_fragment("streaming");

        let history = r.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello");

        r.clear_system();
        assert_eq!(r.turns().len(), 2);
    }
}

use ragchat_core::config::ChatVariant;
use ragchat_core::types::ConversationTurn;

use crate::summary;

/// Rendered in place of history when there is nothing to show.
pub const NO_HISTORY: &str = "No previous conversation.";

/// How past turns are laid out in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStyle {
    /// `[Turn N] Q: ...\nA: ...`
    Numbered,
    /// `Q: ...\nA: ...`
    Plain,
}

impl From<ChatVariant> for HistoryStyle {
    fn from(variant: ChatVariant) -> Self {
        match variant {
            ChatVariant::Enhanced => HistoryStyle::Numbered,
            ChatVariant::Baseline => HistoryStyle::Plain,
        }
    }
}

/// Turns, rolling topic summary and turn counter of the single running session.
///
/// Owned by the session controller and lent to the answer pipeline for reading.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
    summary: String,
    turn_counter: u64,
}

impl ConversationState {
    pub fn new() -> Self { Self::default() }

    pub fn turns(&self) -> &[ConversationTurn] { &self.turns }
    pub fn summary(&self) -> &str { &self.summary }
    pub fn turn_counter(&self) -> u64 { self.turn_counter }
    pub fn len(&self) -> usize { self.turns.len() }
    pub fn is_empty(&self) -> bool { self.turns.is_empty() }

    /// Claim the next turn number for a question attempt.
    ///
    /// The counter is never rolled back, so a failed attempt still uses its number.
    pub fn begin_turn(&mut self) -> u64 {
        self.turn_counter += 1;
        self.turn_counter
    }

    /// Record a completed turn and refresh the summary.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.recompute_summary();
    }

    pub fn recompute_summary(&mut self) {
        self.summary = summary::summarize(&self.turns);
    }

    /// The last `max_turns` turns, oldest first, or [`NO_HISTORY`].
    pub fn snapshot_history(&self, max_turns: usize, style: HistoryStyle) -> String {
        if self.turns.is_empty() || max_turns == 0 {
            return NO_HISTORY.to_string();
        }
        let start = self.turns.len().saturating_sub(max_turns);
        self.turns[start..]
            .iter()
            .map(|t| match style {
                HistoryStyle::Numbered => format!("[Turn {}] Q: {}\nA: {}", t.turn_number, t.question, t.answer),
                HistoryStyle::Plain => format!("Q: {}\nA: {}", t.question, t.answer),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.summary.clear();
        self.turn_counter = 0;
    }
}

//! Keyword heuristic that labels recent questions with coarse topics.
//!
//! The bucket order matters: the first bucket with a matching keyword wins.

use ragchat_core::types::ConversationTurn;

pub const OPENING_SUMMARY: &str = "This is the beginning of our conversation.";

pub const GENERAL_TOPIC: &str = "general information";

/// How many of the latest turns feed the summary.
pub const SUMMARY_WINDOW: usize = 3;

const TOPIC_BUCKETS: &[(&str, &[&str])] = &[
    ("technical expertise discussion", &["expertise", "skill", "技术"]),
    ("blog and online presence", &["blog", "website", "博客"]),
    ("projects and work experience", &["project", "work", "项目"]),
    ("personal life and travel", &["travel", "life", "生活"]),
];

/// Topic label for a single question (case-insensitive substring match).
pub fn classify_topic(question: &str) -> &'static str {
    let lowered = question.to_lowercase();
    TOPIC_BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(label, _)| *label)
        .unwrap_or(GENERAL_TOPIC)
}

/// Summary line for the given turns, oldest first.
pub fn summarize(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return OPENING_SUMMARY.to_string();
    }
    let recent = &turns[turns.len().saturating_sub(SUMMARY_WINDOW)..];
    let mut topics: Vec<&'static str> = Vec::with_capacity(recent.len());
    for turn in recent {
        let topic = classify_topic(&turn.question);
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    format!(
        "Recent conversation focused on: {}. We've discussed {} topics so far.",
        topics.join(", "),
        turns.len()
    )
}

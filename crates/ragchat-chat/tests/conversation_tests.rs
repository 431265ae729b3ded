use ragchat_chat::{
    classify_topic, summarize, ConversationState, HistoryStyle, PipelineContext, PromptTemplate, NO_HISTORY,
    OPENING_SUMMARY,
};
use ragchat_core::config::ChatVariant;
use ragchat_core::types::{ConversationTurn, Fragment};

fn answered(state: &mut ConversationState, question: &str, answer: &str) {
    let n = state.begin_turn();
    state.append(ConversationTurn::new(n, question, answer));
}

#[test]
fn empty_history_is_the_sentinel() {
    let mut state = ConversationState::new();
    assert_eq!(state.snapshot_history(8, HistoryStyle::Numbered), NO_HISTORY);
    answered(&mut state, "q", "a");
    assert_eq!(state.snapshot_history(0, HistoryStyle::Numbered), NO_HISTORY);
}

#[test]
fn one_turn_shows_exactly_that_exchange() {
    let mut state = ConversationState::new();
    answered(&mut state, "他擅长什么？", "他擅长 NAS。--- 喵");
    assert_eq!(
        state.snapshot_history(8, HistoryStyle::Numbered),
        "[Turn 1] Q: 他擅长什么？\nA: 他擅长 NAS。--- 喵"
    );
    assert_eq!(state.snapshot_history(5, HistoryStyle::Plain), "Q: 他擅长什么？\nA: 他擅长 NAS。--- 喵");
}

#[test]
fn history_window_keeps_latest_turns_oldest_first() {
    let mut state = ConversationState::new();
    for i in 1..=10 {
        answered(&mut state, &format!("q{i}"), &format!("a{i}"));
    }
    let history = state.snapshot_history(8, HistoryStyle::Numbered);
    assert!(history.starts_with("[Turn 3] Q: q3\nA: a3"));
    assert!(history.ends_with("[Turn 10] Q: q10\nA: a10"));
    assert!(!history.contains("[Turn 2]"));
    assert_eq!(history.matches("[Turn").count(), 8);

    let plain = state.snapshot_history(5, HistoryStyle::Plain);
    assert_eq!(plain.matches("Q: ").count(), 5);
    assert!(plain.starts_with("Q: q6"));
}

#[test]
fn history_uses_recorded_turn_numbers() {
    let mut state = ConversationState::new();
    answered(&mut state, "first", "a");
    state.begin_turn(); // failed attempt
    answered(&mut state, "third", "c");
    let history = state.snapshot_history(8, HistoryStyle::Numbered);
    assert!(history.contains("[Turn 1] Q: first"));
    assert!(history.contains("[Turn 3] Q: third"));
    assert_eq!(state.turn_counter(), 3);
    assert_eq!(state.len(), 2);
}

#[test]
fn topic_buckets_first_match_wins() {
    assert_eq!(classify_topic("What is his EXPERTISE?"), "technical expertise discussion");
    assert_eq!(classify_topic("他的技术博客"), "technical expertise discussion");
    assert_eq!(classify_topic("Does he have a website"), "blog and online presence");
    assert_eq!(classify_topic("他的项目有哪些"), "projects and work experience");
    assert_eq!(classify_topic("how is his life"), "personal life and travel");
    assert_eq!(classify_topic("他喜欢去哪里旅行"), "general information");
}

#[test]
fn summary_lists_distinct_topics_in_first_seen_order() {
    let mut state = ConversationState::new();
    answered(&mut state, "他的技术专长是什么？", "a");
    answered(&mut state, "his blog?", "b");
    answered(&mut state, "他喜欢旅行吗？", "c");
    assert_eq!(
        state.summary(),
        "Recent conversation focused on: technical expertise discussion, blog and online presence, \
         general information. We've discussed 3 topics so far."
    );
}

#[test]
fn summary_only_looks_at_last_three_turns_but_counts_all() {
    let mut state = ConversationState::new();
    answered(&mut state, "skill?", "a");
    answered(&mut state, "blog?", "b");
    answered(&mut state, "blog again?", "c");
    answered(&mut state, "website?", "d");
    assert_eq!(
        state.summary(),
        "Recent conversation focused on: blog and online presence. We've discussed 4 topics so far."
    );
}

#[test]
fn summary_of_nothing_is_the_opening_line() {
    assert_eq!(summarize(&[]), OPENING_SUMMARY);
}

#[test]
fn clear_twice_equals_clear_once() {
    let mut state = ConversationState::new();
    answered(&mut state, "q", "a");
    state.clear();
    let once = state.clone();
    state.clear();
    assert_eq!(state, once);
    assert_eq!(state, ConversationState::new());
    assert_eq!(state.turn_counter(), 0);
    assert_eq!(state.summary(), "");
}

fn context(question: &str, docs: &[&str]) -> PipelineContext {
    PipelineContext {
        docs: docs.iter().map(|d| Fragment::new(*d)).collect(),
        question: question.to_string(),
        history: NO_HISTORY.to_string(),
        context_summary: OPENING_SUMMARY.to_string(),
        turn: 1,
    }
}

#[test]
fn enhanced_prompt_has_every_section_in_order() {
    let template = PromptTemplate::new(ChatVariant::Enhanced, "Chinese", "--- 喵");
    let prompt = template.render(&context("司徒永聪的技术专长是什么？", &["doc one", "doc two"]));
    let sections = [
        "=== CONVERSATION CONTEXT ===\nThis is the beginning of our conversation.",
        "=== PREVIOUS CONVERSATION ===\nNo previous conversation.",
        "=== CURRENT SITUATION ===\n- Turn: 1\n- User's current question: 司徒永聪的技术专长是什么？",
        "=== RELEVANT DOCUMENTS ===\ndoc one\n\ndoc two",
        "6. Answer in Chinese and add \"--- 喵\" at the end",
        "=== YOUR RESPONSE ===",
    ];
    let mut from = 0;
    for section in sections {
        let at = prompt[from..].find(section).unwrap_or_else(|| panic!("missing {section:?} in {prompt}"));
        from += at + section.len();
    }
}

#[test]
fn baseline_prompt_uses_configured_language() {
    let template = PromptTemplate::new(ChatVariant::Baseline, "English", "-- end");
    let prompt = template.render(&context("who?", &["alpha"]));
    assert!(prompt.contains("Previous conversation:\nNo previous conversation."));
    assert!(prompt.contains("Current question: who?"));
    assert!(prompt.contains("Relevant documents:\nalpha"));
    assert!(prompt.contains("Please answer in English and add \"-- end\" at the end of your answer."));
    assert!(!prompt.contains("=== "));
}

#[test]
fn braces_in_values_are_not_expanded() {
    let template = PromptTemplate::custom(ChatVariant::Enhanced, "{question}|{docs}|{unknown}", "x", "y");
    let prompt = template.render(&context("what is {docs}?", &["{question}"]));
    assert_eq!(prompt, "what is {docs}?|{question}|{unknown}");
}

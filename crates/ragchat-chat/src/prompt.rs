//! Prompt templates for the two chat variants.
//!
//! Placeholders are `{name}` tokens. Rendering is a single left-to-right pass,
//! so braces inside substituted values (questions, documents) are never
//! expanded again. Unknown `{...}` tokens are left as written.

use ragchat_core::config::{ChatSettings, ChatVariant};

use crate::pipeline::PipelineContext;

const ENHANCED_TEMPLATE: &str = r#"
You are a helpful AI assistant with excellent memory and context awareness. You should maintain conversation continuity and build upon previous exchanges.

=== CONVERSATION CONTEXT ===
{context_summary}

=== PREVIOUS CONVERSATION ===
{history}

=== CURRENT SITUATION ===
- Turn: {turn}
- User's current question: {question}

=== RELEVANT DOCUMENTS ===
{docs}

=== INSTRUCTIONS ===
1. Answer the current question based on the provided documents
2. Consider the conversation history and context summary
3. If the question references previous topics, acknowledge and build upon them
4. If this is a follow-up question, reference the previous context appropriately
5. Maintain a conversational tone
6. Answer in {language} and add "{signature}" at the end

=== YOUR RESPONSE ===
"#;

const BASELINE_TEMPLATE: &str = r#"
You are a helpful AI assistant. Answer the following question based on the provided context.

Previous conversation:
{history}

Current question: {question}

Relevant documents:
{docs}

Please answer in {language} and add "{signature}" at the end of your answer.
"#;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    variant: ChatVariant,
    template: String,
    language: String,
    signature: String,
}

impl PromptTemplate {
    pub fn new(variant: ChatVariant, language: impl Into<String>, signature: impl Into<String>) -> Self {
        let template = match variant {
            ChatVariant::Enhanced => ENHANCED_TEMPLATE,
            ChatVariant::Baseline => BASELINE_TEMPLATE,
        };
        Self::custom(variant, template, language, signature)
    }

    /// A caller-supplied template using the same placeholders.
    pub fn custom(
        variant: ChatVariant,
        template: impl Into<String>,
        language: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            variant,
            template: template.into(),
            language: language.into(),
            signature: signature.into(),
        }
    }

    pub fn from_settings(chat: &ChatSettings) -> Self {
        Self::new(chat.variant, chat.language.clone(), chat.signature.clone())
    }

    pub fn variant(&self) -> ChatVariant { self.variant }

    pub fn render(&self, ctx: &PipelineContext) -> String {
        let docs = render_docs(ctx);
        let turn = ctx.turn.to_string();
        substitute(&self.template, |name| match name {
            "context_summary" => Some(ctx.context_summary.as_str()),
            "history" => Some(ctx.history.as_str()),
            "turn" => Some(turn.as_str()),
            "question" => Some(ctx.question.as_str()),
            "docs" => Some(docs.as_str()),
            "language" => Some(self.language.as_str()),
            "signature" => Some(self.signature.as_str()),
            _ => None,
        })
    }
}

fn render_docs(ctx: &PipelineContext) -> String {
    ctx.docs.iter().map(|f| f.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

fn substitute<'v>(template: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

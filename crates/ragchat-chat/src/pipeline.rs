use std::sync::Arc;

use ragchat_core::error::{Error, Result};
use ragchat_core::traits::LanguageModel;
use ragchat_core::types::Fragment;
use ragchat_vector::Retriever;

use crate::conversation::{ConversationState, HistoryStyle};
use crate::prompt::PromptTemplate;

/// Everything the prompt needs for one invocation. Built fresh per question.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineContext {
    pub docs: Vec<Fragment>,
    pub question: String,
    pub history: String,
    pub context_summary: String,
    pub turn: u64,
}

/// Retrieve, render, complete, parse. The stages always run in that order and
/// the conversation is only read, never written.
pub struct AnswerPipeline {
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
    history_turns: usize,
}

impl AnswerPipeline {
    pub fn new(retriever: Retriever, llm: Arc<dyn LanguageModel>, template: PromptTemplate, history_turns: usize) -> Self {
        Self { retriever, llm, template, history_turns }
    }

    pub fn retriever(&self) -> &Retriever { &self.retriever }
    pub fn history_turns(&self) -> usize { self.history_turns }
    pub fn model_id(&self) -> &str { self.llm.model_id() }

    pub async fn build_context(&self, question: &str, conversation: &ConversationState) -> Result<PipelineContext> {
        let docs = self.retriever.retrieve(question).await?;
        let style = HistoryStyle::from(self.template.variant());
        Ok(PipelineContext {
            docs,
            question: question.to_string(),
            history: conversation.snapshot_history(self.history_turns, style),
            context_summary: conversation.summary().to_string(),
            turn: conversation.turn_counter(),
        })
    }

    pub fn render(&self, ctx: &PipelineContext) -> String {
        self.template.render(ctx)
    }

    /// Retrieval and rendering without the model call.
    pub async fn prepare(&self, question: &str, conversation: &ConversationState) -> Result<String> {
        let ctx = self.build_context(question, conversation).await?;
        Ok(self.render(&ctx))
    }

    pub async fn invoke(&self, question: &str, conversation: &ConversationState) -> Result<String> {
        let ctx = self.build_context(question, conversation).await?;
        tracing::debug!(turn = ctx.turn, docs = ctx.docs.len(), "context assembled");
        let prompt = self.render(&ctx);
        let raw = self.llm.complete(&prompt).await?;
        parse_output(raw)
    }
}

/// The completion is the answer as-is; blank output counts as a model failure.
fn parse_output(raw: String) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(Error::Model("language model returned an empty answer".into()));
    }
    Ok(raw)
}

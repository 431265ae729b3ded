pub mod conversation;
pub mod engine;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod summary;

pub use conversation::{ConversationState, HistoryStyle, NO_HISTORY};
pub use engine::{Engine, EngineStatus};
pub use llm::{llm_from_settings, OllamaLlm};
pub use pipeline::{AnswerPipeline, PipelineContext};
pub use prompt::PromptTemplate;
pub use session::{Command, Input, SessionController, SessionState};
pub use summary::{classify_topic, summarize, OPENING_SUMMARY};

//! Interactive read-eval loop over one conversation.
//!
//! Each line is parsed into an [`Input`]. Commands act on the conversation or
//! print a report; anything else is a question for the answer pipeline. At most
//! one question is in flight, and the conversation is written only after the
//! pipeline has resolved.

use std::borrow::Cow;

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use ragchat_core::config::ChatVariant;
use ragchat_core::error::{Error, Result};
use ragchat_core::types::ConversationTurn;

use crate::conversation::ConversationState;
use crate::engine::Engine;

const HISTORY_ANSWER_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    History,
    Context,
    Clear,
    Status,
    Turn,
    Quit,
    Exit,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Help,
        Command::History,
        Command::Context,
        Command::Clear,
        Command::Status,
        Command::Turn,
        Command::Quit,
        Command::Exit,
    ];

    /// Case-insensitive exact match on the whole `/command` token.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.to_lowercase();
        Self::ALL.into_iter().find(|c| c.token() == token)
    }

    pub fn token(self) -> &'static str {
        match self {
            Command::Help => "/help",
            Command::History => "/history",
            Command::Context => "/context",
            Command::Clear => "/clear",
            Command::Status => "/status",
            Command::Turn => "/turn",
            Command::Quit => "/quit",
            Command::Exit => "/exit",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Help => "Show this help message",
            Command::History => "Show conversation history",
            Command::Context => "Show current context summary",
            Command::Clear => "Clear conversation history",
            Command::Status => "Show system status",
            Command::Turn => "Show current conversation turn",
            Command::Quit | Command::Exit => "Exit the program",
        }
    }

    pub fn closes_session(self) -> bool {
        matches!(self, Command::Quit | Command::Exit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Command(Command),
    Unknown(String),
    Question(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Input::Empty
        } else if trimmed.starts_with('/') {
            match Command::parse(trimmed) {
                Some(command) => Input::Command(command),
                None => Input::Unknown(trimmed.to_string()),
            }
        } else {
            Input::Question(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingInput,
    DispatchingCommand,
    DispatchingQuestion,
    Closed,
}

pub struct SessionController {
    engine: Engine,
    conversation: ConversationState,
    state: SessionState,
}

impl SessionController {
    pub fn new(engine: Engine) -> Self {
        Self { engine, conversation: ConversationState::new(), state: SessionState::Idle }
    }

    pub fn state(&self) -> SessionState { self.state }
    pub fn conversation(&self) -> &ConversationState { &self.conversation }
    pub fn engine(&self) -> &Engine { &self.engine }

    /// Answer one question and record the turn on success.
    ///
    /// The turn number is claimed before the pipeline runs and is kept even
    /// when the pipeline fails.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let turn_number = self.conversation.begin_turn();
        let answer = self.engine.pipeline().invoke(question, &self.conversation).await?;
        self.conversation.append(ConversationTurn::new(turn_number, question, answer.clone()));
        Ok(answer)
    }

    /// Drive the loop until `/quit`, `/exit` or end of input.
    ///
    /// Only I/O failures on the reader or writer end the loop with an error.
    /// Lines that are not valid UTF-8 are decoded lossily.
    pub async fn run<R, W>(&mut self, mut reader: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        emit(&mut out, &self.banner()).await?;
        self.state = SessionState::AwaitingInput;
        let mut buf = Vec::new();
        while self.state != SessionState::Closed {
            write_raw(&mut out, "\n❓ Your question: ").await?;
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| Error::io("<session input>", e))?;
            if read == 0 {
                emit(&mut out, "\n👋 Goodbye!").await?;
                self.state = SessionState::Closed;
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if matches!(line, Cow::Owned(_)) {
                tracing::warn!(bytes = buf.len(), "input line was not valid UTF-8; decoded lossily");
            }
            let input = Input::parse(&line);
            if matches!(input, Input::Question(_)) {
                emit(&mut out, &self.thinking_line()).await?;
            }
            let report = self.dispatch(input).await;
            emit(&mut out, &report).await?;
        }
        Ok(())
    }

    /// Handle one parsed input and return the text to show the user.
    pub async fn dispatch(&mut self, input: Input) -> String {
        match input {
            Input::Empty => "⚠️  Please enter a question or command.".to_string(),
            Input::Unknown(token) => {
                tracing::debug!(%token, "unknown command");
                "❓ Unknown command. Type /help for available commands.".to_string()
            }
            Input::Command(command) => {
                self.state = SessionState::DispatchingCommand;
                let report = self.execute(command);
                self.state = if command.closes_session() { SessionState::Closed } else { SessionState::AwaitingInput };
                report
            }
            Input::Question(question) => {
                self.state = SessionState::DispatchingQuestion;
                let report = match self.ask(&question).await {
                    Ok(answer) => format!("\n🤖 Answer:\n{answer}"),
                    Err(e) => {
                        tracing::warn!(error = %e, recoverable = e.is_recoverable(), "question failed");
                        format!("\n❌ Error: {e}")
                    }
                };
                self.state = SessionState::AwaitingInput;
                report
            }
        }
    }

    /// Shown while the next question is being answered.
    pub fn thinking_line(&self) -> String {
        format!("\n🤔 Thinking... (Turn {})", self.conversation.turn_counter() + 1)
    }

    fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Help => help_report(),
            Command::History => self.history_report(),
            Command::Context => self.context_report(),
            Command::Clear => {
                self.conversation.clear();
                "🗑️  Conversation history and context cleared.".to_string()
            }
            Command::Status => self.status_report(),
            Command::Turn => format!("\n🔄 Current conversation turn: {}", self.conversation.turn_counter()),
            Command::Quit | Command::Exit => "\n👋 Goodbye!".to_string(),
        }
    }

    fn banner(&self) -> String {
        let mut lines = Vec::new();
        match self.engine.status().variant {
            ChatVariant::Enhanced => {
                lines.push("\n🤖 Enhanced Context Q&A System".to_string());
                lines.push("💡 Type your question or use commands (type /help for commands)".to_string());
                lines.push(format!("📚 Available context: {} document fragments", self.engine.status().fragments));
                lines.push("🧠 Enhanced context awareness enabled".to_string());
                lines.push("=".repeat(70));
            }
            ChatVariant::Baseline => {
                lines.push("\n🤖 Interactive Q&A System".to_string());
                lines.push("💡 Type your question or use commands (type /help for commands)".to_string());
                lines.push(format!("📚 Available context: {} document fragments", self.engine.status().fragments));
                lines.push("=".repeat(60));
            }
        }
        lines.join("\n")
    }

    fn history_report(&self) -> String {
        let turns = self.conversation.turns();
        if turns.is_empty() {
            return "📝 No conversation history yet.".to_string();
        }
        let mut out = format!("\n📝 Conversation History:\n{}", "=".repeat(60));
        for turn in turns {
            let answer: String = turn.answer.chars().take(HISTORY_ANSWER_CHARS).collect();
            let local = turn.timestamp.with_timezone(&Local);
            out.push_str(&format!(
                "\n\n[Turn {}] Q: {}\n   A: {}...\n   Time: {}",
                turn.turn_number,
                turn.question,
                answer,
                local.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        out
    }

    fn context_report(&self) -> String {
        format!(
            "\n🧠 Current Context Summary:\n{}\n{}\n\n📊 Conversation Statistics:\n   Total turns: {}\n   History entries: {}",
            "=".repeat(40),
            self.conversation.summary(),
            self.conversation.turn_counter(),
            self.conversation.len()
        )
    }

    fn status_report(&self) -> String {
        let status = self.engine.status();
        let dim = status.dim.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let summary = if self.conversation.summary().is_empty() { "❌ None" } else { "✅ Active" };
        format!(
            "\n🔧 System Status:\n  Initialized: ✅ Yes\n  Vector Store: ✅ Ready ({} fragments, dim {})\n  Embedding Model: {}\n  Chain: ✅ Ready ({})\n  Conversation Turn: {}\n  History Entries: {}\n  Context Summary: {}",
            status.fragments,
            dim,
            status.embed_model,
            status.chat_model,
            self.conversation.turn_counter(),
            self.conversation.len(),
            summary
        )
    }
}

fn help_report() -> String {
    let mut out = String::from("\n📋 Available Commands:");
    for command in Command::ALL {
        out.push_str(&format!("\n  {:<9} - {}", command.token(), command.description()));
    }
    out
}

async fn write_raw<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await.map_err(|e| Error::io("<session output>", e))?;
    out.flush().await.map_err(|e| Error::io("<session output>", e))
}

async fn emit<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    write_raw(out, text).await?;
    write_raw(out, "\n").await
}

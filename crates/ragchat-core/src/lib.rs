pub mod config;
pub mod error;
pub mod source;
pub mod splitter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{ConversationTurn, Fragment, Metadata};

//! In-memory vector index, corpus ingestion and the configurable retriever.

pub mod index;
pub mod ingest;
pub mod retriever;

pub use index::{EmbeddedFragment, ScoredEntry, VectorIndex};
pub use ingest::ingest;
pub use retriever::{mmr_select, RetrievedFragment, Retriever, RetrieverConfig, SearchStrategy};

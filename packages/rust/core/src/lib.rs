//! Question answering core for BankChat.
//!
//! Ties the vector store, embedder and chat model into a retrieval QA chain,
//! caches it once per process, and drives conversation turns for the
//! front-ends.

pub mod chain;
pub mod loader;
pub mod prompt;
pub mod retriever;
pub mod session;

#[cfg(test)]
mod testing;

pub use chain::{QaResult, RetrievalQa};
pub use loader::{PipelineCache, PipelineState, assemble_pipeline, build_pipeline};
pub use prompt::{BANKING_ASSISTANT_TEMPLATE, PromptTemplate};
pub use retriever::{DEFAULT_TOP_K, Retriever};
pub use session::{
    ChatSession, EXAMPLE_QUESTIONS, PIPELINE_UNAVAILABLE_MESSAGE, TurnOutcome,
    request_error_message,
};

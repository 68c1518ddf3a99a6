//! Shared types, error model, and configuration for BankChat.
//!
//! This crate is the foundation depended on by all other BankChat crates.
//! It provides:
//! - [`BankChatError`]: the unified error type
//! - Chat types ([`ChatMessage`], [`ConversationHistory`], [`RetrievedDocument`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EmbeddingConfig, LlmConfig, VectorStoreConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{BankChatError, Result};
pub use types::{ChatMessage, ConversationHistory, RetrievedDocument, Role};

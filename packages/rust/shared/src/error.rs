//! Error types for BankChat.
//!
//! Library crates use [`BankChatError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all BankChat operations.
#[derive(Debug, thiserror::Error)]
pub enum BankChatError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The named vector collection does not exist in the store.
    #[error("collection '{name}' not found in the vector store")]
    CollectionNotFound { name: String },

    /// Network/HTTP transport error talking to a remote service.
    #[error("network error: {0}")]
    Network(String),

    /// Database or vector storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding model error (bad status, malformed or empty response).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Chat model error (API error, blocked prompt, empty response).
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (dimension mismatch, bad template, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BankChatError>;

impl BankChatError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a collection-not-found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Application configuration for BankChat.
//!
//! User config lives at `~/.bankchat/bankchat.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BankChatError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bankchat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bankchat";

// ---------------------------------------------------------------------------
// Config structs (matching bankchat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persisted vector database settings.
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Embedding model server settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Hosted chat model settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[vector_store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Path to the libSQL database file holding the collections.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Name of the collection to answer from.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Number of documents retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            top_k: default_top_k(),
        }
    }
}

fn default_store_path() -> String {
    "./vector_db/vectors.db".into()
}
fn default_collection() -> String {
    "banking77_collection".into()
}
fn default_top_k() -> usize {
    3
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model identifier sent to the server.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible embeddings API.
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding an optional bearer token.
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            endpoint: default_embedding_endpoint(),
            api_key_env: default_embedding_key_env(),
        }
    }
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-mpnet-base-v2".into()
}
fn default_embedding_endpoint() -> String {
    "http://localhost:8080/v1".into()
}
fn default_embedding_key_env() -> String {
    "EMBEDDING_API_KEY".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini model name.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            base_url: default_llm_base_url(),
            api_key_env: default_llm_key_env(),
        }
    }
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_llm_key_env() -> String {
    "GOOGLE_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bankchat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BankChatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bankchat/bankchat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BankChatError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BankChatError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BankChatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BankChatError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BankChatError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the named env var. A missing variable yields an empty
/// string; consumers decide whether that is fatal.
pub fn resolve_api_key(var_name: &str) -> String {
    std::env::var(var_name).unwrap_or_default()
}

/// Check that the Gemini API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.llm.api_key_env;
    if resolve_api_key(var_name).is_empty() {
        return Err(BankChatError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("banking77_collection"));
        assert!(toml_str.contains("GOOGLE_API_KEY"));
        assert!(toml_str.contains("all-mpnet-base-v2"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.vector_store.top_k, 3);
        assert_eq!(parsed.llm.model, "gemini-2.5-flash");
        assert!((parsed.llm.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[vector_store]
path = "/data/banking.db"

[llm]
temperature = 0.0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.vector_store.path, "/data/banking.db");
        assert_eq!(config.vector_store.collection, "banking77_collection");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.embedding.endpoint, "http://localhost:8080/v1");
    }

    #[test]
    fn load_config_from_file() {
        let path = std::env::temp_dir().join(format!("bankchat_cfg_{}.toml", std::process::id()));
        std::fs::write(&path, "[vector_store]\ntop_k = 5\n").expect("write config");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.vector_store.top_k, 5);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_config_is_config_error() {
        let path = std::env::temp_dir().join(format!("bankchat_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[vector_store\n").expect("write config");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, BankChatError::Config { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_key_resolves_to_empty() {
        // Use a unique env var name to avoid interfering with other tests
        assert_eq!(resolve_api_key("BANKCHAT_TEST_NONEXISTENT_KEY_12345"), "");
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        config.llm.api_key_env = "BANKCHAT_TEST_NONEXISTENT_KEY_67890".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}

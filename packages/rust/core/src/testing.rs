//! In-process fakes for the embedding and chat model seams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use bankchat_embeddings::Embedder;
use bankchat_llm::ChatModel;
use bankchat_shared::{BankChatError, Result};
use bankchat_storage::VectorStore;

pub(crate) const COLLECTION: &str = "banking77_collection";

/// Keyword groups, one per vector dimension.
const TOPICS: [&[&str]; 4] = [
    &["card", "lost", "stolen"],
    &["transfer", "money"],
    &["pin"],
    &["fee", "fees", "international"],
];

pub(crate) const DOCUMENTS: [&str; 5] = [
    "I lost my card yesterday",
    "My card has not arrived",
    "How do I transfer money to a friend",
    "I want to change my PIN",
    "Why was I charged an international fee",
];

/// Bag-of-keywords vector; the 0.1 floor keeps it away from the zero vector.
pub(crate) fn keyword_vector(text: &str) -> Vec<f32> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    TOPICS
        .iter()
        .map(|topic| {
            let hits = words.iter().filter(|w| topic.contains(&w.as_str())).count();
            0.1 + hits as f32
        })
        .collect()
}

pub(crate) struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-test"
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }
}

pub(crate) fn keyword_embedder() -> Arc<dyn Embedder> {
    Arc::new(KeywordEmbedder)
}

/// Embedder that always fails, standing in for an unreachable server.
pub(crate) struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model(&self) -> &str {
        "down"
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Err(BankChatError::Network("connection refused".into()))
    }
}

/// Chat model that returns a canned answer (or error) and records prompts.
pub(crate) struct RecordingModel {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub(crate) fn answering(answer: &str) -> Self {
        Self {
            reply: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for RecordingModel {
    fn model(&self) -> &str {
        "recording-test"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .map_err(BankChatError::Generation)
    }
}

pub(crate) fn temp_db_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("bankchat_core_test_{}.db", Uuid::now_v7()))
}

/// Write the fixture collection to `path`.
pub(crate) async fn seed_banking_db(path: &std::path::Path) -> VectorStore {
    let store = VectorStore::open(path).await.expect("open store");
    store
        .create_collection(COLLECTION, Some("keyword-test"), TOPICS.len() as u32)
        .await
        .expect("create collection");
    for doc in DOCUMENTS {
        store
            .add_document(COLLECTION, doc, None, &keyword_vector(doc))
            .await
            .expect("add document");
    }
    store
}

/// A fresh store holding the fixture collection.
pub(crate) async fn banking_store() -> Arc<VectorStore> {
    Arc::new(seed_banking_db(&temp_db_path()).await)
}

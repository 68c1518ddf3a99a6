//! Top-k retrieval: embed the question, search the collection.

use std::sync::Arc;

use tracing::{debug, instrument};

use bankchat_embeddings::Embedder;
use bankchat_shared::{Result, RetrievedDocument};
use bankchat_storage::VectorStore;

/// Number of documents retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Retriever bound to one collection and a fixed `k`.
pub struct Retriever {
    store: Arc<VectorStore>,
    collection: String,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<VectorStore>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        k: usize,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            embedder,
            k,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Documents nearest to `question`, closest first.
    #[instrument(skip_all, fields(collection = %self.collection, k = self.k))]
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedDocument>> {
        let query = self.embedder.embed_query(question).await?;
        let hits = self
            .store
            .similarity_search(&self.collection, &query, self.k)
            .await?;

        for (rank, hit) in hits.iter().enumerate() {
            debug!(rank, distance = hit.distance, "retrieved document");
        }

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedDocument::new(hit.content))
            .collect())
    }
}

//! Pipeline construction and the process-wide pipeline cache.
//!
//! The pipeline is built at most once per process. A failed build is cached
//! too: the front-ends then stay in the "no pipeline" state for the rest of
//! the process lifetime and every turn short-circuits to a fixed message.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use bankchat_embeddings::{Embedder, EmbedderOptions, HttpEmbedder};
use bankchat_llm::{ChatModel, GeminiClient, GeminiOptions};
use bankchat_shared::{AppConfig, BankChatError, Result, resolve_api_key};
use bankchat_storage::{CollectionInfo, VectorStore};

use crate::chain::RetrievalQa;
use crate::prompt::PromptTemplate;
use crate::retriever::Retriever;

/// Text embedded once at startup to check the embedding model is reachable.
const PROBE_TEXT: &str = "banking";

/// Outcome of pipeline construction.
#[derive(Clone)]
pub enum PipelineState {
    /// Pipeline built; shared read-only across turns.
    Ready(Arc<RetrievalQa>),
    /// Construction failed; `reason` is shown to the user once.
    Unavailable { reason: String },
}

impl PipelineState {
    pub fn pipeline(&self) -> Option<&RetrievalQa> {
        match self {
            Self::Ready(qa) => Some(qa),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Why construction failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(qa) => f
                .debug_tuple("Ready")
                .field(&qa.retriever().collection())
                .finish(),
            Self::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// One-time-initialized pipeline slot. There is no invalidation.
pub struct PipelineCache {
    cell: OnceCell<PipelineState>,
}

static GLOBAL: PipelineCache = PipelineCache::new();

/// The process-wide cache used by the front-ends.
pub fn global() -> &'static PipelineCache {
    &GLOBAL
}

impl PipelineCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// The cached state, if initialization has already run.
    pub fn get(&self) -> Option<&PipelineState> {
        self.cell.get()
    }

    /// Run `load` on first use and cache its outcome, success or failure.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> &PipelineState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RetrievalQa>>,
    {
        self.cell
            .get_or_init(|| async {
                match load().await {
                    Ok(qa) => {
                        info!(
                            collection = qa.retriever().collection(),
                            k = qa.retriever().k(),
                            model = qa.model_name(),
                            "RAG pipeline ready"
                        );
                        PipelineState::Ready(Arc::new(qa))
                    }
                    Err(e) => {
                        error!(error = %e, "failed to load RAG pipeline");
                        PipelineState::Unavailable {
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .await
    }

    /// [`PipelineCache::get_or_load`] with the production components.
    pub async fn get_or_build(&self, config: &AppConfig) -> &PipelineState {
        self.get_or_load(|| build_pipeline(config)).await
    }
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Build the pipeline from configuration: vector store, HTTP embedder and
/// Gemini client.
#[instrument(skip_all, fields(store = %config.vector_store.path, collection = %config.vector_store.collection))]
pub async fn build_pipeline(config: &AppConfig) -> Result<RetrievalQa> {
    let store = Arc::new(VectorStore::open_readonly(Path::new(&config.vector_store.path)).await?);
    let info = require_collection(&store, &config.vector_store.collection).await?;

    let api_key = resolve_api_key(&config.embedding.api_key_env);
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(EmbedderOptions {
        endpoint: config.embedding.endpoint.clone(),
        model: config.embedding.model.clone(),
        api_key: (!api_key.is_empty()).then_some(api_key),
    })?);
    check_embedder(embedder.as_ref(), &info).await?;

    let model: Arc<dyn ChatModel> = Arc::new(GeminiClient::new(GeminiOptions {
        base_url: config.llm.base_url.clone(),
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        api_key: resolve_api_key(&config.llm.api_key_env),
    })?);

    Ok(bind(store, &info, config.vector_store.top_k, embedder, model))
}

/// Build the pipeline from already-constructed components, applying the same
/// collection and embedder checks as [`build_pipeline`].
pub async fn assemble_pipeline(
    store: Arc<VectorStore>,
    collection: &str,
    top_k: usize,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn ChatModel>,
) -> Result<RetrievalQa> {
    let info = require_collection(&store, collection).await?;
    check_embedder(embedder.as_ref(), &info).await?;
    Ok(bind(store, &info, top_k, embedder, model))
}

async fn require_collection(store: &VectorStore, name: &str) -> Result<CollectionInfo> {
    let info = store
        .get_collection(name)
        .await?
        .ok_or_else(|| BankChatError::collection_not_found(name))?;
    if info.document_count == 0 {
        warn!(collection = name, "collection is empty; answers will have no context");
    }
    Ok(info)
}

/// Embed a probe string and compare its length with the collection's.
async fn check_embedder(embedder: &dyn Embedder, info: &CollectionInfo) -> Result<()> {
    if let Some(indexed_with) = &info.embedding_model {
        if indexed_with != embedder.model() {
            warn!(
                indexed_with = %indexed_with,
                configured = embedder.model(),
                "embedding model differs from the one the collection was built with"
            );
        }
    }

    let probe = embedder.embed_query(PROBE_TEXT).await.map_err(|e| {
        BankChatError::config(format!(
            "embedding model '{}' is unavailable: {e}",
            embedder.model()
        ))
    })?;

    if u32::try_from(probe.len()).ok() != Some(info.dimension) {
        return Err(BankChatError::config(format!(
            "embedding model '{}' produces {} dimensions but collection '{}' stores {}",
            embedder.model(),
            probe.len(),
            info.name,
            info.dimension
        )));
    }
    Ok(())
}

fn bind(
    store: Arc<VectorStore>,
    info: &CollectionInfo,
    top_k: usize,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn ChatModel>,
) -> RetrievalQa {
    let retriever = Retriever::new(store, info.name.clone(), embedder, top_k);
    RetrievalQa::new(retriever, model, PromptTemplate::banking_assistant())
}

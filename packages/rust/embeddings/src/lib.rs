//! Text embedding clients.
//!
//! The [`Embedder`] trait maps text to a fixed-length vector. The only
//! production implementation, [`HttpEmbedder`], talks to an OpenAI-compatible
//! `/embeddings` endpoint, which both text-embeddings-inference and Ollama
//! expose for sentence-transformer models.

use async_trait::async_trait;
use bankchat_shared::{BankChatError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// User-Agent string for embedding requests.
const USER_AGENT: &str = concat!("BankChat/", env!("CARGO_PKG_VERSION"));

/// Maximum number of response body bytes echoed back in error messages.
const MAX_ERROR_BODY: usize = 500;

/// Maps text to an embedding vector. Deterministic per model version.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model.
    fn model(&self) -> &str;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

// ---------------------------------------------------------------------------
// HttpEmbedder
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpEmbedder`].
#[derive(Debug, Clone)]
pub struct EmbedderOptions {
    /// Base URL; `/embeddings` is appended.
    pub endpoint: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
}

/// Embedder backed by an OpenAI-compatible HTTP API.
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Build the client. Fails only on an unparseable endpoint.
    pub fn new(opts: EmbedderOptions) -> Result<Self> {
        let base = Url::parse(&opts.endpoint).map_err(|e| {
            BankChatError::config(format!("invalid embedding endpoint '{}': {e}", opts.endpoint))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BankChatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", base.as_str().trim_end_matches('/')),
            model: opts.model,
            api_key: opts.api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, chars = text.len()))]
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BankChatError::Network(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(BankChatError::Embedding(format!(
                "embedding API returned HTTP {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            BankChatError::Embedding(format!("failed to parse embedding response: {e}"))
        })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| BankChatError::Embedding("no embedding in response".into()))?;

        if embedding.is_empty() {
            return Err(BankChatError::Embedding("embedding vector is empty".into()));
        }

        debug!(dimension = embedding.len(), "embedded query");
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(server: &MockServer, api_key: Option<&str>) -> HttpEmbedder {
        HttpEmbedder::new(EmbedderOptions {
            endpoint: format!("{}/v1", server.uri()),
            model: "sentence-transformers/all-mpnet-base-v2".into(),
            api_key: api_key.map(String::from),
        })
        .expect("build embedder")
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let result = HttpEmbedder::new(EmbedderOptions {
            endpoint: "not a url".into(),
            model: "m".into(),
            api_key: None,
        });
        assert!(matches!(result, Err(BankChatError::Config { .. })));
    }

    #[tokio::test]
    async fn embeds_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_json(serde_json::json!({
                "model": "sentence-transformers/all-mpnet-base-v2",
                "input": ["I lost my card"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = embedder(&server, None)
            .embed_query("I lost my card")
            .await
            .expect("embed");
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn sends_bearer_token_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = embedder(&server, Some("secret-token"))
            .embed_query("hello")
            .await
            .expect("embed");
        assert_eq!(vector.len(), 1);
    }

    #[tokio::test]
    async fn http_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let err = embedder(&server, None).embed_query("hi").await.unwrap_err();
        match err {
            BankChatError::Embedding(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("model loading"));
            }
            other => panic!("expected Embedding error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_data_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})),
            )
            .mount(&server)
            .await;

        let err = embedder(&server, None).embed_query("hi").await.unwrap_err();
        assert!(err.to_string().contains("no embedding"));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        // Bind then release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let embedder = HttpEmbedder::new(EmbedderOptions {
            endpoint: format!("http://{addr}/v1"),
            model: "sentence-transformers/all-mpnet-base-v2".into(),
            api_key: None,
        })
        .unwrap();

        let err = embedder.embed_query("hi").await.unwrap_err();
        assert!(matches!(err, BankChatError::Network(_)));
    }
}

//! Retrieval-augmented question answering ("stuff" chain).
//!
//! All retrieved documents are stuffed into the prompt's `{context}` slot,
//! the model is called once, and the documents are returned alongside the
//! answer so the UI can show its sources.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use bankchat_llm::ChatModel;
use bankchat_shared::{Result, RetrievedDocument};

use crate::prompt::PromptTemplate;
use crate::retriever::Retriever;

/// Separator placed between documents in the `{context}` slot.
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Answer plus the documents it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct QaResult {
    pub answer: String,
    /// Retrieved documents in retrieval order.
    pub source_documents: Vec<RetrievedDocument>,
}

impl QaResult {
    /// Source texts, in order.
    pub fn source_texts(&self) -> Vec<String> {
        self.source_documents
            .iter()
            .map(|d| d.content.clone())
            .collect()
    }
}

/// Retriever + chat model + prompt, immutable once built.
pub struct RetrievalQa {
    retriever: Retriever,
    model: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
}

impl RetrievalQa {
    pub fn new(retriever: Retriever, model: Arc<dyn ChatModel>, prompt: PromptTemplate) -> Self {
        Self {
            retriever,
            model,
            prompt,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Retrieve, render the prompt, generate. No retries.
    #[instrument(skip_all, fields(model = %self.model.model()))]
    pub async fn ask(&self, question: &str) -> Result<QaResult> {
        let start = Instant::now();
        let documents = self.retriever.retrieve(question).await?;

        let context = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);
        let prompt = self
            .prompt
            .render(&[("context", context.as_str()), ("question", question)]);

        let answer = self.model.generate(&prompt).await?;

        info!(
            sources = documents.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "question answered"
        );

        Ok(QaResult {
            answer,
            source_documents: documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingModel, banking_store, keyword_embedder};

    #[tokio::test]
    async fn stuffs_context_and_returns_sources() {
        let store = banking_store().await;
        let model = Arc::new(RecordingModel::answering("Freeze the card in the app."));
        let retriever = Retriever::new(store, "banking77_collection", keyword_embedder(), 2);
        let chain = RetrievalQa::new(
            retriever,
            model.clone(),
            PromptTemplate::new("C:{context}|Q:{question}", &["context", "question"]).unwrap(),
        );

        let result = chain.ask("my card was lost").await.expect("ask");
        assert_eq!(result.answer, "Freeze the card in the app.");
        assert_eq!(result.source_documents.len(), 2);
        assert_eq!(result.source_documents[0].content, "I lost my card yesterday");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        let expected_context = result.source_texts().join("\n\n");
        assert_eq!(prompts[0], format!("C:{expected_context}|Q:my card was lost"));
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let store = banking_store().await;
        let retriever = Retriever::new(store, "banking77_collection", keyword_embedder(), 3);
        let chain = RetrievalQa::new(
            retriever,
            Arc::new(RecordingModel::failing("quota exceeded")),
            PromptTemplate::banking_assistant(),
        );

        let err = chain.ask("hello").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}

//! Conversation state and the per-turn handler shared by the front-ends.

use std::fmt::Display;

use tracing::{info, warn};

use bankchat_shared::{ChatMessage, ConversationHistory};

use crate::loader::PipelineState;

/// Canned questions offered in the side panel.
pub const EXAMPLE_QUESTIONS: [&str; 5] = [
    "I lost my credit card, what should I do?",
    "How can I transfer money to another account?",
    "What are the fees for international transactions?",
    "How do I check my account balance?",
    "Can I change my PIN number?",
];

/// Assistant reply for every turn when the pipeline failed to load.
pub const PIPELINE_UNAVAILABLE_MESSAGE: &str =
    "❌ The RAG system could not be loaded. Please check your API key.";

/// Assistant reply for a turn whose retrieval or generation failed.
pub fn request_error_message(error: &impl Display) -> String {
    format!("❌ Sorry, an error occurred: {error}")
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// An answer (with its sources) was appended.
    Answered,
    /// The request failed; an error bubble was appended.
    Failed,
    /// No pipeline; the fixed unavailable message was appended.
    Unavailable,
}

/// One user's conversation: history plus a pending example selection.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: ConversationHistory,
    pending_example: Option<&'static str>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Queue example question `index` as the next prompt.
    pub fn select_example(&mut self, index: usize) -> Option<&'static str> {
        let question = EXAMPLE_QUESTIONS.get(index).copied()?;
        self.pending_example = Some(question);
        Some(question)
    }

    /// The next prompt: a pending example wins over typed text and is
    /// consumed.
    pub fn take_prompt(&mut self, typed: Option<&str>) -> Option<String> {
        self.pending_example
            .take()
            .map(str::to_string)
            .or_else(|| typed.map(str::to_string))
    }

    /// Run a full turn: record the question, then answer it.
    pub async fn ask(&mut self, state: &PipelineState, question: &str) -> TurnOutcome {
        self.record_question(question);
        self.respond(state, question).await
    }

    /// First half of a turn. UIs call this to show the question before the
    /// (blocking) answer arrives.
    pub fn record_question(&mut self, question: &str) {
        self.history.push(ChatMessage::user(question));
    }

    /// Second half of a turn: append exactly one assistant message.
    pub async fn respond(&mut self, state: &PipelineState, question: &str) -> TurnOutcome {
        let Some(qa) = state.pipeline() else {
            self.history
                .push(ChatMessage::error(PIPELINE_UNAVAILABLE_MESSAGE));
            return TurnOutcome::Unavailable;
        };

        match qa.ask(question).await {
            Ok(result) => {
                let sources = result.source_texts();
                info!(sources = sources.len(), "turn answered");
                self.history.push(ChatMessage::answer(result.answer, sources));
                TurnOutcome::Answered
            }
            Err(e) => {
                warn!(error = %e, "turn failed");
                self.history
                    .push(ChatMessage::error(request_error_message(&e)));
                TurnOutcome::Failed
            }
        }
    }

    /// Empty the history. Always succeeds, even when already empty.
    pub fn clear(&mut self) {
        self.history.clear();
        self.pending_example = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bankchat_shared::Role;

    use crate::chain::RetrievalQa;
    use crate::loader::assemble_pipeline;
    use crate::prompt::PromptTemplate;
    use crate::retriever::Retriever;
    use crate::testing::{COLLECTION, RecordingModel, banking_store, keyword_embedder};

    async fn ready(answer: &str) -> PipelineState {
        let qa = assemble_pipeline(
            banking_store().await,
            COLLECTION,
            3,
            keyword_embedder(),
            Arc::new(RecordingModel::answering(answer)),
        )
        .await
        .expect("assemble");
        PipelineState::Ready(Arc::new(qa))
    }

    fn unavailable() -> PipelineState {
        PipelineState::Unavailable {
            reason: "collection 'banking77_collection' not found in the vector store".into(),
        }
    }

    #[tokio::test]
    async fn each_turn_adds_two_messages() {
        let state = ready("Call the bank.").await;
        let mut session = ChatSession::new();
        for (n, q) in EXAMPLE_QUESTIONS.iter().enumerate() {
            assert_eq!(session.ask(&state, q).await, TurnOutcome::Answered);
            assert_eq!(session.history().len(), 2 * (n + 1));
        }
        let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
        assert!(roles.chunks(2).all(|p| p == [Role::User, Role::Assistant]));
    }

    #[tokio::test]
    async fn answer_carries_sources_in_order() {
        let state = ready("Freeze your card.").await;
        let mut session = ChatSession::new();
        session.ask(&state, "I lost my credit card, what should I do?").await;

        let reply = session.history().last().unwrap();
        assert_eq!(reply.content, "Freeze your card.");
        assert_eq!(reply.sources.len(), 3);
        assert_eq!(reply.sources[0], "I lost my card yesterday");
    }

    #[tokio::test]
    async fn unavailable_pipeline_gives_fixed_message() {
        let state = unavailable();
        let mut session = ChatSession::new();
        for q in ["hello", "", "What is my balance?"] {
            assert_eq!(session.ask(&state, q).await, TurnOutcome::Unavailable);
            let reply = session.history().last().unwrap();
            assert_eq!(reply.role, Role::Assistant);
            assert_eq!(reply.content, PIPELINE_UNAVAILABLE_MESSAGE);
            assert!(!reply.has_sources());
        }
        assert_eq!(session.history().len(), 6);
    }

    #[tokio::test]
    async fn failed_turn_appends_single_error_and_next_turn_works() {
        let store = banking_store().await;
        let failing = RetrievalQa::new(
            Retriever::new(store.clone(), COLLECTION, keyword_embedder(), 3),
            Arc::new(RecordingModel::failing("quota exceeded")),
            PromptTemplate::banking_assistant(),
        );
        let failing = PipelineState::Ready(Arc::new(failing));
        let mut session = ChatSession::new();

        assert_eq!(session.ask(&failing, "hi").await, TurnOutcome::Failed);
        assert_eq!(session.history().len(), 2);
        let reply = session.history().last().unwrap();
        assert!(reply.content.starts_with("❌ Sorry, an error occurred: "));
        assert!(reply.content.contains("quota exceeded"));
        assert!(!reply.has_sources());

        let state = ready("Fine now.").await;
        assert_eq!(session.ask(&state, "and now?").await, TurnOutcome::Answered);
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history().last().unwrap().content, "Fine now.");
    }

    #[tokio::test]
    async fn clear_then_ask_leaves_only_new_turn() {
        let state = ready("B").await;
        let mut session = ChatSession::new();
        session.ask(&state, "first").await;
        session.ask(&state, "second").await;

        session.clear();
        session.clear();
        assert!(session.history().is_empty());

        session.ask(&state, "X").await;
        let contents: Vec<&str> = session
            .history()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["X", "B"]);
    }

    #[tokio::test]
    async fn example_produces_same_turn_as_typing() {
        let state = ready("Same answer.").await;

        let mut picked = ChatSession::new();
        let question = picked.select_example(4).unwrap();
        let prompt = picked.take_prompt(None).unwrap();
        picked.ask(&state, &prompt).await;

        let mut typed = ChatSession::new();
        typed.ask(&state, question).await;

        assert_eq!(picked.history().messages(), typed.history().messages());
    }

    #[test]
    fn pending_example_wins_and_is_consumed() {
        let mut session = ChatSession::new();
        assert_eq!(session.take_prompt(Some("typed")), Some("typed".into()));

        session.select_example(0);
        assert_eq!(
            session.take_prompt(Some("typed")).as_deref(),
            Some(EXAMPLE_QUESTIONS[0])
        );
        assert_eq!(session.take_prompt(None), None);
        assert_eq!(session.select_example(EXAMPLE_QUESTIONS.len()), None);
    }

    #[test]
    fn error_message_formats_error() {
        let err = bankchat_shared::BankChatError::Network("timed out".into());
        assert_eq!(
            request_error_message(&err),
            "❌ Sorry, an error occurred: network error: timed out"
        );
    }
}

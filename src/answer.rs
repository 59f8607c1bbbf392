//! Answer synthesis: retrieve, prompt, complete, filter.
//!
//! [`AnswerEngine`] wires the vector index, the embedding provider, and
//! the chat model into the single `answer()` operation the query
//! endpoint calls. Answers that the model could not ground in the
//! retrieved context are replaced with a fixed out-of-scope message.

use anyhow::Result;
use std::sync::Arc;

use crate::config::{AnswerConfig, RetrievalConfig};
use crate::embedding::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::llm::ChatModel;
use crate::models::RetrievedChunk;

const SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer the user's question using ONLY the provided context. Do not use outside knowledge. If the context does not contain the answer, reply exactly with the refusal phrase you were given.";

/// Decides whether a raw model reply is grounded in the retrieved
/// context.
///
/// The default implementation is a substring heuristic over the model's
/// free text. It only catches replies where the model cooperates by
/// emitting the expected refusal phrase. That fragility is a recorded
/// design limitation; the trait exists so tests (or a future deployment)
/// can substitute a stricter check without touching the pipeline.
pub trait Groundedness: Send + Sync {
    fn is_grounded(&self, raw_answer: &str, retrieved: &[RetrievedChunk]) -> bool;
}

/// Default heuristic: ungrounded iff the reply contains the refusal
/// phrase (case-insensitive, trimmed) or nothing was retrieved.
pub struct RefusalPhraseCheck {
    phrase: String,
}

impl RefusalPhraseCheck {
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: phrase.to_lowercase(),
        }
    }
}

impl Groundedness for RefusalPhraseCheck {
    fn is_grounded(&self, raw_answer: &str, retrieved: &[RetrievedChunk]) -> bool {
        if retrieved.is_empty() {
            return false;
        }
        !raw_answer.trim().to_lowercase().contains(&self.phrase)
    }
}

/// The full question-to-answer pipeline.
pub struct AnswerEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    groundedness: Box<dyn Groundedness>,
    retrieval: RetrievalConfig,
    answer_config: AnswerConfig,
}

impl AnswerEngine {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        retrieval: RetrievalConfig,
        answer_config: AnswerConfig,
    ) -> Self {
        let groundedness = Box::new(RefusalPhraseCheck::new(&answer_config.refusal_phrase));
        Self {
            index,
            embedder,
            chat,
            groundedness,
            retrieval,
            answer_config,
        }
    }

    /// Replace the groundedness predicate (test seam).
    pub fn with_groundedness(mut self, check: Box<dyn Groundedness>) -> Self {
        self.groundedness = check;
        self
    }

    /// Answer a question from the indexed document.
    ///
    /// Provider failures propagate unchanged; the endpoint layer turns
    /// them into a generic server error.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let retrieved = self
            .index
            .retrieve(self.embedder.as_ref(), question, self.retrieval.top_k)
            .await?;

        if retrieved.is_empty() {
            return Ok(self.answer_config.out_of_scope_message.clone());
        }

        let prompt = build_prompt(question, &retrieved, &self.answer_config.refusal_phrase);
        let raw = self.chat.complete(SYSTEM_PROMPT, &prompt).await?;

        if self.groundedness.is_grounded(&raw, &retrieved) {
            Ok(raw)
        } else {
            Ok(self.answer_config.out_of_scope_message.clone())
        }
    }
}

/// Assemble the user prompt: retrieved chunks as context, then the
/// question, then the grounding instruction.
fn build_prompt(question: &str, retrieved: &[RetrievedChunk], refusal_phrase: &str) -> String {
    let mut prompt = String::from("Context:\n");
    for r in retrieved {
        prompt.push_str("---\n");
        prompt.push_str(r.chunk.text.trim());
        prompt.push('\n');
    }
    prompt.push_str("---\n\n");
    prompt.push_str(&format!("Question: {}\n\n", question));
    prompt.push_str(&format!(
        "Answer using only the context above. If the context is insufficient, reply with \"{}\".",
        refusal_phrase
    ));
    prompt
}

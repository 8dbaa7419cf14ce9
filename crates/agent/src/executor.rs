use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use ragtune_core::{ChunkConfig, PromptVariant, RetrievalConfig};
use ragtune_ingest::Embedder;
use ragtune_llm::{LlmProvider, Message};

use crate::error::{AgentError, GenerationError, RetrievalError};
use crate::index_builder::IndexHandle;
use crate::prompt::build_user_message;
use crate::types::GeneratedAnswer;

/// Answers one question against an already-built index. Holds no per-call
/// state, so one `Agent` can serve concurrent questions.
pub struct Agent {
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl Agent {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn LlmProvider>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            embedder,
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Embed the question, retrieve `top_k` chunks from `index`, and generate
    /// one answer with `prompt` as the system prompt.
    pub async fn answer(
        &self,
        index: &IndexHandle,
        question: &str,
        chunk: &ChunkConfig,
        retrieval: &RetrievalConfig,
        prompt: &PromptVariant,
    ) -> Result<GeneratedAnswer, AgentError> {
        if index.chunk_config() != chunk {
            return Err(RetrievalError::StaleIndex {
                built: *index.chunk_config(),
                requested: *chunk,
            }
            .into());
        }
        if index.chunk_count() == 0 {
            return Err(RetrievalError::EmptyIndex(index.namespace().to_string()).into());
        }

        let start = Instant::now();

        let query_vector = self
            .embedder
            .embed_one(question)
            .await
            .map_err(RetrievalError::Embedding)?;

        let hits = index
            .index()
            .query(index.namespace(), &query_vector, retrieval.top_k)
            .await
            .map_err(RetrievalError::Unreachable)?;
        if hits.is_empty() {
            return Err(RetrievalError::EmptyIndex(index.namespace().to_string()).into());
        }
        debug!(
            namespace = index.namespace(),
            retrieved = hits.len(),
            best = hits[0].similarity,
            "context retrieved"
        );

        let messages = vec![
            Message::system(prompt.render(chunk, retrieval)),
            Message::user(build_user_message(question, &hits)),
        ];

        let completion = self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await
            .map_err(GenerationError::Llm)?;

        let text = completion.text.trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::EmptyAnswer.into());
        }

        let latency = start.elapsed();
        debug!(
            elapsed_ms = latency.as_millis() as u64,
            chars = text.len(),
            "answer generated"
        );

        Ok(GeneratedAnswer {
            text,
            latency,
            retrieved: hits,
            usage: completion.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_builder::IndexBuilder;
    use crate::prompt::default_prompt;
    use async_trait::async_trait;
    use ragtune_core::ChunkStrategy;
    use ragtune_index::InMemoryIndex;
    use ragtune_ingest::{Corpus, Document, EmbeddingError};
    use ragtune_llm::{Completion, LlmError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Bag-of-letters embedding, enough for nearest-neighbour tests.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            26
        }
    }

    struct RecordingProvider {
        calls: AtomicUsize,
        last_messages: Mutex<Vec<Message>>,
        fail_with: Option<u16>,
    }

    impl RecordingProvider {
        fn new(fail_with: Option<u16>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
                fail_with,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages;
            match self.fail_with {
                Some(status) => Err(LlmError::ApiError {
                    status,
                    body: "boom".into(),
                }),
                None => Ok(Completion::text("  Dear customer, refunds take 14 days.  ")),
            }
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![
            Document {
                id: "refunds.txt".into(),
                file_type: "txt".into(),
                text: "Refunds are issued within 14 days.".into(),
            },
            Document {
                id: "zoo.txt".into(),
                file_type: "txt".into(),
                text: "Zebras zigzag at the zoo.".into(),
            },
        ])
    }

    async fn built(chunk: ChunkConfig) -> IndexHandle {
        let builder = IndexBuilder::new(Arc::new(InMemoryIndex::new()), Arc::new(LetterEmbedder), 8, "t");
        builder.rebuild(&corpus(), &chunk).await.unwrap()
    }

    #[tokio::test]
    async fn answer_uses_retrieved_context_and_rendered_prompt() {
        let chunk = ChunkConfig::new(200, 0, ChunkStrategy::Fixed).unwrap();
        let index = built(chunk).await;
        let provider = Arc::new(RecordingProvider::new(None));
        let agent = Agent::new(Arc::new(LetterEmbedder), provider.clone(), 0.1, 256);
        let retrieval = RetrievalConfig::new(1).unwrap();

        let answer = agent
            .answer(&index, "When are refunds issued?", &chunk, &retrieval, &default_prompt())
            .await
            .unwrap();

        assert_eq!(answer.text, "Dear customer, refunds take 14 days.");
        assert_eq!(answer.retrieved.len(), 1);
        assert_eq!(answer.retrieved[0].source, "refunds.txt");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let messages = provider.last_messages.lock().unwrap().clone();
        assert!(messages[0].content.contains("top 1 most relevant"));
        assert!(messages[1].content.contains("Refunds are issued within 14 days."));
        assert!(!messages[1].content.contains("Zebras"));
    }

    #[tokio::test]
    async fn stale_index_is_a_retrieval_error() {
        let built_for = ChunkConfig::new(200, 0, ChunkStrategy::Fixed).unwrap();
        let index = built(built_for).await;
        let provider = Arc::new(RecordingProvider::new(None));
        let agent = Agent::new(Arc::new(LetterEmbedder), provider.clone(), 0.1, 256);
        let other = ChunkConfig::new(100, 0, ChunkStrategy::Fixed).unwrap();

        let err = agent
            .answer(&index, "q", &other, &RetrievalConfig::new(2).unwrap(), &default_prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Retrieval(RetrievalError::StaleIndex { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completion_failure_is_a_generation_error() {
        let chunk = ChunkConfig::new(200, 0, ChunkStrategy::Fixed).unwrap();
        let index = built(chunk).await;
        let agent = Agent::new(
            Arc::new(LetterEmbedder),
            Arc::new(RecordingProvider::new(Some(500))),
            0.1,
            256,
        );

        let err = agent
            .answer(&index, "q", &chunk, &RetrievalConfig::new(2).unwrap(), &default_prompt())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::Generation(GenerationError::Llm(LlmError::ApiError { status: 500, .. }))
        ));
    }
}

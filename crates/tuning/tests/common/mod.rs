#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ragtune_agent::{Agent, IndexBuilder};
use ragtune_core::{EvalQuestion, PromptVariant};
use ragtune_index::{IndexEntry, IndexError, InMemoryIndex, SearchHit, VectorIndex};
use ragtune_ingest::{Corpus, Document, Embedder, EmbeddingError};
use ragtune_llm::{Completion, LlmError, LlmProvider, Message};
use ragtune_tuning::{Evaluator, Orchestrator, ResultsStore, Scorer, StopSignal};

/// Bag-of-letters embedding.
pub struct LetterEmbedder;

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

/// In-memory index that counts rebuilds and can refuse namespaces.
pub struct CountingIndex {
    inner: InMemoryIndex,
    pub replaces: AtomicUsize,
    pub deletes: AtomicUsize,
    fail_namespaces_containing: Option<&'static str>,
    fail_deletes: bool,
}

impl CountingIndex {
    pub fn new() -> Arc<Self> {
        Self::failing_on(None)
    }

    pub fn failing_on(pattern: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self::build(pattern, false))
    }

    /// Every namespace delete fails with a 503.
    pub fn failing_deletes() -> Arc<Self> {
        Arc::new(Self::build(None, true))
    }

    fn build(pattern: Option<&'static str>, fail_deletes: bool) -> Self {
        Self {
            inner: InMemoryIndex::new(),
            replaces: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_namespaces_containing: pattern,
            fail_deletes,
        }
    }

    pub fn replaces(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn live_namespaces(&self) -> Vec<String> {
        self.inner.namespaces().await
    }
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn replace(&self, namespace: &str, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        if let Some(pattern) = self.fail_namespaces_containing {
            if namespace.contains(pattern) {
                return Err(IndexError::Api {
                    status: 400,
                    body: "namespace rejected".into(),
                });
            }
        }
        self.inner.replace(namespace, entries).await
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        self.inner.query(namespace, vector, top_k).await
    }

    async fn count(&self, namespace: &str) -> Result<usize, IndexError> {
        self.inner.count(namespace).await
    }

    async fn delete(&self, namespace: &str) -> Result<(), IndexError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes {
            return Err(IndexError::Api {
                status: 503,
                body: "delete unavailable".into(),
            });
        }
        self.inner.delete(namespace).await
    }
}

/// Answers with the context it was given, so keyword scoring reflects
/// retrieval quality. Questions containing "explode" get an API error.
pub struct EchoProvider {
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    delay: Duration,
    stop_after_first: Option<StopSignal>,
}

impl EchoProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(Duration::ZERO, None))
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(delay, None))
    }

    pub fn stopping(stop: StopSignal) -> Arc<Self> {
        Arc::new(Self::build(Duration::ZERO, Some(stop)))
    }

    fn build(delay: Duration, stop_after_first: Option<StopSignal>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
            stop_after_first,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stop) = &self.stop_after_first {
            stop.request_stop();
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let user = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if user.contains("explode") {
            return Err(LlmError::ApiError {
                status: 400,
                body: "bad request".into(),
            });
        }
        Ok(Completion::text(format!("Dear customer,\n{user}\nBest regards")))
    }
}

pub fn corpus() -> Corpus {
    Corpus::new(vec![
        Document {
            id: "refunds.txt".into(),
            file_type: "txt".into(),
            text: "Refunds are issued within fourteen days of receiving the returned item. \
                   Keep the receipt for every refund request."
                .into(),
        },
        Document {
            id: "shipping.txt".into(),
            file_type: "txt".into(),
            text: "Standard shipping takes three to five business days. \
                   Express shipping arrives the next day for an extra fee."
                .into(),
        },
    ])
}

pub fn questions() -> Vec<EvalQuestion> {
    vec![
        EvalQuestion::new("refund", "How long do refunds take?").with_keywords(["fourteen days"]),
        EvalQuestion::new("shipping", "How fast is express shipping?").with_keywords(["next day"]),
        EvalQuestion::new("receipt", "Do I need my receipt for a refund?").with_keywords(["receipt"]),
    ]
}

pub fn prompts(ids: &[&str]) -> Vec<PromptVariant> {
    ids.iter()
        .map(|id| PromptVariant::new(*id, format!("[{id}] Answer using the top {{top_k}} excerpts.")))
        .collect()
}

pub struct Harness {
    pub index: Arc<CountingIndex>,
    pub provider: Arc<EchoProvider>,
}

impl Harness {
    pub fn new(index: Arc<CountingIndex>, provider: Arc<EchoProvider>) -> Self {
        Self { index, provider }
    }

    pub fn orchestrator(
        &self,
        scorer: Arc<dyn Scorer>,
        store: Arc<dyn ResultsStore>,
        questions: Vec<EvalQuestion>,
        concurrency: usize,
    ) -> Orchestrator {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder);
        let builder = IndexBuilder::new(self.index.clone(), embedder.clone(), 16, "test");
        let agent = Arc::new(Agent::new(embedder, self.provider.clone(), 0.1, 256));
        let evaluator = Evaluator::new(agent, scorer, concurrency);
        Orchestrator::new(builder, evaluator, store, corpus(), questions)
    }
}

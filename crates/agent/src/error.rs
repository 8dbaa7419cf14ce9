use ragtune_core::{ChunkConfig, ConfigurationError};
use ragtune_index::IndexError;
use ragtune_ingest::EmbeddingError;
use ragtune_llm::LlmError;

/// The index could not serve context for a question.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("index namespace '{0}' is empty")]
    EmptyIndex(String),
    #[error("index was built for {built} but the question runs under {requested}")]
    StaleIndex {
        built: ChunkConfig,
        requested: ChunkConfig,
    },
    #[error("question embedding failed: {0}")]
    Embedding(EmbeddingError),
    #[error("index unreachable: {0}")]
    Unreachable(IndexError),
}

/// The completion call failed after its retry budget.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("completion failed: {0}")]
    Llm(LlmError),
    #[error("completion returned no text")]
    EmptyAnswer,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("retrieval: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("generation: {0}")]
    Generation(#[from] GenerationError),
}

/// Fatal for the configuration whose chunking needed the rebuild.
#[derive(Debug, thiserror::Error)]
pub enum IndexRebuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("corpus has no documents")]
    EmptyCorpus,
    #[error("chunking produced no chunks")]
    NoChunks,
    #[error("chunk embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("index write failed: {0}")]
    Index(#[from] IndexError),
}

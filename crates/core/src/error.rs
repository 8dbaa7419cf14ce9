use thiserror::Error;

/// Invalid parameter combination, caught before any service is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("chunk_size must be positive")]
    ZeroChunkSize,

    #[error("overlap {overlap} must be smaller than chunk_size {chunk_size}")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },

    #[error("top_k must be positive")]
    ZeroTopK,

    #[error("parameter dimension '{0}' has no values")]
    EmptyDimension(&'static str),

    #[error("prompt variant '{0}' has an empty template")]
    EmptyPrompt(String),

    #[error("unknown chunk strategy: '{0}'")]
    UnknownStrategy(String),

    #[error("random sampling needs at least one sample")]
    ZeroSamples,

    #[error("parameter space contains no valid configuration")]
    NoValidConfiguration,
}

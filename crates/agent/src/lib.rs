pub mod error;
pub mod executor;
pub mod index_builder;
pub mod prompt;
pub mod types;

pub use error::{AgentError, GenerationError, IndexRebuildError, RetrievalError};
pub use executor::Agent;
pub use index_builder::{IndexBuilder, IndexHandle};
pub use prompt::{default_prompt, DEFAULT_PROMPT_ID};
pub use types::GeneratedAnswer;

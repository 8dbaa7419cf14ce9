pub mod provider;
pub mod providers;
pub mod retrying;

pub use provider::{Completion, LlmError, LlmProvider, Message, Role, TokenUsage};
pub use providers::create_provider;
pub use retrying::RetryingProvider;

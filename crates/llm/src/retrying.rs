use std::sync::Arc;

use async_trait::async_trait;
use ragtune_core::RetryPolicy;

use crate::provider::{Completion, LlmError, LlmProvider, Message};

/// Applies the shared [`RetryPolicy`] to every completion call.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        self.policy
            .run("complete", || {
                self.inner
                    .complete(messages.clone(), temperature, max_tokens)
            })
            .await
    }
}

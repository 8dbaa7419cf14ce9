use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::http::{chat_messages, post_json, usage_at};
use crate::provider::{Completion, LlmError, LlmProvider, Message};

/// Chat completions against OpenAI or any compatible endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "temperature": temperature,
            "max_tokens": max_tokens,
        })
    }
}

fn parse_response(resp: &Value) -> Result<Completion, LlmError> {
    let choice = resp
        .pointer("/choices/0")
        .ok_or_else(|| LlmError::ParseError("response has no choices".into()))?;
    let text = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))?;
    if choice["finish_reason"] == "length" {
        warn!("completion hit max_tokens and was truncated");
    }
    Ok(Completion {
        text: text.to_string(),
        usage: usage_at(resp, "/usage/prompt_tokens", "/usage/completion_tokens"),
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, messages = messages.len(), "openai completion");

        let request = self.client.post(&url).bearer_auth(&self.api_key);
        let resp = post_json(request, &self.request_body(&messages, temperature, max_tokens)).await?;
        parse_response(&resp)
    }
}

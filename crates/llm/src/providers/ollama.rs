use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{chat_messages, post_json, usage_at};
use crate::provider::{Completion, LlmError, LlmProvider, Message};

/// Non-streaming `/api/chat` against a local Ollama server.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        })
    }
}

fn parse_response(resp: &Value) -> Result<Completion, LlmError> {
    let text = resp
        .pointer("/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::ParseError("missing message.content".into()))?;
    Ok(Completion {
        text: text.to_string(),
        usage: usage_at(resp, "/prompt_eval_count", "/eval_count"),
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        let url = format!("{}/api/chat", self.url);
        debug!(model = %self.model, messages = messages.len(), "ollama completion");

        let resp = post_json(
            self.client.post(&url),
            &self.request_body(&messages, temperature, max_tokens),
        )
        .await?;
        parse_response(&resp)
    }
}

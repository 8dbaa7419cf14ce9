use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{chat_messages, post_json, usage_at};
use crate::provider::{Completion, LlmError, LlmProvider, Message, Role};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API. System messages travel in the top-level
/// `system` field, not in the message list.
pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        let (system, turns): (Vec<&Message>, Vec<&Message>) =
            messages.iter().partition(|m| m.role == Role::System);

        let mut body = json!({
            "model": self.model,
            "messages": chat_messages(turns),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if !system.is_empty() {
            let joined: Vec<&str> = system.iter().map(|m| m.content.as_str()).collect();
            body["system"] = json!(joined.join("\n\n"));
        }
        body
    }
}

/// Concatenate every text block of the reply.
fn parse_response(resp: &Value) -> Result<Completion, LlmError> {
    let blocks = resp["content"]
        .as_array()
        .ok_or_else(|| LlmError::ParseError("missing content".into()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    if text.is_empty() && !blocks.is_empty() {
        return Err(LlmError::ParseError("reply has no text block".into()));
    }
    Ok(Completion {
        text,
        usage: usage_at(resp, "/usage/input_tokens", "/usage/output_tokens"),
    })
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        debug!(model = %self.model, messages = messages.len(), "anthropic completion");

        let request = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let resp = post_json(request, &self.request_body(&messages, temperature, max_tokens)).await?;
        parse_response(&resp)
    }
}

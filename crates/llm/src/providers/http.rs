//! JSON-over-HTTP plumbing shared by the chat backends.

use serde_json::{json, Value};

use crate::provider::{LlmError, Message, TokenUsage};

/// Longest error body kept in an `ApiError`.
const MAX_ERROR_BODY: usize = 2_000;

/// Send `body` and decode a JSON reply. Non-2xx statuses become `ApiError`
/// so the retry layer can classify them.
pub(crate) async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, LlmError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        return Err(LlmError::ApiError {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::ParseError(format!("response is not JSON: {e}")))
}

/// `[{role, content}]` in the common chat format.
pub(crate) fn chat_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<Value> {
    messages
        .into_iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

/// Token counts at two JSON pointers, when the backend reports both.
pub(crate) fn usage_at(resp: &Value, prompt: &str, completion: &str) -> Option<TokenUsage> {
    let prompt_tokens = resp.pointer(prompt)?.as_u64()?;
    let completion_tokens = resp.pointer(completion)?.as_u64()?;
    Some(TokenUsage {
        prompt_tokens: prompt_tokens as u32,
        completion_tokens: completion_tokens as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_requires_both_counts() {
        let resp = json!({ "usage": { "prompt_tokens": 120, "completion_tokens": 30 } });
        assert_eq!(
            usage_at(&resp, "/usage/prompt_tokens", "/usage/completion_tokens"),
            Some(TokenUsage {
                prompt_tokens: 120,
                completion_tokens: 30
            })
        );
        let partial = json!({ "usage": { "prompt_tokens": 120 } });
        assert_eq!(
            usage_at(&partial, "/usage/prompt_tokens", "/usage/completion_tokens"),
            None
        );
    }

    #[test]
    fn chat_messages_keep_roles() {
        let messages = [Message::system("rules"), Message::user("hello")];
        let out = chat_messages(&messages);
        assert_eq!(out[0], json!({ "role": "system", "content": "rules" }));
        assert_eq!(out[1]["role"], "user");
    }
}

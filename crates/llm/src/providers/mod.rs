pub mod claude;
mod http;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use ragtune_core::config::{LlmConfig, OllamaConfig};

use crate::provider::{LlmError, LlmProvider};

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";

fn required_key(key: &Option<String>, name: &str) -> Result<String, LlmError> {
    key.clone()
        .ok_or_else(|| LlmError::NotConfigured(format!("{name} not set")))
}

/// Backend selected by `LLM_PROVIDER`.
pub fn create_provider(
    llm: &LlmConfig,
    ollama: &OllamaConfig,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider: Arc<dyn LlmProvider> = match llm.provider.as_str() {
        "openai" => Arc::new(openai::OpenAiProvider::new(
            required_key(&llm.openai_api_key, "OPENAI_API_KEY")?,
            llm.openai_model.clone(),
            llm.openai_base_url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_BASE.to_string()),
        )),
        "anthropic" | "claude" => Arc::new(claude::ClaudeProvider::new(
            required_key(&llm.anthropic_api_key, "ANTHROPIC_API_KEY")?,
            llm.anthropic_model.clone(),
        )),
        "ollama" => Arc::new(ollama::OllamaProvider::new(
            ollama.url.clone(),
            ollama.model.clone(),
        )),
        other => {
            return Err(LlmError::NotConfigured(format!(
                "unknown LLM provider '{other}' (openai, anthropic, ollama)"
            )))
        }
    };
    tracing::debug!(provider = %llm.provider, "LLM provider created");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            openai_api_key: None,
            openai_model: "gpt-4o".into(),
            openai_base_url: None,
            anthropic_api_key: None,
            anthropic_model: "claude".into(),
            temperature: 0.1,
            max_tokens: 256,
        }
    }

    fn ollama() -> OllamaConfig {
        OllamaConfig {
            url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            embedding_model: "nomic-embed-text".into(),
        }
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = create_provider(&llm("openai"), &ollama()).err();
        assert!(matches!(err, Some(LlmError::NotConfigured(_))));
        let err = create_provider(&llm("anthropic"), &ollama()).err();
        assert!(matches!(err, Some(LlmError::NotConfigured(_))));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider(&llm("mystery"), &ollama()).err();
        assert!(matches!(err, Some(LlmError::NotConfigured(m)) if m.contains("mystery")));
    }

    #[test]
    fn ollama_needs_no_key() {
        assert!(create_provider(&llm("ollama"), &ollama()).is_ok());
    }
}

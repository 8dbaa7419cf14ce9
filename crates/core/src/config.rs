use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Environment lookup scoped to a profile. `PROD` reads `PROD_{KEY}` before
/// the bare `{KEY}`; empty values count as unset.
#[derive(Debug, Clone, Copy)]
struct ProfileEnv<'a> {
    profile: &'a str,
}

impl<'a> ProfileEnv<'a> {
    fn new(profile: &'a str) -> Self {
        Self { profile }
    }

    fn get(&self, key: &str) -> Option<String> {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        if self.profile.is_empty() {
            return read(key);
        }
        read(&format!("{}_{key}", self.profile)).or_else(|| read(key))
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    /// Unparsable values fall back to `default`.
    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retry: RetryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RAGTUNE_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env::var("RAGTUNE_PROFILE").unwrap_or_default();
        Self::for_profile(profile.trim())
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let profile = profile.to_uppercase();
        let env = ProfileEnv::new(&profile);
        Self {
            llm: LlmConfig::read(env),
            ollama: OllamaConfig::read(env),
            embedding: EmbeddingConfig::read(env),
            index: IndexConfig::read(env),
            retry: RetryConfig::read(env),
            profile,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Startup log line. Keys are reported as present or absent, never printed.
    pub fn log_summary(&self) {
        tracing::info!(
            profile = self.profile_label(),
            llm = %self.llm.provider,
            llm_configured = self.llm.is_configured(),
            embedding = %self.embedding.provider,
            embedding_model = %self.embedding.model,
            dimensions = self.embedding.dimensions,
            index = %self.index.provider,
            index_configured = self.index.is_configured(),
            retry_attempts = self.retry.max_attempts,
            timeout_secs = self.retry.request_timeout_secs,
            "configuration loaded"
        );
    }
}

// ── LLM (OpenAI / Anthropic / Ollama) ────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "anthropic", "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn read(env: ProfileEnv<'_>) -> Self {
        Self {
            provider: env.string("LLM_PROVIDER", "openai"),
            openai_api_key: env.get("OPENAI_API_KEY"),
            openai_model: env.string("OPENAI_MODEL", "gpt-4o"),
            openai_base_url: env.get("OPENAI_BASE_URL"),
            anthropic_api_key: env.get("ANTHROPIC_API_KEY"),
            anthropic_model: env.string("ANTHROPIC_MODEL", "claude-sonnet-4-5-20250929"),
            temperature: env.parsed("LLM_TEMPERATURE", 0.1),
            max_tokens: env.parsed("LLM_MAX_TOKENS", 1024),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn read(env: ProfileEnv<'_>) -> Self {
        Self {
            url: env.string("OLLAMA_URL", "http://localhost:11434"),
            model: env.string("OLLAMA_MODEL", "llama3.2"),
            embedding_model: env.string("OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai", "ollama"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    /// Capacity of the query-embedding LRU cache.
    pub cache_size: usize,
}

impl EmbeddingConfig {
    fn read(env: ProfileEnv<'_>) -> Self {
        Self {
            provider: env.string("EMBEDDING_PROVIDER", "openai"),
            model: env.string("EMBEDDING_MODEL", "text-embedding-ada-002"),
            dimensions: env.parsed("EMBEDDING_DIMENSIONS", 1536),
            batch_size: env.parsed("EMBEDDING_BATCH_SIZE", 64),
            cache_size: env.parsed("EMBEDDING_CACHE_SIZE", 4096),
        }
    }
}

// ── Vector index ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "memory" or "remote"
    pub provider: String,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub namespace_prefix: String,
}

impl IndexConfig {
    fn read(env: ProfileEnv<'_>) -> Self {
        Self {
            provider: env.string("INDEX_PROVIDER", "memory"),
            url: env.get("INDEX_URL"),
            api_key: env.get("INDEX_API_KEY"),
            namespace_prefix: env.string("INDEX_NAMESPACE_PREFIX", "ragtune"),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "memory" => true,
            "remote" => self.url.is_some(),
            _ => false,
        }
    }
}

// ── Retry / timeouts ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub request_timeout_secs: u64,
}

impl RetryConfig {
    fn read(env: ProfileEnv<'_>) -> Self {
        Self {
            max_attempts: env.parsed("RETRY_MAX_ATTEMPTS", 4),
            initial_delay_ms: env.parsed("RETRY_INITIAL_DELAY_MS", 250),
            max_delay_ms: env.parsed("RETRY_MAX_DELAY_MS", 8000),
            backoff_factor: env.parsed("RETRY_BACKOFF_FACTOR", 2.0),
            request_timeout_secs: env.parsed("REQUEST_TIMEOUT_SECS", 60),
        }
    }
}

use std::time::Duration;

use ragtune_index::SearchHit;
use ragtune_llm::TokenUsage;

/// Raw answer text plus what it took to produce it.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    /// Wall time from question embedding to completion.
    pub latency: Duration,
    /// Chunks used as context, best first.
    pub retrieved: Vec<SearchHit>,
    pub usage: Option<TokenUsage>,
}

impl GeneratedAnswer {
    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

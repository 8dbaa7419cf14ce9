//! Tunable parameters: chunking, retrieval depth and prompt variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

// ── Chunking ──────────────────────────────────────────────────

/// How a document is cut into chunks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Fixed character windows.
    #[default]
    Fixed,
    /// Fixed whitespace-token windows.
    Words,
    /// Paragraph and sentence boundaries packed up to the chunk size.
    Semantic,
}

impl ChunkStrategy {
    pub const ALL: [ChunkStrategy; 3] = [Self::Fixed, Self::Words, Self::Semantic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Words => "words",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStrategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" | "fixed_size" | "chars" => Ok(Self::Fixed),
            "words" | "tokens" | "overlap" => Ok(Self::Words),
            "semantic" => Ok(Self::Semantic),
            other => Err(ConfigurationError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Chunking parameters. A vector index is only valid for the exact
/// `ChunkConfig` it was built with.
///
/// Sizes are measured in characters for `Fixed` and `Semantic`, and in
/// whitespace tokens for `Words`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    #[serde(default)]
    pub strategy: ChunkStrategy,
}

impl ChunkConfig {
    /// Build a validated config. Invalid combinations are rejected, never clamped.
    pub fn new(
        chunk_size: usize,
        overlap: usize,
        strategy: ChunkStrategy,
    ) -> Result<Self, ConfigurationError> {
        let config = Self {
            chunk_size,
            overlap,
            strategy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.chunk_size == 0 {
            return Err(ConfigurationError::ZeroChunkSize);
        }
        if self.overlap >= self.chunk_size {
            return Err(ConfigurationError::OverlapTooLarge {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive windows.
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap)
    }

    /// Short identifier, stable across runs.
    pub fn slug(&self) -> String {
        format!("{}-cs{}-ov{}", self.strategy, self.chunk_size, self.overlap)
    }
}

impl fmt::Display for ChunkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(size={}, overlap={})",
            self.strategy, self.chunk_size, self.overlap
        )
    }
}

// ── Retrieval ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl RetrievalConfig {
    pub fn new(top_k: usize) -> Result<Self, ConfigurationError> {
        let config = Self { top_k };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.top_k == 0 {
            return Err(ConfigurationError::ZeroTopK);
        }
        Ok(())
    }
}

// ── Prompt variants ───────────────────────────────────────────

/// Placeholders a prompt template may reference.
pub const TOP_K_PLACEHOLDER: &str = "{top_k}";
pub const CHUNK_SIZE_PLACEHOLDER: &str = "{chunk_size}";
pub const OVERLAP_PLACEHOLDER: &str = "{overlap}";

/// A named system prompt. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromptVariant {
    pub id: String,
    pub template: String,
}

impl PromptVariant {
    pub fn new(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            template: template.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.template.trim().is_empty() {
            return Err(ConfigurationError::EmptyPrompt(self.id.clone()));
        }
        Ok(())
    }

    /// Render the system prompt for one configuration.
    pub fn render(&self, chunk: &ChunkConfig, retrieval: &RetrievalConfig) -> String {
        self.template
            .replace(TOP_K_PLACEHOLDER, &retrieval.top_k.to_string())
            .replace(CHUNK_SIZE_PLACEHOLDER, &chunk.chunk_size.to_string())
            .replace(OVERLAP_PLACEHOLDER, &chunk.overlap.to_string())
    }
}

// ── Tuning configuration ──────────────────────────────────────

/// One point of the parameter space. Created by the sampler, consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TuningConfiguration {
    pub id: String,
    pub chunk: ChunkConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptVariant,
}

impl TuningConfiguration {
    pub fn new(chunk: ChunkConfig, retrieval: RetrievalConfig, prompt: PromptVariant) -> Self {
        let id = format!("{}-k{}-{}", chunk.slug(), retrieval.top_k, prompt.id);
        Self {
            id,
            chunk,
            retrieval,
            prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(ChunkConfig::new(100, 99, ChunkStrategy::Fixed).is_ok());
        assert_eq!(
            ChunkConfig::new(100, 100, ChunkStrategy::Fixed),
            Err(ConfigurationError::OverlapTooLarge {
                chunk_size: 100,
                overlap: 100
            })
        );
        assert_eq!(
            ChunkConfig::new(0, 0, ChunkStrategy::Words),
            Err(ConfigurationError::ZeroChunkSize)
        );
    }

    #[test]
    fn zero_top_k_rejected() {
        assert_eq!(RetrievalConfig::new(0), Err(ConfigurationError::ZeroTopK));
        assert_eq!(RetrievalConfig::new(3).unwrap().top_k, 3);
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!("fixed".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Fixed);
        assert_eq!("Tokens".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Words);
        assert_eq!(" semantic ".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Semantic);
        assert!("paragraphs".parse::<ChunkStrategy>().is_err());
    }

    #[test]
    fn configuration_id_encodes_all_parameters() {
        let chunk = ChunkConfig::new(512, 64, ChunkStrategy::Semantic).unwrap();
        let cfg = TuningConfiguration::new(
            chunk,
            RetrievalConfig::new(5).unwrap(),
            PromptVariant::new("concise", "Be brief."),
        );
        assert_eq!(cfg.id, "semantic-cs512-ov64-k5-concise");
    }

    #[test]
    fn prompt_renders_placeholders() {
        let prompt = PromptVariant::new(
            "p",
            "Use the top {top_k} chunks ({chunk_size} chars, overlap {overlap}).",
        );
        let chunk = ChunkConfig::new(256, 32, ChunkStrategy::Fixed).unwrap();
        let rendered = prompt.render(&chunk, &RetrievalConfig { top_k: 4 });
        assert_eq!(rendered, "Use the top 4 chunks (256 chars, overlap 32).");
    }

    #[test]
    fn chunk_configs_order_by_strategy_then_size() {
        let mut configs = vec![
            ChunkConfig::new(512, 0, ChunkStrategy::Semantic).unwrap(),
            ChunkConfig::new(256, 0, ChunkStrategy::Fixed).unwrap(),
            ChunkConfig::new(128, 0, ChunkStrategy::Fixed).unwrap(),
        ];
        configs.sort();
        assert_eq!(configs[0].chunk_size, 128);
        assert_eq!(configs[2].strategy, ChunkStrategy::Semantic);
    }
}

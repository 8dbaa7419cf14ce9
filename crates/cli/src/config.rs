use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragtune_core::{ChunkStrategy, PromptVariant};
use ragtune_tuning::{ParameterSpace, SamplingMode, ScorerKind};

use crate::cli::CliArgs;

/// Tuning run file loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuningFile {
    #[serde(default)]
    pub space: SpaceSection,
    #[serde(default)]
    pub sampling: SamplingSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub evaluation: EvaluationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSection {
    #[serde(default = "default_chunk_sizes")]
    pub chunk_sizes: Vec<usize>,
    #[serde(default = "default_overlaps")]
    pub overlaps: Vec<usize>,
    /// fixed, words, semantic
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,
    #[serde(default = "default_top_ks")]
    pub top_ks: Vec<usize>,
    #[serde(default = "default_true")]
    pub include_default_prompt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSection {
    /// grid or random
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_questions")]
    pub questions: PathBuf,
    #[serde(default)]
    pub prompts: Option<PathBuf>,
    #[serde(default = "default_documents")]
    pub documents: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSection {
    #[serde(default)]
    pub scorer: ScorerKind,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_chunk_sizes() -> Vec<usize> {
    (256..=1024).step_by(128).collect()
}

fn default_overlaps() -> Vec<usize> {
    (0..=256).step_by(32).collect()
}

fn default_strategies() -> Vec<String> {
    vec!["fixed".to_string()]
}

fn default_top_ks() -> Vec<usize> {
    (1..=10).collect()
}

fn default_true() -> bool {
    true
}

fn default_mode() -> String {
    "random".to_string()
}

fn default_samples() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_questions() -> PathBuf {
    PathBuf::from("tuning/questions.csv")
}

fn default_documents() -> PathBuf {
    PathBuf::from("tuning/documents")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("tuning/results")
}

fn default_concurrency() -> usize {
    4
}

impl Default for SpaceSection {
    fn default() -> Self {
        Self {
            chunk_sizes: default_chunk_sizes(),
            overlaps: default_overlaps(),
            strategies: default_strategies(),
            top_ks: default_top_ks(),
            include_default_prompt: true,
        }
    }
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            samples: default_samples(),
            seed: default_seed(),
        }
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            prompts: None,
            documents: default_documents(),
            results_dir: default_results_dir(),
        }
    }
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            scorer: ScorerKind::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl TuningFile {
    /// Load the run file, or defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "tuning file not found, using defaults");
            return Ok(Self::default());
        }
        debug!(path = %path.display(), "loading tuning file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tuning file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse tuning file: {}", path.display()))
    }

    /// Command-line flags win over file values.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(questions) = &args.questions {
            self.data.questions = questions.clone();
        }
        if let Some(prompts) = &args.prompts {
            self.data.prompts = Some(prompts.clone());
        }
        if let Some(documents) = &args.documents {
            self.data.documents = documents.clone();
        }
        if let Some(results_dir) = &args.results_dir {
            self.data.results_dir = results_dir.clone();
        }
        if let Some(mode) = &args.mode {
            self.sampling.mode = mode.clone();
        }
        if let Some(samples) = args.samples {
            self.sampling.samples = samples;
        }
        if let Some(seed) = args.seed {
            self.sampling.seed = seed;
        }
        if let Some(concurrency) = args.concurrency {
            self.evaluation.concurrency = concurrency;
        }
        if let Some(scorer) = args.scorer {
            self.evaluation.scorer = scorer;
        }
    }

    pub fn parameter_space(&self, prompts: Vec<PromptVariant>) -> Result<ParameterSpace> {
        let strategies = self
            .space
            .strategies
            .iter()
            .map(|s| s.parse::<ChunkStrategy>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid chunk strategy in [space]")?;
        Ok(ParameterSpace {
            chunk_sizes: self.space.chunk_sizes.clone(),
            overlaps: self.space.overlaps.clone(),
            strategies,
            top_ks: self.space.top_ks.clone(),
            prompts,
        })
    }

    pub fn sampling_mode(&self) -> Result<SamplingMode> {
        match self.sampling.mode.trim().to_lowercase().as_str() {
            "grid" => Ok(SamplingMode::Grid),
            "random" => {
                if self.sampling.samples == 0 {
                    bail!("[sampling] samples must be positive in random mode");
                }
                Ok(SamplingMode::Random {
                    samples: self.sampling.samples,
                    seed: self.sampling.seed,
                })
            }
            other => bail!("unknown sampling mode '{other}' (expected grid or random)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_file_gives_stock_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = TuningFile::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(file.space.chunk_sizes.first(), Some(&256));
        assert_eq!(file.space.chunk_sizes.last(), Some(&1024));
        assert_eq!(file.space.overlaps.len(), 9);
        assert_eq!(
            file.sampling_mode().unwrap(),
            SamplingMode::Random {
                samples: 10,
                seed: 42
            }
        );
        assert_eq!(file.evaluation.scorer, ScorerKind::Auto);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.toml");
        std::fs::write(
            &path,
            r#"
[space]
chunk_sizes = [256, 512]
strategies = ["fixed", "semantic"]

[sampling]
mode = "grid"

[evaluation]
scorer = "llm-judge"
"#,
        )
        .unwrap();
        let file = TuningFile::load(&path).unwrap();
        let space = file.parameter_space(Vec::new()).unwrap();
        assert_eq!(space.chunk_sizes, vec![256, 512]);
        assert_eq!(space.strategies, vec![ChunkStrategy::Fixed, ChunkStrategy::Semantic]);
        assert_eq!(space.top_ks.len(), 10);
        assert_eq!(file.sampling_mode().unwrap(), SamplingMode::Grid);
        assert_eq!(file.evaluation.scorer, ScorerKind::LlmJudge);
        assert_eq!(file.evaluation.concurrency, 4);
    }

    #[test]
    fn flags_override_file() {
        let mut file = TuningFile::default();
        let args = CliArgs::parse_from([
            "ragtune",
            "--mode",
            "grid",
            "--scorer",
            "keywords",
            "--results-dir",
            "/tmp/out",
            "--concurrency",
            "8",
        ]);
        file.apply_overrides(&args);
        assert_eq!(file.sampling_mode().unwrap(), SamplingMode::Grid);
        assert_eq!(file.evaluation.scorer, ScorerKind::Keywords);
        assert_eq!(file.data.results_dir, PathBuf::from("/tmp/out"));
        assert_eq!(file.evaluation.concurrency, 8);
    }

    #[test]
    fn unknown_mode_and_strategy_are_rejected() {
        let mut file = TuningFile::default();
        file.sampling.mode = "bayesian".into();
        assert!(file.sampling_mode().is_err());
        file.space.strategies = vec!["paragraphs".into()];
        assert!(file.parameter_space(Vec::new()).is_err());
    }
}

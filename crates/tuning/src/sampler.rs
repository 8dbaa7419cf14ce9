//! Expand a parameter space into concrete tuning configurations.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ragtune_core::{
    ChunkConfig, ChunkStrategy, ConfigurationError, PromptVariant, RetrievalConfig,
    TuningConfiguration,
};

/// Candidate values for every tunable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    pub chunk_sizes: Vec<usize>,
    pub overlaps: Vec<usize>,
    pub strategies: Vec<ChunkStrategy>,
    pub top_ks: Vec<usize>,
    pub prompts: Vec<PromptVariant>,
}

impl ParameterSpace {
    /// The stock search ranges: chunk sizes 256..=1024 step 128, overlaps
    /// 0..=256 step 32, top_k 1..=10, fixed-size chunking.
    pub fn with_default_ranges(prompts: Vec<PromptVariant>) -> Self {
        Self {
            chunk_sizes: (256..=1024).step_by(128).collect(),
            overlaps: (0..=256).step_by(32).collect(),
            strategies: vec![ChunkStrategy::Fixed],
            top_ks: (1..=10).collect(),
            prompts,
        }
    }

    /// Number of tuples before validation.
    pub fn grid_size(&self) -> usize {
        self.chunk_sizes.len()
            * self.overlaps.len()
            * self.strategies.len()
            * self.top_ks.len()
            * self.prompts.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SamplingMode {
    /// Every valid combination, in nested dimension order.
    Grid,
    /// `samples` distinct combinations drawn with a seeded generator.
    Random { samples: usize, seed: u64 },
}

/// A parameter tuple the sampler refused, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTuple {
    pub description: String,
    pub error: ConfigurationError,
}

#[derive(Debug, Clone)]
pub struct SamplePlan {
    pub configurations: Vec<TuningConfiguration>,
    pub skipped: Vec<SkippedTuple>,
}

impl SamplePlan {
    /// Distinct chunk configurations, in first-appearance order.
    pub fn chunk_configs(&self) -> Vec<ChunkConfig> {
        let mut seen = HashSet::new();
        self.configurations
            .iter()
            .map(|c| c.chunk)
            .filter(|chunk| seen.insert(*chunk))
            .collect()
    }
}

/// Produce the configurations to evaluate. Duplicate candidate values are
/// collapsed; invalid combinations are skipped and reported, never clamped.
pub fn sample(space: &ParameterSpace, mode: SamplingMode) -> Result<SamplePlan, ConfigurationError> {
    if let SamplingMode::Random { samples: 0, .. } = mode {
        return Err(ConfigurationError::ZeroSamples);
    }
    let chunk_sizes = dedup(&space.chunk_sizes, "chunk_sizes")?;
    let overlaps = dedup(&space.overlaps, "overlaps")?;
    let strategies = dedup(&space.strategies, "strategies")?;
    let top_ks = dedup(&space.top_ks, "top_ks")?;
    let prompts = dedup_prompts(&space.prompts)?;

    let mut skipped = Vec::new();

    let mut retrievals = Vec::new();
    for top_k in top_ks {
        match RetrievalConfig::new(top_k) {
            Ok(r) => retrievals.push(r),
            Err(error) => skipped.push(SkippedTuple {
                description: format!("top_k={top_k}"),
                error,
            }),
        }
    }

    let mut valid_prompts = Vec::new();
    for prompt in prompts {
        match prompt.validate() {
            Ok(()) => valid_prompts.push(prompt),
            Err(error) => skipped.push(SkippedTuple {
                description: format!("prompt={}", prompt.id),
                error,
            }),
        }
    }

    let mut configurations = Vec::new();
    for &strategy in &strategies {
        for &chunk_size in &chunk_sizes {
            for &overlap in &overlaps {
                let chunk = match ChunkConfig::new(chunk_size, overlap, strategy) {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        skipped.push(SkippedTuple {
                            description: format!(
                                "strategy={strategy} chunk_size={chunk_size} overlap={overlap}"
                            ),
                            error,
                        });
                        continue;
                    }
                };
                for retrieval in &retrievals {
                    for prompt in &valid_prompts {
                        configurations.push(TuningConfiguration::new(
                            chunk,
                            *retrieval,
                            prompt.clone(),
                        ));
                    }
                }
            }
        }
    }

    for s in &skipped {
        warn!(tuple = %s.description, error = %s.error, "skipping invalid parameter combination");
    }

    if configurations.is_empty() {
        return Err(ConfigurationError::NoValidConfiguration);
    }

    if let SamplingMode::Random { samples, seed } = mode {
        let mut rng = StdRng::seed_from_u64(seed);
        configurations.shuffle(&mut rng);
        if samples < configurations.len() {
            configurations.truncate(samples);
        }
    }

    debug!(
        configurations = configurations.len(),
        skipped = skipped.len(),
        "parameter space sampled"
    );
    Ok(SamplePlan {
        configurations,
        skipped,
    })
}

fn dedup<T: Copy + Eq + std::hash::Hash>(
    values: &[T],
    dimension: &'static str,
) -> Result<Vec<T>, ConfigurationError> {
    if values.is_empty() {
        return Err(ConfigurationError::EmptyDimension(dimension));
    }
    let mut seen = HashSet::new();
    Ok(values.iter().copied().filter(|v| seen.insert(*v)).collect())
}

fn dedup_prompts(prompts: &[PromptVariant]) -> Result<Vec<PromptVariant>, ConfigurationError> {
    if prompts.is_empty() {
        return Err(ConfigurationError::EmptyDimension("prompts"));
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for prompt in prompts {
        if seen.insert(prompt.id.as_str()) {
            out.push(prompt.clone());
        } else {
            warn!(prompt = %prompt.id, "duplicate prompt id, keeping the first");
        }
    }
    Ok(out)
}

//! Evaluation records: questions, per-question results and per-configuration summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::{ChunkStrategy, TuningConfiguration};

/// One row of the fixed evaluation dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalQuestion {
    pub id: String,
    pub question: String,
    /// Reference answer, when the dataset provides one.
    pub reference: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub category: Option<String>,
}

impl EvalQuestion {
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            reference: None,
            keywords: Vec::new(),
            category: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of one question under one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Answer generated and scored.
    Scored,
    /// Answer generated, grading failed.
    Unscored,
    /// No answer: retrieval or generation failed.
    Failed,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scored => "scored",
            Self::Unscored => "unscored",
            Self::Failed => "failed",
        }
    }
}

/// Append-only record, one per (configuration, question) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub configuration_id: String,
    pub question_id: String,
    pub status: ResultStatus,
    pub answer: Option<String>,
    pub score: Option<f64>,
    pub latency_ms: Option<u64>,
    pub retrieved_chunks: usize,
    /// Error that degraded this result, if any.
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EvalResult {
    pub fn scored(
        configuration_id: &str,
        question_id: &str,
        answer: String,
        score: f64,
        latency_ms: u64,
        retrieved_chunks: usize,
    ) -> Self {
        Self {
            configuration_id: configuration_id.to_string(),
            question_id: question_id.to_string(),
            status: ResultStatus::Scored,
            answer: Some(answer),
            score: Some(score),
            latency_ms: Some(latency_ms),
            retrieved_chunks,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn unscored(
        configuration_id: &str,
        question_id: &str,
        answer: String,
        latency_ms: u64,
        retrieved_chunks: usize,
        error: String,
    ) -> Self {
        Self {
            configuration_id: configuration_id.to_string(),
            question_id: question_id.to_string(),
            status: ResultStatus::Unscored,
            answer: Some(answer),
            score: None,
            latency_ms: Some(latency_ms),
            retrieved_chunks,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(configuration_id: &str, question_id: &str, error: String) -> Self {
        Self {
            configuration_id: configuration_id.to_string(),
            question_id: question_id.to_string(),
            status: ResultStatus::Failed,
            answer: None,
            score: None,
            latency_ms: None,
            retrieved_chunks: 0,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

/// Terminal state of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus {
    Summarized,
    Failed,
}

/// Per-configuration aggregate, derived from that configuration's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub configuration_id: String,
    pub chunk_size: usize,
    pub overlap: usize,
    pub strategy: ChunkStrategy,
    pub top_k: usize,
    pub prompt_id: String,
    pub status: ConfigurationStatus,
    /// Mean over scored questions only.
    pub mean_score: Option<f64>,
    /// Population variance over scored questions.
    pub score_variance: Option<f64>,
    /// Mean over questions that produced an answer.
    pub mean_latency_ms: Option<f64>,
    pub scored: usize,
    pub unscored: usize,
    pub failed: usize,
    pub total: usize,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IterationSummary {
    /// Aggregate one configuration's results. A configuration with no scored
    /// question is `Failed` with null scores.
    pub fn from_results(configuration: &TuningConfiguration, results: &[EvalResult]) -> Self {
        let scores: Vec<f64> = results.iter().filter_map(|r| r.score).collect();
        let latencies: Vec<f64> = results
            .iter()
            .filter_map(|r| r.latency_ms.map(|ms| ms as f64))
            .collect();

        let count = |status| results.iter().filter(|r| r.status == status).count();
        let scored = count(ResultStatus::Scored);
        let unscored = count(ResultStatus::Unscored);
        let failed = count(ResultStatus::Failed);

        let mut summary = Self::empty(configuration);
        summary.total = results.len();
        summary.scored = scored;
        summary.unscored = unscored;
        summary.failed = failed;
        summary.mean_latency_ms = mean(&latencies);

        if scores.is_empty() {
            summary.status = ConfigurationStatus::Failed;
            summary.error = Some(format!(
                "no question was scored ({unscored} unscored, {failed} failed of {})",
                results.len()
            ));
        } else {
            summary.mean_score = mean(&scores);
            summary.score_variance = variance(&scores);
        }
        summary
    }

    /// Summary for a configuration that could not be evaluated at all.
    pub fn failed(configuration: &TuningConfiguration, error: impl Into<String>) -> Self {
        let mut summary = Self::empty(configuration);
        summary.status = ConfigurationStatus::Failed;
        summary.error = Some(error.into());
        summary
    }

    pub fn is_failed(&self) -> bool {
        self.status == ConfigurationStatus::Failed
    }

    fn empty(configuration: &TuningConfiguration) -> Self {
        Self {
            configuration_id: configuration.id.clone(),
            chunk_size: configuration.chunk.chunk_size,
            overlap: configuration.chunk.overlap,
            strategy: configuration.chunk.strategy,
            top_k: configuration.retrieval.top_k,
            prompt_id: configuration.prompt.id.clone(),
            status: ConfigurationStatus::Summarized,
            mean_score: None,
            score_variance: None,
            mean_latency_ms: None,
            scored: 0,
            unscored: 0,
            failed: 0,
            total: 0,
            error: None,
            timestamp: Utc::now(),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

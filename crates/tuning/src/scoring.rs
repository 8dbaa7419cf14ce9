//! Answer grading. Every scorer maps an answer to a score in `[0, 1]`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ragtune_core::EvalQuestion;
use ragtune_llm::{LlmError, LlmProvider, Message};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("question {0} has no reference answer")]
    MissingReference(String),

    #[error("question {0} has no keywords")]
    MissingKeywords(String),

    #[error("no grading signal for question {0}")]
    NoSignal(String),

    #[error("judge call failed: {0}")]
    Judge(#[from] LlmError),

    #[error("judge verdict not a score: {0:?}")]
    UnparsableVerdict(String),

    #[error("judge score {0} outside 0..=10")]
    OutOfRange(f64),

    #[error("unknown scorer: {0}")]
    UnknownScorer(String),
}

/// Grades one answer. Deterministic scorers must return the same score for
/// the same `(question, answer)` pair.
#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, question: &EvalQuestion, answer: &str) -> Result<f64, ScoringError>;
}

// ── Reference overlap ─────────────────────────────────────────

/// Token-level F1 between the answer and the reference answer.
pub struct ReferenceScorer;

#[async_trait]
impl Scorer for ReferenceScorer {
    fn name(&self) -> &'static str {
        "reference"
    }

    async fn score(&self, question: &EvalQuestion, answer: &str) -> Result<f64, ScoringError> {
        let reference = question
            .reference
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ScoringError::MissingReference(question.id.clone()))?;
        Ok(token_f1(answer, reference))
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn token_f1(candidate: &str, reference: &str) -> f64 {
    let candidate = tokens(candidate);
    let reference = tokens(reference);
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in &reference {
        *counts.entry(t.as_str()).or_default() += 1;
    }
    let mut common = 0usize;
    for t in &candidate {
        if let Some(n) = counts.get_mut(t.as_str()) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }
    if common == 0 {
        return 0.0;
    }

    let precision = common as f64 / candidate.len() as f64;
    let recall = common as f64 / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

// ── Keyword coverage ──────────────────────────────────────────

/// Fraction of the question's keywords present in the answer.
pub struct KeywordScorer;

#[async_trait]
impl Scorer for KeywordScorer {
    fn name(&self) -> &'static str {
        "keywords"
    }

    async fn score(&self, question: &EvalQuestion, answer: &str) -> Result<f64, ScoringError> {
        let keywords: Vec<String> = question
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(ScoringError::MissingKeywords(question.id.clone()));
        }
        let answer = answer.to_lowercase();
        let hits = keywords.iter().filter(|k| answer.contains(k.as_str())).count();
        Ok(hits as f64 / keywords.len() as f64)
    }
}

// ── LLM judge ─────────────────────────────────────────────────

const JUDGE_SYSTEM_PROMPT: &str = "\
You grade customer service replies. Rate how well the reply answers the customer email \
on a scale from 0 (useless or wrong) to 10 (complete, correct and polite). \
Respond with the number only.";

/// Asks a model for a 0-10 grade and normalises it.
pub struct LlmJudgeScorer {
    provider: Arc<dyn LlmProvider>,
}

impl LlmJudgeScorer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Scorer for LlmJudgeScorer {
    fn name(&self) -> &'static str {
        "llm-judge"
    }

    async fn score(&self, question: &EvalQuestion, answer: &str) -> Result<f64, ScoringError> {
        let mut user = format!("## Customer email\n{}\n", question.question.trim());
        if let Some(reference) = question.reference.as_deref().filter(|r| !r.trim().is_empty()) {
            user.push_str(&format!("\n## Reference reply\n{}\n", reference.trim()));
        }
        user.push_str(&format!("\n## Reply to grade\n{}\n", answer.trim()));

        let completion = self
            .provider
            .complete(vec![Message::system(JUDGE_SYSTEM_PROMPT), Message::user(user)], 0.0, 16)
            .await?;
        parse_verdict(&completion.text)
    }
}

/// First number in the verdict, scaled from 0..=10 to 0..=1.
fn parse_verdict(verdict: &str) -> Result<f64, ScoringError> {
    let start = verdict
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ScoringError::UnparsableVerdict(verdict.to_string()))?;
    let number: String = verdict[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number
        .trim_end_matches('.')
        .parse()
        .map_err(|_| ScoringError::UnparsableVerdict(verdict.to_string()))?;
    if !(0.0..=10.0).contains(&value) {
        return Err(ScoringError::OutOfRange(value));
    }
    Ok(value / 10.0)
}

// ── Auto ──────────────────────────────────────────────────────

/// Reference F1 when the question has a reference, keyword coverage when it
/// has keywords, the judge otherwise.
pub struct AutoScorer {
    judge: Option<LlmJudgeScorer>,
}

impl AutoScorer {
    pub fn new(judge: Option<LlmJudgeScorer>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Scorer for AutoScorer {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn score(&self, question: &EvalQuestion, answer: &str) -> Result<f64, ScoringError> {
        let has_reference = question
            .reference
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if has_reference {
            return ReferenceScorer.score(question, answer).await;
        }
        if question.keywords.iter().any(|k| !k.trim().is_empty()) {
            return KeywordScorer.score(question, answer).await;
        }
        match &self.judge {
            Some(judge) => judge.score(question, answer).await,
            None => Err(ScoringError::NoSignal(question.id.clone())),
        }
    }
}

// ── Selection ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorerKind {
    Reference,
    Keywords,
    LlmJudge,
    #[default]
    Auto,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Keywords => "keywords",
            Self::LlmJudge => "llm-judge",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScorerKind {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "reference" | "f1" => Ok(Self::Reference),
            "keywords" | "keyword" => Ok(Self::Keywords),
            "llm-judge" | "judge" | "llm" => Ok(Self::LlmJudge),
            "auto" => Ok(Self::Auto),
            other => Err(ScoringError::UnknownScorer(other.to_string())),
        }
    }
}

/// Build the scorer for `kind`. `judge` is the provider used for LLM grading;
/// without one, `auto` falls back to reference and keyword scoring only.
pub fn build_scorer(
    kind: ScorerKind,
    judge: Option<Arc<dyn LlmProvider>>,
) -> Result<Arc<dyn Scorer>, ScoringError> {
    Ok(match kind {
        ScorerKind::Reference => Arc::new(ReferenceScorer),
        ScorerKind::Keywords => Arc::new(KeywordScorer),
        ScorerKind::LlmJudge => {
            let provider = judge.ok_or_else(|| {
                ScoringError::Judge(LlmError::NotConfigured(
                    "llm-judge scorer needs a configured provider".into(),
                ))
            })?;
            Arc::new(LlmJudgeScorer::new(provider))
        }
        ScorerKind::Auto => Arc::new(AutoScorer::new(judge.map(LlmJudgeScorer::new))),
    })
}

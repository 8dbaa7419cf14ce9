//! Hyperparameter tuning for the RAG pipeline: sample configurations, build
//! one index per chunking configuration, evaluate a fixed question set and
//! persist per-question results and per-configuration summaries.

pub mod dataset;
pub mod evaluator;
pub mod orchestrator;
pub mod results;
pub mod sampler;
pub mod scoring;

pub use dataset::{load_prompts, load_questions, DatasetError};
pub use evaluator::Evaluator;
pub use orchestrator::{group_by_chunk, Orchestrator, RunOutcome, RunReport, StopSignal, TuningRun};
pub use results::{rank_summaries, CsvResultsStore, MemoryResultsStore, ResultsError, ResultsStore};
pub use sampler::{sample, ParameterSpace, SamplePlan, SamplingMode, SkippedTuple};
pub use scoring::{build_scorer, Scorer, ScorerKind, ScoringError};

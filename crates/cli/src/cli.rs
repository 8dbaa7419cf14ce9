use std::path::PathBuf;

use clap::Parser;
use ragtune_tuning::ScorerKind;

/// Hyperparameter tuning for the RAG customer-service agent.
///
/// Samples chunking, retrieval and prompt configurations, rebuilds the
/// vector index once per chunking configuration, answers the evaluation
/// questions and writes per-question results and per-configuration
/// summaries to CSV.
#[derive(Parser, Debug)]
#[command(name = "ragtune", about = "Hyperparameter tuning for the RAG agent")]
pub struct CliArgs {
    /// Tuning run file (TOML). Defaults are used when it does not exist.
    #[arg(long, default_value = "tuning/tuning.toml")]
    pub config: PathBuf,

    /// Evaluation questions CSV
    #[arg(long)]
    pub questions: Option<PathBuf>,

    /// Prompt variants JSON ({"name": "template", ...})
    #[arg(long)]
    pub prompts: Option<PathBuf>,

    /// Documents directory to index
    #[arg(long)]
    pub documents: Option<PathBuf>,

    /// Where detailed_results.csv and iteration_summary.csv are written
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Sampling mode: grid or random
    #[arg(long)]
    pub mode: Option<String>,

    /// Number of configurations in random mode
    #[arg(long)]
    pub samples: Option<usize>,

    /// Seed for random mode
    #[arg(long)]
    pub seed: Option<u64>,

    /// Questions evaluated concurrently per configuration
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Scorer: reference, keywords, llm-judge or auto
    #[arg(long)]
    pub scorer: Option<ScorerKind>,

    /// Service profile (prefix for environment keys, e.g. PROD)
    #[arg(long, env = "RAGTUNE_PROFILE")]
    pub profile: Option<String>,

    /// Skip configurations already present in the summary file
    #[arg(long)]
    pub resume: bool,

    /// Print the sampled plan and exit without contacting any service
    #[arg(long)]
    pub dry_run: bool,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long)]
    pub verbose: bool,
}

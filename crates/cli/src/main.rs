mod cli;
mod config;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use ragtune_agent::{Agent, IndexBuilder};
use ragtune_core::config::{load_dotenv, Config};
use ragtune_core::RetryPolicy;
use ragtune_index::create_index;
use ragtune_ingest::document::load_corpus;
use ragtune_ingest::embedding::{create_embedder, CachedEmbedder, RetryingEmbedder};
use ragtune_ingest::Embedder;
use ragtune_llm::{create_provider, LlmProvider, RetryingProvider};
use ragtune_tuning::{
    build_scorer, group_by_chunk, load_prompts, load_questions, sample, CsvResultsStore,
    Evaluator, Orchestrator, ResultsStore, RunOutcome, StopSignal,
};

use crate::cli::CliArgs;
use crate::config::TuningFile;
use crate::terminal::Terminal;

const EXIT_STARTUP: u8 = 1;
const EXIT_NONE_SUCCEEDED: u8 = 2;
const EXIT_STOPPED: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "tuning run aborted");
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

async fn run(args: CliArgs) -> Result<ExitCode> {
    load_dotenv();
    let terminal = Terminal::new();

    let mut file = TuningFile::load(&args.config)?;
    file.apply_overrides(&args);

    let prompts = load_prompts(file.data.prompts.as_deref(), file.space.include_default_prompt)
        .context("failed to load prompt variants")?;
    let questions = load_questions(&file.data.questions).with_context(|| {
        format!(
            "failed to load evaluation questions from {}",
            file.data.questions.display()
        )
    })?;

    let space = file.parameter_space(prompts)?;
    let mode = file.sampling_mode()?;
    let plan = sample(&space, mode).context("no configuration to evaluate")?;
    let configurations = group_by_chunk(plan.configurations.clone());

    let corpus = load_corpus(&file.data.documents).with_context(|| {
        format!(
            "failed to load documents from {}",
            file.data.documents.display()
        )
    })?;
    if corpus.is_empty() {
        bail!(
            "no supported documents under {}",
            file.data.documents.display()
        );
    }
    info!(
        documents = corpus.len(),
        chars = corpus.total_chars(),
        fingerprint = corpus.short_fingerprint(),
        "corpus loaded"
    );

    if args.dry_run {
        terminal.print_plan(&configurations, &plan.skipped, &corpus, questions.len())?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let policy = RetryPolicy::from_config(&config.retry);

    let embedder = create_embedder(&config.embedding, &config.llm, &config.ollama)
        .context("failed to create embedder")?;
    let (embedder, cached) = split_embedders(
        Arc::new(RetryingEmbedder::new(embedder, policy.clone())),
        config.embedding.cache_size,
    );

    let provider = create_provider(&config.llm, &config.ollama)
        .context("failed to create LLM provider")?;
    let provider: Arc<dyn LlmProvider> = Arc::new(RetryingProvider::new(provider, policy.clone()));

    let index = create_index(&config.index, policy).context("failed to create vector index")?;

    let scorer = build_scorer(file.evaluation.scorer, Some(provider.clone()))
        .context("failed to create scorer")?;

    let store = Arc::new(
        CsvResultsStore::open(&file.data.results_dir).with_context(|| {
            format!(
                "failed to open results directory {}",
                file.data.results_dir.display()
            )
        })?,
    );
    let (completed, recorded) = if args.resume {
        let completed: Vec<String> = store
            .summaries()
            .context("failed to read previous summaries")?
            .into_iter()
            .map(|s| s.configuration_id)
            .collect();
        let recorded = store
            .results()
            .context("failed to read previous results")?;
        (completed, recorded)
    } else {
        (Vec::new(), Vec::new())
    };

    let builder = IndexBuilder::new(
        index,
        embedder,
        config.embedding.batch_size,
        config.index.namespace_prefix.clone(),
    );
    let agent = Arc::new(Agent::new(
        cached.clone(),
        provider,
        config.llm.temperature,
        config.llm.max_tokens,
    ));
    let evaluator = Evaluator::new(agent, scorer, file.evaluation.concurrency);

    let stop = StopSignal::new();
    spawn_stop_listener(stop.clone());

    let orchestrator = Orchestrator::new(builder, evaluator, store.clone(), corpus, questions.clone())
        .with_stop_signal(stop)
        .with_completed(completed)
        .with_recorded_results(recorded);

    terminal.print_banner(config.profile_label(), configurations.len(), questions.len())?;
    let report = orchestrator
        .run_to_completion(configurations)
        .await
        .context("failed to persist results")?;

    let all_summaries = store.summaries().context("failed to read summaries")?;
    terminal.print_report(&report, &all_summaries)?;
    let cache = cached.stats().await;
    info!(
        hits = cache.hits,
        misses = cache.misses,
        hit_rate = %format!("{:.2}", cache.hit_rate()),
        "embedding cache"
    );
    info!(results_dir = %store.dir().display(), "results written");

    Ok(match report.outcome() {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::NoneSucceeded => ExitCode::from(EXIT_NONE_SUCCEEDED),
        RunOutcome::Stopped => ExitCode::from(EXIT_STOPPED),
    })
}

/// The index builder embeds corpus chunks directly; only the agent's question
/// embeddings go through the cache, so a rebuild never evicts them.
fn split_embedders(
    base: Arc<dyn Embedder>,
    cache_size: usize,
) -> (Arc<dyn Embedder>, Arc<CachedEmbedder>) {
    let cached = Arc::new(CachedEmbedder::new(base.clone(), cache_size));
    (base, cached)
}

/// Ctrl+C requests a cooperative stop; the configuration in flight finishes.
fn spawn_stop_listener(stop: StopSignal) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl+C");
                return;
            }
            if stop.is_stop_requested() {
                warn!("stop already requested, waiting for the current configuration");
            } else {
                warn!("stop requested, finishing the current configuration");
                stop.request_stop();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragtune_ingest::EmbeddingError;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn index_rebuilds_do_not_evict_cached_questions() {
        let (indexing, questions) = split_embedders(Arc::new(UnitEmbedder), 2);

        questions.embed_one("Where is my parcel?").await.unwrap();
        let chunks: Vec<String> = (0..50).map(|i| format!("chunk {i}")).collect();
        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        indexing.embed_batch(&refs).await.unwrap();
        questions.embed_one("Where is my parcel?").await.unwrap();

        let stats = questions.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}

//! The tuning loop: one index rebuild per distinct chunking configuration,
//! one evaluation per configuration, results persisted as each finishes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use ragtune_agent::{IndexBuilder, IndexHandle};
use ragtune_core::{
    ChunkConfig, EvalQuestion, EvalResult, IterationSummary, ResultStatus, TuningConfiguration,
};
use ragtune_ingest::Corpus;

use crate::evaluator::Evaluator;
use crate::results::{rank_summaries, ResultsError, ResultsStore};

/// Cooperative cancellation, checked between configurations. The
/// configuration in flight always finishes and is persisted.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reorder so configurations sharing a chunk config are adjacent, keeping
/// the first-appearance order of chunk configs and the relative order within
/// each group.
pub fn group_by_chunk(configurations: Vec<TuningConfiguration>) -> Vec<TuningConfiguration> {
    let mut groups: Vec<(ChunkConfig, Vec<TuningConfiguration>)> = Vec::new();
    for configuration in configurations {
        match groups.iter_mut().find(|(chunk, _)| *chunk == configuration.chunk) {
            Some((_, group)) => group.push(configuration),
            None => groups.push((configuration.chunk, vec![configuration])),
        }
    }
    groups.into_iter().flat_map(|(_, group)| group).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    RebuildIndex,
    Evaluating,
    Summarized,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::RebuildIndex => "rebuild_index",
            Phase::Evaluating => "evaluating",
            Phase::Summarized => "summarized",
            Phase::Failed => "failed",
        })
    }
}

pub struct Orchestrator {
    builder: IndexBuilder,
    evaluator: Evaluator,
    store: Arc<dyn ResultsStore>,
    corpus: Corpus,
    questions: Vec<EvalQuestion>,
    stop: StopSignal,
    completed: HashSet<String>,
    recorded: HashMap<String, Vec<EvalResult>>,
}

impl Orchestrator {
    pub fn new(
        builder: IndexBuilder,
        evaluator: Evaluator,
        store: Arc<dyn ResultsStore>,
        corpus: Corpus,
        questions: Vec<EvalQuestion>,
    ) -> Self {
        Self {
            builder,
            evaluator,
            store,
            corpus,
            questions,
            stop: StopSignal::new(),
            completed: HashSet::new(),
            recorded: HashMap::new(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Configuration ids already summarized by an earlier run; they are
    /// skipped without rebuilding or evaluating.
    pub fn with_completed(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.completed.extend(ids);
        self
    }

    /// Detailed rows persisted by an earlier run. A configuration that has
    /// rows but no summary (the run died between the two writes) is
    /// summarized from those rows instead of being evaluated again.
    pub fn with_recorded_results(mut self, results: impl IntoIterator<Item = EvalResult>) -> Self {
        for result in results {
            self.recorded
                .entry(result.configuration_id.clone())
                .or_default()
                .push(result);
        }
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Start a sweep. Summaries are produced lazily by
    /// [`TuningRun::next_summary`].
    pub fn run(&self, configurations: Vec<TuningConfiguration>) -> TuningRun<'_> {
        let pending: VecDeque<_> = group_by_chunk(configurations).into();
        info!(
            configurations = pending.len(),
            questions = self.questions.len(),
            documents = self.corpus.len(),
            scorer = self.evaluator.scorer_name(),
            "tuning run started"
        );
        TuningRun {
            orchestrator: self,
            pending,
            active: None,
            last_chunk: None,
            rebuild_error: None,
            rebuilds: 0,
            resumed: 0,
            stopped: false,
        }
    }

    /// Drive the sweep to the end (or to a requested stop) and collect a report.
    pub async fn run_to_completion(
        &self,
        configurations: Vec<TuningConfiguration>,
    ) -> Result<RunReport, ResultsError> {
        let start = Instant::now();
        let mut run = self.run(configurations);
        let mut summaries = Vec::new();
        let mut problems = Vec::new();

        while let Some((summary, results)) = run.next_iteration().await? {
            problems.extend(
                results
                    .into_iter()
                    .filter(|r| r.status != ResultStatus::Scored),
            );
            summaries.push(summary);
        }

        let report = RunReport {
            summaries,
            problems,
            resumed: run.resumed,
            rebuilds: run.rebuilds,
            stopped: run.stopped,
            remaining: run.pending.len(),
        };
        info!(
            summarized = report.succeeded(),
            failed = report.summaries.len() - report.succeeded(),
            resumed = report.resumed,
            rebuilds = report.rebuilds,
            stopped = report.stopped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tuning run finished"
        );
        Ok(report)
    }
}

/// An in-progress sweep. Holds at most one built index at a time.
pub struct TuningRun<'a> {
    orchestrator: &'a Orchestrator,
    pending: VecDeque<TuningConfiguration>,
    active: Option<IndexHandle>,
    last_chunk: Option<ChunkConfig>,
    rebuild_error: Option<String>,
    rebuilds: usize,
    resumed: usize,
    stopped: bool,
}

impl TuningRun<'_> {
    /// Process the next configuration and return its summary, or `None` when
    /// the sweep is exhausted or a stop was requested.
    pub async fn next_summary(&mut self) -> Result<Option<IterationSummary>, ResultsError> {
        Ok(self.next_iteration().await?.map(|(summary, _)| summary))
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn resumed(&self) -> usize {
        self.resumed
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    async fn next_iteration(
        &mut self,
    ) -> Result<Option<(IterationSummary, Vec<EvalResult>)>, ResultsError> {
        loop {
            if self.stopped || self.pending.is_empty() {
                self.active = None;
                return Ok(None);
            }
            if self.orchestrator.stop.is_stop_requested() {
                self.stopped = true;
                self.active = None;
                warn!(remaining = self.pending.len(), "stop requested, ending tuning run");
                return Ok(None);
            }
            let Some(configuration) = self.pending.pop_front() else {
                return Ok(None);
            };
            if self.orchestrator.completed.contains(&configuration.id) {
                self.resumed += 1;
                debug!(configuration = %configuration.id, "already summarized, skipping");
                continue;
            }
            if let Some(rows) = self.orchestrator.recorded.get(&configuration.id) {
                let summary = IterationSummary::from_results(&configuration, rows);
                warn!(
                    configuration = %configuration.id,
                    rows = rows.len(),
                    "results without a summary, summarizing recorded rows"
                );
                self.orchestrator.store.append_summary(&summary)?;
                return Ok(Some((summary, rows.clone())));
            }

            let (summary, results) = self.process(&configuration).await;
            let store = &self.orchestrator.store;
            store.append_results(&results)?;
            store.append_summary(&summary)?;
            return Ok(Some((summary, results)));
        }
    }

    async fn process(
        &mut self,
        configuration: &TuningConfiguration,
    ) -> (IterationSummary, Vec<EvalResult>) {
        let orchestrator = self.orchestrator;
        info!(
            configuration = %configuration.id,
            chunk = %configuration.chunk,
            top_k = configuration.retrieval.top_k,
            prompt = %configuration.prompt.id,
            "configuration started"
        );

        if self.last_chunk != Some(configuration.chunk) {
            self.last_chunk = Some(configuration.chunk);
            self.rebuild_error = None;
            // The previous namespace is gone before the next one is built.
            if let Some(previous) = self.active.take() {
                let namespace = previous.namespace().to_string();
                if let Err(e) = previous.release().await {
                    warn!(namespace = %namespace, error = %e, "failed to delete stale index namespace");
                }
            }
            self.rebuilds += 1;
            debug!(configuration = %configuration.id, phase = %Phase::RebuildIndex);
            match orchestrator
                .builder
                .rebuild(&orchestrator.corpus, &configuration.chunk)
                .await
            {
                Ok(handle) => self.active = Some(handle),
                Err(e) => {
                    error!(chunk = %configuration.chunk, error = %e, "index rebuild failed");
                    self.rebuild_error = Some(e.to_string());
                }
            }
        }

        let Some(index) = self.active.as_ref() else {
            let reason = format!(
                "index rebuild failed: {}",
                self.rebuild_error.as_deref().unwrap_or("no index")
            );
            debug!(configuration = %configuration.id, phase = %Phase::Failed);
            return (IterationSummary::failed(configuration, reason), Vec::new());
        };

        debug!(configuration = %configuration.id, phase = %Phase::Evaluating);
        let results = orchestrator
            .evaluator
            .evaluate(index, configuration, &orchestrator.questions)
            .await;
        let summary = IterationSummary::from_results(configuration, &results);

        let phase = if summary.is_failed() {
            Phase::Failed
        } else {
            Phase::Summarized
        };
        info!(
            configuration = %configuration.id,
            phase = %phase,
            mean_score = ?summary.mean_score,
            mean_latency_ms = ?summary.mean_latency_ms,
            scored = summary.scored,
            unscored = summary.unscored,
            failed = summary.failed,
            "configuration finished"
        );
        (summary, results)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    NoneSucceeded,
    Stopped,
}

/// What a finished (or stopped) sweep produced in this process.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summaries: Vec<IterationSummary>,
    /// Per-question results that were not scored.
    pub problems: Vec<EvalResult>,
    /// Configurations skipped because an earlier run summarized them.
    pub resumed: usize,
    pub rebuilds: usize,
    pub stopped: bool,
    /// Configurations never started because of a stop request.
    pub remaining: usize,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.summaries.iter().filter(|s| !s.is_failed()).count()
    }

    pub fn ranking(&self) -> Vec<&IterationSummary> {
        rank_summaries(&self.summaries)
    }

    pub fn best(&self) -> Option<&IterationSummary> {
        self.ranking().into_iter().find(|s| !s.is_failed())
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.stopped {
            RunOutcome::Stopped
        } else if self.succeeded() == 0 && !(self.summaries.is_empty() && self.resumed > 0) {
            RunOutcome::NoneSucceeded
        } else {
            RunOutcome::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragtune_core::{ChunkStrategy, PromptVariant, RetrievalConfig};

    fn configuration(chunk_size: usize, top_k: usize) -> TuningConfiguration {
        TuningConfiguration::new(
            ChunkConfig::new(chunk_size, 0, ChunkStrategy::Fixed).unwrap(),
            RetrievalConfig::new(top_k).unwrap(),
            PromptVariant::new("default", "p"),
        )
    }

    #[test]
    fn grouping_keeps_first_appearance_order() {
        let input = vec![
            configuration(512, 1),
            configuration(256, 1),
            configuration(512, 2),
            configuration(256, 2),
            configuration(512, 3),
        ];
        let grouped: Vec<(usize, usize)> = group_by_chunk(input)
            .iter()
            .map(|c| (c.chunk.chunk_size, c.retrieval.top_k))
            .collect();
        assert_eq!(grouped, vec![(512, 1), (512, 2), (512, 3), (256, 1), (256, 2)]);
    }

    #[test]
    fn stop_signal_is_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!signal.is_stop_requested());
        clone.request_stop();
        assert!(signal.is_stop_requested());
    }

    #[test]
    fn outcome_reflects_successes() {
        let cfg = configuration(256, 1);
        let mut report = RunReport {
            summaries: vec![IterationSummary::failed(&cfg, "boom")],
            problems: Vec::new(),
            resumed: 0,
            rebuilds: 1,
            stopped: false,
            remaining: 0,
        };
        assert_eq!(report.outcome(), RunOutcome::NoneSucceeded);
        assert!(report.best().is_none());

        report.summaries.push(IterationSummary::from_results(
            &cfg,
            &[EvalResult::scored(&cfg.id, "q", "a".into(), 0.5, 1, 1)],
        ));
        assert_eq!(report.outcome(), RunOutcome::Completed);
        assert_eq!(report.best().map(|s| s.mean_score), Some(Some(0.5)));

        report.stopped = true;
        assert_eq!(report.outcome(), RunOutcome::Stopped);
    }
}

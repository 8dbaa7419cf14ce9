use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use ragtune_core::{IterationSummary, TuningConfiguration};
use ragtune_ingest::Corpus;
use ragtune_tuning::{rank_summaries, RunReport, SkippedTuple};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const HEADER: Color = Color::Magenta;
    const BEST: Color = Color::Green;
    const ROW: Color = Color::Cyan;
    const WARN: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
}

/// How many ranked configurations the final report lists.
const RANKING_ROWS: usize = 10;

/// Writes plans and run reports to stdout. Logs go to stderr through tracing.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    pub fn print_banner(&self, profile: &str, configurations: usize, questions: usize) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("ragtune"),
            ResetColor,
            Print(" - RAG hyperparameter tuning\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "Profile: {profile} | {configurations} configurations x {questions} questions\n"
            )),
            Print("Ctrl+C stops after the current configuration.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// The plan a dry run would execute, grouped as the orchestrator runs it.
    pub fn print_plan(
        &self,
        configurations: &[TuningConfiguration],
        skipped: &[SkippedTuple],
        corpus: &Corpus,
        questions: usize,
    ) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("Tuning plan\n"),
            ResetColor,
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "{} documents ({} chars, fingerprint {}) | {} questions\n",
                corpus.len(),
                corpus.total_chars(),
                corpus.short_fingerprint(),
                questions
            )),
            ResetColor,
        )?;

        let mut previous = None;
        for configuration in configurations {
            if previous != Some(configuration.chunk) {
                previous = Some(configuration.chunk);
                execute!(
                    stdout,
                    SetForegroundColor(Colors::ROW),
                    Print(format!("\n[rebuild] {}\n", configuration.chunk)),
                    ResetColor,
                )?;
            }
            execute!(
                stdout,
                Print(format!(
                    "  {}  top_k={} prompt={}\n",
                    configuration.id, configuration.retrieval.top_k, configuration.prompt.id
                )),
            )?;
        }

        if !skipped.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::WARN),
                Print(format!("\nSkipped {} invalid combinations:\n", skipped.len())),
                ResetColor,
            )?;
            for s in skipped {
                execute!(stdout, Print(format!("  {}: {}\n", s.description, s.error)))?;
            }
        }
        stdout.flush()?;
        Ok(())
    }

    /// Final report: ranking over every summary in the results directory,
    /// then this run's failures and degraded questions.
    pub fn print_report(&self, report: &RunReport, all_summaries: &[IterationSummary]) -> Result<()> {
        let mut stdout = io::stdout();
        let ranked = rank_summaries(all_summaries);

        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::HEADER),
            Print(format!(
                "Ranking ({} configurations, {} this run, {} resumed)\n",
                ranked.len(),
                report.summaries.len(),
                report.resumed
            )),
            ResetColor,
        )?;

        for (rank, summary) in ranked
            .iter()
            .filter(|s| !s.is_failed())
            .take(RANKING_ROWS)
            .enumerate()
        {
            let color = if rank == 0 { Colors::BEST } else { Colors::ROW };
            execute!(
                stdout,
                SetForegroundColor(color),
                Print(format!(
                    "{:>3}. {:<40} score={} var={} latency={}  ({}/{} scored)\n",
                    rank + 1,
                    summary.configuration_id,
                    fmt_opt(summary.mean_score, 3),
                    fmt_opt(summary.score_variance, 4),
                    fmt_opt(summary.mean_latency_ms.map(|ms| ms.round()), 0),
                    summary.scored,
                    summary.total
                )),
                ResetColor,
            )?;
        }

        let failed: Vec<&&IterationSummary> = ranked.iter().filter(|s| s.is_failed()).collect();
        if !failed.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::ERROR),
                Print(format!("\nFailed configurations ({}):\n", failed.len())),
                ResetColor,
            )?;
            for summary in failed {
                execute!(
                    stdout,
                    Print(format!(
                        "  {}: {}\n",
                        summary.configuration_id,
                        summary.error.as_deref().unwrap_or("unknown error")
                    )),
                )?;
            }
        }

        if !report.problems.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::WARN),
                Print(format!("\nDegraded questions ({}):\n", report.problems.len())),
                ResetColor,
            )?;
            for result in &report.problems {
                execute!(
                    stdout,
                    Print(format!(
                        "  {} / {} [{}]: {}\n",
                        result.configuration_id,
                        result.question_id,
                        result.status.as_str(),
                        result.error.as_deref().unwrap_or("")
                    )),
                )?;
            }
        }

        if report.stopped {
            execute!(
                stdout,
                SetForegroundColor(Colors::WARN),
                Print(format!(
                    "\nStopped early: {} configurations not run.\n",
                    report.remaining
                )),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

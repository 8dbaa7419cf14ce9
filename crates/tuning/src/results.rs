//! Persistence of per-question results and per-configuration summaries.
//!
//! Results and summaries are appended as soon as a configuration finishes,
//! so an interrupted sweep keeps everything completed before the interruption.

use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use ragtune_core::{EvalResult, IterationSummary};

pub const DETAILED_RESULTS_FILE: &str = "detailed_results.csv";
pub const ITERATION_SUMMARY_FILE: &str = "iteration_summary.csv";

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("results I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("results CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Append-only sink for tuning output.
pub trait ResultsStore: Send + Sync {
    fn append_results(&self, results: &[EvalResult]) -> Result<(), ResultsError>;

    fn append_summary(&self, summary: &IterationSummary) -> Result<(), ResultsError>;

    /// Every summary written so far, in write order.
    fn summaries(&self) -> Result<Vec<IterationSummary>, ResultsError>;

    /// Every per-question result written so far, in write order.
    fn results(&self) -> Result<Vec<EvalResult>, ResultsError>;
}

// ── CSV ───────────────────────────────────────────────────────

/// Two CSV files under one directory. The header is written only when a file
/// is created, so later runs append to earlier ones.
pub struct CsvResultsStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl CsvResultsStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ResultsError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ResultsError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(DETAILED_RESULTS_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(ITERATION_SUMMARY_FILE)
    }

    fn append<T: Serialize>(&self, path: &Path, rows: &[T]) -> Result<(), ResultsError> {
        if rows.is_empty() {
            return Ok(());
        }
        let _guard = lock(&self.lock);

        let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ResultsError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let csv_err = |source| ResultsError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        for row in rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), rows = rows.len(), "results appended");
        Ok(())
    }

    fn read_all<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, ResultsError> {
        let _guard = lock(&self.lock);
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ResultsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        reader
            .deserialize()
            .map(|row| {
                row.map_err(|source| ResultsError::Csv {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .collect()
    }
}

impl ResultsStore for CsvResultsStore {
    fn append_results(&self, results: &[EvalResult]) -> Result<(), ResultsError> {
        self.append(&self.results_path(), results)
    }

    fn append_summary(&self, summary: &IterationSummary) -> Result<(), ResultsError> {
        self.append(&self.summary_path(), std::slice::from_ref(summary))
    }

    fn summaries(&self) -> Result<Vec<IterationSummary>, ResultsError> {
        self.read_all(&self.summary_path())
    }

    fn results(&self) -> Result<Vec<EvalResult>, ResultsError> {
        self.read_all(&self.results_path())
    }
}

// ── In memory ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryResultsStore {
    results: Mutex<Vec<EvalResult>>,
    summaries: Mutex<Vec<IterationSummary>>,
}

impl MemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultsStore for MemoryResultsStore {
    fn append_results(&self, results: &[EvalResult]) -> Result<(), ResultsError> {
        lock(&self.results).extend_from_slice(results);
        Ok(())
    }

    fn append_summary(&self, summary: &IterationSummary) -> Result<(), ResultsError> {
        lock(&self.summaries).push(summary.clone());
        Ok(())
    }

    fn summaries(&self) -> Result<Vec<IterationSummary>, ResultsError> {
        Ok(lock(&self.summaries).clone())
    }

    fn results(&self) -> Result<Vec<EvalResult>, ResultsError> {
        Ok(lock(&self.results).clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Ranking ───────────────────────────────────────────────────

/// Best first: higher mean score, then lower mean latency, then id.
/// Failed configurations sort after every summarized one.
pub fn rank_summaries(summaries: &[IterationSummary]) -> Vec<&IterationSummary> {
    let mut ranked: Vec<&IterationSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| compare(a, b));
    ranked
}

fn compare(a: &IterationSummary, b: &IterationSummary) -> Ordering {
    a.is_failed()
        .cmp(&b.is_failed())
        .then_with(|| desc_option(a.mean_score, b.mean_score))
        .then_with(|| asc_option(a.mean_latency_ms, b.mean_latency_ms))
        .then_with(|| a.configuration_id.cmp(&b.configuration_id))
}

fn desc_option(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_option(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

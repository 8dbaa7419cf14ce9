//! Loading the evaluation questions and prompt variants.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use ragtune_agent::{default_prompt, DEFAULT_PROMPT_ID};
use ragtune_core::{ConfigurationError, EvalQuestion, PromptVariant};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("duplicate question id '{0}'")]
    DuplicateId(String),

    #[error("{0} contains no questions")]
    Empty(PathBuf),

    #[error("malformed prompts file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Read the evaluation questions from a CSV file.
///
/// Headers are matched case-insensitively. `question` is required; `id`,
/// `reference` (or `expected_answer`), `keywords` (`;`-separated) and
/// `category` are optional. Rows without an id are numbered `q1`, `q2`, ...
pub fn load_questions(path: &Path) -> Result<Vec<EvalQuestion>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    let question_col = column(&["question", "customer_email", "email"]).ok_or_else(|| {
        DatasetError::MissingColumn {
            path: path.to_path_buf(),
            column: "question",
        }
    })?;
    let id_col = column(&["id", "question_id"]);
    let reference_col = column(&["reference", "expected_answer", "reference_answer"]);
    let keywords_col = column(&["keywords"]);
    let category_col = column(&["category"]);

    let mut questions = Vec::new();
    let mut seen = HashSet::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let Some(text) = field(Some(question_col)) else {
            warn!(row = row + 1, "skipping row without a question");
            continue;
        };
        let id = field(id_col).unwrap_or_else(|| format!("q{}", row + 1));
        if !seen.insert(id.clone()) {
            return Err(DatasetError::DuplicateId(id));
        }

        let keywords = field(keywords_col)
            .map(|k| {
                k.split(';')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        questions.push(EvalQuestion {
            id,
            question: text,
            reference: field(reference_col),
            keywords,
            category: field(category_col),
        });
    }

    if questions.is_empty() {
        return Err(DatasetError::Empty(path.to_path_buf()));
    }
    info!(path = %path.display(), questions = questions.len(), "evaluation questions loaded");
    Ok(questions)
}

/// Prompt variants for the sweep.
///
/// The file is a JSON object mapping prompt id to template. The built-in
/// default prompt comes first when `include_default` is set, unless the file
/// overrides it under the same id.
pub fn load_prompts(
    path: Option<&Path>,
    include_default: bool,
) -> Result<Vec<PromptVariant>, DatasetError> {
    let mut from_file: BTreeMap<String, String> = BTreeMap::new();
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        from_file = serde_json::from_str(&raw).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut prompts = Vec::new();
    if include_default {
        match from_file.remove(DEFAULT_PROMPT_ID) {
            Some(template) => prompts.push(PromptVariant::new(DEFAULT_PROMPT_ID, template)),
            None => prompts.push(default_prompt()),
        }
    }
    prompts.extend(
        from_file
            .into_iter()
            .map(|(id, template)| PromptVariant::new(id, template)),
    );

    for prompt in &prompts {
        prompt.validate()?;
    }
    if prompts.is_empty() {
        return Err(ConfigurationError::EmptyDimension("prompts").into());
    }
    Ok(prompts)
}

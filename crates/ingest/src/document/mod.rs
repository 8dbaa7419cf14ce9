mod corpus;
mod table;
mod txt;

pub use corpus::{load_corpus, Corpus};

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no extractor for '.{0}' files")]
    UnsupportedType(String),
    #[error("malformed CSV {file}: {message}")]
    Csv { file: String, message: String },
    #[error("{0} is not a directory")]
    NotADirectory(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One retrievable unit of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the corpus root, with `#row` for table rows.
    pub id: String,
    /// Lowercased extension: txt, md or csv.
    pub file_type: String,
    pub text: String,
}

/// Prose files become a single document (none when blank). Two-column CSV
/// files become one document per row.
pub fn extract_documents(bytes: &[u8], filename: &str) -> Result<Vec<Document>, ExtractionError> {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "text" | "md" | "markdown" => {
            let text = txt::extract_txt(bytes);
            Ok((!text.is_empty())
                .then(|| Document {
                    id: filename.to_string(),
                    file_type: ext.clone(),
                    text,
                })
                .into_iter()
                .collect())
        }
        "csv" => table::extract_key_value_rows(bytes, filename),
        _ => Err(ExtractionError::UnsupportedType(ext)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_is_one_document() {
        let docs = extract_documents(b"# Returns\r\n\r\n30 days.", "policies/Returns.MD").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "policies/Returns.MD");
        assert_eq!(docs[0].file_type, "md");
        assert_eq!(docs[0].text, "# Returns\n\n30 days.");
    }

    #[test]
    fn blank_text_file_yields_nothing() {
        assert!(extract_documents(b"  \n\n ", "empty.txt").unwrap().is_empty());
    }

    #[test]
    fn unknown_or_missing_extension_is_unsupported() {
        assert!(matches!(
            extract_documents(b"%PDF", "manual.pdf"),
            Err(ExtractionError::UnsupportedType(e)) if e == "pdf"
        ));
        assert!(matches!(
            extract_documents(b"text", "README"),
            Err(ExtractionError::UnsupportedType(e)) if e.is_empty()
        ));
    }
}

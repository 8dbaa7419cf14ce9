//! Loading a documents directory into an in-memory corpus.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{extract_documents, Document, ExtractionError};

/// All documents of one run, read once and shared by every index rebuild.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub documents: Vec<Document>,
    /// Hex SHA-256 over document ids and texts, in load order.
    pub fingerprint: String,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        let fingerprint = fingerprint(&documents);
        Self {
            documents,
            fingerprint,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn total_chars(&self) -> usize {
        self.documents.iter().map(|d| d.text.chars().count()).sum()
    }

    /// Short fingerprint prefix used in index namespaces.
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..12.min(self.fingerprint.len())]
    }
}

fn fingerprint(documents: &[Document]) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update(doc.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(doc.text.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Walk `root` recursively (sorted by file name) and extract every supported
/// file. Unsupported files are skipped with a warning; unreadable files and
/// malformed CSV are errors.
pub fn load_corpus(root: &Path) -> Result<Corpus, ExtractionError> {
    if !root.is_dir() {
        return Err(ExtractionError::NotADirectory(root.display().to_string()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ExtractionError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        if relative.starts_with('.') || relative.contains("/.") {
            continue;
        }

        let bytes = std::fs::read(path)?;
        match extract_documents(&bytes, &relative) {
            Ok(mut docs) => {
                debug!(file = %relative, documents = docs.len(), "loaded");
                documents.append(&mut docs);
            }
            Err(ExtractionError::UnsupportedType(ext)) => {
                warn!(file = %relative, extension = %ext, "unsupported file type, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    let corpus = Corpus::new(documents);
    info!(
        root = %root.display(),
        documents = corpus.len(),
        chars = corpus.total_chars(),
        fingerprint = corpus.short_fingerprint(),
        "corpus loaded"
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_supported_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.md", "# Policies\n\nReturns within 30 days.");
        write(dir.path(), "a.txt", "Shipping is free.");
        write(dir.path(), "nested/faq.csv", "q,a\nhours,9-17\n");
        write(dir.path(), "image.png", "not text");
        write(dir.path(), ".hidden.txt", "secret");

        let corpus = load_corpus(dir.path()).unwrap();
        let ids: Vec<&str> = corpus.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.md", "nested/faq.csv#0"]);
        assert_eq!(corpus.documents[2].text, "hours: 9-17");
        assert_eq!(corpus.fingerprint.len(), 64);
        assert_eq!(corpus.short_fingerprint().len(), 12);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Corpus::new(vec![Document {
            id: "a.txt".into(),
            file_type: "txt".into(),
            text: "one".into(),
        }]);
        let mut b = a.clone();
        b.documents[0].text = "two".into();
        let b = Corpus::new(b.documents);
        assert_ne!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint, Corpus::new(a.documents.clone()).fingerprint);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_corpus(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ExtractionError::NotADirectory(_)));
    }
}

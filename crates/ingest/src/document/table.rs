//! Two-column CSV files: first column is a key, second a value.

use super::{Document, ExtractionError};

/// One `"key: value"` document per data row. Files with fewer than two
/// columns yield nothing.
pub fn extract_key_value_rows(bytes: &[u8], filename: &str) -> Result<Vec<Document>, ExtractionError> {
    let csv_error = |e: csv::Error| ExtractionError::Csv {
        file: filename.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns = reader.headers().map_err(csv_error)?.len();
    if columns < 2 {
        tracing::warn!(file = filename, columns, "CSV has fewer than 2 columns, skipping");
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let key = record
            .get(0)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row_{row}_key"));
        let value = record
            .get(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row_{row}_value"));

        documents.push(Document {
            id: format!("{filename}#{row}"),
            file_type: "csv".to_string(),
            text: format!("{key}: {value}"),
        });
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_key_value_documents() {
        let data = b"topic,answer\nreturns,Within 30 days\nshipping,\"Free, above 50 EUR\"\n";
        let docs = extract_key_value_rows(data, "faq.csv").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "returns: Within 30 days");
        assert_eq!(docs[1].text, "shipping: Free, above 50 EUR");
        assert_eq!(docs[1].id, "faq.csv#1");
    }

    #[test]
    fn missing_cells_get_placeholders() {
        let data = b"k,v\n,orphan value\nlonely,\n";
        let docs = extract_key_value_rows(data, "t.csv").unwrap();
        assert_eq!(docs[0].text, "row_0_key: orphan value");
        assert_eq!(docs[1].text, "lonely: row_1_value");
    }

    #[test]
    fn single_column_is_skipped() {
        let docs = extract_key_value_rows(b"only\na\nb\n", "one.csv").unwrap();
        assert!(docs.is_empty());
    }
}

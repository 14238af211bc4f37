use std::path::Path;

use crate::error::EngineError;

/// An ephemeral, row-oriented report table as fetched from the platform.
/// Owned by the engine for the duration of one reconciliation run and never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell text by row index and column index; absent cells read as "".
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Parse delimited text. Amazon reports are tab-separated; CSV fixtures
    /// use commas.
    pub fn from_delimited(tag: &str, data: &str, delimiter: u8) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EngineError::TableLoad {
                tag: tag.into(),
                detail: e.to_string(),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| EngineError::TableLoad {
                tag: tag.into(),
                detail: e.to_string(),
            })?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Load from a file path, inferring the delimiter from the extension
    /// (`.tsv`/`.txt` → tab, otherwise comma).
    pub fn from_path(tag: &str, path: &Path) -> Result<Self, EngineError> {
        let data = std::fs::read_to_string(path).map_err(|e| EngineError::Io(e.to_string()))?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") | Some("txt") => b'\t',
            _ => b',',
        };
        Self::from_delimited(tag, &data, delimiter)
    }
}

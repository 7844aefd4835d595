//! JSON-lines input files
//!
//! Three record shapes are read, one JSON object per line:
//!
//! - training rows: `{"query": "...", "item": "https://..."}`
//! - test queries: `{"query": "..."}`
//! - catalog items: `{"id": "https://...", "text": "..."}`
//!
//! Blank lines are skipped. The spreadsheet column names `Query` and
//! `Assessment_url` are accepted as aliases.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::{Error, Result};

/// A (query, relevant item) pair from the labelled training set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRow {
    #[serde(alias = "Query")]
    pub query: String,
    #[serde(alias = "Assessment_url", alias = "url")]
    pub item: String,
}

#[derive(Debug, Clone, Deserialize)]
struct QueryRow {
    #[serde(alias = "Query")]
    query: String,
}

/// Read every record of a JSON-lines file.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            Error::InvalidInput(format!("{}:{}: {e}", path.display(), idx + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Load labelled training rows.
pub fn load_training_rows(path: &Path) -> Result<Vec<TrainingRow>> {
    let rows: Vec<TrainingRow> = read_jsonl(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded training rows");
    Ok(rows)
}

/// Load test queries, trimmed, with blanks and repeats dropped.
pub fn load_test_queries(path: &Path) -> Result<Vec<String>> {
    let rows: Vec<QueryRow> = read_jsonl(path)?;

    let mut seen = std::collections::HashSet::new();
    let queries: Vec<String> = rows
        .into_iter()
        .map(|row| row.query.trim().to_string())
        .filter(|q| !q.is_empty() && seen.insert(q.clone()))
        .collect();

    tracing::info!(path = %path.display(), queries = queries.len(), "loaded test queries");
    Ok(queries)
}

/// Load catalog items with their descriptive texts.
pub fn load_catalog(path: &Path) -> Result<Vec<Item>> {
    let items: Vec<Item> = read_jsonl(path)?;
    tracing::info!(path = %path.display(), items = items.len(), "loaded catalog");
    Ok(items)
}

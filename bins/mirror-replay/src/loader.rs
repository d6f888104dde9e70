//! Record file loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mirror_importer::RecordItem;
use serde::Deserialize;

/// Accepted layouts of a record file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordsFileFormat {
    /// `[{...}, {...}]`
    DirectArray(Vec<RecordItem>),
    /// `{"network": "...", "records": [{...}]}`
    WithMetadata { records: Vec<RecordItem> },
}

/// Loads record items and orders them by consensus timestamp.
pub fn load_records(path: &Path) -> Result<Vec<RecordItem>> {
    tracing::info!(
        target: "mirror::replay",
        path = %path.display(),
        "Loading records from JSON file"
    );

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let mut records = match serde_json::from_str::<RecordsFileFormat>(&contents)
        .context("Failed to parse record file")?
    {
        RecordsFileFormat::DirectArray(records)
        | RecordsFileFormat::WithMetadata { records } => records,
    };

    // Stable, so records sharing a timestamp keep their file order.
    records.sort_by_key(|record| record.consensus_timestamp);

    tracing::info!(
        target: "mirror::replay",
        total_records = records.len(),
        "Loaded records"
    );
    Ok(records)
}

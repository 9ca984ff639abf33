//! Partition artifacts: one pretty-printed JSON array of records per book.

use libros_common::types::{records_from_json, ObjectFinalizedEvent, Record};
use libros_common::Result;
use std::path::Path;

const ARTIFACT_EXTENSION: &str = ".json";

/// `<prefix><libro>.json`
pub fn artifact_file_name(prefix: &str, libro: &str) -> String {
    format!("{}{}{}", prefix, libro, ARTIFACT_EXTENSION)
}

/// Object key for an artifact uploaded next to `source`.
pub fn artifact_object_key(source: &ObjectFinalizedEvent, file_name: &str) -> String {
    match source.dirname() {
        "" => file_name.to_string(),
        dir => format!("{}/{}", dir, file_name),
    }
}

/// Collection an artifact loads into: its basename without `.json`.
pub fn collection_name(artifact: &ObjectFinalizedEvent) -> String {
    let basename = artifact.basename();
    basename
        .strip_suffix(ARTIFACT_EXTENSION)
        .unwrap_or(basename)
        .to_string()
}

pub async fn write_artifact(path: &Path, records: &[Record]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

pub async fn read_artifact(path: &Path) -> Result<Vec<Record>> {
    let bytes = tokio::fs::read(path).await?;
    records_from_json(&bytes)
}

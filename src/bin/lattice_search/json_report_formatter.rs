use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use lattice_index::{DocId, Explanation};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Hit {
    pub doc: DocId,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub query: String,
    /// `None` when the query text analyzed to no terms.
    pub parsed_query: Option<String>,
    pub num_docs: u32,
    pub skipped_docs: usize,
    pub hits: Vec<Hit>,
}

pub fn write_report(path: Option<&Path>, report: &SearchReport) -> Result<(), String> {
    let Some(path) = path else {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        serde_json::to_writer_pretty(&mut lock, report)
            .map_err(|err| format!("Failed to serialize report JSON: {err}"))?;
        return lock
            .write_all(b"\n")
            .map_err(|err| format!("Failed to write report: {err}"));
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, report).map_err(|err| {
        format!(
            "Failed to serialize report JSON '{}': {err}",
            path.display()
        )
    })?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize report file '{}': {err}", path.display()))?;
    Ok(())
}

//! Rotated log merging.
//!
//! Signal Desktop rotates two categories of line-delimited JSON logs.
//! Rotation files encode chronology in their names, so a lexicographic
//! filename sort followed by file-order concatenation is the whole merge;
//! no timestamp re-sort happens here.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SignalHistoryError};
use crate::schema;

/// Log category, distinguished by filename substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    App,
    Main,
}

impl LogCategory {
    /// Filename fragment that selects this category's rotation files.
    #[must_use]
    pub const fn fragment(self) -> &'static str {
        match self {
            Self::App => "app.log",
            Self::Main => "main.log",
        }
    }

    /// Artifact file name the merged collection is persisted under.
    #[must_use]
    pub const fn artifact_name(self) -> &'static str {
        match self {
            Self::App => "applogs.json",
            Self::Main => "mainlogs.json",
        }
    }
}

/// Merge all rotated files of one category into a single ordered collection.
///
/// Files merge in lexicographic filename order, lines in file order. Any
/// line that fails to parse as JSON is fatal for the whole merge; the logs
/// are produced by the application under analysis and assumed well-formed.
pub fn merge_logs(source_dir: &Path, category: LogCategory) -> Result<Vec<Value>> {
    let log_dir = source_dir.join(schema::LOGS_RELATIVE_PATH);

    let mut selected: Vec<String> = std::fs::read_dir(&log_dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.contains(category.fragment()))
        .collect();
    selected.sort();

    let mut merged = Vec::new();
    for name in &selected {
        let file = File::open(log_dir.join(name))?;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let entry: Value =
                serde_json::from_str(&line).map_err(|e| SignalHistoryError::MalformedLogLine {
                    file: name.clone(),
                    line: index + 1,
                    reason: e.to_string(),
                })?;
            merged.push(entry);
        }
    }

    debug!(
        category = category.fragment(),
        files = selected.len(),
        entries = merged.len(),
        "Merged rotated logs"
    );
    Ok(merged)
}

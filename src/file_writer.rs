//! Artifact persistence.
//!
//! Each normalized collection is persisted as a single self-contained JSON
//! document in the output directory. The documents are independent files,
//! not a transactional unit: a failed run leaves already-written artifacts
//! in place.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// Artifact file names within the output directory.
pub mod artifacts {
    /// Contact directory, id to display tuple
    pub const CONTACTS: &str = "contacts.json";
    /// Normalized message array
    pub const MESSAGES: &str = "messages.json";
    /// Raw conversation row passthrough
    pub const CONVOS: &str = "convos.json";
    /// Device metadata map
    pub const ITEMS: &str = "items.json";
    /// Verbatim copy of the input configuration
    pub const CONFIG: &str = "config.json";
}

/// Serialize one document into the output directory.
pub fn write_json_artifact<T: Serialize + ?Sized>(
    output_dir: &Path,
    name: &str,
    document: &T,
) -> Result<PathBuf> {
    let path = output_dir.join(name);
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, document)?;
    writer.flush()?;
    debug!(artifact = %path.display(), "Wrote artifact");
    Ok(path)
}

/// Persist raw store rows unprocessed.
///
/// Each row serializes as a one-element array holding the raw JSON text,
/// the shape the presentation layer has always read for `convos.json`.
pub fn write_raw_rows(output_dir: &Path, name: &str, rows: &[String]) -> Result<PathBuf> {
    let wrapped: Vec<[&str; 1]> = rows.iter().map(|row| [row.as_str()]).collect();
    write_json_artifact(output_dir, name, &wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_raw_rows_wraps_each_row() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec!["{\"id\":\"c1\"}".to_string()];
        let path = write_raw_rows(dir.path(), artifacts::CONVOS, &rows).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!([["{\"id\":\"c1\"}"]]));
    }
}

//! Decrypting extractor for the Signal Desktop store.
//!
//! The store is a SQLCipher database; the page-cipher key lives, hex-encoded,
//! in the profile's `config.json`. Opening is strictly sequential: open the
//! connection, key it, run one probe query, then pull the three raw tables.
//! Decryption failure is never transient, so there is no retry anywhere here.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, SignalHistoryError};
use crate::schema;
use crate::validation::InputValidator;

/// The three raw record tables pulled from one store, in source row order.
#[derive(Debug, Default)]
pub struct RawTables {
    /// Raw JSON documents from the `messages` table
    pub messages: Vec<String>,
    /// Raw JSON documents from the `conversations` table
    pub conversations: Vec<String>,
    /// Raw JSON documents from the `items` table
    pub items: Vec<String>,
}

/// The profile's configuration document plus the decryption key it carries.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Parsed `config.json`, re-exported verbatim into the artifact set
    pub document: Value,
    /// Hex-encoded SQLCipher key. Never logged.
    key: String,
}

impl StoreConfig {
    /// Read `config.json` from a profile directory.
    pub fn read(source_dir: &Path) -> Result<Self> {
        let path = source_dir.join(schema::CONFIG_RELATIVE_PATH);
        let missing = |reason: String| SignalHistoryError::ConfigurationMissing {
            path: path.clone(),
            reason,
        };

        let file = File::open(&path).map_err(|e| missing(e.to_string()))?;
        let document: Value =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| missing(e.to_string()))?;
        let key = document
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| missing("no \"key\" field".to_string()))?
            .to_string();

        // Shape check before the key is ever placed inside a SQL literal
        InputValidator::validate_hex_key(&key).map_err(|e| missing(e.to_string()))?;

        Ok(Self { document, key })
    }
}

/// An opened, decrypted Signal store.
pub struct SignalStore {
    conn: Connection,
    path: PathBuf,
}

impl SignalStore {
    /// Open the encrypted store under a profile directory and verify the key.
    pub fn open(source_dir: &Path, config: &StoreConfig) -> Result<Self> {
        let path = source_dir.join(schema::STORE_RELATIVE_PATH);
        if !path.is_file() {
            return Err(SignalHistoryError::StoreUnavailable {
                path,
                reason: "file not found".to_string(),
            });
        }

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |e| SignalHistoryError::StoreUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            },
        )?;

        // Raw hex key form; the x'..' literal bypasses SQLCipher key derivation
        conn.execute_batch(&format!("PRAGMA key = \"x'{}'\";", config.key))
            .map_err(|e| SignalHistoryError::StoreUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        // First page read reports NotADatabase when the key is wrong; any
        // other failure is a genuine database fault, not a bad key
        let probe: std::result::Result<i64, rusqlite::Error> =
            conn.query_row("SELECT count(*) FROM sqlite_master;", [], |row| row.get(0));
        if let Err(e) = probe {
            if e.sqlite_error_code() == Some(rusqlite::ErrorCode::NotADatabase) {
                return Err(SignalHistoryError::AuthenticationFailed { path });
            }
            return Err(SignalHistoryError::Database(e));
        }

        debug!(store = %path.display(), "Opened encrypted store");
        Ok(Self { conn, path })
    }

    /// Pull all raw JSON documents from one table, in row order.
    fn raw_rows(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM {table};", schema::JSON_COLUMN))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<String>, rusqlite::Error>>()?;
        Ok(rows)
    }

    /// Pull the three raw record tables in one pass.
    pub fn extract(&self) -> Result<RawTables> {
        let tables = RawTables {
            messages: self.raw_rows(schema::messages::TABLE)?,
            conversations: self.raw_rows(schema::conversations::TABLE)?,
            items: self.raw_rows(schema::items::TABLE)?,
        };
        info!(
            store = %self.path.display(),
            messages = tables.messages.len(),
            conversations = tables.conversations.len(),
            items = tables.items.len(),
            "Extracted raw tables"
        );
        Ok(tables)
    }
}

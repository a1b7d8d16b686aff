//! Schema definitions for the encrypted Signal store.
//!
//! The store keeps one JSON document per row; the tables share a single
//! `json` column and are keyed by ids embedded in the payloads themselves,
//! so only table and column names are needed here.

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
}

/// Conversations table schema
pub mod conversations {
    /// Table name
    pub const TABLE: &str = "conversations";
}

/// Items (device metadata) table schema
pub mod items {
    /// Table name
    pub const TABLE: &str = "items";
}

/// Column holding the raw JSON document in all three tables
pub const JSON_COLUMN: &str = "json";

/// Relative path of the encrypted store inside a profile directory
pub const STORE_RELATIVE_PATH: &str = "sql/db.sqlite";

/// Relative path of the key-bearing configuration document
pub const CONFIG_RELATIVE_PATH: &str = "config.json";

/// Relative path of the rotated log directory
pub const LOGS_RELATIVE_PATH: &str = "logs";

//! Device metadata normalization from the raw `items` table.
//!
//! Items are flat key/value settings records. A fixed set of well-known
//! keys holds epoch timestamps that must read as UTC strings in the
//! artifact; the rest pass through untouched.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SignalHistoryError};
use crate::utils::utc_from_value;

/// Setting keys that hold epoch-millisecond timestamps. All five must be
/// present for the account-metadata view to be meaningful.
pub const TIMESTAMP_KEYS: [&str; 5] = [
    "lastAttemptedToRefreshProfilesAt",
    "lastHeartbeat",
    "lastStartup",
    "nextSignedKeyRotationTime",
    "synced_at",
];

/// Normalized device metadata, sorted by setting name.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct DeviceItems(BTreeMap<String, Value>);

impl DeviceItems {
    /// Look up a setting by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The device owner's own E.164 number, when recorded.
    #[must_use]
    pub fn account_e164(&self) -> Option<&str> {
        self.0.get("accountE164").and_then(Value::as_str)
    }

    /// Number of settings in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build the flat settings map from raw item rows.
///
/// A record without a `value` field yields the empty string for that key.
/// Fails with `MissingRequiredField` when any well-known timestamp key is
/// absent from the source.
pub fn normalize_items(raw_items: &[String]) -> Result<DeviceItems> {
    let mut items = BTreeMap::new();

    for row in raw_items {
        let record: Value = serde_json::from_str(row)?;
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SignalHistoryError::MissingRequiredField("item record id".to_string()))?
            .to_string();
        let value = record
            .get("value")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        items.insert(id, value);
    }

    for key in TIMESTAMP_KEYS {
        let value = items
            .get(key)
            .ok_or_else(|| SignalHistoryError::MissingRequiredField(key.to_string()))?;
        let normalized = Value::String(utc_from_value(value));
        items.insert(key.to_string(), normalized);
    }

    Ok(DeviceItems(items))
}

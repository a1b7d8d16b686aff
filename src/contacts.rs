//! Contact directory construction from raw conversation records.
//!
//! Each conversation row is an independent JSON document. Normalization
//! resolves the three avatar structures, detects the device owner's own
//! "Note to Self" conversation, and ranks the directory by lifetime message
//! count so the busiest contacts render first.

use std::collections::{BTreeMap, HashMap};

use serde::ser::{SerializeMap, SerializeTuple, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, SignalHistoryError};
use crate::utils::{Bucket, PathRewriter};

/// Display-name suffix for the owner's own conversation
pub const SELF_MARKER: &str = "NOTE TO SELF";

/// Sentinel used when a contact record carries no phone number
pub const NO_E164: &str = "NO E.164";

/// Avatar structures extracted from one raw contact record.
///
/// Each source field may be null or absent, in which case the matching
/// output is empty. Never an error.
#[derive(Debug, Clone, Default)]
pub struct ContactAvatars {
    /// Avatar-image id to rewritten path, sorted by id
    pub avatars: BTreeMap<String, String>,
    /// Profile-avatar hash to rewritten path
    pub profile_avatar: BTreeMap<String, String>,
    /// Group avatar object with its path rewritten, or an empty object
    pub group_avatar: Value,
}

/// Extract the multi-avatar list, profile avatar map, and group avatar.
#[must_use]
pub fn resolve_avatars(record: &Value, rewriter: &PathRewriter) -> ContactAvatars {
    let mut resolved = ContactAvatars {
        group_avatar: Value::Object(Map::new()),
        ..ContactAvatars::default()
    };

    if let Some(list) = record.get("avatars").and_then(Value::as_array) {
        for entry in list {
            // Entries without an image path are skipped, not errors
            let Some(image_path) = entry.get("imagePath").and_then(Value::as_str) else {
                continue;
            };
            let id = match entry.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            resolved
                .avatars
                .insert(id, rewriter.to_bucket(Bucket::Avatars, image_path));
        }
    }

    if let Some(map) = record.get("profileAvatar").and_then(Value::as_object) {
        for (hash, path) in map {
            if let Some(path) = path.as_str() {
                resolved
                    .profile_avatar
                    .insert(hash.clone(), rewriter.to_bucket(Bucket::Attachments, path));
            }
        }
    }

    if let Some(avatar) = record.get("avatar").and_then(Value::as_object) {
        let mut group = avatar.clone();
        if let Some(path) = avatar.get("path").and_then(Value::as_str) {
            group.insert(
                "path".to_string(),
                Value::String(rewriter.to_bucket(Bucket::Attachments, path)),
            );
        }
        resolved.group_avatar = Value::Object(group);
    }

    resolved
}

/// One normalized contact, serialized as the 13-element display tuple the
/// presentation layer consumes.
#[derive(Debug, Clone)]
pub struct ContactEntry {
    /// Display name, possibly rewritten with the self-account marker
    pub name: String,
    /// Profile given name
    pub profile_name: String,
    /// Profile family name
    pub profile_family_name: String,
    /// E.164 phone number (or sentinel) with trailing display space
    pub e164_display: String,
    /// Upper-cased contact kind with trailing display space
    pub kind_display: String,
    /// Lifetime message count
    pub message_count: i64,
    /// Lifetime sent-message count
    pub sent_message_count: i64,
    /// Avatar-image id to rewritten path
    pub avatars: BTreeMap<String, String>,
    /// Profile-avatar hash to rewritten path
    pub profile_avatar: BTreeMap<String, String>,
    /// Group avatar object, empty when absent
    pub group_avatar: Value,
    /// Group member list, empty string when absent
    pub members: Value,
    /// Contact kind as stored (`private` | `group`)
    pub kind: String,
    /// Stable identifier
    pub uuid: String,
}

impl Serialize for ContactEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(13)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.profile_name)?;
        tuple.serialize_element(&self.profile_family_name)?;
        tuple.serialize_element(&self.e164_display)?;
        tuple.serialize_element(&self.kind_display)?;
        tuple.serialize_element(&self.message_count)?;
        tuple.serialize_element(&self.sent_message_count)?;
        tuple.serialize_element(&self.avatars)?;
        tuple.serialize_element(&self.profile_avatar)?;
        tuple.serialize_element(&self.group_avatar)?;
        tuple.serialize_element(&self.members)?;
        tuple.serialize_element(&self.kind)?;
        tuple.serialize_element(&self.uuid)?;
        tuple.end()
    }
}

/// The canonical contact directory, ordered by descending message count.
///
/// Serializes as a JSON object mapping contact id to display tuple, keys in
/// ranked order.
#[derive(Debug, Default)]
pub struct ContactDirectory {
    order: Vec<String>,
    entries: HashMap<String, ContactEntry>,
}

impl ContactDirectory {
    /// Look up a contact by conversation id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ContactEntry> {
        self.entries.get(id)
    }

    /// Number of contacts in the directory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate entries in ranked order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContactEntry)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| (id.as_str(), e)))
    }
}

impl Serialize for ContactDirectory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (id, entry) in self.iter() {
            map.serialize_entry(id, entry)?;
        }
        map.end()
    }
}

/// Build the contact directory from raw conversation rows.
///
/// `account_e164` is the device owner's own number; a matching contact gets
/// the self-account marker appended to (or substituted for) its name.
pub fn normalize_contacts(
    raw_conversations: &[String],
    account_e164: &str,
    rewriter: &PathRewriter,
) -> Result<ContactDirectory> {
    let mut directory = ContactDirectory::default();

    for row in raw_conversations {
        let record: Value = serde_json::from_str(row)?;
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SignalHistoryError::MissingRequiredField("conversation record id".to_string())
            })?
            .to_string();

        let avatars = resolve_avatars(&record, rewriter);
        let stored_name = record.get("name").and_then(Value::as_str);
        let e164 = record
            .get("e164")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty());

        let (name, e164_display) = match e164 {
            Some(e164) if !account_e164.is_empty() && e164 == account_e164 => {
                let name = match stored_name {
                    Some(name) => format!("{name} - {SELF_MARKER}"),
                    None => SELF_MARKER.to_string(),
                };
                (name, format!("{e164} "))
            }
            Some(e164) => (
                stored_name.unwrap_or_default().to_string(),
                format!("{e164} "),
            ),
            None => (
                stored_name.unwrap_or_default().to_string(),
                format!("{NO_E164} "),
            ),
        };

        let kind = record
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let entry = ContactEntry {
            name,
            profile_name: string_field(&record, "profileName"),
            profile_family_name: string_field(&record, "profileFamilyName"),
            e164_display,
            kind_display: format!("{} ", kind.to_uppercase()),
            message_count: record
                .get("messageCount")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            sent_message_count: record
                .get("sentMessageCount")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            avatars: avatars.avatars,
            profile_avatar: avatars.profile_avatar,
            group_avatar: avatars.group_avatar,
            members: record
                .get("membersV2")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
            kind,
            uuid: string_field(&record, "uuid"),
        };

        // Last record wins on id collision; source ids are assumed unique,
        // so a duplicate points at upstream corruption
        if directory.entries.insert(id.clone(), entry).is_some() {
            warn!(contact_id = %id, "Duplicate contact id in source, keeping last record");
        } else {
            directory.order.push(id);
        }
    }

    // Ranked by descending lifetime message count; stable sort keeps
    // encounter order on ties
    let counts: HashMap<String, i64> = directory
        .entries
        .iter()
        .map(|(id, e)| (id.clone(), e.message_count))
        .collect();
    directory
        .order
        .sort_by_key(|id| std::cmp::Reverse(counts.get(id).copied().unwrap_or(0)));

    Ok(directory)
}

fn string_field(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_avatars_all_absent() {
        let rewriter = PathRewriter::new(true);
        let resolved = resolve_avatars(&json!({"id": "c1"}), &rewriter);
        assert!(resolved.avatars.is_empty());
        assert!(resolved.profile_avatar.is_empty());
        assert_eq!(resolved.group_avatar, json!({}));
    }

    #[test]
    fn test_resolve_avatars_null_fields() {
        let rewriter = PathRewriter::new(true);
        let record = json!({"avatars": null, "profileAvatar": null, "avatar": null});
        let resolved = resolve_avatars(&record, &rewriter);
        assert!(resolved.avatars.is_empty());
        assert!(resolved.profile_avatar.is_empty());
        assert_eq!(resolved.group_avatar, json!({}));
    }

    #[test]
    fn test_resolve_avatars_rewrites_paths() {
        let rewriter = PathRewriter::new(true);
        let record = json!({
            "avatars": [
                {"id": "a2", "imagePath": "x\\y"},
                {"id": "a1", "imagePath": "p/q"},
                {"id": "a3"}
            ],
            "profileAvatar": {"deadbeef": "pr\\of"},
            "avatar": {"path": "gr\\oup", "size": 42}
        });
        let resolved = resolve_avatars(&record, &rewriter);
        assert_eq!(
            resolved.avatars.keys().collect::<Vec<_>>(),
            vec!["a1", "a2"]
        );
        assert_eq!(resolved.avatars["a2"], "avatars.noindex/x/y");
        assert_eq!(
            resolved.profile_avatar["deadbeef"],
            "attachments.noindex/pr/of"
        );
        assert_eq!(
            resolved.group_avatar,
            json!({"path": "attachments.noindex/gr/oup", "size": 42})
        );
    }

    #[test]
    fn test_contact_entry_serializes_as_tuple() {
        let rewriter = PathRewriter::new(true);
        let raw = vec![json!({
            "id": "c1",
            "name": "Alice",
            "e164": "+15550001",
            "type": "private",
            "messageCount": 3,
            "sentMessageCount": 1
        })
        .to_string()];
        let directory = normalize_contacts(&raw, "", &rewriter).unwrap();
        let value = serde_json::to_value(&directory).unwrap();
        let tuple = value["c1"].as_array().unwrap();
        assert_eq!(tuple.len(), 13);
        assert_eq!(tuple[0], "Alice");
        assert_eq!(tuple[3], "+15550001 ");
        assert_eq!(tuple[4], "PRIVATE ");
        assert_eq!(tuple[5], 3);
    }
}

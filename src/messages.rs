//! Message normalization: kind filtering, contact denormalization,
//! call-history decoding, and attachment resolution.
//!
//! Raw message records are heterogeneous JSON documents, so enrichment
//! happens in place on the parsed object rather than through a fixed model;
//! only the injected fields have a guaranteed shape.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::contacts::ContactDirectory;
use crate::error::{Result, SignalHistoryError};
use crate::utils::{utc_from_value, Bucket, PathRewriter};

/// Message kinds retained for analysis; everything else is administrative
/// and discarded by design.
pub const RETAINED_KINDS: [&str; 3] = ["call-history", "incoming", "outgoing"];

/// Resolved attachment views for one message.
#[derive(Debug, Default)]
pub struct ResolvedAttachments {
    /// Bucket-prefixed display path per usable descriptor, in source order
    pub display: Vec<String>,
    /// All descriptor fields folded into one sorted map, last write wins
    pub details: BTreeMap<String, Value>,
}

/// Expand a message's raw attachment descriptors.
///
/// Descriptors without a `path` are skipped entirely. The detail map is a
/// deliberate last-write-wins fold across descriptors: the detail view
/// favors the most recent descriptor on key collision.
#[must_use]
pub fn resolve_attachments(descriptors: &[Value], rewriter: &PathRewriter) -> ResolvedAttachments {
    let mut resolved = ResolvedAttachments::default();

    for descriptor in descriptors {
        let Some(fields) = descriptor.as_object() else {
            continue;
        };
        let Some(path) = fields.get("path").and_then(Value::as_str) else {
            continue;
        };

        let mut fields = fields.clone();
        fields
            .entry("fileName".to_string())
            .or_insert_with(|| Value::String("NO-FILENAME".to_string()));
        fields.insert(
            "path".to_string(),
            Value::String(rewriter.canonicalize(path)),
        );
        if let Some(thumb_path) = fields
            .get("thumbnail")
            .and_then(|t| t.get("path"))
            .and_then(Value::as_str)
            .map(|p| rewriter.canonicalize(p))
        {
            if let Some(thumbnail) = fields.get_mut("thumbnail").and_then(Value::as_object_mut) {
                thumbnail.insert("path".to_string(), Value::String(thumb_path));
            }
        }
        if let Some(uploaded) = fields.get("uploadTimestamp") {
            let normalized = utc_from_value(uploaded);
            fields.insert("uploadTimestamp".to_string(), Value::String(normalized));
        }

        resolved
            .display
            .push(rewriter.to_bucket(Bucket::Attachments, path));
        for (key, value) in fields {
            resolved.details.insert(key, value);
        }
        let folded_path = resolved
            .details
            .get("path")
            .and_then(Value::as_str)
            .map(|p| rewriter.to_bucket(Bucket::Attachments, p));
        if let Some(prefixed) = folded_path {
            resolved
                .details
                .insert("path".to_string(), Value::String(prefixed));
        }
    }

    resolved
}

/// Normalize raw message rows against the contact directory.
///
/// Keeps only the retained kinds, injects the denormalized contact tuple,
/// decodes call-history sub-records, and resolves attachments. Source order
/// is preserved; a `conversationId` that does not resolve aborts the run.
pub fn normalize_messages(
    raw_messages: &[String],
    contacts: &ContactDirectory,
    rewriter: &PathRewriter,
) -> Result<Vec<Value>> {
    let mut normalized = Vec::new();
    let mut discarded = 0usize;

    for row in raw_messages {
        let record: Value = serde_json::from_str(row)?;
        let Some(message) = record.as_object() else {
            discarded += 1;
            continue;
        };

        let retained = message
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| RETAINED_KINDS.contains(&kind));
        if !retained {
            discarded += 1;
            continue;
        }

        let mut message = message.clone();
        let contact_id = message
            .get("conversationId")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                SignalHistoryError::UnresolvedContact("(missing conversationId)".to_string())
            })?;
        let contact = contacts
            .get(&contact_id)
            .ok_or(SignalHistoryError::UnresolvedContact(contact_id))?;

        message.insert("ContactInfo".to_string(), serde_json::to_value(contact)?);
        message.insert("UserInfo".to_string(), Value::String(contact.name.clone()));

        if let Some(sent_at) = message.get("sent_at") {
            if sent_at != &Value::String(String::new()) {
                let normalized_ts = utc_from_value(sent_at);
                message.insert("SentUTC".to_string(), Value::String(normalized_ts));
            }
        }

        if message.get("type").and_then(Value::as_str) == Some("call-history") {
            let body = decode_call_history(message.get("callHistoryDetails"));
            message.insert("body".to_string(), body);
        }

        if message.get("hasAttachments").map_or(false, is_truthy) {
            let descriptors = message
                .get("attachments")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let attachments = resolve_attachments(&descriptors, rewriter);
            message.insert(
                "Attachments".to_string(),
                Value::Array(attachments.display.into_iter().map(Value::String).collect()),
            );
            message.insert(
                "AttachmentDetails".to_string(),
                serde_json::to_value(attachments.details)?,
            );
        }

        normalized.push(Value::Object(message));
    }

    debug!(
        retained = normalized.len(),
        discarded, "Normalized message records"
    );
    Ok(normalized)
}

/// Rebuild a call-history body from the nested sub-record.
///
/// The two time fields are normalized independently and default to the
/// empty string when absent.
fn decode_call_history(details: Option<&Value>) -> Value {
    let empty = Map::new();
    let details = details.and_then(Value::as_object).unwrap_or(&empty);
    let field = |key: &str| details.get(key).cloned().unwrap_or(Value::Null);
    let time_field = |key: &str| {
        details
            .get(key)
            .map(utc_from_value)
            .unwrap_or_default()
    };

    let mut body = Map::new();
    body.insert("callMode".to_string(), field("callMode"));
    body.insert("wasIncoming".to_string(), field("wasIncoming"));
    body.insert("wasVideoCall".to_string(), field("wasVideoCall"));
    body.insert("wasDeclined".to_string(), field("wasDeclined"));
    body.insert(
        "acceptedTime".to_string(),
        Value::String(time_field("acceptedTime")),
    );
    body.insert(
        "endedTime".to_string(),
        Value::String(time_field("endedTime")),
    );
    Value::Object(body)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

//! Shared normalization helpers: timestamps and stored file paths.
//!
//! Signal stores epoch-millisecond timestamps and platform-specific relative
//! paths inside its JSON records. Both need a canonical form before the
//! artifacts are readable cross-platform.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Convert an epoch-milliseconds value to a UTC display string.
///
/// Returns the empty string for `None` and for values chrono cannot
/// represent. The output format is `YYYY-MM-DD HH:MM:SS.ffffff UTC`.
#[must_use]
pub fn format_utc_ms(ts: Option<i64>) -> String {
    match ts.and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string(),
        None => String::new(),
    }
}

/// Normalize a JSON timestamp value (number or null) to a UTC display string.
///
/// Non-numeric values yield the empty string; fractional epochs are truncated
/// to whole milliseconds.
#[must_use]
pub fn utc_from_value(value: &Value) -> String {
    let ms = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    };
    format_utc_ms(ms)
}

/// Logical storage namespace a rewritten path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Message attachments and profile/group avatar blobs
    Attachments,
    /// Per-contact avatar image list
    Avatars,
}

impl Bucket {
    /// Directory prefix the presentation layer expects for this bucket.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Attachments => "attachments.noindex/",
            Self::Avatars => "avatars.noindex/",
        }
    }
}

/// Rewrites stored paths for cross-platform review.
///
/// Separator conversion only applies when the analysis host differs from the
/// platform family that produced the data; the bucket prefix is always
/// applied, and applying the rewriter twice yields the same result.
#[derive(Debug, Clone, Copy)]
pub struct PathRewriter {
    convert_separators: bool,
}

impl PathRewriter {
    /// Build a rewriter with an explicit separator-conversion toggle.
    #[must_use]
    pub const fn new(convert_separators: bool) -> Self {
        Self { convert_separators }
    }

    /// Build a rewriter for the current host platform.
    ///
    /// Windows-produced data reviewed on a Unix host needs its backslash
    /// separators converted; on Windows the stored form is already native.
    #[must_use]
    pub const fn for_host() -> Self {
        Self::new(cfg!(not(target_os = "windows")))
    }

    /// Convert separators without attaching a bucket prefix.
    ///
    /// Paths with no separator characters pass through unchanged.
    #[must_use]
    pub fn canonicalize(&self, path: &str) -> String {
        if self.convert_separators {
            path.replace('\\', "/")
        } else {
            path.to_string()
        }
    }

    /// Canonicalize a path and prefix it with its storage bucket.
    ///
    /// Idempotent: input already carrying the bucket prefix is returned as-is.
    #[must_use]
    pub fn to_bucket(&self, bucket: Bucket, path: &str) -> String {
        let canonical = self.canonicalize(path);
        if canonical.starts_with(bucket.prefix()) {
            canonical
        } else {
            format!("{}{}", bucket.prefix(), canonical)
        }
    }
}

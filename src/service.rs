//! Pipeline orchestration.
//!
//! One run is a full extraction: open the store, normalize everything in
//! dependency order (items feed the contact normalizer, contacts feed the
//! message normalizer), then persist the artifact set. There is no
//! incremental mode, no retry, and no mid-pipeline checkpoint; a failed run
//! is re-run from scratch. Concurrent runs against the same output
//! directory are unsupported and produce undefined interleaving.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::contacts::normalize_contacts;
use crate::db::{SignalStore, StoreConfig};
use crate::error::{Result, SignalHistoryError};
use crate::file_writer::{artifacts, write_json_artifact, write_raw_rows};
use crate::items::normalize_items;
use crate::logging::OperationTimer;
use crate::logs::{merge_logs, LogCategory};
use crate::messages::normalize_messages;
use crate::utils::PathRewriter;

/// Explicit per-run context threaded through the pipeline.
///
/// Replaces any ambient notion of "the current source": everything a step
/// needs arrives as an argument.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    /// Signal profile directory being analyzed
    pub source_dir: PathBuf,
    /// Directory the artifact set is written to
    pub output_dir: PathBuf,
    /// Path rewriting policy for this run
    pub rewriter: PathRewriter,
}

impl ExtractionContext {
    /// Build a run context from CLI paths and application configuration.
    #[must_use]
    pub fn new(source_dir: &Path, output_dir: &Path, config: &AppConfig) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            rewriter: PathRewriter::new(config.convert_separators()),
        }
    }
}

/// Run the full extraction pipeline for one profile.
pub async fn run_extraction(ctx: &ExtractionContext) -> Result<()> {
    let timer = OperationTimer::new("extraction");

    let store_config = StoreConfig::read(&ctx.source_dir)?;
    let store = SignalStore::open(&ctx.source_dir, &store_config)?;
    let tables = store.extract()?;
    drop(store);

    let items = normalize_items(&tables.items)?;
    let account_e164 = match items.account_e164() {
        Some(e164) => e164.to_string(),
        None => {
            warn!("No accountE164 in device metadata, self-account detection disabled");
            String::new()
        }
    };

    let contacts = normalize_contacts(&tables.conversations, &account_e164, &ctx.rewriter)?;
    let messages = normalize_messages(&tables.messages, &contacts, &ctx.rewriter)?;
    info!(
        contacts = contacts.len(),
        messages = messages.len(),
        "Normalization complete"
    );

    write_json_artifact(&ctx.output_dir, artifacts::CONTACTS, &contacts)?;
    write_json_artifact(&ctx.output_dir, artifacts::MESSAGES, &messages)?;
    write_raw_rows(&ctx.output_dir, artifacts::CONVOS, &tables.conversations)?;
    write_json_artifact(&ctx.output_dir, artifacts::ITEMS, &items)?;
    write_json_artifact(&ctx.output_dir, artifacts::CONFIG, &store_config.document)?;

    // The two categories are independent of the store extraction and of
    // each other; their artifacts are disjoint files
    let app_source = ctx.source_dir.clone();
    let main_source = ctx.source_dir.clone();
    let (app_logs, main_logs) = tokio::join!(
        tokio::task::spawn_blocking(move || merge_logs(&app_source, LogCategory::App)),
        tokio::task::spawn_blocking(move || merge_logs(&main_source, LogCategory::Main)),
    );
    let app_logs = flatten_join(app_logs)?;
    let main_logs = flatten_join(main_logs)?;

    write_json_artifact(&ctx.output_dir, LogCategory::App.artifact_name(), &app_logs)?;
    write_json_artifact(
        &ctx.output_dir,
        LogCategory::Main.artifact_name(),
        &main_logs,
    )?;

    timer.finish();
    Ok(())
}

fn flatten_join<T>(joined: std::result::Result<Result<T>, tokio::task::JoinError>) -> Result<T> {
    joined.map_err(|e| SignalHistoryError::Io(std::io::Error::other(e)))?
}

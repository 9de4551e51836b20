//! FlashCull - fast preview triage for photo folders
//!
//! Headless entry point: opens the folder given on the command line, warms
//! previews for every image through the session cache and logs a summary.

use anyhow::{Context, Result};
use app_core::{AppConfig, AppState, PreviewSource};
use app_fs::LocalFolder;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and panic hook first
    let _log = app_log::init()?;

    // Clean up old logs (7 days)
    if let Err(e) = app_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("FlashCull starting...");

    let folder: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: flashcull <folder>")?;

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });

    let state = AppState::new(config);
    let session = state
        .open_folder(Arc::new(LocalFolder::new(&folder)))
        .await
        .with_context(|| format!("opening {}", folder.display()))?;

    let started = Instant::now();
    let outcomes = session.prefetch_all().await;

    let mut by_source: HashMap<PreviewSource, usize> = HashMap::new();
    for preview in outcomes.iter().filter_map(|o| o.preview()) {
        *by_source.entry(preview.source()).or_default() += 1;
    }
    let unavailable = outcomes.iter().filter(|o| !o.is_ready()).count();

    for (source, count) in &by_source {
        tracing::info!("{:?}: {}", source, count);
    }
    if unavailable > 0 {
        tracing::warn!("No preview for {} of {} files", unavailable, outcomes.len());
    }

    let stats = session.cache().stats();
    tracing::info!(
        "Warmed {} previews ({} bytes) in {:?}",
        stats.resolved,
        stats.bytes,
        started.elapsed()
    );

    state.close();
    Ok(())
}

//! Sync the data root into the vector storage

use crate::catalog;
use crate::commands::Services;
use crate::error::Result;
use crate::progress::FileProgress;
use crate::ui;
use tracing::{error, info};

/// Statistics from a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub collections: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub chunks: usize,
    pub errors: Vec<String>,
}

/// Options for the sync command
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Only this data collection
    pub collection: Option<String>,
    /// Wipe the storage root first
    pub reset: bool,
}

/// What to do with the storage when the chat starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPlan {
    /// Nothing indexed yet: ingest everything
    InitialIngest,
    /// Indexed collections exist: ask whether to rebuild them
    OfferReindex,
}

/// Decide the startup plan from the storage root
pub fn plan_startup(services: &Services) -> Result<StartupPlan> {
    if catalog::has_collections(&services.config.paths.storage_dir)? {
        Ok(StartupPlan::OfferReindex)
    } else {
        Ok(StartupPlan::InitialIngest)
    }
}

/// Ingest every file of the configured extension, collection by collection.
///
/// A failing file is reported and counted; the run moves on to the next one.
pub async fn cmd_sync(services: &Services, options: SyncOptions) -> Result<SyncStats> {
    let paths = &services.config.paths;

    if options.reset {
        catalog::remove_storage(&paths.storage_dir).await?;
        services.store.invalidate().await;
    }

    let collections = match options.collection {
        Some(name) => vec![name],
        None => catalog::list_collections(&paths.data_dir)?,
    };

    let pipeline = services.pipeline();
    let mut stats = SyncStats::default();

    for collection in &collections {
        let files = catalog::list_files(&paths.data_dir.join(collection), pipeline.extension())?;
        if files.is_empty() {
            info!("No .{} files in {}", pipeline.extension(), collection);
            continue;
        }

        ui::collection(collection, files.len());
        stats.collections += 1;

        for path in &files {
            let bar = FileProgress::start(path);
            let result = pipeline
                .ingest_file(path, collection, |p| bar.update(p))
                .await;
            match result {
                Ok(report) if report.is_skipped() => {
                    stats.files_skipped += 1;
                    bar.finish("skipped");
                }
                Ok(report) => {
                    stats.files_indexed += 1;
                    stats.chunks += report.chunks();
                    bar.finish("done");
                }
                Err(e) => {
                    error!("{}", e);
                    stats.errors.push(e.to_string());
                    bar.abandon("failed");
                }
            }
        }
    }

    info!(
        "Synced {} collections: {} files, {} chunks",
        stats.collections, stats.files_indexed, stats.chunks
    );
    Ok(stats)
}

/// Print sync statistics
pub fn print_sync_stats(stats: &SyncStats) {
    if stats.errors.is_empty() {
        ui::success(&format!(
            "Indexed {} files ({} chunks) across {} collections",
            stats.files_indexed, stats.chunks, stats.collections
        ));
    } else {
        ui::error(&format!(
            "Indexed {} files ({} chunks); {} files failed:",
            stats.files_indexed,
            stats.chunks,
            stats.errors.len()
        ));
        for err in &stats.errors {
            println!("  • {}", err);
        }
    }
    if stats.files_skipped > 0 {
        println!("  Skipped: {}", stats.files_skipped);
    }
}

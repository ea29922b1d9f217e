pub mod aggregate;
pub mod config;
pub mod date_util;
pub mod error;
pub mod storage;
pub mod sync;
pub mod url;
pub mod web;
pub mod youtube;

use serde::Serialize;

pub use aggregate::{PlaylistMonth, PlaylistReport, PlaylistTotals, RefreshReport, Source, VideoRow};
pub use config::{ApiConfig, Config, StoreConfig, WebConfig};
pub use error::{Error, Result};
pub use storage::repository::SyncRun;
pub use storage::{Database, SqliteVideoStore, VideoStore};
pub use sync::{NoopProgress, SyncMode, SyncProgress, SyncReport, Throttle};
pub use crate::url::{parse_youtube_url, resolve_playlist_id, YouTubeUrlInfo};
pub use youtube::{HttpTransport, PlaylistSummary, Transport, VideoRecord, YouTubeClient};

use storage::repository::{self, SyncRunCounts};
use sync::syncer;

/// Main entry point for syncing a channel into the warehouse.
pub struct TubeStats<T = HttpTransport> {
    db: Database,
    store: SqliteVideoStore,
    client: YouTubeClient<T>,
}

impl<T: Transport> TubeStats<T> {
    pub fn new(db: Database, client: YouTubeClient<T>) -> Self {
        Self {
            store: SqliteVideoStore::new(db.clone()),
            db,
            client,
        }
    }

    /// Access the database (for reports and direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Sync commands ──────────────────────────────────────────────

    /// Full load of every non-excluded playlist. Recorded in `sync_runs`.
    pub async fn initial_load(&self, progress: &dyn SyncProgress) -> Result<SyncReport> {
        self.run_recorded(SyncMode::Initial, progress).await
    }

    /// Incremental check pass. Recorded in `sync_runs`.
    pub async fn check_for_new_videos(&self, progress: &dyn SyncProgress) -> Result<SyncReport> {
        self.run_recorded(SyncMode::Check, progress).await
    }

    async fn run_recorded(&self, mode: SyncMode, progress: &dyn SyncProgress) -> Result<SyncReport> {
        let run_id = self
            .db
            .writer()
            .call(move |conn| repository::insert_sync_run(conn, mode.as_str()))
            .await?;

        let outcome = match mode {
            SyncMode::Initial => syncer::initial_load(&self.store, &self.client, progress).await,
            SyncMode::Check => {
                syncer::check_for_new_videos(&self.store, &self.client, progress).await
            }
        };

        let (status, counts, error) = match &outcome {
            Ok(report) => ("completed", run_counts(report), None),
            Err(e) => {
                log::error!("{mode} pass failed: {e}");
                ("failed", SyncRunCounts::default(), Some(e.to_string()))
            }
        };
        let recorded = self
            .db
            .writer()
            .call(move |conn| {
                repository::finish_sync_run(conn, run_id, status, counts, error.as_deref())
            })
            .await;
        if let Err(e) = recorded {
            log::warn!("Failed to record outcome of sync run {run_id}: {e}");
        }

        outcome
    }
}

fn run_counts(report: &SyncReport) -> SyncRunCounts {
    SyncRunCounts {
        playlists: report.playlists_processed,
        new_playlists: report.new_playlists,
        new_videos: report.new_videos,
        updated_videos: report.updated_videos,
    }
}

/// Snapshot of what the warehouse holds.
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseStatus {
    pub videos: u64,
    pub playlists: u64,
    pub last_sync: Option<SyncRun>,
    pub last_failure: Option<SyncRun>,
}

pub async fn warehouse_status(db: &Database) -> Result<WarehouseStatus> {
    let tables = db.tables_handle();
    Ok(db
        .reader()
        .call(move |conn| {
            Ok::<_, rusqlite::Error>(WarehouseStatus {
                videos: repository::count_videos(conn, &tables)?,
                playlists: repository::existing_playlist_ids(conn, &tables)?.len() as u64,
                last_sync: repository::last_sync_run(conn, "completed")?,
                last_failure: repository::last_sync_run(conn, "failed")?,
            })
        })
        .await?)
}

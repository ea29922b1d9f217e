pub mod syncer;
pub mod throttle;

use serde::Serialize;

use crate::youtube::PlaylistSummary;

pub use syncer::{check_for_new_videos, initial_load};
pub use throttle::Throttle;

/// Which traversal a pass performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Insert every video not yet stored; leave stored ones alone.
    Initial,
    /// Insert new videos and refresh counts on stored ones.
    Check,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Initial => "initial",
            SyncMode::Check => "check",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters accumulated over one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub playlists_processed: u64,
    /// Playlists with no stored video at the time they were visited.
    pub new_playlists: u64,
    pub new_videos: u64,
    pub updated_videos: u64,
    /// Videos the initial load found already stored and skipped.
    pub already_present: u64,
    /// Statistics updates that matched no stored row.
    pub missing_on_update: u64,
    /// Inserts the full load gave up on and skipped.
    pub failed_inserts: u64,
}

impl SyncReport {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            playlists_processed: 0,
            new_playlists: 0,
            new_videos: 0,
            updated_videos: 0,
            already_present: 0,
            missing_on_update: 0,
            failed_inserts: 0,
        }
    }
}

/// Callback for reporting sync progress to the caller.
pub trait SyncProgress: Send + Sync {
    fn on_playlist_start(&self, _playlist: &PlaylistSummary, _index: usize, _total: usize) {}
    fn on_playlist_complete(&self, _playlist: &PlaylistSummary, _inserted: u64, _updated: u64) {}
}

/// No-op progress reporter.
pub struct NoopProgress;

impl SyncProgress for NoopProgress {}

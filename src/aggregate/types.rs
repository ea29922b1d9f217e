use serde::{Deserialize, Serialize};

/// Where an aggregate is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The summary tables written by the last refresh.
    #[default]
    Stored,
    /// Computed from the raw video table at read time.
    Live,
}

/// Per-playlist totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistTotals {
    pub playlist_id: String,
    pub playlist_title: String,
    pub url: String,
    pub total_videos: u64,
    pub total_views: u64,
    pub total_likes: u64,
    pub avg_views: f64,
    pub avg_likes: f64,
}

/// Per-playlist totals for one publication month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistMonth {
    pub playlist_id: String,
    pub playlist_title: String,
    pub year_month: String,
    pub total_videos: u64,
    pub total_views: u64,
    pub total_likes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRow {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub view_count: u64,
    pub like_count: u64,
    pub published_at: Option<String>,
}

/// One playlist with all its stored videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistReport {
    pub playlist_id: String,
    pub title: String,
    pub url: String,
    /// Oldest first; undated videos lead.
    pub videos: Vec<VideoRow>,
    /// Up to five most viewed.
    pub top_videos: Vec<VideoRow>,
}

/// Row counts written by a summary refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub playlists: u64,
    pub months: u64,
}

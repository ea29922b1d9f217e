use serde::{Deserialize, Deserializer, Serialize};

use crate::date_util::normalize_timestamp;

// ── Domain records ─────────────────────────────────────────────────

/// A playlist as observed during one sync pass. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Item count declared by the provider; informational only.
    pub video_count: u64,
    pub published_at: Option<String>,
}

/// One entry of a playlist listing, before statistics are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoStub {
    pub video_id: String,
    pub playlist_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VideoStatistics {
    pub view_count: u64,
    pub like_count: u64,
}

/// A fully joined video row, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub playlist_id: String,
    pub playlist_title: String,
    pub view_count: u64,
    pub like_count: u64,
    pub published_at: Option<String>,
}

impl VideoRecord {
    pub fn from_parts(stub: VideoStub, playlist_title: &str, stats: VideoStatistics) -> Self {
        Self {
            video_id: stub.video_id,
            title: stub.title,
            playlist_id: stub.playlist_id,
            playlist_title: playlist_title.to_string(),
            view_count: stats.view_count,
            like_count: stats.like_count,
            published_at: stub.published_at,
        }
    }
}

// ── Wire format ────────────────────────────────────────────────────

/// One page of any list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Continuation token, treating an empty string as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistResource {
    pub id: String,
    pub snippet: PlaylistSnippet,
    pub content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistContentDetails {
    #[serde(default, deserialize_with = "de_count")]
    pub item_count: u64,
}

impl From<PlaylistResource> for PlaylistSummary {
    fn from(r: PlaylistResource) -> Self {
        Self {
            id: r.id,
            title: r.snippet.title,
            description: r.snippet.description,
            video_count: r.content_details.map(|c| c.item_count).unwrap_or(0),
            published_at: r
                .snippet
                .published_at
                .as_deref()
                .and_then(normalize_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemResource {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<String>,
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceId {
    pub video_id: Option<String>,
}

impl PlaylistItemResource {
    /// Items without a video id (e.g. removed entries) yield `None`.
    pub fn into_stub(self, playlist_id: &str) -> Option<VideoStub> {
        let video_id = self.snippet.resource_id?.video_id?;
        Some(VideoStub {
            video_id,
            playlist_id: playlist_id.to_string(),
            title: self.snippet.title,
            description: self.snippet.description,
            published_at: self
                .snippet
                .published_at
                .as_deref()
                .and_then(normalize_timestamp),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoResource {
    pub id: String,
    pub statistics: Option<StatisticsResource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatisticsResource {
    #[serde(default, deserialize_with = "de_count")]
    pub view_count: u64,
    /// Absent when the owner hides likes.
    #[serde(default, deserialize_with = "de_count")]
    pub like_count: u64,
}

impl From<StatisticsResource> for VideoStatistics {
    fn from(s: StatisticsResource) -> Self {
        Self {
            view_count: s.view_count,
            like_count: s.like_count,
        }
    }
}

/// Counters arrive as decimal strings (`"1234"`), occasionally as numbers.
fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

//! Scripted in-memory provider for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::error::{Error, Result};

use super::transport::Transport;

pub(crate) const DEFAULT_PUBLISHED_AT: &str = "2024-01-15T12:00:00Z";

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub resource: String,
    pub params: HashMap<String, String>,
}

struct FakeVideo {
    id: String,
    title: String,
    published_at: String,
}

type FailurePredicate = Box<dyn Fn(&RecordedRequest) -> bool + Send>;

#[derive(Default)]
struct State {
    playlists: Vec<(String, String)>,
    items: HashMap<String, Vec<FakeVideo>>,
    stats: HashMap<String, (u64, u64)>,
    requests: Vec<RecordedRequest>,
    failures: Vec<FailurePredicate>,
}

pub(crate) struct FakeYouTube {
    page_size: usize,
    state: Mutex<State>,
}

impl FakeYouTube {
    pub fn new() -> Self {
        Self::with_page_size(50)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: Mutex::new(State::default()),
        }
    }

    pub fn add_playlist(&self, id: &str, title: &str) {
        let mut state = self.state.lock().unwrap();
        state.playlists.push((id.to_string(), title.to_string()));
        state.items.entry(id.to_string()).or_default();
    }

    pub fn add_video(&self, playlist_id: &str, video_id: &str, title: &str, views: u64, likes: u64) {
        self.add_video_published(playlist_id, video_id, title, DEFAULT_PUBLISHED_AT, views, likes);
    }

    pub fn add_video_published(
        &self,
        playlist_id: &str,
        video_id: &str,
        title: &str,
        published_at: &str,
        views: u64,
        likes: u64,
    ) {
        self.add_video_without_stats_at(playlist_id, video_id, title, published_at);
        self.set_stats(video_id, views, likes);
    }

    /// A playlist entry the `videos` endpoint knows nothing about.
    pub fn add_video_without_stats(&self, playlist_id: &str, video_id: &str, title: &str) {
        self.add_video_without_stats_at(playlist_id, video_id, title, DEFAULT_PUBLISHED_AT);
    }

    fn add_video_without_stats_at(
        &self,
        playlist_id: &str,
        video_id: &str,
        title: &str,
        published_at: &str,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .items
            .entry(playlist_id.to_string())
            .or_default()
            .push(FakeVideo {
                id: video_id.to_string(),
                title: title.to_string(),
                published_at: published_at.to_string(),
            });
    }

    pub fn set_stats(&self, video_id: &str, views: u64, likes: u64) {
        let mut state = self.state.lock().unwrap();
        state.stats.insert(video_id.to_string(), (views, likes));
    }

    /// Fail every subsequent request matching `predicate` with a 503.
    pub fn fail_when(&self, predicate: impl Fn(&RecordedRequest) -> bool + Send + 'static) {
        let mut state = self.state.lock().unwrap();
        state.failures.push(Box::new(predicate));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_for(&self, resource: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.resource == resource)
            .collect()
    }

    fn page<T>(&self, items: &[T], params: &HashMap<String, String>) -> (usize, usize, Option<String>) {
        let offset = params
            .get("pageToken")
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0usize)
            .min(items.len());
        let end = (offset + self.page_size).min(items.len());
        let next = (end < items.len()).then(|| format!("page-{end}"));
        (offset, end, next)
    }
}

#[async_trait]
impl Transport for FakeYouTube {
    async fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<Value> {
        let request = RecordedRequest {
            resource: resource.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };

        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if state.failures.iter().any(|f| f(&request)) {
            return Err(Error::Api {
                resource: resource.to_string(),
                status: 503,
                message: "scripted failure".to_string(),
            });
        }

        let params = &request.params;
        match resource {
            "playlists" => {
                let (start, end, next) = self.page(&state.playlists, params);
                let items: Vec<Value> = state.playlists[start..end]
                    .iter()
                    .map(|(id, title)| {
                        json!({
                            "kind": "youtube#playlist",
                            "id": id,
                            "snippet": {"title": title, "description": "", "publishedAt": DEFAULT_PUBLISHED_AT},
                            "contentDetails": {"itemCount": state.items.get(id).map_or(0, Vec::len)}
                        })
                    })
                    .collect();
                Ok(json!({"items": items, "nextPageToken": next}))
            }
            "playlistItems" => {
                let playlist_id = params.get("playlistId").cloned().unwrap_or_default();
                let Some(videos) = state.items.get(&playlist_id) else {
                    return Err(Error::Api {
                        resource: resource.to_string(),
                        status: 404,
                        message: format!("playlist {playlist_id} not found"),
                    });
                };
                let (start, end, next) = self.page(videos, params);
                let items: Vec<Value> = videos[start..end]
                    .iter()
                    .map(|v| {
                        json!({
                            "snippet": {
                                "title": v.title,
                                "publishedAt": v.published_at,
                                "resourceId": {"kind": "youtube#video", "videoId": v.id}
                            }
                        })
                    })
                    .collect();
                Ok(json!({"items": items, "nextPageToken": next}))
            }
            "videos" => {
                let items: Vec<Value> = params
                    .get("id")
                    .map(|s| s.split(','))
                    .into_iter()
                    .flatten()
                    .filter_map(|id| {
                        state.stats.get(id).map(|(views, likes)| {
                            json!({
                                "id": id,
                                "statistics": {"viewCount": views.to_string(), "likeCount": likes.to_string()}
                            })
                        })
                    })
                    .collect();
                Ok(json!({"items": items}))
            }
            other => Err(Error::Api {
                resource: other.to_string(),
                status: 404,
                message: "unknown resource".to_string(),
            }),
        }
    }
}

/// Provider settings pointing nowhere, with the given exclusions.
pub(crate) fn api_config(skip: &[&str]) -> ApiConfig {
    ApiConfig {
        api_key: "test-key".to_string(),
        channel_id: "UCtest".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        max_results: 50,
        skip_playlist_ids: skip.iter().map(|s| s.to_string()).collect(),
        request_timeout: Duration::from_secs(1),
    }
}

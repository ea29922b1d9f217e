use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;

use crate::config::{ApiConfig, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::sync::Throttle;

use super::transport::{HttpTransport, Transport};
use super::types::{
    Page, PlaylistItemResource, PlaylistResource, PlaylistSummary, VideoRecord, VideoResource,
    VideoStatistics, VideoStub,
};

/// Maximum number of ids the `videos` endpoint accepts per request.
pub const STATS_BATCH_SIZE: usize = MAX_PAGE_SIZE as usize;

/// Read-only view of one channel's playlists and videos.
///
/// Provider failures never escape this type: a failed page ends that listing
/// with what was gathered so far, and a failed statistics chunk contributes
/// nothing. Both are logged. Nothing is retried.
pub struct YouTubeClient<T = HttpTransport> {
    transport: T,
    channel_id: String,
    max_results: u32,
    skip_playlist_ids: HashSet<String>,
    throttle: Throttle,
}

impl YouTubeClient<HttpTransport> {
    pub fn from_config(config: &ApiConfig, throttle: Throttle) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?, config, throttle))
    }
}

impl<T: Transport> YouTubeClient<T> {
    pub fn new(transport: T, config: &ApiConfig, throttle: Throttle) -> Self {
        Self {
            transport,
            channel_id: config.channel_id.clone(),
            max_results: config.max_results.clamp(1, MAX_PAGE_SIZE),
            skip_playlist_ids: config.skip_playlist_ids.clone(),
            throttle,
        }
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn is_excluded(&self, playlist_id: &str) -> bool {
        self.skip_playlist_ids.contains(playlist_id)
    }

    /// All playlists of the configured channel, in provider order, minus the
    /// excluded ones.
    pub async fn list_playlists(&self) -> Vec<PlaylistSummary> {
        let params = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("channelId", self.channel_id.clone()),
            ("maxResults", self.max_results.to_string()),
        ];
        let (resources, failure) = self
            .fetch_all_pages::<PlaylistResource>("playlists", &params)
            .await;
        if let Some(e) = failure {
            log::error!("Listing playlists for channel {} stopped early: {e}", self.channel_id);
        }

        let mut skipped = 0usize;
        let mut playlists = Vec::with_capacity(resources.len());
        for resource in resources {
            if self.is_excluded(&resource.id) {
                log::info!(
                    "Skipping excluded playlist: {} (ID: {})",
                    resource.snippet.title,
                    resource.id
                );
                skipped += 1;
                continue;
            }
            playlists.push(PlaylistSummary::from(resource));
        }

        log::info!(
            "Fetched {} playlists from channel {} (skipped {skipped})",
            playlists.len(),
            self.channel_id
        );
        playlists
    }

    /// Every entry of one playlist, in playlist order.
    pub async fn list_playlist_items(&self, playlist_id: &str) -> Vec<VideoStub> {
        let params = vec![
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        let (resources, failure) = self
            .fetch_all_pages::<PlaylistItemResource>("playlistItems", &params)
            .await;
        if let Some(e) = failure {
            log::error!("Listing videos of playlist {playlist_id} stopped early: {e}");
        }

        let stubs: Vec<VideoStub> = resources
            .into_iter()
            .filter_map(|r| r.into_stub(playlist_id))
            .collect();
        log::info!("Fetched {} videos from playlist {playlist_id}", stubs.len());
        stubs
    }

    /// Statistics for `video_ids`, requested in chunks of at most
    /// `batch_size` (itself capped at [`STATS_BATCH_SIZE`]). Duplicate ids are
    /// requested once. A failed chunk is logged and contributes no entries.
    pub async fn fetch_statistics(
        &self,
        video_ids: &[String],
        batch_size: usize,
    ) -> HashMap<String, VideoStatistics> {
        let batch_size = batch_size.clamp(1, STATS_BATCH_SIZE);
        let mut seen = HashSet::new();
        let ids: Vec<&str> = video_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut stats = HashMap::with_capacity(ids.len());
        let total = ids.len().div_ceil(batch_size);
        for (i, chunk) in ids.chunks(batch_size).enumerate() {
            if i > 0 {
                self.throttle.between_batches().await;
            }
            let params = vec![
                ("part", "statistics".to_string()),
                ("id", chunk.join(",")),
                ("maxResults", chunk.len().to_string()),
            ];
            match self.fetch_page::<VideoResource>("videos", &params).await {
                Ok(page) => {
                    for video in page.items {
                        stats.insert(video.id, video.statistics.unwrap_or_default().into());
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Statistics chunk {}/{total} ({} ids) failed: {e}",
                        i + 1,
                        chunk.len()
                    );
                }
            }
        }
        stats
    }

    /// A playlist's videos joined with their statistics. Videos whose
    /// statistics could not be fetched are dropped.
    pub async fn list_videos_with_statistics(
        &self,
        playlist_id: &str,
        playlist_title: &str,
    ) -> Vec<VideoRecord> {
        let stubs = self.list_playlist_items(playlist_id).await;
        if stubs.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = stubs.iter().map(|s| s.video_id.clone()).collect();
        let stats = self.fetch_statistics(&ids, STATS_BATCH_SIZE).await;

        let records: Vec<VideoRecord> = stubs
            .into_iter()
            .filter_map(|stub| {
                let s = stats.get(&stub.video_id).copied();
                if s.is_none() {
                    log::debug!("No statistics for video {}, dropping it", stub.video_id);
                }
                s.map(|s| VideoRecord::from_parts(stub, playlist_title, s))
            })
            .collect();
        log::info!(
            "Fetched statistics for {} videos of playlist {playlist_title}",
            records.len()
        );
        records
    }

    /// Walk every page of a list endpoint. Returns the items gathered and the
    /// failure that ended the walk early, if any.
    async fn fetch_all_pages<R: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, String)],
    ) -> (Vec<R>, Option<Error>) {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut page_params = params.to_vec();
            if let Some(ref token) = page_token {
                page_params.push(("pageToken", token.clone()));
            }

            let page = match self.fetch_page::<R>(resource, &page_params).await {
                Ok(page) => page,
                Err(e) => return (items, Some(e)),
            };
            let next = page.continuation().map(str::to_string);
            items.extend(page.items);

            match next {
                Some(token) => {
                    page_token = Some(token);
                    self.throttle.after_page().await;
                }
                None => return (items, None),
            }
        }
    }

    async fn fetch_page<R: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<Page<R>> {
        let value = self.transport.get(resource, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

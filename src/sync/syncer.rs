use crate::error::Result;
use crate::storage::VideoStore;
use crate::sync::{SyncMode, SyncProgress, SyncReport};
use crate::youtube::{PlaylistSummary, Transport, VideoStatistics, YouTubeClient};

/// Full load: insert every video of every non-excluded playlist that is not
/// stored yet. Stored videos are left untouched.
pub async fn initial_load<S, T>(
    store: &S,
    client: &YouTubeClient<T>,
    progress: &dyn SyncProgress,
) -> Result<SyncReport>
where
    S: VideoStore + ?Sized,
    T: Transport,
{
    run_pass(SyncMode::Initial, store, client, progress).await
}

/// Incremental check: insert unseen videos and overwrite the view/like counts
/// of every stored video that is seen again, whether or not they changed.
pub async fn check_for_new_videos<S, T>(
    store: &S,
    client: &YouTubeClient<T>,
    progress: &dyn SyncProgress,
) -> Result<SyncReport>
where
    S: VideoStore + ?Sized,
    T: Transport,
{
    run_pass(SyncMode::Check, store, client, progress).await
}

/// One traversal of the channel's playlists in provider order.
///
/// A store error aborts the pass and propagates; rows written by earlier
/// iterations stay written. Provider errors never reach here: the client has
/// already reduced them to shorter listings.
async fn run_pass<S, T>(
    mode: SyncMode,
    store: &S,
    client: &YouTubeClient<T>,
    progress: &dyn SyncProgress,
) -> Result<SyncReport>
where
    S: VideoStore + ?Sized,
    T: Transport,
{
    let mut report = SyncReport::new(mode);
    let playlists = client.list_playlists().await;
    let total = playlists.len();
    log::info!("Starting {mode} pass over {total} playlists");

    for (index, playlist) in playlists.iter().enumerate() {
        if index > 0 {
            client.throttle().between_playlists().await;
        }
        progress.on_playlist_start(playlist, index, total);

        // Informational only: new playlists go through the same loop.
        if mode == SyncMode::Check && !store.playlist_exists(&playlist.id).await? {
            log::info!("New playlist found: {} ({})", playlist.title, playlist.id);
            report.new_playlists += 1;
        }

        let (inserted, updated) = sync_playlist(mode, store, client, playlist, &mut report).await?;

        report.playlists_processed += 1;
        report.new_videos += inserted;
        report.updated_videos += updated;
        progress.on_playlist_complete(playlist, inserted, updated);
    }

    log::info!(
        "{mode} pass complete: {} playlists, {} new playlists, {} new videos, {} updated videos",
        report.playlists_processed,
        report.new_playlists,
        report.new_videos,
        report.updated_videos
    );
    Ok(report)
}

async fn sync_playlist<S, T>(
    mode: SyncMode,
    store: &S,
    client: &YouTubeClient<T>,
    playlist: &PlaylistSummary,
    report: &mut SyncReport,
) -> Result<(u64, u64)>
where
    S: VideoStore + ?Sized,
    T: Transport,
{
    let videos = client
        .list_videos_with_statistics(&playlist.id, &playlist.title)
        .await;

    let mut inserted = 0u64;
    let mut updated = 0u64;
    for video in &videos {
        // A failed existence check means the store is unreachable: always fatal.
        if !store.video_exists(&video.video_id).await? {
            match store.insert_video(video).await {
                Ok(()) => {
                    log::debug!("Inserted video {} ({})", video.video_id, video.title);
                    inserted += 1;
                }
                Err(e) if mode == SyncMode::Initial => {
                    log::error!("Failed to insert video {}: {e}", video.video_id);
                    report.failed_inserts += 1;
                }
                Err(e) => return Err(e),
            }
            continue;
        }

        match mode {
            SyncMode::Initial => report.already_present += 1,
            SyncMode::Check => {
                let stats = VideoStatistics {
                    view_count: video.view_count,
                    like_count: video.like_count,
                };
                if store.update_video_stats(&video.video_id, stats).await? {
                    updated += 1;
                } else {
                    log::warn!(
                        "Video {} vanished between existence check and update",
                        video.video_id
                    );
                    report.missing_on_update += 1;
                }
            }
        }
    }

    log::info!(
        "Playlist {}: {} videos fetched, {inserted} inserted, {updated} updated",
        playlist.title,
        videos.len()
    );
    Ok((inserted, updated))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;
    use crate::storage::{repository, Database, SqliteVideoStore};
    use crate::sync::{NoopProgress, Throttle};
    use crate::youtube::testing::{api_config, FakeYouTube};
    use crate::youtube::VideoRecord;

    struct Fixture {
        fake: Arc<FakeYouTube>,
        client: YouTubeClient<Arc<FakeYouTube>>,
        store: SqliteVideoStore,
    }

    async fn fixture(skip: &[&str]) -> Fixture {
        let fake = Arc::new(FakeYouTube::with_page_size(2));
        let client = YouTubeClient::new(fake.clone(), &api_config(skip), Throttle::none());
        let store = SqliteVideoStore::new(Database::open_memory().await.unwrap());
        Fixture {
            fake,
            client,
            store,
        }
    }

    async fn stored(db: &Database) -> Vec<VideoRecord> {
        let tables = db.tables_handle();
        db.reader()
            .call(move |conn| repository::list_videos(conn, &tables))
            .await
            .unwrap()
    }

    fn seed_channel(fake: &FakeYouTube) {
        fake.add_playlist("PL1", "Season 1");
        fake.add_video("PL1", "a1", "Pilot", 100, 10);
        fake.add_video("PL1", "a2", "Second", 80, 8);
        fake.add_video("PL1", "a3", "Third", 60, 6);
        fake.add_playlist("PL2", "Season 2");
        fake.add_video("PL2", "b1", "Return", 50, 5);
    }

    #[tokio::test]
    async fn test_check_twice_is_idempotent() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);

        let first = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(first.new_videos, 4);
        assert_eq!(first.updated_videos, 0);

        let second = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(second.new_videos, 0);
        assert_eq!(second.updated_videos, 4);
        assert_eq!(stored(fx.store.db()).await.len(), 4);
    }

    #[tokio::test]
    async fn test_check_inserts_new_and_refreshes_existing() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();

        fx.fake.set_stats("a1", 1_000, 99);
        fx.fake.add_video("PL2", "b2", "Finale", 7, 1);

        let report = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(report.new_videos, 1);
        assert_eq!(report.updated_videos, 4);

        let rows = stored(fx.store.db()).await;
        assert_eq!(rows.len(), 5);
        let a1 = rows.iter().find(|v| v.video_id == "a1").unwrap();
        assert_eq!((a1.view_count, a1.like_count), (1_000, 99));
        assert_eq!(a1.title, "Pilot");
        let b2 = rows.iter().find(|v| v.video_id == "b2").unwrap();
        assert_eq!(b2.playlist_id, "PL2");
        assert_eq!(b2.playlist_title, "Season 2");
        assert_eq!((b2.view_count, b2.like_count), (7, 1));
    }

    #[tokio::test]
    async fn test_excluded_playlist_never_stored() {
        let fx = fixture(&["PLskip"]).await;
        seed_channel(&fx.fake);
        fx.fake.add_playlist("PLskip", "Shorts");
        fx.fake.add_video("PLskip", "s1", "Short", 9_999, 999);

        initial_load(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        for _ in 0..2 {
            check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
                .await
                .unwrap();
        }

        let rows = stored(fx.store.db()).await;
        assert!(rows.iter().all(|v| v.playlist_id != "PLskip"));
        assert!(fx
            .fake
            .requests_for("playlistItems")
            .iter()
            .all(|r| r.params["playlistId"] != "PLskip"));
    }

    #[tokio::test]
    async fn test_new_playlist_counter() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);

        let first = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(first.new_playlists, 2);

        fx.fake.add_playlist("PL3", "Specials");
        fx.fake.add_video("PL3", "c1", "Holiday", 3, 0);
        let second = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(second.new_playlists, 1);
        assert_eq!(second.new_videos, 1);
        assert_eq!(second.playlists_processed, 3);
    }

    #[tokio::test]
    async fn test_initial_load_skips_stored_videos() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);

        let first = initial_load(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(first.new_videos, 4);
        assert_eq!(first.new_playlists, 0);

        fx.fake.set_stats("a1", 5_000, 500);
        let second = initial_load(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(second.new_videos, 0);
        assert_eq!(second.already_present, 4);
        assert_eq!(second.updated_videos, 0);

        let rows = stored(fx.store.db()).await;
        let a1 = rows.iter().find(|v| v.video_id == "a1").unwrap();
        assert_eq!(a1.view_count, 100);
    }

    #[tokio::test]
    async fn test_video_in_two_playlists_keeps_first_association() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        fx.fake.add_video("PL2", "a1", "Pilot", 100, 10);

        let report = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(report.new_videos, 4);
        assert_eq!(report.updated_videos, 1);

        let rows = stored(fx.store.db()).await;
        let a1 = rows.iter().find(|v| v.video_id == "a1").unwrap();
        assert_eq!(a1.playlist_id, "PL1");
    }

    #[tokio::test]
    async fn test_provider_failure_shortens_pass() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        fx.fake.fail_when(|r| r.resource == "videos");

        let report = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(report.playlists_processed, 2);
        assert_eq!(report.new_videos, 0);

        fx.fake.clear_failures();
        let report = check_for_new_videos(&fx.store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(report.new_videos, 4);
    }

    /// Wraps the real store; fails inserts of one video id and can pretend
    /// every video already exists.
    struct FaultyStore {
        inner: SqliteVideoStore,
        fail_insert_of: Option<&'static str>,
        pretend_exists: bool,
    }

    #[async_trait]
    impl VideoStore for FaultyStore {
        async fn video_exists(&self, video_id: &str) -> Result<bool> {
            if self.pretend_exists {
                return Ok(true);
            }
            self.inner.video_exists(video_id).await
        }

        async fn playlist_exists(&self, playlist_id: &str) -> Result<bool> {
            self.inner.playlist_exists(playlist_id).await
        }

        async fn insert_video(&self, video: &VideoRecord) -> Result<()> {
            if self.fail_insert_of == Some(video.video_id.as_str()) {
                return Err(Error::Database("disk I/O error".into()));
            }
            self.inner.insert_video(video).await
        }

        async fn update_video_stats(&self, video_id: &str, stats: VideoStatistics) -> Result<bool> {
            self.inner.update_video_stats(video_id, stats).await
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_playlists() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        fx.fake.add_playlist("PL3", "Season 3");
        fx.fake.add_video("PL3", "c1", "Boom", 1, 0);
        fx.fake.add_playlist("PL4", "Season 4");
        fx.fake.add_video("PL4", "d1", "Never", 1, 0);

        let store = FaultyStore {
            inner: fx.store.clone(),
            fail_insert_of: Some("c1"),
            pretend_exists: false,
        };
        let err = check_for_new_videos(&store, &fx.client, &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        let ids: Vec<String> = stored(fx.store.db())
            .await
            .into_iter()
            .map(|v| v.video_id)
            .collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&"b1".to_string()));
        assert!(!ids.contains(&"d1".to_string()));
        // PL4 was never visited.
        assert!(fx
            .fake
            .requests_for("playlistItems")
            .iter()
            .all(|r| r.params["playlistId"] != "PL4"));
    }

    #[tokio::test]
    async fn test_initial_load_skips_failed_insert() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        let store = FaultyStore {
            inner: fx.store.clone(),
            fail_insert_of: Some("a1"),
            pretend_exists: false,
        };

        let report = initial_load(&store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(report.failed_inserts, 1);
        assert_eq!(report.new_videos, 3);
        assert_eq!(report.playlists_processed, 2);

        let ids: Vec<String> = stored(fx.store.db())
            .await
            .into_iter()
            .map(|v| v.video_id)
            .collect();
        assert!(!ids.contains(&"a1".to_string()));
        assert!(ids.contains(&"a2".to_string()));
        assert!(ids.contains(&"b1".to_string()));
    }

    #[tokio::test]
    async fn test_update_without_row_is_counted() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        let store = FaultyStore {
            inner: fx.store.clone(),
            fail_insert_of: None,
            pretend_exists: true,
        };

        let report = check_for_new_videos(&store, &fx.client, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(report.updated_videos, 0);
        assert_eq!(report.missing_on_update, 4);
        assert!(stored(fx.store.db()).await.is_empty());
    }

    #[derive(Default)]
    struct RecordingProgress {
        started: AtomicUsize,
        completed: Mutex<Vec<(String, u64, u64)>>,
    }

    impl SyncProgress for RecordingProgress {
        fn on_playlist_start(&self, _playlist: &PlaylistSummary, _index: usize, _total: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_playlist_complete(&self, playlist: &PlaylistSummary, inserted: u64, updated: u64) {
            self.completed
                .lock()
                .unwrap()
                .push((playlist.id.clone(), inserted, updated));
        }
    }

    #[tokio::test]
    async fn test_progress_callbacks() {
        let fx = fixture(&[]).await;
        seed_channel(&fx.fake);
        let progress = RecordingProgress::default();

        check_for_new_videos(&fx.store, &fx.client, &progress)
            .await
            .unwrap();

        assert_eq!(progress.started.load(Ordering::SeqCst), 2);
        let completed = progress.completed.lock().unwrap();
        assert_eq!(
            *completed,
            vec![("PL1".to_string(), 3, 0), ("PL2".to_string(), 1, 0)]
        );
    }
}

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::storage::{repository, Database};
use crate::youtube::{VideoRecord, VideoStatistics};

/// What the synchronizer needs from the warehouse. Every call is its own
/// auto-committed statement; nothing spans calls.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn video_exists(&self, video_id: &str) -> Result<bool>;

    /// True once any stored video carries `playlist_id`.
    async fn playlist_exists(&self, playlist_id: &str) -> Result<bool>;

    /// Fails with [`Error::DuplicateKey`] if the video id is already stored.
    async fn insert_video(&self, video: &VideoRecord) -> Result<()>;

    /// Returns `Ok(false)` when no stored row matched. Callers are expected to
    /// have checked [`VideoStore::video_exists`] first.
    async fn update_video_stats(&self, video_id: &str, stats: VideoStatistics) -> Result<bool>;
}

/// [`VideoStore`] over the SQLite warehouse. All calls go through the writer
/// connection so an existence check always sees the preceding insert.
#[derive(Clone)]
pub struct SqliteVideoStore {
    db: Database,
}

impl SqliteVideoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    async fn video_exists(&self, video_id: &str) -> Result<bool> {
        let tables = self.db.tables_handle();
        let video_id = video_id.to_string();
        Ok(self
            .db
            .writer()
            .call(move |conn| repository::video_exists(conn, &tables, &video_id))
            .await?)
    }

    async fn playlist_exists(&self, playlist_id: &str) -> Result<bool> {
        let tables = self.db.tables_handle();
        let playlist_id = playlist_id.to_string();
        Ok(self
            .db
            .writer()
            .call(move |conn| repository::playlist_exists(conn, &tables, &playlist_id))
            .await?)
    }

    async fn insert_video(&self, video: &VideoRecord) -> Result<()> {
        let tables = self.db.tables_handle();
        let record = video.clone();
        let inserted = self
            .db
            .writer()
            .call(move |conn| match repository::insert_video(conn, &tables, &record) {
                Ok(()) => Ok(true),
                Err(e) if repository::is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e),
            })
            .await?;
        if inserted {
            Ok(())
        } else {
            Err(Error::DuplicateKey(video.video_id.clone()))
        }
    }

    async fn update_video_stats(&self, video_id: &str, stats: VideoStatistics) -> Result<bool> {
        let tables = self.db.tables_handle();
        let video_id = video_id.to_string();
        Ok(self
            .db
            .writer()
            .call(move |conn| {
                repository::update_video_stats(
                    conn,
                    &tables,
                    &video_id,
                    stats.view_count,
                    stats.like_count,
                )
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn record(id: &str) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: "Title".to_string(),
            playlist_id: "PL1".to_string(),
            playlist_title: "Playlist".to_string(),
            view_count: 7,
            like_count: 1,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_key_is_typed() {
        let store = SqliteVideoStore::new(Database::open_memory().await.unwrap());
        store.insert_video(&record("v1")).await.unwrap();

        let err = store.insert_video(&record("v1")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(ref id) if id == "v1"));
    }

    #[tokio::test]
    async fn test_update_reports_missing_row() {
        let store = SqliteVideoStore::new(Database::open_memory().await.unwrap());
        let stats = VideoStatistics {
            view_count: 10,
            like_count: 2,
        };
        assert!(!store.update_video_stats("nope", stats).await.unwrap());

        store.insert_video(&record("v1")).await.unwrap();
        assert!(store.update_video_stats("v1", stats).await.unwrap());
        assert!(store.video_exists("v1").await.unwrap());
        assert!(store.playlist_exists("PL1").await.unwrap());
    }

    #[tokio::test]
    async fn test_quoted_table_name_with_schema() {
        let config = StoreConfig {
            schema: "zero_stats".into(),
            table: "03_bronze_yt_movies".into(),
            ..StoreConfig::default()
        };
        let store = SqliteVideoStore::new(Database::open_memory_with(&config).await.unwrap());

        store.insert_video(&record("v1")).await.unwrap();
        assert!(store.video_exists("v1").await.unwrap());
        assert!(matches!(
            store.insert_video(&record("v1")).await,
            Err(Error::DuplicateKey(_))
        ));
    }
}

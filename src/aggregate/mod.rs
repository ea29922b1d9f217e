//! Derived playlist summaries. Everything here is a pure function of the raw
//! video table: the stored summaries are rebuilt wholesale on refresh, and
//! the live variants run the same grouping at read time.

pub mod types;

pub use types::*;

use rusqlite::Row;

use crate::error::Result;
use crate::storage::{repository, Database};
use crate::url::{playlist_url, video_url};
use crate::youtube::VideoRecord;

/// Number of videos listed under each playlist's "top" section.
pub const TOP_VIDEOS: usize = 5;

/// Per-playlist grouping over the raw table, in `PlaylistTotals` column order.
const TOTALS_SELECT: &str = "SELECT playlist_id, MAX(playlist_title), COUNT(*),
        SUM(view_count), SUM(like_count), AVG(view_count), AVG(like_count)";

/// Per-playlist-per-month grouping, in `PlaylistMonth` column order. Rows
/// without a publication timestamp have no month and are left out.
const MONTHLY_SELECT: &str = "SELECT playlist_id, MAX(playlist_title), substr(published_at, 1, 7),
        COUNT(*), SUM(view_count), SUM(like_count)";

/// Rebuild both summary tables from the raw video table in one transaction.
pub async fn refresh_summaries(db: &Database) -> Result<RefreshReport> {
    let tables = db.tables_handle();
    let report = db
        .writer()
        .call(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(&format!("DELETE FROM {}", tables.summary()), [])?;
            let playlists = tx.execute(
                &format!(
                    "INSERT INTO {} (
                        playlist_id, playlist_title, total_videos, total_views,
                        total_likes, avg_views, avg_likes, refreshed_at
                    )
                    {TOTALS_SELECT}, datetime('now')
                    FROM {} GROUP BY playlist_id",
                    tables.summary(),
                    tables.videos()
                ),
                [],
            )?;

            tx.execute(&format!("DELETE FROM {}", tables.monthly()), [])?;
            let months = tx.execute(
                &format!(
                    "INSERT INTO {} (
                        playlist_id, playlist_title, year_month, total_videos,
                        total_views, total_likes, refreshed_at
                    )
                    {MONTHLY_SELECT}, datetime('now')
                    FROM {} WHERE published_at IS NOT NULL
                    GROUP BY playlist_id, substr(published_at, 1, 7)",
                    tables.monthly(),
                    tables.videos()
                ),
                [],
            )?;

            tx.commit()?;
            Ok::<RefreshReport, rusqlite::Error>(RefreshReport {
                playlists: playlists as u64,
                months: months as u64,
            })
        })
        .await?;

    log::info!(
        "Refreshed summaries: {} playlists, {} playlist-months",
        report.playlists,
        report.months
    );
    Ok(report)
}

/// Playlists ranked by total views, highest first.
pub async fn top_playlists(db: &Database, source: Source) -> Result<Vec<PlaylistTotals>> {
    let tables = db.tables_handle();
    let sql = match source {
        Source::Stored => format!(
            "SELECT playlist_id, playlist_title, total_videos, total_views,
                    total_likes, avg_views, avg_likes
             FROM {} ORDER BY total_views DESC, playlist_title",
            tables.summary()
        ),
        Source::Live => format!(
            "{TOTALS_SELECT} FROM {} GROUP BY playlist_id ORDER BY 4 DESC, 2",
            tables.videos()
        ),
    };

    Ok(db
        .reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], totals_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        })
        .await?)
}

/// Monthly totals per playlist, ordered by playlist title then month.
pub async fn playlists_monthly(db: &Database, source: Source) -> Result<Vec<PlaylistMonth>> {
    let tables = db.tables_handle();
    let sql = match source {
        Source::Stored => format!(
            "SELECT playlist_id, playlist_title, year_month, total_videos,
                    total_views, total_likes
             FROM {} ORDER BY playlist_title, year_month",
            tables.monthly()
        ),
        Source::Live => format!(
            "{MONTHLY_SELECT} FROM {} WHERE published_at IS NOT NULL
             GROUP BY playlist_id, substr(published_at, 1, 7) ORDER BY 2, 3",
            tables.videos()
        ),
    };

    Ok(db
        .reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], month_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        })
        .await?)
}

/// Every stored playlist with its videos (oldest first) and its most viewed
/// videos. Playlists are ordered by title; a playlist whose rows carry more
/// than one title (renamed between syncs) is listed once under the greatest.
pub async fn playlists_overview(db: &Database) -> Result<Vec<PlaylistReport>> {
    let tables = db.tables_handle();
    // Arrives grouped by playlist id, most viewed first within each group.
    let videos = db
        .reader()
        .call(move |conn| repository::list_videos(conn, &tables))
        .await?;

    let mut reports: Vec<PlaylistReport> = Vec::new();
    for video in videos {
        let starts_group = reports
            .last()
            .map_or(true, |r| r.playlist_id != video.playlist_id);
        if starts_group {
            reports.push(PlaylistReport {
                url: playlist_url(&video.playlist_id),
                playlist_id: video.playlist_id.clone(),
                title: video.playlist_title.clone(),
                videos: Vec::new(),
                top_videos: Vec::new(),
            });
        }
        if let Some(report) = reports.last_mut() {
            if video.playlist_title > report.title {
                report.title = video.playlist_title.clone();
            }
            report.videos.push(VideoRow::from(video));
        }
    }

    for report in &mut reports {
        report.top_videos = report.videos.iter().take(TOP_VIDEOS).cloned().collect();
        // Stable: equal timestamps keep the view ordering.
        report.videos.sort_by(|a, b| a.published_at.cmp(&b.published_at));
    }
    reports.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.playlist_id.cmp(&b.playlist_id)));
    Ok(reports)
}

/// Stored videos of one playlist, newest first.
pub async fn playlist_videos(db: &Database, playlist_id: &str) -> Result<Vec<VideoRow>> {
    let tables = db.tables_handle();
    let playlist_id = playlist_id.to_string();
    let videos = db
        .reader()
        .call(move |conn| repository::videos_by_playlist(conn, &tables, &playlist_id))
        .await?;
    Ok(videos.into_iter().map(VideoRow::from).collect())
}

impl From<VideoRecord> for VideoRow {
    fn from(v: VideoRecord) -> Self {
        Self {
            url: video_url(&v.video_id),
            video_id: v.video_id,
            title: v.title,
            view_count: v.view_count,
            like_count: v.like_count,
            published_at: v.published_at,
        }
    }
}

fn totals_from_row(row: &Row<'_>) -> std::result::Result<PlaylistTotals, rusqlite::Error> {
    let playlist_id: String = row.get(0)?;
    Ok(PlaylistTotals {
        url: playlist_url(&playlist_id),
        playlist_id,
        playlist_title: row.get(1)?,
        total_videos: row.get::<_, i64>(2)? as u64,
        total_views: row.get::<_, i64>(3)? as u64,
        total_likes: row.get::<_, i64>(4)? as u64,
        avg_views: row.get(5)?,
        avg_likes: row.get(6)?,
    })
}

fn month_from_row(row: &Row<'_>) -> std::result::Result<PlaylistMonth, rusqlite::Error> {
    Ok(PlaylistMonth {
        playlist_id: row.get(0)?,
        playlist_title: row.get(1)?,
        year_month: row.get(2)?,
        total_videos: row.get::<_, i64>(3)? as u64,
        total_views: row.get::<_, i64>(4)? as u64,
        total_likes: row.get::<_, i64>(5)? as u64,
    })
}

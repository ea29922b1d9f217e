use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::storage::schema::Tables;
use crate::youtube::VideoRecord;

// ── Videos ─────────────────────────────────────────────────────────

pub fn video_exists(
    conn: &Connection,
    tables: &Tables,
    video_id: &str,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE video_id = ?1)", tables.videos()),
        params![video_id],
        |row| row.get(0),
    )
}

/// A playlist "exists" once any stored video carries its id.
pub fn playlist_exists(
    conn: &Connection,
    tables: &Tables,
    playlist_id: &str,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE playlist_id = ?1)",
            tables.videos()
        ),
        params![playlist_id],
        |row| row.get(0),
    )
}

/// Plain INSERT; a second insert of the same video id fails with a
/// primary-key constraint violation (see [`is_unique_violation`]).
pub fn insert_video(
    conn: &Connection,
    tables: &Tables,
    video: &VideoRecord,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "INSERT INTO {} (
                video_id, title, playlist_id, playlist_title,
                view_count, like_count, published_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            tables.videos()
        ),
        params![
            video.video_id,
            video.title,
            video.playlist_id,
            video.playlist_title,
            sql_count(video.view_count)?,
            sql_count(video.like_count)?,
            video.published_at,
        ],
    )?;
    Ok(())
}

/// Overwrite the counters of one stored video. Returns false when no row
/// carries `video_id`; callers check existence first.
pub fn update_video_stats(
    conn: &Connection,
    tables: &Tables,
    video_id: &str,
    view_count: u64,
    like_count: u64,
) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET view_count = ?2, like_count = ?3 WHERE video_id = ?1",
            tables.videos()
        ),
        params![video_id, sql_count(view_count)?, sql_count(like_count)?],
    )?;
    Ok(changed > 0)
}

pub fn count_videos(conn: &Connection, tables: &Tables) -> Result<u64, rusqlite::Error> {
    let n: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", tables.videos()),
        [],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

/// Distinct playlist ids carried by stored videos, sorted.
pub fn existing_playlist_ids(
    conn: &Connection,
    tables: &Tables,
) -> Result<BTreeSet<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT playlist_id FROM {}",
        tables.videos()
    ))?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Every stored video, grouped by playlist id, most viewed first.
pub fn list_videos(conn: &Connection, tables: &Tables) -> Result<Vec<VideoRecord>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VIDEO_COLUMNS} FROM {}
         ORDER BY playlist_id, view_count DESC, video_id",
        tables.videos()
    ))?;
    let rows = stmt.query_map([], video_from_row)?;
    rows.collect()
}

/// Videos of one playlist, newest first. Undated videos sort last.
pub fn videos_by_playlist(
    conn: &Connection,
    tables: &Tables,
    playlist_id: &str,
) -> Result<Vec<VideoRecord>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VIDEO_COLUMNS} FROM {} WHERE playlist_id = ?1
         ORDER BY published_at DESC, video_id",
        tables.videos()
    ))?;
    let rows = stmt.query_map(params![playlist_id], video_from_row)?;
    rows.collect()
}

/// SQLite integers are signed; counts past `i64::MAX` are refused, not wrapped.
fn sql_count(n: u64) -> Result<i64, rusqlite::Error> {
    i64::try_from(n).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

const VIDEO_COLUMNS: &str =
    "video_id, title, playlist_id, playlist_title, view_count, like_count, published_at";

fn video_from_row(row: &Row<'_>) -> Result<VideoRecord, rusqlite::Error> {
    Ok(VideoRecord {
        video_id: row.get(0)?,
        title: row.get(1)?,
        playlist_id: row.get(2)?,
        playlist_title: row.get(3)?,
        view_count: row.get::<_, i64>(4)? as u64,
        like_count: row.get::<_, i64>(5)? as u64,
        published_at: row.get(6)?,
    })
}

// ── Sync Runs ──────────────────────────────────────────────────────

/// One recorded sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub id: i64,
    pub mode: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub playlists: u64,
    pub new_playlists: u64,
    pub new_videos: u64,
    pub updated_videos: u64,
    pub error_message: Option<String>,
}

/// Counters written when a pass finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncRunCounts {
    pub playlists: u64,
    pub new_playlists: u64,
    pub new_videos: u64,
    pub updated_videos: u64,
}

pub fn insert_sync_run(conn: &Connection, mode: &str) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO sync_runs (mode, status, started_at) VALUES (?1, 'running', datetime('now'))",
        params![mode],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_sync_run(
    conn: &Connection,
    run_id: i64,
    status: &str,
    counts: SyncRunCounts,
    error_message: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE sync_runs SET
            status = ?2, completed_at = datetime('now'),
            playlists = ?3, new_playlists = ?4,
            new_videos = ?5, updated_videos = ?6,
            error_message = ?7
         WHERE id = ?1",
        params![
            run_id,
            status,
            counts.playlists as i64,
            counts.new_playlists as i64,
            counts.new_videos as i64,
            counts.updated_videos as i64,
            error_message,
        ],
    )?;
    Ok(())
}

/// Most recent run with the given status, if any.
pub fn last_sync_run(conn: &Connection, status: &str) -> Result<Option<SyncRun>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, mode, status, started_at, completed_at, playlists,
                new_playlists, new_videos, updated_videos, error_message
         FROM sync_runs WHERE status = ?1
         ORDER BY id DESC LIMIT 1",
        params![status],
        |row| {
            Ok(SyncRun {
                id: row.get(0)?,
                mode: row.get(1)?,
                status: row.get(2)?,
                started_at: row.get(3)?,
                completed_at: row.get(4)?,
                playlists: row.get::<_, i64>(5)? as u64,
                new_playlists: row.get::<_, i64>(6)? as u64,
                new_videos: row.get::<_, i64>(7)? as u64,
                updated_videos: row.get::<_, i64>(8)? as u64,
                error_message: row.get(9)?,
            })
        },
    )
    .optional()
}

// ── Helpers ────────────────────────────────────────────────────────

/// Whether `err` is a primary-key or unique constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        ),
        _ => false,
    }
}

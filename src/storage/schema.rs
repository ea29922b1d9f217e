use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Quote an SQL identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Fully qualified, quoted names of the configurable tables.
///
/// Table names come from configuration and may start with a digit or contain
/// characters that need quoting (`03_bronze_yt_movies`), so they are never
/// interpolated unquoted.
#[derive(Debug, Clone)]
pub struct Tables {
    schema: String,
    table: String,
    videos: String,
    summary: String,
    monthly: String,
}

impl Tables {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        for name in [
            &config.schema,
            &config.table,
            &config.summary_table,
            &config.monthly_table,
        ] {
            validate_name(name)?;
        }
        if config.schema.contains(&['/', '\\'][..]) {
            return Err(Error::InvalidIdentifier(config.schema.clone()));
        }
        let qualify = |table: &str| format!("{}.{}", quote_ident(&config.schema), quote_ident(table));
        Ok(Self {
            schema: config.schema.clone(),
            table: config.table.clone(),
            videos: qualify(&config.table),
            summary: qualify(&config.summary_table),
            monthly: qualify(&config.monthly_table),
        })
    }

    /// Schema (SQLite database name) holding the tables.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Whether the schema needs a database attached next to `main`.
    pub fn is_attached(&self) -> bool {
        !self.schema.eq_ignore_ascii_case("main")
    }

    pub fn videos(&self) -> &str {
        &self.videos
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn monthly(&self) -> &str {
        &self.monthly
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Create the video table and both summary tables if they are missing.
pub fn ensure_tables(conn: &Connection, tables: &Tables) -> std::result::Result<(), rusqlite::Error> {
    // Index names are qualified by schema; the indexed table must not be.
    let index = format!(
        "{}.{}",
        quote_ident(&tables.schema),
        quote_ident(&format!("{}_playlist_idx", tables.table))
    );
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {videos} (
            video_id       TEXT PRIMARY KEY NOT NULL,
            title          TEXT NOT NULL,
            playlist_id    TEXT NOT NULL,
            playlist_title TEXT NOT NULL,
            view_count     INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
            like_count     INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            published_at   TEXT
        );
        CREATE INDEX IF NOT EXISTS {index} ON {table} (playlist_id);

        CREATE TABLE IF NOT EXISTS {summary} (
            playlist_id    TEXT PRIMARY KEY NOT NULL,
            playlist_title TEXT NOT NULL,
            total_videos   INTEGER NOT NULL,
            total_views    INTEGER NOT NULL,
            total_likes    INTEGER NOT NULL,
            avg_views      REAL NOT NULL,
            avg_likes      REAL NOT NULL,
            refreshed_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {monthly} (
            playlist_id    TEXT NOT NULL,
            playlist_title TEXT NOT NULL,
            year_month     TEXT NOT NULL,
            total_videos   INTEGER NOT NULL,
            total_views    INTEGER NOT NULL,
            total_likes    INTEGER NOT NULL,
            refreshed_at   TEXT NOT NULL,
            PRIMARY KEY (playlist_id, year_month)
        );",
        videos = tables.videos(),
        table = quote_ident(&tables.table),
        summary = tables.summary(),
        monthly = tables.monthly(),
    ))
}

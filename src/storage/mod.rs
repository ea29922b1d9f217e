pub mod repository;
pub mod schema;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite_migration::{Migrations, M};

use crate::config::StoreConfig;
use crate::error::{Error, Result};

pub use schema::Tables;
pub use store::{SqliteVideoStore, VideoStore};

/// Database wraps two `tokio_rusqlite::Connection` instances (writer + reader)
/// using WAL mode so reports can read while a sync pass writes. The writer
/// serializes writes via `tokio_rusqlite`'s internal channel.
///
/// The video and summary tables live in the configured schema. `main` is the
/// database file itself; any other schema is a sibling file attached under
/// that name on both connections.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
    tables: Arc<Tables>,
}

impl Database {
    /// Open the database configured by `config` (default `~/.tubestats/tubestats.db`).
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        Self::open_at(config.database_path()?, config).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = Tables::new(config)?;

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let reader = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_reader(&reader).await?;

        if tables.is_attached() {
            let file = attached_path(&path, tables.schema());
            log::debug!("Attaching schema {} from {}", tables.schema(), file.display());
            let file = file.to_string_lossy().into_owned();
            attach_schema(&writer, &file, tables.schema()).await?;
            attach_schema(&reader, &file, tables.schema()).await?;
        }

        let db = Self {
            writer,
            reader,
            tables: Arc::new(tables),
        };
        db.ensure_tables().await?;
        Ok(db)
    }

    /// Open an in-memory database with default table names (for testing).
    pub async fn open_memory() -> Result<Self> {
        Self::open_memory_with(&StoreConfig::default()).await
    }

    /// Open an in-memory database with the given table names.
    pub async fn open_memory_with(config: &StoreConfig) -> Result<Self> {
        let tables = Tables::new(config)?;
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;
        if tables.is_attached() {
            attach_schema(&writer, ":memory:", tables.schema()).await?;
        }

        // In-memory databases are per-connection, so reader and writer share one.
        let db = Self {
            reader: writer.clone(),
            writer,
            tables: Arc::new(tables),
        };
        db.ensure_tables().await?;
        Ok(db)
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;

        conn.call(|conn| {
            let migrations = Migrations::new(vec![M::up(include_str!(
                "migrations/001_initial.sql"
            ))]);
            migrations.to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Migration(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    /// Get a reference to the writer connection.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Get a reference to the reader connection.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }

    /// Quoted names of the configured tables.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Shared handle to the table names, for moving into connection closures.
    pub(crate) fn tables_handle(&self) -> Arc<Tables> {
        Arc::clone(&self.tables)
    }

    async fn ensure_tables(&self) -> Result<()> {
        let tables = self.tables_handle();
        self.writer
            .call(move |conn| schema::ensure_tables(conn, &tables))
            .await?;
        Ok(())
    }
}

/// `<dir>/<stem>.<schema>.db` next to the main database file.
fn attached_path(main: &Path, db_name: &str) -> PathBuf {
    let stem = main
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tubestats");
    main.with_file_name(format!("{stem}.{db_name}.db"))
}

async fn attach_schema(conn: &tokio_rusqlite::Connection, file: &str, db_name: &str) -> Result<()> {
    let file = file.to_string();
    let name = schema::quote_ident(db_name);
    conn.call(move |conn| {
        conn.execute(&format!("ATTACH DATABASE ?1 AS {name}"), [&file])?;
        conn.execute_batch(&format!("PRAGMA {name}.journal_mode=WAL;"))?;
        Ok::<(), rusqlite::Error>(())
    })
    .await?;
    Ok(())
}

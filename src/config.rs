//! Process configuration, read once from the environment at startup and
//! passed by reference into each component.

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sync::Throttle;
use crate::url::resolve_playlist_id;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Provider ceiling for both `maxResults` and ids per `videos` request.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Settings for talking to the YouTube Data API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub channel_id: String,
    pub base_url: String,
    pub max_results: u32,
    pub skip_playlist_ids: HashSet<String>,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = required(&lookup, "YOUTUBE_API_KEY")?;
        let channel_id = required(&lookup, "CHANNEL_ID")?;
        let base_url = optional(&lookup, "YOUTUBE_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        ::url::Url::parse(&base_url).map_err(|e| Error::Config(format!("YOUTUBE_API_BASE_URL: {e}")))?;

        let max_results: u32 = parse_var(&lookup, "MAX_RESULTS_PER_REQUEST", MAX_PAGE_SIZE)?;
        let max_results = max_results.clamp(1, MAX_PAGE_SIZE);

        let mut skip_playlist_ids = HashSet::new();
        for entry in parse_csv(optional(&lookup, "SKIP_PLAYLIST_IDS").as_deref().unwrap_or("")) {
            match resolve_playlist_id(&entry) {
                Ok(id) => {
                    skip_playlist_ids.insert(id);
                }
                Err(e) => log::warn!("Ignoring SKIP_PLAYLIST_IDS entry {entry:?}: {e}"),
            }
        }

        let timeout_secs: u64 = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            api_key,
            channel_id,
            base_url,
            max_results,
            skip_playlist_ids,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Where the warehouse lives and what its tables are called.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file; `None` means `~/.tubestats/tubestats.db`.
    pub path: Option<PathBuf>,
    pub schema: String,
    pub table: String,
    pub summary_table: String,
    pub monthly_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            schema: "main".to_string(),
            table: "yt_movies".to_string(),
            summary_table: "agg_playlists_summary".to_string(),
            monthly_table: "agg_playlists_monthly".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            path: optional(&lookup, "TUBESTATS_DB").map(PathBuf::from),
            schema: optional(&lookup, "DB_SCHEMA").unwrap_or(defaults.schema),
            table: optional(&lookup, "DB_TABLE").unwrap_or(defaults.table),
            summary_table: optional(&lookup, "SUMMARY_TABLE").unwrap_or(defaults.summary_table),
            monthly_table: optional(&lookup, "MONTHLY_TABLE").unwrap_or(defaults.monthly_table),
        }
    }

    /// Resolve the database file, creating the default directory if needed.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.path {
            return Ok(path.clone());
        }
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".tubestats");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Ok(dir.join("tubestats.db"))
    }
}

impl Throttle {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Throttle::default();
        Ok(Throttle {
            page: millis(&lookup, "PAGE_DELAY_MS", defaults.page)?,
            batch: millis(&lookup, "BATCH_DELAY_MS", defaults.batch)?,
            playlist: millis(&lookup, "PLAYLIST_DELAY_MS", defaults.playlist)?,
        })
    }
}

/// Bind address of the read-only web interface.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl WebConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: optional(&lookup, "WEB_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "WEB_PORT", 5000)?,
        })
    }
}

/// Everything a sync pass needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub throttle: Throttle,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            api: ApiConfig::from_lookup(&lookup)?,
            store: StoreConfig::from_lookup(&lookup),
            throttle: Throttle::from_lookup(&lookup)?,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional(lookup, name).ok_or_else(|| Error::ConfigMissing(name.to_string()))
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{name}={raw}: {e}"))),
        None => Ok(default),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration> {
    let ms: u64 = parse_var(lookup, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

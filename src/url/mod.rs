use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static RE_PLAYLIST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{2,64}$").unwrap());

/// Parsed information from a YouTube URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YouTubeUrlInfo {
    Playlist {
        playlist_id: String,
    },
    /// A watch URL that carries playlist context (`watch?v=..&list=..`).
    VideoInPlaylist {
        video_id: String,
        playlist_id: String,
    },
}

/// Parse a YouTube URL that refers to a playlist.
///
/// Supported URL patterns:
/// - `https://www.youtube.com/playlist?list=<playlist_id>`
/// - `https://www.youtube.com/watch?v=<video_id>&list=<playlist_id>`
/// - `https://youtu.be/<video_id>?list=<playlist_id>`
/// - `https://music.youtube.com/playlist?list=<playlist_id>`
pub fn parse_youtube_url(input: &str) -> Result<YouTubeUrlInfo> {
    let url = ::url::Url::parse(input).map_err(|e| Error::UrlParse(e.to_string()))?;

    let host = url.host_str().unwrap_or("");
    let is_youtube =
        host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be";
    if !is_youtube {
        return Err(Error::UrlParse(format!("not a YouTube URL: {input}")));
    }

    let mut list = None;
    let mut video = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "list" => list = Some(value.into_owned()),
            "v" => video = Some(value.into_owned()),
            _ => {}
        }
    }

    let playlist_id = list
        .filter(|id| is_playlist_id(id))
        .ok_or_else(|| Error::UrlParse(format!("missing playlist id in URL: {input}")))?;

    if host == "youtu.be" {
        video = url
            .path_segments()
            .and_then(|mut s| s.next())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
    }

    match video {
        Some(video_id) => Ok(YouTubeUrlInfo::VideoInPlaylist {
            video_id,
            playlist_id,
        }),
        None => Ok(YouTubeUrlInfo::Playlist { playlist_id }),
    }
}

/// Generate the public URL of a playlist.
pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={playlist_id}")
}

/// Generate the public URL of a video.
pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Check if a string looks like a playlist id (URL-safe base64 alphabet).
pub fn is_playlist_id(s: &str) -> bool {
    RE_PLAYLIST_ID.is_match(s)
}

/// Extract a playlist id from either a raw id or a YouTube URL.
pub fn resolve_playlist_id(input: &str) -> Result<String> {
    let input = input.trim();
    if is_playlist_id(input) {
        return Ok(input.to_string());
    }
    if input.contains("youtube.com") || input.contains("youtu.be") {
        match parse_youtube_url(input)? {
            YouTubeUrlInfo::Playlist { playlist_id }
            | YouTubeUrlInfo::VideoInPlaylist { playlist_id, .. } => Ok(playlist_id),
        }
    } else {
        Err(Error::InvalidIdentifier(input.to_string()))
    }
}

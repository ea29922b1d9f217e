//! Read-only JSON interface over the warehouse. Every handler is a SELECT;
//! nothing here writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::aggregate::{self, PlaylistMonth, PlaylistReport, PlaylistTotals, Source, VideoRow};
use crate::config::WebConfig;
use crate::error::{Error, Result};
use crate::storage::Database;
use crate::url::{playlist_url, resolve_playlist_id};
use crate::{warehouse_status, WarehouseStatus};

#[derive(Clone)]
struct AppState {
    db: Database,
}

#[derive(Debug, Default, Deserialize)]
struct SourceQuery {
    #[serde(default)]
    live: bool,
}

impl SourceQuery {
    fn source(&self) -> Source {
        if self.live {
            Source::Live
        } else {
            Source::Stored
        }
    }
}

#[derive(Debug, Serialize)]
struct PlaylistVideos {
    playlist_id: String,
    url: String,
    videos: Vec<VideoRow>,
}

/// Error body: `{"error": {"message": .., "status": ..}}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::InvalidIdentifier(_) | Error::UrlParse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {err}");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

pub fn router(db: Database) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/playlists", get(playlists_handler))
        .route("/api/playlists/{playlist_id}", get(playlist_videos_handler))
        .route("/api/top-playlists", get(top_playlists_handler))
        .route("/api/playlists-monthly", get(playlists_monthly_handler))
        .with_state(AppState { db })
}

/// Bind and serve until the process is stopped.
pub async fn serve(db: Database, config: &WebConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Other(format!("cannot bind {addr}: {e}")))?;
    log::info!("Serving read-only reports on http://{addr}");
    axum::serve(listener, router(db))
        .await
        .map_err(|e| Error::Other(format!("server error: {e}")))
}

async fn status_handler(State(state): State<AppState>) -> ApiResult<WarehouseStatus> {
    Ok(Json(warehouse_status(&state.db).await?))
}

async fn playlists_handler(State(state): State<AppState>) -> ApiResult<Vec<PlaylistReport>> {
    Ok(Json(aggregate::playlists_overview(&state.db).await?))
}

async fn playlist_videos_handler(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<PlaylistVideos> {
    let playlist_id = resolve_playlist_id(&playlist_id)?;
    let videos = aggregate::playlist_videos(&state.db, &playlist_id).await?;
    if videos.is_empty() {
        return Err(ApiError::not_found(format!("no stored videos for playlist {playlist_id}")));
    }
    Ok(Json(PlaylistVideos {
        url: playlist_url(&playlist_id),
        playlist_id,
        videos,
    }))
}

async fn top_playlists_handler(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> ApiResult<Vec<PlaylistTotals>> {
    Ok(Json(aggregate::top_playlists(&state.db, query.source()).await?))
}

async fn playlists_monthly_handler(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> ApiResult<Vec<PlaylistMonth>> {
    Ok(Json(aggregate::playlists_monthly(&state.db, query.source()).await?))
}

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use ragbook_core::error::{Error, Result};
use ragbook_core::types::SearchHit;
use ragbook_rag::ArtistSongs;
use serde::Deserialize;
use serde_json::{Map, Value};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(dad_joke))
        .route("/youtube", get(youtube))
        .route("/dad", get(dad))
        .route("/songs-list/:artist", get(songs_list))
        .route("/songs-map/:artist", get(songs_map))
        .route("/songs-bean/:artist", get(songs_bean))
        .route("/john", get(john))
        .route("/search", get(search))
        .route("/ask", get(ask))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs blocking library work off the async executor.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(Error::Operation(format!("worker task failed: {e}"))))?
        .map_err(ApiError::from)
}

async fn health() -> &'static str {
    "ok"
}

async fn dad_joke(State(state): State<AppState>) -> ApiResult<String> {
    blocking(move || state.lessons.dad_joke()).await
}

#[derive(Debug, Deserialize)]
struct GenreParams {
    genre: Option<String>,
}

async fn youtube(State(state): State<AppState>, Query(params): Query<GenreParams>) -> ApiResult<String> {
    let genre = params.genre.unwrap_or_default();
    blocking(move || state.lessons.youtube(&genre)).await
}

async fn dad(State(state): State<AppState>) -> ApiResult<String> {
    blocking(move || state.lessons.dad_persona()).await
}

async fn songs_list(State(state): State<AppState>, Path(artist): Path<String>) -> ApiResult<Json<Vec<String>>> {
    blocking(move || state.lessons.songs_list(&artist)).await.map(Json)
}

async fn songs_map(State(state): State<AppState>, Path(artist): Path<String>) -> ApiResult<Json<Map<String, Value>>> {
    blocking(move || state.lessons.songs_map(&artist)).await.map(Json)
}

async fn songs_bean(State(state): State<AppState>, Path(artist): Path<String>) -> ApiResult<Json<ArtistSongs>> {
    blocking(move || state.lessons.songs_bean(&artist)).await.map(Json)
}

async fn john(State(state): State<AppState>) -> ApiResult<String> {
    blocking(move || state.lessons.john_context()).await
}

#[derive(Debug, Deserialize)]
struct MessageParams {
    message: Option<String>,
    /// Kept raw so a malformed value is reported as `InvalidArgument`.
    top_k: Option<String>,
}

impl MessageParams {
    fn message_or(&self, default: &str) -> String {
        self.message.clone().unwrap_or_else(|| default.to_string())
    }

    fn top_k_or(&self, default: usize) -> Result<usize> {
        match self.top_k.as_deref().map(str::trim) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("top_k must be a positive integer, got '{raw}'"))),
        }
    }
}

async fn search(State(state): State<AppState>, Query(params): Query<MessageParams>) -> ApiResult<Json<Vec<SearchHit>>> {
    let message = params.message_or(&state.default_query);
    let top_k = params.top_k_or(state.rag.top_k())?;
    blocking(move || state.rag.search(&message, top_k)).await.map(Json)
}

async fn ask(State(state): State<AppState>, Query(params): Query<MessageParams>) -> ApiResult<String> {
    let message = params.message_or(&state.default_query);
    blocking(move || state.rag.ask(&message)).await
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::challenges::{ChallengeError, ChallengeService};
use crate::store::SqliteStore;
use crate::types::{BookDraft, ChallengeDraft};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub challenges: ChallengeService,
}

/// The clock is read only at the HTTP layer; everything below takes years as
/// arguments.
fn current_year() -> i32 {
    chrono::Local::now().year()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

enum ApiError {
    BadRequest(String),
    NotFound(String),
    Compilation(String),
    Storage(anyhow::Error),
}

impl From<ChallengeError> for ApiError {
    fn from(e: ChallengeError) -> Self {
        match e {
            ChallengeError::MissingField(field) => {
                ApiError::BadRequest(format!("missing required field: {}", field))
            }
            ChallengeError::Compilation(msg) => {
                ApiError::Compilation(format!("failed to compile challenge rule: {}", msg))
            }
            ChallengeError::NotFound(id) => {
                ApiError::NotFound(format!("challenge {} not found", id))
            }
            ChallengeError::Storage(inner) => ApiError::Storage(inner),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Compilation(m) => (StatusCode::BAD_GATEWAY, m),
            ApiError::Storage(e) => {
                error!("Storage error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/challenges", get(list_challenges).post(create_challenge))
        .route("/challenges/main", get(main_challenge))
        .route(
            "/challenges/{id}",
            put(update_challenge).delete(delete_challenge),
        )
        .route("/books", get(list_books).post(create_book))
        .route("/books/{id}", put(update_book).delete(delete_book))
        .route("/authors", get(list_authors))
        .route("/genres", get(list_genres))
        .route("/stats/summary", get(stats_summary))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Challenge handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn list_challenges(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let challenges = state.challenges.list_with_progress(current_year()).await?;
    Ok(Json(json!({ "challenges": challenges })))
}

async fn create_challenge(
    State(state): State<AppState>,
    Json(draft): Json<ChallengeDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = state.challenges.create(draft, current_year()).await?;
    Ok((StatusCode::CREATED, Json(json!(created))))
}

async fn update_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<ChallengeDraft>,
) -> Result<Json<Value>, ApiError> {
    let updated = state.challenges.update(id, draft, current_year()).await?;
    Ok(Json(json!(updated)))
}

async fn delete_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    // Idempotent: deleting an unknown id is still a 204.
    state.challenges.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct MainChallengeQuery {
    year: Option<i32>,
}

async fn main_challenge(
    State(state): State<AppState>,
    Query(q): Query<MainChallengeQuery>,
) -> Result<Json<Value>, ApiError> {
    let current = current_year();
    let year = q.year.unwrap_or(current);
    let main = state.challenges.main_challenge(year, current).await?;
    Ok(Json(json!({ "main_challenge": main })))
}

// ---------------------------------------------------------------------------
// Library handlers
// ---------------------------------------------------------------------------

async fn list_books(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let books = state.store.list_books().await?;
    Ok(Json(json!({ "books": books })))
}

async fn create_book(
    State(state): State<AppState>,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "missing required field: title".to_string(),
        ));
    }
    let created = state.store.insert_book(&draft).await?;
    Ok((StatusCode::CREATED, Json(json!(created))))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<BookDraft>,
) -> Result<Json<Value>, ApiError> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "missing required field: title".to_string(),
        ));
    }
    let updated = state
        .store
        .update_book(id, &draft)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {} not found", id)))?;
    Ok(Json(json!(updated)))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_authors(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let authors = state.store.list_authors().await?;
    Ok(Json(json!({ "authors": authors })))
}

async fn list_genres(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let genres = state.store.list_genres().await?;
    Ok(Json(json!({ "genres": genres })))
}

// ---------------------------------------------------------------------------
// Stats handler
// ---------------------------------------------------------------------------

async fn stats_summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let years = state.store.year_counts().await?;
    let current = current_year();
    let main = state.challenges.main_challenge(current, current).await?;
    Ok(Json(json!({ "years": years, "main_challenge": main })))
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

pub async fn start_server(state: AppState, bind_addr: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let ip: std::net::IpAddr = bind_addr
        .parse()
        .unwrap_or_else(|_| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
    let addr = std::net::SocketAddr::new(ip, port);
    info!("API server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

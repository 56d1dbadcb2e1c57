use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::NaasError;
use crate::reasons::{ReasonStore, DEFAULT_LANGUAGE};
use crate::response::PreSerialized;

const JSON_UTF8: &str = "application/json; charset=utf-8";
const TEXT_UTF8: &str = "text/plain; charset=utf-8";

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Read-only data behind the HTTP handlers
pub struct AppState {
    pub reasons: ReasonStore,
    pub cached: PreSerialized,
}

#[derive(Debug, Deserialize)]
pub struct NoQuery {
    pub lang: Option<String>,
}

/// List the other endpoints
pub async fn index(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JSON_UTF8)],
        state.cached.endpoint_index.clone(),
    )
}

/// List the available languages, sorted
pub async fn languages(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JSON_UTF8)],
        state.cached.languages.clone(),
    )
}

/// Return a random rejection reason
pub async fn no(
    State(state): State<SharedState>,
    Query(query): Query<NoQuery>,
) -> impl IntoResponse {
    let lang = query.lang.as_deref().unwrap_or(DEFAULT_LANGUAGE);

    let result: Result<_, NaasError> = state
        .reasons
        .random_reason(lang)
        .map(|reason| ([(header::CONTENT_TYPE, TEXT_UTF8)], reason.to_string()));

    ([(header::CACHE_CONTROL, "no-store")], result)
}

//! Catalog search endpoint

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;

use super::AppState;
use super::auth::LoggedIn;
use super::reply::{ApiError, SearchView, reply};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    search: Option<String>,
    callback: Option<String>,
}

/// `GET /search/?search=<query>`
pub async fn search(
    _user: LoggedIn,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing `search`".to_string()))?;

    let results = state.coordinator.search(query).await?;
    reply(SearchView::from(&results), params.callback.as_deref())
}

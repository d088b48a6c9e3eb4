use axum::{
    Json,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{AnimeListResponse, ApiError, AppState, CurrentUser, RequestKind, parse_page, views};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenreQuery {
    pub genre: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    kind: RequestKind,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = parse_page(query.page.as_deref());

    let list = state
        .catalog()
        .top_page(page, user.as_ref())
        .await
        .map_err(|e| {
            if kind.wants_json() {
                ApiError::service("Failed to fetch anime data", &e)
            } else {
                ApiError::page("Failed to fetch anime data", &e)
            }
        })?;

    if kind.wants_json() {
        return Ok(Json(AnimeListResponse::with_page(list, page)).into_response());
    }

    Ok(Html(views::index_page(&list, page, user.is_some())).into_response())
}

/// GET /genre
///
/// Always JSON. A missing or unusable genre id yields an empty list.
pub async fn genre(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<GenreQuery>,
) -> Result<Json<AnimeListResponse>, ApiError> {
    let Some(genre_id) = query
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .and_then(|g| g.parse::<u32>().ok())
    else {
        return Ok(Json(AnimeListResponse::new(Vec::new())));
    };

    let page = parse_page(query.page.as_deref());

    let list = state
        .catalog()
        .genre_page(genre_id, page, user.as_ref())
        .await
        .map_err(|e| ApiError::service("Failed to fetch anime by genre", &e))?;

    Ok(Json(AnimeListResponse::new(list)))
}

/// GET /search
pub async fn search(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    kind: RequestKind,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let Some(q) = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
    else {
        return Ok(Redirect::to("/").into_response());
    };

    let list = state
        .catalog()
        .search(q, user.as_ref())
        .await
        .map_err(|e| {
            if kind.wants_json() {
                ApiError::service("Failed to search anime", &e)
            } else {
                ApiError::page("Failed to search anime", &e)
            }
        })?;

    if kind.wants_json() {
        return Ok(Json(AnimeListResponse::new(list)).into_response());
    }

    Ok(Html(views::search_page(q, &list, user.is_some())).into_response())
}

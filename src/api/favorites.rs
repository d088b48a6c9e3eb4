use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::{
    AnimeListResponse, ApiError, ApiResponse, AppState, CurrentUser, FavoriteRequest, RequestKind,
    views,
};

/// GET /favorites
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    kind: RequestKind,
) -> Result<Response, ApiError> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login?next=/favorites").into_response());
    };

    let list = state.catalog().favorites(&user).await.map_err(|e| {
        if kind.wants_json() {
            ApiError::service("Server error", &e)
        } else {
            ApiError::page("Server error", &e)
        }
    })?;

    if kind.wants_json() {
        return Ok(Json(AnimeListResponse::new(list)).into_response());
    }

    Ok(Html(views::favorites_page(&list)).into_response())
}

/// POST /favorites/add
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let user = user.ok_or_else(ApiError::not_logged_in)?;
    let body = read_favorite_request(request).await?;

    state
        .catalog()
        .add_favorite(&user, body.anime_id)
        .await
        .map_err(|e| ApiError::service("Database error", &e))?;

    Ok(Json(ApiResponse::ok()))
}

/// POST /favorites/remove
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let user = user.ok_or_else(ApiError::not_logged_in)?;
    let body = read_favorite_request(request).await?;

    state
        .catalog()
        .remove_favorite(&user, body.anime_id)
        .await
        .map_err(|e| ApiError::service("Failed to remove favorite", &e))?;

    Ok(Json(ApiResponse::ok()))
}

/// Accepts the id as JSON or as an urlencoded form, whichever the
/// content type says. The body is only read once the user is known.
async fn read_favorite_request(request: Request) -> Result<FavoriteRequest, ApiError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(body) = Form::<FavoriteRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::validation(format!("Invalid anime id: {e}")))?;
        Ok(body)
    } else {
        let Json(body) = Json::<FavoriteRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::validation(format!("Invalid anime id: {e}")))?;
        Ok(body)
    }
}

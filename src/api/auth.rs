use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tower_sessions::{Expiry, Session};
use tracing::{info, warn};

use super::{ApiError, AppState, views};
use crate::models::User;
use crate::services::{AuthError, Authenticator, LocalCredentials};

// ============================================================================
// Session keys
// ============================================================================

const USER_ID_KEY: &str = "user_id";
const EXPIRES_AT_KEY: &str = "expires_at";
const OAUTH_STATE_KEY: &str = "oauth_state";
const POST_LOGIN_KEY: &str = "post_login";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
    pub favorite: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthPageQuery {
    pub error: Option<String>,
    pub next: Option<String>,
    pub favorite: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Where to go once a login completes, and which favorite to store first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLogin {
    pub next: String,
    pub favorite: Option<i64>,
}

impl Default for PostLogin {
    fn default() -> Self {
        Self {
            next: "/".to_string(),
            favorite: None,
        }
    }
}

impl PostLogin {
    #[must_use]
    pub fn from_params(next: Option<&str>, favorite: Option<&str>) -> Self {
        Self {
            next: safe_next(next),
            favorite: favorite.and_then(|f| f.trim().parse().ok()),
        }
    }

    /// `path` with this target appended as its query string.
    #[must_use]
    pub fn link_to(&self, path: &str) -> String {
        let suffix = self.query_suffix();
        match suffix.strip_prefix('&') {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    /// Query string that carries this target through another form round trip.
    fn query_suffix(&self) -> String {
        let mut suffix = String::new();
        if self.next != "/" {
            suffix.push_str("&next=");
            suffix.push_str(&urlencoding::encode(&self.next));
        }
        if let Some(id) = self.favorite {
            let _ = write!(suffix, "&favorite={id}");
        }
        suffix
    }
}

/// Only same-origin absolute paths are followed after login; anything else
/// lands on the index.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.contains(['\r', '\n']) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// The user bound to the request's session, if any.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::internal(format!("Session unavailable: {msg}")))?;

        let Some(user_id) = session
            .get::<i32>(USER_ID_KEY)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        else {
            return Ok(Self(None));
        };

        // The login deadline is fixed when the session is established and
        // is not extended by later requests.
        let expires_at = session
            .get::<i64>(EXPIRES_AT_KEY)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
        if expires_at.is_none_or(|t| t <= time::OffsetDateTime::now_utc().unix_timestamp()) {
            return Ok(Self(None));
        }

        let user = state
            .store()
            .get_user_by_id(user_id)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?;

        if user.is_none() {
            warn!(user_id, "Session refers to a missing user");
        }

        if let Some(user) = &user {
            tracing::Span::current().record("user_id", user.id);
        }

        Ok(Self(user))
    }
}

// ============================================================================
// Session writer
// ============================================================================

/// Binds `user` to a fresh session id that expires `ttl_hours` from now.
/// Both local and OAuth logins go through here.
pub async fn establish_session(
    session: &Session,
    user: &User,
    ttl_hours: i64,
) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;

    let expires_at = time::OffsetDateTime::now_utc() + time::Duration::hours(ttl_hours);

    session
        .insert(USER_ID_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(EXPIRES_AT_KEY, expires_at.unix_timestamp())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    session.set_expiry(Some(Expiry::AtDateTime(expires_at)));

    Ok(())
}

async fn finish_login(
    state: &AppState,
    session: &Session,
    user: &User,
    target: PostLogin,
) -> Result<Response, ApiError> {
    establish_session(session, user, state.config().server.session_ttl_hours).await?;

    if let Some(anime_id) = target.favorite
        && let Err(e) = state.catalog().add_favorite(user, anime_id).await
    {
        warn!(user_id = user.id, mal_id = anime_id, error = %e, "Pending favorite was not stored");
    }

    Ok(Redirect::to(&target.next).into_response())
}

fn login_failed(target: &PostLogin) -> Response {
    Redirect::to(&format!("/login?error=1{}", target.query_suffix())).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /login
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthPageQuery>,
) -> Html<String> {
    let target = PostLogin::from_params(query.next.as_deref(), query.favorite.as_deref());
    Html(views::login_page(
        query.error.is_some(),
        &target,
        state.shared.google.enabled(),
    ))
}

/// GET /signup
pub async fn signup_page(Query(query): Query<AuthPageQuery>) -> Html<String> {
    let target = PostLogin::from_params(query.next.as_deref(), query.favorite.as_deref());
    Html(views::signup_page(query.error.is_some(), &target))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ApiError> {
    let target = PostLogin::from_params(form.next.as_deref(), form.favorite.as_deref());
    let credentials = LocalCredentials::new(&form.email, &form.password);

    match state.shared.local_auth.authenticate(&credentials).await {
        Ok(user) => {
            info!(user_id = user.id, "Local login");
            finish_login(&state, &session, &user, target).await
        }
        Err(AuthError::InvalidCredentials) => Ok(login_failed(&target)),
        Err(e) => Err(ApiError::internal(format!("Authentication error: {e}"))),
    }
}

/// POST /signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ApiError> {
    let target = PostLogin::from_params(form.next.as_deref(), form.favorite.as_deref());
    let credentials = LocalCredentials::new(&form.email, &form.password);

    match state.shared.local_auth.register(&credentials).await {
        Ok(user) => finish_login(&state, &session, &user, target).await,
        Err(AuthError::EmailTaken) => Ok(Redirect::to("/login").into_response()),
        Err(AuthError::Validation(_)) => Ok(Redirect::to(&format!(
            "/signup?error=1{}",
            target.query_suffix()
        ))
        .into_response()),
        Err(e) => Err(ApiError::internal(format!("Signup failed: {e}"))),
    }
}

/// GET /logout
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = session.flush().await {
        warn!(error = %e, "Failed to destroy session");
    }
    Redirect::to("/")
}

/// GET /auth/google
pub async fn google_start(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<AuthPageQuery>,
) -> Result<Response, ApiError> {
    let target = PostLogin::from_params(query.next.as_deref(), query.favorite.as_deref());
    let csrf_state = generate_state();

    let url = match state.shared.google.authorize_url(&csrf_state) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "Google login unavailable");
            return Ok(login_failed(&target));
        }
    };

    session
        .insert(OAUTH_STATE_KEY, &csrf_state)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
    session
        .insert(POST_LOGIN_KEY, &target)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Redirect::to(&url).into_response())
}

/// GET /auth/google/callback
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Response, ApiError> {
    let expected = session
        .remove::<String>(OAUTH_STATE_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
    let target = session
        .remove::<PostLogin>(POST_LOGIN_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .unwrap_or_default();

    if let Some(error) = &query.error {
        warn!(%error, "Google denied the login");
        return Ok(login_failed(&target));
    }

    let (Some(code), Some(returned)) = (query.code.as_deref(), query.state.as_deref()) else {
        return Ok(login_failed(&target));
    };

    if expected.as_deref() != Some(returned) {
        warn!("OAuth state mismatch");
        return Ok(login_failed(&target));
    }

    let profile = match state.shared.google.exchange_code(code).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "Google code exchange failed");
            return Ok(login_failed(&target));
        }
    };

    match state.shared.oauth.authenticate(&profile).await {
        Ok(user) => finish_login(&state, &session, &user, target).await,
        Err(e) => {
            warn!(error = %e, "OAuth account lookup failed");
            Ok(login_failed(&target))
        }
    }
}

fn generate_state() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 24] = rng.random();

    bytes.iter().fold(String::with_capacity(48), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

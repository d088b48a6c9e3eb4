use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header, redirect};
use serde::Serialize;
use tracing::debug;

use super::controller::{CatalogSource, SourceError};
use crate::api::AnimeListResponse;
use crate::models::AnnotatedAnime;

/// HTTP client for a running animark server. Holds the session cookie and
/// marks every request as script-driven so list routes answer with JSON.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct FavoriteBody {
    #[serde(rename = "animeId")]
    anime_id: i64,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-Requested-With",
            header::HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .default_headers(headers)
            .user_agent(concat!("animark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(request: RequestBuilder) -> Result<Response, SourceError> {
        request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))
    }

    /// Posts the login form. `favorite` is stored by the server once the
    /// credentials check out. Returns whether the login succeeded.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        favorite: Option<i64>,
    ) -> Result<bool, SourceError> {
        let mut form = vec![("email", email.to_string()), ("password", password.to_string())];
        if let Some(id) = favorite {
            form.push(("favorite", id.to_string()));
        }

        let response = Self::send(self.client.post(self.url("/login")).form(&form)).await?;

        if !response.status().is_redirection() {
            return Err(error_from(response).await);
        }

        let location = location_of(&response).unwrap_or_default();
        debug!(%location, "Login redirected");
        Ok(!location.starts_with("/login"))
    }

    pub async fn logout(&self) -> Result<(), SourceError> {
        let response = Self::send(self.client.get(self.url("/logout"))).await?;
        if response.status().is_redirection() || response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response).await)
        }
    }

    async fn get_list(&self, path: &str) -> Result<Vec<AnnotatedAnime>, SourceError> {
        let response = Self::send(self.client.get(self.url(path))).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED
            || (status.is_redirection()
                && location_of(&response).is_some_and(|l| l.starts_with("/login")))
        {
            return Err(SourceError::NotLoggedIn);
        }

        if !status.is_success() {
            return Err(error_from(response).await);
        }

        let body: AnimeListResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(body.anime_list)
    }
}

fn location_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Error responses carry `{error}` JSON or plain text.
async fn error_from(response: Response) -> SourceError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(ToString::to_string))
        .unwrap_or(text);

    SourceError::Status { status, message }
}

#[async_trait]
impl CatalogSource for ServiceClient {
    async fn top(&self, page: u32) -> Result<Vec<AnnotatedAnime>, SourceError> {
        self.get_list(&format!("/?page={page}")).await
    }

    async fn genre(&self, genre_id: u32, page: u32) -> Result<Vec<AnnotatedAnime>, SourceError> {
        self.get_list(&format!("/genre?genre={genre_id}&page={page}"))
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<AnnotatedAnime>, SourceError> {
        self.get_list(&format!("/search?q={}", urlencoding::encode(query)))
            .await
    }

    async fn favorites(&self) -> Result<Vec<AnnotatedAnime>, SourceError> {
        self.get_list("/favorites").await
    }

    async fn set_favorite(&self, anime_id: i64, favorited: bool) -> Result<(), SourceError> {
        let path = if favorited {
            "/favorites/add"
        } else {
            "/favorites/remove"
        };

        let response = Self::send(
            self.client
                .post(self.url(path))
                .json(&FavoriteBody { anime_id }),
        )
        .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(SourceError::NotLoggedIn),
            s if s.is_success() => Ok(()),
            _ => Err(error_from(response).await),
        }
    }
}

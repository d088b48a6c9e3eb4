//! Google OAuth 2.0 authorization-code flow, reduced to what login needs:
//! build the consent URL, trade the callback code for a token, and read the
//! OpenID userinfo document.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::OAuthConfig;
use crate::models::AuthProvider;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Google login is not configured")]
    NotConfigured,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Userinfo request failed: {0}")]
    Userinfo(String),

    #[error("Provider did not return a verified email")]
    UnverifiedEmail,

    #[error("Invalid OAuth endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Identity assertion produced by a completed OAuth flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: AuthProvider,
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleClient {
    client: Client,
    config: OAuthConfig,
}

impl GoogleClient {
    #[must_use]
    pub const fn with_shared_client(client: Client, config: OAuthConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.google_enabled()
    }

    /// Consent screen URL carrying our CSRF `state`.
    pub fn authorize_url(&self, state: &str) -> Result<String, OAuthError> {
        if !self.enabled() {
            return Err(OAuthError::NotConfigured);
        }

        let url = url::Url::parse_with_params(
            &self.config.google_auth_url,
            &[
                ("client_id", self.config.google_client_id.as_str()),
                ("redirect_uri", self.config.google_callback_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )?;

        Ok(url.into())
    }

    /// Trades the callback `code` for an access token and reads the profile.
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthError> {
        if !self.enabled() {
            return Err(OAuthError::NotConfigured);
        }

        let response = self
            .client
            .post(&self.config.google_token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.google_client_id.as_str()),
                ("client_secret", self.config.google_client_secret.as_str()),
                ("redirect_uri", self.config.google_callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchange(format!("{status} - {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        let response = self
            .client
            .get(&self.config.google_userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Userinfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::Userinfo(response.status().to_string()));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::Userinfo(e.to_string()))?;

        debug!(subject = %info.sub, "Fetched Google userinfo");
        profile_from_userinfo(info)
    }
}

fn profile_from_userinfo(info: UserInfo) -> Result<OAuthProfile, OAuthError> {
    let email = info
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or(OAuthError::UnverifiedEmail)?;

    if info.email_verified == Some(false) {
        return Err(OAuthError::UnverifiedEmail);
    }

    Ok(OAuthProfile {
        provider: AuthProvider::Google,
        subject: info.sub,
        email,
        display_name: info.name,
    })
}

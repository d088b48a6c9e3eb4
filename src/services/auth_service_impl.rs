//! `SeaORM`-backed implementations of [`Authenticator`].

use async_trait::async_trait;
use tracing::info;

use crate::clients::OAuthProfile;
use crate::config::SecurityConfig;
use crate::db::Store;
use crate::models::User;
use crate::services::auth_service::{AuthError, Authenticator, LocalCredentials};

pub struct LocalAuthenticator {
    store: Store,
    security: SecurityConfig,
}

impl LocalAuthenticator {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Creates a password account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] when the email is already registered,
    /// whichever provider created it.
    pub async fn register(&self, credentials: &LocalCredentials) -> Result<User, AuthError> {
        credentials.validate()?;

        let user = self
            .store
            .create_local_user(&credentials.email, &credentials.password, &self.security)
            .await?
            .ok_or(AuthError::EmailTaken)?;

        info!(user_id = user.id, "Registered local account");
        Ok(user)
    }
}

#[async_trait]
impl Authenticator for LocalAuthenticator {
    type Credentials = LocalCredentials;

    async fn authenticate(&self, credentials: &LocalCredentials) -> Result<User, AuthError> {
        if credentials.validate().is_err() {
            return Err(AuthError::InvalidCredentials);
        }

        self.store
            .verify_user_password(&credentials.email, &credentials.password)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

pub struct OAuthAuthenticator {
    store: Store,
}

impl OAuthAuthenticator {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for OAuthAuthenticator {
    type Credentials = OAuthProfile;

    /// The profile has already been verified by the provider; the account is
    /// found by email or created without a password.
    async fn authenticate(&self, profile: &OAuthProfile) -> Result<User, AuthError> {
        let user = self
            .store
            .find_or_create_external_user(&profile.email, profile.provider)
            .await?;

        info!(user_id = user.id, provider = %profile.provider, "OAuth login");
        Ok(user)
    }
}

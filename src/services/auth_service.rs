//! Domain service for authentication.
//!
//! Local passwords and OAuth assertions are two credential types behind one
//! [`Authenticator`] trait; both resolve to the same [`User`] so the HTTP
//! layer writes sessions the same way for either.

use thiserror::Error;

use crate::models::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password and passwordless accounts all map here,
    /// so callers cannot tell which factor failed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Email/password pair as submitted by the login and signup forms.
#[derive(Debug, Clone)]
pub struct LocalCredentials {
    pub email: String,
    pub password: String,
}

impl LocalCredentials {
    /// Surrounding whitespace is dropped from both fields before any lookup,
    /// hashing or comparison.
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

/// Turns some proof of identity into a [`User`].
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    type Credentials: Send + Sync;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the proof is rejected.
    async fn authenticate(&self, credentials: &Self::Credentials) -> Result<User, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_trimmed() {
        let creds = LocalCredentials::new("  a@example.com \n", " secret ");
        assert_eq!(creds.email, "a@example.com");
        assert_eq!(creds.password, "secret");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn blank_fields_fail_validation() {
        assert!(matches!(
            LocalCredentials::new("   ", "pw").validate(),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            LocalCredentials::new("a@example.com", "  ").validate(),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn auth_error_display() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        let err: AuthError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "Internal error: disk full");
    }
}

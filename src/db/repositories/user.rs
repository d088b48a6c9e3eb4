use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;
use crate::models::{AuthProvider, User};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        user.map(User::try_from).transpose()
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(User::try_from).transpose()
    }

    /// Creates a password account. Returns `None` when the email is already
    /// registered. Known emails are turned away before hashing; the unique
    /// index still decides between two racing signups.
    pub async fn create_local(
        &self,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        if self.get_by_email(email).await?.is_some() {
            return Ok(None);
        }

        let password = password.to_string();
        let security = security.clone();
        let hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        self.insert_if_absent(email, Some(hash), AuthProvider::Local)
            .await
    }

    /// Returns the account registered under `email`, creating a passwordless
    /// one for `provider` on first sight.
    pub async fn find_or_create_external(
        &self,
        email: &str,
        provider: AuthProvider,
    ) -> Result<User> {
        if let Some(user) = self.get_by_email(email).await? {
            return Ok(user);
        }

        if let Some(user) = self.insert_if_absent(email, None, provider).await? {
            return Ok(user);
        }

        // Lost a race against a concurrent first login; the row exists now.
        self.get_by_email(email)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User vanished after conflicting insert: {email}"))
    }

    /// Verifies a local password. `None` covers unknown email, passwordless
    /// (OAuth-only) accounts and wrong passwords alike.
    /// Note: This uses `spawn_blocking` because Argon2 verification is
    /// CPU-intensive and would block the async runtime if run directly.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let Some(password_hash) = user.password_hash.clone() else {
            return Ok(None);
        };
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        if !is_valid {
            return Ok(None);
        }
        User::try_from(user).map(Some)
    }

    async fn insert_if_absent(
        &self,
        email: &str,
        password_hash: Option<String>,
        provider: AuthProvider,
    ) -> Result<Option<User>> {
        let active = users::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            provider: Set(provider.as_str().to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let inserted = users::Entity::insert(active)
            .on_conflict(
                OnConflict::column(users::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert user")?;

        if inserted == 0 {
            return Ok(None);
        }

        self.get_by_email(email).await
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the crate's default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

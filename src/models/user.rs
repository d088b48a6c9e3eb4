use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::users;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "google" => Ok(Self::Google),
            other => Err(anyhow::anyhow!("Unknown auth provider: {other}")),
        }
    }
}

/// User identity shared by every login path (without the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub provider: AuthProvider,
    pub created_at: String,
}

impl TryFrom<users::Model> for User {
    type Error = anyhow::Error;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            provider: model
                .provider
                .parse()
                .map_err(|e| anyhow::anyhow!("User {}: {e}", model.id))?,
            email: model.email,
            created_at: model.created_at,
        })
    }
}

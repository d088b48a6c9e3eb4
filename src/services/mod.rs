pub mod auth_service;
pub use auth_service::{AuthError, Authenticator, LocalCredentials};

pub mod auth_service_impl;
pub use auth_service_impl::{LocalAuthenticator, OAuthAuthenticator};

pub mod catalog;
pub use catalog::{CatalogService, ServiceError};

pub mod google;
pub mod jikan;

pub use google::{GoogleClient, OAuthProfile};
pub use jikan::{CatalogError, JikanClient};

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::models::AnnotatedAnime;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse<()> {
    pub const fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Body of every script-driven catalog response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnimeListResponse {
    #[serde(rename = "animeList")]
    pub anime_list: Vec<AnnotatedAnime>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page: Option<u32>,
}

impl AnimeListResponse {
    #[must_use]
    pub const fn new(anime_list: Vec<AnnotatedAnime>) -> Self {
        Self {
            anime_list,
            page: None,
        }
    }

    #[must_use]
    pub const fn with_page(anime_list: Vec<AnnotatedAnime>, page: u32) -> Self {
        Self {
            anime_list,
            page: Some(page),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteRequest {
    #[serde(rename = "animeId", deserialize_with = "anime_id_from_number_or_string")]
    pub anime_id: i64,
}

/// Browsers post ids read from `data-*` attributes, so the id may arrive as
/// a string.
fn anime_id_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid anime id: {s:?}"))),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Parses a `page` query value the way the catalog routes expect:
/// anything missing, non-numeric or below 1 means the first page.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

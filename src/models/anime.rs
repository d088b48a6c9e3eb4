use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A catalog entry as returned by the upstream API.
///
/// Only the fields this service reads are typed; everything else is carried
/// through `extra` so clients receive the upstream record untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub mal_id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub episodes: Option<i32>,

    #[serde(default)]
    pub score: Option<f64>,

    #[serde(default)]
    pub synopsis: Option<String>,

    #[serde(default)]
    pub images: Option<AnimeImages>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeImages {
    #[serde(default)]
    pub jpg: Option<ImageSet>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Anime {
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.images
            .as_ref()
            .and_then(|i| i.jpg.as_ref())
            .and_then(|j| j.image_url.as_deref())
    }

    #[must_use]
    pub fn display_episodes(&self) -> String {
        self.episodes
            .map_or_else(|| "N/A".to_string(), |e| e.to_string())
    }

    #[must_use]
    pub fn display_score(&self) -> String {
        self.score.map_or_else(|| "N/A".to_string(), |s| s.to_string())
    }

    #[must_use]
    pub fn display_synopsis(&self) -> &str {
        self.synopsis
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("No synopsis available.")
    }
}

/// Catalog entry plus the requesting user's favorite flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedAnime {
    #[serde(flatten)]
    pub anime: Anime,

    #[serde(rename = "isFavorited", default)]
    pub is_favorited: bool,
}

impl AnnotatedAnime {
    #[must_use]
    pub const fn new(anime: Anime, is_favorited: bool) -> Self {
        Self {
            anime,
            is_favorited,
        }
    }

    /// Marks every entry whose id is in `favorites`.
    #[must_use]
    pub fn annotate_all(list: Vec<Anime>, favorites: &HashSet<i64>) -> Vec<Self> {
        list.into_iter()
            .map(|anime| {
                let is_favorited = favorites.contains(&anime.mal_id);
                Self::new(anime, is_favorited)
            })
            .collect()
    }
}

//! Composes upstream catalog listings with the requesting user's favorites.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::clients::{CatalogError, JikanClient};
use crate::db::Store;
use crate::models::{AnnotatedAnime, User};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Upstream(#[from] CatalogError),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }
}

pub struct CatalogService {
    store: Store,
    jikan: Arc<JikanClient>,
    favorites_pacing: Duration,
}

impl CatalogService {
    #[must_use]
    pub const fn new(store: Store, jikan: Arc<JikanClient>, favorites_pacing: Duration) -> Self {
        Self {
            store,
            jikan,
            favorites_pacing,
        }
    }

    /// Favorite ids of `user`; empty for anonymous requests.
    pub async fn favorite_ids(&self, user: Option<&User>) -> Result<HashSet<i64>, ServiceError> {
        match user {
            Some(user) => Ok(self
                .store
                .list_favorites(user.id)
                .await?
                .into_iter()
                .collect()),
            None => Ok(HashSet::new()),
        }
    }

    pub async fn top_page(
        &self,
        page: u32,
        user: Option<&User>,
    ) -> Result<Vec<AnnotatedAnime>, ServiceError> {
        let list = self.jikan.fetch_top_page(page).await?;
        let favorites = self.favorite_ids(user).await?;
        Ok(AnnotatedAnime::annotate_all(list, &favorites))
    }

    pub async fn genre_page(
        &self,
        genre_id: u32,
        page: u32,
        user: Option<&User>,
    ) -> Result<Vec<AnnotatedAnime>, ServiceError> {
        let list = self.jikan.fetch_by_genre(genre_id, page).await?;
        let favorites = self.favorite_ids(user).await?;
        Ok(AnnotatedAnime::annotate_all(list, &favorites))
    }

    pub async fn search(
        &self,
        query: &str,
        user: Option<&User>,
    ) -> Result<Vec<AnnotatedAnime>, ServiceError> {
        let list = self.jikan.search_by_query(query).await?;
        let favorites = self.favorite_ids(user).await?;
        Ok(AnnotatedAnime::annotate_all(list, &favorites))
    }

    /// Resolves every favorite of `user` one lookup at a time, pausing between
    /// lookups to stay under the upstream rate limit. Lookups that exhaust
    /// their retries are left out of the result.
    pub async fn favorites(&self, user: &User) -> Result<Vec<AnnotatedAnime>, ServiceError> {
        let ids = self.store.list_favorites(user.id).await?;
        let mut list = Vec::with_capacity(ids.len());

        for (i, id) in ids.iter().enumerate() {
            if i > 0 && !self.favorites_pacing.is_zero() {
                tokio::time::sleep(self.favorites_pacing).await;
            }

            match self.jikan.fetch_by_id(*id).await {
                Some(anime) => list.push(AnnotatedAnime::new(anime, true)),
                None => debug!(user_id = user.id, mal_id = id, "Skipping unavailable favorite"),
            }
        }

        Ok(list)
    }

    pub async fn add_favorite(&self, user: &User, anime_id: i64) -> Result<(), ServiceError> {
        if self.store.add_favorite(user.id, anime_id).await? {
            info!(user_id = user.id, mal_id = anime_id, "Favorite added");
        }
        Ok(())
    }

    pub async fn remove_favorite(&self, user: &User, anime_id: i64) -> Result<(), ServiceError> {
        if self.store.remove_favorite(user.id, anime_id).await? {
            info!(user_id = user.id, mal_id = anime_id, "Favorite removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, SecurityConfig};
    use axum::{
        Json, Router,
        extract::{Path, State},
        routing::get,
    };
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Instant;

    type Hits = Arc<Mutex<Vec<Instant>>>;

    async fn recording_upstream(hits: Hits) -> String {
        let router = Router::new()
            .route(
                "/anime/{id}",
                get(|State(hits): State<Hits>, Path(id): Path<i64>| async move {
                    hits.lock().unwrap().push(Instant::now());
                    Json(json!({ "data": { "mal_id": id, "title": format!("Anime {id}") } }))
                }),
            )
            .with_state(hits);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn service_with(base_url: String, pacing: Duration) -> (CatalogService, User) {
        let path =
            std::env::temp_dir().join(format!("animark-catalog-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}", path.display())).await.unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let user = store
            .create_local_user("fan@example.com", "pw", &security)
            .await
            .unwrap()
            .unwrap();

        let config = CatalogConfig {
            base_url,
            retry_delay_ms: 1,
            ..CatalogConfig::default()
        };
        let jikan = Arc::new(JikanClient::new(&config).unwrap());
        (CatalogService::new(store, jikan, pacing), user)
    }

    #[tokio::test]
    async fn favorite_lookups_are_paced() {
        let pacing = Duration::from_millis(200);
        let hits: Hits = Arc::default();
        let upstream = recording_upstream(hits.clone()).await;
        let (service, user) = service_with(upstream, pacing).await;
        for id in [1, 2, 3] {
            service.add_favorite(&user, id).await.unwrap();
        }

        let list = service.favorites(&user).await.unwrap();
        let finished = Instant::now();

        let ids: Vec<i64> = list.iter().map(|a| a.anime.mal_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let hits = hits.lock().unwrap().clone();
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[1] - pair[0] >= pacing, "gap {:?}", pair[1] - pair[0]);
        }
        // Nothing waits after the final lookup.
        assert!(finished - hits[2] < pacing);
    }

    #[tokio::test]
    async fn single_favorite_is_not_delayed() {
        let pacing = Duration::from_millis(500);
        let hits: Hits = Arc::default();
        let upstream = recording_upstream(hits.clone()).await;
        let (service, user) = service_with(upstream, pacing).await;
        service.add_favorite(&user, 9).await.unwrap();

        let started = Instant::now();
        let list = service.favorites(&user).await.unwrap();

        assert_eq!(list.len(), 1);
        assert!(started.elapsed() < pacing);
    }
}

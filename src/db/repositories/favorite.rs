use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};

use crate::entities::favorites;

pub struct FavoriteRepository {
    conn: DatabaseConnection,
}

impl FavoriteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Upsert. Returns whether a new row was written; re-adding is a no-op.
    pub async fn add(&self, user_id: i32, anime_id: i64) -> Result<bool> {
        let active = favorites::ActiveModel {
            user_id: Set(user_id),
            anime_id: Set(anime_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        let inserted = favorites::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([favorites::Column::UserId, favorites::Column::AnimeId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert favorite")?;

        Ok(inserted > 0)
    }

    /// Delete-if-present. Returns whether a row was removed.
    pub async fn remove(&self, user_id: i32, anime_id: i64) -> Result<bool> {
        let result = favorites::Entity::delete_many()
            .filter(favorites::Column::UserId.eq(user_id))
            .filter(favorites::Column::AnimeId.eq(anime_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete favorite")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<i64>> {
        favorites::Entity::find()
            .select_only()
            .column(favorites::Column::AnimeId)
            .filter(favorites::Column::UserId.eq(user_id))
            .order_by_asc(favorites::Column::CreatedAt)
            .into_tuple::<i64>()
            .all(&self.conn)
            .await
            .context("Failed to list favorites")
    }
}

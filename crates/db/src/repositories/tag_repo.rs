//! Repository for the `tags` and `recipe_tags` tables.

use sqlx::PgPool;
use souschef_core::tags::normalize_tag;
use souschef_core::types::DbId;

use crate::models::tag::Tag;

const COLUMNS: &str = "id, hashtag, created_at";

/// Provides tag lookup, idempotent creation and recipe associations.
pub struct TagRepo;

impl TagRepo {
    pub async fn find_by_hashtag(pool: &PgPool, hashtag: &str) -> Result<Option<Tag>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tags WHERE hashtag = $1");
        sqlx::query_as::<_, Tag>(&query)
            .bind(normalize_tag(hashtag))
            .fetch_optional(pool)
            .await
    }

    /// Create a tag or return the existing one with the same normalized text.
    ///
    /// The no-op `DO UPDATE` makes `RETURNING` yield the existing row when a
    /// concurrent insert won the race.
    pub async fn create_or_get(pool: &PgPool, hashtag: &str) -> Result<Tag, sqlx::Error> {
        let query = format!(
            "INSERT INTO tags (hashtag) VALUES ($1) \
             ON CONFLICT (hashtag) DO UPDATE SET hashtag = EXCLUDED.hashtag \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tag>(&query)
            .bind(normalize_tag(hashtag))
            .fetch_one(pool)
            .await
    }

    /// Replace the recipe's tag set in one transaction.
    pub async fn replace_for_recipe(
        pool: &PgPool,
        recipe_id: DbId,
        tag_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO recipe_tags (recipe_id, tag_id) \
                 SELECT $1, UNNEST($2::BIGINT[]) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(recipe_id)
            .bind(tag_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_for_recipe(pool: &PgPool, recipe_id: DbId) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.hashtag, t.created_at FROM tags t \
             JOIN recipe_tags rt ON rt.tag_id = t.id \
             WHERE rt.recipe_id = $1 \
             ORDER BY t.hashtag",
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await
    }
}

//! Repository for `recipe_histories` and `recipe_history_entries`.

use sqlx::{PgConnection, PgPool};
use souschef_core::types::DbId;

use crate::models::history::{HistoryEntry, NewHistoryEntry, RecipeHistory};

const HISTORY_COLUMNS: &str = "id, recipe_id, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, history_id, seq, prompt, response, created_at";

/// Provides access to recipe histories.
pub struct HistoryRepo;

impl HistoryRepo {
    /// Create the history row for a recipe inside an open transaction.
    pub async fn create(conn: &mut PgConnection, recipe_id: DbId) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) =
            sqlx::query_as("INSERT INTO recipe_histories (recipe_id) VALUES ($1) RETURNING id")
                .bind(recipe_id)
                .fetch_one(conn)
                .await?;
        Ok(id)
    }

    pub async fn find_id_for_recipe(
        conn: &mut PgConnection,
        recipe_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM recipe_histories WHERE recipe_id = $1")
                .bind(recipe_id)
                .fetch_optional(conn)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Append an entry with the next sequence number.
    pub async fn append_entry(
        conn: &mut PgConnection,
        history_id: DbId,
        entry: &NewHistoryEntry,
    ) -> Result<HistoryEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO recipe_history_entries (history_id, seq, prompt, response) \
             VALUES ($1, \
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM recipe_history_entries WHERE history_id = $1), \
                     $2, $3) \
             RETURNING {ENTRY_COLUMNS}"
        );
        sqlx::query_as::<_, HistoryEntry>(&query)
            .bind(history_id)
            .bind(&entry.prompt)
            .bind(&entry.response)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RecipeHistory>, sqlx::Error> {
        let query = format!("SELECT {HISTORY_COLUMNS} FROM recipe_histories WHERE id = $1");
        sqlx::query_as::<_, RecipeHistory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_recipe(
        pool: &PgPool,
        recipe_id: DbId,
    ) -> Result<Option<RecipeHistory>, sqlx::Error> {
        let query = format!("SELECT {HISTORY_COLUMNS} FROM recipe_histories WHERE recipe_id = $1");
        sqlx::query_as::<_, RecipeHistory>(&query)
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
    }

    /// Entries of a history, ordered by sequence.
    pub async fn list_entries(
        pool: &PgPool,
        history_id: DbId,
    ) -> Result<Vec<HistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM recipe_history_entries \
             WHERE history_id = $1 ORDER BY seq"
        );
        sqlx::query_as::<_, HistoryEntry>(&query)
            .bind(history_id)
            .fetch_all(pool)
            .await
    }

    /// Number of entries recorded for a recipe.
    pub async fn count_for_recipe(pool: &PgPool, recipe_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM recipe_history_entries e \
             JOIN recipe_histories h ON h.id = e.history_id \
             WHERE h.recipe_id = $1",
        )
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}

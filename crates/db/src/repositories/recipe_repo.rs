//! Repository for the `recipes` table.
//!
//! Covers the draft lifecycle driven by the generation pipeline plus the
//! owner-facing soft delete / restore and the purge of expired trash.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use souschef_core::recipe::RecipeDef;
use souschef_core::types::DbId;

use crate::models::history::NewHistoryEntry;
use crate::models::recipe::{CreateRecipe, Recipe, RecipeDetail};
use crate::repositories::{HistoryRepo, TagRepo};

/// Column list for `recipes` queries.
const COLUMNS: &str = "\
    id, title, ingredients, instructions, cook_time, unit_system, image_prompt, \
    link_suggestions, image_url, forked_from_id, created_by, deleted_at, \
    created_at, updated_at";

/// A soft-deleted recipe whose grace window has passed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurgeCandidate {
    pub id: DbId,
    pub image_url: Option<String>,
}

/// Provides CRUD operations for recipes.
pub struct RecipeRepo;

impl RecipeRepo {
    // -----------------------------------------------------------------------
    // Draft lifecycle
    // -----------------------------------------------------------------------

    /// Insert an empty draft together with its (empty) history row.
    pub async fn create(pool: &PgPool, input: &CreateRecipe) -> Result<Recipe, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO recipes (created_by, forked_from_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(input.created_by)
            .bind(input.forked_from_id)
            .fetch_one(&mut *tx)
            .await?;

        HistoryRepo::create(&mut tx, recipe.id).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    /// Find a recipe by ID, including soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Recipe>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recipes WHERE id = $1");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a recipe by ID, hiding soft-deleted rows.
    pub async fn find_active(pool: &PgPool, id: DbId) -> Result<Option<Recipe>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recipes WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Populate every content column and append the history entry in one
    /// transaction.
    ///
    /// Returns `None` if the recipe no longer exists.
    pub async fn update_definition(
        pool: &PgPool,
        id: DbId,
        def: &RecipeDef,
        entry: &NewHistoryEntry,
    ) -> Result<Option<Recipe>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE recipes SET \
                title = $2, ingredients = $3, instructions = $4, cook_time = $5, \
                unit_system = $6, image_prompt = $7, link_suggestions = $8 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(&def.title)
            .bind(Json(&def.ingredients))
            .bind(&def.instructions)
            .bind(def.cook_time)
            .bind(def.unit_system.as_str())
            .bind(&def.image_prompt)
            .bind(&def.linked_recipe_suggestions)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };

        let history_id = match HistoryRepo::find_id_for_recipe(&mut tx, id).await? {
            Some(history_id) => history_id,
            None => HistoryRepo::create(&mut tx, id).await?,
        };
        HistoryRepo::append_entry(&mut tx, history_id, entry).await?;

        tx.commit().await?;
        Ok(Some(recipe))
    }

    /// Set the image URL. Returns `true` if the recipe exists.
    pub async fn update_image_url(pool: &PgPool, id: DbId, url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE recipes SET image_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete a recipe. History, entries and tag links cascade.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Trash
    // -----------------------------------------------------------------------

    /// Soft-delete a recipe. Returns `false` if it was missing or already
    /// deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recipes SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a soft-deleted recipe if it is still inside the grace window.
    pub async fn restore(pool: &PgPool, id: DbId, grace_days: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recipes SET deleted_at = NULL \
             WHERE id = $1 AND deleted_at IS NOT NULL \
               AND deleted_at > NOW() - make_interval(days => $2)",
        )
        .bind(id)
        .bind(grace_days)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-deleted recipes older than the grace window, oldest first.
    pub async fn list_expired_trash(
        pool: &PgPool,
        grace_days: i32,
        limit: i64,
    ) -> Result<Vec<PurgeCandidate>, sqlx::Error> {
        sqlx::query_as::<_, PurgeCandidate>(
            "SELECT id, image_url FROM recipes \
             WHERE deleted_at IS NOT NULL \
               AND deleted_at <= NOW() - make_interval(days => $1) \
             ORDER BY deleted_at \
             LIMIT $2",
        )
        .bind(grace_days)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Detail view
    // -----------------------------------------------------------------------

    /// Active recipe with tags, history id, owner username and the title of
    /// the recipe it was forked from.
    pub async fn find_detail(pool: &PgPool, id: DbId) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let Some(recipe) = Self::find_active(pool, id).await? else {
            return Ok(None);
        };

        let owner_username: Option<(String,)> =
            sqlx::query_as("SELECT username FROM users WHERE id = $1")
                .bind(recipe.created_by)
                .fetch_optional(pool)
                .await?;

        let forked_from_title = match recipe.forked_from_id {
            Some(parent_id) => {
                let row: Option<(Option<String>,)> =
                    sqlx::query_as("SELECT title FROM recipes WHERE id = $1")
                        .bind(parent_id)
                        .fetch_optional(pool)
                        .await?;
                row.and_then(|(title,)| title)
            }
            None => None,
        };

        let history_id = HistoryRepo::find_by_recipe(pool, id).await?.map(|h| h.id);
        let tags = TagRepo::list_for_recipe(pool, id).await?;

        Ok(Some(RecipeDetail {
            recipe,
            history_id,
            owner_username: owner_username.map(|(name,)| name),
            forked_from_title,
            tags,
        }))
    }
}

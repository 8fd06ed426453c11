//! The persistence seam used by the generation pipeline.
//!
//! [`RecipeStore`] names exactly the operations a run needs; [`PgRecipeStore`]
//! implements it over the repositories. Pipeline tests supply in-memory
//! implementations.

use async_trait::async_trait;
use souschef_core::recipe::RecipeDef;
use souschef_core::types::DbId;

use crate::models::history::NewHistoryEntry;
use crate::models::recipe::{CreateRecipe, Recipe};
use crate::models::tag::Tag;
use crate::repositories::{RecipeRepo, TagRepo};
use crate::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Recipe {0} not found")]
    RecipeNotFound(DbId),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Failure from a non-Postgres backend.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Insert an empty draft owned by `input.created_by`.
    async fn create_recipe(&self, input: &CreateRecipe) -> Result<Recipe, StoreError>;

    async fn find_recipe(&self, id: DbId) -> Result<Option<Recipe>, StoreError>;

    /// Write the generated content and append `entry` to the recipe's
    /// history atomically.
    async fn update_recipe_def(
        &self,
        id: DbId,
        def: &RecipeDef,
        entry: &NewHistoryEntry,
    ) -> Result<Recipe, StoreError>;

    async fn update_recipe_image_url(&self, id: DbId, url: &str) -> Result<(), StoreError>;

    /// Hard-delete. Returns `false` if nothing was removed.
    async fn delete_recipe(&self, id: DbId) -> Result<bool, StoreError>;

    async fn find_tag_by_name(&self, hashtag: &str) -> Result<Option<Tag>, StoreError>;

    /// Create the tag, or fetch it if another writer created it first.
    async fn create_tag(&self, hashtag: &str) -> Result<Tag, StoreError>;

    /// Make `tag_ids` the recipe's complete tag set.
    async fn replace_recipe_tags(&self, recipe_id: DbId, tag_ids: &[DbId])
        -> Result<(), StoreError>;
}

/// Postgres-backed [`RecipeStore`].
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: DbPool,
}

impl PgRecipeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn create_recipe(&self, input: &CreateRecipe) -> Result<Recipe, StoreError> {
        Ok(RecipeRepo::create(&self.pool, input).await?)
    }

    async fn find_recipe(&self, id: DbId) -> Result<Option<Recipe>, StoreError> {
        Ok(RecipeRepo::find_by_id(&self.pool, id).await?)
    }

    async fn update_recipe_def(
        &self,
        id: DbId,
        def: &RecipeDef,
        entry: &NewHistoryEntry,
    ) -> Result<Recipe, StoreError> {
        RecipeRepo::update_definition(&self.pool, id, def, entry)
            .await?
            .ok_or(StoreError::RecipeNotFound(id))
    }

    async fn update_recipe_image_url(&self, id: DbId, url: &str) -> Result<(), StoreError> {
        if RecipeRepo::update_image_url(&self.pool, id, url).await? {
            Ok(())
        } else {
            Err(StoreError::RecipeNotFound(id))
        }
    }

    async fn delete_recipe(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(RecipeRepo::hard_delete(&self.pool, id).await?)
    }

    async fn find_tag_by_name(&self, hashtag: &str) -> Result<Option<Tag>, StoreError> {
        Ok(TagRepo::find_by_hashtag(&self.pool, hashtag).await?)
    }

    async fn create_tag(&self, hashtag: &str) -> Result<Tag, StoreError> {
        Ok(TagRepo::create_or_get(&self.pool, hashtag).await?)
    }

    async fn replace_recipe_tags(
        &self,
        recipe_id: DbId,
        tag_ids: &[DbId],
    ) -> Result<(), StoreError> {
        Ok(TagRepo::replace_for_recipe(&self.pool, recipe_id, tag_ids).await?)
    }
}

//! Attaches generated hashtags to a recipe.

use std::sync::Arc;

use souschef_core::tags::normalize_tags;
use souschef_core::types::DbId;
use souschef_db::models::tag::Tag;
use souschef_db::store::{RecipeStore, StoreError};

/// Normalizes raw hashtags, reuses or creates the tag rows, and makes them
/// the recipe's tag set.
#[derive(Clone)]
pub struct TagAssociator {
    store: Arc<dyn RecipeStore>,
}

impl TagAssociator {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Replace the recipe's tags with the normalized form of `raw`.
    ///
    /// Empty tags are skipped and duplicates collapse to one row. Calling
    /// again with the same input leaves the same single set.
    pub async fn associate(&self, recipe_id: DbId, raw: &[String]) -> Result<Vec<Tag>, StoreError> {
        let mut tags = Vec::new();
        for hashtag in normalize_tags(raw) {
            let tag = match self.store.find_tag_by_name(&hashtag).await? {
                Some(existing) => existing,
                None => self.store.create_tag(&hashtag).await?,
            };
            tags.push(tag);
        }

        let tag_ids: Vec<DbId> = tags.iter().map(|t| t.id).collect();
        self.store.replace_recipe_tags(recipe_id, &tag_ids).await?;

        tracing::debug!(recipe_id, count = tags.len(), "Associated tags");
        Ok(tags)
    }
}

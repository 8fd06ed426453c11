//! Recipe rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use souschef_core::recipe::Ingredient;
use souschef_core::types::{DbId, Timestamp};

use super::tag::Tag;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `recipes` table.
///
/// Drafts carry only ownership columns; every content column is filled in a
/// single update once text generation succeeds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recipe {
    pub id: DbId,
    pub title: Option<String>,
    pub ingredients: Json<Vec<Ingredient>>,
    pub instructions: Vec<String>,
    pub cook_time: Option<i32>,
    pub unit_system: Option<String>,
    pub image_prompt: Option<String>,
    pub link_suggestions: Vec<String>,
    pub image_url: Option<String>,
    pub forked_from_id: Option<DbId>,
    pub created_by: DbId,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Recipe {
    /// `true` until the text stage has populated the row.
    pub fn is_draft(&self) -> bool {
        self.title.as_deref().map_or(true, str::is_empty) && self.instructions.is_empty()
    }
}

/// Recipe with the joined data the detail endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub history_id: Option<DbId>,
    pub owner_username: Option<String>,
    pub forked_from_title: Option<String>,
    pub tags: Vec<Tag>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for creating an empty draft.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipe {
    pub created_by: DbId,
    pub forked_from_id: Option<DbId>,
}

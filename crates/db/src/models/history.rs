//! Recipe history rows.

use serde::Serialize;
use sqlx::FromRow;
use souschef_core::types::{DbId, Timestamp};

/// A row from the `recipe_histories` table (one per recipe).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecipeHistory {
    pub id: DbId,
    pub recipe_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `recipe_history_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HistoryEntry {
    pub id: DbId,
    pub history_id: DbId,
    pub seq: i32,
    pub prompt: String,
    pub response: serde_json::Value,
    pub created_at: Timestamp,
}

/// One prompt/response exchange to append to a recipe's history.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub prompt: String,
    pub response: serde_json::Value,
}

//! Tag rows.

use serde::Serialize;
use sqlx::FromRow;
use souschef_core::types::{DbId, Timestamp};

/// A row from the `tags` table. `hashtag` is always normalized.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Tag {
    pub id: DbId,
    pub hashtag: String,
    pub created_at: Timestamp,
}

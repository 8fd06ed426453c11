//! User rows, read-only apart from test seeding.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use souschef_core::recipe::{GenerationPreferences, UnitSystem};
use souschef_core::types::{DbId, Timestamp};

/// A row from the `users` table.
///
/// `encrypted_api_key` is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub use_personal_api_key: bool,
    #[serde(skip_serializing)]
    pub encrypted_api_key: Option<String>,
    pub unit_system: String,
    pub requirements: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Preferred unit system; unknown stored values fall back to the default.
    pub fn preferred_unit_system(&self) -> UnitSystem {
        UnitSystem::from_name(&self.unit_system).unwrap_or_default()
    }

    /// Preferences shaping this user's generation requests.
    pub fn preferences(&self) -> GenerationPreferences {
        GenerationPreferences {
            unit_system: self.preferred_unit_system(),
            requirements: self.requirements.clone(),
        }
    }

    /// Whether generation for this user should use their own key.
    pub fn has_personal_key(&self) -> bool {
        self.use_personal_api_key
            && self
                .encrypted_api_key
                .as_deref()
                .is_some_and(|k| !k.is_empty())
    }
}

/// DTO for seeding a user row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub use_personal_api_key: bool,
    pub encrypted_api_key: Option<String>,
    pub unit_system: Option<String>,
    pub requirements: Option<String>,
}

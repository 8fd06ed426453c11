//! Repository for the `users` table.

use sqlx::PgPool;
use souschef_core::types::DbId;

use crate::models::user::{CreateUser, User};

const COLUMNS: &str = "\
    id, username, use_personal_api_key, encrypted_api_key, unit_system, \
    requirements, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a user row. Accounts are provisioned elsewhere; this exists for
    /// seeding and tests.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, use_personal_api_key, encrypted_api_key, unit_system, requirements) \
             VALUES ($1, $2, $3, COALESCE($4, 'imperial'), $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(input.use_personal_api_key)
            .bind(&input.encrypted_api_key)
            .bind(&input.unit_system)
            .bind(&input.requirements)
            .fetch_one(pool)
            .await
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use souschef_core::error::CoreError;

/// Error returned by every handler.
///
/// Domain failures arrive as [`CoreError`]; the rest are HTTP or storage
/// concerns. The response body is always `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Status, machine-readable code and client-facing message.
type ErrorParts = (StatusCode, &'static str, String);

/// Details of 5xx errors are logged, never returned.
fn internal(detail: &dyn std::fmt::Display) -> ErrorParts {
    tracing::error!(error = %detail, "Request failed with an internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn core_parts(err: &CoreError) -> ErrorParts {
    let (status, code) = match err {
        CoreError::NotFound { entity, id } => {
            return (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            )
        }
        CoreError::Internal(msg) => return internal(msg),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        CoreError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CoreError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
    };
    let message = match err {
        CoreError::Validation(m)
        | CoreError::Conflict(m)
        | CoreError::Unauthorized(m)
        | CoreError::Forbidden(m)
        | CoreError::RateLimited(m) => m.clone(),
        other => other.to_string(),
    };
    (status, code, message)
}

/// `RowNotFound` is a 404 and a unique violation on a `uq_*` constraint is
/// a 409. Anything else is a 500.
fn sqlx_parts(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            match db_err.constraint() {
                Some(constraint) if constraint.starts_with("uq_") => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                ),
                _ => internal(db_err),
            }
        }
        other => internal(other),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = match &self {
            AppError::Core(core) => core_parts(core),
            AppError::Database(err) => sqlx_parts(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        (status, axum::Json(ErrorBody { error, code })).into_response()
    }
}

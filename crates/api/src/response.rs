//! Shared response envelope.
//!
//! Successful API responses are wrapped as `{ "data": ... }`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

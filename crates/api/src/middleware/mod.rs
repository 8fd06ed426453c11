//! Request extractors and middleware.
//!
//! - [`auth::AuthUser`] -- authenticated user from a Bearer token.
//! - [`auth::WsUser`] -- authenticated user from a `?token=` query parameter.
//! - [`rate_limit`] -- per-IP and shared-key request limiters.

pub mod auth;
pub mod rate_limit;

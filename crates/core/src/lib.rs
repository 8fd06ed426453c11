//! Domain types and pure logic shared by every souschef crate.
//!
//! This crate has no internal dependencies so the database layer, the
//! provider client, the pipeline and the HTTP server can all build on it.

pub mod crypto;
pub mod error;
pub mod generation;
pub mod recipe;
pub mod storage;
pub mod tags;
pub mod types;

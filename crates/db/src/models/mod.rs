//! Row structs and DTOs, one module per table family.

pub mod history;
pub mod recipe;
pub mod tag;
pub mod user;

//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Helpers that must join an
//! open transaction take `&mut PgConnection` instead.

pub mod history_repo;
pub mod recipe_repo;
pub mod tag_repo;
pub mod user_repo;

pub use history_repo::HistoryRepo;
pub use recipe_repo::RecipeRepo;
pub use tag_repo::TagRepo;
pub use user_repo::UserRepo;

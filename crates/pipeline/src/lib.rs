//! Asynchronous recipe generation.
//!
//! [`GenerationOrchestrator`] drives one run per draft recipe: a text stage
//! producing the structured recipe, then an image stage, both under a single
//! deadline. Text failures roll the draft back; image failures leave a
//! recipe without an image.

pub mod credentials;
pub mod error;
pub mod job;
pub mod orchestrator;
mod stages;
pub mod tags;

pub use credentials::CredentialResolver;
pub use error::GenerationError;
pub use job::GenerationJob;
pub use orchestrator::{GenerationConfig, GenerationHandle, GenerationOrchestrator, RunOutcome};
pub use tags::TagAssociator;

//! Generation run constants, stage names, event names and prompt validation.

use std::time::Duration;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Run defaults
// ---------------------------------------------------------------------------

/// Wall-clock deadline covering both stages of a run.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Hard cap on provider attempts per call, first attempt included.
pub const MAX_PROVIDER_ATTEMPTS: u32 = 5;
/// Fixed wait between attempts after a transient provider failure.
pub const PROVIDER_RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Longest prompt a user may submit.
pub const MAX_PROMPT_LENGTH: usize = 1000;
/// Days a soft-deleted recipe stays restorable before it is purged.
pub const DEFAULT_TRASH_GRACE_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The two provider-backed stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Text,
    Image,
}

impl GenerationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event types published on the bus when a run finishes.
pub mod events {
    /// Text and image both persisted.
    pub const GENERATION_COMPLETED: &str = "recipe.generation.completed";
    /// Text persisted, image missing.
    pub const GENERATION_PARTIAL: &str = "recipe.generation.partial";
    /// Draft rolled back.
    pub const GENERATION_FAILED: &str = "recipe.generation.failed";
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject empty or oversized prompts before a draft is created.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    let len = trimmed.chars().count();
    if len > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt is {len} characters, maximum is {MAX_PROMPT_LENGTH}"
        )));
    }
    Ok(())
}

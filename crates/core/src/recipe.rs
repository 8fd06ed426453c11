//! Recipe definition produced by the text stage, plus unit-system handling.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Unit system
// ---------------------------------------------------------------------------

/// Measurement system a recipe is written in.
///
/// Stored as lowercase text (`"metric"` / `"imperial"`), which is also the
/// enum exposed in the structured-output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

/// Every value accepted by [`UnitSystem::from_name`].
pub const VALID_UNIT_SYSTEMS: &[&str] = &["metric", "imperial"];

impl UnitSystem {
    /// Parse from the database / wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            other => Err(CoreError::Validation(format!(
                "Invalid unit system '{other}'. Must be one of: {}",
                VALID_UNIT_SYSTEMS.join(", ")
            ))),
        }
    }

    /// Database / wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Wording used when asking the model for a recipe.
    pub fn prompt_label(self) -> &'static str {
        match self {
            Self::Metric => "Metric",
            Self::Imperial => "US Customary",
        }
    }
}

/// Per-user settings that shape the text-generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPreferences {
    pub unit_system: UnitSystem,
    /// Free-text dietary requirements; blank means none.
    pub requirements: Option<String>,
}

impl GenerationPreferences {
    /// Requirements with surrounding whitespace removed, `None` when blank.
    pub fn requirements(&self) -> Option<&str> {
        self.requirements
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Recipe definition
// ---------------------------------------------------------------------------

/// Units the model may use for an ingredient amount.
pub const INGREDIENT_UNITS: &[&str] = &[
    "grams",
    "ml",
    "cups",
    "pieces",
    "teaspoons",
    "tablespoons",
    "ounces",
    "pounds",
    "pinch",
    "dash",
    "quarts",
    "gallons",
    "liters",
];

/// A single ingredient line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub unit: String,
    pub amount: f64,
}

/// Structured recipe returned by the text-generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDef {
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    /// Total preparation time in minutes.
    pub cook_time: i32,
    pub image_prompt: String,
    pub unit_system: UnitSystem,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub linked_recipe_suggestions: Vec<String>,
}

/// Check that a generated definition carries every field a populated recipe
/// must have.
pub fn validate_recipe_def(def: &RecipeDef) -> Result<(), CoreError> {
    let mut missing = Vec::new();
    if def.title.trim().is_empty() {
        missing.push("title");
    }
    if def.ingredients.is_empty() {
        missing.push("ingredients");
    }
    if def.instructions.is_empty() {
        missing.push("instructions");
    }
    if def.image_prompt.trim().is_empty() {
        missing.push("image_prompt");
    }
    if def.cook_time < 0 {
        missing.push("cook_time");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Missing required recipe fields: {}",
            missing.join(", ")
        )))
    }
}

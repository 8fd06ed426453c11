//! Request construction and structured-output handling for recipe text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use souschef_core::recipe::{
    validate_recipe_def, GenerationPreferences, RecipeDef, INGREDIENT_UNITS, VALID_UNIT_SYSTEMS,
};

use crate::error::ProviderError;

/// Name under which the recipe schema is declared to the provider.
pub const RECIPE_SCHEMA_NAME: &str = "recipe";

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A fully formed recipe-generation request.
#[derive(Debug, Clone)]
pub struct RecipeRequest {
    pub messages: Vec<ChatMessage>,
    /// JSON schema the reply must satisfy.
    pub response_schema: Value,
    /// Number of results requested.
    pub n: u32,
}

impl RecipeRequest {
    /// Build the request for a user prompt under the user's preferences.
    pub fn for_prompt(prompt: &str, prefs: &GenerationPreferences) -> Self {
        let mut system = String::from(
            "You are a recipe assistant that writes precise, home-cookable recipes. \
             Prefer homemade components over pre-packaged products. \
             Reply only with the recipe; add no commentary.",
        );
        system.push_str(&format!(
            " Express every amount in {} units.",
            prefs.unit_system.prompt_label()
        ));
        if let Some(requirements) = prefs.requirements() {
            system.push_str(&format!(
                " Strictly follow these dietary requirements: [{requirements}]."
            ));
        }

        let user = format!(
            "Recipe request (if empty or unrelated to food, choose a dish yourself): [{}]",
            prompt.trim()
        );

        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            response_schema: recipe_schema(),
            n: 1,
        }
    }
}

/// JSON schema of [`RecipeDef`] in strict structured-output form.
pub fn recipe_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "title", "ingredients", "instructions", "cook_time", "image_prompt",
            "unit_system", "hashtags", "linked_recipe_suggestions"
        ],
        "properties": {
            "title": { "type": "string", "description": "Recipe title" },
            "ingredients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "unit", "amount"],
                    "properties": {
                        "name": { "type": "string" },
                        "unit": { "type": "string", "enum": INGREDIENT_UNITS },
                        "amount": { "type": "number" }
                    }
                }
            },
            "instructions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Ordered preparation steps"
            },
            "cook_time": { "type": "integer", "description": "Total time in minutes" },
            "image_prompt": {
                "type": "string",
                "description": "Prompt for an illustrative photo of the finished dish"
            },
            "unit_system": { "type": "string", "enum": VALID_UNIT_SYSTEMS },
            "hashtags": { "type": "array", "items": { "type": "string" } },
            "linked_recipe_suggestions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Companion dishes that go well with this recipe"
            }
        }
    })
}

/// Parse the model's reply content into a [`RecipeDef`].
pub fn parse_recipe_content(content: &str) -> Result<RecipeDef, ProviderError> {
    if content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    let def: RecipeDef = serde_json::from_str(content)
        .map_err(|e| ProviderError::SchemaViolation(e.to_string()))?;
    validate_recipe_def(&def).map_err(|e| ProviderError::SchemaViolation(e.to_string()))?;
    Ok(def)
}

//! In-memory fakes for driving the orchestrator without Postgres, S3 or a
//! real provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use souschef_core::recipe::{Ingredient, RecipeDef, UnitSystem};
use souschef_core::storage::{ImageStore, StorageError};
use souschef_core::types::DbId;
use souschef_db::models::history::NewHistoryEntry;
use souschef_db::models::recipe::{CreateRecipe, Recipe};
use souschef_db::models::tag::Tag;
use souschef_db::models::user::User;
use souschef_db::store::{RecipeStore, StoreError};
use souschef_events::EventBus;
use souschef_pipeline::{CredentialResolver, GenerationConfig, GenerationOrchestrator};
use souschef_provider::{ApiCredential, GenerationProvider, ProviderError, RecipeRequest};
use sqlx::types::Json;

// ---------------------------------------------------------------------------
// Recipe store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    next_id: DbId,
    recipes: HashMap<DbId, Recipe>,
    history: HashMap<DbId, Vec<NewHistoryEntry>>,
    tags: Vec<Tag>,
    recipe_tags: HashMap<DbId, Vec<DbId>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    pub fail_tag_creation: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Delay applied inside `update_recipe_def` before the write lands.
    pub update_delay: Mutex<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn recipe(&self, id: DbId) -> Option<Recipe> {
        self.state.lock().unwrap().recipes.get(&id).cloned()
    }

    pub fn history(&self, id: DbId) -> Vec<NewHistoryEntry> {
        self.state
            .lock()
            .unwrap()
            .history
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tag_count(&self) -> usize {
        self.state.lock().unwrap().tags.len()
    }

    /// Hashtags linked to the recipe, sorted.
    pub fn tags_for(&self, id: DbId) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .recipe_tags
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|tag_id| state.tags.iter().find(|t| t.id == *tag_id))
            .map(|t| t.hashtag.clone())
            .collect();
        names.sort();
        names
    }

    pub async fn draft(&self, owner: DbId) -> Recipe {
        self.create_recipe(&CreateRecipe {
            created_by: owner,
            forked_from_id: None,
        })
        .await
        .unwrap()
    }
}

#[async_trait]
impl RecipeStore for InMemoryStore {
    async fn create_recipe(&self, input: &CreateRecipe) -> Result<Recipe, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let now = chrono::Utc::now();
        let recipe = Recipe {
            id: state.next_id,
            title: None,
            ingredients: Json(Vec::new()),
            instructions: Vec::new(),
            cook_time: None,
            unit_system: None,
            image_prompt: None,
            link_suggestions: Vec::new(),
            image_url: None,
            forked_from_id: input.forked_from_id,
            created_by: input.created_by,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.recipes.insert(recipe.id, recipe.clone());
        state.history.insert(recipe.id, Vec::new());
        Ok(recipe)
    }

    async fn find_recipe(&self, id: DbId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.recipe(id))
    }

    async fn update_recipe_def(
        &self,
        id: DbId,
        def: &RecipeDef,
        entry: &NewHistoryEntry,
    ) -> Result<Recipe, StoreError> {
        let delay = *self.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        let recipe = state
            .recipes
            .get_mut(&id)
            .ok_or(StoreError::RecipeNotFound(id))?;
        recipe.title = Some(def.title.clone());
        recipe.ingredients = Json(def.ingredients.clone());
        recipe.instructions = def.instructions.clone();
        recipe.cook_time = Some(def.cook_time);
        recipe.unit_system = Some(def.unit_system.as_str().to_string());
        recipe.image_prompt = Some(def.image_prompt.clone());
        recipe.link_suggestions = def.linked_recipe_suggestions.clone();
        let updated = recipe.clone();
        state.history.entry(id).or_default().push(entry.clone());
        Ok(updated)
    }

    async fn update_recipe_image_url(&self, id: DbId, url: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let recipe = state
            .recipes
            .get_mut(&id)
            .ok_or(StoreError::RecipeNotFound(id))?;
        recipe.image_url = Some(url.to_string());
        Ok(())
    }

    async fn delete_recipe(&self, id: DbId) -> Result<bool, StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("delete disabled".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.history.remove(&id);
        state.recipe_tags.remove(&id);
        Ok(state.recipes.remove(&id).is_some())
    }

    async fn find_tag_by_name(&self, hashtag: &str) -> Result<Option<Tag>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.tags.iter().find(|t| t.hashtag == hashtag).cloned())
    }

    async fn create_tag(&self, hashtag: &str) -> Result<Tag, StoreError> {
        if self.fail_tag_creation.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("tag creation disabled".into()));
        }
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.tags.iter().find(|t| t.hashtag == hashtag) {
            return Ok(existing.clone());
        }
        let tag = Tag {
            id: state.tags.len() as DbId + 1,
            hashtag: hashtag.to_string(),
            created_at: chrono::Utc::now(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn replace_recipe_tags(
        &self,
        recipe_id: DbId,
        tag_ids: &[DbId],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.recipe_tags.insert(recipe_id, tag_ids.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Image store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryImageStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_uploads: AtomicBool,
}

impl InMemoryImageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload_image(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "bucket unavailable".into(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("https://images.test/{key}"))
    }

    async fn delete_image(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Scripted behaviour of one provider call.
#[derive(Clone)]
pub enum Step<T> {
    Succeed(T),
    Fail(fn() -> ProviderError),
    /// Never completes.
    Hang,
    /// Completes successfully after a delay.
    Delay(Duration, T),
}

impl<T: Clone> Step<T> {
    async fn run(&self) -> Result<T, ProviderError> {
        match self {
            Self::Succeed(value) => Ok(value.clone()),
            Self::Fail(make) => Err(make()),
            Self::Hang => std::future::pending().await,
            Self::Delay(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
        }
    }
}

pub struct ScriptedProvider {
    text: Step<RecipeDef>,
    image: Step<Vec<u8>>,
    pub text_calls: AtomicU32,
    pub image_calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(text: Step<RecipeDef>, image: Step<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            text,
            image,
            text_calls: AtomicU32::new(0),
            image_calls: AtomicU32::new(0),
        })
    }

    pub fn text_calls(&self) -> u32 {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> u32 {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate_recipe(
        &self,
        _request: &RecipeRequest,
        _credential: &ApiCredential,
    ) -> Result<RecipeDef, ProviderError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text.run().await
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _credential: &ApiCredential,
    ) -> Result<Vec<u8>, ProviderError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image.run().await
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn unauthorized() -> ProviderError {
    ProviderError::Authorization {
        body: "invalid api key".into(),
    }
}

pub fn exhausted() -> ProviderError {
    ProviderError::RetriesExhausted {
        attempts: 5,
        last: Box::new(ProviderError::Unhandled("503".into())),
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const OWNER_ID: DbId = 7;

pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

/// 3 ingredients, 4 instructions, 2 hashtags, 15 minutes.
pub fn vegan_lunch() -> RecipeDef {
    let ingredient = |name: &str, unit: &str, amount: f64| Ingredient {
        name: name.into(),
        unit: unit.into(),
        amount,
    };
    RecipeDef {
        title: "Chickpea Avocado Smash".into(),
        ingredients: vec![
            ingredient("chickpeas", "grams", 240.0),
            ingredient("avocado", "pieces", 1.0),
            ingredient("lemon juice", "tablespoons", 1.0),
        ],
        instructions: vec![
            "Drain and rinse the chickpeas".into(),
            "Mash chickpeas with avocado".into(),
            "Season with lemon juice and salt".into(),
            "Serve on toasted bread".into(),
        ],
        cook_time: 15,
        image_prompt: "A chickpea avocado smash on toast".into(),
        unit_system: UnitSystem::Metric,
        hashtags: vec!["#Vegan".into(), "Quick Lunch".into()],
        linked_recipe_suggestions: vec!["Green smoothie".into()],
    }
}

pub fn user() -> User {
    User {
        id: OWNER_ID,
        username: "cook".into(),
        use_personal_api_key: false,
        encrypted_api_key: None,
        unit_system: "metric".into(),
        requirements: Some("vegan".into()),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub images: Arc<InMemoryImageStore>,
    pub provider: Arc<ScriptedProvider>,
    pub events: Arc<EventBus>,
    pub orchestrator: GenerationOrchestrator,
}

pub fn harness(provider: Arc<ScriptedProvider>, timeout: Duration) -> Harness {
    harness_with(InMemoryStore::new(), InMemoryImageStore::new(), provider, timeout)
}

pub fn harness_with(
    store: Arc<InMemoryStore>,
    images: Arc<InMemoryImageStore>,
    provider: Arc<ScriptedProvider>,
    timeout: Duration,
) -> Harness {
    let events = Arc::new(EventBus::default());
    let orchestrator = GenerationOrchestrator::new(
        store.clone(),
        images.clone(),
        provider.clone(),
        CredentialResolver::new(Some("sk-platform".into()), None),
        Arc::clone(&events),
        GenerationConfig { timeout },
    );
    Harness {
        store,
        images,
        provider,
        events,
        orchestrator,
    }
}

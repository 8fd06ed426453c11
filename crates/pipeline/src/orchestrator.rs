//! The generation orchestrator.
//!
//! A run moves `Draft -> TextGenerating -> ImageGenerating -> Complete`.
//! A text failure or a deadline hit before the text is stored ends in
//! `RolledBack` / `TimedOut` with the draft deleted. An image failure ends in
//! `CompleteWithoutImage` with the text kept.
//!
//! Every task of every run is spawned on the orchestrator's [`TaskTracker`]
//! under a child of its root [`CancellationToken`], so
//! [`GenerationOrchestrator::shutdown`] stops and awaits all of them.

use std::sync::Arc;
use std::time::Duration;

use souschef_core::generation::{GenerationStage, DEFAULT_GENERATION_TIMEOUT};
use souschef_core::storage::{image_key, ImageStore};
use souschef_core::types::DbId;
use souschef_db::models::recipe::Recipe;
use souschef_db::models::user::User;
use souschef_db::store::RecipeStore;
use souschef_events::{EventBus, PlatformEvent};
use souschef_provider::GenerationProvider;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::credentials::CredentialResolver;
use crate::error::GenerationError;
use crate::job::GenerationJob;
use crate::stages::{self, RunDeps};
use crate::tags::TagAssociator;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Deadline covering both stages of a run.
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl GenerationConfig {
    /// Load from environment variables.
    ///
    /// | Env var                   | Default |
    /// |---------------------------|---------|
    /// | `GENERATION_TIMEOUT_SECS` | `300`   |
    pub fn from_env() -> Self {
        let timeout = std::env::var("GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GENERATION_TIMEOUT);
        Self { timeout }
    }
}

// ---------------------------------------------------------------------------
// Outcome and handle
// ---------------------------------------------------------------------------

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Text and image stored.
    Complete { image_url: String },
    /// Text stored; the image stage failed, timed out or could not be saved.
    CompleteWithoutImage { reason: String },
    /// The text stage failed; the draft was deleted.
    RolledBack { reason: String },
    /// The deadline passed before the text was stored; the draft was deleted.
    TimedOut,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete { .. } => "complete",
            Self::CompleteWithoutImage { .. } => "complete_without_image",
            Self::RolledBack { .. } => "rolled_back",
            Self::TimedOut => "timed_out",
        }
    }

    /// Whether the recipe survives the run.
    pub fn recipe_kept(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::CompleteWithoutImage { .. })
    }
}

/// Returned by [`GenerationOrchestrator::run_generation`]. Dropping it does
/// not affect the run.
pub struct GenerationHandle {
    recipe_id: DbId,
    join: JoinHandle<RunOutcome>,
}

impl GenerationHandle {
    pub fn recipe_id(&self) -> DbId {
        self.recipe_id
    }

    /// Wait for the run to finish. `None` if the supervisor task panicked.
    pub async fn outcome(self) -> Option<RunOutcome> {
        self.join.await.ok()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct GenerationOrchestrator {
    deps: Arc<RunDeps>,
    credentials: CredentialResolver,
    events: Arc<EventBus>,
    config: GenerationConfig,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        images: Arc<dyn ImageStore>,
        provider: Arc<dyn GenerationProvider>,
        credentials: CredentialResolver,
        events: Arc<EventBus>,
        config: GenerationConfig,
    ) -> Self {
        let tracker = TaskTracker::new();
        let deps = Arc::new(RunDeps {
            tags: TagAssociator::new(Arc::clone(&store)),
            store,
            images,
            provider,
            tracker: tracker.clone(),
        });
        Self {
            deps,
            credentials,
            events,
            config,
            tracker,
            cancel: CancellationToken::new(),
        }
    }

    /// Start generating content for `draft` and return immediately.
    ///
    /// The credential is resolved here, once; a resolution failure rolls the
    /// draft back like any other text-stage failure.
    pub fn run_generation(&self, draft: &Recipe, user: &User, prompt: &str) -> GenerationHandle {
        let recipe_id = draft.id;
        let owner_id = draft.created_by;

        let job = self.credentials.resolve(user).map(|credential| {
            GenerationJob::new(
                recipe_id,
                owner_id,
                user.preferences(),
                prompt,
                credential,
                self.config.timeout,
            )
        });

        let run = Run {
            deps: Arc::clone(&self.deps),
            events: Arc::clone(&self.events),
            recipe_id,
            owner_id,
            cancel: self.cancel.child_token(),
        };

        let span = tracing::info_span!("generation", recipe_id, user_id = owner_id);
        let join = self.tracker.spawn(run.supervise(job).instrument(span));
        GenerationHandle { recipe_id, join }
    }

    /// Number of live tasks across all runs.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every run and wait for all tasks to finish.
    pub async fn shutdown(&self) {
        tracing::info!(active = self.tracker.len(), "Stopping generation runs");
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

// ---------------------------------------------------------------------------
// Run supervisor
// ---------------------------------------------------------------------------

/// State owned by one run's supervisor.
struct Run {
    deps: Arc<RunDeps>,
    events: Arc<EventBus>,
    recipe_id: DbId,
    owner_id: DbId,
    /// Cancels both stages of this run only.
    cancel: CancellationToken,
}

impl Run {
    async fn supervise(self, job: Result<GenerationJob, GenerationError>) -> RunOutcome {
        let job = match job {
            Ok(job) => Arc::new(job),
            Err(e) => return self.roll_back(e, None).await,
        };
        let deadline = job.deadline;

        tracing::info!(state = "text_generating", "Generation started");
        let (text_tx, text_rx) = oneshot::channel();
        let (image_tx, image_rx) = oneshot::channel();
        let text_task = self.deps.tracker.spawn(
            stages::text_stage(
                Arc::clone(&self.deps),
                job,
                self.cancel.clone(),
                text_tx,
                image_tx,
            )
            .in_current_span(),
        );

        let recipe = match timeout_at(deadline, text_rx).await {
            Ok(Ok(Ok(recipe))) => recipe,
            Ok(Ok(Err(e))) => return self.roll_back(e, Some(text_task)).await,
            Ok(Err(_)) => return self.roll_back(GenerationError::Cancelled, Some(text_task)).await,
            Err(_) => {
                let err = GenerationError::Timeout(GenerationStage::Text);
                return self.roll_back(err, Some(text_task)).await;
            }
        };

        tracing::info!(
            state = "image_generating",
            title = recipe.title.as_deref().unwrap_or_default(),
            "Recipe text stored",
        );

        let bytes = match timeout_at(deadline, image_rx).await {
            Ok(Ok(Ok(bytes))) => bytes,
            Ok(Ok(Err(e))) => return self.finish_without_image(e),
            Ok(Err(_)) => return self.finish_without_image(GenerationError::Cancelled),
            Err(_) => {
                return self.finish_without_image(GenerationError::Timeout(GenerationStage::Image))
            }
        };

        match self.store_image(bytes).await {
            Ok(image_url) => self.complete(image_url),
            Err(e) => self.finish_without_image(e),
        }
    }

    /// Upload under the recipe's deterministic key, then record the URL.
    async fn store_image(&self, bytes: Vec<u8>) -> Result<String, GenerationError> {
        let key = image_key(self.recipe_id);
        let url = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = self.deps.images.upload_image(bytes, &key) => result?,
        };
        self.deps
            .store
            .update_recipe_image_url(self.recipe_id, &url)
            .await?;
        Ok(url)
    }

    fn complete(&self, image_url: String) -> RunOutcome {
        tracing::info!(state = "complete", %image_url, "Generation complete");
        self.events
            .publish(PlatformEvent::generation_completed(self.recipe_id, self.owner_id));
        RunOutcome::Complete { image_url }
    }

    fn finish_without_image(&self, err: GenerationError) -> RunOutcome {
        self.cancel.cancel();
        let reason = err.to_string();
        tracing::warn!(
            state = "complete_without_image",
            stage = "image",
            error = %err,
            "Generation finished without an image",
        );
        self.events.publish(PlatformEvent::generation_partial(
            self.recipe_id,
            self.owner_id,
            &reason,
        ));
        RunOutcome::CompleteWithoutImage { reason }
    }

    /// Stop both stages, wait for the text task so nothing writes after the
    /// delete, then remove the draft. A failed delete is logged only.
    async fn roll_back(&self, err: GenerationError, text_task: Option<JoinHandle<()>>) -> RunOutcome {
        self.cancel.cancel();
        if let Some(task) = text_task {
            if let Err(e) = task.await {
                tracing::error!(stage = "text", error = %e, "Text task ended abnormally");
            }
        }

        match self.deps.store.delete_recipe(self.recipe_id).await {
            Ok(true) => tracing::debug!("Draft deleted"),
            Ok(false) => tracing::debug!("Draft already absent"),
            Err(e) => tracing::error!(error = %e, "Failed to delete draft during rollback"),
        }

        let outcome = match err {
            GenerationError::Timeout(_) => RunOutcome::TimedOut,
            _ => RunOutcome::RolledBack {
                reason: err.to_string(),
            },
        };
        tracing::warn!(
            state = outcome.as_str(),
            stage = "text",
            error = %err,
            "Generation rolled back",
        );
        self.events.publish(PlatformEvent::generation_failed(
            self.recipe_id,
            self.owner_id,
            &err.to_string(),
        ));
        outcome
    }
}

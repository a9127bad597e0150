//! Engine facade: holds a manifest and a prompter, resolves scripts on demand.

use std::sync::Arc;
use std::time::Instant;

use askflow_types::{AskflowError, Result, ResultTree};

use crate::directive::{classify_all, Directive};
use crate::events::{EventEmitter, ResolutionEvent};
use crate::manifest::Manifest;
use crate::prompter::{ConsolePrompter, Prompter};
use crate::resolver::{Resolver, ResolverConfig};
use crate::script::ScriptEntry;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Long-lived question engine. Cheap to share; every [`Engine::ask`] call gets
/// its own result tree.
pub struct Engine {
    manifest: Manifest,
    prompter: Arc<dyn Prompter>,
    config: ResolverConfig,
    events: Option<EventEmitter>,
}

/// Options form of the constructor: a raw manifest plus an optional prompter.
pub struct EngineOptions {
    pub manifest: serde_json::Value,
    pub prompter: Option<Arc<dyn Prompter>>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl Engine {
    /// Create an engine that prompts on the console.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            prompter: Arc::new(ConsolePrompter::stdio()),
            config: ResolverConfig::default(),
            events: None,
        }
    }

    /// Validate a raw manifest and create a console engine for it.
    pub fn from_value(manifest: serde_json::Value) -> Result<Self> {
        Ok(Self::new(Manifest::from_value(manifest)?))
    }

    pub fn from_options(options: EngineOptions) -> Result<Self> {
        let engine = Self::from_value(options.manifest)?;
        Ok(match options.prompter {
            Some(prompter) => engine.with_prompter(prompter),
            None => engine,
        })
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn prompter(&self) -> &Arc<dyn Prompter> {
        &self.prompter
    }

    /// Check and classify a script without prompting.
    ///
    /// Fails with `ValidationError` on an empty list or any malformed entry.
    pub fn prepare(&self, script: &[ScriptEntry]) -> Result<Vec<Directive>> {
        if script.is_empty() {
            return Err(AskflowError::ValidationError("No questions were found".into()));
        }
        classify_all(script)
    }

    /// Ask every question in `script`, in order, and return the answers.
    pub async fn ask(&self, script: &[ScriptEntry]) -> Result<ResultTree> {
        let directives = self.prepare(script)?;
        self.ask_directives(&directives).await
    }

    /// Resolve an already classified directive list.
    pub async fn ask_directives(&self, directives: &[Directive]) -> Result<ResultTree> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        tracing::info!(run_id = %run_id, directives = directives.len(), "Resolution started");
        self.emit(ResolutionEvent::ResolutionStarted {
            run_id: run_id.clone(),
            directives: directives.len(),
        });

        let resolver = Resolver::new(&self.manifest, self.prompter.as_ref(), &self.config)
            .with_events(self.events.as_ref());
        match resolver.resolve(directives).await {
            Ok(tree) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let answered = tree.answer_count();
                tracing::info!(run_id = %run_id, answered, duration_ms, "Resolution completed");
                self.emit(ResolutionEvent::ResolutionCompleted {
                    run_id,
                    answered,
                    duration_ms,
                });
                Ok(tree)
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Resolution failed");
                self.emit(ResolutionEvent::ResolutionFailed {
                    run_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn emit(&self, event: ResolutionEvent) {
        if let Some(ref events) = self.events {
            events.emit(event);
        }
    }
}

// ---------------------------------------------------------------------------
// One-shot helpers
// ---------------------------------------------------------------------------

/// Resolve `script` against `manifest` on the console without keeping an engine.
pub async fn prompt(manifest: serde_json::Value, script: &[ScriptEntry]) -> Result<ResultTree> {
    Engine::from_value(manifest)?.ask(script).await
}

/// Like [`prompt`], with an explicit prompter.
pub async fn prompt_with(
    manifest: serde_json::Value,
    script: &[ScriptEntry],
    prompter: Arc<dyn Prompter>,
) -> Result<ResultTree> {
    Engine::from_options(EngineOptions {
        manifest,
        prompter: Some(prompter),
    })?
    .ask(script)
    .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Reload orchestrator - main entry point of the viewer component
//!
//! Coordinates:
//! - Change decision for incoming viewer state
//! - Manifest load and canvas/sequence resolution
//! - Renderer resolution, configuration merge and theme injection
//! - Renderer instantiation and the single active-renderer slot
//!
//! Each full reload is a [`PipelineRun`] with its own generation and
//! cancellation token. Starting a run cancels the previous one; results that
//! arrive for an older generation are dropped without side effects.

use crate::{
    change::{self, ChangeDecision},
    config::{
        select_transport, ConfigMerger, DocumentConfigSource, InMemorySessionCache, MergedConfig,
    },
    events::{names, ComponentEvent, EventBus, EventEmitter, EventRecord},
    fetch::DocumentFetcher,
    manifest::{IiifManifestLoader, LoadRequest, ManifestHandle, ManifestLoader},
    registry::{ExtensionDescriptor, ExtensionRegistry},
    renderer::{Renderer, RendererContext},
    resolver::{self, StructureSummary},
    surface::{HeadlessSurface, RenderSurface},
    theme::{DocumentHead, StylesheetHost, ThemeLink},
    Error, PipelineState, Result, ViewerField, ViewerSettings, ViewerState,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// One full reload
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub generation: u64,
    cancel: CancellationToken,
}

/// Result of a successful pipeline run
#[derive(Debug, Clone)]
pub struct Activation {
    pub generation: u64,
    pub renderer: String,
    pub config: MergedConfig,
    pub stylesheet: ThemeLink,
    /// False when the stylesheet was already present
    pub stylesheet_inserted: bool,
}

/// What [`Orchestrator::set`] did
#[derive(Debug, Clone)]
pub enum SetOutcome {
    /// Full pipeline ran and a renderer is active
    Activated(Activation),
    /// State merged into the active renderer in place
    Updated { changed: Vec<ViewerField> },
    /// A newer run started before this one finished
    Superseded,
}

struct RunState {
    generation: u64,
    state: PipelineState,
    cancel: Option<CancellationToken>,
}

struct ActiveRenderer {
    renderer: Box<dyn Renderer>,
    context: RendererContext,
}

/// Viewer component orchestrating the reload pipeline
pub struct Orchestrator {
    settings: ViewerSettings,
    registry: Arc<ExtensionRegistry>,
    loader: Arc<dyn ManifestLoader>,
    merger: ConfigMerger,
    stylesheets: Arc<dyn StylesheetHost>,
    surface: Arc<dyn RenderSurface>,
    /// Bus shared with the active renderer
    bus: EventBus,
    /// Events fired to the host
    emitter: Arc<EventEmitter>,
    run: Mutex<RunState>,
    state_tx: watch::Sender<PipelineState>,
    /// At most one renderer alive at a time
    active: Mutex<Option<ActiveRenderer>>,
    tracking_label: RwLock<Option<String>>,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        settings: ViewerSettings,
        registry: ExtensionRegistry,
        loader: Arc<dyn ManifestLoader>,
        merger: ConfigMerger,
        stylesheets: Arc<dyn StylesheetHost>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);

        Self {
            settings,
            registry: Arc::new(registry),
            loader,
            merger,
            stylesheets,
            surface,
            bus: EventBus::new(),
            emitter: Arc::new(EventEmitter::default()),
            run: Mutex::new(RunState {
                generation: 0,
                state: PipelineState::Idle,
                cancel: None,
            }),
            state_tx,
            active: Mutex::new(None),
            tracking_label: RwLock::new(None),
        }
    }

    /// Orchestrator over IIIF manifests, document-backed configuration and an
    /// in-memory document head and surface
    pub fn with_defaults(settings: ViewerSettings, registry: ExtensionRegistry) -> Result<Self> {
        let fetcher = DocumentFetcher::new(&settings)?;
        let merger = ConfigMerger::new(
            Arc::new(DocumentConfigSource::new(fetcher.clone())),
            Arc::new(InMemorySessionCache::new()),
            select_transport(&settings, fetcher.clone()),
        );

        Ok(Self::new(
            settings,
            registry,
            Arc::new(IiifManifestLoader::new(fetcher)),
            merger,
            Arc::new(DocumentHead::new()),
            Arc::new(HeadlessSurface::new()),
        ))
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Get current pipeline state
    pub async fn state(&self) -> PipelineState {
        self.run.lock().await.state
    }

    /// Generation of the most recent run
    pub async fn generation(&self) -> u64 {
        self.run.lock().await.generation
    }

    /// Subscribe to pipeline state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to events fired to the host
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventRecord> {
        self.emitter.subscribe()
    }

    /// Publish on the component bus
    pub fn publish(&self, event: &str, payload: Option<Value>) {
        self.bus.publish(event, payload);
    }

    /// Subscribe on the component bus; dropped at the next reload
    pub fn subscribe<F>(&self, event: &str, handler: F) -> crate::events::SubscriptionToken
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.bus.subscribe(event, handler)
    }

    /// Viewer state of the active renderer
    pub async fn current_state(&self) -> Option<ViewerState> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.context.state.clone())
    }

    /// One field of the active renderer's state
    pub async fn get(&self, field: ViewerField) -> Option<Value> {
        self.active
            .lock()
            .await
            .as_ref()
            .and_then(|a| a.context.state.field_value(field))
    }

    /// Registry name of the active renderer
    pub async fn renderer_name(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|a| a.context.name.clone())
    }

    /// `"<label>, URI: <resource>"` from the last loaded manifest
    pub async fn tracking_label(&self) -> Option<String> {
        self.tracking_label.read().await.clone()
    }

    pub async fn resize(&self) {
        if let Some(active) = self.active.lock().await.as_mut() {
            active.renderer.resize(&active.context);
        }
    }

    pub async fn exit_full_screen(&self) {
        if let Some(active) = self.active.lock().await.as_mut() {
            active.renderer.exit_full_screen(&active.context);
        }
    }

    /// Apply new viewer state: full reload or in-place update
    #[instrument(skip(self, incoming), fields(uri = %incoming.resource_uri))]
    pub async fn set(&self, mut incoming: ViewerState) -> Result<SetOutcome> {
        incoming.normalize_root();

        {
            let mut active = self.active.lock().await;
            let decision = change::decide(active.as_ref().map(|a| &a.context.state), &incoming);

            match decision {
                ChangeDecision::Update { changed } => {
                    if let Some(active) = active.as_mut() {
                        debug!(?changed, "Updating renderer in place");
                        active.context.state = incoming;
                        active.renderer.render(&active.context);
                    }
                    return Ok(SetOutcome::Updated { changed });
                }
                ChangeDecision::Reload { changed } => {
                    info!(?changed, "Reload-triggering change");
                }
                ChangeDecision::FirstLoad => {
                    if incoming.resource_uri.is_empty() {
                        drop(active);
                        return Err(self.report(Error::MissingResourceReference));
                    }
                }
            }
        }

        self.reload(incoming).await
    }

    /// Clone the active state, apply `f` and [`set`](Self::set) the result
    pub async fn update<F>(&self, f: F) -> Result<SetOutcome>
    where
        F: FnOnce(&mut ViewerState),
    {
        let mut state = self.current_state().await.ok_or(Error::NoActiveRenderer)?;
        f(&mut state);
        self.set(state).await
    }

    /// Run the full pipeline for `state`
    #[instrument(skip(self, state), fields(uri = %state.resource_uri))]
    pub async fn reload(&self, state: ViewerState) -> Result<SetOutcome> {
        let run = self.begin_run().await;

        match self.run_pipeline(&run, state).await {
            Ok(Some(activation)) => Ok(SetOutcome::Activated(activation)),
            Ok(None) => {
                debug!(generation = run.generation, "Pipeline run superseded");
                Ok(SetOutcome::Superseded)
            }
            Err(err) => match self.fail(&run, err).await {
                Some(err) => Err(err),
                None => Ok(SetOutcome::Superseded),
            },
        }
    }

    /// Tear down the previous run and renderer, then enter `LoadingManifest`
    async fn begin_run(&self) -> PipelineRun {
        let mut run_state = self.run.lock().await;

        if let Some(previous) = run_state.cancel.take() {
            previous.cancel();
        }
        run_state.generation += 1;
        let run = PipelineRun {
            generation: run_state.generation,
            cancel: CancellationToken::new(),
        };
        run_state.cancel = Some(run.cancel.clone());

        self.bus.dispose_all();
        let emitter = self.emitter.clone();
        self.bus.subscribe(names::RELOAD, move |payload| {
            emitter.emit(ComponentEvent::Reload {
                state: payload.cloned(),
            });
        });

        if let Some(mut previous) = self.active.lock().await.take() {
            previous.renderer.dispose();
            info!(renderer = %previous.context.name, "Renderer discarded");
        }
        *self.tracking_label.write().await = None;

        self.surface.clear();
        self.surface.set_loading(true);

        if run_state.state != PipelineState::Idle {
            self.apply_transition(&mut run_state, PipelineState::Idle, true);
        }
        self.apply_transition(&mut run_state, PipelineState::LoadingManifest, false);

        info!(generation = run.generation, "Pipeline run started");
        run
    }

    async fn run_pipeline(&self, run: &PipelineRun, state: ViewerState) -> Result<Option<Activation>> {
        // LoadingManifest
        let request = LoadRequest::from_state(&state);
        let loaded = self.stage(run, self.loader.load(&request)).await.map_err(|e| match e {
            Error::ManifestLoad(_) => e,
            other => Error::ManifestLoad(other.to_string()),
        })?;
        let Some(manifest) = loaded else {
            return Ok(None);
        };

        if let Some(label) = manifest.tracking_label() {
            let label = format!("{}, URI: {}", label, state.resource_uri);
            debug!(label = %label, "Tracking label");
            *self.tracking_label.write().await = Some(label);
        }

        // ResolvingCanvas
        if !self.advance(run, PipelineState::ResolvingCanvas).await? {
            return Ok(None);
        }
        if let Some(index) = state.sequence_index {
            if manifest.sequence_by_index(index).is_none() {
                return Err(Error::SequenceNotFound(index));
            }
        }
        let canvas = manifest
            .canvas_by_index(state.canvas_index)
            .ok_or(Error::CanvasNotFound(state.canvas_index))?;

        // ResolvingExtension
        if !self.advance(run, PipelineState::ResolvingExtension).await? {
            return Ok(None);
        }
        let structure = StructureSummary::new(manifest.structural_range_count());
        let descriptor = resolver::resolve(&canvas, structure, &self.registry);
        info!(renderer = %descriptor.name, canvas = %canvas.id, "Renderer selected");

        // Configuring
        if !self.advance(run, PipelineState::Configuring).await? {
            return Ok(None);
        }
        let Some(config) = self.stage(run, self.merger.merge(&descriptor.name, &state)).await? else {
            return Ok(None);
        };

        // Theming
        if !self.advance(run, PipelineState::Theming).await? {
            return Ok(None);
        }
        let theme = config.theme().unwrap_or(self.settings.default_theme.as_str());
        let link = ThemeLink::new(&state.root, theme, &descriptor.name, state.locale());
        let Some(inserted) = self
            .stage(run, async { Ok(self.stylesheets.inject(&link).await) })
            .await?
        else {
            return Ok(None);
        };

        // Instantiating
        if !self.advance(run, PipelineState::Instantiating).await? {
            return Ok(None);
        }
        self.instantiate(run, &descriptor, state, config, manifest, link, inserted)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn instantiate(
        &self,
        run: &PipelineRun,
        descriptor: &ExtensionDescriptor,
        state: ViewerState,
        config: MergedConfig,
        manifest: Arc<dyn ManifestHandle>,
        stylesheet: ThemeLink,
        stylesheet_inserted: bool,
    ) -> Result<Option<Activation>> {
        let mut run_state = self.run.lock().await;
        if run_state.generation != run.generation {
            return Ok(None);
        }

        let mut renderer = (descriptor.factory)();
        let context = RendererContext {
            bus: self.bus.clone(),
            config: config.clone(),
            manifest,
            name: descriptor.name.clone(),
            state,
        };
        renderer.create(&context);
        *self.active.lock().await = Some(ActiveRenderer { renderer, context });

        self.apply_transition(&mut run_state, PipelineState::Active, false);
        run_state.cancel = None;
        drop(run_state);

        self.surface.set_loading(false);
        self.bus.publish(names::CREATED, Some(Value::String(descriptor.name.clone())));
        self.emitter.emit(ComponentEvent::Created {
            renderer: descriptor.name.clone(),
            generation: run.generation,
        });

        Ok(Some(Activation {
            generation: run.generation,
            renderer: descriptor.name.clone(),
            config,
            stylesheet,
            stylesheet_inserted,
        }))
    }

    /// Await one external call, racing it against cancellation of `run`
    async fn stage<T, F>(&self, run: &PipelineRun, fut: F) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let outcome = tokio::select! {
            biased;
            _ = run.cancel.cancelled() => return Ok(None),
            outcome = fut => outcome,
        };

        if self.run.lock().await.generation != run.generation {
            return Ok(None);
        }
        outcome.map(Some)
    }

    /// Move the current run to `next`; false when the run was superseded
    async fn advance(&self, run: &PipelineRun, next: PipelineState) -> Result<bool> {
        let mut run_state = self.run.lock().await;
        if run_state.generation != run.generation {
            return Ok(false);
        }

        let current = run_state.state;
        if !current.can_transition_to(next) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        self.apply_transition(&mut run_state, next, false);
        Ok(true)
    }

    fn apply_transition(&self, run_state: &mut RunState, next: PipelineState, forced: bool) {
        let from = run_state.state;
        run_state.state = next;
        let _ = self.state_tx.send(next);
        self.emitter.emit(ComponentEvent::StateChanged { from, to: next });

        if forced {
            debug!(from = %from, to = %next, "State reset");
        } else {
            info!(from = %from, to = %next, generation = run_state.generation, "State transition");
        }
    }

    /// Terminate the current run with `err`; `None` if the run was superseded
    async fn fail(&self, run: &PipelineRun, err: Error) -> Option<Error> {
        let mut run_state = self.run.lock().await;
        if run_state.generation != run.generation {
            return None;
        }

        warn!(generation = run.generation, code = err.error_code(), error = %err, "Pipeline run failed");
        if run_state.state.can_transition_to(PipelineState::Error) {
            self.apply_transition(&mut run_state, PipelineState::Error, false);
        }
        run_state.cancel = None;

        self.emit_error(&err);
        self.surface.set_loading(false);

        if run_state.state != PipelineState::Idle {
            self.apply_transition(&mut run_state, PipelineState::Idle, false);
        }
        Some(err)
    }

    /// Surface an error that occurs before any run starts
    fn report(&self, err: Error) -> Error {
        warn!(code = err.error_code(), error = %err, "Rejected viewer state");
        self.emit_error(&err);
        err
    }

    fn emit_error(&self, err: &Error) {
        self.bus.publish(names::ERROR, Some(Value::String(err.to_string())));
        self.emitter.emit(ComponentEvent::Error {
            code: err.error_code().to_string(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererCalls;

    fn orchestrator() -> Orchestrator {
        let registry = ExtensionRegistry::headless(Arc::new(RendererCalls::default()));
        Orchestrator::with_defaults(ViewerSettings::default(), registry).unwrap()
    }

    #[tokio::test]
    async fn test_orchestrator_creation() {
        let orchestrator = orchestrator();
        assert_eq!(orchestrator.state().await, PipelineState::Idle);
        assert_eq!(orchestrator.generation().await, 0);
        assert!(orchestrator.current_state().await.is_none());
        assert!(orchestrator.get(ViewerField::Rotation).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_resource_is_reported() {
        let orchestrator = orchestrator();
        let mut events = orchestrator.subscribe_events();

        let err = orchestrator.set(ViewerState::default()).await.unwrap_err();
        assert!(matches!(err, Error::MissingResourceReference));
        assert_eq!(orchestrator.state().await, PipelineState::Idle);
        assert_eq!(orchestrator.generation().await, 0);

        let record = events.try_recv().unwrap();
        assert!(matches!(record.event, ComponentEvent::Error { ref code, .. } if code == "MISSING_RESOURCE"));
    }

    #[tokio::test]
    async fn test_update_without_renderer() {
        let orchestrator = orchestrator();
        let err = orchestrator.update(|s| s.rotation = 90).await.unwrap_err();
        assert!(matches!(err, Error::NoActiveRenderer));
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let orchestrator = orchestrator();
        let stale = orchestrator.begin_run().await;
        let current = orchestrator.begin_run().await;
        assert_eq!(current.generation, stale.generation + 1);
        let mut events = orchestrator.subscribe_events();

        // Same generation as the superseded run, but its cancellation never fired
        let uncancelled = PipelineRun {
            generation: stale.generation,
            cancel: CancellationToken::new(),
        };
        let late = orchestrator.stage(&uncancelled, async { Ok(1) }).await.unwrap();
        assert!(late.is_none());
        assert!(!orchestrator
            .advance(&uncancelled, PipelineState::ResolvingCanvas)
            .await
            .unwrap());

        assert_eq!(orchestrator.state().await, PipelineState::LoadingManifest);
        assert!(events.try_recv().is_err());

        let fresh = orchestrator.stage(&current, async { Ok(2) }).await.unwrap();
        assert_eq!(fresh, Some(2));
        assert!(orchestrator
            .advance(&current, PipelineState::ResolvingCanvas)
            .await
            .unwrap());
        assert_eq!(orchestrator.state().await, PipelineState::ResolvingCanvas);
    }
}

//! Renderer seam
//!
//! A renderer is constructed by its descriptor's factory, receives a
//! [`RendererContext`] from the orchestrator and is then started with
//! [`Renderer::create`]. The orchestrator keeps the context; renderers
//! borrow it on every call.

use crate::{config::MergedConfig, events::EventBus, manifest::ManifestHandle, ViewerState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// State handed to a renderer on instantiation
#[derive(Clone)]
pub struct RendererContext {
    /// Component event bus, the renderer's channel back to the component
    pub bus: EventBus,
    pub config: MergedConfig,
    pub manifest: Arc<dyn ManifestHandle>,
    /// Registry name of the renderer
    pub name: String,
    pub state: ViewerState,
}

impl std::fmt::Debug for RendererContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererContext")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Presentation module driven by the orchestrator
pub trait Renderer: Send {
    /// Startup routine, invoked once after the context is attached
    fn create(&mut self, ctx: &RendererContext);

    /// Re-render after an in-place state update
    fn render(&mut self, ctx: &RendererContext);

    fn resize(&mut self, ctx: &RendererContext);

    fn exit_full_screen(&mut self, ctx: &RendererContext);

    /// Called when the renderer is discarded by a reload
    fn dispose(&mut self) {}
}

/// Renderer constructor
pub type RendererFactory = Arc<dyn Fn() -> Box<dyn Renderer> + Send + Sync>;

/// Lifecycle call counters shared between a headless renderer and its observer
#[derive(Debug, Default)]
pub struct RendererCalls {
    pub created: AtomicUsize,
    pub rendered: AtomicUsize,
    pub resized: AtomicUsize,
    pub full_screen_exits: AtomicUsize,
    pub disposed: AtomicUsize,
}

impl RendererCalls {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::SeqCst)
    }

    pub fn resized(&self) -> usize {
        self.resized.load(Ordering::SeqCst)
    }

    pub fn full_screen_exits(&self) -> usize {
        self.full_screen_exits.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Renderer without a UI; logs and counts lifecycle calls
pub struct HeadlessRenderer {
    calls: Arc<RendererCalls>,
}

impl HeadlessRenderer {
    pub fn new(calls: Arc<RendererCalls>) -> Self {
        Self { calls }
    }

    /// Factory producing headless renderers that share one set of counters
    pub fn factory(calls: Arc<RendererCalls>) -> RendererFactory {
        Arc::new(move || Box::new(HeadlessRenderer::new(calls.clone())) as Box<dyn Renderer>)
    }
}

impl Renderer for HeadlessRenderer {
    fn create(&mut self, ctx: &RendererContext) {
        self.calls.created.fetch_add(1, Ordering::SeqCst);
        info!(
            renderer = %ctx.name,
            canvas = ctx.state.canvas_index,
            theme = ctx.config.theme().unwrap_or("-"),
            "Headless renderer created"
        );
    }

    fn render(&mut self, ctx: &RendererContext) {
        self.calls.rendered.fetch_add(1, Ordering::SeqCst);
        debug!(
            renderer = %ctx.name,
            canvas = ctx.state.canvas_index,
            rotation = ctx.state.rotation,
            "Headless render"
        );
    }

    fn resize(&mut self, _ctx: &RendererContext) {
        self.calls.resized.fetch_add(1, Ordering::SeqCst);
    }

    fn exit_full_screen(&mut self, _ctx: &RendererContext) {
        self.calls.full_screen_exits.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&mut self) {
        self.calls.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

//! Folio Core - Content Viewer Component
//!
//! This crate provides the core of an embeddable viewer for IIIF resources:
//! - Reload-vs-update decision for incoming viewer state
//! - Manifest loading (IIIF Presentation 2 and 3)
//! - Content-type to renderer resolution
//! - Layered renderer configuration with session caching
//! - Theme stylesheet injection
//! - A single active renderer, replaced on every reload
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Folio Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Manifest   │  │   Renderer   │  │    Config    │           │
//! │  │    Loader    │  │   Resolver   │  │    Merger    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Reload    │                              │
//! │                    │ Orchestrator│                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Theme     │  │    Event    │  │   Renderer   │            │
//! │  │  Stylesheets │  │     Bus     │  │   Registry   │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod fetch;
pub mod manifest;
pub mod registry;
pub mod renderer;
pub mod resolver;
pub mod config;
pub mod theme;
pub mod events;
pub mod change;
pub mod surface;
pub mod orchestrator;

pub use error::{Error, Result};
pub use types::*;
pub use fetch::{DocumentFetcher, Location};
pub use manifest::{IiifManifestLoader, LoadRequest, ManifestHandle, ManifestLoader};
pub use registry::{ContentKey, ExtensionDescriptor, ExtensionRegistry, RendererKind};
pub use renderer::{HeadlessRenderer, Renderer, RendererCalls, RendererContext, RendererFactory};
pub use resolver::{resolve, StructureSummary};
pub use config::{ConfigMerger, MergedConfig};
pub use theme::{DocumentHead, StylesheetHost, ThemeLink};
pub use events::{ComponentEvent, EventBus, EventEmitter, EventRecord};
pub use change::ChangeDecision;
pub use surface::{HeadlessSurface, RenderSurface};
pub use orchestrator::{Activation, Orchestrator, PipelineRun, SetOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the viewer library
pub fn init() {
    tracing::info!(version = VERSION, "Folio Core initialized");
}

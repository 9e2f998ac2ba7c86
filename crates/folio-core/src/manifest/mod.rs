//! Manifest loading seam
//!
//! The orchestrator only needs a narrow view of a loaded manifest: sequence and
//! canvas lookup by index, the number of structural ranges and a tracking
//! label. Loaders produce that view behind [`ManifestHandle`].

mod iiif;

pub use iiif::{IiifManifest, IiifManifestLoader};

use crate::{Result, ViewerState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Content body attached to a canvas annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationBody {
    /// Declared media type, e.g. `application/pdf`
    pub format: Option<String>,
    /// Declared resource type, e.g. `Sound`
    pub resource_type: Option<String>,
}

/// Content annotation on a canvas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub body: Vec<AnnotationBody>,
}

/// One presentable unit (page, timeline) within a sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,
    /// Canvas's own declared type
    pub resource_type: Option<String>,
    /// Canvas's own raw `format` property
    pub format: Option<String>,
    pub content: Vec<Annotation>,
}

impl Canvas {
    /// First body of the first content annotation, if any
    pub fn first_body(&self) -> Option<&AnnotationBody> {
        self.content.first().and_then(|a| a.body.first())
    }
}

/// Ordered run of canvases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub canvases: Vec<Canvas>,
}

/// Opaque result of a successful manifest load
pub trait ManifestHandle: Send + Sync {
    fn sequence_by_index(&self, index: usize) -> Option<Sequence>;

    fn canvas_by_index(&self, index: usize) -> Option<Canvas>;

    fn structural_range_count(&self) -> usize;

    fn tracking_label(&self) -> Option<String>;
}

/// Everything a loader needs to locate the requested manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub resource_uri: String,
    pub collection_index: Option<usize>,
    pub manifest_index: usize,
    pub sequence_index: usize,
    pub canvas_index: usize,
    pub range_id: Option<String>,
    pub locale: Option<String>,
}

impl LoadRequest {
    pub fn from_state(state: &ViewerState) -> Self {
        Self {
            resource_uri: state.resource_uri.clone(),
            collection_index: state.collection_index,
            manifest_index: state.manifest_index,
            sequence_index: state.sequence_index.unwrap_or(0),
            canvas_index: state.canvas_index,
            range_id: state.range_id.clone(),
            locale: state.locales.first().map(|l| l.name.clone()),
        }
    }
}

/// Trait for manifest loaders
#[async_trait]
pub trait ManifestLoader: Send + Sync {
    /// Load the manifest described by `request`
    async fn load(&self, request: &LoadRequest) -> Result<Arc<dyn ManifestHandle>>;
}

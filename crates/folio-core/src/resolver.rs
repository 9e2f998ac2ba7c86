//! Renderer resolution for a canvas
//!
//! Order, first match wins:
//! 1. first content body: declared format, then declared type
//! 2. no content at all: canvas type, then canvas `format` property
//! 3. an audio/video match on a manifest without ranges becomes the media-element renderer
//! 4. the registry's default binding

use crate::manifest::Canvas;
use crate::registry::{ExtensionDescriptor, ExtensionRegistry, RendererKind};
use tracing::debug;

/// Structural facts about the manifest that affect resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureSummary {
    pub range_count: usize,
}

impl StructureSummary {
    pub fn new(range_count: usize) -> Self {
        Self { range_count }
    }

    pub fn has_ranges(&self) -> bool {
        self.range_count > 0
    }
}

/// Pick the renderer descriptor for `canvas`
pub fn resolve(
    canvas: &Canvas,
    structure: StructureSummary,
    registry: &ExtensionRegistry,
) -> ExtensionDescriptor {
    let matched = match_content(canvas, registry).map(|d| {
        if d.kind == RendererKind::Av && !structure.has_ranges() {
            debug!("No ranges, substituting media-element renderer");
            registry.find_by_kind(RendererKind::MediaElement)
        } else {
            Some(d)
        }
    });

    let descriptor = matched
        .flatten()
        .unwrap_or_else(|| registry.default_descriptor());

    debug!(canvas = %canvas.id, renderer = %descriptor.name, "Renderer resolved");
    descriptor.clone()
}

fn match_content<'a>(canvas: &Canvas, registry: &'a ExtensionRegistry) -> Option<&'a ExtensionDescriptor> {
    if !canvas.content.is_empty() {
        let body = canvas.first_body()?;
        return body
            .format
            .as_deref()
            .and_then(|f| registry.lookup_str(f))
            .or_else(|| body.resource_type.as_deref().and_then(|t| registry.lookup_str(t)));
    }

    canvas
        .resource_type
        .as_deref()
        .and_then(|t| registry.lookup_str(t))
        .or_else(|| canvas.format.as_deref().and_then(|f| registry.lookup_str(f)))
}

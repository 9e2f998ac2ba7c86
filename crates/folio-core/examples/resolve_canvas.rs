//! Renderer resolution example
//!
//! Parses a small IIIF Presentation 3 manifest and shows which renderer each
//! canvas resolves to.
//!
//! Run with: cargo run -p folio-core --example resolve_canvas

use folio_core::manifest::{IiifManifest, ManifestHandle};
use folio_core::{resolve, ExtensionRegistry, RendererCalls, StructureSummary, ThemeLink};
use serde_json::json;
use std::sync::Arc;

fn main() {
    println!("Folio Core - Renderer Resolution Example");
    println!("========================================\n");

    let manifest = json!({
        "id": "https://example.org/iiif/book1/manifest",
        "type": "Manifest",
        "items": [
            {
                "id": "https://example.org/iiif/book1/canvas/p1",
                "type": "Canvas",
                "items": [{ "type": "AnnotationPage", "items": [{
                    "type": "Annotation",
                    "body": { "type": "Image", "format": "image/jpeg" }
                }]}]
            },
            {
                "id": "https://example.org/iiif/book1/canvas/p2",
                "type": "Canvas",
                "items": [{ "type": "AnnotationPage", "items": [{
                    "type": "Annotation",
                    "body": { "type": "Text", "format": "application/pdf" }
                }]}]
            },
            {
                "id": "https://example.org/iiif/book1/canvas/p3",
                "type": "Canvas",
                "items": [{ "type": "AnnotationPage", "items": [{
                    "type": "Annotation",
                    "body": { "type": "Video", "format": "video/mp4" }
                }]}]
            }
        ]
    });

    let manifest = IiifManifest::from_json(&manifest, 0);
    let registry = ExtensionRegistry::headless(Arc::new(RendererCalls::default()));
    let structure = StructureSummary::new(manifest.structural_range_count());

    println!("Structural ranges: {}\n", structure.range_count);

    let mut index = 0;
    while let Some(canvas) = manifest.canvas_by_index(index) {
        let descriptor = resolve(&canvas, structure, &registry);
        let link = ThemeLink::new("./folio", "uv-en-gb-theme", &descriptor.name, "en-GB");

        println!("Canvas {}: {}", index, canvas.id);
        println!("  Renderer:   {}", descriptor.name);
        println!("  Stylesheet: {}", link.href);
        println!();
        index += 1;
    }
}

//! CLI command implementations

use crate::output;
use anyhow::Context;
use console::style;
use folio_core::{
    resolve as resolve_canvas, DocumentFetcher, Error, ExtensionRegistry, IiifManifestLoader,
    LoadRequest, ManifestHandle, ManifestLoader, Orchestrator, RendererCalls, SetOutcome,
    StructureSummary, ViewerSettings, ViewerState,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

fn headless_registry() -> ExtensionRegistry {
    ExtensionRegistry::headless(Arc::new(RendererCalls::default()))
}

#[derive(Debug, Serialize)]
struct Resolution {
    resource: String,
    canvas: String,
    canvas_index: usize,
    body_format: Option<String>,
    body_type: Option<String>,
    ranges: usize,
    renderer: String,
    tracking_label: Option<String>,
}

/// Resolve the renderer for one canvas
pub async fn resolve(request: &LoadRequest, format: &str) -> anyhow::Result<()> {
    let fetcher = DocumentFetcher::new(&ViewerSettings::default())?;
    let loader = IiifManifestLoader::new(fetcher);
    let manifest = loader.load(request).await?;

    manifest
        .sequence_by_index(request.sequence_index)
        .ok_or(Error::SequenceNotFound(request.sequence_index))?;
    let canvas = manifest
        .canvas_by_index(request.canvas_index)
        .ok_or(Error::CanvasNotFound(request.canvas_index))?;

    let structure = StructureSummary::new(manifest.structural_range_count());
    let descriptor = resolve_canvas(&canvas, structure, &headless_registry());
    let body = canvas.first_body();

    let resolution = Resolution {
        resource: request.resource_uri.clone(),
        canvas: canvas.id.clone(),
        canvas_index: request.canvas_index,
        body_format: body.and_then(|b| b.format.clone()),
        body_type: body.and_then(|b| b.resource_type.clone()),
        ranges: structure.range_count,
        renderer: descriptor.name.clone(),
        tracking_label: manifest.tracking_label(),
    };

    output::emit(&resolution, format, |r| {
        println!("{}", style("Renderer Resolution").bold());
        println!("  Resource:  {}", r.resource);
        println!("  Canvas:    {} ({})", r.canvas_index, r.canvas);
        println!("  Format:    {}", r.body_format.as_deref().unwrap_or("-"));
        println!("  Type:      {}", r.body_type.as_deref().unwrap_or("-"));
        println!("  Ranges:    {}", r.ranges);
        println!("  Renderer:  {}", style(&r.renderer).green());
        if let Some(label) = &r.tracking_label {
            println!("  Label:     {}", label);
        }
    })
}

#[derive(Debug, Serialize)]
struct ActivationReport {
    generation: u64,
    renderer: String,
    stylesheet_id: String,
    stylesheet_href: String,
    stylesheet_inserted: bool,
    tracking_label: Option<String>,
    config: Value,
}

/// Run the full pipeline against headless renderers
pub async fn activate(state: ViewerState, cors_enabled: bool, format: &str) -> anyhow::Result<()> {
    let settings = ViewerSettings {
        cors_enabled,
        ..Default::default()
    };
    let orchestrator = Orchestrator::with_defaults(settings, headless_registry())?;

    let resource = state.resource_uri.clone();
    let outcome = orchestrator
        .set(state)
        .await
        .with_context(|| format!("Activation failed for {}", resource))?;

    let SetOutcome::Activated(activation) = outcome else {
        anyhow::bail!("Pipeline did not activate a renderer");
    };

    let report = ActivationReport {
        generation: activation.generation,
        renderer: activation.renderer,
        stylesheet_id: activation.stylesheet.id,
        stylesheet_href: activation.stylesheet.href,
        stylesheet_inserted: activation.stylesheet_inserted,
        tracking_label: orchestrator.tracking_label().await,
        config: activation.config.into_value(),
    };

    output::emit(&report, format, |r| {
        println!("{}", style("Activation").bold());
        println!("  Renderer:   {}", style(&r.renderer).green());
        println!("  Generation: {}", r.generation);
        println!("  Stylesheet: {} -> {}", r.stylesheet_id, r.stylesheet_href);
        if let Some(label) = &r.tracking_label {
            println!("  Label:      {}", label);
        }
        println!("\n{}", style("Merged configuration").bold());
        println!(
            "{}",
            serde_json::to_string_pretty(&r.config).unwrap_or_else(|_| r.config.to_string())
        );
    })
}

#[derive(Debug, Serialize, Tabled)]
struct Binding {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Renderer")]
    renderer: String,
}

/// List the built-in content-type bindings
pub fn keys(format: &str) -> anyhow::Result<()> {
    let registry = headless_registry();
    let bindings: Vec<Binding> = registry
        .bindings()
        .into_iter()
        .map(|(key, descriptor)| Binding {
            key: key.to_string(),
            renderer: descriptor.name.clone(),
        })
        .collect();

    output::emit(&bindings, format, |rows| {
        println!("{}", Table::new(rows).with(Style::rounded()));
    })
}

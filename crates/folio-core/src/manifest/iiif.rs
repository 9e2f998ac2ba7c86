//! IIIF Presentation 2/3 manifest adapter
//!
//! Reads only what the resolver consumes:
//! - Collections (sub-collection by collection index, manifest by manifest index)
//! - Sequences and canvases
//! - Painting annotation bodies (`format`, `type`)
//! - Structural ranges and tracking label

use super::{Annotation, AnnotationBody, Canvas, LoadRequest, ManifestHandle, ManifestLoader, Sequence};
use crate::{fetch::DocumentFetcher, Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Loader for IIIF Presentation documents
pub struct IiifManifestLoader {
    fetcher: DocumentFetcher,
}

impl IiifManifestLoader {
    pub fn new(fetcher: DocumentFetcher) -> Self {
        Self { fetcher }
    }

    async fn fetch(&self, uri: &str) -> Result<Value> {
        self.fetcher
            .fetch_json(uri)
            .await
            .map_err(|e| Error::ManifestLoad(format!("{}: {}", uri, e)))
    }

    /// Walk from a collection down to the requested manifest document
    async fn resolve_manifest(&self, request: &LoadRequest, mut doc: Value) -> Result<Value> {
        if !is_collection(&doc) {
            return Ok(doc);
        }

        if let Some(index) = request.collection_index {
            let sub = collection_members(&doc, "Collection")
                .into_iter()
                .nth(index)
                .ok_or_else(|| Error::ManifestLoad(format!("Collection {} not found", index)))?;
            doc = self.expand(sub).await?;
        }

        let member = collection_members(&doc, "Manifest")
            .into_iter()
            .nth(request.manifest_index)
            .ok_or_else(|| {
                Error::ManifestLoad(format!("Manifest {} not found", request.manifest_index))
            })?;
        self.expand(member).await
    }

    /// Embedded members without content are references that must be fetched
    async fn expand(&self, member: Value) -> Result<Value> {
        let has_content = ["items", "sequences", "manifests", "collections", "members"]
            .iter()
            .any(|k| member.get(k).is_some());
        if has_content {
            return Ok(member);
        }
        let id = resource_id(&member)
            .ok_or_else(|| Error::ManifestLoad("Collection member has no id".to_string()))?;
        debug!(id = %id, "Fetching collection member");
        self.fetch(&id).await
    }
}

#[async_trait]
impl ManifestLoader for IiifManifestLoader {
    #[instrument(skip(self), fields(uri = %request.resource_uri))]
    async fn load(&self, request: &LoadRequest) -> Result<Arc<dyn ManifestHandle>> {
        let doc = self.fetch(&request.resource_uri).await?;
        let doc = self.resolve_manifest(request, doc).await?;
        let manifest = IiifManifest::from_json(&doc, request.sequence_index);

        info!(
            sequences = manifest.sequences.len(),
            ranges = manifest.range_count,
            "Manifest loaded"
        );

        Ok(Arc::new(manifest))
    }
}

/// Loaded IIIF manifest
#[derive(Debug, Clone, Default)]
pub struct IiifManifest {
    pub sequences: Vec<Sequence>,
    /// Sequence that canvas lookups index into
    pub current_sequence: usize,
    pub range_count: usize,
    pub tracking_label: Option<String>,
}

impl IiifManifest {
    pub fn from_json(doc: &Value, current_sequence: usize) -> Self {
        let sequences = match doc.get("sequences").and_then(Value::as_array) {
            Some(seqs) => seqs.iter().map(parse_v2_sequence).collect(),
            None => vec![Sequence {
                id: resource_id(doc).unwrap_or_default(),
                canvases: array(doc, "items").iter().map(parse_v3_canvas).collect(),
            }],
        };

        Self {
            sequences,
            current_sequence,
            range_count: array(doc, "structures").len(),
            tracking_label: tracking_label(doc),
        }
    }
}

impl ManifestHandle for IiifManifest {
    fn sequence_by_index(&self, index: usize) -> Option<Sequence> {
        self.sequences.get(index).cloned()
    }

    fn canvas_by_index(&self, index: usize) -> Option<Canvas> {
        self.sequences
            .get(self.current_sequence)
            .and_then(|s| s.canvases.get(index))
            .cloned()
    }

    fn structural_range_count(&self) -> usize {
        self.range_count
    }

    fn tracking_label(&self) -> Option<String> {
        self.tracking_label.clone()
    }
}

fn parse_v2_sequence(seq: &Value) -> Sequence {
    Sequence {
        id: resource_id(seq).unwrap_or_default(),
        canvases: array(seq, "canvases").iter().map(parse_v2_canvas).collect(),
    }
}

fn parse_v2_canvas(canvas: &Value) -> Canvas {
    let annotations = array(canvas, "images")
        .iter()
        .chain(array(canvas, "content").iter())
        .map(|anno| Annotation {
            body: bodies(anno.get("resource").or_else(|| anno.get("body"))),
        })
        .collect();

    Canvas {
        id: resource_id(canvas).unwrap_or_default(),
        resource_type: resource_type(canvas),
        format: string_field(canvas, "format"),
        content: annotations,
    }
}

fn parse_v3_canvas(canvas: &Value) -> Canvas {
    let annotations = array(canvas, "items")
        .iter()
        .flat_map(|page| array(page, "items").iter())
        .map(|anno| Annotation {
            body: bodies(anno.get("body")),
        })
        .collect();

    Canvas {
        id: resource_id(canvas).unwrap_or_default(),
        resource_type: resource_type(canvas),
        format: string_field(canvas, "format"),
        content: annotations,
    }
}

fn bodies(value: Option<&Value>) -> Vec<AnnotationBody> {
    let to_body = |v: &Value| AnnotationBody {
        format: string_field(v, "format"),
        resource_type: resource_type(v),
    };
    match value {
        Some(Value::Array(items)) => items.iter().map(to_body).collect(),
        Some(v @ Value::Object(_)) => vec![to_body(v)],
        _ => Vec::new(),
    }
}

fn is_collection(doc: &Value) -> bool {
    resource_type(doc).is_some_and(|t| t.eq_ignore_ascii_case("collection"))
}

/// Members of a collection with the given type, across v2 and v3 layouts
fn collection_members(doc: &Value, kind: &str) -> Vec<Value> {
    let v2_key = if kind == "Manifest" { "manifests" } else { "collections" };
    let mut members: Vec<Value> = array(doc, v2_key).to_vec();

    members.extend(
        array(doc, "items")
            .iter()
            .chain(array(doc, "members").iter())
            .filter(|m| resource_type(m).is_some_and(|t| t.eq_ignore_ascii_case(kind)))
            .cloned(),
    );
    members
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn resource_id(value: &Value) -> Option<String> {
    string_field(value, "id").or_else(|| string_field(value, "@id"))
}

/// Declared type with any vocabulary prefix (`sc:`, `dctypes:`) removed
fn resource_type(value: &Value) -> Option<String> {
    let raw = string_field(value, "type").or_else(|| string_field(value, "@type"))?;
    let name = raw.rsplit(':').next().unwrap_or(&raw);
    Some(name.to_string())
}

fn tracking_label(doc: &Value) -> Option<String> {
    let services = match doc.get("service") {
        Some(Value::Array(items)) => items.clone(),
        Some(v @ Value::Object(_)) => vec![v.clone()],
        _ => return None,
    };
    services.iter().find_map(|s| string_field(s, "trackingLabel"))
}

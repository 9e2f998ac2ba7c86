//! Core types for Folio

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A locale entry, e.g. `en-GB`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Locale {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

/// Locale used when a state carries no locale list
pub const DEFAULT_LOCALE: &str = "en-GB";

/// Crop region in image coordinates, written as `x,y,w,h`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Parse an optional region; the empty string means "no crop"
    pub fn parse_optional(s: &str) -> Result<Option<Region>> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(Error::InvalidRegion(s.to_string()));
        }

        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidRegion(s.to_string()))?;
        }

        Ok(Region::new(values[0], values[1], values[2], values[3]))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}

/// `Option<Region>` as its `x,y,w,h` string form
mod region_string {
    use super::Region;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(region: &Option<Region>, serializer: S) -> Result<S::Ok, S::Error> {
        match region {
            Some(region) => serializer.collect_str(region),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Region>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => Region::parse_optional(&s).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Externally supplied state for one viewing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerState {
    /// Manifest or collection URI
    pub resource_uri: String,
    /// Manifest index inside a collection; absent means the resource is not a collection
    pub collection_index: Option<usize>,
    pub manifest_index: usize,
    /// Requested sequence; absent skips the sequence check
    pub sequence_index: Option<usize>,
    pub canvas_index: usize,
    pub range_id: Option<String>,
    /// Inline configuration merged over the renderer configuration
    pub config: Option<serde_json::Value>,
    /// Remote configuration override document
    pub config_uri: Option<String>,
    pub domain: Option<String>,
    pub embed_domain: Option<String>,
    pub embed_script_uri: Option<String>,
    pub is_home_domain: bool,
    pub is_lightbox: bool,
    pub is_only_instance: bool,
    pub is_reload: bool,
    pub embedded: bool,
    pub limit_locales: bool,
    pub locales: Vec<Locale>,
    /// Asset root; configuration and themes are resolved below it
    pub root: String,
    /// Rotation in degrees
    pub rotation: i32,
    /// Crop region, written `"x,y,w,h"`; the empty string means no crop
    #[serde(with = "region_string")]
    pub xywh: Option<Region>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            resource_uri: String::new(),
            collection_index: None,
            manifest_index: 0,
            sequence_index: Some(0),
            canvas_index: 0,
            range_id: None,
            config: None,
            config_uri: None,
            domain: None,
            embed_domain: None,
            embed_script_uri: None,
            is_home_domain: false,
            is_lightbox: false,
            is_only_instance: false,
            is_reload: false,
            embedded: false,
            limit_locales: false,
            locales: vec![Locale::default()],
            root: "./folio".to_string(),
            rotation: 0,
            xywh: None,
        }
    }
}

impl ViewerState {
    /// Create a state for the given resource with default settings
    pub fn for_resource(resource_uri: impl Into<String>) -> Self {
        Self {
            resource_uri: resource_uri.into(),
            ..Default::default()
        }
    }

    /// Primary locale name
    pub fn locale(&self) -> &str {
        self.locales
            .first()
            .map(|l| l.name.as_str())
            .unwrap_or(DEFAULT_LOCALE)
    }

    /// Strip a trailing `/` from the root path
    pub fn normalize_root(&mut self) {
        while self.root.len() > 1 && self.root.ends_with('/') {
            self.root.pop();
        }
    }

    /// Top-level fields whose values differ between `self` and `other`
    pub fn changed_fields(&self, other: &ViewerState) -> Vec<ViewerField> {
        let mut changed = Vec::new();
        let mut check = |field: ViewerField, differs: bool| {
            if differs {
                changed.push(field);
            }
        };

        check(ViewerField::ResourceUri, self.resource_uri != other.resource_uri);
        check(ViewerField::CollectionIndex, self.collection_index != other.collection_index);
        check(ViewerField::ManifestIndex, self.manifest_index != other.manifest_index);
        check(ViewerField::SequenceIndex, self.sequence_index != other.sequence_index);
        check(ViewerField::CanvasIndex, self.canvas_index != other.canvas_index);
        check(ViewerField::RangeId, self.range_id != other.range_id);
        check(ViewerField::Config, self.config != other.config);
        check(ViewerField::ConfigUri, self.config_uri != other.config_uri);
        check(ViewerField::Domain, self.domain != other.domain);
        check(ViewerField::EmbedDomain, self.embed_domain != other.embed_domain);
        check(ViewerField::EmbedScriptUri, self.embed_script_uri != other.embed_script_uri);
        check(ViewerField::IsHomeDomain, self.is_home_domain != other.is_home_domain);
        check(ViewerField::IsLightbox, self.is_lightbox != other.is_lightbox);
        check(ViewerField::IsOnlyInstance, self.is_only_instance != other.is_only_instance);
        check(ViewerField::IsReload, self.is_reload != other.is_reload);
        check(ViewerField::Embedded, self.embedded != other.embedded);
        check(ViewerField::LimitLocales, self.limit_locales != other.limit_locales);
        check(ViewerField::Locales, self.locales != other.locales);
        check(ViewerField::Root, self.root != other.root);
        check(ViewerField::Rotation, self.rotation != other.rotation);
        check(ViewerField::Xywh, self.xywh != other.xywh);

        changed
    }

    /// JSON value of a single field
    pub fn field_value(&self, field: ViewerField) -> Option<serde_json::Value> {
        let value = serde_json::to_value(self).ok()?;
        value.get(field.as_str()).cloned()
    }
}

/// Every top-level field of [`ViewerState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewerField {
    ResourceUri,
    CollectionIndex,
    ManifestIndex,
    SequenceIndex,
    CanvasIndex,
    RangeId,
    Config,
    ConfigUri,
    Domain,
    EmbedDomain,
    EmbedScriptUri,
    IsHomeDomain,
    IsLightbox,
    IsOnlyInstance,
    IsReload,
    Embedded,
    LimitLocales,
    Locales,
    Root,
    Rotation,
    Xywh,
}

impl ViewerField {
    /// Whether a change to this field invalidates the whole pipeline
    pub fn triggers_reload(&self) -> bool {
        match self {
            ViewerField::CollectionIndex
            | ViewerField::ManifestIndex
            | ViewerField::Config
            | ViewerField::ConfigUri
            | ViewerField::Domain
            | ViewerField::EmbedDomain
            | ViewerField::EmbedScriptUri
            | ViewerField::ResourceUri
            | ViewerField::IsHomeDomain
            | ViewerField::IsLightbox
            | ViewerField::IsOnlyInstance
            | ViewerField::IsReload
            | ViewerField::Locales
            | ViewerField::Root => true,
            ViewerField::SequenceIndex
            | ViewerField::CanvasIndex
            | ViewerField::RangeId
            | ViewerField::Embedded
            | ViewerField::LimitLocales
            | ViewerField::Rotation
            | ViewerField::Xywh => false,
        }
    }

    /// Serialized (camelCase) field name
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerField::ResourceUri => "resourceUri",
            ViewerField::CollectionIndex => "collectionIndex",
            ViewerField::ManifestIndex => "manifestIndex",
            ViewerField::SequenceIndex => "sequenceIndex",
            ViewerField::CanvasIndex => "canvasIndex",
            ViewerField::RangeId => "rangeId",
            ViewerField::Config => "config",
            ViewerField::ConfigUri => "configUri",
            ViewerField::Domain => "domain",
            ViewerField::EmbedDomain => "embedDomain",
            ViewerField::EmbedScriptUri => "embedScriptUri",
            ViewerField::IsHomeDomain => "isHomeDomain",
            ViewerField::IsLightbox => "isLightbox",
            ViewerField::IsOnlyInstance => "isOnlyInstance",
            ViewerField::IsReload => "isReload",
            ViewerField::Embedded => "embedded",
            ViewerField::LimitLocales => "limitLocales",
            ViewerField::Locales => "locales",
            ViewerField::Root => "root",
            ViewerField::Rotation => "rotation",
            ViewerField::Xywh => "xywh",
        }
    }
}

impl std::fmt::Display for ViewerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reload pipeline state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No renderer, nothing in flight
    Idle,
    LoadingManifest,
    ResolvingCanvas,
    ResolvingExtension,
    Configuring,
    Theming,
    Instantiating,
    /// A renderer owns the surface
    Active,
    /// A run failed; settles back to `Idle`
    Error,
}

impl PipelineState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, target),
            (Idle, LoadingManifest) |
            (LoadingManifest, ResolvingCanvas) | (LoadingManifest, Error) |
            (ResolvingCanvas, ResolvingExtension) | (ResolvingCanvas, Error) |
            (ResolvingExtension, Configuring) | (ResolvingExtension, Error) |
            (Configuring, Theming) | (Configuring, Error) |
            (Theming, Instantiating) | (Theming, Error) |
            (Instantiating, Active) | (Instantiating, Error) |
            (Active, Idle) |
            (Error, Idle)
        )
    }

    /// `Idle` and `Active` are the only rest states
    pub fn is_rest(&self) -> bool {
        matches!(self, PipelineState::Idle | PipelineState::Active)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::LoadingManifest => write!(f, "loading_manifest"),
            PipelineState::ResolvingCanvas => write!(f, "resolving_canvas"),
            PipelineState::ResolvingExtension => write!(f, "resolving_extension"),
            PipelineState::Configuring => write!(f, "configuring"),
            PipelineState::Theming => write!(f, "theming"),
            PipelineState::Instantiating => write!(f, "instantiating"),
            PipelineState::Active => write!(f, "active"),
            PipelineState::Error => write!(f, "error"),
        }
    }
}

/// Runtime settings of the viewer component itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Whether cross-origin requests can be made directly
    pub cors_enabled: bool,
    /// Callback name used by the script-injection transport
    pub jsonp_callback: String,
    /// Theme used when the merged configuration names none
    pub default_theme: String,
    pub user_agent: String,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10000,
            cors_enabled: true,
            jsonp_callback: "configExtensionCallback".to_string(),
            default_theme: "default-theme".to_string(),
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parse() {
        let region: Region = "10, 20,300,400".parse().unwrap();
        assert_eq!(region, Region::new(10, 20, 300, 400));
        assert_eq!(region.to_string(), "10,20,300,400");
        assert!("1,2,3".parse::<Region>().is_err());
        assert!("a,b,c,d".parse::<Region>().is_err());
        assert_eq!(Region::parse_optional("").unwrap(), None);
    }

    #[test]
    fn test_normalize_root() {
        let mut state = ViewerState {
            root: "https://cdn.example.org/folio//".to_string(),
            ..Default::default()
        };
        state.normalize_root();
        assert_eq!(state.root, "https://cdn.example.org/folio");
    }

    #[test]
    fn test_changed_fields() {
        let a = ViewerState::for_resource("https://example.org/a.json");
        let mut b = a.clone();
        assert!(a.changed_fields(&b).is_empty());

        b.rotation = 90;
        b.locales = vec![Locale::new("cy-GB")];
        assert_eq!(
            a.changed_fields(&b),
            vec![ViewerField::Locales, ViewerField::Rotation]
        );
    }

    #[test]
    fn test_reload_fields() {
        assert!(ViewerField::ResourceUri.triggers_reload());
        assert!(ViewerField::Locales.triggers_reload());
        assert!(!ViewerField::Rotation.triggers_reload());
        assert!(!ViewerField::Xywh.triggers_reload());
        assert!(!ViewerField::CanvasIndex.triggers_reload());
    }

    #[test]
    fn test_field_value_uses_serialized_names() {
        let state = ViewerState {
            rotation: 180,
            ..ViewerState::for_resource("https://example.org/m.json")
        };
        assert_eq!(state.field_value(ViewerField::Rotation), Some(180.into()));
        assert_eq!(
            state.field_value(ViewerField::ResourceUri),
            Some("https://example.org/m.json".into())
        );
    }

    #[test]
    fn test_pipeline_transitions() {
        use PipelineState::*;
        assert!(Idle.can_transition_to(LoadingManifest));
        assert!(Instantiating.can_transition_to(Active));
        assert!(Configuring.can_transition_to(Error));
        assert!(Error.can_transition_to(Idle));

        assert!(!Idle.can_transition_to(Active));
        assert!(!Active.can_transition_to(LoadingManifest));
        assert!(!Theming.can_transition_to(Configuring));
        assert!(Active.is_rest() && Idle.is_rest() && !Theming.is_rest());
    }

    #[test]
    fn test_state_deserializes_with_defaults() {
        let state: ViewerState = serde_json::from_value(serde_json::json!({
            "resourceUri": "https://example.org/m.json",
            "canvasIndex": 3
        }))
        .unwrap();
        assert_eq!(state.canvas_index, 3);
        assert_eq!(state.sequence_index, Some(0));
        assert_eq!(state.locale(), "en-GB");
    }

    #[test]
    fn test_xywh_uses_string_form() {
        let state: ViewerState = serde_json::from_value(serde_json::json!({
            "resourceUri": "https://example.org/m.json",
            "xywh": "0,0,100,100"
        }))
        .unwrap();
        assert_eq!(state.xywh, Some(Region::new(0, 0, 100, 100)));

        let cleared: ViewerState = serde_json::from_value(serde_json::json!({ "xywh": "" })).unwrap();
        assert_eq!(cleared.xywh, None);

        let value = serde_json::to_value(ViewerState {
            xywh: Some(Region::new(1, 2, 3, 4)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["xywh"], "1,2,3,4");
        assert_eq!(serde_json::to_value(ViewerState::default()).unwrap()["xywh"], "");

        let malformed = serde_json::from_value::<ViewerState>(serde_json::json!({ "xywh": "1,2,3" }));
        assert!(malformed.is_err());
    }
}

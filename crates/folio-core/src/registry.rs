//! Extension registry
//!
//! Content-type keys form a closed set ([`ContentKey`]); every key has a
//! built-in renderer binding chosen by an exhaustive match, so adding a key
//! without deciding its renderer does not compile.

use crate::renderer::{HeadlessRenderer, RendererCalls, RendererFactory};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Content-type keys: resource types, IANA media types and named aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKey {
    // Resource types
    Canvas,
    Image,
    MovingImage,
    PhysicalObject,
    Model,
    Sound,
    // Media types
    Jpeg,
    Pdf,
    Mp4,
    Webm,
    ThreeJs,
    GltfJson,
    GltfBinary,
    Mp3,
    AudioMp4,
    Hls,
    Dash,
    Epub,
    OebpsPackage,
    // Aliases
    Av,
    Video,
    Default,
}

impl ContentKey {
    pub const ALL: [ContentKey; 22] = [
        ContentKey::Canvas,
        ContentKey::Image,
        ContentKey::MovingImage,
        ContentKey::PhysicalObject,
        ContentKey::Model,
        ContentKey::Sound,
        ContentKey::Jpeg,
        ContentKey::Pdf,
        ContentKey::Mp4,
        ContentKey::Webm,
        ContentKey::ThreeJs,
        ContentKey::GltfJson,
        ContentKey::GltfBinary,
        ContentKey::Mp3,
        ContentKey::AudioMp4,
        ContentKey::Hls,
        ContentKey::Dash,
        ContentKey::Epub,
        ContentKey::OebpsPackage,
        ContentKey::Av,
        ContentKey::Video,
        ContentKey::Default,
    ];

    /// Canonical (lowercase) string form
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKey::Canvas => "canvas",
            ContentKey::Image => "image",
            ContentKey::MovingImage => "movingimage",
            ContentKey::PhysicalObject => "physicalobject",
            ContentKey::Model => "model",
            ContentKey::Sound => "sound",
            ContentKey::Jpeg => "image/jpeg",
            ContentKey::Pdf => "application/pdf",
            ContentKey::Mp4 => "video/mp4",
            ContentKey::Webm => "video/webm",
            ContentKey::ThreeJs => "application/vnd.threejs+json",
            ContentKey::GltfJson => "model/gltf+json",
            ContentKey::GltfBinary => "model/gltf-binary",
            ContentKey::Mp3 => "audio/mp3",
            ContentKey::AudioMp4 => "audio/mp4",
            ContentKey::Hls => "application/vnd.apple.mpegurl",
            ContentKey::Dash => "application/dash+xml",
            ContentKey::Epub => "application/epub+zip",
            ContentKey::OebpsPackage => "application/oebps-package+xml",
            ContentKey::Av => "av",
            ContentKey::Video => "video",
            ContentKey::Default => "default",
        }
    }

    /// Parse a declared format or type; matching ignores ASCII case
    pub fn parse(s: &str) -> Option<ContentKey> {
        let s = s.trim();
        ContentKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }

    /// Renderer bound to this key by [`ExtensionRegistry::with_builtin`]
    pub fn builtin_kind(&self) -> RendererKind {
        match self {
            ContentKey::Canvas | ContentKey::Image | ContentKey::Jpeg => RendererKind::Seadragon,
            ContentKey::MovingImage | ContentKey::Sound => RendererKind::MediaElement,
            ContentKey::PhysicalObject
            | ContentKey::Model
            | ContentKey::ThreeJs
            | ContentKey::GltfJson
            | ContentKey::GltfBinary => RendererKind::Virtex,
            ContentKey::Pdf => RendererKind::Pdf,
            ContentKey::Mp4
            | ContentKey::Webm
            | ContentKey::Mp3
            | ContentKey::AudioMp4
            | ContentKey::Hls
            | ContentKey::Dash
            | ContentKey::Av
            | ContentKey::Video => RendererKind::Av,
            ContentKey::Epub | ContentKey::OebpsPackage => RendererKind::Ebook,
            ContentKey::Default => RendererKind::Default,
        }
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation modules known to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RendererKind {
    /// Deep-zoom tiled images
    Seadragon,
    /// Plain audio/video element
    MediaElement,
    /// Audio/video with range (chapter) navigation
    Av,
    Pdf,
    /// 3D models
    Virtex,
    Ebook,
    Default,
}

impl RendererKind {
    /// Registry name; also names the renderer's config document and theme
    pub fn name(&self) -> &'static str {
        match self {
            RendererKind::Seadragon => "seadragon-extension",
            RendererKind::MediaElement => "mediaelement-extension",
            RendererKind::Av => "av-extension",
            RendererKind::Pdf => "pdf-extension",
            RendererKind::Virtex => "virtex-extension",
            RendererKind::Ebook => "ebook-extension",
            RendererKind::Default => "default-extension",
        }
    }
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Renderer constructor plus its registry name
#[derive(Clone)]
pub struct ExtensionDescriptor {
    pub kind: RendererKind,
    pub name: String,
    pub factory: RendererFactory,
}

impl ExtensionDescriptor {
    pub fn new(kind: RendererKind, factory: RendererFactory) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            factory,
        }
    }
}

impl std::fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ExtensionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

/// Content-type key to renderer descriptor table
///
/// The `Default` key always resolves: the registry cannot be built without it.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    bindings: HashMap<ContentKey, ExtensionDescriptor>,
    default: ExtensionDescriptor,
}

impl ExtensionRegistry {
    /// Create a registry holding only the fallback binding
    pub fn new(default: ExtensionDescriptor) -> Self {
        Self {
            bindings: HashMap::new(),
            default,
        }
    }

    /// Bind every key to its built-in renderer kind
    pub fn with_builtin<F>(factory_for: F) -> Self
    where
        F: Fn(RendererKind) -> RendererFactory,
    {
        let default_kind = ContentKey::Default.builtin_kind();
        let mut registry = Self::new(ExtensionDescriptor::new(default_kind, factory_for(default_kind)));

        for key in ContentKey::ALL {
            let kind = key.builtin_kind();
            registry.register(key, ExtensionDescriptor::new(kind, factory_for(kind)));
        }
        registry
    }

    /// Built-in bindings, every renderer headless
    pub fn headless(calls: Arc<RendererCalls>) -> Self {
        Self::with_builtin(|_| HeadlessRenderer::factory(calls.clone()))
    }

    /// Insert or overwrite a binding; last write wins
    pub fn register(&mut self, key: ContentKey, descriptor: ExtensionDescriptor) {
        if key == ContentKey::Default {
            self.default = descriptor;
        } else {
            self.bindings.insert(key, descriptor);
        }
    }

    pub fn lookup(&self, key: ContentKey) -> Option<&ExtensionDescriptor> {
        match key {
            ContentKey::Default => Some(&self.default),
            _ => self.bindings.get(&key),
        }
    }

    /// Look up a declared format or type string
    pub fn lookup_str(&self, key: &str) -> Option<&ExtensionDescriptor> {
        ContentKey::parse(key).and_then(|k| self.lookup(k))
    }

    pub fn default_descriptor(&self) -> &ExtensionDescriptor {
        &self.default
    }

    /// First bound descriptor of the given kind, in key order
    pub fn find_by_kind(&self, kind: RendererKind) -> Option<&ExtensionDescriptor> {
        self.bindings()
            .into_iter()
            .map(|(_, d)| d)
            .find(|d| d.kind == kind)
    }

    /// All bindings in key order
    pub fn bindings(&self) -> Vec<(ContentKey, &ExtensionDescriptor)> {
        ContentKey::ALL
            .iter()
            .filter_map(|k| self.lookup(*k).map(|d| (*k, d)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::headless(Arc::new(RendererCalls::default()))
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ContentKey::parse("Application/PDF"), Some(ContentKey::Pdf));
        assert_eq!(ContentKey::parse("Sound"), Some(ContentKey::Sound));
        assert_eq!(ContentKey::parse("PhysicalObject"), Some(ContentKey::PhysicalObject));
        assert_eq!(ContentKey::parse("text/html"), None);
    }

    #[test]
    fn test_keys_round_trip() {
        for key in ContentKey::ALL {
            assert_eq!(ContentKey::parse(key.as_str()), Some(key));
        }
    }

    #[test]
    fn test_builtin_bindings() {
        let registry = registry();
        assert_eq!(registry.lookup(ContentKey::Pdf).unwrap().kind, RendererKind::Pdf);
        assert_eq!(registry.lookup_str("video/mp4").unwrap().kind, RendererKind::Av);
        assert_eq!(registry.lookup_str("model/gltf-binary").unwrap().kind, RendererKind::Virtex);
        assert_eq!(registry.lookup_str("Sound").unwrap().kind, RendererKind::MediaElement);
        assert_eq!(registry.lookup_str("application/epub+zip").unwrap().name, "ebook-extension");
        assert!(registry.lookup_str("text/html").is_none());
    }

    #[test]
    fn test_default_always_resolves() {
        let calls = Arc::new(RendererCalls::default());
        let registry = ExtensionRegistry::new(ExtensionDescriptor::new(
            RendererKind::Default,
            HeadlessRenderer::factory(calls),
        ));
        assert!(registry.lookup(ContentKey::Pdf).is_none());
        assert_eq!(registry.lookup(ContentKey::Default).unwrap().kind, RendererKind::Default);
        assert_eq!(registry.default_descriptor().name, "default-extension");
    }

    #[test]
    fn test_register_last_write_wins() {
        let calls = Arc::new(RendererCalls::default());
        let mut registry = registry();
        registry.register(
            ContentKey::Pdf,
            ExtensionDescriptor::new(RendererKind::Seadragon, HeadlessRenderer::factory(calls)),
        );
        assert_eq!(registry.lookup(ContentKey::Pdf).unwrap().kind, RendererKind::Seadragon);
    }

    #[test]
    fn test_find_by_kind() {
        let registry = registry();
        assert_eq!(
            registry.find_by_kind(RendererKind::MediaElement).unwrap().name,
            "mediaelement-extension"
        );
    }
}

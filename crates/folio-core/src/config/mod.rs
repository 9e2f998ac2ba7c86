//! Renderer configuration
//!
//! The merged configuration is built from, in ascending precedence:
//! 1. the base document `{root}/lib/{renderer}.{locale}.config.json`
//! 2. an override: the session-cached copy for `{renderer}.{locale}`, else the
//!    document at the state's `config_uri`, else nothing
//! 3. the state's inline `config` object

mod store;
mod transport;

pub use store::{ConfigSource, DocumentConfigSource, InMemorySessionCache, SessionCache};
pub use transport::{
    select_transport, unwrap_script_payload, ConfigTransport, DirectTransport,
    ScriptInjectionTransport, TransportKind,
};

use crate::{Error, Result, ViewerState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Configuration handed to a renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedConfig(Value);

impl MergedConfig {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Renderer name recorded during the merge
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Origin URI of the override, when one was applied
    pub fn uri(&self) -> Option<&str> {
        self.0.get("uri").and_then(Value::as_str)
    }

    /// Theme named under `options.theme`
    pub fn theme(&self) -> Option<&str> {
        self.0
            .get("options")
            .and_then(|o| o.get("theme"))
            .and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Deep-merge `overlay` into `target`
///
/// Objects merge recursively; any other overlay value (scalars, arrays, null)
/// replaces the target value.
pub fn deep_merge(target: &mut Value, overlay: &Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, overlay) => *target = overlay.clone(),
    }
}

/// An override document and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOverride {
    pub document: Value,
    pub origin: OverrideOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOrigin {
    SessionCache,
    Remote(String),
}

/// Combine a base document with optional override and inline layers
pub fn extend_config(
    mut base: Value,
    renderer_name: &str,
    config_uri: Option<&str>,
    config_override: Option<&ConfigOverride>,
    inline: Option<&Value>,
) -> Result<MergedConfig> {
    let object = base
        .as_object_mut()
        .ok_or_else(|| Error::InvalidConfig("base configuration is not a JSON object".to_string()))?;
    object.insert("name".to_string(), Value::String(renderer_name.to_string()));

    if let Some(over) = config_override {
        // A fetched override records the address it came from; a cached one
        // falls back to whatever address the state carries now.
        let uri = match &over.origin {
            OverrideOrigin::Remote(uri) => Some(uri.as_str()),
            OverrideOrigin::SessionCache => config_uri,
        };
        if let Some(uri) = uri {
            object.insert("uri".to_string(), Value::String(uri.to_string()));
        }
        deep_merge(&mut base, &over.document);
    }

    if let Some(inline) = inline {
        deep_merge(&mut base, inline);
    }

    Ok(MergedConfig(base))
}

/// Builds [`MergedConfig`]s from the configured sources
#[derive(Clone)]
pub struct ConfigMerger {
    source: Arc<dyn ConfigSource>,
    cache: Arc<dyn SessionCache>,
    transport: Arc<dyn ConfigTransport>,
}

impl ConfigMerger {
    pub fn new(
        source: Arc<dyn ConfigSource>,
        cache: Arc<dyn SessionCache>,
        transport: Arc<dyn ConfigTransport>,
    ) -> Self {
        Self {
            source,
            cache,
            transport,
        }
    }

    /// Session cache key for a renderer and locale
    pub fn cache_key(renderer_name: &str, locale: &str) -> String {
        format!("{}.{}", renderer_name, locale)
    }

    /// Location of the base configuration document
    pub fn base_config_path(root: &str, renderer_name: &str, locale: &str) -> String {
        format!("{}/lib/{}.{}.config.json", root, renderer_name, locale)
    }

    pub fn session_cache(&self) -> &Arc<dyn SessionCache> {
        &self.cache
    }

    /// Produce the merged configuration for a renderer
    #[instrument(skip(self, state), fields(renderer = %renderer_name, locale = %state.locale()))]
    pub async fn merge(&self, renderer_name: &str, state: &ViewerState) -> Result<MergedConfig> {
        let config_override = self.config_override(renderer_name, state).await?;

        let path = Self::base_config_path(&state.root, renderer_name, state.locale());
        let base = self
            .source
            .fetch(&path)
            .await
            .map_err(|e| Error::config_fetch(&path, e))?;

        let merged = extend_config(
            base,
            renderer_name,
            state.config_uri.as_deref(),
            config_override.as_ref(),
            state.config.as_ref(),
        )?;

        info!(
            path = %path,
            override_applied = config_override.is_some(),
            "Configuration merged"
        );
        Ok(merged)
    }

    /// Cached copy, else remote document, else nothing
    async fn config_override(
        &self,
        renderer_name: &str,
        state: &ViewerState,
    ) -> Result<Option<ConfigOverride>> {
        let key = Self::cache_key(renderer_name, state.locale());
        if let Some(document) = self.cache.get(&key) {
            debug!(key = %key, "Using session-cached configuration");
            return Ok(Some(ConfigOverride {
                document,
                origin: OverrideOrigin::SessionCache,
            }));
        }

        let Some(uri) = state.config_uri.as_deref() else {
            return Ok(None);
        };

        debug!(uri = %uri, transport = ?self.transport.kind(), "Fetching configuration override");
        let document = self
            .transport
            .fetch(uri)
            .await
            .map_err(|e| Error::config_fetch(uri, e))?;

        Ok(Some(ConfigOverride {
            document,
            origin: OverrideOrigin::Remote(uri.to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "options": { "theme": "light-theme", "pagingEnabled": true, "zoom": { "min": 1, "max": 8 } },
            "modules": { "footer": { "enabled": true } }
        })
    }

    #[test]
    fn test_deep_merge_recurses_into_objects() {
        let mut target = base();
        deep_merge(
            &mut target,
            &json!({ "options": { "theme": "dark-theme", "zoom": { "max": 16 } }, "extra": [1, 2] }),
        );
        assert_eq!(target["options"]["theme"], "dark-theme");
        assert_eq!(target["options"]["pagingEnabled"], true);
        assert_eq!(target["options"]["zoom"], json!({ "min": 1, "max": 16 }));
        assert_eq!(target["modules"]["footer"]["enabled"], true);
        assert_eq!(target["extra"], json!([1, 2]));
    }

    #[test]
    fn test_deep_merge_replaces_arrays_and_scalars() {
        let mut target = json!({ "list": [1, 2, 3], "obj": { "a": 1 } });
        deep_merge(&mut target, &json!({ "list": [9], "obj": 5 }));
        assert_eq!(target, json!({ "list": [9], "obj": 5 }));
    }

    #[test]
    fn test_extend_without_override_only_adds_name() {
        let merged = extend_config(base(), "pdf-extension", Some("https://x/c.json"), None, None).unwrap();
        let mut expected = base();
        expected["name"] = json!("pdf-extension");
        assert_eq!(merged.as_value(), &expected);
        assert_eq!(merged.uri(), None);
    }

    #[test]
    fn test_extend_with_override_records_uri() {
        let over = ConfigOverride {
            document: json!({ "options": { "theme": "dark-theme" } }),
            origin: OverrideOrigin::Remote("https://example.org/c.json".into()),
        };
        let merged = extend_config(
            base(),
            "seadragon-extension",
            Some("https://example.org/c.json"),
            Some(&over),
            None,
        )
        .unwrap();
        assert_eq!(merged.name(), Some("seadragon-extension"));
        assert_eq!(merged.uri(), Some("https://example.org/c.json"));
        assert_eq!(merged.theme(), Some("dark-theme"));
        assert_eq!(merged.as_value()["options"]["pagingEnabled"], true);
    }

    #[test]
    fn test_override_origin_decides_recorded_uri() {
        let document = json!({ "options": { "theme": "dark-theme" } });
        let fetched = ConfigOverride {
            document: document.clone(),
            origin: OverrideOrigin::Remote("https://example.org/fetched.json".into()),
        };
        let merged = extend_config(
            base(),
            "pdf-extension",
            Some("https://example.org/current.json"),
            Some(&fetched),
            None,
        )
        .unwrap();
        assert_eq!(merged.uri(), Some("https://example.org/fetched.json"));

        let cached = ConfigOverride {
            document,
            origin: OverrideOrigin::SessionCache,
        };
        let merged = extend_config(base(), "pdf-extension", None, Some(&cached), None).unwrap();
        assert_eq!(merged.uri(), None);
        assert_eq!(merged.theme(), Some("dark-theme"));

        let merged = extend_config(
            base(),
            "pdf-extension",
            Some("https://example.org/current.json"),
            Some(&cached),
            None,
        )
        .unwrap();
        assert_eq!(merged.uri(), Some("https://example.org/current.json"));
    }

    #[test]
    fn test_inline_config_wins_last() {
        let over = ConfigOverride {
            document: json!({ "options": { "theme": "dark-theme" } }),
            origin: OverrideOrigin::SessionCache,
        };
        let inline = json!({ "options": { "theme": "contrast-theme" } });
        let merged = extend_config(base(), "pdf-extension", None, Some(&over), Some(&inline)).unwrap();
        assert_eq!(merged.theme(), Some("contrast-theme"));
    }

    #[test]
    fn test_non_object_base_is_rejected() {
        let err = extend_config(json!([1]), "pdf-extension", None, None, None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            ConfigMerger::base_config_path("./folio", "pdf-extension", "en-GB"),
            "./folio/lib/pdf-extension.en-GB.config.json"
        );
        assert_eq!(ConfigMerger::cache_key("pdf-extension", "cy-GB"), "pdf-extension.cy-GB");
    }
}

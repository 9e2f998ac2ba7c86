//! Transports for remote configuration overrides
//!
//! When the environment can make cross-origin requests the override is fetched
//! directly. Otherwise it is requested script-style: the callback name is
//! passed as a `callback` query parameter and the response is a
//! `callback(<json>)` envelope.

use crate::fetch::{DocumentFetcher, Location};
use crate::{Error, Result, ViewerSettings};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Direct,
    ScriptInjection,
}

/// Fetches override configuration documents
#[async_trait]
pub trait ConfigTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn fetch(&self, uri: &str) -> Result<Value>;
}

/// Plain cross-origin fetch
pub struct DirectTransport {
    fetcher: DocumentFetcher,
}

impl DirectTransport {
    pub fn new(fetcher: DocumentFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ConfigTransport for DirectTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }

    async fn fetch(&self, uri: &str) -> Result<Value> {
        self.fetcher.fetch_json(uri).await
    }
}

/// Callback-envelope fetch for environments without cross-origin support
pub struct ScriptInjectionTransport {
    fetcher: DocumentFetcher,
    callback: String,
}

impl ScriptInjectionTransport {
    pub fn new(fetcher: DocumentFetcher, callback: impl Into<String>) -> Self {
        Self {
            fetcher,
            callback: callback.into(),
        }
    }

    /// Request URI carrying the callback parameter
    pub fn request_uri(&self, uri: &str) -> Result<String> {
        if !Location::parse(uri).is_remote() {
            return Ok(uri.to_string());
        }
        let mut url = Url::parse(uri).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        url.query_pairs_mut().append_pair("callback", &self.callback);
        Ok(url.to_string())
    }
}

#[async_trait]
impl ConfigTransport for ScriptInjectionTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ScriptInjection
    }

    async fn fetch(&self, uri: &str) -> Result<Value> {
        let request = self.request_uri(uri)?;
        debug!(uri = %request, "Script-injection configuration request");
        let body = self.fetcher.fetch_text(&request).await?;
        unwrap_script_payload(&body, &self.callback)
    }
}

/// Extract the JSON argument of a `callback(...)` envelope; bare JSON passes through
pub fn unwrap_script_payload(body: &str, callback: &str) -> Result<Value> {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let trimmed = trimmed.strip_prefix("/**/").unwrap_or(trimmed).trim_start();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();

    let inner = trimmed
        .strip_prefix(callback)
        .map(str::trim_start)
        .and_then(|s| s.strip_prefix('('))
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| Error::InvalidConfig(format!("response is not a {}(...) payload", callback)))?;

    serde_json::from_str(inner).map_err(Error::from)
}

/// Pick the override transport from the environment's capabilities
pub fn select_transport(settings: &ViewerSettings, fetcher: DocumentFetcher) -> Arc<dyn ConfigTransport> {
    if settings.cors_enabled {
        Arc::new(DirectTransport::new(fetcher))
    } else {
        Arc::new(ScriptInjectionTransport::new(fetcher, settings.jsonp_callback.clone()))
    }
}

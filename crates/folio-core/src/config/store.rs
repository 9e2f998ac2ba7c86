//! Base configuration sources and the per-session cache

use crate::fetch::DocumentFetcher;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Supplies base configuration documents
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Value>;
}

/// Reads http(s) locations over the network and anything else from disk
pub struct DocumentConfigSource {
    fetcher: DocumentFetcher,
}

impl DocumentConfigSource {
    pub fn new(fetcher: DocumentFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ConfigSource for DocumentConfigSource {
    async fn fetch(&self, location: &str) -> Result<Value> {
        self.fetcher.fetch_json(location).await
    }
}

/// Per-session store of configuration documents, keyed `{renderer}.{locale}`
pub trait SessionCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, document: Value);

    fn remove(&self, key: &str);
}

/// In-memory session cache
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for InMemorySessionCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, document: Value) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), document);
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

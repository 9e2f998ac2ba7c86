//! Document fetching over HTTP(S) or the local filesystem

use crate::{Error, Result, ViewerSettings};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Where a document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    /// Classify a location string; anything that is not an http(s) or file URL is a path
    pub fn parse(location: &str) -> Location {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Location::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Location::Local(path),
                Err(()) => Location::Local(PathBuf::from(url.path())),
            },
            _ => Location::Local(PathBuf::from(location)),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

/// Fetches text and JSON documents
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: Client,
}

impl DocumentFetcher {
    pub fn new(settings: &ViewerSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a document body as text
    #[instrument(skip(self))]
    pub async fn fetch_text(&self, location: &str) -> Result<String> {
        match Location::parse(location) {
            Location::Remote(url) => {
                let response = self.client.get(url).send().await?.error_for_status()?;
                let body = response.text().await?;
                debug!(bytes = body.len(), "Fetched remote document");
                Ok(body)
            }
            Location::Local(path) => {
                let body = tokio::fs::read_to_string(&path).await?;
                debug!(bytes = body.len(), path = %path.display(), "Read local document");
                Ok(body)
            }
        }
    }

    /// Fetch and parse a JSON document
    pub async fn fetch_json(&self, location: &str) -> Result<serde_json::Value> {
        let body = self.fetch_text(location).await?;
        serde_json::from_str(&body).map_err(Error::from)
    }
}

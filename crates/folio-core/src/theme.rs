//! Theme stylesheet injection
//!
//! Each renderer/locale pair gets one stylesheet link with a deterministic id,
//! `{renderer}-theme-{locale}` (lowercase). Inserting a link whose id is
//! already present in the document is a no-op.
//!
//! # Usage
//!
//! ```rust
//! use folio_core::theme::ThemeLink;
//!
//! let link = ThemeLink::new("./folio", "Dark-Theme", "pdf-extension", "en-GB");
//! assert_eq!(link.id, "pdf-extension-theme-en-gb");
//! assert_eq!(link.href, "./folio/themes/dark-theme/css/pdf-extension/theme.css");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// A stylesheet link element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThemeLink {
    pub id: String,
    pub href: String,
}

impl ThemeLink {
    /// Only the theme and renderer segments are lowercased; `root` keeps its case.
    pub fn new(root: &str, theme: &str, renderer_name: &str, locale: &str) -> Self {
        Self {
            id: Self::link_id(renderer_name, locale),
            href: format!(
                "{}/themes/{}/css/{}/theme.css",
                root,
                theme.to_lowercase(),
                renderer_name.to_lowercase()
            ),
        }
    }

    /// Deterministic element id for a renderer and locale
    pub fn link_id(renderer_name: &str, locale: &str) -> String {
        format!("{}-theme-{}", renderer_name, locale).to_lowercase()
    }

    /// HTML for the link element
    pub fn to_html(&self) -> String {
        format!(r#"<link rel="stylesheet" id="{}" href="{}" />"#, self.id, self.href)
    }
}

/// Document that receives theme stylesheets
#[async_trait]
pub trait StylesheetHost: Send + Sync {
    /// Insert `link` unless a link with the same id exists; returns whether it was inserted
    async fn inject(&self, link: &ThemeLink) -> bool;
}

/// In-memory document head
#[derive(Debug, Default)]
pub struct DocumentHead {
    links: RwLock<Vec<ThemeLink>>,
}

impl DocumentHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn links(&self) -> Vec<ThemeLink> {
        self.links.read().await.clone()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.links.read().await.iter().any(|l| l.id == id)
    }

    /// Markup for every inserted link
    pub async fn to_html(&self) -> String {
        self.links
            .read()
            .await
            .iter()
            .map(ThemeLink::to_html)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl StylesheetHost for DocumentHead {
    async fn inject(&self, link: &ThemeLink) -> bool {
        let mut links = self.links.write().await;
        if links.iter().any(|l| l.id == link.id) {
            debug!(id = %link.id, "Theme stylesheet already present");
            return false;
        }
        links.push(link.clone());
        debug!(id = %link.id, href = %link.href, "Theme stylesheet inserted");
        true
    }
}

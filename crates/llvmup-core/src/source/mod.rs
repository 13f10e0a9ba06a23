//! Upstream release history.
//!
//! The manifest rebuild walks every release; the resolver's companion
//! fallback asks for one release by tag and for the latest release.

pub mod github;
pub mod memory;

pub use github::GithubReleaseSource;
pub use memory::MemoryReleaseSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Network failure, authentication failure, or a non-success status.
    #[error("Release source unavailable ({url}): {reason}")]
    Unavailable { url: String, reason: String },

    /// The requested release does not exist.
    #[error("Release not found: {url}")]
    NotFound { url: String },

    #[error("Malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// A release as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// An asset attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    pub fn new(tag: impl Into<String>, html_url: impl Into<String>) -> Self {
        Self {
            tag_name: tag.into(),
            html_url: html_url.into(),
            draft: false,
            published_at: None,
            created_at: None,
            assets: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_asset(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.assets.push(ReleaseAsset {
            name: name.into(),
            browser_download_url: url.into(),
        });
        self
    }

    #[must_use]
    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Publication time, falling back to creation time for releases that
    /// were never published.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.created_at)
    }

    pub fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.name.as_str())
    }

    pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// A read-only view of a repository's releases.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Unique identifier for this source instance (e.g. "github:owner/repo")
    fn key(&self) -> String;

    /// Every release, lazily, page by page.
    ///
    /// A failure on any page surfaces as an `Err` item; callers should stop there.
    fn list_releases(&self) -> BoxStream<'_, Result<Release, SourceError>>;

    /// The release carrying `tag`.
    async fn release_by_tag(&self, tag: &str) -> Result<Release, SourceError>;

    /// The release the source considers latest.
    async fn latest_release(&self) -> Result<Release, SourceError>;
}

//! In-memory [`ReleaseSource`], used by tests and offline tooling.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::{Release, ReleaseSource, SourceError};

/// Serves a fixed set of releases.
///
/// `latest_release` returns the explicitly chosen tag, or else the release
/// with the newest timestamp.
#[derive(Debug, Clone, Default)]
pub struct MemoryReleaseSource {
    releases: Vec<Release>,
    latest: Option<String>,
    offline: bool,
}

impl MemoryReleaseSource {
    pub fn new(releases: Vec<Release>) -> Self {
        Self {
            releases,
            latest: None,
            offline: false,
        }
    }

    #[must_use]
    pub fn with_latest(mut self, tag: impl Into<String>) -> Self {
        self.latest = Some(tag.into());
        self
    }

    /// A source that fails every call with [`SourceError::Unavailable`].
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    fn check_online(&self, what: &str) -> Result<(), SourceError> {
        if self.offline {
            Err(SourceError::Unavailable {
                url: format!("memory://{what}"),
                reason: "offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReleaseSource for MemoryReleaseSource {
    fn key(&self) -> String {
        "memory".to_string()
    }

    fn list_releases(&self) -> BoxStream<'_, Result<Release, SourceError>> {
        if let Err(e) = self.check_online("releases") {
            return stream::once(async move { Err(e) }).boxed();
        }
        stream::iter(self.releases.iter().cloned().map(Ok)).boxed()
    }

    async fn release_by_tag(&self, tag: &str) -> Result<Release, SourceError> {
        self.check_online("tags")?;
        self.releases
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                url: format!("memory://tags/{tag}"),
            })
    }

    async fn latest_release(&self) -> Result<Release, SourceError> {
        self.check_online("latest")?;
        let latest = match &self.latest {
            Some(tag) => self.releases.iter().find(|r| &r.tag_name == tag),
            None => self
                .releases
                .iter()
                .filter(|r| !r.draft)
                .max_by_key(|r| r.timestamp()),
        };
        latest.cloned().ok_or_else(|| SourceError::NotFound {
            url: "memory://latest".to_string(),
        })
    }
}

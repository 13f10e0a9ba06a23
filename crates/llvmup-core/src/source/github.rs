//! GitHub REST implementation of [`ReleaseSource`].

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{Release, ReleaseSource, SourceError};
use crate::config::Config;
use crate::repo::GitHubRepo;

/// Releases requested per page; a shorter page is the last one.
pub const PER_PAGE: usize = 100;

const ACCEPT: &str = "application/vnd.github+json";

pub struct GithubReleaseSource {
    client: Client,
    api_url: String,
    repo: GitHubRepo,
    token: Option<String>,
}

impl GithubReleaseSource {
    pub fn new(client: Client, repo: GitHubRepo) -> Self {
        Self {
            client,
            api_url: crate::config::DEFAULT_API_URL.to_string(),
            repo,
            token: None,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(client, config.repository.clone())
            .with_api_url(&config.api_url)
            .with_token(config.token.clone())
    }

    #[must_use]
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_url,
            self.repo.owner(),
            self.repo.name()
        )
    }

    /// `<releases>/tags/<tag>`, with `tag` percent-encoded as one path segment.
    fn tag_url(&self, tag: &str) -> Result<String, SourceError> {
        let base = self.releases_url();
        let invalid = |reason: String| SourceError::Unavailable {
            url: base.clone(),
            reason,
        };
        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("API URL cannot take a path".to_string()))?
            .push("tags")
            .push(tag);
        Ok(url.into())
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let req = self
            .client
            .get(url)
            .header(header::USER_AGENT, crate::USER_AGENT)
            .header(header::ACCEPT, ACCEPT);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        let resp = match self.request(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Err(SourceError::Unavailable {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound { url });
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                url,
                reason: format!("HTTP {status}"),
            });
        }

        match resp.json::<T>().await {
            Ok(body) => Ok(body),
            Err(e) => Err(SourceError::Decode {
                url,
                reason: e.to_string(),
            }),
        }
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn fetch_page(&self, page: usize) -> Result<Vec<Release>, SourceError> {
        let url = format!("{}?per_page={PER_PAGE}&page={page}", self.releases_url());
        let releases: Vec<Release> = self.get_json(url).await?;
        debug!(count = releases.len(), "fetched release page");
        Ok(releases)
    }
}

#[async_trait]
impl ReleaseSource for GithubReleaseSource {
    fn key(&self) -> String {
        format!("github:{}", self.repo)
    }

    fn list_releases(&self) -> BoxStream<'_, Result<Release, SourceError>> {
        stream::try_unfold(Some(1usize), move |page| async move {
            let Some(page) = page else {
                return Ok::<_, SourceError>(None);
            };
            let releases = self.fetch_page(page).await?;
            let next = (releases.len() >= PER_PAGE).then_some(page + 1);
            let items = stream::iter(releases.into_iter().map(Ok::<_, SourceError>));
            Ok(Some((items, next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn release_by_tag(&self, tag: &str) -> Result<Release, SourceError> {
        self.get_json(self.tag_url(tag)?).await
    }

    async fn latest_release(&self) -> Result<Release, SourceError> {
        self.get_json(format!("{}/latest", self.releases_url())).await
    }
}

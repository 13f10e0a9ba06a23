//! Runtime configuration.
//!
//! Everything comes from the environment (or explicit CLI flags layered on
//! top); there is no config file.

use std::path::PathBuf;

use thiserror::Error;

use crate::paths;
use crate::repo::GitHubRepo;

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Repository whose releases publish the prebuilt archives.
pub const DEFAULT_REPOSITORY: &str = "llvmup/llvm-prebuilt";

/// Repository override.
pub const REPOSITORY_ENV: &str = "LLVMUP_REPOSITORY";
/// API base URL override.
pub const API_URL_ENV: &str = "LLVMUP_API_URL";
/// Manifest document location override.
pub const MANIFEST_ENV: &str = "LLVMUP_MANIFEST";
/// Token variables, in order of preference.
pub const TOKEN_ENVS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory. Set {} to override.", paths::HOME_ENV)]
    NoHome,

    #[error("{0}")]
    InvalidRepository(String),
}

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all llvmup state.
    pub home: PathBuf,
    /// Repository scanned for releases.
    pub repository: GitHubRepo,
    /// REST API base URL, without trailing slash.
    pub api_url: String,
    /// Bearer token sent with API requests.
    pub token: Option<String>,
    manifest_path: Option<PathBuf>,
}

impl Config {
    pub fn new(home: impl Into<PathBuf>, repository: GitHubRepo) -> Self {
        Self {
            home: home.into(),
            repository,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            manifest_path: None,
        }
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when no home directory can be determined or the repository
    /// override is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to values.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let home = get(paths::HOME_ENV)
            .map(PathBuf::from)
            .or_else(paths::default_home)
            .ok_or(ConfigError::NoHome)?;
        let repository = get(REPOSITORY_ENV).unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
        let repository = GitHubRepo::new(&repository).map_err(ConfigError::InvalidRepository)?;

        let mut config = Self::new(home, repository);
        if let Some(url) = get(API_URL_ENV) {
            config = config.with_api_url(url);
        }
        config.token = TOKEN_ENVS.iter().find_map(|key| get(*key));
        config.manifest_path = get(MANIFEST_ENV).map(PathBuf::from);
        Ok(config)
    }

    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: GitHubRepo) -> Self {
        self.repository = repository;
        self
    }

    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    /// Manifest document location; follows `home` unless set explicitly.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| paths::manifest_path(&self.home))
    }

    pub fn cache_dir(&self) -> PathBuf {
        paths::cache_dir(&self.home)
    }

    pub fn tools_dir(&self) -> PathBuf {
        paths::tools_dir(&self.home)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        paths::tmp_dir(&self.home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("LLVMUP_HOME", "/opt/llvmup")])).unwrap();
        assert_eq!(config.home, PathBuf::from("/opt/llvmup"));
        assert_eq!(config.repository.as_str(), DEFAULT_REPOSITORY);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.token, None);
        assert_eq!(config.manifest_path(), PathBuf::from("/opt/llvmup/manifest.json"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LLVMUP_HOME", "/h"),
            ("LLVMUP_REPOSITORY", "acme/toolchains"),
            ("LLVMUP_API_URL", "http://127.0.0.1:9000/"),
            ("LLVMUP_MANIFEST", "/elsewhere/m.json"),
            ("GH_TOKEN", "fallback"),
        ]))
        .unwrap();
        assert_eq!(config.repository.as_str(), "acme/toolchains");
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.token.as_deref(), Some("fallback"));
        assert_eq!(config.manifest_path(), PathBuf::from("/elsewhere/m.json"));
    }

    #[test]
    fn test_github_token_preferred_and_empty_ignored() {
        let config = Config::from_lookup(lookup(&[
            ("LLVMUP_HOME", "/h"),
            ("GITHUB_TOKEN", ""),
            ("GH_TOKEN", "second"),
        ]))
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("second"));

        let config = Config::from_lookup(lookup(&[
            ("LLVMUP_HOME", "/h"),
            ("GITHUB_TOKEN", "first"),
            ("GH_TOKEN", "second"),
        ]))
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("first"));
    }

    #[test]
    fn test_bad_repository() {
        let err = Config::from_lookup(lookup(&[
            ("LLVMUP_HOME", "/h"),
            ("LLVMUP_REPOSITORY", "no-slash"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository(_)));
    }

    #[test]
    fn test_manifest_follows_home() {
        let config = Config::from_lookup(lookup(&[("LLVMUP_HOME", "/a")]))
            .unwrap()
            .with_home("/b");
        assert_eq!(config.manifest_path(), PathBuf::from("/b/manifest.json"));
    }
}

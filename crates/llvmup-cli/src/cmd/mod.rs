pub mod install;
pub mod list;
pub mod rebuild;
pub mod resolve;

use anyhow::{Context, Result};
use llvmup_core::source::GithubReleaseSource;
use llvmup_core::{Config, ManifestStore};

/// The configured GitHub release source.
pub(crate) fn release_source(config: &Config) -> Result<GithubReleaseSource> {
    let client = llvmup_core::http_client().context("Failed to build HTTP client")?;
    Ok(GithubReleaseSource::from_config(client, config))
}

/// Open the manifest, scanning releases first if there is none yet.
pub(crate) async fn open_store(
    config: &Config,
    source: &GithubReleaseSource,
) -> Result<ManifestStore> {
    let path = config.manifest_path();
    ManifestStore::load_or_rebuild(&path, source)
        .await
        .with_context(|| format!("Failed to load manifest {}", path.display()))
}

use anyhow::{Context, Result};
use llvmup_core::{Config, ManifestStore, ReleaseSource};

use super::release_source;

/// Scan every release and rewrite the manifest.
pub async fn rebuild(config: &Config) -> Result<()> {
    let source = release_source(config)?;
    let path = config.manifest_path();
    let store = ManifestStore::open(&path)
        .await
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;

    let manifest = store
        .rebuild(&source)
        .await
        .with_context(|| format!("Failed to rebuild manifest from {}", source.key()))?;

    println!(
        "Indexed {} archives from {} into {}",
        manifest.len(),
        config.repository,
        store.path().display()
    );
    Ok(())
}

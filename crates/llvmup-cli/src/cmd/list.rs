use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use llvmup_core::{Config, ManifestStore};
use llvmup_schema::{Architecture, Platform, VersionQuery};

/// List manifest entries, optionally filtered by version, platform, and architecture.
pub async fn list(
    config: &Config,
    version: Option<&str>,
    platform: Option<&str>,
    arch: Option<&str>,
) -> Result<()> {
    let query = version.map(VersionQuery::classify).transpose()?;
    let platform = platform.map(Platform::normalize).transpose()?;
    let arch = arch.map(Architecture::normalize).transpose()?;

    let path = config.manifest_path();
    let store = ManifestStore::open(&path)
        .await
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;
    let manifest = store.snapshot();

    if manifest.is_empty() {
        println!();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            println!("  Manifest at {} has no archives.", path.display());
        } else {
            println!("  No manifest at {}.", path.display());
        }
        println!("  Run 'llvmup rebuild' to scan {}.", config.repository);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Version", "Platform", "Arch", "Variant", "Tag", "Asset"]);

    let mut shown = 0usize;
    for entry in manifest.entries() {
        if query.as_ref().is_some_and(|q| !q.matches(&entry.version))
            || platform.is_some_and(|p| p != entry.platform)
            || arch.is_some_and(|a| a != entry.architecture)
        {
            continue;
        }
        table.add_row(vec![
            entry.version.clone(),
            entry.platform.to_string(),
            entry.architecture.to_string(),
            if entry.debug { "debug" } else { "release" }.to_string(),
            entry.tag.clone(),
            entry.asset_name.clone(),
        ]);
        shown += 1;
    }

    if shown == 0 {
        println!("  No archives match.");
        return Ok(());
    }

    println!("{table}");
    println!("  {shown} archive(s)");
    Ok(())
}

use anyhow::Result;
use llvmup_core::{Config, Resolver};

use super::{open_store, release_source};
use crate::TargetArgs;

/// Print `{"url": ..., "name": ...}` for the requested archive or its companion.
pub async fn resolve(config: &Config, target: &TargetArgs, companion: bool) -> Result<()> {
    let source = release_source(config)?;
    let store = open_store(config, &source).await?;
    let resolver = Resolver::new(store.snapshot(), &source);

    let asset = if companion {
        resolver
            .resolve_companion(&target.version, &target.platform, &target.arch)
            .await?
    } else {
        resolver.resolve_primary(&target.version, &target.platform, &target.arch, target.debug)?
    };

    println!("{}", serde_json::to_string(&asset)?);
    Ok(())
}

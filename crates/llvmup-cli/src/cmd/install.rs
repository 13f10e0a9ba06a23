use anyhow::{Context, Result};
use llvmup_core::{Config, ExportTarget, Installer, LogReporter, ResolveRequest, Resolver};

use super::{open_store, release_source};
use crate::TargetArgs;

/// Install a toolchain and expose it to the caller's environment.
pub async fn install(config: &Config, target: &TargetArgs, force: bool) -> Result<()> {
    let request =
        ResolveRequest::parse(&target.version, &target.platform, &target.arch, target.debug)?;

    let source = release_source(config)?;
    let store = open_store(config, &source).await?;
    let client = llvmup_core::http_client().context("Failed to build HTTP client")?;
    let resolver = Resolver::new(store.snapshot(), &source);

    let installation = Installer::new(config, client, resolver, &LogReporter)
        .force(force)
        .install(&request)
        .await?;

    if installation.reused {
        eprintln!(
            "{} already installed at {}",
            installation.receipt.asset_name,
            installation.root.display()
        );
    } else {
        eprintln!(
            "Installed {} to {}",
            installation.receipt.asset_name,
            installation.root.display()
        );
    }

    let exported = ExportTarget::from_env()
        .export(&installation.env)
        .context("Failed to export toolchain environment")?;
    if let Some(script) = exported {
        print!("{script}");
    }
    Ok(())
}

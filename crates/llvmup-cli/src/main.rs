//! llvmup - prebuilt LLVM/MLIR toolchains

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use llvmup_cli::cmd;
use llvmup_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let default_filter = if cli.verbose {
        "debug"
    } else {
        "warn,llvmup_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;

    match cli.command {
        Commands::Rebuild => cmd::rebuild::rebuild(&config).await,
        Commands::Resolve { target, companion } => {
            cmd::resolve::resolve(&config, &target, companion).await
        }
        Commands::Install { target, force } => cmd::install::install(&config, &target, force).await,
        Commands::List {
            version,
            platform,
            arch,
        } => {
            cmd::list::list(
                &config,
                version.as_deref(),
                platform.as_deref(),
                arch.as_deref(),
            )
            .await
        }
    }
}

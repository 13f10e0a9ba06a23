//! llvmup - prebuilt LLVM/MLIR toolchains
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves a `(version, platform, architecture, variant)` request to one
//! archive published as a GitHub release asset, then downloads, unpacks, and
//! exposes it.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.llvmup/
//! ├── manifest.json   # Index of every published archive
//! ├── cache/          # Downloaded archives
//! ├── tools/          # Unpacked companion decompressors
//! ├── tmp/            # In-progress extractions
//! └── toolchains/     # <tag>/<platform>-<arch>[-debug]
//! ```

pub mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use llvmup_core::Config;
use llvmup_core::repo::GitHubRepo;

#[derive(Debug, Parser)]
#[command(name = "llvmup")]
#[command(author, version = env!("LLVMUP_VERSION"), about = "llvmup - prebuilt LLVM/MLIR toolchains from GitHub releases")]
pub struct Cli {
    /// GitHub repository publishing the archives (owner/repo)
    #[arg(long, global = true, env = "LLVMUP_REPOSITORY")]
    pub repo: Option<String>,

    /// State directory [default: ~/.llvmup]
    #[arg(long, global = true, env = "LLVMUP_HOME")]
    pub home: Option<PathBuf>,

    /// Manifest document [default: <home>/manifest.json]
    #[arg(long, global = true, env = "LLVMUP_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebuild the manifest by scanning every release
    Rebuild,
    /// Print the download location of an archive as JSON
    Resolve {
        #[command(flatten)]
        target: TargetArgs,
        /// Resolve the zstd companion instead of the toolchain archive
        #[arg(long)]
        companion: bool,
    },
    /// Download, unpack, and expose a toolchain
    Install {
        #[command(flatten)]
        target: TargetArgs,
        /// Reinstall even if the same archive is already installed
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// List archives in the manifest
    List {
        /// Only versions matching this release version or commit prefix
        version: Option<String>,
        /// Only this platform (host, linux, macos, windows)
        #[arg(long)]
        platform: Option<String>,
        /// Only this architecture (host, x86, aarch64)
        #[arg(long)]
        arch: Option<String>,
    },
}

/// What to resolve.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Release version (e.g. 21.1.8) or commit hash (7-40 hex digits)
    pub version: String,

    /// Target platform: host, linux, macos, windows
    #[arg(long, default_value = "host")]
    pub platform: String,

    /// Target architecture: host, x86, aarch64
    #[arg(long, default_value = "host")]
    pub arch: String,

    /// Debug build instead of release build
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::from_env().context("Failed to read configuration")?;
        if let Some(home) = &self.home {
            config = config.with_home(home);
        }
        if let Some(repo) = &self.repo {
            let repo = GitHubRepo::new(repo).map_err(anyhow::Error::msg)?;
            config = config.with_repository(repo);
        }
        if let Some(manifest) = &self.manifest {
            config = config.with_manifest_path(manifest);
        }
        Ok(config)
    }
}

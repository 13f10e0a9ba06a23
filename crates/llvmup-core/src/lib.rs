//! Core library for llvmup.
//!
//! Maps a `(version, platform, architecture, variant)` request onto exactly one
//! prebuilt toolchain archive published as a GitHub release asset, and drives
//! the download and unpacking of that archive.
//!
//! # Layers
//!
//! - [`source`]: read-only view of the upstream release history.
//! - [`manifest`]: the locally persisted index built by scanning every release.
//! - [`resolver`]: request → download location, with the companion fallback.
//! - [`install`]: download, unpack via external tools, expose the environment.

pub mod config;
pub mod env;
pub mod install;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod repo;
pub mod reporter;
pub mod resolver;
pub mod source;

pub use config::{Config, ConfigError};
pub use env::{ExportTarget, ToolchainEnv};
pub use install::{InstallError, Installation, Installer};
pub use manifest::{Manifest, ManifestStore, StoreError};
pub use reporter::{LogReporter, NullReporter, Reporter};
pub use resolver::{ResolveError, ResolveRequest, Resolver};
pub use source::{Release, ReleaseAsset, ReleaseSource, SourceError};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("llvmup/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the release source and the downloader.
///
/// No request timeout is set; transport defaults apply.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

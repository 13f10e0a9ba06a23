//! Fetch-and-install driver.
//!
//! Resolve → download (primary and companion together) → unpack with
//! external tools → move into place → write a receipt. The toolchain lands in
//! `<home>/toolchains/<tag>/<platform>-<arch>[-debug]`; a second install of the
//! same asset is a no-op unless forced.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use llvmup_schema::{
    Architecture, ArchiveFormat, COMPANION_TOOL, CompanionAsset, ManifestEntry, Platform,
    ResolvedAsset,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::env::ToolchainEnv;
use crate::io::download::{DownloadError, DownloadRequest, Downloaded};
use crate::io::extract::{self, ExtractError};
use crate::paths;
use crate::reporter::Reporter;
use crate::resolver::{ResolveError, ResolveRequest, Resolver};

/// Written into every install root.
pub const RECEIPT_FILE: &str = "llvmup-receipt.json";

#[derive(Error, Debug)]
pub enum InstallError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("'{executable}' not found inside {archive}")]
    CompanionBinaryMissing { archive: String, executable: String },

    #[error("Unrecognized layout in {asset}: no bin/ directory after unpacking")]
    UnrecognizedLayout { asset: String },

    #[error("Unrecognized archive extension on {0}")]
    UnknownFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Receipt error: {0}")]
    Receipt(#[from] serde_json::Error),
}

/// What was installed, for `--force`-less reinstalls and for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tag: String,
    pub version: String,
    pub platform: Platform,
    pub architecture: Architecture,
    pub debug: bool,
    pub asset_name: String,
    pub download_url: String,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<String>,
    pub installed_at: DateTime<Utc>,
}

impl Receipt {
    fn new(entry: &ManifestEntry, download: &Downloaded, companion: Option<&ResolvedAsset>) -> Self {
        Self {
            tag: entry.tag.clone(),
            version: entry.version.clone(),
            platform: entry.platform,
            architecture: entry.architecture,
            debug: entry.debug,
            asset_name: entry.asset_name.clone(),
            download_url: entry.download_url.clone(),
            sha256: download.sha256.clone(),
            companion: companion.map(|c| c.name.clone()),
            installed_at: Utc::now(),
        }
    }

    /// Read the receipt in `root`, if there is a readable one.
    pub async fn load(root: &Path) -> Option<Self> {
        let json = fs::read_to_string(root.join(RECEIPT_FILE)).await.ok()?;
        serde_json::from_str(&json).ok()
    }

    async fn save(&self, root: &Path) -> Result<(), InstallError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(root.join(RECEIPT_FILE), json).await?;
        Ok(())
    }
}

/// A finished install.
#[derive(Debug, Clone)]
pub struct Installation {
    /// `<home>/toolchains/<tag>/<platform>-<arch>[-debug]`
    pub root: PathBuf,
    pub env: ToolchainEnv,
    pub receipt: Receipt,
    /// `true` when an existing install was kept as is.
    pub reused: bool,
}

pub struct Installer<'a> {
    config: &'a Config,
    client: Client,
    resolver: Resolver<'a>,
    reporter: &'a dyn Reporter,
    force: bool,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a Config,
        client: Client,
        resolver: Resolver<'a>,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            client,
            resolver,
            reporter,
            force: false,
        }
    }

    /// Reinstall even when a matching receipt exists.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Install the toolchain matching `request`.
    ///
    /// # Errors
    ///
    /// Any resolution, download, extraction, or filesystem failure. A failed
    /// install leaves any previous install of the same asset untouched.
    #[instrument(skip_all, fields(request = %request))]
    pub async fn install(&self, request: &ResolveRequest) -> Result<Installation, InstallError> {
        self.reporter.section("Resolving");
        let entry = self.resolver.entry(request)?;
        let archive = entry.archive();
        let format = ArchiveFormat::split(&archive.name)
            .map(|(_, format)| format)
            .ok_or_else(|| InstallError::UnknownFormat(archive.name.clone()))?;

        let root = paths::toolchain_dir(
            &self.config.home,
            &entry.tag,
            entry.platform,
            entry.architecture,
            entry.debug,
        );

        if !self.force {
            if let Some(existing) = self.existing(&root, entry).await {
                self.reporter.done(&archive.name, "already installed");
                return Ok(existing);
            }
        }

        let companion = if format == ArchiveFormat::TarZst {
            Some(self.resolver.companion(request).await?)
        } else {
            None
        };

        self.reporter.section("Downloading");
        let cache = self.config.cache_dir();
        let (primary, zstd) = match &companion {
            Some(companion) => {
                let (primary, zstd) = tokio::try_join!(
                    self.download(&archive, &cache),
                    self.companion_binary(companion, entry.platform),
                )?;
                (primary, Some(zstd))
            }
            None => (self.download(&archive, &cache).await?, None),
        };

        self.reporter.section("Installing");
        self.reporter.extracting(&archive.name);
        let staging = self.config.tmp_dir().join(format!(
            "{}-{}",
            entry.tag,
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
        if fs::try_exists(&staging).await? {
            fs::remove_dir_all(&staging).await?;
        }

        let scratch = self.config.tmp_dir();
        let unpacked = extract::unpack_primary(
            zstd.as_deref().unwrap_or(Path::new(COMPANION_TOOL)),
            &primary.path,
            format,
            &staging,
            &scratch,
        )
        .await;
        if let Err(e) = unpacked {
            fs::remove_dir_all(&staging).await.ok();
            return Err(e.into());
        }

        if ToolchainEnv::detect(&staging).is_none() {
            fs::remove_dir_all(&staging).await.ok();
            return Err(InstallError::UnrecognizedLayout {
                asset: archive.name.clone(),
            });
        }

        let receipt = Receipt::new(entry, &primary, companion.as_ref());
        receipt.save(&staging).await?;

        if let Err(e) = replace_dir(&staging, &root).await {
            fs::remove_dir_all(&staging).await.ok();
            return Err(e);
        }

        let env = ToolchainEnv::detect(&root).ok_or_else(|| InstallError::UnrecognizedLayout {
            asset: archive.name.clone(),
        })?;
        info!(root = %root.display(), "installed");
        self.reporter.done(&archive.name, "installed");

        Ok(Installation {
            root,
            env,
            receipt,
            reused: false,
        })
    }

    async fn existing(&self, root: &Path, entry: &ManifestEntry) -> Option<Installation> {
        let receipt = Receipt::load(root).await?;
        if receipt.asset_name != entry.asset_name || receipt.download_url != entry.download_url {
            self.reporter.warning(&format!(
                "{} holds {}; replacing it with {}",
                root.display(),
                receipt.asset_name,
                entry.asset_name
            ));
            return None;
        }
        let env = ToolchainEnv::detect(root)?;
        Some(Installation {
            root: root.to_path_buf(),
            env,
            receipt,
            reused: true,
        })
    }

    async fn download(&self, asset: &ResolvedAsset, dir: &Path) -> Result<Downloaded, InstallError> {
        Ok(DownloadRequest::new(&self.client, asset, dir, self.reporter)
            .execute()
            .await?)
    }

    /// Path to a runnable companion binary, fetching and unpacking it if needed.
    async fn companion_binary(
        &self,
        companion: &ResolvedAsset,
        platform: Platform,
    ) -> Result<PathBuf, InstallError> {
        let executable = CompanionAsset::parse(&companion.name).map_or_else(
            |_| {
                if platform.is_windows() {
                    format!("{COMPANION_TOOL}.exe")
                } else {
                    COMPANION_TOOL.to_string()
                }
            },
            |c| c.executable_name(),
        );
        let stem = ArchiveFormat::split(&companion.name).map_or(companion.name.as_str(), |(s, _)| s);
        let dir = self.config.tools_dir().join(stem);

        if let Some(found) = extract::find_executable(&dir, &executable) {
            self.reporter
                .info(&format!("Using unpacked {} at {}", companion.name, found.display()));
            return Ok(found);
        }

        let archive = self.download(companion, &self.config.cache_dir()).await?;
        self.reporter.extracting(&companion.name);
        extract::unpack_companion(&archive.path, &dir).await?;

        extract::find_executable(&dir, &executable).ok_or_else(|| {
            InstallError::CompanionBinaryMissing {
                archive: companion.name.clone(),
                executable,
            }
        })
    }
}

/// Move `staging` into `root`.
///
/// An existing `root` is first renamed to a sibling `<root>.previous`, and
/// renamed back if the move fails; it is deleted only once the new tree is
/// in place.
async fn replace_dir(staging: &Path, root: &Path) -> Result<(), InstallError> {
    if let Some(parent) = root.parent() {
        fs::create_dir_all(parent).await?;
    }

    let backup = previous_path(root);
    if fs::try_exists(&backup).await? {
        fs::remove_dir_all(&backup).await?;
    }
    let had_previous = fs::try_exists(root).await?;
    if had_previous {
        fs::rename(root, &backup).await?;
    }

    if let Err(e) = fs::rename(staging, root).await {
        let restored = if had_previous {
            fs::rename(&backup, root).await
        } else {
            Ok(())
        };
        if let Err(restore) = restored {
            warn!(backup = %backup.display(), "could not restore previous install: {restore}");
        }
        return Err(e.into());
    }

    if had_previous {
        fs::remove_dir_all(&backup).await.ok();
    }
    Ok(())
}

fn previous_path(root: &Path) -> PathBuf {
    let mut name = root.as_os_str().to_owned();
    name.push(".previous");
    PathBuf::from(name)
}

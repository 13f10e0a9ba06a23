//! Request → download location.
//!
//! Primary archives come straight from the manifest. Companions come from the
//! manifest when the rebuild recorded one, otherwise from a live look at the
//! entry's own release and then at the latest release, since the decompressor
//! is published on its own schedule and may lag a new toolchain release.

use std::sync::Arc;

use llvmup_schema::{
    Architecture, COMPANION_TOOL, CompanionPattern, IdentifierError, ManifestEntry, Platform,
    ResolvedAsset, VersionQuery,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::manifest::Manifest;
use crate::source::{Release, ReleaseSource, SourceError};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(
        "No archive found for version '{version}' (platform: {platform}, architecture: {architecture}{})",
        variant_label(.debug)
    )]
    NoArchiveFound {
        version: String,
        platform: Platform,
        architecture: Architecture,
        /// `None` for companion lookups, which accept any variant.
        debug: Option<bool>,
    },

    #[error(
        "No {tool} companion for {platform}/{architecture} in release '{tag}' or the latest release",
        tool = COMPANION_TOOL
    )]
    NoCompanionFound {
        platform: Platform,
        architecture: Architecture,
        tag: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

fn variant_label(debug: &Option<bool>) -> &'static str {
    match debug {
        Some(true) => ", variant: debug",
        Some(false) => ", variant: release",
        None => "",
    }
}

/// A fully normalized request: no `host`, a classified version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub version: VersionQuery,
    pub platform: Platform,
    pub architecture: Architecture,
    pub debug: bool,
}

impl ResolveRequest {
    /// Normalize raw caller input.
    ///
    /// # Errors
    ///
    /// Any [`IdentifierError`] from the platform, architecture, or version.
    pub fn parse(
        version: &str,
        platform: &str,
        architecture: &str,
        debug: bool,
    ) -> Result<Self, IdentifierError> {
        Ok(Self {
            version: VersionQuery::classify(version)?,
            platform: Platform::normalize(platform)?,
            architecture: Architecture::normalize(architecture)?,
            debug,
        })
    }

    fn not_found(&self, debug: Option<bool>) -> ResolveError {
        ResolveError::NoArchiveFound {
            version: self.version.to_string(),
            platform: self.platform,
            architecture: self.architecture,
            debug,
        }
    }
}

impl std::fmt::Display for ResolveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}-{}", self.version, self.platform, self.architecture)?;
        if self.debug {
            f.write_str(" (debug)")?;
        }
        Ok(())
    }
}

/// Resolves requests against one manifest snapshot.
pub struct Resolver<'a> {
    manifest: Arc<Manifest>,
    source: &'a dyn ReleaseSource,
}

impl<'a> Resolver<'a> {
    pub fn new(manifest: Arc<Manifest>, source: &'a dyn ReleaseSource) -> Self {
        Self { manifest, source }
    }

    /// The manifest entry for `request`.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NoArchiveFound`] if no entry matches.
    pub fn entry(&self, request: &ResolveRequest) -> Result<&ManifestEntry, ResolveError> {
        self.manifest
            .lookup(
                &request.version,
                request.platform,
                request.architecture,
                request.debug,
            )
            .ok_or_else(|| request.not_found(Some(request.debug)))
    }

    /// Primary archive for raw, un-normalized input.
    ///
    /// # Errors
    ///
    /// Identifier errors, or [`ResolveError::NoArchiveFound`].
    pub fn resolve_primary(
        &self,
        version: &str,
        platform: &str,
        architecture: &str,
        debug: bool,
    ) -> Result<ResolvedAsset, ResolveError> {
        let request = ResolveRequest::parse(version, platform, architecture, debug)?;
        self.primary(&request)
    }

    /// Primary archive for a normalized request.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NoArchiveFound`] if no entry matches.
    pub fn primary(&self, request: &ResolveRequest) -> Result<ResolvedAsset, ResolveError> {
        self.entry(request).map(ManifestEntry::archive)
    }

    /// Companion decompressor for raw, un-normalized input. Any variant's
    /// manifest entry can anchor the search.
    ///
    /// # Errors
    ///
    /// Identifier errors, [`ResolveError::NoArchiveFound`],
    /// [`ResolveError::NoCompanionFound`], or a source failure during the
    /// fallback queries.
    pub async fn resolve_companion(
        &self,
        version: &str,
        platform: &str,
        architecture: &str,
    ) -> Result<ResolvedAsset, ResolveError> {
        let request = ResolveRequest::parse(version, platform, architecture, false)?;
        let entry = self
            .manifest
            .find_any_variant(&request.version, request.platform, request.architecture)
            .ok_or_else(|| request.not_found(None))?;
        self.companion_for(entry).await
    }

    /// Companion decompressor for a normalized request, anchored on the
    /// request's own variant when it exists.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_companion`].
    pub async fn companion(&self, request: &ResolveRequest) -> Result<ResolvedAsset, ResolveError> {
        let entry = self
            .manifest
            .lookup(
                &request.version,
                request.platform,
                request.architecture,
                request.debug,
            )
            .or_else(|| {
                self.manifest.find_any_variant(
                    &request.version,
                    request.platform,
                    request.architecture,
                )
            })
            .ok_or_else(|| request.not_found(None))?;
        self.companion_for(entry).await
    }

    #[instrument(skip_all, fields(tag = %entry.tag, platform = %entry.platform, arch = %entry.architecture))]
    async fn companion_for(&self, entry: &ManifestEntry) -> Result<ResolvedAsset, ResolveError> {
        if let Some(companion) = entry.companion() {
            return Ok(companion);
        }

        let pattern = CompanionPattern::new(entry.platform, entry.architecture);

        match self.source.release_by_tag(&entry.tag).await {
            Ok(release) => {
                if let Some(found) = select_companion(&release, &pattern) {
                    debug!(name = %found.name, "companion found in the entry's release");
                    return Ok(found);
                }
            }
            Err(SourceError::NotFound { .. }) => {
                debug!("entry's release no longer exists");
            }
            Err(e) => return Err(e.into()),
        }

        match self.source.latest_release().await {
            Ok(release) => {
                if let Some(found) = select_companion(&release, &pattern) {
                    info!(name = %found.name, latest = %release.tag_name, "using companion from the latest release");
                    return Ok(found);
                }
            }
            Err(SourceError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        Err(ResolveError::NoCompanionFound {
            platform: entry.platform,
            architecture: entry.architecture,
            tag: entry.tag.clone(),
        })
    }
}

fn select_companion(release: &Release, pattern: &CompanionPattern) -> Option<ResolvedAsset> {
    let name = pattern.select(release.asset_names())?;
    release
        .asset(name)
        .map(|a| ResolvedAsset::new(&a.browser_download_url, &a.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryReleaseSource;
    use chrono::{TimeZone, Utc};

    const X86_LINUX: &str = "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst";
    const X86_LINUX_DEBUG: &str = "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86_debug.tar.zst";
    const ARM_MAC: &str = "llvm-mlir_llvmorg-21.1.8_macos_macos-14_AArch64.tar.zst";
    const HASH_LINUX: &str =
        "llvm-mlir_f8cb7987c64dcffb72414a40560055cb717dbf74_linux_ubuntu-24.04_X86.tar.zst";

    fn dl(tag: &str, name: &str) -> String {
        format!("https://github.com/acme/llvm/releases/download/{tag}/{name}")
    }

    fn release(tag: &str, day: u32, assets: &[&str]) -> Release {
        let mut r = Release::new(tag, format!("https://github.com/acme/llvm/releases/tag/{tag}"))
            .published(Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap());
        for name in assets {
            r = r.with_asset(*name, dl(tag, name));
        }
        r
    }

    /// Toolchain release without any companion, plus a later tools-only release.
    fn releases() -> Vec<Release> {
        vec![
            release(
                "llvmorg-21.1.8",
                1,
                &[X86_LINUX, X86_LINUX_DEBUG, ARM_MAC, HASH_LINUX],
            ),
            release(
                "tools-2025.03",
                2,
                &[
                    "zstd-v1.5.7_linux_X86.tar.gz",
                    "zstd-v1.5.7_windows_X86.zip",
                ],
            ),
        ]
    }

    #[test]
    fn test_resolve_primary_every_shape() {
        let source = MemoryReleaseSource::new(releases());
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        let a = resolver
            .resolve_primary("21.1.8", "linux", "x86", false)
            .unwrap();
        assert_eq!(a, ResolvedAsset::new(dl("llvmorg-21.1.8", X86_LINUX), X86_LINUX));

        let a = resolver
            .resolve_primary("21.1.8", "linux", "x86", true)
            .unwrap();
        assert_eq!(a.name, X86_LINUX_DEBUG);

        let a = resolver
            .resolve_primary("f8cb798", "linux", "x86", false)
            .unwrap();
        assert_eq!(a.name, HASH_LINUX);
        assert_eq!(a.url, dl("llvmorg-21.1.8", HASH_LINUX));
    }

    #[test]
    fn test_resolve_primary_miss_names_the_request() {
        let source = MemoryReleaseSource::new(releases());
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        let err = resolver
            .resolve_primary("21.1.8", "windows", "aarch64", true)
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ResolveError::NoArchiveFound { .. }));
        for part in ["21.1.8", "windows", "aarch64", "debug"] {
            assert!(msg.contains(part), "{msg}");
        }
    }

    #[test]
    fn test_bad_identifiers_fail_before_lookup() {
        let source = MemoryReleaseSource::new(releases());
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        for (v, p, a) in [
            ("21.1.8", "Linux", "x86"),
            ("21.1.8", "linux", "x86_64"),
            ("21.1", "linux", "x86"),
        ] {
            let err = resolver.resolve_primary(v, p, a, false).unwrap_err();
            assert!(matches!(err, ResolveError::Identifier(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn test_companion_falls_back_to_latest_release() {
        let source = MemoryReleaseSource::new(releases()).with_latest("tools-2025.03");
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        let c = resolver
            .resolve_companion("21.1.8", "linux", "x86")
            .await
            .unwrap();
        assert_eq!(c.name, "zstd-v1.5.7_linux_X86.tar.gz");
        assert_eq!(c.url, dl("tools-2025.03", "zstd-v1.5.7_linux_X86.tar.gz"));
    }

    #[tokio::test]
    async fn test_companion_prefers_the_entry_release() {
        let mut rs = releases();
        rs[0] = rs[0]
            .clone()
            .with_asset("zstd-v1.5.6_linux_X86.tar.gz", "https://own/zstd");
        // Manifest built before the companion was uploaded.
        let manifest = Manifest::build(releases());
        let source = MemoryReleaseSource::new(rs).with_latest("tools-2025.03");
        let resolver = Resolver::new(Arc::new(manifest), &source);

        let c = resolver
            .resolve_companion("21.1.8", "linux", "x86")
            .await
            .unwrap();
        assert_eq!(c.url, "https://own/zstd");
    }

    #[tokio::test]
    async fn test_companion_recorded_at_rebuild_needs_no_network() {
        let mut rs = releases();
        rs[0] = rs[0]
            .clone()
            .with_asset("zstd-v1.5.6_linux_X86.tar.gz", "https://own/zstd");
        let manifest = Manifest::build(rs);
        let offline = MemoryReleaseSource::offline();
        let resolver = Resolver::new(Arc::new(manifest), &offline);

        let c = resolver
            .resolve_companion("21.1.8", "linux", "x86")
            .await
            .unwrap();
        assert_eq!(c.name, "zstd-v1.5.6_linux_X86.tar.gz");
    }

    #[tokio::test]
    async fn test_no_companion_anywhere() {
        let source = MemoryReleaseSource::new(releases()).with_latest("tools-2025.03");
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        let err = resolver
            .resolve_companion("21.1.8", "macos", "aarch64")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoCompanionFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_companion_source_failure_propagates() {
        let offline = MemoryReleaseSource::offline();
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &offline);

        let err = resolver
            .resolve_companion("21.1.8", "linux", "x86")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Source(SourceError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_companion_for_unknown_version() {
        let source = MemoryReleaseSource::new(releases());
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        let err = resolver
            .resolve_companion("9.9.9", "linux", "x86")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoArchiveFound { debug: None, .. }));
        assert!(!err.to_string().contains("variant"));
    }

    #[tokio::test]
    async fn test_debug_request_uses_its_own_entry() {
        let source = MemoryReleaseSource::new(releases()).with_latest("tools-2025.03");
        let resolver = Resolver::new(Arc::new(Manifest::build(releases())), &source);

        let request = ResolveRequest::parse("21.1.8", "linux", "x86", true).unwrap();
        assert_eq!(resolver.primary(&request).unwrap().name, X86_LINUX_DEBUG);
        assert!(resolver.companion(&request).await.is_ok());
    }
}

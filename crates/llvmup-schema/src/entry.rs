//! Records persisted in the manifest document.

use serde::{Deserialize, Serialize};

use crate::identifier::{Architecture, Platform};

/// One resolved primary archive.
///
/// Field order is the serialized key order of the manifest document. Both
/// historical document generations load: entries without `debug` are release
/// builds, and entries without the `zstd_*` pair simply have no companion
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Target CPU family.
    pub architecture: Architecture,
    /// Exact released file name.
    pub asset_name: String,
    /// Whether this is a debug build.
    #[serde(default)]
    pub debug: bool,
    /// Absolute download location of the archive.
    pub download_url: String,
    /// Target platform.
    pub platform: Platform,
    /// Human-facing page of the release holding this asset.
    pub release_url: String,
    /// Tag of the release holding this asset.
    pub tag: String,
    /// `MAJOR.MINOR.PATCH` or a lower-case commit hash.
    pub version: String,
    /// Companion decompressor found in the same release, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zstd_asset_name: Option<String>,
    /// Download location of [`zstd_asset_name`](Self::zstd_asset_name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zstd_download_url: Option<String>,
}

impl ManifestEntry {
    /// The uniqueness key of this record.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            version: self.version.clone(),
            platform: self.platform,
            architecture: self.architecture,
            debug: self.debug,
        }
    }

    /// The primary archive as a download target.
    pub fn archive(&self) -> ResolvedAsset {
        ResolvedAsset::new(&self.download_url, &self.asset_name)
    }

    /// The companion recorded at rebuild time, if both halves are present.
    pub fn companion(&self) -> Option<ResolvedAsset> {
        match (&self.zstd_download_url, &self.zstd_asset_name) {
            (Some(url), Some(name)) => Some(ResolvedAsset::new(url, name)),
            _ => None,
        }
    }

    /// Record a companion for this entry.
    pub fn set_companion(&mut self, companion: &ResolvedAsset) {
        self.zstd_asset_name = Some(companion.name.clone());
        self.zstd_download_url = Some(companion.url.clone());
    }
}

/// `(version, platform, architecture, variant)`: at most one entry per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    /// Stored version string.
    pub version: String,
    /// Target platform.
    pub platform: Platform,
    /// Target CPU family.
    pub architecture: Architecture,
    /// Debug variant flag.
    pub debug: bool,
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}{}",
            self.version,
            self.platform,
            self.architecture,
            if self.debug { " (debug)" } else { "" }
        )
    }
}

/// A downloadable file: what the resolver hands to the installer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedAsset {
    /// Absolute download location.
    pub url: String,
    /// Exact released file name.
    pub name: String,
}

impl ResolvedAsset {
    /// Build from a URL and file name.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ManifestEntry {
        ManifestEntry {
            architecture: Architecture::X86,
            asset_name: "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst".to_string(),
            debug: false,
            download_url: "https://example/llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst"
                .to_string(),
            platform: Platform::Linux,
            release_url: "https://example/releases/llvmorg-21.1.8".to_string(),
            tag: "llvmorg-21.1.8".to_string(),
            version: "21.1.8".to_string(),
            zstd_asset_name: None,
            zstd_download_url: None,
        }
    }

    #[test]
    fn test_serialized_field_order() {
        let json = serde_json::to_string(&entry()).unwrap();
        let keys = [
            "\"architecture\"",
            "\"asset_name\"",
            "\"debug\"",
            "\"download_url\"",
            "\"platform\"",
            "\"release_url\"",
            "\"tag\"",
            "\"version\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(!json.contains("zstd_"));
    }

    #[test]
    fn test_loads_entries_with_inline_companion_and_no_debug() {
        let json = r#"{
            "architecture": "aarch64",
            "asset_name": "llvm-mlir_abcdef1_macos_macos-14_AArch64.tar.zst",
            "download_url": "https://example/a.tar.zst",
            "platform": "macos",
            "release_url": "https://example/r",
            "tag": "nightly-abcdef1",
            "version": "abcdef1",
            "zstd_asset_name": "zstd-v1.5.7_macos_AArch64.tar.gz",
            "zstd_download_url": "https://example/z.tar.gz"
        }"#;
        let e: ManifestEntry = serde_json::from_str(json).unwrap();
        assert!(!e.debug);
        assert_eq!(
            e.companion(),
            Some(ResolvedAsset::new(
                "https://example/z.tar.gz",
                "zstd-v1.5.7_macos_AArch64.tar.gz"
            ))
        );
    }

    #[test]
    fn test_companion_requires_both_halves() {
        let mut e = entry();
        e.zstd_asset_name = Some("zstd-v1.5.7_linux_X86.tar.gz".to_string());
        assert_eq!(e.companion(), None);

        e.set_companion(&ResolvedAsset::new("https://example/z", "zstd-v1.5.7_linux_X86.tar.gz"));
        assert!(e.companion().is_some());
    }

    #[test]
    fn test_key_display() {
        let mut e = entry();
        e.debug = true;
        assert_eq!(e.key().to_string(), "21.1.8 linux-x86 (debug)");
    }
}

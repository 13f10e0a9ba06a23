//! Grammar of released toolchain archive names.
//!
//! ```text
//! name         = product "_" version-token "_" platform "_" os-label "_" arch-token [ "_debug" ] "." ext
//! version-token = "llvmorg-" MAJOR "." MINOR "." PATCH | commit-hash
//! platform     = "linux" | "macos" | "windows"
//! arch-token   = "X86" | "AArch64"
//! ext          = "tar.zst" | "tar.xz" | "tar.gz" | "zip"
//! ```
//!
//! For example `llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst`.
//!
//! Asset names spell the CPU family the way LLVM target names do (`X86`,
//! `AArch64`), while the manifest and the command line use the lower-case
//! [`Architecture`] names. [`arch_token`] and [`parse_arch_token`] are the only
//! places that translate between the two. Older releases used the lower-case
//! spelling in file names too, so both are accepted when parsing.
//!
//! Structure and version are matched separately: a name can be well formed
//! but carry a version token we do not understand, and bulk scans treat the
//! two failures differently.

use thiserror::Error;

use crate::archive::ArchiveFormat;
use crate::identifier::{Architecture, Platform, is_commit_hash, is_exact_version};

/// Marker token for debug builds.
pub const DEBUG_MARKER: &str = "debug";

/// Prefix of release-version tokens.
pub const RELEASE_TAG_PREFIX: &str = "llvmorg-";

/// Errors produced while decoding an asset name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetNameError {
    /// The name does not follow the primary archive convention.
    ///
    /// Expected for companion tools and unrelated files; scans skip these.
    #[error("Unparseable asset name '{name}': {reason}")]
    UnparseableAssetName {
        /// The offending file name.
        name: String,
        /// Which part of the grammar failed.
        reason: &'static str,
    },

    /// The name is well formed but no version token could be extracted.
    #[error("Unparseable version in asset name '{name}'")]
    UnparseableAssetVersion {
        /// The offending file name.
        name: String,
    },
}

/// The asset-name spelling of an architecture.
pub fn arch_token(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X86 => "X86",
        Architecture::Aarch64 => "AArch64",
    }
}

/// Parse an architecture token as it appears in asset names.
pub fn parse_arch_token(token: &str) -> Option<Architecture> {
    match token {
        "X86" | "x86" => Some(Architecture::X86),
        "AArch64" | "aarch64" => Some(Architecture::Aarch64),
        _ => None,
    }
}

/// Fields recovered from the fixed positions of a primary asset name.
struct Layout<'a> {
    product: &'a str,
    version_token: &'a str,
    platform: Platform,
    os_label: &'a str,
    architecture: Architecture,
    debug: bool,
    format: ArchiveFormat,
}

impl<'a> Layout<'a> {
    fn parse(name: &'a str) -> Result<Self, AssetNameError> {
        let fail = |reason| AssetNameError::UnparseableAssetName {
            name: name.to_string(),
            reason,
        };

        let (stem, format) = ArchiveFormat::split(name).ok_or_else(|| fail("unknown extension"))?;
        let tokens: Vec<&str> = stem.split('_').collect();

        let (fields, debug) = match tokens.as_slice() {
            [fields @ .., last] if *last == DEBUG_MARKER => (fields, true),
            fields => (fields, false),
        };
        let &[product, version_token, platform, os_label, arch] = fields else {
            return Err(fail("expected five '_'-separated fields"));
        };

        if product.is_empty() || version_token.is_empty() || os_label.is_empty() {
            return Err(fail("empty field"));
        }
        let platform = Platform::from_token(platform).ok_or_else(|| fail("unknown platform"))?;
        let architecture = parse_arch_token(arch).ok_or_else(|| fail("unknown architecture"))?;

        Ok(Self {
            product,
            version_token,
            platform,
            os_label,
            architecture,
            debug,
            format,
        })
    }
}

/// Extract the toolchain version from an asset name.
///
/// A `llvmorg-MAJOR.MINOR.PATCH` token wins; failing that, the first token
/// that is a 7-40 character hex string is taken as a commit hash and
/// lower-cased.
///
/// # Errors
///
/// Returns [`AssetNameError::UnparseableAssetVersion`] if neither form is present.
pub fn extract_version(name: &str) -> Result<String, AssetNameError> {
    let stem = ArchiveFormat::split(name).map_or(name, |(stem, _)| stem);
    let tokens = || stem.split('_');

    tokens()
        .filter_map(|t| t.strip_prefix(RELEASE_TAG_PREFIX))
        .find(|v| is_exact_version(v))
        .map(str::to_string)
        .or_else(|| {
            tokens()
                .find(|t| is_commit_hash(t))
                .map(str::to_ascii_lowercase)
        })
        .ok_or_else(|| AssetNameError::UnparseableAssetVersion {
            name: name.to_string(),
        })
}

/// A decoded primary archive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetName {
    /// Product prefix, e.g. `llvm-mlir`.
    pub product: String,
    /// `MAJOR.MINOR.PATCH` or a lower-case commit hash.
    pub version: String,
    /// Target platform.
    pub platform: Platform,
    /// Build-image label, e.g. `ubuntu-24.04`.
    pub os_label: String,
    /// Target CPU family.
    pub architecture: Architecture,
    /// Whether this is a debug build.
    pub debug: bool,
    /// Archive format.
    pub format: ArchiveFormat,
}

impl AssetName {
    /// Decode a released file name.
    ///
    /// ```
    /// use llvmup_schema::{Architecture, AssetName, Platform};
    ///
    /// let a = AssetName::parse("llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst").unwrap();
    /// assert_eq!(a.platform, Platform::Linux);
    /// assert_eq!(a.architecture, Architecture::X86);
    /// assert_eq!(a.version, "21.1.8");
    /// assert!(!a.debug);
    /// ```
    ///
    /// # Errors
    ///
    /// [`AssetNameError::UnparseableAssetName`] if the structure does not fit,
    /// [`AssetNameError::UnparseableAssetVersion`] if only the version fails.
    pub fn parse(name: &str) -> Result<Self, AssetNameError> {
        let layout = Layout::parse(name)?;
        let version = extract_version(name)?;

        Ok(Self {
            product: layout.product.to_string(),
            version,
            platform: layout.platform,
            os_label: layout.os_label.to_string(),
            architecture: layout.architecture,
            debug: layout.debug,
            format: layout.format,
        })
    }

    /// Render the canonical file name.
    pub fn file_name(&self) -> String {
        let version_token = if is_exact_version(&self.version) {
            format!("{RELEASE_TAG_PREFIX}{}", self.version)
        } else {
            self.version.clone()
        };
        let debug = if self.debug { "_debug" } else { "" };
        format!(
            "{}_{}_{}_{}_{}{}.{}",
            self.product,
            version_token,
            self.platform,
            self.os_label,
            arch_token(self.architecture),
            debug,
            self.format.extension()
        )
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Search pattern selecting primary archives for one platform, architecture,
/// and variant out of a flat list of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetPattern {
    /// Required platform.
    pub platform: Platform,
    /// Required architecture.
    pub architecture: Architecture,
    /// Required variant.
    pub debug: bool,
}

impl AssetPattern {
    /// Build a pattern.
    pub fn new(platform: Platform, architecture: Architecture, debug: bool) -> Self {
        Self {
            platform,
            architecture,
            debug,
        }
    }

    /// Whether `name` is a primary archive for this pattern.
    ///
    /// Only the structure is checked; the version token may be anything.
    pub fn matches(&self, name: &str) -> bool {
        Layout::parse(name).is_ok_and(|l| {
            l.platform == self.platform
                && l.architecture == self.architecture
                && l.debug == self.debug
        })
    }

    /// First name in `names` accepted by [`matches`](Self::matches).
    pub fn find<'a, I>(&self, names: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().find(|n| self.matches(n))
    }
}

impl std::fmt::Display for AssetPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let debug = if self.debug { "_debug" } else { "" };
        write!(
            f,
            "*_*_{}_*_{}{}.*",
            self.platform,
            arch_token(self.architecture),
            debug
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "f8cb7987c64dcffb72414a40560055cb717dbf74";

    fn os_label(platform: Platform) -> &'static str {
        match platform {
            Platform::Linux => "ubuntu-24.04",
            Platform::Macos => "macos-14",
            Platform::Windows => "windows-2022",
        }
    }

    #[test]
    fn test_parse_recovers_every_combination() {
        for platform in Platform::ALL {
            for architecture in Architecture::ALL {
                for debug in [false, true] {
                    for (version_token, version) in
                        [("llvmorg-21.1.8", "21.1.8"), (HASH, HASH)]
                    {
                        let name = format!(
                            "llvm-mlir_{version_token}_{platform}_{}_{}{}.tar.zst",
                            os_label(platform),
                            arch_token(architecture),
                            if debug { "_debug" } else { "" }
                        );
                        let parsed = AssetName::parse(&name).unwrap();
                        assert_eq!(parsed.platform, platform, "{name}");
                        assert_eq!(parsed.architecture, architecture, "{name}");
                        assert_eq!(parsed.debug, debug, "{name}");
                        assert_eq!(parsed.version, version, "{name}");
                        assert_eq!(parsed.file_name(), name);
                    }
                }
            }
        }
    }

    #[test]
    fn test_parse_fields() {
        let a = AssetName::parse("mlir_llvmorg-19.1.0_macos_macos-14_AArch64_debug.tar.xz").unwrap();
        assert_eq!(a.product, "mlir");
        assert_eq!(a.os_label, "macos-14");
        assert_eq!(a.format, ArchiveFormat::TarXz);
        assert!(a.debug);
    }

    #[test]
    fn test_legacy_lowercase_arch_token() {
        let a = AssetName::parse("llvm-mlir_llvmorg-18.1.0_linux_ubuntu-22.04_aarch64.tar.zst")
            .unwrap();
        assert_eq!(a.architecture, Architecture::Aarch64);
        assert!(a.file_name().ends_with("_AArch64.tar.zst"));
    }

    #[test]
    fn test_uppercase_hash_is_lowered() {
        let name = "llvm-mlir_F8CB7987C64D_linux_ubuntu-24.04_X86.tar.zst";
        assert_eq!(AssetName::parse(name).unwrap().version, "f8cb7987c64d");
    }

    #[test]
    fn test_companion_and_unrelated_names_are_unparseable() {
        for name in [
            "zstd-v1.5.7_linux_X86.tar.gz",
            "zstd-v1.5.7_windows_X86.zip",
            "checksums.txt",
            "llvm-mlir_llvmorg-21.1.8_solaris_sol-11_X86.tar.zst",
            "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_riscv64.tar.zst",
            "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86_release.tar.zst",
            "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar",
        ] {
            assert!(
                matches!(
                    AssetName::parse(name),
                    Err(AssetNameError::UnparseableAssetName { .. })
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn test_bad_version_is_distinct_error() {
        for name in [
            "llvm-mlir_llvmorg-21.1_linux_ubuntu-24.04_X86.tar.zst",
            "llvm-mlir_nightly_linux_ubuntu-24.04_X86.tar.zst",
            "llvm-mlir_llvmorg-21.1.8-rc1_linux_ubuntu-24.04_X86.tar.zst",
        ] {
            assert_eq!(
                AssetName::parse(name),
                Err(AssetNameError::UnparseableAssetVersion {
                    name: name.to_string()
                })
            );
        }
    }

    #[test]
    fn test_extract_version_prefers_release_token() {
        assert_eq!(
            extract_version("x_llvmorg-20.1.0_linux_deadbeef00_X86.tar.zst").unwrap(),
            "20.1.0"
        );
        assert_eq!(
            extract_version("x_abcdef1_linux_ubuntu-24.04_X86.tar.zst").unwrap(),
            "abcdef1"
        );
    }

    #[test]
    fn test_pattern_matching() {
        let names = [
            "zstd-v1.5.7_linux_X86.tar.gz",
            "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86_debug.tar.zst",
            "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_AArch64.tar.zst",
            "llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst",
        ];
        let release = AssetPattern::new(Platform::Linux, Architecture::X86, false);
        assert_eq!(
            release.find(names),
            Some("llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86.tar.zst")
        );

        let debug = AssetPattern::new(Platform::Linux, Architecture::X86, true);
        assert_eq!(
            debug.find(names),
            Some("llvm-mlir_llvmorg-21.1.8_linux_ubuntu-24.04_X86_debug.tar.zst")
        );

        let mac = AssetPattern::new(Platform::Macos, Architecture::Aarch64, false);
        assert_eq!(mac.find(names), None);
    }

    #[test]
    fn test_pattern_display() {
        let p = AssetPattern::new(Platform::Windows, Architecture::Aarch64, true);
        assert_eq!(p.to_string(), "*_*_windows_*_AArch64_debug.*");
    }
}

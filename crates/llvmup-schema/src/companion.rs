//! Grammar of companion decompressor assets.
//!
//! The primary archives are `.tar.zst`, and the `zstd` binary needed to
//! unpack them ships as its own asset in the same (or a later) release:
//!
//! ```text
//! name = tool "-" tool-version "_" platform "_" arch-token "." ext
//! ext  = "zip"     on windows
//!      | "tar.gz"  elsewhere
//! ```
//!
//! e.g. `zstd-v1.5.7_linux_X86.tar.gz` or `zstd-v1.5.7_windows_X86.zip`.

use crate::archive::ArchiveFormat;
use crate::asset_name::{AssetNameError, arch_token, parse_arch_token};
use crate::identifier::{Architecture, Platform};

/// Name of the companion decompressor.
pub const COMPANION_TOOL: &str = "zstd";

/// Archive format the companion is packaged in for `platform`.
pub fn companion_format(platform: Platform) -> ArchiveFormat {
    if platform.is_windows() {
        ArchiveFormat::Zip
    } else {
        ArchiveFormat::TarGz
    }
}

/// A decoded companion asset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionAsset {
    /// Tool name, e.g. `zstd`.
    pub tool: String,
    /// Tool release, e.g. `v1.5.7`.
    pub tool_version: String,
    /// Target platform.
    pub platform: Platform,
    /// Target CPU family.
    pub architecture: Architecture,
    /// Archive format; always [`companion_format`] of the platform.
    pub format: ArchiveFormat,
}

impl CompanionAsset {
    /// Decode a companion file name.
    ///
    /// # Errors
    ///
    /// Returns [`AssetNameError::UnparseableAssetName`] if the name does not
    /// follow the companion convention, including an extension that does not
    /// belong to the platform.
    pub fn parse(name: &str) -> Result<Self, AssetNameError> {
        let fail = |reason| AssetNameError::UnparseableAssetName {
            name: name.to_string(),
            reason,
        };

        let (stem, format) = ArchiveFormat::split(name).ok_or_else(|| fail("unknown extension"))?;
        let mut tokens = stem.split('_');
        let (Some(tool_and_version), Some(platform), Some(arch), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(fail("expected three '_'-separated fields"));
        };

        let (tool, tool_version) = tool_and_version
            .split_once('-')
            .filter(|(t, v)| !t.is_empty() && !v.is_empty())
            .ok_or_else(|| fail("expected tool-version"))?;
        let platform = Platform::from_token(platform).ok_or_else(|| fail("unknown platform"))?;
        let architecture = parse_arch_token(arch).ok_or_else(|| fail("unknown architecture"))?;

        if format != companion_format(platform) {
            return Err(fail("extension does not match platform"));
        }

        Ok(Self {
            tool: tool.to_string(),
            tool_version: tool_version.to_string(),
            platform,
            architecture,
            format,
        })
    }

    /// Render the canonical file name.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}_{}_{}.{}",
            self.tool,
            self.tool_version,
            self.platform,
            arch_token(self.architecture),
            self.format.extension()
        )
    }

    /// Executable name inside the unpacked archive.
    pub fn executable_name(&self) -> String {
        if self.platform.is_windows() {
            format!("{}.exe", self.tool)
        } else {
            self.tool.clone()
        }
    }
}

/// Search pattern selecting the companion for one platform and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompanionPattern {
    /// Required platform.
    pub platform: Platform,
    /// Required architecture.
    pub architecture: Architecture,
}

impl CompanionPattern {
    /// Build a pattern.
    pub fn new(platform: Platform, architecture: Architecture) -> Self {
        Self {
            platform,
            architecture,
        }
    }

    /// Whether `name` is the companion tool for this platform and architecture.
    pub fn matches(&self, name: &str) -> bool {
        CompanionAsset::parse(name).is_ok_and(|c| {
            c.tool == COMPANION_TOOL
                && c.platform == self.platform
                && c.architecture == self.architecture
        })
    }

    /// Lexically first matching name, so repeated scans of the same release
    /// always choose the same asset.
    pub fn select<'a, I>(&self, names: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().filter(|n| self.matches(n)).min()
    }
}

impl std::fmt::Display for CompanionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{COMPANION_TOOL}-*_{}_{}.{}",
            self.platform,
            arch_token(self.architecture),
            companion_format(self.platform)
        )
    }
}

//! Archive formats found at the end of released file names.

use serde::{Deserialize, Serialize};

/// Archive format identified by a file name's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// Zstandard-compressed tar archive (`.tar.zst`).
    #[serde(rename = "tar.zst")]
    TarZst,
    /// XZ-compressed tar archive (`.tar.xz`).
    #[serde(rename = "tar.xz")]
    TarXz,
    /// Gzip-compressed tar archive (`.tar.gz`).
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Every recognized format, longest extension first.
    pub const ALL: [Self; 4] = [Self::TarZst, Self::TarXz, Self::TarGz, Self::Zip];

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarZst => "tar.zst",
            Self::TarXz => "tar.xz",
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Split `name` into its stem and archive format.
    ///
    /// Matching is exact: `.TAR.ZST` is not recognized.
    ///
    /// ```
    /// use llvmup_schema::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::split("zstd-v1.5.7_linux_X86.tar.gz"),
    ///     Some(("zstd-v1.5.7_linux_X86", ArchiveFormat::TarGz))
    /// );
    /// assert_eq!(ArchiveFormat::split("README.md"), None);
    /// ```
    pub fn split(name: &str) -> Option<(&str, Self)> {
        Self::ALL.into_iter().find_map(|format| {
            name.strip_suffix(format.extension())
                .and_then(|rest| rest.strip_suffix('.'))
                .filter(|stem| !stem.is_empty())
                .map(|stem| (stem, format))
        })
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

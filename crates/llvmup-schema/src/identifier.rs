//! Validation and canonicalization of the four resolution keys.
//!
//! Callers hand us raw strings for platform, architecture, and version. The
//! literal `host` is accepted for platform and architecture and is resolved
//! against the running process before any lookup happens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tokens accepted for the platform key, in the order shown to users.
pub const PLATFORM_CHOICES: &[&str] = &["host", "linux", "macos", "windows"];

/// Tokens accepted for the architecture key, in the order shown to users.
pub const ARCHITECTURE_CHOICES: &[&str] = &["host", "x86", "aarch64"];

/// Wildcard meaning "whatever this process runs on".
pub const HOST: &str = "host";

/// Shortest commit hash prefix accepted as a version.
pub const MIN_COMMIT_LEN: usize = 7;

/// Length of a full commit hash.
pub const MAX_COMMIT_LEN: usize = 40;

/// Errors raised while validating user-supplied identifiers.
///
/// All of these are detected before any network access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The platform is not one of [`PLATFORM_CHOICES`].
    #[error("Invalid platform '{value}': expected one of {}", PLATFORM_CHOICES.join(", "))]
    InvalidPlatform {
        /// The rejected input.
        value: String,
    },

    /// The architecture is not one of [`ARCHITECTURE_CHOICES`].
    #[error("Invalid architecture '{value}': expected one of {}", ARCHITECTURE_CHOICES.join(", "))]
    InvalidArchitecture {
        /// The rejected input.
        value: String,
    },

    /// The version is neither `MAJOR.MINOR.PATCH` nor a 7-40 character hex hash.
    #[error(
        "Invalid version '{value}': expected MAJOR.MINOR.PATCH or a {min}-{max} character commit hash",
        min = MIN_COMMIT_LEN,
        max = MAX_COMMIT_LEN
    )]
    InvalidVersionFormat {
        /// The rejected input.
        value: String,
    },

    /// `host` was requested but the running OS/CPU has no prebuilt toolchain.
    #[error("Unsupported host: {os} on {arch}")]
    UnsupportedHost {
        /// Operating system reported by the process.
        os: String,
        /// CPU family reported by the process.
        arch: String,
    },
}

/// Target operating system of a prebuilt archive.
///
/// Variant order is the ascending order of the canonical names, so the derived
/// `Ord` sorts the same way the manifest document does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux distributions.
    Linux,
    /// Apple macOS.
    Macos,
    /// Microsoft Windows.
    Windows,
}

impl Platform {
    /// All concrete platforms in canonical order.
    pub const ALL: [Self; 3] = [Self::Linux, Self::Macos, Self::Windows];

    /// Validate a caller-supplied platform, resolving `host`.
    ///
    /// Matching is case-sensitive: `Linux` is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidPlatform`] for unknown tokens and
    /// [`IdentifierError::UnsupportedHost`] if `host` cannot be resolved.
    pub fn normalize(input: &str) -> Result<Self, IdentifierError> {
        if input == HOST {
            return Self::host();
        }
        Self::from_token(input).ok_or_else(|| IdentifierError::InvalidPlatform {
            value: input.to_string(),
        })
    }

    /// The platform this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::UnsupportedHost`] on any other OS.
    pub fn host() -> Result<Self, IdentifierError> {
        Self::from_host_os(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map an OS name as reported by `std::env::consts::OS`.
    ///
    /// `arch` is only used to build the error message.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::UnsupportedHost`] for unrecognized systems.
    pub fn from_host_os(os: &str, arch: &str) -> Result<Self, IdentifierError> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Macos),
            "windows" => Ok(Self::Windows),
            _ => Err(IdentifierError::UnsupportedHost {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Parse a concrete canonical token (no `host`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }

    /// Whether this is Windows.
    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

/// Target CPU family of a prebuilt archive.
///
/// The canonical names are lower-case (`x86`, `aarch64`). Asset file names
/// spell them differently; see [`crate::asset_name`] for that mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 64-bit ARM.
    Aarch64,
    /// 64-bit x86.
    X86,
}

impl Architecture {
    /// All concrete architectures in canonical order.
    pub const ALL: [Self; 2] = [Self::Aarch64, Self::X86];

    /// Validate a caller-supplied architecture, resolving `host`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidArchitecture`] for unknown tokens and
    /// [`IdentifierError::UnsupportedHost`] if `host` cannot be resolved.
    pub fn normalize(input: &str) -> Result<Self, IdentifierError> {
        if input == HOST {
            return Self::host();
        }
        Self::from_token(input).ok_or_else(|| IdentifierError::InvalidArchitecture {
            value: input.to_string(),
        })
    }

    /// The CPU family this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::UnsupportedHost`] on any other CPU.
    pub fn host() -> Result<Self, IdentifierError> {
        Self::from_host_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map a CPU name as reported by `std::env::consts::ARCH`.
    ///
    /// Only 64-bit hosts are supported; `os` is only used in the error.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::UnsupportedHost`] for unrecognized CPUs.
    pub fn from_host_arch(os: &str, arch: &str) -> Result<Self, IdentifierError> {
        match arch {
            "x86_64" => Ok(Self::X86),
            "aarch64" => Ok(Self::Aarch64),
            _ => Err(IdentifierError::UnsupportedHost {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Parse a concrete canonical token (no `host`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "x86" => Some(Self::X86),
            "aarch64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aarch64 => "aarch64",
            Self::X86 => "x86",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Architecture {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

/// A requested toolchain version.
///
/// Exact versions compare by equality. Commit hashes are stored lower-cased
/// and compare by prefix, so `f8cb798` finds the full 40 character hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionQuery {
    /// A `MAJOR.MINOR.PATCH` release version.
    Exact(String),
    /// A short or full commit hash, lower-cased.
    CommitPrefix(String),
}

impl VersionQuery {
    /// Classify a caller-supplied version string.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidVersionFormat`] if the input is
    /// neither form.
    pub fn classify(input: &str) -> Result<Self, IdentifierError> {
        if is_exact_version(input) {
            Ok(Self::Exact(input.to_string()))
        } else if is_commit_hash(input) {
            Ok(Self::CommitPrefix(input.to_ascii_lowercase()))
        } else {
            Err(IdentifierError::InvalidVersionFormat {
                value: input.to_string(),
            })
        }
    }

    /// The normalized query string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(v) | Self::CommitPrefix(v) => v,
        }
    }

    /// Whether a stored manifest version satisfies this query.
    pub fn matches(&self, stored: &str) -> bool {
        match self {
            Self::Exact(v) => stored == v,
            Self::CommitPrefix(prefix) => stored.starts_with(prefix.as_str()),
        }
    }

    /// Whether the query can only match one stored version string.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Exact(_) => true,
            Self::CommitPrefix(prefix) => prefix.len() == MAX_COMMIT_LEN,
        }
    }
}

impl std::fmt::Display for VersionQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `^\d+\.\d+\.\d+$`
pub fn is_exact_version(s: &str) -> bool {
    let mut parts = 0;
    for part in s.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 3
}

/// `^[0-9a-f]{7,40}$`, case-insensitive.
pub fn is_commit_hash(s: &str) -> bool {
    (MIN_COMMIT_LEN..=MAX_COMMIT_LEN).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_tokens() {
        assert_eq!(Platform::normalize("linux"), Ok(Platform::Linux));
        assert_eq!(Platform::normalize("macos"), Ok(Platform::Macos));
        assert_eq!(Platform::normalize("windows"), Ok(Platform::Windows));
    }

    #[test]
    fn test_platform_rejects_wrong_case_and_unknown() {
        for bad in ["Linux", "solaris", "", "darwin"] {
            let err = Platform::normalize(bad).unwrap_err();
            assert_eq!(
                err,
                IdentifierError::InvalidPlatform {
                    value: bad.to_string()
                }
            );
        }
        let msg = Platform::normalize("solaris").unwrap_err().to_string();
        assert!(msg.contains("solaris"));
        assert!(msg.contains("host, linux, macos, windows"));
    }

    #[test]
    fn test_architecture_tokens() {
        assert_eq!(Architecture::normalize("x86"), Ok(Architecture::X86));
        assert_eq!(Architecture::normalize("aarch64"), Ok(Architecture::Aarch64));
        for bad in ["X86", "x86_64", "arm64", "AArch64"] {
            assert!(matches!(
                Architecture::normalize(bad),
                Err(IdentifierError::InvalidArchitecture { .. })
            ));
        }
    }

    #[test]
    fn test_host_mapping() {
        assert_eq!(Platform::from_host_os("linux", "x86_64"), Ok(Platform::Linux));
        assert_eq!(Platform::from_host_os("macos", "aarch64"), Ok(Platform::Macos));
        assert_eq!(
            Architecture::from_host_arch("linux", "x86_64"),
            Ok(Architecture::X86)
        );
        assert_eq!(
            Architecture::from_host_arch("macos", "aarch64"),
            Ok(Architecture::Aarch64)
        );
        assert_eq!(
            Platform::from_host_os("freebsd", "x86_64"),
            Err(IdentifierError::UnsupportedHost {
                os: "freebsd".to_string(),
                arch: "x86_64".to_string()
            })
        );
        assert!(matches!(
            Architecture::from_host_arch("linux", "riscv64"),
            Err(IdentifierError::UnsupportedHost { .. })
        ));
    }

    #[test]
    fn test_host_resolves_on_supported_system() {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            assert_eq!(Platform::normalize("host"), Ok(Platform::Linux));
            assert_eq!(Architecture::normalize("host"), Ok(Architecture::X86));
        }
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            assert_eq!(Platform::normalize("host"), Ok(Platform::Macos));
            assert_eq!(Architecture::normalize("host"), Ok(Architecture::Aarch64));
        }
    }

    #[test]
    fn test_classify_version() {
        assert_eq!(
            VersionQuery::classify("21.1.8"),
            Ok(VersionQuery::Exact("21.1.8".to_string()))
        );
        assert_eq!(
            VersionQuery::classify("F8CB798"),
            Ok(VersionQuery::CommitPrefix("f8cb798".to_string()))
        );
        let full = "f8cb7987c64dcffb72414a40560055cb717dbf74";
        assert_eq!(
            VersionQuery::classify(full),
            Ok(VersionQuery::CommitPrefix(full.to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_malformed_versions() {
        for bad in ["21.1", "v21.1.8", "21.1.8.1", "21..8", "abc", "f8cb79", "g8cb7987", ""] {
            assert_eq!(
                VersionQuery::classify(bad),
                Err(IdentifierError::InvalidVersionFormat {
                    value: bad.to_string()
                }),
                "{bad} should be rejected"
            );
        }
        let too_long = "a".repeat(41);
        assert!(VersionQuery::classify(&too_long).is_err());
    }

    #[test]
    fn test_exact_version_never_treated_as_prefix() {
        let q = VersionQuery::classify("21.1.8").unwrap();
        assert!(q.matches("21.1.8"));
        assert!(!q.matches("21.1.80"));
        assert!(q.is_complete());

        // all-digit hashes are still hashes, and never equal a dotted version
        let q = VersionQuery::classify("2111800").unwrap();
        assert!(matches!(q, VersionQuery::CommitPrefix(_)));
        assert!(!q.matches("21.1.8"));
    }

    #[test]
    fn test_commit_prefix_matching() {
        let q = VersionQuery::classify("f8cb798").unwrap();
        assert!(q.matches("f8cb7987c64dcffb72414a40560055cb717dbf74"));
        assert!(!q.matches("f8cb7997c64dcffb72414a40560055cb717dbf74"));
        assert!(!q.is_complete());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Platform::Macos).unwrap(), "\"macos\"");
        assert_eq!(serde_json::to_string(&Architecture::X86).unwrap(), "\"x86\"");
        assert_eq!(
            serde_json::from_str::<Architecture>("\"aarch64\"").unwrap(),
            Architecture::Aarch64
        );
    }

    #[test]
    fn test_ordering_matches_names() {
        let mut platforms = Platform::ALL.to_vec();
        platforms.sort();
        let names: Vec<_> = platforms.iter().map(|p| p.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);

        assert!(Architecture::Aarch64 < Architecture::X86);
    }
}

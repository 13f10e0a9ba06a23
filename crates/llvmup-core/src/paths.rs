use dirs::home_dir;
use std::path::{Path, PathBuf};

use llvmup_schema::{Architecture, Platform};

/// Environment variable overriding the llvmup home directory.
pub const HOME_ENV: &str = "LLVMUP_HOME";

/// `~/.llvmup`, or None if the user's home cannot be resolved.
pub fn default_home() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".llvmup"))
}

/// Manifest document: `<home>/manifest.json`
pub fn manifest_path(home: &Path) -> PathBuf {
    home.join("manifest.json")
}

/// Downloaded archives: `<home>/cache`
pub fn cache_dir(home: &Path) -> PathBuf {
    home.join("cache")
}

/// Unpacked companion tools: `<home>/tools`
pub fn tools_dir(home: &Path) -> PathBuf {
    home.join("tools")
}

/// Staging area for in-progress extractions: `<home>/tmp`
pub fn tmp_dir(home: &Path) -> PathBuf {
    home.join("tmp")
}

/// Install prefix of one toolchain:
/// `<home>/toolchains/<tag>/<platform>-<arch>[-debug]`
pub fn toolchain_dir(
    home: &Path,
    tag: &str,
    platform: Platform,
    architecture: Architecture,
    debug: bool,
) -> PathBuf {
    let leaf = if debug {
        format!("{platform}-{architecture}-debug")
    } else {
        format!("{platform}-{architecture}")
    };
    home.join("toolchains").join(tag).join(leaf)
}

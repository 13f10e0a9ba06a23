//! Exposing an installed toolchain to the caller's environment.
//!
//! Inside GitHub Actions the variables are appended to the files named by
//! `GITHUB_PATH` and `GITHUB_ENV`, so later workflow steps see them. Anywhere
//! else a POSIX shell snippet is produced for the caller to `eval`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends to the workflow's `PATH`.
pub const GITHUB_PATH_ENV: &str = "GITHUB_PATH";
/// Appends to the workflow's environment.
pub const GITHUB_ENV_ENV: &str = "GITHUB_ENV";

/// Locations a toolchain consumer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainEnv {
    pub prefix: PathBuf,
    pub bin_dir: PathBuf,
    pub llvm_dir: PathBuf,
    pub mlir_dir: PathBuf,
}

impl ToolchainEnv {
    pub fn from_prefix(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        let cmake = prefix.join("lib").join("cmake");
        Self {
            bin_dir: prefix.join("bin"),
            llvm_dir: cmake.join("llvm"),
            mlir_dir: cmake.join("mlir"),
            prefix,
        }
    }

    /// Find the install prefix under an extraction root.
    ///
    /// Archives either unpack `bin/` directly into the root or wrap
    /// everything in one top-level directory.
    pub fn detect(root: &Path) -> Option<Self> {
        if root.join("bin").is_dir() {
            return Some(Self::from_prefix(root));
        }

        let mut dirs = std::fs::read_dir(root)
            .ok()?
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()));
        let only = dirs.next()?;
        if dirs.next().is_some() {
            return None;
        }
        let inner = only.path();
        inner
            .join("bin")
            .is_dir()
            .then(|| Self::from_prefix(inner))
    }

    /// Variables to set, excluding `PATH`.
    pub fn variables(&self) -> [(&'static str, &Path); 2] {
        [
            ("LLVM_DIR", self.llvm_dir.as_path()),
            ("MLIR_DIR", self.mlir_dir.as_path()),
        ]
    }

    /// `export` lines for a POSIX shell.
    pub fn shell_exports(&self) -> String {
        let mut out = format!(
            "export PATH={}:\"$PATH\"\n",
            shell_quote(&self.bin_dir.display().to_string())
        );
        for (name, value) in self.variables() {
            out.push_str(&format!(
                "export {name}={}\n",
                shell_quote(&value.display().to_string())
            ));
        }
        out
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Where environment changes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    GithubActions { path_file: PathBuf, env_file: PathBuf },
    Shell,
}

impl ExportTarget {
    /// GitHub Actions when both of its files are named, else a shell snippet.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var_os(GITHUB_PATH_ENV).map(PathBuf::from),
            std::env::var_os(GITHUB_ENV_ENV).map(PathBuf::from),
        )
    }

    pub fn from_vars(path_file: Option<PathBuf>, env_file: Option<PathBuf>) -> Self {
        match (path_file, env_file) {
            (Some(path_file), Some(env_file))
                if !path_file.as_os_str().is_empty() && !env_file.as_os_str().is_empty() =>
            {
                Self::GithubActions {
                    path_file,
                    env_file,
                }
            }
            _ => Self::Shell,
        }
    }

    /// Apply `env`. Returns the shell snippet to print, if any.
    ///
    /// # Errors
    ///
    /// Fails if the workflow files cannot be appended to.
    pub fn export(&self, env: &ToolchainEnv) -> std::io::Result<Option<String>> {
        match self {
            Self::Shell => Ok(Some(env.shell_exports())),
            Self::GithubActions {
                path_file,
                env_file,
            } => {
                let mut f = OpenOptions::new().create(true).append(true).open(path_file)?;
                writeln!(f, "{}", env.bin_dir.display())?;

                let mut f = OpenOptions::new().create(true).append(true).open(env_file)?;
                for (name, value) in env.variables() {
                    writeln!(f, "{name}={}", value.display())?;
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_direct_and_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        assert_eq!(
            ToolchainEnv::detect(dir.path()).unwrap().prefix,
            dir.path()
        );

        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("llvm-mlir-21.1.8");
        std::fs::create_dir_all(inner.join("bin")).unwrap();
        std::fs::write(dir.path().join("README"), b"").unwrap();
        let env = ToolchainEnv::detect(dir.path()).unwrap();
        assert_eq!(env.prefix, inner);
        assert_eq!(env.mlir_dir, inner.join("lib").join("cmake").join("mlir"));
    }

    #[test]
    fn test_detect_rejects_ambiguous_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a").join("bin")).unwrap();
        std::fs::create_dir_all(dir.path().join("b").join("bin")).unwrap();
        assert_eq!(ToolchainEnv::detect(dir.path()), None);
    }

    #[test]
    fn test_shell_exports() {
        let env = ToolchainEnv::from_prefix("/opt/it's");
        let out = env.shell_exports();
        assert!(out.starts_with("export PATH='/opt/it'\\''s/bin':\"$PATH\"\n"), "{out}");
        assert!(out.contains("export LLVM_DIR='/opt/it'\\''s/lib/cmake/llvm'\n"));
        assert!(out.contains("export MLIR_DIR="));
    }

    #[test]
    fn test_github_actions_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = ExportTarget::from_vars(
            Some(dir.path().join("path")),
            Some(dir.path().join("env")),
        );
        let env = ToolchainEnv::from_prefix("/t");

        assert_eq!(target.export(&env).unwrap(), None);
        assert_eq!(std::fs::read_to_string(dir.path().join("path")).unwrap(), "/t/bin\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("env")).unwrap(),
            "LLVM_DIR=/t/lib/cmake/llvm\nMLIR_DIR=/t/lib/cmake/mlir\n"
        );
    }

    #[test]
    fn test_partial_actions_env_falls_back_to_shell() {
        assert_eq!(
            ExportTarget::from_vars(Some(PathBuf::from("/p")), None),
            ExportTarget::Shell
        );
    }
}

//! Archive unpacking through external tools.
//!
//! Nothing is decompressed in-process: `tar` (system) handles `.tar.gz`,
//! `.tar.xz` and `.zip`, and the companion `zstd` binary turns `.tar.zst`
//! into a plain tarball first.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use llvmup_schema::ArchiveFormat;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use walkdir::WalkDir;

/// System archiver.
pub const TAR: &str = "tar";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("'{tool}' not found on PATH")]
    ToolMissing { tool: String },

    #[error("{tool} failed on {}: {stderr}", path.display())]
    ToolFailed {
        tool: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `program` with `args`, treating a non-zero exit as failure on `path`.
async fn run<I, S>(program: &Path, args: I, path: &Path) -> Result<(), ExtractError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program.display().to_string();
    debug!(%tool, path = %path.display(), "running");

    let output = match Command::new(program).args(args).output().await {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::ToolMissing { tool });
        }
        Err(e) => return Err(e.into()),
    };

    if !output.status.success() {
        return Err(ExtractError::ToolFailed {
            tool,
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// `tar -xf <archive> -C <dest>`; compression is auto-detected by `tar`.
///
/// # Errors
///
/// Fails if `dest` cannot be created, `tar` is missing, or `tar` exits non-zero.
pub async fn untar(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    tokio::fs::create_dir_all(dest).await?;
    run(
        Path::new(TAR),
        [
            OsStr::new("-xf"),
            archive.as_os_str(),
            OsStr::new("-C"),
            dest.as_os_str(),
        ],
        archive,
    )
    .await
}

/// `zstd -d -q -f <input> -o <output>`.
///
/// # Errors
///
/// Fails if the `zstd` binary cannot be run or exits non-zero.
pub async fn decompress_zstd(zstd: &Path, input: &Path, output: &Path) -> Result<(), ExtractError> {
    run(
        zstd,
        [
            OsStr::new("-d"),
            OsStr::new("-q"),
            OsStr::new("-f"),
            input.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
        ],
        input,
    )
    .await
}

/// Unpack a companion archive (`.tar.gz` or `.zip`) into `dest`.
///
/// # Errors
///
/// See [`untar`].
pub async fn unpack_companion(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    untar(archive, dest).await
}

/// Unpack a primary archive into `dest`.
///
/// `.tar.zst` is decompressed with `zstd` into `scratch` first; the
/// intermediate tarball is removed afterwards whether or not `tar` succeeds.
///
/// # Errors
///
/// Fails if either tool is missing or exits non-zero.
pub async fn unpack_primary(
    zstd: &Path,
    archive: &Path,
    format: ArchiveFormat,
    dest: &Path,
    scratch: &Path,
) -> Result<(), ExtractError> {
    if format != ArchiveFormat::TarZst {
        return untar(archive, dest).await;
    }

    tokio::fs::create_dir_all(scratch).await?;
    let stem = archive
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(".zst"))
        .unwrap_or("archive.tar");
    let tarball = scratch.join(stem);

    decompress_zstd(zstd, archive, &tarball).await?;
    let result = untar(&tarball, dest).await;
    tokio::fs::remove_file(&tarball).await.ok();
    result
}

/// First regular file named `name` under `root`, shallowest first.
pub fn find_executable(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == name)
        .min_by_key(walkdir::DirEntry::depth)
        .map(walkdir::DirEntry::into_path)
}

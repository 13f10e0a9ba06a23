//! Async download with streaming SHA256 and progress reporting.
//!
//! Bytes land in `<name>.part` and are renamed into place only once the
//! transfer completes, so an interrupted download never looks finished.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use llvmup_schema::ResolvedAsset;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Refusing to download to unsafe file name '{0}'")]
    UnsafeName(String),
}

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
}

/// Request for a download operation
pub struct DownloadRequest<'a> {
    pub client: &'a Client,
    pub asset: &'a ResolvedAsset,
    pub dest_dir: &'a Path,
    pub reporter: &'a dyn Reporter,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(
        client: &'a Client,
        asset: &'a ResolvedAsset,
        dest_dir: &'a Path,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            client,
            asset,
            dest_dir,
            reporter,
        }
    }

    /// Where the file will end up.
    ///
    /// # Errors
    ///
    /// [`DownloadError::UnsafeName`] if the asset name is not a plain file name.
    pub fn dest(&self) -> Result<PathBuf, DownloadError> {
        let name = self.asset.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DownloadError::UnsafeName(name.to_string()));
        }
        Ok(self.dest_dir.join(name))
    }

    /// Fetch the asset. One attempt, no retries.
    ///
    /// # Errors
    ///
    /// Transport errors, a non-success status, or local I/O failures. The
    /// partial file is removed on failure.
    pub async fn execute(self) -> Result<Downloaded, DownloadError> {
        let dest = self.dest()?;
        let part = part_path(&dest);
        fs::create_dir_all(self.dest_dir).await?;

        match self.fetch_to(&part).await {
            Ok((sha256, size)) => {
                fs::rename(&part, &dest).await?;
                self.reporter.done(&self.asset.name, "downloaded");
                debug!(path = %dest.display(), %sha256, size, "download complete");
                Ok(Downloaded {
                    path: dest,
                    sha256,
                    size,
                })
            }
            Err(e) => {
                fs::remove_file(&part).await.ok();
                self.reporter.failed(&self.asset.name, &e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_to(&self, part: &Path) -> Result<(String, u64), DownloadError> {
        let url = self.asset.url.as_str();
        let name = self.asset.name.as_str();

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_size = response.content_length();
        self.reporter.downloading(name, 0, total_size);

        let mut file = File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            self.reporter.downloading(name, downloaded, total_size);
        }

        file.flush().await?;
        Ok((hex::encode(hasher.finalize()), downloaded))
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;

    #[tokio::test]
    async fn test_download_hashes_and_renames() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/dl/zstd-v1.5.7_linux_X86.tar.gz")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let asset = ResolvedAsset::new(
            format!("{}/dl/zstd-v1.5.7_linux_X86.tar.gz", server.url()),
            "zstd-v1.5.7_linux_X86.tar.gz",
        );
        let client = Client::new();
        let done = DownloadRequest::new(&client, &asset, dir.path(), &NullReporter)
            .execute()
            .await
            .unwrap();

        assert_eq!(done.path, dir.path().join("zstd-v1.5.7_linux_X86.tar.gz"));
        assert_eq!(done.size, 5);
        assert_eq!(
            done.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(std::fs::read(&done.path).unwrap(), b"hello");
        assert!(!part_path(&done.path).exists());
    }

    #[tokio::test]
    async fn test_http_error_leaves_nothing_behind() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/dl/missing.tar.zst")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let asset = ResolvedAsset::new(format!("{}/dl/missing.tar.zst", server.url()), "missing.tar.zst");
        let client = Client::new();
        let err = DownloadRequest::new(&client, &asset, dir.path(), &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_path_traversal() {
        let client = Client::new();
        let asset = ResolvedAsset::new("https://x/y", "../escape.tar.zst");
        let req = DownloadRequest::new(&client, &asset, Path::new("/tmp"), &NullReporter);
        assert!(matches!(req.dest(), Err(DownloadError::UnsafeName(_))));
    }
}

//! Filesystem and network I/O for installs.

pub mod download;
pub mod extract;

pub use download::{DownloadError, DownloadRequest, Downloaded};
pub use extract::{ExtractError, find_executable};

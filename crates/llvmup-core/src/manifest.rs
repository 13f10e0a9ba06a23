//! The locally persisted index of every resolvable archive.
//!
//! [`Manifest`] is an immutable snapshot: an ordered list of entries (the
//! on-disk form) plus a map keyed by the full `(version, platform,
//! architecture, variant)` tuple. [`ManifestStore`] owns the current snapshot
//! and swaps in a freshly built one on rebuild, so readers never observe a
//! half-built index.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use futures::TryStreamExt;
use llvmup_schema::{
    Architecture, AssetName, AssetNameError, CompanionPattern, EntryKey, ManifestEntry, Platform,
    ResolvedAsset, VersionQuery,
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::source::{Release, ReleaseSource, SourceError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Manifest I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest at {path} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// An immutable, indexed set of manifest entries.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    index: HashMap<EntryKey, usize>,
}

impl Manifest {
    /// Index `entries`, keeping the first entry for any repeated key.
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.key();
            if index.contains_key(&key) {
                warn!(%key, tag = %entry.tag, "duplicate manifest entry ignored");
                continue;
            }
            index.insert(key, kept.len());
            kept.push(entry);
        }
        Self {
            entries: kept,
            index,
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry for a normalized request.
    ///
    /// Exact versions and full-length hashes hit the map directly. Shorter
    /// hashes match by prefix, first match in manifest order.
    pub fn lookup(
        &self,
        version: &VersionQuery,
        platform: Platform,
        architecture: Architecture,
        debug: bool,
    ) -> Option<&ManifestEntry> {
        if version.is_complete() {
            let key = EntryKey {
                version: version.as_str().to_string(),
                platform,
                architecture,
                debug,
            };
            return self.index.get(&key).map(|&i| &self.entries[i]);
        }
        self.entries.iter().find(|e| {
            e.platform == platform
                && e.architecture == architecture
                && e.debug == debug
                && version.matches(&e.version)
        })
    }

    /// Like [`lookup`](Self::lookup), but any variant will do.
    ///
    /// Companions are shared by every variant built in a release.
    pub fn find_any_variant(
        &self,
        version: &VersionQuery,
        platform: Platform,
        architecture: Architecture,
    ) -> Option<&ManifestEntry> {
        self.lookup(version, platform, architecture, false)
            .or_else(|| self.lookup(version, platform, architecture, true))
    }

    /// Scan `releases` into a manifest.
    ///
    /// Drafts are skipped. Releases are ordered newest first (publication
    /// time, else creation time, ties by tag) and the first release to supply
    /// a key wins. The result order depends only on the release contents, not
    /// on the order they were listed in.
    pub fn build(releases: Vec<Release>) -> Self {
        let mut releases: Vec<Release> = releases.into_iter().filter(|r| !r.draft).collect();
        releases.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.tag_name.cmp(&b.tag_name))
        });

        let mut seen: HashSet<EntryKey> = HashSet::new();
        let mut ranked: Vec<(usize, ManifestEntry)> = Vec::new();

        for (rank, release) in releases.iter().enumerate() {
            let companions = release_companions(release);

            // Same-key assets within one release: the lexically first name wins.
            let mut assets: Vec<_> = release.assets.iter().collect();
            assets.sort_by(|a, b| a.name.cmp(&b.name));

            for asset in assets {
                let parsed = match AssetName::parse(&asset.name) {
                    Ok(parsed) => parsed,
                    Err(AssetNameError::UnparseableAssetName { .. }) => continue,
                    Err(e @ AssetNameError::UnparseableAssetVersion { .. }) => {
                        warn!(tag = %release.tag_name, "excluding asset: {e}");
                        continue;
                    }
                };

                let mut entry = ManifestEntry {
                    architecture: parsed.architecture,
                    asset_name: asset.name.clone(),
                    debug: parsed.debug,
                    download_url: asset.browser_download_url.clone(),
                    platform: parsed.platform,
                    release_url: release.html_url.clone(),
                    tag: release.tag_name.clone(),
                    version: parsed.version,
                    zstd_asset_name: None,
                    zstd_download_url: None,
                };

                if !seen.insert(entry.key()) {
                    debug!(key = %entry.key(), tag = %release.tag_name, "already recorded by a newer release");
                    continue;
                }
                if let Some(companion) = companions.get(&(entry.platform, entry.architecture)) {
                    entry.set_companion(companion);
                }
                ranked.push((rank, entry));
            }
        }

        ranked.sort_by(|(ra, a), (rb, b)| {
            ra.cmp(rb)
                .then(a.platform.cmp(&b.platform))
                .then(a.architecture.cmp(&b.architecture))
                .then_with(|| a.version.cmp(&b.version))
                .then(a.debug.cmp(&b.debug))
                .then_with(|| a.asset_name.cmp(&b.asset_name))
        });

        Self::new(ranked.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Parse a manifest document.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if `json` is not an array of entries.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Render the manifest document: pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Serialization of plain strings and enums does not fail in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');
        Ok(json)
    }

    /// Read the document at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid manifest.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let json = fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        Self::from_json(&json).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the document to `path`, replacing any existing file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, writing, or the rename fails.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.to_json().map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        Ok(())
    }
}

/// Lexically first companion per platform and architecture in one release.
fn release_companions(release: &Release) -> HashMap<(Platform, Architecture), ResolvedAsset> {
    let mut found = HashMap::new();
    for platform in Platform::ALL {
        for architecture in Architecture::ALL {
            let pattern = CompanionPattern::new(platform, architecture);
            let Some(name) = pattern.select(release.asset_names()) else {
                continue;
            };
            if let Some(asset) = release.asset(name) {
                found.insert(
                    (platform, architecture),
                    ResolvedAsset::new(&asset.browser_download_url, &asset.name),
                );
            }
        }
    }
    found
}

/// Owner of the current manifest snapshot and its on-disk document.
pub struct ManifestStore {
    path: PathBuf,
    current: RwLock<Arc<Manifest>>,
}

impl ManifestStore {
    /// Wrap an already loaded manifest.
    pub fn new(path: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(manifest)),
        }
    }

    /// Load the document at `path`; a missing file opens an empty store.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let manifest = match Manifest::load(&path).await {
            Ok(manifest) => manifest,
            Err(StoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no manifest yet");
                Manifest::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(path, manifest))
    }

    /// Load the document at `path`, or rebuild it from `source` if there is none.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable document or on any rebuild failure.
    pub async fn load_or_rebuild(
        path: impl Into<PathBuf>,
        source: &dyn ReleaseSource,
    ) -> Result<Self, StoreError> {
        let store = Self::open(path).await?;
        if !fs::try_exists(&store.path).await.unwrap_or(false) {
            store.rebuild(source).await?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current snapshot. Holding it keeps it alive across a rebuild.
    pub fn snapshot(&self) -> Arc<Manifest> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Convenience for [`Manifest::lookup`] on the current snapshot.
    pub fn lookup(
        &self,
        version: &VersionQuery,
        platform: Platform,
        architecture: Architecture,
        debug: bool,
    ) -> Option<ManifestEntry> {
        self.snapshot()
            .lookup(version, platform, architecture, debug)
            .cloned()
    }

    /// Scan every release from `source`, persist the result, then make it current.
    ///
    /// On failure nothing is written and the previous snapshot stays current.
    ///
    /// # Errors
    ///
    /// Fails on the first source error or if the document cannot be written.
    #[instrument(skip_all, fields(source = %source.key()))]
    pub async fn rebuild(&self, source: &dyn ReleaseSource) -> Result<Arc<Manifest>, StoreError> {
        let releases: Vec<Release> = source.list_releases().try_collect().await?;
        let release_count = releases.len();

        let manifest = Manifest::build(releases);
        manifest.save(&self.path).await?;
        info!(
            releases = release_count,
            entries = manifest.len(),
            path = %self.path.display(),
            "manifest rebuilt"
        );

        let manifest = Arc::new(manifest);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&manifest),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&manifest),
        }
        Ok(manifest)
    }
}

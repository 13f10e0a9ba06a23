//! Shared vocabulary for llvmup.
//!
//! Everything in this crate is pure: identifier validation, the grammar of
//! released asset names, and the records persisted in the manifest document.
//! Network and filesystem concerns live in `llvmup-core`.

pub mod archive;
pub mod asset_name;
pub mod companion;
pub mod entry;
pub mod identifier;

// Re-exports
pub use archive::ArchiveFormat;
pub use asset_name::{AssetName, AssetNameError, AssetPattern};
pub use companion::{COMPANION_TOOL, CompanionAsset, CompanionPattern};
pub use entry::{EntryKey, ManifestEntry, ResolvedAsset};
pub use identifier::{Architecture, IdentifierError, Platform, VersionQuery};

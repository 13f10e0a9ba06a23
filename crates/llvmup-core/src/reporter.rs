//! Reporter trait for dependency injection
//!
//! Core logic reports progress through this trait so it is not coupled to a
//! particular terminal front end.

use tracing::{debug, info, warn};

pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Resolving", "Downloading").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, name: &str, current: u64, total: Option<u64>);

    /// Indicates an archive is being unpacked.
    fn extracting(&self, name: &str);

    /// Marks an item as successfully completed.
    fn done(&self, name: &str, detail: &str);

    /// Marks an item as failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        (**self).downloading(name, current, total);
    }
    fn extracting(&self, name: &str) {
        (**self).extracting(name);
    }
    fn done(&self, name: &str, detail: &str) {
        (**self).done(name, detail);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str) {}
    fn done(&self, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}

/// Forwards everything to `tracing`. Download progress only at completion.
#[derive(Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn section(&self, title: &str) {
        info!("{title}");
    }
    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        if total.is_some_and(|t| t > 0 && current >= t) {
            info!(name, bytes = current, "downloaded");
        } else {
            debug!(name, current, total, "downloading");
        }
    }
    fn extracting(&self, name: &str) {
        info!(name, "extracting");
    }
    fn done(&self, name: &str, detail: &str) {
        info!(name, "{detail}");
    }
    fn failed(&self, name: &str, reason: &str) {
        warn!(name, "failed: {reason}");
    }
    fn info(&self, msg: &str) {
        info!("{msg}");
    }
    fn warning(&self, msg: &str) {
        warn!("{msg}");
    }
}

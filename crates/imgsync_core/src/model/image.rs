//! Image record domain model.
//!
//! # Responsibility
//! - Define the canonical metadata row for one local or stored image.
//! - Provide the `(repository, tag)` identity used by reconciliation.
//!
//! # Invariants
//! - All four fields are opaque strings; `size` keeps the runtime's
//!   human-readable form and `identifier` is never validated.
//! - Two records describe the same image when their `key()` matches,
//!   regardless of identifier or size.

use serde::{Deserialize, Serialize};

/// Metadata row for one container image.
///
/// Serialized with the manifest key names (`repo`, `tag`, `hash`, `size`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Registry/repository name, e.g. `alpine` or `ghcr.io/org/app`.
    #[serde(rename = "repo")]
    pub repository: String,
    /// Version label.
    pub tag: String,
    /// Runtime-assigned content hash or short ID.
    #[serde(rename = "hash")]
    pub identifier: String,
    /// Size as reported by the runtime, e.g. `12.8MB`.
    pub size: String,
}

impl ImageRecord {
    pub fn new(
        repository: impl Into<String>,
        tag: impl Into<String>,
        identifier: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
            identifier: identifier.into(),
            size: size.into(),
        }
    }

    /// Returns the reconciliation identity of this record.
    pub fn key(&self) -> (&str, &str) {
        (self.repository.as_str(), self.tag.as_str())
    }

    /// Renders the `repository:tag` reference understood by the runtime.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// Returns the archive file name used by archive export.
    ///
    /// Path separators and registry port colons inside the repository are
    /// replaced with `_` so every archive lands directly in the output
    /// directory under a name valid on Windows too.
    pub fn archive_file_name(&self) -> String {
        let repository = self.repository.replace(['/', '\\', ':'], "_");
        format!("{}_{}.tar", repository, self.tag)
    }
}

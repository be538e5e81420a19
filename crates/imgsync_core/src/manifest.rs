//! JSON manifest codec.
//!
//! # Responsibility
//! - Read and write the flat `[{repo, tag, hash, size}]` manifest file.
//!
//! # Invariants
//! - A missing manifest is reported as `NotFound`; the path is never opened.
//! - Writes fully replace existing content with 2-space pretty JSON.

use crate::model::image::ImageRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Default manifest file name used by manifest export.
pub const DEFAULT_MANIFEST_FILE_NAME: &str = "images.json";

pub type ManifestResult<T> = Result<T, ManifestError>;

#[derive(Debug)]
pub enum ManifestError {
    NotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "manifest not found: {}", path.display()),
            Self::Io { path, source } => {
                write!(f, "manifest i/o failed for {}: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid manifest json: {err}"),
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Reads all records from a manifest file, in file order.
pub fn read_manifest(path: &Path) -> ManifestResult<Vec<ImageRecord>> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }

    let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes `records` to `path`, creating or overwriting the file.
pub fn write_manifest(path: &Path, records: &[ImageRecord]) -> ManifestResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{read_manifest, write_manifest, ManifestError};
    use crate::model::image::ImageRecord;

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        let err = read_manifest(&path).expect_err("missing manifest must fail");
        assert!(matches!(err, ManifestError::NotFound(p) if p == path));
    }

    #[test]
    fn write_uses_two_space_indentation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("images.json");
        write_manifest(
            &path,
            &[ImageRecord::new("alpine", "latest", "4bcff63911fc", "12.8MB")],
        )
        .expect("write manifest");

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with("[\n  {\n    \"repo\": \"alpine\""));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"repo\": \"alpine\"}]").expect("seed file");
        let err = read_manifest(&path).expect_err("missing keys must fail");
        assert!(matches!(err, ManifestError::Json(_)));
    }
}

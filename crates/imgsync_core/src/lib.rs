//! Core inventory logic for imgsync.
//! Lists local container images, persists them to the store, and reconciles
//! local state against stored inventory and manifest files.

pub mod config;
pub mod db;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod repo;
pub mod runtime;
pub mod service;

pub use config::{load_dotenv, ConfigError, RuntimeSettings, StoreConfig};
pub use db::{StoreError, StoreGateway, StoreResult, StoreSession};
pub use logging::{default_log_level, init_console_logging, init_logging, logging_status};
pub use manifest::{ManifestError, DEFAULT_MANIFEST_FILE_NAME};
pub use model::image::ImageRecord;
pub use repo::image_repo::{ImageRepository, StoreImageRepository};
pub use runtime::{CommandOutput, CommandRunner, HostPlatform, RuntimeCommands, ShellRunner};
pub use service::plan::ReconcilePlan;
pub use service::reconciler::{
    BatchFailure, BatchReport, InventoryError, Reconciler, DEFAULT_EXPORT_DIR,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

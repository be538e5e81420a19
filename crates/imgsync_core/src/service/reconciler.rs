//! Inventory reconciliation use-cases.
//!
//! # Responsibility
//! - List local images through the runtime and stored images through the
//!   store gateway.
//! - Persist, diff, pull and export inventories.
//!
//! # Invariants
//! - Every public operation catches failures at its own boundary, logs them
//!   and degrades to an empty result or a report; nothing here panics or
//!   returns `Err`.
//! - Store connections are scoped to one operation and released on every
//!   exit path.
//! - Per-image loops run sequentially; a failing image does not stop the
//!   remaining ones.

use crate::config::{RuntimeSettings, StoreConfig};
use crate::db::{StoreError, StoreGateway};
use crate::manifest::{read_manifest, write_manifest, ManifestError};
use crate::model::image::ImageRecord;
use crate::repo::image_repo::{ImageRepository, StoreImageRepository};
use crate::runtime::{
    parse_image_table, CommandOutput, CommandRunner, HostPlatform, RuntimeCommands,
};
use crate::service::plan::ReconcilePlan;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Default output directory for archive export.
pub const DEFAULT_EXPORT_DIR: &str = "./exports";

/// Failure inside one reconciliation step.
///
/// Only surfaces through logs and `BatchReport::aborted`; public operations
/// never return it.
#[derive(Debug)]
pub enum InventoryError {
    UnsupportedPlatform(HostPlatform),
    StoreNotConfigured,
    Store(StoreError),
    Command(String),
    Manifest(ManifestError),
    Io { path: PathBuf, source: std::io::Error },
}

impl Display for InventoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPlatform(platform) => {
                write!(f, "unsupported operating system: {platform}")
            }
            Self::StoreNotConfigured => write!(f, "store connection is not configured"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Command(message) => write!(f, "runtime command failed: {message}"),
            Self::Manifest(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for InventoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Manifest(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::UnsupportedPlatform(_) | Self::StoreNotConfigured | Self::Command(_) => None,
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ManifestError> for InventoryError {
    fn from(value: ManifestError) -> Self {
        Self::Manifest(value)
    }
}

/// One item that failed inside a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub item: String,
    pub error: String,
}

/// Outcome of a batch operation (sync, pull, archive export).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items completed, in processing order.
    pub succeeded: Vec<String>,
    /// Items that failed individually; processing continued past them.
    pub failed: Vec<BatchFailure>,
    /// Set when the operation stopped before or during its loop.
    pub aborted: Option<String>,
}

impl BatchReport {
    fn aborted(err: &InventoryError) -> Self {
        Self {
            aborted: Some(err.to_string()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }
}

/// Reconciles local runtime images against the store and manifest files.
pub struct Reconciler<R: CommandRunner> {
    runner: R,
    platform: HostPlatform,
    commands: Option<RuntimeCommands>,
    store: Option<StoreConfig>,
}

impl<R: CommandRunner> Reconciler<R> {
    /// Resolves runtime commands for `platform` once.
    pub fn new(runner: R, platform: HostPlatform, settings: &RuntimeSettings) -> Self {
        let commands = RuntimeCommands::for_platform(&platform, settings);
        Self {
            runner,
            platform,
            commands,
            store: None,
        }
    }

    /// Attaches store connection parameters for store-backed operations.
    pub fn with_store(mut self, config: StoreConfig) -> Self {
        self.store = Some(config);
        self
    }

    pub fn platform(&self) -> &HostPlatform {
        &self.platform
    }

    /// Runs one shell command. Never fails; see `CommandOutput::is_failure`.
    pub fn run_command(&self, command: &str) -> CommandOutput {
        self.runner.run(command)
    }

    /// Lists local images in runtime order.
    ///
    /// Returns an empty list when the platform is unsupported or the runtime
    /// reports any error text; partial results are never returned.
    pub fn list_local_images(&self, verbose: bool) -> Vec<ImageRecord> {
        self.try_list_local_images(verbose).unwrap_or_else(|err| {
            error!("event=local_list module=reconciler status=error error={err}");
            Vec::new()
        })
    }

    /// Inserts every local image as one store row, one commit per row.
    ///
    /// Stops at the first failure; rows already inserted stay committed.
    pub fn sync_to_store(&self) -> BatchReport {
        let mut report = BatchReport::default();
        if let Err(err) = self.try_sync_to_store(&mut report) {
            error!(
                "event=store_sync module=reconciler status=error inserted={} error={}",
                report.succeeded.len(),
                err
            );
            report.aborted = Some(err.to_string());
            return report;
        }

        info!(
            "event=store_sync module=reconciler status=ok inserted={}",
            report.succeeded.len()
        );
        report
    }

    /// Lists stored images in store order; empty on any failure.
    pub fn list_store_images(&self) -> Vec<ImageRecord> {
        self.try_list_store_images().unwrap_or_else(|err| {
            error!("event=store_list module=reconciler status=error error={err}");
            Vec::new()
        })
    }

    /// Lists images recorded in a manifest file; empty on any failure,
    /// including a missing file.
    pub fn list_manifest_images(&self, path: &Path) -> Vec<ImageRecord> {
        match read_manifest(path) {
            Ok(records) => {
                info!(
                    "event=manifest_read module=reconciler status=ok path={} count={}",
                    path.display(),
                    records.len()
                );
                records
            }
            Err(err) => {
                error!(
                    "event=manifest_read module=reconciler status=error path={} error={}",
                    path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Pulls every stored image, one runtime invocation per reference.
    pub fn pull_from_store(&self) -> BatchReport {
        match self.try_list_store_images() {
            Ok(stored) => self.pull_all(&stored),
            Err(err) => {
                error!("event=store_pull module=reconciler status=error error={err}");
                BatchReport::aborted(&err)
            }
        }
    }

    /// Pulls only the stored images that are not present locally.
    pub fn pull_missing(&self) -> BatchReport {
        match self.try_plan() {
            Ok(plan) => self.pull_all(&plan.missing_locally),
            Err(err) => {
                error!("event=store_pull module=reconciler status=error error={err}");
                BatchReport::aborted(&err)
            }
        }
    }

    /// Diffs local and stored inventories.
    ///
    /// Returns `None` when either side could not be listed, so a failed
    /// listing is never mistaken for an empty inventory.
    pub fn plan(&self) -> Option<ReconcilePlan> {
        match self.try_plan() {
            Ok(plan) => {
                info!(
                    "event=reconcile_plan module=reconciler status=ok missing_locally={} untracked={}",
                    plan.missing_locally.len(),
                    plan.untracked.len()
                );
                Some(plan)
            }
            Err(err) => {
                error!("event=reconcile_plan module=reconciler status=error error={err}");
                None
            }
        }
    }

    /// Writes the local inventory to `destination/filename`.
    ///
    /// Creates the destination directory and file when absent and replaces
    /// existing content. A failed local listing leaves an existing manifest
    /// untouched. Returns the written path on success.
    pub fn export_manifest(&self, destination: &Path, filename: &str) -> Option<PathBuf> {
        let path = destination.join(filename);
        match self.try_export_manifest(destination, &path) {
            Ok(count) => {
                info!(
                    "event=manifest_export module=reconciler status=ok path={} count={}",
                    path.display(),
                    count
                );
                Some(path)
            }
            Err(err) => {
                error!(
                    "event=manifest_export module=reconciler status=error path={} error={}",
                    path.display(),
                    err
                );
                None
            }
        }
    }

    /// Saves every local image to `<output_dir>/<repository>_<tag>.tar`.
    ///
    /// An unsupported platform or a failed local listing aborts the report;
    /// an empty listing is a successful no-op.
    pub fn export_archives(&self, output_dir: &Path) -> BatchReport {
        let mut report = BatchReport::default();
        if let Err(err) = self.try_export_archives(output_dir, &mut report) {
            error!(
                "event=archive_export module=reconciler status=error output_dir={} error={}",
                output_dir.display(),
                err
            );
            report.aborted = Some(err.to_string());
            return report;
        }

        info!(
            "event=archive_export module=reconciler status=done exported={} failed={}",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }

    fn try_list_local_images(&self, verbose: bool) -> Result<Vec<ImageRecord>, InventoryError> {
        let commands = self.runtime_commands()?;
        let output = self.runner.run(&commands.list_images());
        if output.is_failure() {
            return Err(InventoryError::Command(output.error));
        }

        if verbose {
            for line in output.stdout.lines() {
                debug!("event=local_list module=reconciler status=raw line={line}");
            }
        }

        Ok(parse_image_table(&output.stdout))
    }

    fn try_sync_to_store(&self, report: &mut BatchReport) -> Result<(), InventoryError> {
        let session = StoreGateway::session(self.store_config()?)?;
        let images = self.try_list_local_images(false)?;
        let repo = StoreImageRepository::new(&session);

        for image in &images {
            repo.insert_image(image)?;
            report.succeeded.push(image.reference());
        }
        Ok(())
    }

    fn try_export_archives(
        &self,
        output_dir: &Path,
        report: &mut BatchReport,
    ) -> Result<(), InventoryError> {
        let commands = self.runtime_commands()?;
        fs::create_dir_all(output_dir).map_err(|source| InventoryError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let images = self.try_list_local_images(true)?;
        if images.is_empty() {
            warn!(
                "event=archive_export module=reconciler status=skip reason=no_images output_dir={}",
                output_dir.display()
            );
            return Ok(());
        }

        for image in &images {
            let reference = image.reference();
            let output_path = output_dir.join(image.archive_file_name());
            let output = self.runner.run(&commands.save(&output_path, &reference));

            if output.is_failure() {
                error!(
                    "event=archive_export module=reconciler status=error image={} error={}",
                    reference, output.error
                );
                report.failed.push(BatchFailure {
                    item: reference,
                    error: output.error,
                });
            } else {
                info!(
                    "event=archive_export module=reconciler status=ok image={} path={}",
                    reference,
                    output_path.display()
                );
                report.succeeded.push(output_path.display().to_string());
            }
        }
        Ok(())
    }

    fn try_list_store_images(&self) -> Result<Vec<ImageRecord>, InventoryError> {
        let session = StoreGateway::session(self.store_config()?)?;
        let records = StoreImageRepository::new(&session).list_images()?;
        info!(
            "event=store_list module=reconciler status=ok count={}",
            records.len()
        );
        Ok(records)
    }

    fn try_plan(&self) -> Result<ReconcilePlan, InventoryError> {
        let stored = self.try_list_store_images()?;
        let local = self.try_list_local_images(false)?;
        Ok(ReconcilePlan::between(&local, &stored))
    }

    fn try_export_manifest(
        &self,
        destination: &Path,
        path: &Path,
    ) -> Result<usize, InventoryError> {
        let images = self.try_list_local_images(false)?;
        fs::create_dir_all(destination).map_err(|source| InventoryError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        write_manifest(path, &images)?;
        Ok(images.len())
    }

    fn pull_all(&self, images: &[ImageRecord]) -> BatchReport {
        let commands = match self.runtime_commands() {
            Ok(commands) => commands,
            Err(err) => {
                error!("event=store_pull module=reconciler status=skip error={err}");
                return BatchReport::aborted(&err);
            }
        };

        if images.is_empty() {
            info!("event=store_pull module=reconciler status=skip reason=nothing_to_pull");
            return BatchReport::default();
        }

        let mut report = BatchReport::default();
        for image in images {
            let reference = image.reference();
            let output = self.runner.run(&commands.pull(&reference));
            if output.is_failure() {
                error!(
                    "event=store_pull module=reconciler status=error image={} error={}",
                    reference, output.error
                );
                report.failed.push(BatchFailure {
                    item: reference,
                    error: output.error,
                });
            } else {
                info!(
                    "event=store_pull module=reconciler status=ok image={} output={}",
                    reference, output.stdout
                );
                report.succeeded.push(reference);
            }
        }
        report
    }

    fn runtime_commands(&self) -> Result<&RuntimeCommands, InventoryError> {
        self.commands
            .as_ref()
            .ok_or_else(|| InventoryError::UnsupportedPlatform(self.platform.clone()))
    }

    fn store_config(&self) -> Result<&StoreConfig, InventoryError> {
        self.store.as_ref().ok_or(InventoryError::StoreNotConfigured)
    }
}

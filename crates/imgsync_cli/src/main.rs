//! imgsync command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto `imgsync_core` reconciliation use-cases.
//! - Resolve configuration (process environment plus `.env`) and runtime
//!   platform once at startup.
//!
//! # Invariants
//! - Setup failures (logging, configuration, schema init) exit with status 1.
//! - Batch operations exit with status 1 when their report shows failures.

use clap::{Args, Parser, Subcommand};
use imgsync_core::{
    default_log_level, init_console_logging, init_logging, load_dotenv, BatchReport, HostPlatform,
    ImageRecord, Reconciler, RuntimeSettings, ShellRunner, StoreConfig, StoreGateway,
    DEFAULT_EXPORT_DIR, DEFAULT_MANIFEST_FILE_NAME,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult = Result<ExitCode, Box<dyn Error>>;

/// Container image inventory: list, store, pull and export.
#[derive(Parser)]
#[command(name = "imgsync", version, about)]
struct Cli {
    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List local images reported by the runtime
    List(ListArgs),
    /// Create the images table in the store
    InitStore,
    /// Insert every local image into the store
    Sync,
    /// List images recorded in the store
    Stored,
    /// List images recorded in a manifest file
    Manifest(ManifestArgs),
    /// Compare local images with the store
    Status,
    /// Pull stored images through the runtime
    Pull(PullArgs),
    /// Write local image metadata to a JSON manifest
    ExportManifest(ExportManifestArgs),
    /// Save every local image to a tar archive
    ExportArchives(ExportArchivesArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Only show image references (one per line)
    #[arg(short, long)]
    quiet: bool,

    /// Also log the raw runtime table, one debug event per line
    #[arg(long)]
    raw: bool,
}

#[derive(Args)]
struct ManifestArgs {
    /// Path to the manifest file
    path: PathBuf,
}

#[derive(Args)]
struct PullArgs {
    /// Only pull stored images that are absent locally
    #[arg(long)]
    missing_only: bool,
}

#[derive(Args)]
struct ExportManifestArgs {
    /// Destination directory
    #[arg(long, default_value = ".")]
    dest: PathBuf,

    /// Manifest file name
    #[arg(long, default_value = DEFAULT_MANIFEST_FILE_NAME)]
    filename: String,
}

#[derive(Args)]
struct ExportArchivesArgs {
    /// Output directory, created when missing
    #[arg(long, default_value = DEFAULT_EXPORT_DIR)]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    match cli.log_dir.as_deref() {
        Some(dir) => init_logging(&level, dir)?,
        None => init_console_logging(&level)?,
    }

    if let Some(path) = load_dotenv()? {
        info!(
            "event=env_file_load module=cli status=ok path={}",
            path.display()
        );
    }

    let platform = HostPlatform::current();
    let settings = RuntimeSettings::from_env()?;
    info!(
        "event=cli_start module=cli status=ok platform={} runtime={}",
        platform, settings.binary
    );
    let reconciler = Reconciler::new(ShellRunner, platform, &settings);

    match cli.command {
        Command::List(args) => {
            let images = reconciler.list_local_images(args.raw);
            if args.quiet {
                images.iter().for_each(|image| println!("{}", image.reference()));
            } else {
                print_records(&images);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::InitStore => init_store(),
        Command::Sync => {
            let report = reconciler.with_store(StoreConfig::from_env()?).sync_to_store();
            Ok(finish_batch("inserted", &report))
        }
        Command::Stored => {
            let reconciler = reconciler.with_store(StoreConfig::from_env()?);
            print_records(&reconciler.list_store_images());
            Ok(ExitCode::SUCCESS)
        }
        Command::Manifest(args) => {
            print_records(&reconciler.list_manifest_images(&args.path));
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            let reconciler = reconciler.with_store(StoreConfig::from_env()?);
            let Some(plan) = reconciler.plan() else {
                return Ok(ExitCode::FAILURE);
            };
            if plan.is_in_sync() {
                println!("local images match the store");
            }
            for image in &plan.missing_locally {
                println!("missing   {}", image.reference());
            }
            for image in &plan.untracked {
                println!("untracked {}", image.reference());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Pull(args) => {
            let reconciler = reconciler.with_store(StoreConfig::from_env()?);
            let report = if args.missing_only {
                reconciler.pull_missing()
            } else {
                reconciler.pull_from_store()
            };
            Ok(finish_batch("pulled", &report))
        }
        Command::ExportManifest(args) => {
            match reconciler.export_manifest(&args.dest, &args.filename) {
                Some(path) => {
                    println!("manifest exported to {}", path.display());
                    Ok(ExitCode::SUCCESS)
                }
                None => Ok(ExitCode::FAILURE),
            }
        }
        Command::ExportArchives(args) => {
            let report = reconciler.export_archives(&args.output_dir);
            Ok(finish_batch("exported", &report))
        }
    }
}

fn init_store() -> CliResult {
    let config = StoreConfig::from_env()?;
    let mut gateway = StoreGateway::new();
    gateway.connect_or_create(&config)?;
    let version = gateway.init_schema()?;
    gateway.disconnect();
    println!("store ready at schema version {version}");
    Ok(ExitCode::SUCCESS)
}

fn print_records(images: &[ImageRecord]) {
    let repo_width = column_width("REPOSITORY", images.iter().map(|i| i.repository.as_str()));
    let tag_width = column_width("TAG", images.iter().map(|i| i.tag.as_str()));
    let id_width = column_width("IMAGE ID", images.iter().map(|i| i.identifier.as_str()));

    println!(
        "{:<repo_width$}  {:<tag_width$}  {:<id_width$}  SIZE",
        "REPOSITORY", "TAG", "IMAGE ID"
    );
    for image in images {
        println!(
            "{:<repo_width$}  {:<tag_width$}  {:<id_width$}  {}",
            image.repository, image.tag, image.identifier, image.size
        );
    }
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).fold(header.len(), usize::max)
}

fn finish_batch(verb: &str, report: &BatchReport) -> ExitCode {
    for item in &report.succeeded {
        println!("{verb} {item}");
    }
    for failure in &report.failed {
        eprintln!("failed {}: {}", failure.item, failure.error);
    }
    if let Some(reason) = &report.aborted {
        eprintln!("aborted: {reason}");
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

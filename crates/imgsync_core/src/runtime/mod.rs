//! Container runtime plumbing.
//!
//! # Responsibility
//! - Run shell-interpreted runtime commands and capture their text output.
//! - Select the runtime invocation once per host platform.
//! - Parse the runtime's image table into records.
//!
//! # Invariants
//! - Running a command never fails outward; failure is carried as error text.
//! - No command is built for an unsupported platform.

pub mod command;
pub mod platform;
pub mod table;

pub use command::{CommandOutput, CommandRunner, ShellRunner};
pub use platform::{HostPlatform, RuntimeCommands};
pub use table::parse_image_table;

//! Host platform detection and runtime command construction.
//!
//! # Invariants
//! - Platform and elevation are resolved once, when `RuntimeCommands` is
//!   built, and never re-checked per call.
//! - Commands for the two supported platforms differ only by the elevation
//!   prefix and by how arguments are quoted for the host shell.
//! - Paths and image references are quoted so the shell passes them to the
//!   runtime as single literal arguments.

use crate::config::RuntimeSettings;
use std::fmt::{Display, Formatter};
use std::path::Path;

const ELEVATION_PREFIX: &str = "sudo ";

/// Host operating system as seen by the runtime dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Linux,
    Other(String),
}

impl HostPlatform {
    /// Returns the platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            other => Self::Other(other.to_string()),
        }
    }

    /// Default elevation for supported platforms; `None` when unsupported.
    fn default_elevation(&self) -> Option<bool> {
        match self {
            Self::Windows => Some(false),
            Self::Linux => Some(true),
            Self::Other(_) => None,
        }
    }
}

impl Display for HostPlatform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Quoting rules of the shell that interprets runtime command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellSyntax {
    /// `sh -c`
    Posix,
    /// `cmd /C`
    Cmd,
}

impl ShellSyntax {
    fn is_literal(self, c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '+' | '=' | ',')
            || (self == Self::Cmd && c == '\\')
    }

    /// Renders `arg` as one literal shell word.
    fn quote(self, arg: &str) -> String {
        if !arg.is_empty() && arg.chars().all(|c| self.is_literal(c)) {
            return arg.to_string();
        }
        match self {
            Self::Posix => format!("'{}'", arg.replace('\'', r"'\''")),
            // `"` cannot occur in a Windows path or an image reference.
            Self::Cmd => format!("\"{}\"", arg.replace('"', "")),
        }
    }
}

/// Runtime command-line builder for one resolved platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommands {
    binary: String,
    elevated: bool,
    shell: ShellSyntax,
}

impl RuntimeCommands {
    /// Resolves the invocation for `platform`.
    ///
    /// Returns `None` for unsupported platforms. An explicit elevation
    /// override in `settings` wins over the platform default.
    pub fn for_platform(platform: &HostPlatform, settings: &RuntimeSettings) -> Option<Self> {
        let default_elevation = platform.default_elevation()?;
        let shell = match platform {
            HostPlatform::Windows => ShellSyntax::Cmd,
            _ => ShellSyntax::Posix,
        };
        Some(Self {
            binary: settings.binary.clone(),
            elevated: settings.elevate.unwrap_or(default_elevation),
            shell,
        })
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn list_images(&self) -> String {
        self.invocation("images")
    }

    pub fn pull(&self, reference: &str) -> String {
        self.invocation(&format!("pull {}", self.shell.quote(reference)))
    }

    pub fn save(&self, output: &Path, reference: &str) -> String {
        self.invocation(&format!(
            "save -o {} {}",
            self.shell.quote(&output.display().to_string()),
            self.shell.quote(reference)
        ))
    }

    fn invocation(&self, args: &str) -> String {
        let prefix = if self.elevated { ELEVATION_PREFIX } else { "" };
        format!("{prefix}{} {args}", self.binary)
    }
}

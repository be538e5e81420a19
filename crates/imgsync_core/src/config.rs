//! Environment-provided configuration.
//!
//! # Responsibility
//! - Load store connection parameters and runtime overrides once at startup,
//!   after merging an optional `.env` file into the process environment.
//! - Reject malformed values before any store or runtime call is made.
//!
//! # Invariants
//! - Loading never touches the network, the store or the runtime.
//! - `password` never appears in `Debug` output.
//! - Variables already set in the process environment win over `.env`.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWD: &str = "DB_PASSWD";
pub const ENV_DB_DATABASE: &str = "DB_DATABASE";
pub const ENV_RUNTIME: &str = "IMGSYNC_RUNTIME";
pub const ENV_ELEVATE: &str = "IMGSYNC_ELEVATE";

const DEFAULT_RUNTIME_BINARY: &str = "docker";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidPort(String),
    InvalidFlag { var: &'static str, value: String },
    EnvFile(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required environment variable `{var}`"),
            Self::InvalidPort(value) => {
                write!(f, "invalid store port `{value}`; expected 0-65535")
            }
            Self::InvalidFlag { var, value } => write!(
                f,
                "invalid value `{value}` for `{var}`; expected yes|no|true|false|1|0"
            ),
            Self::EnvFile(message) => write!(f, "invalid .env file: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Loads the nearest `.env` file (working directory or an ancestor) into the
/// process environment.
///
/// Returns the loaded path, or `None` when no file exists. A file that
/// exists but cannot be read or parsed is an error.
pub fn load_dotenv() -> ConfigResult<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(ConfigError::EnvFile(err.to_string())),
    }
}

/// Connection parameters for the relational store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// SQLite database path, or `:memory:`.
    pub database: String,
}

impl StoreConfig {
    /// Loads store parameters from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads store parameters through a caller-provided lookup.
    ///
    /// `DB_DATABASE` and `DB_PORT` are required; host, user and password
    /// default to empty.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port_text = lookup(ENV_DB_PORT).ok_or(ConfigError::Missing(ENV_DB_PORT))?;
        let database = lookup(ENV_DB_DATABASE)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_DB_DATABASE))?;

        Ok(Self {
            host: lookup(ENV_DB_HOST).unwrap_or_default(),
            port: parse_port(&port_text)?,
            user: lookup(ENV_DB_USER).unwrap_or_default(),
            password: lookup(ENV_DB_PASSWD).unwrap_or_default(),
            database,
        })
    }

    /// Builds a config for a local SQLite file without going through the
    /// environment.
    pub fn local(database: impl Into<String>) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: database.into(),
        }
    }
}

impl Debug for StoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Parses a store port, rejecting anything outside `u16`.
pub fn parse_port(value: &str) -> ConfigResult<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(value.to_string()))
}

/// Runtime invocation overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Runtime binary name or path.
    pub binary: String,
    /// Explicit elevation choice; `None` keeps the platform default.
    pub elevate: Option<bool>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_RUNTIME_BINARY.to_string(),
            elevate: None,
        }
    }
}

impl RuntimeSettings {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let binary = lookup(ENV_RUNTIME)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_RUNTIME_BINARY.to_string());

        let elevate = match lookup(ENV_ELEVATE) {
            Some(value) if !value.trim().is_empty() => Some(parse_flag(ENV_ELEVATE, &value)?),
            _ => None,
        };

        Ok(Self { binary, elevate })
    }
}

fn parse_flag(var: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_port, ConfigError, RuntimeSettings, StoreConfig};
    use std::collections::HashMap;
    use std::fs;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn store_config_reads_all_fields() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("DB_HOST", "localhost"),
            ("DB_PORT", "3306"),
            ("DB_USER", "root"),
            ("DB_PASSWD", "password"),
            ("DB_DATABASE", "images.db"),
        ]))
        .expect("complete env should load");

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "password");
        assert_eq!(config.database, "images.db");
    }

    #[test]
    fn store_config_rejects_non_numeric_port() {
        let err = StoreConfig::from_lookup(lookup_from(&[
            ("DB_PORT", "33o6"),
            ("DB_DATABASE", "images.db"),
        ]))
        .expect_err("malformed port must fail");
        assert_eq!(err, ConfigError::InvalidPort("33o6".to_string()));
    }

    #[test]
    fn store_config_requires_database() {
        let err = StoreConfig::from_lookup(lookup_from(&[("DB_PORT", "3306")]))
            .expect_err("missing database must fail");
        assert_eq!(err, ConfigError::Missing("DB_DATABASE"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let mut config = StoreConfig::local("images.db");
        config.password = "hunter2".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn parse_port_rejects_out_of_range() {
        assert!(parse_port("65536").is_err());
        assert_eq!(parse_port(" 5432 ").expect("trimmed port should parse"), 5432);
    }

    #[test]
    fn runtime_settings_default_to_docker_without_override() {
        let settings = RuntimeSettings::from_lookup(lookup_from(&[])).expect("empty env is valid");
        assert_eq!(settings, RuntimeSettings::default());
        assert_eq!(settings.binary, "docker");
        assert_eq!(settings.elevate, None);
    }

    #[test]
    fn runtime_settings_parse_overrides() {
        let settings = RuntimeSettings::from_lookup(lookup_from(&[
            ("IMGSYNC_RUNTIME", "podman"),
            ("IMGSYNC_ELEVATE", "No"),
        ]))
        .expect("overrides should parse");
        assert_eq!(settings.binary, "podman");
        assert_eq!(settings.elevate, Some(false));

        let err = RuntimeSettings::from_lookup(lookup_from(&[("IMGSYNC_ELEVATE", "maybe")]))
            .expect_err("unknown flag must fail");
        assert!(matches!(err, ConfigError::InvalidFlag { .. }));
    }

    #[test]
    fn store_config_loads_from_env_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# store\nDB_HOST=localhost\nDB_PORT=3306\nDB_USER=root\nDB_PASSWD=\"p@ss word\"\nDB_DATABASE=images.db\n",
        )
        .expect("write .env");

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .expect("open .env")
            .collect::<Result<_, _>>()
            .expect("parse .env");
        let config = StoreConfig::from_lookup(move |key: &str| vars.get(key).cloned())
            .expect(".env should supply every required variable");

        assert_eq!(config.port, 3306);
        assert_eq!(config.password, "p@ss word");
        assert_eq!(config.database, "images.db");
    }
}

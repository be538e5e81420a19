//! Relational store gateway and schema bootstrap.
//!
//! # Responsibility
//! - Own the single store connection used by one operation.
//! - Execute parameterized statements with one commit per call.
//! - Apply the `images` schema only when explicitly asked to.
//!
//! # Invariants
//! - Statements issued without a live connection fail with `NotConnected`.
//! - Disconnect is idempotent and never fails outward.
//! - Schema version is tracked via `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod gateway;
pub mod migrations;

pub use gateway::{StoreGateway, StoreSession};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Store unreachable or misconfigured.
    Connection(String),
    /// A statement was attempted without a live connection.
    NotConnected,
    /// The store rejected a statement.
    Statement(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(message) => write!(f, "store connection failed: {message}"),
            Self::NotConnected => write!(f, "store connection not initialized"),
            Self::Statement(err) => write!(f, "store rejected statement: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Statement(err) => Some(err),
            Self::Connection(_) | Self::NotConnected | Self::UnsupportedSchemaVersion { .. } => {
                None
            }
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Statement(value)
    }
}

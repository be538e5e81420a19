//! Store connection lifecycle.
//!
//! # Responsibility
//! - Open, hold and close the one connection owned by a gateway value.
//! - Run parameterized statements in autocommit mode.
//!
//! # Invariants
//! - At most one connection is held; reconnecting closes the previous one.
//! - Every `execute` call is its own commit; no transaction spans calls.
//! - A `StoreSession` releases its connection on every exit path.

use super::migrations::apply_migrations;
use super::{StoreError, StoreResult};
use crate::config::StoreConfig;
use log::{error, info, warn};
use rusqlite::{Connection, OpenFlags, Params, Row};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

const MEMORY_DATABASE: &str = ":memory:";
const LOCAL_HOSTS: &[&str] = &["", "localhost", "127.0.0.1", "::1"];

/// Gateway over a single SQLite connection.
#[derive(Debug, Default)]
pub struct StoreGateway {
    conn: Option<Connection>,
}

impl StoreGateway {
    /// Creates a gateway with no connection.
    pub fn new() -> Self {
        Self { conn: None }
    }

    /// Connects and wraps the gateway in a guard that disconnects on drop.
    pub fn session(config: &StoreConfig) -> StoreResult<StoreSession> {
        let mut gateway = Self::new();
        gateway.connect(config)?;
        Ok(StoreSession { gateway })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the configured database, which must already exist.
    ///
    /// # Errors
    /// - `Connection` when the host is not local or the open fails.
    pub fn connect(&mut self, config: &StoreConfig) -> StoreResult<()> {
        self.open(config, false)
    }

    /// Opens the configured database, creating the file when absent.
    ///
    /// Used by schema initialization only; steady-state operations call
    /// `connect` so a mistyped path is reported instead of silently created.
    pub fn connect_or_create(&mut self, config: &StoreConfig) -> StoreResult<()> {
        self.open(config, true)
    }

    /// Runs one statement and commits it.
    ///
    /// Pass `[]` when the statement takes no parameters. Returns the number
    /// of affected rows.
    pub fn execute<P: Params>(&self, statement: &str, params: P) -> StoreResult<usize> {
        let conn = self.connection()?;
        Ok(conn.execute(statement, params)?)
    }

    /// Runs a select and maps each row in store order.
    pub fn query<T, P, F>(&self, statement: &str, params: P, mut map_row: F) -> StoreResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(statement)?;
        let mut rows = stmt.query(params)?;
        let mut mapped = Vec::new();
        while let Some(row) = rows.next()? {
            mapped.push(map_row(row)?);
        }
        Ok(mapped)
    }

    /// Applies pending schema migrations and returns the resulting version.
    pub fn init_schema(&mut self) -> StoreResult<u32> {
        let conn = self.conn.as_mut().ok_or(StoreError::NotConnected)?;
        apply_migrations(conn)
    }

    /// Closes and clears the connection; does nothing when none is held.
    pub fn disconnect(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        match conn.close() {
            Ok(()) => info!("event=store_disconnect module=db status=ok"),
            Err((_conn, err)) => {
                warn!(
                    "event=store_disconnect module=db status=error error_code=close_failed error={}",
                    err
                );
            }
        }
    }

    fn connection(&self) -> StoreResult<&Connection> {
        self.conn.as_ref().ok_or(StoreError::NotConnected)
    }

    fn open(&mut self, config: &StoreConfig, create: bool) -> StoreResult<()> {
        let started_at = Instant::now();
        let mode = if config.database == MEMORY_DATABASE {
            "memory"
        } else {
            "file"
        };
        info!(
            "event=store_connect module=db status=start mode={} host={} port={} user={} database={}",
            mode, config.host, config.port, config.user, config.database
        );

        // Replacing a live handle closes it first.
        self.disconnect();

        match open_connection(config, create) {
            Ok(conn) => {
                info!(
                    "event=store_connect module=db status=ok mode={} duration_ms={}",
                    mode,
                    started_at.elapsed().as_millis()
                );
                self.conn = Some(conn);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_connect module=db status=error mode={} duration_ms={} error_code=connect_failed error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

impl Drop for StoreGateway {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn open_connection(config: &StoreConfig, create: bool) -> StoreResult<Connection> {
    let host = config.host.trim();
    if !LOCAL_HOSTS.contains(&host) {
        return Err(StoreError::Connection(format!(
            "host `{host}` is not reachable by the local SQLite store"
        )));
    }

    let opened = if config.database == MEMORY_DATABASE {
        Connection::open_in_memory()
    } else {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Connection::open_with_flags(&config.database, flags)
    };
    let conn = opened
        .map_err(|err| StoreError::Connection(format!("`{}`: {err}", config.database)))?;

    conn.busy_timeout(Duration::from_secs(5))
        .map_err(|err| StoreError::Connection(err.to_string()))?;
    Ok(conn)
}

/// Connected gateway that disconnects when dropped.
#[derive(Debug)]
pub struct StoreSession {
    gateway: StoreGateway,
}

impl Deref for StoreSession {
    type Target = StoreGateway;

    fn deref(&self) -> &Self::Target {
        &self.gateway
    }
}

impl DerefMut for StoreSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.gateway
    }
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        self.gateway.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreGateway, StoreSession};
    use crate::config::StoreConfig;
    use crate::db::StoreError;

    #[test]
    fn disconnect_without_connection_is_noop() {
        let mut gateway = StoreGateway::new();
        gateway.disconnect();
        gateway.disconnect();
        assert!(!gateway.is_connected());
    }

    #[test]
    fn execute_without_connection_is_not_connected() {
        let gateway = StoreGateway::new();
        let err = gateway
            .execute("SELECT 1", [])
            .expect_err("execute must require a connection");
        assert!(matches!(err, StoreError::NotConnected));
    }

    #[test]
    fn remote_host_is_rejected_as_connection_error() {
        let mut config = StoreConfig::local(":memory:");
        config.host = "db.example.internal".to_string();

        let mut gateway = StoreGateway::new();
        let err = gateway
            .connect(&config)
            .expect_err("remote host must be rejected");
        assert!(matches!(err, StoreError::Connection(_)));
        assert!(!gateway.is_connected());
    }

    #[test]
    fn reconnect_replaces_previous_handle() {
        let config = StoreConfig::local(":memory:");
        let mut gateway = StoreGateway::new();
        gateway.connect(&config).expect("first connect");
        gateway
            .execute("CREATE TABLE marker (id INTEGER)", [])
            .expect("create marker table");

        gateway.connect(&config).expect("second connect");
        let err = gateway
            .execute("INSERT INTO marker (id) VALUES (1)", [])
            .expect_err("fresh in-memory handle has no marker table");
        assert!(matches!(err, StoreError::Statement(_)));
    }

    #[test]
    fn session_derefs_to_connected_gateway() {
        let session: StoreSession =
            StoreGateway::session(&StoreConfig::local(":memory:")).expect("session opens");
        assert!(session.is_connected());
        let rows = session
            .query("SELECT 41 + 1", [], |row| row.get::<_, i64>(0))
            .expect("select runs");
        assert_eq!(rows, vec![42]);
    }
}

//! `DuckDB` connection opening.
//!
//! Every invocation works against one connection owned by the
//! [`Warehouse`](crate::Warehouse); there is no pool and no process-wide handle.

use std::path::Path;

use ::duckdb::{AccessMode as DuckAccessMode, Config, Connection};

/// Access mode for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access. Diagnostics and the health report use this.
    ReadOnly,
    /// Read-write access.
    ReadWrite,
}

/// Open a file-backed connection.
///
/// # Errors
/// Returns an error if the database file cannot be opened or configured.
pub fn open_connection(path: &Path, mode: AccessMode) -> Result<Connection, ::duckdb::Error> {
    let connection = match mode {
        AccessMode::ReadWrite => Connection::open(path)?,
        AccessMode::ReadOnly => {
            let config = Config::default().access_mode(DuckAccessMode::ReadOnly)?;
            Connection::open_with_flags(path, config)?
        }
    };
    configure_connection(&connection)?;
    Ok(connection)
}

/// Open a private in-memory database.
pub fn open_in_memory() -> Result<Connection, ::duckdb::Error> {
    let connection = Connection::open_in_memory()?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

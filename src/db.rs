//! SQLite handle for the linkage demo.
//!
//! The database is opened once at startup and closed at shutdown. The only
//! statement ever issued is a version probe that confirms the bundled
//! native library is callable.

use rusqlite::Connection;
use thiserror::Error;

use crate::config::DEFAULT_DATABASE_LOCATION;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to open database '{location}': {source}")]
    Open {
        location: String,
        #[source]
        source: rusqlite::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// An open SQLite connection plus where it came from.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    location: String,
    version: String,
}

impl Database {
    /// Open `location` (`:memory:` or a file path) and verify the connection.
    pub fn open(location: &str) -> DbResult<Self> {
        let opened = if location == DEFAULT_DATABASE_LOCATION {
            Connection::open_in_memory()
        } else {
            Connection::open(location)
        };
        let conn = opened.map_err(|source| DbError::Open {
            location: location.to_string(),
            source,
        })?;

        // Opening a file lazily succeeds on some platforms; force a round trip.
        let version: String = conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|source| DbError::Open {
                location: location.to_string(),
                source,
            })?;

        tracing::debug!(location, version = %version, "Opened SQLite database");

        Ok(Self {
            conn,
            location: location.to_string(),
            version,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Version reported by the linked SQLite library
    pub fn sqlite_version(&self) -> &str {
        &self.version
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> DbResult<()> {
        let location = self.location;
        self.conn.close().map_err(|(_, e)| DbError::from(e))?;
        tracing::debug!(location = %location, "Closed SQLite database");
        Ok(())
    }
}

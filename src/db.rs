//! Target-store bootstrap.
//!
//! The target catalog's database is opened once per batch and is never
//! created by this tool; the server's own indexer owns the schema. Opening
//! therefore refuses to create a file, so a typoed path fails loudly
//! instead of leaving an empty database behind.

use crate::config::RuntimeConfig;
use anyhow::{bail, Context, Result};
use log::debug;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which kind of database holds the target catalog.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sqlite,
    /// Recognized for forward compatibility; not wired up.
    Postgres,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sqlite" => Ok(StoreKind::Sqlite),
            "postgres" => Ok(StoreKind::Postgres),
            other => bail!("Unknown store kind '{other}' (expected 'sqlite')"),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Sqlite => write!(f, "sqlite"),
            StoreKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// Open the target catalog store described by `config`.
///
/// Fails before any record is processed when the store kind is
/// unsupported, the file is missing, or the file is not a database.
pub fn open_store(config: &RuntimeConfig) -> Result<Connection> {
    match config.store_kind {
        StoreKind::Sqlite => {}
        StoreKind::Postgres => bail!("Store kind 'postgres' is not supported yet (use 'sqlite')"),
    }

    debug!("Opening target catalog database at {}", config.store_path.display());
    let conn = Connection::open_with_flags(
        &config.store_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| {
        format!(
            "Could not open target catalog database at {}",
            config.store_path.display()
        )
    })?;

    // Forces SQLite to actually read the header, so a non-database file is
    // rejected here rather than at the first record.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))
        .with_context(|| {
            format!(
                "{} is not a usable SQLite database",
                config.store_path.display()
            )
        })?;

    Ok(conn)
}

//! Versioned schema upgrades for the tracker store.
//!
//! `PRAGMA user_version` is authoritative; `store_meta.schema_version` mirrors
//! it for anyone inspecting the file with `sqlite3`.

use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use super::schema;

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "core tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "read-path indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(
        "store schema v{found} is newer than this build supports (v{supported}); upgrade st"
    )]
    NewerStore { found: u32, supported: u32 },

    #[error("stored schema version {0} is not a valid version")]
    InvalidVersion(i64),

    #[error("migration v{version} ({name}) failed: {source}")]
    Apply {
        version: u32,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Schema version recorded in `PRAGMA user_version`.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> Result<u32, MigrationError> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw).map_err(|_| MigrationError::InvalidVersion(raw))
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`] and return it.
///
/// # Errors
///
/// Fails on a store written by a newer build, or when any step fails; a
/// failed step leaves the store at the previous version.
pub fn migrate(conn: &mut Connection) -> Result<u32, MigrationError> {
    let current = current_schema_version(conn)?;
    if current > LATEST_SCHEMA_VERSION {
        return Err(MigrationError::NewerStore {
            found: current,
            supported: LATEST_SCHEMA_VERSION,
        });
    }

    let mut reached = current;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let applied = apply(conn, migration).map_err(|source| MigrationError::Apply {
            version: migration.version,
            name: migration.name,
            source,
        })?;
        if applied {
            info!(version = migration.version, name = migration.name, "applied store migration");
        }
        reached = migration.version;
    }
    Ok(reached)
}

/// Run one step under the write lock. The version is re-read there, so
/// concurrent openers of a fresh store apply each step exactly once.
fn apply(conn: &mut Connection, migration: &Migration) -> rusqlite::Result<bool> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let version: i64 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version >= i64::from(migration.version) {
        return Ok(false);
    }

    tx.execute_batch(migration.sql)?;
    tx.pragma_update(None, "user_version", i64::from(migration.version))?;
    tx.execute(
        "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
        [i64::from(migration.version)],
    )?;
    tx.commit()?;
    Ok(true)
}

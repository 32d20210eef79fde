pub mod init;
pub mod leaderboard;
pub mod party;
pub mod person;
pub mod refresh;

use anyhow::Result;
use rusqlite::Connection;
use solvetrack_core::clock::{Clock, SystemClock};
use solvetrack_core::config::{self, ProjectConfig};
use solvetrack_core::db::{self, query};
use solvetrack_core::error::{CodedError, ErrorCode};
use solvetrack_core::model::{Party, Person};
use std::path::{Path, PathBuf};

use crate::output::OutputMode;

/// Everything a command handler needs from `main`.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub config: ProjectConfig,
    pub output: OutputMode,
}

impl Context {
    /// Open the project's store, failing with `E1001` if `st init` never ran.
    pub fn open_store(&self) -> Result<Connection> {
        open_existing_store(&self.project_root)
    }
}

pub fn open_existing_store(project_root: &Path) -> Result<Connection> {
    let path = config::db_path(project_root);
    db::try_open_store(&path)?.ok_or_else(|| {
        CodedError::new(
            ErrorCode::NotInitialized,
            format!("no tracker store at {}", path.display()),
        )
        .into()
    })
}

/// Load a person or fail with `E2001`.
pub fn find_person(conn: &Connection, person_id: i64) -> Result<Person> {
    query::get_person(conn, person_id)?.ok_or_else(|| {
        CodedError::new(
            ErrorCode::PersonNotFound,
            format!("person {person_id} not found"),
        )
        .into()
    })
}

/// Load a party or fail with `E2002`.
pub fn find_party(conn: &Connection, party_id: i64) -> Result<Party> {
    query::get_party(conn, party_id)?.ok_or_else(|| {
        CodedError::new(
            ErrorCode::PartyNotFound,
            format!("party {party_id} not found"),
        )
        .into()
    })
}

pub fn now_us() -> i64 {
    SystemClock.now().timestamp_micros()
}

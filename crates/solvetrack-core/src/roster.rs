//! Person and party bookkeeping the engine depends on.
//!
//! Plain create/update operations; the derived stat columns are never written
//! here.

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::db::query;
use crate::error::ErrorCode;
use crate::model::{Party, Person};

/// Errors from roster writes.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("party ends on {ends_on} before it starts on {starts_on}")]
    InvertedWindow {
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    },

    #[error("person {0} not found")]
    PersonNotFound(i64),

    #[error("party {0} not found")]
    PartyNotFound(i64),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl RosterError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Empty { .. } | Self::InvertedWindow { .. } => ErrorCode::InvalidRoster,
            Self::PersonNotFound(_) => ErrorCode::PersonNotFound,
            Self::PartyNotFound(_) => ErrorCode::PartyNotFound,
            Self::Storage(_) => ErrorCode::StoreWriteFailed,
        }
    }
}

/// Input for [`create_party`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParty {
    pub name: String,
    pub goal: u32,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

fn require(field: &'static str, value: &str) -> Result<String, RosterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RosterError::Empty { field });
    }
    Ok(trimmed.to_string())
}

/// Register a person with zeroed stats.
///
/// # Errors
///
/// Rejects blank names or handles; propagates storage failures.
pub fn create_person(
    conn: &Connection,
    display_name: &str,
    handle: &str,
    created_at_us: i64,
) -> Result<Person, RosterError> {
    let display_name = require("display name", display_name)?;
    let handle = require("handle", handle)?;

    conn.execute(
        "INSERT INTO persons (display_name, handle, created_at_us) VALUES (?1, ?2, ?3)",
        params![display_name, handle, created_at_us],
    )?;
    let person_id = conn.last_insert_rowid();
    query::get_person(conn, person_id)?.ok_or(RosterError::PersonNotFound(person_id))
}

/// Create a party.
///
/// # Errors
///
/// Rejects a blank name or an end date before the start date.
pub fn create_party(
    conn: &Connection,
    party: &NewParty,
    created_at_us: i64,
) -> Result<Party, RosterError> {
    let name = require("party name", &party.name)?;
    if party.ends_on < party.starts_on {
        return Err(RosterError::InvertedWindow {
            starts_on: party.starts_on,
            ends_on: party.ends_on,
        });
    }

    conn.execute(
        "INSERT INTO parties (name, goal, starts_on, ends_on, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, party.goal, party.starts_on, party.ends_on, created_at_us],
    )?;
    let party_id = conn.last_insert_rowid();
    query::get_party(conn, party_id)?.ok_or(RosterError::PartyNotFound(party_id))
}

/// Put a person into a party, replacing any previous membership.
///
/// # Errors
///
/// Fails if either side does not exist.
pub fn join_party(conn: &Connection, person_id: i64, party_id: i64) -> Result<(), RosterError> {
    if query::get_party(conn, party_id)?.is_none() {
        return Err(RosterError::PartyNotFound(party_id));
    }
    let changed = conn.execute(
        "UPDATE persons SET party_id = ?1 WHERE person_id = ?2",
        params![party_id, person_id],
    )?;
    if changed == 0 {
        return Err(RosterError::PersonNotFound(person_id));
    }
    Ok(())
}

/// Remove a person from whatever party they are in.
///
/// # Errors
///
/// Fails if the person does not exist.
pub fn leave_party(conn: &Connection, person_id: i64) -> Result<(), RosterError> {
    let changed = conn.execute(
        "UPDATE persons SET party_id = NULL WHERE person_id = ?1",
        [person_id],
    )?;
    if changed == 0 {
        return Err(RosterError::PersonNotFound(person_id));
    }
    Ok(())
}

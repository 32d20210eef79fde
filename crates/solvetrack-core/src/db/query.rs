//! Typed read helpers over the store.
//!
//! Row lookups used by the engine return `rusqlite::Result` so callers can
//! fold them into their own error types. Report-facing projections return
//! `anyhow::Result` with context.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::model::{Difficulty, Party, Person, PersonStats};

const PERSON_COLUMNS: &str = "person_id, display_name, handle, party_id, total_problems, \
     current_streak, longest_streak, last_solve_date, reward_points, last_refreshed_at_us, \
     created_at_us";

const PARTY_COLUMNS: &str =
    "party_id, name, goal, starts_on, ends_on, last_bulk_refresh_at_us, created_at_us";

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: u32,
    pub person: Person,
}

/// A ledger row of a party member, with enough context to chart it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartySolve {
    pub person_id: i64,
    pub display_name: String,
    pub problem_id: i64,
    pub difficulty: Difficulty,
    pub solved_on: NaiveDate,
}

pub(crate) fn person_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Person> {
    let reward_points: i64 = row.get("reward_points")?;
    Ok(Person {
        person_id: row.get("person_id")?,
        display_name: row.get("display_name")?,
        handle: row.get("handle")?,
        party_id: row.get("party_id")?,
        stats: PersonStats {
            total_problems: row.get("total_problems")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_solve_date: row.get("last_solve_date")?,
            reward_points: u64::try_from(reward_points).unwrap_or(0),
        },
        last_refreshed_at_us: row.get("last_refreshed_at_us")?,
        created_at_us: row.get("created_at_us")?,
    })
}

fn party_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Party> {
    Ok(Party {
        party_id: row.get("party_id")?,
        name: row.get("name")?,
        goal: row.get("goal")?,
        starts_on: row.get("starts_on")?,
        ends_on: row.get("ends_on")?,
        last_bulk_refresh_at_us: row.get("last_bulk_refresh_at_us")?,
        created_at_us: row.get("created_at_us")?,
    })
}

/// Fetch one person.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_person(conn: &Connection, person_id: i64) -> rusqlite::Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE person_id = ?1"),
        [person_id],
        person_from_row,
    )
    .optional()
}

/// Every person, by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_persons(conn: &Connection) -> rusqlite::Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSON_COLUMNS} FROM persons ORDER BY person_id ASC"
    ))?;
    stmt.query_map([], person_from_row)?.collect()
}

/// Fetch one party.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_party(conn: &Connection, party_id: i64) -> rusqlite::Result<Option<Party>> {
    conn.query_row(
        &format!("SELECT {PARTY_COLUMNS} FROM parties WHERE party_id = ?1"),
        [party_id],
        party_from_row,
    )
    .optional()
}

/// Every party, by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_parties(conn: &Connection) -> rusqlite::Result<Vec<Party>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTY_COLUMNS} FROM parties ORDER BY party_id ASC"
    ))?;
    stmt.query_map([], party_from_row)?.collect()
}

/// Members of a party, by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn party_members(conn: &Connection, party_id: i64) -> rusqlite::Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSON_COLUMNS} FROM persons WHERE party_id = ?1 ORDER BY person_id ASC"
    ))?;
    stmt.query_map([party_id], person_from_row)?.collect()
}

/// Persons ranked by reward points, then total solves, then id.
///
/// Ties share no rank: positions are strictly sequential.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn leaderboard(conn: &Connection, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM persons
             ORDER BY reward_points DESC, total_problems DESC, person_id ASC
             LIMIT ?1"
        ))
        .context("prepare leaderboard query")?;
    let limit = limit.map_or(-1, i64::from);
    let persons = stmt
        .query_map([limit], person_from_row)
        .context("execute leaderboard query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read leaderboard rows")?;

    Ok(persons
        .into_iter()
        .zip(1_u32..)
        .map(|(person, rank)| LeaderboardEntry { rank, person })
        .collect())
}

/// Ledger rows of a party's members solved inside `[from, to]`.
///
/// Ordered by date, then member, then problem.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn party_solves(
    conn: &Connection,
    party_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<PartySolve>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.person_id, p.display_name, r.problem_id, pr.difficulty, r.solved_on
             FROM solve_records r
             JOIN persons p ON p.person_id = r.person_id
             JOIN problems pr ON pr.problem_id = r.problem_id
             WHERE p.party_id = ?1 AND r.solved_on BETWEEN ?2 AND ?3
             ORDER BY r.solved_on ASC, r.person_id ASC, r.problem_id ASC",
        )
        .context("prepare party solves query")?;
    let rows = stmt
        .query_map(params![party_id, from, to], |row| {
            Ok(PartySolve {
                person_id: row.get(0)?,
                display_name: row.get(1)?,
                problem_id: row.get(2)?,
                difficulty: row.get(3)?,
                solved_on: row.get(4)?,
            })
        })
        .with_context(|| format!("query solves for party {party_id}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read party solve rows")?;
    Ok(rows)
}

/// English ordinal for a rank: `1st`, `2nd`, `3rd`, `4th`, `11th`, `21st`.
#[must_use]
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

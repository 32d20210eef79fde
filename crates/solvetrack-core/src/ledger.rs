//! Append-only, duplicate-proof ledger of credited solves.
//!
//! A `(person, problem)` pair is credited at most once, ever. Re-observing a
//! solve (the event source always replays recent history) is a silent no-op,
//! which is what makes refresh idempotent.

use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::model::{DatedSolve, SolveRecord};

/// Insert a solve unless `(person_id, problem_id)` is already credited.
///
/// Returns `true` when a new row was written.
///
/// # Errors
///
/// Returns an error if the insert fails for any reason other than the
/// duplicate key (e.g. a missing person or problem row).
pub fn record_solve(
    conn: &Connection,
    person_id: i64,
    problem_id: i64,
    solved_on: NaiveDate,
    points: Option<u32>,
    recorded_at_us: i64,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO solve_records (person_id, problem_id, solved_on, points, recorded_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (person_id, problem_id) DO NOTHING",
        params![person_id, problem_id, solved_on, points, recorded_at_us],
    )?;
    Ok(inserted == 1)
}

/// Number of credited solves for a person.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn solve_count(conn: &Connection, person_id: i64) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM solve_records WHERE person_id = ?1",
        [person_id],
        |row| row.get(0),
    )
}

/// Every ledger row of a person, oldest solve first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn solves_for_person(conn: &Connection, person_id: i64) -> rusqlite::Result<Vec<SolveRecord>> {
    let mut stmt = conn.prepare(
        "SELECT person_id, problem_id, solved_on, points, recorded_at_us
         FROM solve_records
         WHERE person_id = ?1
         ORDER BY solved_on ASC, problem_id ASC",
    )?;
    stmt.query_map([person_id], |row| {
        Ok(SolveRecord {
            person_id: row.get(0)?,
            problem_id: row.get(1)?,
            solved_on: row.get(2)?,
            points: row.get(3)?,
            recorded_at_us: row.get(4)?,
        })
    })?
    .collect()
}

/// Every ledger row of a person joined with its problem's tier.
///
/// This is the full input of the aggregate recomputation.
///
/// # Errors
///
/// Returns an error if the query fails or a stored tier is unrecognised.
pub fn dated_solves(conn: &Connection, person_id: i64) -> rusqlite::Result<Vec<DatedSolve>> {
    let mut stmt = conn.prepare(
        "SELECT r.solved_on, p.difficulty
         FROM solve_records r
         JOIN problems p ON p.problem_id = r.problem_id
         WHERE r.person_id = ?1
         ORDER BY r.solved_on ASC",
    )?;
    stmt.query_map([person_id], |row| {
        Ok(DatedSolve {
            solved_on: row.get(0)?,
            difficulty: row.get(1)?,
        })
    })?
    .collect()
}

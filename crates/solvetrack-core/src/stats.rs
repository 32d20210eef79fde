//! Aggregate recomputation.
//!
//! Stats are always derived from the whole ledger of a person; nothing is
//! patched incrementally.

use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::config::PointsTable;
use crate::ledger;
use crate::model::{DatedSolve, PersonStats};

/// Derive [`PersonStats`] from every solve of one person.
///
/// Input order and duplicate dates do not matter. `current_streak` is only
/// non-zero when the most recent solve date is `today`.
#[must_use]
pub fn compute_stats(solves: &[DatedSolve], today: NaiveDate, points: &PointsTable) -> PersonStats {
    if solves.is_empty() {
        return PersonStats::default();
    }

    let reward_points = solves
        .iter()
        .map(|solve| u64::from(points.points_for(solve.difficulty)))
        .sum();

    let mut dates: Vec<NaiveDate> = solves.iter().map(|solve| solve.solved_on).collect();
    dates.sort_unstable();
    dates.dedup();

    let mut run = 0_u32;
    let mut longest = 0_u32;
    let mut previous: Option<NaiveDate> = None;
    for &date in &dates {
        run = match previous {
            Some(prev) if (date - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    let current_streak = if previous == Some(today) { run } else { 0 };

    PersonStats {
        total_problems: u32::try_from(solves.len()).unwrap_or(u32::MAX),
        current_streak,
        longest_streak: longest,
        last_solve_date: previous,
        reward_points,
    }
}

/// Load a person's ledger and recompute their stats.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read.
pub fn recompute(
    conn: &Connection,
    person_id: i64,
    today: NaiveDate,
    points: &PointsTable,
) -> rusqlite::Result<PersonStats> {
    let solves = ledger::dated_solves(conn, person_id)?;
    Ok(compute_stats(&solves, today, points))
}

/// Write derived fields and stamp the refresh time.
///
/// Returns `false` if no such person exists.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn persist_stats(
    conn: &Connection,
    person_id: i64,
    stats: &PersonStats,
    refreshed_at_us: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE persons SET
             total_problems = ?1,
             current_streak = ?2,
             longest_streak = ?3,
             last_solve_date = ?4,
             reward_points = ?5,
             last_refreshed_at_us = ?6
         WHERE person_id = ?7",
        params![
            stats.total_problems,
            stats.current_streak,
            stats.longest_streak,
            stats.last_solve_date,
            i64::try_from(stats.reward_points).unwrap_or(i64::MAX),
            refreshed_at_us,
            person_id,
        ],
    )?;
    Ok(changed == 1)
}

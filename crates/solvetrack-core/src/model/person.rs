use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Difficulty;

/// Derived progress metrics for one person.
///
/// Always a pure function of that person's solve records; see
/// [`crate::stats::compute_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonStats {
    pub total_problems: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_solve_date: Option<NaiveDate>,
    pub reward_points: u64,
}

/// A tracked person with their cached aggregate fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: i64,
    pub display_name: String,
    /// Username on the external event source.
    pub handle: String,
    pub party_id: Option<i64>,
    #[serde(flatten)]
    pub stats: PersonStats,
    pub last_refreshed_at_us: Option<i64>,
    pub created_at_us: i64,
}

/// One credited `(person, problem)` solve in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRecord {
    pub person_id: i64,
    pub problem_id: i64,
    pub solved_on: NaiveDate,
    /// Points credited at ingestion time under the policy then in force.
    pub points: Option<u32>,
    pub recorded_at_us: i64,
}

/// A ledger row joined with the tier of its problem, as consumed by recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedSolve {
    pub solved_on: NaiveDate,
    pub difficulty: Difficulty,
}

/// A group of people competing toward a shared solve goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub party_id: i64,
    pub name: String,
    pub goal: u32,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub last_bulk_refresh_at_us: Option<i64>,
    pub created_at_us: i64,
}

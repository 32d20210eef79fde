//! Party progress projections built from ledger rows.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::query::PartySolve;
use crate::model::Party;

/// Label of the aggregate series in [`PartyProgress::lines`].
pub const TOTAL_SERIES: &str = "Total";

/// Solve count of one party member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberCount {
    pub person_id: i64,
    pub display_name: String,
    pub solves: u32,
}

/// One point of a cumulative series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub cumulative: u32,
}

/// Cumulative solve count over time for one member, or the whole party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSeries {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyProgress {
    pub goal: u32,
    pub done: u32,
    /// Members with at least one solve, most solves first.
    pub bars: Vec<MemberCount>,
    /// One series per member (same order as `bars`) followed by the total.
    pub lines: Vec<LineSeries>,
}

impl PartyProgress {
    /// Completion in percent, capped at 100. A zero goal counts as complete.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.goal == 0 {
            return 100;
        }
        let pct = u64::from(self.done) * 100 / u64::from(self.goal);
        u32::try_from(pct.min(100)).unwrap_or(100)
    }
}

/// Build the progress view of a party from its solves in the party window.
#[must_use]
pub fn party_progress(solves: &[PartySolve], goal: u32) -> PartyProgress {
    let mut per_member: BTreeMap<i64, (String, BTreeMap<NaiveDate, u32>)> = BTreeMap::new();
    let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for solve in solves {
        let (_, days) = per_member
            .entry(solve.person_id)
            .or_insert_with(|| (solve.display_name.clone(), BTreeMap::new()));
        *days.entry(solve.solved_on).or_default() += 1;
        *per_day.entry(solve.solved_on).or_default() += 1;
    }

    let mut bars: Vec<MemberCount> = per_member
        .iter()
        .map(|(&person_id, (display_name, days))| MemberCount {
            person_id,
            display_name: display_name.clone(),
            solves: days.values().sum(),
        })
        .collect();
    bars.sort_by(|a, b| {
        b.solves
            .cmp(&a.solves)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.person_id.cmp(&b.person_id))
    });

    let done = per_day.values().sum();

    let axis = match (per_day.keys().next(), per_day.keys().next_back()) {
        (Some(&first), Some(&last)) => day_range(first, last),
        _ => Vec::new(),
    };

    let mut lines: Vec<LineSeries> = bars
        .iter()
        .filter_map(|bar| {
            per_member
                .get(&bar.person_id)
                .map(|(name, days)| cumulative(name, days, &axis))
        })
        .collect();
    if !axis.is_empty() {
        lines.push(cumulative(TOTAL_SERIES, &per_day, &axis));
    }

    PartyProgress {
        goal,
        done,
        bars,
        lines,
    }
}

fn day_range(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        days.push(day);
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

fn cumulative(label: &str, counts: &BTreeMap<NaiveDate, u32>, axis: &[NaiveDate]) -> LineSeries {
    let mut running = 0;
    let points = axis
        .iter()
        .map(|&date| {
            running += counts.get(&date).copied().unwrap_or(0);
            SeriesPoint {
                date,
                cumulative: running,
            }
        })
        .collect();
    LineSeries {
        label: label.to_string(),
        points,
    }
}

/// Where a party stands relative to its date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartyStatus {
    Upcoming { days_until_start: i64 },
    InProgress { days_remaining: i64 },
    Completed { days_since_end: i64 },
}

impl std::fmt::Display for PartyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upcoming { days_until_start } => {
                write!(f, "upcoming, starts in {days_until_start} day(s)")
            }
            Self::InProgress { days_remaining } => {
                write!(f, "in progress, {days_remaining} day(s) left")
            }
            Self::Completed { days_since_end } => {
                write!(f, "completed {days_since_end} day(s) ago")
            }
        }
    }
}

/// Classify `party` as of `today`. Both window ends are inclusive.
#[must_use]
pub fn party_status(party: &Party, today: NaiveDate) -> PartyStatus {
    if today < party.starts_on {
        PartyStatus::Upcoming {
            days_until_start: (party.starts_on - today).num_days(),
        }
    } else if today <= party.ends_on {
        PartyStatus::InProgress {
            days_remaining: (party.ends_on - today).num_days(),
        }
    } else {
        PartyStatus::Completed {
            days_since_end: (today - party.ends_on).num_days(),
        }
    }
}

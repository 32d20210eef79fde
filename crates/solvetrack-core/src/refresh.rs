//! Unit-of-work coordinator.
//!
//! One [`Refresher::refresh`] call fetches a person's recent accepted events
//! and any missing problem metadata, then credits the new solves, recomputes
//! their stats and commits inside a single `BEGIN IMMEDIATE` transaction.
//! No network call happens while that write lock is held. Any failure rolls
//! back every write of that call. Bulk variants run one such unit per member
//! and keep the successes of the others when one member fails.

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{PointsTable, ProjectConfig};
use crate::db::query;
use crate::error::ErrorCode;
use crate::ledger;
use crate::model::{Person, PersonStats};
use crate::resolver;
use crate::source::{AcceptedEvent, DEFAULT_FETCH_LIMIT, EventSource, SourceError};
use crate::stats;

/// The stage of a refresh that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStep {
    Load,
    FetchEvents,
    ResolveMetadata,
    Begin,
    RecordSolve,
    Recompute,
    Persist,
    Commit,
}

impl RefreshStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::FetchEvents => "fetch_events",
            Self::ResolveMetadata => "resolve_metadata",
            Self::Begin => "begin",
            Self::RecordSolve => "record_solve",
            Self::Recompute => "recompute",
            Self::Persist => "persist",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for RefreshStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a refresh did not commit.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The event source failed while fetching events (subject is the handle)
    /// or metadata (subject is the slug).
    #[error("{step} failed for '{subject}': {source}")]
    Source {
        step: RefreshStep,
        subject: String,
        #[source]
        source: SourceError,
    },

    #[error("no metadata for problem '{slug}'")]
    MetadataUnavailable { slug: String },

    #[error("person {person_id} not found")]
    PersonNotFound { person_id: i64 },

    #[error("party {party_id} not found")]
    PartyNotFound { party_id: i64 },

    #[error("store error during {step}: {source}")]
    Storage {
        step: RefreshStep,
        #[source]
        source: rusqlite::Error,
    },
}

impl RefreshError {
    /// Adapter for `map_err` that tags a storage error with its step.
    pub fn storage(step: RefreshStep) -> impl Fn(rusqlite::Error) -> Self {
        move |source| Self::Storage { step, source }
    }

    #[must_use]
    pub const fn step(&self) -> RefreshStep {
        match self {
            Self::Source { step, .. } | Self::Storage { step, .. } => *step,
            Self::MetadataUnavailable { .. } => RefreshStep::ResolveMetadata,
            Self::PersonNotFound { .. } | Self::PartyNotFound { .. } => RefreshStep::Load,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Source { source, .. } => source.code(),
            Self::MetadataUnavailable { .. } => ErrorCode::MetadataUnavailable,
            Self::PersonNotFound { .. } => ErrorCode::PersonNotFound,
            Self::PartyNotFound { .. } => ErrorCode::PartyNotFound,
            Self::Storage {
                source: rusqlite::Error::SqliteFailure(err, _),
                ..
            } if matches!(err.code, rusqlite::ErrorCode::DatabaseBusy) => {
                ErrorCode::LockContention
            }
            Self::Storage { .. } => ErrorCode::StoreWriteFailed,
        }
    }
}

/// Outcome of one committed refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub person_id: i64,
    pub handle: String,
    /// Events returned by the source.
    pub observed: usize,
    /// Events skipped for a missing reference or timestamp.
    pub skipped: usize,
    /// Ledger rows inserted by this call; zero is a normal outcome.
    pub new_solves: u32,
    pub stats: PersonStats,
}

/// Result for one member of a bulk refresh.
#[derive(Debug)]
pub struct MemberOutcome {
    pub person_id: i64,
    pub handle: String,
    pub result: Result<RefreshSummary, RefreshError>,
}

/// Per-member outcomes of a bulk refresh, in member order.
#[derive(Debug, Default)]
pub struct BulkRefreshReport {
    pub outcomes: Vec<MemberOutcome>,
}

impl BulkRefreshReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Drives refreshes against one store connection.
pub struct Refresher<'c, S, C> {
    conn: &'c mut Connection,
    source: S,
    clock: C,
    points: PointsTable,
    fetch_limit: u32,
}

impl<'c, S: EventSource, C: Clock> Refresher<'c, S, C> {
    /// Refresher with the default points table and fetch limit.
    pub fn new(conn: &'c mut Connection, source: S, clock: C) -> Self {
        Self {
            conn,
            source,
            clock,
            points: PointsTable::default(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    /// Refresher using the points table and fetch limit of a project config.
    pub fn from_config(
        conn: &'c mut Connection,
        source: S,
        clock: C,
        config: &ProjectConfig,
    ) -> Self {
        Self::new(conn, source, clock)
            .with_points(config.points)
            .with_fetch_limit(config.source.fetch_limit)
    }

    #[must_use]
    pub const fn with_points(mut self, points: PointsTable) -> Self {
        self.points = points;
        self
    }

    #[must_use]
    pub const fn with_fetch_limit(mut self, fetch_limit: u32) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    #[must_use]
    pub const fn fetch_limit(&self) -> u32 {
        self.fetch_limit
    }

    /// Reconcile one person's recent accepted events into the store.
    ///
    /// The event list and metadata for uncached problems are fetched before
    /// the write transaction opens. On error nothing of this call persists.
    ///
    /// # Errors
    ///
    /// See [`RefreshError`]; [`RefreshError::step`] names the failed stage.
    pub fn refresh(
        &mut self,
        person_id: i64,
        handle: &str,
        limit: u32,
    ) -> Result<RefreshSummary, RefreshError> {
        if query::get_person(self.conn, person_id)
            .map_err(RefreshError::storage(RefreshStep::Load))?
            .is_none()
        {
            return Err(RefreshError::PersonNotFound { person_id });
        }

        let raw = self
            .source
            .fetch_recent_events(handle, limit)
            .map_err(|source| RefreshError::Source {
                step: RefreshStep::FetchEvents,
                subject: handle.to_string(),
                source,
            })?;
        let observed = raw.len();

        let mut events: Vec<AcceptedEvent> = Vec::with_capacity(observed);
        for event in &raw {
            match event.accept() {
                Some(accepted) => events.push(accepted),
                None => debug!(person_id, handle, ?event, "skipping malformed event"),
            }
        }
        let skipped = observed - events.len();
        // Oldest first, so a problem listed twice is credited on its earliest date.
        events.sort_by_key(|event| event.occurred_at);

        let prefetched = resolver::prefetch(
            self.conn,
            &self.source,
            events.iter().map(|event| event.problem_ref.as_str()),
        )?;

        let now = self.clock.now();
        let recorded_at_us = now.timestamp_micros();
        let today = now.date_naive();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RefreshError::storage(RefreshStep::Begin))?;

        let mut new_solves = 0_u32;
        for event in &events {
            let problem = resolver::resolve(&tx, &prefetched, &event.problem_ref)?;
            let inserted = ledger::record_solve(
                &tx,
                person_id,
                problem.problem_id,
                event.solved_on,
                Some(self.points.points_for(problem.difficulty)),
                recorded_at_us,
            )
            .map_err(RefreshError::storage(RefreshStep::RecordSolve))?;
            if inserted {
                new_solves += 1;
            }
        }

        let stats = stats::recompute(&tx, person_id, today, &self.points)
            .map_err(RefreshError::storage(RefreshStep::Recompute))?;
        let updated = stats::persist_stats(&tx, person_id, &stats, recorded_at_us)
            .map_err(RefreshError::storage(RefreshStep::Persist))?;
        if !updated {
            return Err(RefreshError::PersonNotFound { person_id });
        }

        tx.commit()
            .map_err(RefreshError::storage(RefreshStep::Commit))?;

        info!(
            person_id,
            handle,
            observed,
            skipped,
            fetched_meta = prefetched.len(),
            new_solves,
            total = stats.total_problems,
            current_streak = stats.current_streak,
            reward_points = stats.reward_points,
            "refresh committed"
        );

        Ok(RefreshSummary {
            person_id,
            handle: handle.to_string(),
            observed,
            skipped,
            new_solves,
            stats,
        })
    }

    /// Refresh a known person using their stored handle and the default limit.
    ///
    /// # Errors
    ///
    /// Same as [`Refresher::refresh`].
    pub fn refresh_person(&mut self, person_id: i64) -> Result<RefreshSummary, RefreshError> {
        let person = query::get_person(self.conn, person_id)
            .map_err(RefreshError::storage(RefreshStep::Load))?
            .ok_or(RefreshError::PersonNotFound { person_id })?;
        self.refresh(person.person_id, &person.handle, self.fetch_limit)
    }

    /// Refresh every member independently; one failure never undoes another
    /// member's committed refresh.
    pub fn bulk_refresh(&mut self, members: &[Person]) -> BulkRefreshReport {
        let mut report = BulkRefreshReport::default();
        for member in members {
            let result = self.refresh(member.person_id, &member.handle, self.fetch_limit);
            if let Err(err) = &result {
                warn!(
                    person_id = member.person_id,
                    handle = %member.handle,
                    step = %err.step(),
                    code = %err.code(),
                    error = %err,
                    "member refresh failed"
                );
            }
            report.outcomes.push(MemberOutcome {
                person_id: member.person_id,
                handle: member.handle.clone(),
                result,
            });
        }
        report
    }

    /// Bulk-refresh a party's members.
    ///
    /// The party's `last_bulk_refresh_at_us` is stamped only when every member
    /// succeeded; a party with no members counts as a success.
    ///
    /// # Errors
    ///
    /// Fails only when the party or its member list cannot be loaded, or the
    /// stamp cannot be written. Member failures are reported in the result.
    pub fn refresh_party(&mut self, party_id: i64) -> Result<BulkRefreshReport, RefreshError> {
        if query::get_party(self.conn, party_id)
            .map_err(RefreshError::storage(RefreshStep::Load))?
            .is_none()
        {
            return Err(RefreshError::PartyNotFound { party_id });
        }
        let members = query::party_members(self.conn, party_id)
            .map_err(RefreshError::storage(RefreshStep::Load))?;

        let report = self.bulk_refresh(&members);

        if report.all_succeeded() {
            let stamped_at_us = self.clock.now().timestamp_micros();
            self.conn
                .execute(
                    "UPDATE parties SET last_bulk_refresh_at_us = ?1 WHERE party_id = ?2",
                    rusqlite::params![stamped_at_us, party_id],
                )
                .map_err(RefreshError::storage(RefreshStep::Persist))?;
            info!(party_id, members = members.len(), "party refresh complete");
        } else {
            warn!(
                party_id,
                failed = report.failed(),
                succeeded = report.succeeded(),
                "party refresh incomplete; bulk refresh time not updated"
            );
        }
        Ok(report)
    }

    /// Bulk-refresh every person in the store.
    ///
    /// # Errors
    ///
    /// Fails only when the person list cannot be loaded.
    pub fn refresh_all(&mut self) -> Result<BulkRefreshReport, RefreshError> {
        let persons =
            query::list_persons(self.conn).map_err(RefreshError::storage(RefreshStep::Load))?;
        let report = self.bulk_refresh(&persons);
        info!(
            persons = persons.len(),
            failed = report.failed(),
            "refresh of all persons complete"
        );
        Ok(report)
    }
}

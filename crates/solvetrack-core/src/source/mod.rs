//! Event source boundary.
//!
//! An [`EventSource`] answers two read-only questions about the outside world:
//! which problems a handle recently got accepted, and what a problem slug
//! refers to. Implementations hold no state the engine relies on.

pub mod leetcode;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::ProblemMeta;

pub use leetcode::LeetCodeClient;

/// Number of recent events requested when the caller does not say.
pub const DEFAULT_FETCH_LIMIT: u32 = 20;

/// Failure talking to the event source. Never retried within one refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transport failure, timeout, or an upstream outage status.
    #[error("event source unavailable: {0}")]
    Unavailable(String),

    /// Malformed response or an application-level error payload.
    #[error("event source protocol error: {0}")]
    Protocol(String),
}

impl SourceError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable(_) => ErrorCode::SourceUnavailable,
            Self::Protocol(_) => ErrorCode::SourceProtocol,
        }
    }
}

/// One entry of a recent-activity list, as delivered.
///
/// Fields are optional because individual entries can be corrupt without the
/// whole response being invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub problem_ref: Option<String>,
    pub occurred_at: Option<i64>,
}

impl RawEvent {
    #[must_use]
    pub fn new(problem_ref: impl Into<String>, occurred_at: i64) -> Self {
        Self {
            problem_ref: Some(problem_ref.into()),
            occurred_at: Some(occurred_at),
        }
    }

    /// Validate into an [`AcceptedEvent`], or `None` when the entry is unusable.
    #[must_use]
    pub fn accept(&self) -> Option<AcceptedEvent> {
        let problem_ref = self.problem_ref.as_deref()?.trim();
        if problem_ref.is_empty() {
            return None;
        }
        let occurred_at = DateTime::from_timestamp(self.occurred_at?, 0)?;
        Some(AcceptedEvent {
            problem_ref: problem_ref.to_string(),
            occurred_at: occurred_at.timestamp(),
            solved_on: occurred_at.date_naive(),
        })
    }
}

/// A validated accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedEvent {
    /// Opaque problem reference (the upstream slug).
    pub problem_ref: String,
    /// Unix seconds.
    pub occurred_at: i64,
    /// UTC calendar date of `occurred_at`; the date a solve is credited to.
    pub solved_on: NaiveDate,
}

/// Read-only view of the third-party submission history.
pub trait EventSource {
    /// Recent accepted events for `handle`, most recent first, at most `limit`.
    ///
    /// # Errors
    ///
    /// [`SourceError::Unavailable`] on transport failure,
    /// [`SourceError::Protocol`] on a malformed or error response.
    fn fetch_recent_events(&self, handle: &str, limit: u32) -> Result<Vec<RawEvent>, SourceError>;

    /// Canonical metadata for a problem slug; `Ok(None)` if the source has
    /// no such problem.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`EventSource::fetch_recent_events`].
    fn fetch_problem_meta(&self, slug: &str) -> Result<Option<ProblemMeta>, SourceError>;
}

impl<S: EventSource + ?Sized> EventSource for &S {
    fn fetch_recent_events(&self, handle: &str, limit: u32) -> Result<Vec<RawEvent>, SourceError> {
        (**self).fetch_recent_events(handle, limit)
    }

    fn fetch_problem_meta(&self, slug: &str) -> Result<Option<ProblemMeta>, SourceError> {
        (**self).fetch_problem_meta(slug)
    }
}

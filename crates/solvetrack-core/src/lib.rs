//! solvetrack-core: reconciles third-party accepted-submission history into a
//! local `SQLite` store and derives per-person progress from it.
//!
//! # Conventions
//!
//! - **Errors**: engine operations return typed errors ([`refresh::RefreshError`],
//!   [`roster::RosterError`]); setup and configuration return `anyhow::Result`.
//! - **Logging**: `tracing` macros only; subscribers are installed by binaries.
//! - **Time**: dates are UTC calendar dates taken from an injected [`clock::Clock`].

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod model;
pub mod refresh;
pub mod report;
pub mod resolver;
pub mod roster;
pub mod source;
pub mod stats;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use refresh::{
    BulkRefreshReport, MemberOutcome, RefreshError, RefreshStep, RefreshSummary, Refresher,
};
pub use source::{EventSource, LeetCodeClient, RawEvent, SourceError};

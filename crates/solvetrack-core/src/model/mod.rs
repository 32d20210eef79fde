//! Typed rows for the tracker's entities.
//!
//! Every table the engine touches has a named-field struct here; nothing
//! downstream indexes rows by position or column name.

pub mod person;
pub mod problem;

pub use person::{DatedSolve, Party, Person, PersonStats, SolveRecord};
pub use problem::{Difficulty, ParseDifficultyError, Problem, ProblemMeta};

//! Scripted in-memory [`EventSource`] for exercising the engine offline.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::model::ProblemMeta;
use crate::source::{EventSource, RawEvent, SourceError};

/// An event source whose answers are set up front by the test.
///
/// Event lists can be replaced between calls through a shared reference, so a
/// test can keep the source while a [`crate::refresh::Refresher`] borrows it.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    events: RefCell<HashMap<String, Vec<RawEvent>>>,
    failing_handles: RefCell<HashSet<String>>,
    problems: HashMap<String, ProblemMeta>,
    failing_meta: HashSet<String>,
    event_calls: Cell<usize>,
    meta_calls: Cell<usize>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `events` (most recent first) for `handle`.
    #[must_use]
    pub fn with_events(self, handle: &str, events: Vec<RawEvent>) -> Self {
        self.set_events(handle, events);
        self
    }

    /// Make every event fetch for `handle` fail as unavailable.
    #[must_use]
    pub fn failing_events_for(self, handle: &str) -> Self {
        self.failing_handles.borrow_mut().insert(handle.to_string());
        self
    }

    #[must_use]
    pub fn with_problem(mut self, slug: &str, meta: ProblemMeta) -> Self {
        self.problems.insert(slug.to_string(), meta);
        self
    }

    /// Make metadata lookups for `slug` fail as unavailable.
    #[must_use]
    pub fn failing_meta_for(mut self, slug: &str) -> Self {
        self.failing_meta.insert(slug.to_string());
        self
    }

    pub fn set_events(&self, handle: &str, events: Vec<RawEvent>) {
        self.events.borrow_mut().insert(handle.to_string(), events);
    }

    pub fn recover(&self, handle: &str) {
        self.failing_handles.borrow_mut().remove(handle);
    }

    #[must_use]
    pub fn event_calls(&self) -> usize {
        self.event_calls.get()
    }

    #[must_use]
    pub fn meta_calls(&self) -> usize {
        self.meta_calls.get()
    }
}

impl EventSource for ScriptedSource {
    fn fetch_recent_events(&self, handle: &str, limit: u32) -> Result<Vec<RawEvent>, SourceError> {
        self.event_calls.set(self.event_calls.get() + 1);
        if self.failing_handles.borrow().contains(handle) {
            return Err(SourceError::Unavailable(format!("scripted outage for {handle}")));
        }
        let mut events = self.events.borrow().get(handle).cloned().unwrap_or_default();
        events.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(events)
    }

    fn fetch_problem_meta(&self, slug: &str) -> Result<Option<ProblemMeta>, SourceError> {
        self.meta_calls.set(self.meta_calls.get() + 1);
        if self.failing_meta.contains(slug) {
            return Err(SourceError::Unavailable(format!("scripted outage for {slug}")));
        }
        Ok(self.problems.get(slug).cloned())
    }
}

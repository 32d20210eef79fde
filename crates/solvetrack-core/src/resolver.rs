//! Cache of problem metadata, filled in two phases.
//!
//! [`prefetch`] runs before the write transaction: it consults the `problems`
//! table and asks the event source only for the misses. [`resolve`] runs
//! inside the transaction and never touches the network; it returns the
//! cached row or upserts the prefetched answer keyed by slug.

use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::model::{Problem, ProblemMeta};
use crate::refresh::{RefreshError, RefreshStep};
use crate::source::EventSource;

/// Metadata fetched for slugs the cache did not have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefetched {
    fetched: HashMap<String, ProblemMeta>,
}

impl Prefetched {
    /// Number of slugs fetched from the source.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fetched.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fetched.is_empty()
    }

    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&ProblemMeta> {
        self.fetched.get(slug)
    }
}

/// Fetch metadata for every slug missing from the cache.
///
/// Each distinct slug is looked up once. Call this outside any write
/// transaction: the source calls may block up to the client timeout.
///
/// # Errors
///
/// - [`RefreshError::MetadataUnavailable`] if the source does not know a slug
/// - [`RefreshError::Source`] if the source could not be queried
/// - [`RefreshError::Storage`] on database failure
pub fn prefetch<'a>(
    conn: &Connection,
    source: &dyn EventSource,
    slugs: impl IntoIterator<Item = &'a str>,
) -> Result<Prefetched, RefreshError> {
    let mut prefetched = Prefetched::default();
    for slug in slugs.into_iter().collect::<BTreeSet<_>>() {
        if let Some(problem) =
            find_by_slug(conn, slug).map_err(RefreshError::storage(RefreshStep::ResolveMetadata))?
        {
            debug!(slug, problem_id = problem.problem_id, "problem metadata cache hit");
            continue;
        }

        let meta = source
            .fetch_problem_meta(slug)
            .map_err(|source| RefreshError::Source {
                step: RefreshStep::ResolveMetadata,
                subject: slug.to_string(),
                source,
            })?
            .ok_or_else(|| RefreshError::MetadataUnavailable {
                slug: slug.to_string(),
            })?;

        debug!(slug, problem_id = meta.external_id, "problem metadata cache miss");
        prefetched.fetched.insert(slug.to_string(), meta);
    }
    Ok(prefetched)
}

/// Resolve `slug` to its stored [`Problem`] inside the caller's unit of work.
///
/// A cached row wins; otherwise the prefetched metadata is upserted as part
/// of that transaction.
///
/// # Errors
///
/// - [`RefreshError::MetadataUnavailable`] if the slug is neither cached nor
///   prefetched
/// - [`RefreshError::Storage`] on database failure
pub fn resolve(
    conn: &Connection,
    prefetched: &Prefetched,
    slug: &str,
) -> Result<Problem, RefreshError> {
    let storage = RefreshError::storage(RefreshStep::ResolveMetadata);
    if let Some(problem) = find_by_slug(conn, slug).map_err(&storage)? {
        return Ok(problem);
    }
    let meta = prefetched
        .get(slug)
        .ok_or_else(|| RefreshError::MetadataUnavailable {
            slug: slug.to_string(),
        })?;
    upsert_problem(conn, slug, meta).map_err(storage)
}

/// Look up a cached problem by slug.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_by_slug(conn: &Connection, slug: &str) -> rusqlite::Result<Option<Problem>> {
    conn.query_row(
        "SELECT problem_id, slug, title, difficulty FROM problems WHERE slug = ?1",
        [slug],
        problem_from_row,
    )
    .optional()
}

/// Insert or correct a problem row and return what is stored.
///
/// Keyed by slug: a second writer for the same slug updates title and
/// difficulty instead of conflicting. A known id arriving under a new slug
/// (upstream renamed it) moves the row to the new slug.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn upsert_problem(conn: &Connection, slug: &str, meta: &ProblemMeta) -> rusqlite::Result<Problem> {
    conn.execute(
        "INSERT INTO problems (problem_id, slug, title, difficulty)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (slug) DO UPDATE SET
             title = excluded.title,
             difficulty = excluded.difficulty
         ON CONFLICT (problem_id) DO UPDATE SET
             slug = excluded.slug,
             title = excluded.title,
             difficulty = excluded.difficulty",
        params![meta.external_id, slug, meta.title, meta.difficulty],
    )?;

    conn.query_row(
        "SELECT problem_id, slug, title, difficulty FROM problems WHERE slug = ?1",
        [slug],
        problem_from_row,
    )
}

pub(crate) fn problem_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Problem> {
    Ok(Problem {
        problem_id: row.get("problem_id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
        difficulty: row.get("difficulty")?,
    })
}

//! Blocking GraphQL client for LeetCode's public endpoint.
//!
//! Response handling is split from I/O: [`parse_envelope`],
//! [`parse_recent_submissions`] and [`parse_question`] take decoded JSON and
//! are exercised directly by tests.

use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::{EventSource, RawEvent, SourceError};
use crate::config::SourceConfig;
use crate::model::{Difficulty, ProblemMeta};

const RECENT_AC_QUERY: &str = "query recentAcSubmissions($username: String!, $limit: Int!) {
  recentAcSubmissionList(username: $username, limit: $limit) {
    id
    title
    titleSlug
    timestamp
  }
}";

const QUESTION_QUERY: &str = "query questionData($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    questionFrontendId
    title
    difficulty
  }
}";

/// LeetCode-backed [`EventSource`].
pub struct LeetCodeClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl std::fmt::Debug for LeetCodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeetCodeClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl LeetCodeClient {
    /// Client for `endpoint` whose every request is bounded by `timeout`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("solvetrack/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.endpoint.clone(), config.timeout())
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn graphql(&self, query: &str, variables: Value) -> Result<Value, SourceError> {
        let payload = json!({ "query": query, "variables": variables });

        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .set("Referer", "https://leetcode.com")
            .send_json(payload)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(status_error(status, &body));
            }
            Err(transport) => {
                return Err(SourceError::Unavailable(format!(
                    "request to {} failed: {transport}",
                    self.endpoint
                )));
            }
        };

        let body: Value = response.into_json().map_err(|err| {
            if err.kind() == std::io::ErrorKind::TimedOut {
                SourceError::Unavailable(format!("timed out reading response: {err}"))
            } else {
                SourceError::Protocol(format!("response is not valid JSON: {err}"))
            }
        })?;

        parse_envelope(body)
    }
}

impl EventSource for LeetCodeClient {
    fn fetch_recent_events(&self, handle: &str, limit: u32) -> Result<Vec<RawEvent>, SourceError> {
        let data = self.graphql(
            RECENT_AC_QUERY,
            json!({ "username": handle, "limit": limit }),
        )?;
        let mut events = parse_recent_submissions(&data)?;
        events.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        debug!(handle, count = events.len(), "fetched recent accepted submissions");
        Ok(events)
    }

    fn fetch_problem_meta(&self, slug: &str) -> Result<Option<ProblemMeta>, SourceError> {
        let data = self.graphql(QUESTION_QUERY, json!({ "titleSlug": slug }))?;
        parse_question(&data)
    }
}

/// Classify a non-2xx HTTP status.
///
/// Throttling and server-side failures mean "try again later"; anything else
/// means the request or endpoint is wrong.
fn status_error(status: u16, body: &str) -> SourceError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("endpoint returned HTTP {status}: {snippet}");
    if status == 429 || status >= 500 {
        SourceError::Unavailable(message)
    } else {
        SourceError::Protocol(message)
    }
}

/// Unwrap a GraphQL response into its `data` object.
///
/// # Errors
///
/// [`SourceError::Protocol`] if the response carries a non-empty `errors`
/// array or has no `data` object.
pub fn parse_envelope(body: Value) -> Result<Value, SourceError> {
    if let Some(errors) = body.get("errors") {
        let has_errors = match errors {
            Value::Null => false,
            Value::Array(list) => !list.is_empty(),
            _ => true,
        };
        if has_errors {
            return Err(SourceError::Protocol(format!("GraphQL error: {errors}")));
        }
    }

    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(SourceError::Protocol("response has no data object".to_string())),
        },
        _ => Err(SourceError::Protocol("response is not a JSON object".to_string())),
    }
}

/// Extract `recentAcSubmissionList` entries.
///
/// A `null` or absent list is an empty history. Entries missing a slug or a
/// usable timestamp are kept with empty fields so the caller can skip them.
///
/// # Errors
///
/// [`SourceError::Protocol`] if the list is present but not an array.
pub fn parse_recent_submissions(data: &Value) -> Result<Vec<RawEvent>, SourceError> {
    let list = match data.get("recentAcSubmissionList") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(list)) => list,
        Some(other) => {
            return Err(SourceError::Protocol(format!(
                "recentAcSubmissionList is not a list: {other}"
            )));
        }
    };

    Ok(list
        .iter()
        .map(|entry| RawEvent {
            problem_ref: entry
                .get("titleSlug")
                .and_then(Value::as_str)
                .map(str::to_string),
            occurred_at: entry.get("timestamp").and_then(integer_field),
        })
        .collect())
}

/// Extract `question` metadata; `Ok(None)` when upstream has no such problem.
///
/// # Errors
///
/// [`SourceError::Protocol`] if the question is present but its id, title or
/// difficulty is missing or unrecognised.
pub fn parse_question(data: &Value) -> Result<Option<ProblemMeta>, SourceError> {
    let question = match data.get("question") {
        None | Some(Value::Null) => return Ok(None),
        Some(question) => question,
    };

    let external_id = question
        .get("questionFrontendId")
        .and_then(integer_field)
        .ok_or_else(|| {
            SourceError::Protocol(format!("question has no numeric id: {question}"))
        })?;

    let title = question
        .get("title")
        .and_then(Value::as_str)
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| SourceError::Protocol(format!("question has no title: {question}")))?
        .to_string();

    let difficulty = question
        .get("difficulty")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Protocol(format!("question has no difficulty: {question}")))?
        .parse::<Difficulty>()
        .map_err(|err| SourceError::Protocol(err.to_string()))?;

    Ok(Some(ProblemMeta {
        external_id,
        title,
        difficulty,
    }))
}

/// Upstream encodes integers as JSON strings in some fields and numbers in
/// others.
fn integer_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_returns_data_object() {
        let body = json!({ "data": { "question": null } });
        let data = parse_envelope(body).expect("valid envelope");
        assert!(data.get("question").is_some());
    }

    #[test]
    fn envelope_with_errors_is_protocol_error() {
        let body = json!({
            "data": null,
            "errors": [{ "message": "That user does not exist." }]
        });
        let err = parse_envelope(body).expect_err("errors must fail");
        assert!(matches!(err, SourceError::Protocol(ref msg) if msg.contains("does not exist")));
    }

    #[test]
    fn envelope_with_empty_errors_is_accepted() {
        let body = json!({ "data": { "recentAcSubmissionList": [] }, "errors": [] });
        assert!(parse_envelope(body).is_ok());
    }

    #[test]
    fn envelope_without_data_is_protocol_error() {
        assert!(matches!(
            parse_envelope(json!({ "message": "hi" })),
            Err(SourceError::Protocol(_))
        ));
        assert!(matches!(
            parse_envelope(json!(["not", "an", "object"])),
            Err(SourceError::Protocol(_))
        ));
    }

    #[test]
    fn recent_submissions_accept_string_and_numeric_timestamps() {
        let data = json!({
            "recentAcSubmissionList": [
                { "id": "1", "title": "Two Sum", "titleSlug": "two-sum", "timestamp": "1704456000" },
                { "id": "2", "title": "Valid Anagram", "titleSlug": "valid-anagram", "timestamp": 1704369600 }
            ]
        });
        let events = parse_recent_submissions(&data).expect("parse");
        assert_eq!(
            events,
            vec![
                RawEvent::new("two-sum", 1_704_456_000),
                RawEvent::new("valid-anagram", 1_704_369_600),
            ]
        );
    }

    #[test]
    fn recent_submissions_keep_malformed_entries_for_skipping() {
        let data = json!({
            "recentAcSubmissionList": [
                { "titleSlug": "two-sum" },
                { "timestamp": "1704456000" },
                { "titleSlug": "lru-cache", "timestamp": "yesterday" },
                "garbage"
            ]
        });
        let events = parse_recent_submissions(&data).expect("parse");
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|event| event.accept().is_none()));
    }

    #[test]
    fn null_submission_list_is_empty_history() {
        let data = json!({ "recentAcSubmissionList": null });
        assert!(parse_recent_submissions(&data).expect("parse").is_empty());
    }

    #[test]
    fn non_list_submissions_is_protocol_error() {
        let data = json!({ "recentAcSubmissionList": { "oops": true } });
        assert!(matches!(
            parse_recent_submissions(&data),
            Err(SourceError::Protocol(_))
        ));
    }

    #[test]
    fn question_is_normalized() {
        let data = json!({
            "question": { "questionFrontendId": "146", "title": "LRU Cache", "difficulty": "Medium" }
        });
        let meta = parse_question(&data).expect("parse").expect("present");
        assert_eq!(
            meta,
            ProblemMeta {
                external_id: 146,
                title: "LRU Cache".to_string(),
                difficulty: Difficulty::Medium,
            }
        );
    }

    #[test]
    fn missing_question_is_none() {
        assert_eq!(parse_question(&json!({ "question": null })).expect("parse"), None);
        assert_eq!(parse_question(&json!({})).expect("parse"), None);
    }

    #[test]
    fn question_with_unknown_difficulty_is_protocol_error() {
        let data = json!({
            "question": { "questionFrontendId": "1", "title": "Two Sum", "difficulty": "Trivial" }
        });
        assert!(matches!(parse_question(&data), Err(SourceError::Protocol(_))));
    }

    #[test]
    fn question_with_non_numeric_id_is_protocol_error() {
        let data = json!({
            "question": { "questionFrontendId": "LCP 01", "title": "Guess", "difficulty": "Easy" }
        });
        assert!(matches!(parse_question(&data), Err(SourceError::Protocol(_))));
    }

    #[test]
    fn throttling_and_server_errors_are_unavailable() {
        assert!(matches!(status_error(429, ""), SourceError::Unavailable(_)));
        assert!(matches!(status_error(503, "down"), SourceError::Unavailable(_)));
        assert!(matches!(status_error(400, "bad"), SourceError::Protocol(_)));
        assert!(matches!(status_error(403, "nope"), SourceError::Protocol(_)));
    }

    #[test]
    fn unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) is closed on loopback in test environments.
        let client = LeetCodeClient::new("http://127.0.0.1:9/graphql", Duration::from_secs(2));
        let err = client
            .fetch_recent_events("nobody", 5)
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, SourceError::Unavailable(_)), "got {err:?}");
    }

    #[test]
    fn silent_endpoint_times_out_as_unavailable() {
        use std::io::Read;
        use std::net::TcpListener;
        use std::time::Instant;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        // Accept the connection and read until the client gives up; never reply.
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut sink = Vec::new();
                let _ = stream.read_to_end(&mut sink);
            }
        });

        let client = LeetCodeClient::new(format!("http://{addr}/graphql"), Duration::from_secs(1));
        let started = Instant::now();
        let err = client
            .fetch_problem_meta("two-sum")
            .expect_err("no response within the timeout");

        assert!(matches!(err, SourceError::Unavailable(_)), "got {err:?}");
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "request outlived its timeout: {:?}",
            started.elapsed()
        );
    }
}

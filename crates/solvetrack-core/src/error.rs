use std::fmt;

/// Machine-readable error codes for scripted callers and log scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    PersonNotFound,
    PartyNotFound,
    InvalidRoster,
    SourceUnavailable,
    SourceProtocol,
    MetadataUnavailable,
    StoreWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::PersonNotFound => "E2001",
            Self::PartyNotFound => "E2002",
            Self::InvalidRoster => "E2003",
            Self::SourceUnavailable => "E3001",
            Self::SourceProtocol => "E3002",
            Self::MetadataUnavailable => "E3003",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Tracker not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::PersonNotFound => "Person not found",
            Self::PartyNotFound => "Party not found",
            Self::InvalidRoster => "Invalid person or party data",
            Self::SourceUnavailable => "Event source unavailable",
            Self::SourceProtocol => "Event source returned an invalid response",
            Self::MetadataUnavailable => "Problem metadata unavailable",
            Self::StoreWriteFailed => "Store write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `st init` to create the tracker database."),
            Self::ConfigParseError => Some("Fix syntax in .solvetrack/config.toml and retry."),
            Self::PersonNotFound | Self::PartyNotFound => None,
            Self::InvalidRoster => {
                Some("Names and handles must be non-empty; parties must end after they start.")
            }
            Self::SourceUnavailable => {
                Some("Check network access to the configured endpoint and retry later.")
            }
            Self::SourceProtocol => Some("Verify the handle exists and the endpoint speaks GraphQL."),
            Self::MetadataUnavailable => {
                Some("The problem may have been removed upstream; retry once it resolves.")
            }
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other refresh releases the database."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// An [`ErrorCode`] attached to a message, for failures raised outside the
/// typed engine errors (missing store, unknown ids on read paths).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
}

impl CodedError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CodedError, ErrorCode};
    use std::collections::HashSet;

    const ALL: [ErrorCode; 11] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::PersonNotFound,
        ErrorCode::PartyNotFound,
        ErrorCode::InvalidRoster,
        ErrorCode::SourceUnavailable,
        ErrorCode::SourceProtocol,
        ErrorCode::MetadataUnavailable,
        ErrorCode::StoreWriteFailed,
        ErrorCode::LockContention,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let raw = code.code();
            assert_eq!(raw.len(), 5);
            assert!(raw.starts_with('E'));
            assert!(raw.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::MetadataUnavailable.to_string(), "E3003");
    }

    #[test]
    fn coded_error_displays_message_only() {
        let err = CodedError::new(ErrorCode::NotInitialized, "no store at .solvetrack/solvetrack.db");
        assert_eq!(err.to_string(), "no store at .solvetrack/solvetrack.db");
        assert_eq!(err.code, ErrorCode::NotInitialized);
    }
}

use std::fmt;

/// Machine-readable error codes for scripted callers and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidUtcOffset,
    EmptyTitle,
    InvalidDate,
    InvalidTime,
    InvalidTransition,
    TicketNotFound,
    RemoteFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidUtcOffset => "E1002",
            Self::EmptyTitle => "E2001",
            Self::InvalidDate => "E2002",
            Self::InvalidTime => "E2003",
            Self::InvalidTransition => "E2004",
            Self::TicketNotFound => "E3001",
            Self::RemoteFailure => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidUtcOffset => "Invalid UTC offset",
            Self::EmptyTitle => "Title is required",
            Self::InvalidDate => "Invalid date",
            Self::InvalidTime => "Invalid time",
            Self::InvalidTransition => "Action not allowed right now",
            Self::TicketNotFound => "Ticket not found",
            Self::RemoteFailure => "Remote call failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users and scripts.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the encore config.toml and retry."),
            Self::InvalidUtcOffset => Some("Use an offset like \"+09:00\" or \"-05:30\"."),
            Self::EmptyTitle => Some("Enter a title before saving."),
            Self::InvalidDate => Some("Use the YYYY-MM-DD format."),
            Self::InvalidTime => Some("Use the HH:MM 24-hour format."),
            Self::InvalidTransition => None,
            Self::TicketNotFound => Some("Check the ticket id; it may have been deleted."),
            Self::RemoteFailure => Some("Your input was kept. Retry in a moment."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Local input problems. These block a commit and never reach a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}': expected HH:MM")]
    InvalidTime(String),
}

/// Error taxonomy for engine operations.
///
/// Lookups that find nothing (ordinals, liked users without ids) resolve to
/// `None`/empty values and are not represented here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The collaborator answered `success: false`, returned no data where data
    /// was required, or the call itself failed.
    #[error("{operation} failed: {message}")]
    Remote {
        operation: &'static str,
        message: String,
    },

    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

impl CoreError {
    pub(crate) fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            message: message.into(),
        }
    }

    /// Stable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(ValidationError::EmptyTitle) => ErrorCode::EmptyTitle,
            Self::Validation(ValidationError::InvalidDate(_)) => ErrorCode::InvalidDate,
            Self::Validation(ValidationError::InvalidTime(_)) => ErrorCode::InvalidTime,
            Self::Remote { .. } => ErrorCode::RemoteFailure,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
        }
    }

    /// Whether the failed action can be retried with the same input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

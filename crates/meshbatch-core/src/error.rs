//! Error taxonomy crossing the core's boundary (spec §7).
//!
//! Unlike the open `Application(E)` escape hatch a generic middleware composition type would
//! need, this taxonomy is closed: every failure a caller can observe from meshbatch is one of
//! these variants, each carrying a stable code, a user-safe message, a severity, and an
//! optional context bag.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// How serious a [`MeshError`] is, independent of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Informational; no caller action required.
    Info,
    /// Recoverable; the operation may still have made partial progress.
    Warning,
    /// The operation failed outright.
    Error,
}

/// Free-form key/value context attached to an error for diagnostics.
pub type ErrorContext = BTreeMap<String, String>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted field path, e.g. `"batch[3].amount"`.
    pub field: String,
    /// User-safe explanation.
    pub message: String,
}

/// A parse failure location in query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpan {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// The offending source snippet.
    pub snippet: String,
}

/// Stable, machine-readable error codes (spec §7).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthDeclined,
    AuthExpired,
    ConnectionThrottled,
    ConnectionTransient,
    ConnectionFatal,
    ValidationInvalidValue,
    OperationNotFound,
    QueryParseFailed,
    QueryAggregateLimitExceeded,
    QueryUnsupportedFeature,
}

impl ErrorCode {
    /// The stable dotted code string (e.g. `"Connection.Throttled"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthDeclined => "Auth.Declined",
            ErrorCode::AuthExpired => "Auth.Expired",
            ErrorCode::ConnectionThrottled => "Connection.Throttled",
            ErrorCode::ConnectionTransient => "Connection.Transient",
            ErrorCode::ConnectionFatal => "Connection.Fatal",
            ErrorCode::ValidationInvalidValue => "Validation.InvalidValue",
            ErrorCode::OperationNotFound => "Operation.NotFound",
            ErrorCode::QueryParseFailed => "Query.ParseFailed",
            ErrorCode::QueryAggregateLimitExceeded => "Query.AggregateLimitExceeded",
            ErrorCode::QueryUnsupportedFeature => "Query.UnsupportedFeature",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified error type surfaced at the core's boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    /// Re-authentication is required; the affected identity should be invalidated.
    #[error("authentication expired (requires re-auth)")]
    AuthExpired {
        /// Identity that needs re-authentication.
        identity: String,
    },

    /// The user declined an interactive authentication prompt.
    #[error("authentication declined by user")]
    AuthDeclined {
        /// Identity the prompt was for.
        identity: String,
    },

    /// The backend rejected the call due to rate limiting.
    #[error("throttled, retry after {retry_after:?}")]
    Throttled {
        /// How long the caller must wait before retrying.
        retry_after: Duration,
    },

    /// A transient backend failure; safe to retry.
    #[error("transient backend error: {message}")]
    Transient {
        /// User-safe message.
        message: String,
    },

    /// A non-retryable backend failure.
    #[error("fatal backend error: {message}")]
    Fatal {
        /// User-safe message.
        message: String,
    },

    /// One or more fields failed validation.
    #[error("validation failed: {} field(s)", fields.len())]
    Validation {
        /// The offending fields.
        fields: Vec<FieldError>,
    },

    /// A referenced resource does not exist.
    #[error("{resource_type} '{id}' not found")]
    NotFound {
        /// Kind of resource, e.g. `"account"`.
        resource_type: String,
        /// Resource identifier.
        id: String,
    },

    /// The query text failed to parse. The parser itself is out of scope (§1); this variant
    /// carries whatever the caller's parser reported.
    #[error("query parse failed at {}:{}", span.line, span.column)]
    QueryParseFailed {
        /// Location of the failure.
        span: QuerySpan,
    },

    /// The backend's aggregate-query record-limit ceiling was tripped (spec §6, §8 scenario 6).
    #[error("aggregate query exceeded the backend's record limit")]
    AggregateLimitExceeded {
        /// The limit the backend enforces, when known.
        limit: Option<u64>,
    },

    /// The planner or engine does not support a requested combination, e.g.
    /// `COUNT(DISTINCT)` under `ParallelPartition`.
    #[error("unsupported query feature: {feature}")]
    UnsupportedFeature {
        /// Human-readable description of what wasn't supported.
        feature: String,
    },
}

impl MeshError {
    /// The stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::AuthExpired { .. } => ErrorCode::AuthExpired,
            MeshError::AuthDeclined { .. } => ErrorCode::AuthDeclined,
            MeshError::Throttled { .. } => ErrorCode::ConnectionThrottled,
            MeshError::Transient { .. } => ErrorCode::ConnectionTransient,
            MeshError::Fatal { .. } => ErrorCode::ConnectionFatal,
            MeshError::Validation { .. } => ErrorCode::ValidationInvalidValue,
            MeshError::NotFound { .. } => ErrorCode::OperationNotFound,
            MeshError::QueryParseFailed { .. } => ErrorCode::QueryParseFailed,
            MeshError::AggregateLimitExceeded { .. } => ErrorCode::QueryAggregateLimitExceeded,
            MeshError::UnsupportedFeature { .. } => ErrorCode::QueryUnsupportedFeature,
        }
    }

    /// Severity bucket for this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MeshError::AuthDeclined { .. } => ErrorSeverity::Info,
            MeshError::Throttled { .. } | MeshError::Transient { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// True if this error requires the caller to re-authenticate before retrying.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, MeshError::AuthExpired { .. })
    }

    /// A user-safe message, free of stack traces or backend-internal identifiers.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Retry-after duration, if this is a throttle.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MeshError::Throttled { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// True if a local bounded retry is appropriate (spec §7 propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, MeshError::Throttled { .. } | MeshError::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec_strings() {
        assert_eq!(ErrorCode::AuthDeclined.as_str(), "Auth.Declined");
        assert_eq!(ErrorCode::AuthExpired.as_str(), "Auth.Expired");
        assert_eq!(
            ErrorCode::ConnectionThrottled.as_str(),
            "Connection.Throttled"
        );
        assert_eq!(
            ErrorCode::QueryAggregateLimitExceeded.as_str(),
            "Query.AggregateLimitExceeded"
        );
    }

    #[test]
    fn throttled_is_retryable_and_carries_retry_after() {
        let err = MeshError::Throttled {
            retry_after: Duration::from_secs(30),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn auth_expired_requires_reauth() {
        let err = MeshError::AuthExpired {
            identity: "svc-1".to_string(),
        };
        assert!(err.requires_reauth());
        assert_eq!(err.code(), ErrorCode::AuthExpired);
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        let err = MeshError::Fatal {
            message: "boom".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn user_message_has_no_internal_identifiers() {
        let err = MeshError::NotFound {
            resource_type: "account".to_string(),
            id: "abc-123".to_string(),
        };
        let msg = err.user_message();
        assert!(msg.contains("account"));
        assert!(!msg.contains("0x"));
    }
}

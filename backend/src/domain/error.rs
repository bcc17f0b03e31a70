//! Domain-level error type.
//!
//! Transport agnostic: the HTTP adapter maps [`ErrorCode`] to status codes and
//! wraps the error in the response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TraceId;

/// Stable machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A field is missing, oversized, or malformed.
    InvalidRequest,
    /// The write would break the record identity uniqueness rule.
    Duplicate,
    /// The referenced record or identnr does not exist.
    NotFound,
    /// The operation conflicts with existing data.
    Conflict,
    /// The store did not answer in time.
    Timeout,
    /// The store is unreachable.
    ServiceUnavailable,
    /// Anything unexpected.
    InternalError,
}

/// Domain error payload.
///
/// `errors` carries one human-readable line per failed field for validation
/// failures; `details` carries structured context such as the progress of a
/// partially applied reconciliation.
///
/// # Examples
/// ```
/// use merkmal_backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("record 7 not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.message(), "record 7 not found");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
    errors: Vec<String>,
    details: Option<Value>,
    progress: bool,
    trace_id: Option<String>,
}

impl Error {
    /// Create an error, capturing the trace identifier in scope.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            errors: Vec::new(),
            details: None,
            progress: false,
            trace_id: TraceId::current().map(|id| id.to_string()),
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable summary.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Per-field messages, empty unless validation failed.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Structured context for the failure.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Whether `details` only records the progress of a partially applied
    /// operation. Such details are shown to clients even for internal errors.
    #[must_use]
    pub fn details_are_progress(&self) -> bool {
        self.progress
    }

    /// Correlation identifier of the failing request.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Attach per-field messages.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self.progress = false;
        self
    }

    /// Attach the progress of a partially applied operation as details.
    #[must_use]
    pub fn with_progress(mut self, progress: Value) -> Self {
        self.details = Some(progress);
        self.progress = true;
        self
    }

    /// Override the trace identifier.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Duplicate`].
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Duplicate, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

//! OpenAPI schema definitions for types owned outside the HTTP adapter.
//!
//! Domain and pagination types stay framework-agnostic by not deriving
//! `ToSchema`. The wrappers here mirror their serialised shape so utoipa can
//! document them.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = ErrorCode)]
pub enum ErrorCodeSchema {
    /// A field is missing, oversized, or malformed.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The write would duplicate an existing record identity.
    #[schema(rename = "duplicate")]
    Duplicate,
    /// The record or identnr does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The operation conflicts with existing data.
    #[schema(rename = "conflict")]
    Conflict,
    /// The record store did not answer in time.
    #[schema(rename = "timeout")]
    Timeout,
    /// The record store is unreachable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// Failure envelope returned by every endpoint.
#[derive(ToSchema)]
#[schema(as = ErrorResponse)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Always `false`.
    success: bool,
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable summary.
    #[schema(example = "Validierung fehlgeschlagen")]
    message: String,
    /// One line per failed field, present for validation failures.
    errors: Option<Vec<String>>,
    /// Structured context, e.g. reconciliation progress.
    details: Option<serde_json::Value>,
    /// Correlation identifier matching the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// RFC 3339 time the response was produced.
    #[schema(format = "date-time")]
    timestamp: String,
}

/// OpenAPI schema for [`pagination::PaginationMeta`].
#[derive(ToSchema)]
#[schema(as = PaginationMeta)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct PaginationSchema {
    /// One-based page served.
    current_page: u32,
    /// Pages available.
    total_pages: u64,
    /// Matching records across all pages.
    total_count: u64,
    /// Page size applied.
    page_size: u32,
    /// Whether a following page exists.
    has_next_page: bool,
    /// Whether a preceding page exists.
    has_previous_page: bool,
}

//! Domain primitives, use cases and ports.
//!
//! Purpose: hold the record model, the group derivation and reconciliation
//! rules, and the services the HTTP adapter calls. Nothing here knows about
//! HTTP or SQL; storage is reached through [`ports`].
//!
//! Public surface:
//! - [`Error`] / [`ErrorCode`]: failure taxonomy shared by every layer.
//! - [`AttributeRecord`], [`RecordDraft`], [`Identnr`]: the record model.
//! - [`RecordService`], [`GroupService`], [`IdentifierService`]: use cases.
//! - [`ConnectionHealthMonitor`]: store reachability flag.

mod connection_health;
pub mod error;
mod group_service;
pub mod grouping;
mod identifier_service;
pub mod ports;
mod reconcile;
mod record;
mod record_service;
pub mod trace_id;

pub use self::connection_health::ConnectionHealthMonitor;
pub use self::error::{Error, ErrorCode};
pub use self::group_service::{
    BulkDeleteOutcome, GroupService, GroupTemplate, ReconcileOutcome, ReconcileRequest,
    TemplateCopyOutcome,
};
pub use self::grouping::{GroupKey, RecordGroup};
pub use self::identifier_service::{
    CloneOutcome, IdentifierService, IdentifierStats, MultiRecordIdentnr, MultiRecordReport,
    PLACEHOLDER_DRUCKTEXT, PLACEHOLDER_TEXT, RecordCopyOutcome, Registration,
};
pub use self::reconcile::MembershipDiff;
pub use self::record::{
    AUSPRAEGUNG_MAX_LEN, AttributeFields, AttributeRecord, DRUCKTEXT_MAX_LEN, FieldError,
    IDENTNR_MAX_LEN, Identnr, MERKMAL_MAX_LEN, NewRecord, RecordDraft, RecordId,
    SONDER_ABT_MAX, SONDERMERKMAL_MAX_LEN, ValidationErrors,
};
pub(crate) use self::record_service::invalid_fields;
pub use self::record_service::{
    FILTER_PAGE_LIMITS, RECORD_PAGE_LIMITS, RecordService, SimilarRecords, VALIDATION_FAILED,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

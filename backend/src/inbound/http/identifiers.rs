//! Identnr HTTP handlers.
//!
//! ```text
//! GET    /api/identifiers
//! POST   /api/identifiers
//! GET    /api/identifiers/count
//! GET    /api/identifiers/duplicates
//! POST   /api/identifiers/clone
//! GET    /api/identifiers/{identnr}/records
//! POST   /api/identifiers/{identnr}/records
//! DELETE /api/identifiers/{identnr}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{IdentifierStats, MultiRecordIdentnr, MultiRecordReport, RecordDraft};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::Envelope;
use crate::inbound::http::records::{RecordBody, RecordPayload, record_bodies};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Owner and record counts.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierStatsBody {
    /// Distinct identnrs.
    pub unique_identnrs: u64,
    /// Stored records.
    pub total_records: u64,
    /// Records per identnr, two decimals.
    pub avg_records_per_identnr: f64,
}

impl From<IdentifierStats> for IdentifierStatsBody {
    fn from(stats: IdentifierStats) -> Self {
        Self {
            unique_identnrs: stats.unique_identnrs,
            total_records: stats.total_records,
            avg_records_per_identnr: stats.avg_records_per_identnr,
        }
    }
}

/// An identnr with more than one row.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MultiRecordIdentnrBody {
    /// The identnr.
    pub identnr: String,
    /// Rows it owns.
    pub record_count: u64,
    /// Lowest row id.
    pub first_id: i32,
    /// Highest row id.
    pub last_id: i32,
}

impl From<MultiRecordIdentnr> for MultiRecordIdentnrBody {
    fn from(owner: MultiRecordIdentnr) -> Self {
        Self {
            identnr: owner.identnr,
            record_count: owner.record_count,
            first_id: owner.first_id.get(),
            last_id: owner.last_id.get(),
        }
    }
}

/// Counts accompanying the multi-record report.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateStatsBody {
    /// Distinct identnrs.
    pub unique_identnrs: u64,
    /// Stored records.
    pub total_records: u64,
    /// Identnrs owning more than one row.
    pub duplicate_identnrs: usize,
    /// Records per identnr, two decimals.
    pub avg_records_per_identnr: f64,
}

/// Identnrs owning more than one row.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateIdentifiersBody {
    /// Owners by row count descending, then identnr.
    pub duplicates: Vec<MultiRecordIdentnrBody>,
    /// Length of `duplicates`.
    pub duplicate_count: usize,
    /// Whether any owner has several rows.
    pub has_duplicates: bool,
    /// Overall counts.
    pub stats: DuplicateStatsBody,
}

impl From<MultiRecordReport> for DuplicateIdentifiersBody {
    fn from(report: MultiRecordReport) -> Self {
        let MultiRecordReport { identnrs, stats } = report;
        let duplicate_count = identnrs.len();
        Self {
            duplicates: identnrs.into_iter().map(MultiRecordIdentnrBody::from).collect(),
            duplicate_count,
            has_duplicates: duplicate_count > 0,
            stats: DuplicateStatsBody {
                unique_identnrs: stats.unique_identnrs,
                total_records: stats.total_records,
                duplicate_identnrs: duplicate_count,
                avg_records_per_identnr: stats.avg_records_per_identnr,
            },
        }
    }
}

/// Rows of one identnr.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IdentifierRecordsBody {
    /// The identnr.
    pub identnr: String,
    /// Its rows ordered by position, merkmal.
    pub records: Vec<RecordBody>,
    /// Number of rows.
    pub count: usize,
}

/// Identnr to register.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RegisterRequest {
    /// New or existing identnr.
    pub identnr: String,
}

/// Registration outcome.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterBody {
    /// The identnr.
    pub identnr: String,
    /// Whether it owned rows already.
    pub existed: bool,
    /// Placeholder row created for a new identnr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordBody>,
}

/// Clone request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloneRequest {
    /// Identnr to copy from.
    pub source_identnr: String,
    /// Identnr to copy to; must own no rows.
    pub target_identnr: String,
}

/// Clone outcome.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloneBody {
    /// Copied-from identnr.
    pub source_identnr: String,
    /// Copied-to identnr.
    pub target_identnr: String,
    /// Rows created for the target.
    pub cloned_records: Vec<RecordBody>,
    /// Number of created rows.
    pub record_count: usize,
}

/// Rows removed with an identnr.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedIdentifierBody {
    /// The identnr.
    pub identnr: String,
    /// Number of removed rows.
    pub deleted_count: u64,
}

/// Distinct identnrs, ascending.
#[utoipa::path(
    get,
    path = "/api/identifiers",
    responses(
        (status = 200, description = "Distinct identnrs", body = Vec<String>),
        (status = 503, description = "Record store unavailable", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "listIdentifiers"
)]
#[get("/identifiers")]
pub async fn list_identifiers(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let identnrs = state.identifiers.list().await?;
    Ok(Envelope::new(identnrs).ok())
}

/// Owner and record counts.
#[utoipa::path(
    get,
    path = "/api/identifiers/count",
    responses(
        (status = 200, description = "Counts", body = IdentifierStatsBody),
        (status = 503, description = "Record store unavailable", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "countIdentifiers"
)]
#[get("/identifiers/count")]
pub async fn count_identifiers(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let stats = state.identifiers.stats().await?;
    Ok(Envelope::new(IdentifierStatsBody::from(stats)).ok())
}

/// Identnrs that own more than one row, with their id range.
#[utoipa::path(
    get,
    path = "/api/identifiers/duplicates",
    responses(
        (status = 200, description = "Multi-record identnrs", body = DuplicateIdentifiersBody),
        (status = 503, description = "Record store unavailable", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "duplicateIdentifiers"
)]
#[get("/identifiers/duplicates")]
pub async fn duplicate_identifiers(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let body = DuplicateIdentifiersBody::from(state.identifiers.multi_record_identnrs().await?);
    let message = if body.has_duplicates {
        format!("{} identnrs own several records", body.duplicate_count)
    } else {
        "every identnr owns a single record".to_owned()
    };
    Ok(Envelope::new(body).with_message(message).ok())
}

/// Rows owned by one identnr.
#[utoipa::path(
    get,
    path = "/api/identifiers/{identnr}/records",
    params(("identnr" = String, Path, description = "Owner identnr")),
    responses(
        (status = 200, description = "Rows of the identnr", body = IdentifierRecordsBody),
        (status = 400, description = "Invalid identnr", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "identifierRecords"
)]
#[get("/identifiers/{identnr}/records")]
pub async fn identifier_records(
    state: web::Data<HttpState>,
    identnr: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let identnr = identnr.into_inner();
    let records = record_bodies(state.identifiers.records_for(&identnr).await?);
    Ok(Envelope::new(IdentifierRecordsBody {
        identnr: identnr.trim().to_owned(),
        count: records.len(),
        records,
    })
    .ok())
}

/// Create a row for the identnr in the path.
#[utoipa::path(
    post,
    path = "/api/identifiers/{identnr}/records",
    params(("identnr" = String, Path, description = "Owner identnr")),
    request_body = RecordPayload,
    responses(
        (status = 201, description = "Record created", body = RecordBody),
        (status = 400, description = "Validation failure or duplicate", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "createIdentifierRecord"
)]
#[post("/identifiers/{identnr}/records")]
pub async fn create_identifier_record(
    state: web::Data<HttpState>,
    identnr: web::Path<String>,
    payload: web::Json<RecordPayload>,
) -> ApiResult<HttpResponse> {
    let created = state
        .identifiers
        .create_for(&identnr, RecordDraft::from(payload.into_inner()))
        .await?;
    Ok(Envelope::new(RecordBody::from(created))
        .with_message("record created")
        .created())
}

/// Register an identnr, adding a placeholder row when it owns none.
#[utoipa::path(
    post,
    path = "/api/identifiers",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Identnr already existed", body = RegisterBody),
        (status = 201, description = "Identnr registered with a placeholder row", body = RegisterBody),
        (status = 400, description = "Invalid identnr", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "registerIdentifier"
)]
#[post("/identifiers")]
pub async fn register_identifier(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = state.identifiers.register(&payload.identnr).await?;
    let existed = registration.existed();
    let body = RegisterBody {
        identnr: registration.identnr.to_string(),
        existed,
        record: registration.placeholder.map(RecordBody::from),
    };
    Ok(if existed {
        Envelope::new(body).with_message("identnr already exists").ok()
    } else {
        Envelope::new(body).with_message("identnr registered").created()
    })
}

/// Copy every row of one identnr to an unused identnr.
#[utoipa::path(
    post,
    path = "/api/identifiers/clone",
    request_body = CloneRequest,
    responses(
        (status = 201, description = "Identnr cloned", body = CloneBody),
        (status = 400, description = "Target already populated or identnrs equal", body = ErrorSchema),
        (status = 404, description = "Source owns no rows", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "cloneIdentifier"
)]
#[post("/identifiers/clone")]
pub async fn clone_identifier(
    state: web::Data<HttpState>,
    payload: web::Json<CloneRequest>,
) -> ApiResult<HttpResponse> {
    let outcome = state
        .identifiers
        .clone_identnr(&payload.source_identnr, &payload.target_identnr)
        .await?;
    let cloned_records = record_bodies(outcome.cloned);
    let message = format!(
        "{} records cloned from {} to {}",
        cloned_records.len(),
        outcome.source,
        outcome.target
    );
    Ok(Envelope::new(CloneBody {
        source_identnr: outcome.source.to_string(),
        target_identnr: outcome.target.to_string(),
        record_count: cloned_records.len(),
        cloned_records,
    })
    .with_message(message)
    .created())
}

/// Delete every row of an identnr.
#[utoipa::path(
    delete,
    path = "/api/identifiers/{identnr}",
    params(("identnr" = String, Path, description = "Owner identnr")),
    responses(
        (status = 200, description = "Rows deleted", body = DeletedIdentifierBody),
        (status = 404, description = "Identnr owns no rows", body = ErrorSchema)
    ),
    tags = ["identifiers"],
    operation_id = "deleteIdentifier"
)]
#[delete("/identifiers/{identnr}")]
pub async fn delete_identifier(
    state: web::Data<HttpState>,
    identnr: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let deleted_count = state.identifiers.delete_all(&identnr).await?;
    Ok(Envelope::new(DeletedIdentifierBody {
        identnr: identnr.trim().to_owned(),
        deleted_count,
    })
    .with_message(format!("{deleted_count} records deleted"))
    .ok())
}

#[cfg(test)]
#[path = "identifiers_tests.rs"]
mod tests;

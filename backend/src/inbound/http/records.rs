//! Record HTTP handlers.
//!
//! ```text
//! GET    /api/records
//! GET    /api/records/filter
//! POST   /api/records/bulk-position
//! POST   /api/records
//! GET    /api/records/{id}
//! PUT    /api/records/{id}
//! PATCH  /api/records/{id}
//! DELETE /api/records/{id}
//! GET    /api/records/{id}/similar
//! POST   /api/records/{id}/copy-to-identifiers
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use pagination::{Page, PageRequest, PaginationMeta};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::RecordFilter;
use crate::domain::{
    AttributeRecord, FILTER_PAGE_LIMITS, RECORD_PAGE_LIMITS, RecordDraft, RecordId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::Envelope;
use crate::inbound::http::schemas::{ErrorSchema, PaginationSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_optional_number, require_non_empty};

/// A stored record as returned to clients.
///
/// Unset sondermerkmal and fertigungsliste render as `""` and `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordBody {
    /// Record id.
    pub id: i32,
    /// Owning identnr.
    #[schema(example = "4711-A")]
    pub identnr: String,
    /// Characteristic name.
    #[schema(example = "Farbe")]
    pub merkmal: String,
    /// Characteristic value.
    #[schema(example = "rot")]
    pub auspraegung: String,
    /// Print text.
    #[schema(example = "Farbe: rot")]
    pub drucktext: String,
    /// Special characteristic.
    pub sondermerkmal: String,
    /// Ordering position.
    pub position: i32,
    /// Special department code, `0..=7`.
    pub sonder_abt: i32,
    /// Production list flag, `0` or `1`.
    pub fertigungsliste: i32,
}

impl From<AttributeRecord> for RecordBody {
    fn from(record: AttributeRecord) -> Self {
        let fields = record.fields;
        Self {
            id: record.id.get(),
            identnr: record.identnr,
            merkmal: fields.merkmal,
            auspraegung: fields.auspraegung,
            drucktext: fields.drucktext,
            sondermerkmal: fields.sondermerkmal.unwrap_or_default(),
            position: fields.position,
            sonder_abt: fields.sonder_abt,
            fertigungsliste: fields.fertigungsliste.unwrap_or_default(),
        }
    }
}

/// Convert a list of domain records to response bodies.
pub(crate) fn record_bodies(records: Vec<AttributeRecord>) -> Vec<RecordBody> {
    records.into_iter().map(RecordBody::from).collect()
}

/// Record fields as sent by clients.
///
/// Every field is optional at the wire level; which ones are required
/// depends on the operation. `merkmalsposition` and `maka` are accepted as
/// aliases of `position` and `sonderAbt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    /// Owning identnr.
    pub identnr: Option<String>,
    /// Characteristic name.
    pub merkmal: Option<String>,
    /// Characteristic value.
    pub auspraegung: Option<String>,
    /// Print text.
    pub drucktext: Option<String>,
    /// Special characteristic.
    pub sondermerkmal: Option<String>,
    /// Ordering position, defaults to `0`.
    #[serde(alias = "merkmalsposition")]
    pub position: Option<i64>,
    /// Special department code, defaults to `0`.
    #[serde(alias = "maka")]
    pub sonder_abt: Option<i64>,
    /// Production list flag, defaults to `0`.
    pub fertigungsliste: Option<i64>,
}

impl From<RecordPayload> for RecordDraft {
    fn from(payload: RecordPayload) -> Self {
        Self {
            identnr: payload.identnr,
            merkmal: payload.merkmal,
            auspraegung: payload.auspraegung,
            drucktext: payload.drucktext,
            sondermerkmal: payload.sondermerkmal,
            position: payload.position,
            sonder_abt: payload.sonder_abt,
            fertigungsliste: payload.fertigungsliste,
        }
    }
}

/// Page selection for the flat listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// One-based page, defaults to 1.
    pub page: Option<i64>,
    /// Page size, defaults to 25 and is clamped to 100.
    pub limit: Option<i64>,
}

/// Criteria for the filtered listing.
///
/// Numeric criteria arrive as text so an empty form field means "no filter".
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// Substring of the identnr.
    pub identnr: Option<String>,
    /// Substring of the merkmal.
    pub merkmal: Option<String>,
    /// Substring of the auspraegung.
    pub auspraegung: Option<String>,
    /// Substring of the drucktext.
    pub drucktext: Option<String>,
    /// Substring of the sondermerkmal.
    pub sondermerkmal: Option<String>,
    /// Exact position.
    pub position: Option<String>,
    /// Exact special department code.
    pub sonder_abt: Option<String>,
    /// Exact production list flag.
    pub fertigungsliste: Option<String>,
    /// Free text matched against every text field; overrides the rest.
    pub quick_search: Option<String>,
    /// One-based page, defaults to 1.
    pub page: Option<i64>,
    /// Page size, defaults to 50.
    pub limit: Option<i64>,
}

impl FilterQuery {
    fn to_filter(&self) -> ApiResult<RecordFilter> {
        Ok(RecordFilter {
            identnr: self.identnr.clone(),
            merkmal: self.merkmal.clone(),
            auspraegung: self.auspraegung.clone(),
            drucktext: self.drucktext.clone(),
            sondermerkmal: self.sondermerkmal.clone(),
            position: parse_optional_number(self.position.as_deref(), FieldName::new("position"))?,
            sonder_abt: parse_optional_number(
                self.sonder_abt.as_deref(),
                FieldName::new("sonderAbt"),
            )?,
            fertigungsliste: parse_optional_number(
                self.fertigungsliste.as_deref(),
                FieldName::new("fertigungsliste"),
            )?,
            quick_search: self.quick_search.clone(),
        })
    }
}

/// One page of records.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordPageBody {
    /// Records on this page.
    pub records: Vec<RecordBody>,
    /// Page metadata.
    #[schema(value_type = PaginationSchema)]
    pub pagination: PaginationMeta,
}

impl From<Page<AttributeRecord>> for RecordPageBody {
    fn from(page: Page<AttributeRecord>) -> Self {
        Self {
            records: record_bodies(page.items),
            pagination: page.pagination,
        }
    }
}

/// Response for a deleted record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletedRecordBody {
    /// Id of the removed record.
    pub id: i32,
}

/// Records sharing characteristic text with one record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRecordsBody {
    /// The reference record id.
    pub original_id: i32,
    /// Matching records, the reference included.
    pub records: Vec<RecordBody>,
    /// Number of matching records.
    pub count: usize,
}

/// Owners to copy one record to.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CopyToIdentifiersRequest {
    /// Target identnrs; must not be empty.
    pub identnrs: Vec<String>,
}

/// Result of copying one record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopyToIdentifiersBody {
    /// The copied record.
    pub original_record: RecordBody,
    /// Rows actually created.
    pub created_records: Vec<RecordBody>,
    /// Owners that received a copy.
    pub copied_to_identnrs: Vec<String>,
}

/// Reposition every record of one identnr and merkmal.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkPositionRequest {
    /// Owner whose records move.
    pub identnr: String,
    /// Merkmal whose records move.
    pub merkmal: String,
    /// First position to assign, at least 1.
    pub new_position: i64,
}

/// Records after repositioning.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkPositionBody {
    /// Updated records in their new order.
    pub records: Vec<RecordBody>,
    /// Number of updated records.
    pub count: usize,
}

/// Flat paginated listing.
#[utoipa::path(
    get,
    path = "/api/records",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of records", body = RecordPageBody),
        (status = 400, description = "Invalid paging parameters", body = ErrorSchema),
        (status = 503, description = "Record store unavailable", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "listRecords"
)]
#[get("/records")]
pub async fn list_records(
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let request = PageRequest::from_query(query.page, query.limit, RECORD_PAGE_LIMITS);
    let page = state.records.list(request).await?;
    Ok(Envelope::new(RecordPageBody::from(page)).ok())
}

/// Filtered paginated listing.
#[utoipa::path(
    get,
    path = "/api/records/filter",
    params(FilterQuery),
    responses(
        (status = 200, description = "One page of matching records", body = RecordPageBody),
        (status = 400, description = "Invalid filter value", body = ErrorSchema),
        (status = 503, description = "Record store unavailable", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "filterRecords"
)]
#[get("/records/filter")]
pub async fn filter_records(
    state: web::Data<HttpState>,
    query: web::Query<FilterQuery>,
) -> ApiResult<HttpResponse> {
    let filter = query.to_filter()?;
    let request = PageRequest::from_query(query.page, query.limit, FILTER_PAGE_LIMITS);
    let page = state.records.filter(filter, request).await?;
    Ok(Envelope::new(RecordPageBody::from(page)).ok())
}

/// Fetch one record.
#[utoipa::path(
    get,
    path = "/api/records/{id}",
    params(("id" = i32, Path, description = "Record id")),
    responses(
        (status = 200, description = "The record", body = RecordBody),
        (status = 404, description = "No such record", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "getRecord"
)]
#[get("/records/{id}")]
pub async fn get_record(
    state: web::Data<HttpState>,
    id: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let record = state.records.get(RecordId::new(id.into_inner())).await?;
    Ok(Envelope::new(RecordBody::from(record)).ok())
}

/// Create a record.
#[utoipa::path(
    post,
    path = "/api/records",
    request_body = RecordPayload,
    responses(
        (status = 201, description = "Record created", body = RecordBody),
        (status = 400, description = "Validation failure or duplicate", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "createRecord"
)]
#[post("/records")]
pub async fn create_record(
    state: web::Data<HttpState>,
    payload: web::Json<RecordPayload>,
) -> ApiResult<HttpResponse> {
    let created = state
        .records
        .create(RecordDraft::from(payload.into_inner()))
        .await?;
    Ok(Envelope::new(RecordBody::from(created))
        .with_message("record created")
        .created())
}

/// Replace every field of a record.
#[utoipa::path(
    put,
    path = "/api/records/{id}",
    params(("id" = i32, Path, description = "Record id")),
    request_body = RecordPayload,
    responses(
        (status = 200, description = "Record replaced", body = RecordBody),
        (status = 400, description = "Validation failure or duplicate", body = ErrorSchema),
        (status = 404, description = "No such record", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "replaceRecord"
)]
#[put("/records/{id}")]
pub async fn replace_record(
    state: web::Data<HttpState>,
    id: web::Path<i32>,
    payload: web::Json<RecordPayload>,
) -> ApiResult<HttpResponse> {
    let updated = state
        .records
        .replace(
            RecordId::new(id.into_inner()),
            RecordDraft::from(payload.into_inner()),
        )
        .await?;
    Ok(Envelope::new(RecordBody::from(updated))
        .with_message("record updated")
        .ok())
}

/// Update the supplied fields of a record.
#[utoipa::path(
    patch,
    path = "/api/records/{id}",
    params(("id" = i32, Path, description = "Record id")),
    request_body = RecordPayload,
    responses(
        (status = 200, description = "Record updated", body = RecordBody),
        (status = 400, description = "No fields, validation failure or duplicate", body = ErrorSchema),
        (status = 404, description = "No such record", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "patchRecord"
)]
#[patch("/records/{id}")]
pub async fn patch_record(
    state: web::Data<HttpState>,
    id: web::Path<i32>,
    payload: web::Json<RecordPayload>,
) -> ApiResult<HttpResponse> {
    let updated = state
        .records
        .patch(
            RecordId::new(id.into_inner()),
            RecordDraft::from(payload.into_inner()),
        )
        .await?;
    Ok(Envelope::new(RecordBody::from(updated))
        .with_message("record updated")
        .ok())
}

/// Delete a record.
#[utoipa::path(
    delete,
    path = "/api/records/{id}",
    params(("id" = i32, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record deleted", body = DeletedRecordBody),
        (status = 404, description = "No such record", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "deleteRecord"
)]
#[delete("/records/{id}")]
pub async fn delete_record(
    state: web::Data<HttpState>,
    id: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let deleted = state.records.delete(RecordId::new(id.into_inner())).await?;
    Ok(Envelope::new(DeletedRecordBody { id: deleted.get() })
        .with_message("record deleted")
        .ok())
}

/// Records sharing characteristic text with a record.
#[utoipa::path(
    get,
    path = "/api/records/{id}/similar",
    params(("id" = i32, Path, description = "Reference record id")),
    responses(
        (status = 200, description = "Similar records", body = SimilarRecordsBody),
        (status = 404, description = "No such record", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "similarRecords"
)]
#[get("/records/{id}/similar")]
pub async fn similar_records(
    state: web::Data<HttpState>,
    id: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let similar = state.records.similar(RecordId::new(id.into_inner())).await?;
    let records = record_bodies(similar.records);
    Ok(Envelope::new(SimilarRecordsBody {
        original_id: similar.original_id.get(),
        count: records.len(),
        records,
    })
    .ok())
}

/// Copy a record to other identnrs, skipping existing duplicates.
#[utoipa::path(
    post,
    path = "/api/records/{id}/copy-to-identifiers",
    params(("id" = i32, Path, description = "Record to copy")),
    request_body = CopyToIdentifiersRequest,
    responses(
        (status = 201, description = "Copies created", body = CopyToIdentifiersBody),
        (status = 400, description = "Empty or invalid identnr list", body = ErrorSchema),
        (status = 404, description = "No such record", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "copyRecordToIdentifiers"
)]
#[post("/records/{id}/copy-to-identifiers")]
pub async fn copy_to_identifiers(
    state: web::Data<HttpState>,
    id: web::Path<i32>,
    payload: web::Json<CopyToIdentifiersRequest>,
) -> ApiResult<HttpResponse> {
    let CopyToIdentifiersRequest { identnrs } = payload.into_inner();
    require_non_empty(&identnrs, FieldName::new("identnrs"))?;
    let outcome = state
        .identifiers
        .copy_record(RecordId::new(id.into_inner()), &identnrs)
        .await?;
    let copied_to_identnrs = outcome.copied_to();
    let message = format!("record copied to {} identnrs", copied_to_identnrs.len());
    Ok(Envelope::new(CopyToIdentifiersBody {
        original_record: RecordBody::from(outcome.original),
        created_records: record_bodies(outcome.created),
        copied_to_identnrs,
    })
    .with_message(message)
    .created())
}

/// Give every record of one identnr and merkmal consecutive positions.
#[utoipa::path(
    post,
    path = "/api/records/bulk-position",
    request_body = BulkPositionRequest,
    responses(
        (status = 200, description = "Records repositioned", body = BulkPositionBody),
        (status = 400, description = "Invalid identnr, merkmal or position", body = ErrorSchema)
    ),
    tags = ["records"],
    operation_id = "bulkPosition"
)]
#[post("/records/bulk-position")]
pub async fn bulk_position(
    state: web::Data<HttpState>,
    payload: web::Json<BulkPositionRequest>,
) -> ApiResult<HttpResponse> {
    let BulkPositionRequest {
        identnr,
        merkmal,
        new_position,
    } = payload.into_inner();
    let updated = state
        .records
        .reposition(&identnr, &merkmal, new_position)
        .await?;
    let records = record_bodies(updated);
    Ok(Envelope::new(BulkPositionBody {
        count: records.len(),
        records,
    })
    .ok())
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;

//! Virtual group HTTP handlers.
//!
//! ```text
//! GET  /api/groups
//! POST /api/groups/bulk-delete
//! POST /api/groups/copy
//! POST /api/groups/create-from-copy
//! POST /api/groups/reconcile
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AttributeFields, GroupKey, RecordDraft, RecordGroup, ReconcileOutcome, ReconcileRequest,
    invalid_fields,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::Envelope;
use crate::inbound::http::records::{RecordBody, RecordPayload, record_bodies};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_identnr_list, parse_record_ids, require_non_empty,
};

/// One derived group.
///
/// `identnrList[i]` owns `idList[i]`; an identnr appears once per row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupBody {
    /// Display id, stable only within one listing.
    pub id: u32,
    /// Characteristic name.
    pub merkmal: String,
    /// Characteristic value.
    pub auspraegung: String,
    /// Print text.
    pub drucktext: String,
    /// Special characteristic, `""` when unset.
    pub sondermerkmal: String,
    /// Shared position.
    pub position: i32,
    /// Special department code.
    pub sonder_abt: i32,
    /// Production list flag, `0` when unset.
    pub fertigungsliste: i32,
    /// Owner of each member row.
    pub identnr_list: Vec<String>,
    /// Id of each member row.
    pub id_list: Vec<i32>,
    /// Number of member rows.
    pub record_count: usize,
}

impl From<RecordGroup> for GroupBody {
    fn from(group: RecordGroup) -> Self {
        let identnr_list = group.identnr_list();
        let id_list = group.id_list().into_iter().map(|id| id.get()).collect();
        let record_count = group.record_count();
        let key = group.key;
        Self {
            id: group.display_id,
            sondermerkmal: key.sondermerkmal_display().to_owned(),
            fertigungsliste: key.fertigungsliste_display(),
            merkmal: key.merkmal,
            auspraegung: key.auspraegung,
            drucktext: key.drucktext,
            position: key.position,
            sonder_abt: key.sonder_abt,
            identnr_list,
            id_list,
            record_count,
        }
    }
}

/// Every group.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupListBody {
    /// Groups ordered by merkmal, auspraegung, drucktext.
    pub groups: Vec<GroupBody>,
    /// Number of groups.
    pub total_count: usize,
}

/// Row ids to delete.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BulkDeleteRequest {
    /// Record ids; must not be empty.
    pub ids: Vec<i64>,
}

/// Rows removed by a bulk delete.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteBody {
    /// Number of rows removed; `0` for a group that was already gone.
    pub deleted_count: usize,
    /// Ids of the removed rows.
    pub deleted_ids: Vec<i32>,
}

/// Key fields identifying one group.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupKeyRequest {
    /// Characteristic name.
    pub merkmal: String,
    /// Characteristic value.
    pub auspraegung: String,
    /// Print text.
    pub drucktext: String,
    /// Special characteristic; blank and absent are equivalent.
    #[serde(default)]
    pub sondermerkmal: Option<String>,
    /// Shared position.
    #[serde(default, alias = "merkmalsposition")]
    pub position: i32,
    /// Special department code.
    #[serde(default, alias = "maka")]
    pub sonder_abt: i32,
    /// Production list flag; `0` and absent are equivalent.
    #[serde(default)]
    pub fertigungsliste: Option<i32>,
}

impl GroupKeyRequest {
    fn key(self) -> GroupKey {
        GroupKey::of(&AttributeFields {
            merkmal: self.merkmal,
            auspraegung: self.auspraegung,
            drucktext: self.drucktext,
            sondermerkmal: self.sondermerkmal,
            position: self.position,
            sonder_abt: self.sonder_abt,
            fertigungsliste: self.fertigungsliste,
        })
    }
}

/// Shared fields and members of one group.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupTemplateBody {
    /// Field values to seed new rows with.
    pub template: RecordPayload,
    /// Distinct member identnrs, sorted.
    pub identnrs: Vec<String>,
    /// Member rows.
    pub records: Vec<RecordBody>,
    /// Number of member rows.
    pub record_count: usize,
}

/// Rows to create from a template.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateFromTemplateRequest {
    /// Field values for every new row; `identnr` is ignored.
    pub template: RecordPayload,
    /// Owners to create rows for; must not be empty.
    pub identnrs: Vec<String>,
}

/// Rows created from a template.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFromTemplateBody {
    /// Rows actually created.
    pub created_records: Vec<RecordBody>,
    /// Number of created rows.
    pub record_count: usize,
    /// Distinct requested owners, sorted.
    pub target_identnrs: Vec<String>,
    /// Owners skipped because the row already existed.
    pub skipped_identnrs: Vec<String>,
}

/// The group as the client last saw it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOriginal {
    /// Row ids of the group; empty for a group that no longer exists.
    #[serde(default)]
    pub member_ids: Vec<i64>,
    /// Owners of the group; derived from the rows when empty.
    #[serde(default)]
    pub member_identnrs: Vec<String>,
}

/// Desired state of the group.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReconcileTarget {
    /// Field values every member should carry.
    pub fields: RecordPayload,
    /// Owners the group should have.
    pub identnrs: Vec<String>,
}

/// Reconciliation request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReconcileBody {
    /// Group as listed.
    #[serde(default)]
    pub original: ReconcileOriginal,
    /// Group as it should be.
    pub target: ReconcileTarget,
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResultBody {
    /// Owners that received a row.
    pub added: Vec<String>,
    /// Owners whose group rows were deleted.
    pub removed: Vec<String>,
    /// Owners whose rows were rewritten.
    pub updated: Vec<String>,
}

impl From<ReconcileOutcome> for ReconcileResultBody {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self {
            added: outcome.added,
            removed: outcome.removed,
            updated: outcome.updated,
        }
    }
}

fn template_fields(template: RecordPayload) -> ApiResult<AttributeFields> {
    RecordDraft::from(template)
        .validate_fields()
        .map_err(|errors| invalid_fields(&errors))
}

fn fields_payload(fields: AttributeFields) -> RecordPayload {
    RecordPayload {
        identnr: None,
        merkmal: Some(fields.merkmal),
        auspraegung: Some(fields.auspraegung),
        drucktext: Some(fields.drucktext),
        sondermerkmal: fields.sondermerkmal,
        position: Some(i64::from(fields.position)),
        sonder_abt: Some(i64::from(fields.sonder_abt)),
        fertigungsliste: fields.fertigungsliste.map(i64::from),
    }
}

fn reconcile_request(body: ReconcileBody) -> ApiResult<ReconcileRequest> {
    let ReconcileBody { original, target } = body;
    Ok(ReconcileRequest {
        member_ids: parse_record_ids(&original.member_ids, FieldName::new("original.memberIds"))?,
        member_identnrs: parse_identnr_list(
            &original.member_identnrs,
            FieldName::new("original.memberIdentnrs"),
        )?,
        target_fields: template_fields(target.fields)?,
        target_identnrs: parse_identnr_list(
            &target.identnrs,
            FieldName::new("target.identnrs"),
        )?,
    })
}

/// List every virtual group.
#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "Every group", body = GroupListBody),
        (status = 503, description = "Record store unavailable", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "listGroups"
)]
#[get("/groups")]
pub async fn list_groups(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let groups: Vec<GroupBody> = state
        .groups
        .list()
        .await?
        .into_iter()
        .map(GroupBody::from)
        .collect();
    Ok(Envelope::new(GroupListBody {
        total_count: groups.len(),
        groups,
    })
    .ok())
}

/// Delete rows by id; ids already gone are skipped.
#[utoipa::path(
    post,
    path = "/api/groups/bulk-delete",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Rows deleted", body = BulkDeleteBody),
        (status = 400, description = "Empty or invalid id list", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "bulkDeleteGroup"
)]
#[post("/groups/bulk-delete")]
pub async fn bulk_delete(
    state: web::Data<HttpState>,
    payload: web::Json<BulkDeleteRequest>,
) -> ApiResult<HttpResponse> {
    let BulkDeleteRequest { ids } = payload.into_inner();
    require_non_empty(&ids, FieldName::new("ids"))?;
    let ids = parse_record_ids(&ids, FieldName::new("ids"))?;
    let outcome = state.groups.bulk_delete(&ids).await?;
    let message = format!("{} records deleted", outcome.deleted_count());
    Ok(Envelope::new(BulkDeleteBody {
        deleted_count: outcome.deleted_count(),
        deleted_ids: outcome.deleted_ids.iter().map(|id| id.get()).collect(),
    })
    .with_message(message)
    .ok())
}

/// Extract the template and members of one group.
#[utoipa::path(
    post,
    path = "/api/groups/copy",
    request_body = GroupKeyRequest,
    responses(
        (status = 200, description = "Group template", body = GroupTemplateBody),
        (status = 404, description = "No row matches the key", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "copyGroup"
)]
#[post("/groups/copy")]
pub async fn copy_group(
    state: web::Data<HttpState>,
    payload: web::Json<GroupKeyRequest>,
) -> ApiResult<HttpResponse> {
    let template = state.groups.template(&payload.into_inner().key()).await?;
    let records = record_bodies(template.records);
    Ok(Envelope::new(GroupTemplateBody {
        template: fields_payload(template.fields),
        identnrs: template.identnrs,
        record_count: records.len(),
        records,
    })
    .ok())
}

/// Create one row per identnr from a template.
#[utoipa::path(
    post,
    path = "/api/groups/create-from-copy",
    request_body = CreateFromTemplateRequest,
    responses(
        (status = 201, description = "Rows created", body = CreateFromTemplateBody),
        (status = 400, description = "Invalid template or identnr list", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "createFromCopy"
)]
#[post("/groups/create-from-copy")]
pub async fn create_from_copy(
    state: web::Data<HttpState>,
    payload: web::Json<CreateFromTemplateRequest>,
) -> ApiResult<HttpResponse> {
    let CreateFromTemplateRequest { template, identnrs } = payload.into_inner();
    require_non_empty(&identnrs, FieldName::new("identnrs"))?;
    let fields = template_fields(template)?;
    let identnrs = parse_identnr_list(&identnrs, FieldName::new("identnrs"))?;
    let outcome = state.groups.create_from_template(&fields, &identnrs).await?;
    let created_records = record_bodies(outcome.created);
    let message = format!("{} records created", created_records.len());
    Ok(Envelope::new(CreateFromTemplateBody {
        record_count: created_records.len(),
        created_records,
        target_identnrs: outcome.target_identnrs.into_iter().map(String::from).collect(),
        skipped_identnrs: outcome.skipped.into_iter().map(String::from).collect(),
    })
    .with_message(message)
    .created())
}

/// Converge a group on new members and field values.
///
/// Runs add, remove, then update. A failure leaves earlier phases committed
/// and reports them in `details`.
#[utoipa::path(
    post,
    path = "/api/groups/reconcile",
    request_body = ReconcileBody,
    responses(
        (status = 200, description = "Group reconciled", body = ReconcileResultBody),
        (status = 400, description = "Invalid fields or identnrs", body = ErrorSchema),
        (status = 503, description = "Store failed mid-way; details carry progress", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "reconcileGroup"
)]
#[post("/groups/reconcile")]
pub async fn reconcile_group(
    state: web::Data<HttpState>,
    payload: web::Json<ReconcileBody>,
) -> ApiResult<HttpResponse> {
    let request = reconcile_request(payload.into_inner())?;
    let outcome = state.groups.reconcile(request).await?;
    Ok(Envelope::new(ReconcileResultBody::from(outcome)).ok())
}

#[cfg(test)]
#[path = "groups_tests.rs"]
mod tests;

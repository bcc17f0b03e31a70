//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api` handler, the health probes, and the
//! schema wrappers from [`crate::inbound::http::schemas`] that document
//! domain types without coupling them to utoipa.
//!
//! Swagger UI serves the document in debug builds; `openapi-dump` prints it.

use utoipa::OpenApi;

use crate::inbound::http::groups::{
    BulkDeleteBody, BulkDeleteRequest, CreateFromTemplateBody, CreateFromTemplateRequest,
    GroupBody, GroupKeyRequest, GroupListBody, GroupTemplateBody, ReconcileBody,
    ReconcileResultBody,
};
use crate::inbound::http::health::StoreHealthBody;
use crate::inbound::http::identifiers::{
    CloneBody, CloneRequest, DeletedIdentifierBody, DuplicateIdentifiersBody, DuplicateStatsBody,
    IdentifierRecordsBody, IdentifierStatsBody, MultiRecordIdentnrBody, RegisterBody,
    RegisterRequest,
};
use crate::inbound::http::records::{
    BulkPositionBody, BulkPositionRequest, CopyToIdentifiersBody, CopyToIdentifiersRequest,
    DeletedRecordBody, RecordBody, RecordPageBody, RecordPayload, SimilarRecordsBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema, PaginationSchema};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Merkmalstexte backend API",
        description = "Administration of attribute text records, their groups and owning identnrs."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::records::list_records,
        crate::inbound::http::records::filter_records,
        crate::inbound::http::records::get_record,
        crate::inbound::http::records::create_record,
        crate::inbound::http::records::replace_record,
        crate::inbound::http::records::patch_record,
        crate::inbound::http::records::delete_record,
        crate::inbound::http::records::similar_records,
        crate::inbound::http::records::copy_to_identifiers,
        crate::inbound::http::records::bulk_position,
        crate::inbound::http::groups::list_groups,
        crate::inbound::http::groups::bulk_delete,
        crate::inbound::http::groups::copy_group,
        crate::inbound::http::groups::create_from_copy,
        crate::inbound::http::groups::reconcile_group,
        crate::inbound::http::identifiers::list_identifiers,
        crate::inbound::http::identifiers::count_identifiers,
        crate::inbound::http::identifiers::duplicate_identifiers,
        crate::inbound::http::identifiers::identifier_records,
        crate::inbound::http::identifiers::create_identifier_record,
        crate::inbound::http::identifiers::register_identifier,
        crate::inbound::http::identifiers::clone_identifier,
        crate::inbound::http::identifiers::delete_identifier,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
        crate::inbound::http::health::store,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PaginationSchema,
        RecordBody,
        RecordPayload,
        RecordPageBody,
        DeletedRecordBody,
        SimilarRecordsBody,
        CopyToIdentifiersRequest,
        CopyToIdentifiersBody,
        BulkPositionRequest,
        BulkPositionBody,
        GroupBody,
        GroupListBody,
        GroupKeyRequest,
        GroupTemplateBody,
        BulkDeleteRequest,
        BulkDeleteBody,
        CreateFromTemplateRequest,
        CreateFromTemplateBody,
        ReconcileBody,
        ReconcileResultBody,
        IdentifierStatsBody,
        DuplicateIdentifiersBody,
        DuplicateStatsBody,
        MultiRecordIdentnrBody,
        IdentifierRecordsBody,
        RegisterRequest,
        RegisterBody,
        CloneRequest,
        CloneBody,
        DeletedIdentifierBody,
        StoreHealthBody,
    )),
    tags(
        (name = "records", description = "Single attribute records"),
        (name = "groups", description = "Records grouped by shared attribute text"),
        (name = "identifiers", description = "Owning identnrs"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

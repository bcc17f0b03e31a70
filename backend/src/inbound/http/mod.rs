//! HTTP inbound adapter exposing the REST endpoints under `/api`.

pub mod envelope;
pub mod error;
pub mod groups;
pub mod health;
pub mod identifiers;
pub mod records;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

use actix_web::web;

/// Register the `/api` scope with its extractor error handlers.
///
/// Literal segments are registered ahead of `{id}` captures on the same
/// prefix so `/records/filter` never parses as a record id.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    let api = web::scope("/api")
        .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .service(records::list_records)
        .service(records::filter_records)
        .service(records::bulk_position)
        .service(records::create_record)
        .service(records::get_record)
        .service(records::replace_record)
        .service(records::patch_record)
        .service(records::delete_record)
        .service(records::similar_records)
        .service(records::copy_to_identifiers)
        .service(groups::list_groups)
        .service(groups::bulk_delete)
        .service(groups::copy_group)
        .service(groups::create_from_copy)
        .service(groups::reconcile_group)
        .service(identifiers::list_identifiers)
        .service(identifiers::register_identifier)
        .service(identifiers::count_identifiers)
        .service(identifiers::duplicate_identifiers)
        .service(identifiers::clone_identifier)
        .service(identifiers::identifier_records)
        .service(identifiers::create_identifier_record)
        .service(identifiers::delete_identifier);
    cfg.service(api);
}

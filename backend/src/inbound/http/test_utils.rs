//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use crate::domain::AttributeFields;
use crate::domain::ports::InMemoryRecordRepository;
use crate::inbound::http::api_routes;
use crate::inbound::http::state::HttpState;

/// Fields of a plain record with no qualifiers set.
pub fn fields(merkmal: &str, auspraegung: &str, drucktext: &str, position: i32) -> AttributeFields {
    AttributeFields {
        merkmal: merkmal.to_owned(),
        auspraegung: auspraegung.to_owned(),
        drucktext: drucktext.to_owned(),
        sondermerkmal: Some(String::new()),
        position,
        sonder_abt: 0,
        fertigungsliste: Some(0),
    }
}

/// App serving the `/api` scope over `repo`.
pub fn test_app(
    repo: Arc<InMemoryRecordRepository>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(HttpState::new(repo)))
        .configure(api_routes)
}

//! Tests for record HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::domain::ports::InMemoryRecordRepository;
use crate::inbound::http::test_utils::{fields, test_app};

#[fixture]
fn repo() -> Arc<InMemoryRecordRepository> {
    let repo = Arc::new(InMemoryRecordRepository::new());
    repo.seed("4711", fields("Farbe", "rot", "Farbe: rot", 1));
    repo.seed("4711", fields("Länge", "10 mm", "Länge 10 mm", 2));
    repo.seed("4712", fields("Farbe", "rot", "Farbe: rot", 1));
    repo
}

fn record_json(identnr: &str, merkmal: &str) -> Value {
    json!({
        "identnr": identnr,
        "merkmal": merkmal,
        "auspraegung": "blau",
        "drucktext": format!("{merkmal}: blau"),
        "position": 3,
        "sonderAbt": 2,
    })
}

#[rstest]
#[actix_web::test]
async fn create_then_fetch_round_trips_wire_names(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;

    let create = actix_test::TestRequest::post()
        .uri("/api/records")
        .set_json(record_json("5000", "Farbe"))
        .to_request();
    let response = actix_test::call_service(&app, create).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["success"], true);
    let id = body["data"]["id"].as_i64().expect("assigned id");
    assert_eq!(body["data"]["sonderAbt"], 2);
    assert_eq!(body["data"]["sondermerkmal"], "");
    assert_eq!(body["data"]["fertigungsliste"], 0);

    let fetch = actix_test::TestRequest::get()
        .uri(&format!("/api/records/{id}"))
        .to_request();
    let fetched: Value = actix_test::call_and_read_body_json(&app, fetch).await;
    assert_eq!(fetched["data"]["identnr"], "5000");
    assert_eq!(fetched["data"]["position"], 3);
}

#[rstest]
#[actix_web::test]
async fn duplicate_create_is_rejected(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/records")
        .set_json(json!({
            "identnr": "4711",
            "merkmal": "Farbe",
            "auspraegung": "rot",
            "drucktext": "Farbe: rot",
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "duplicate");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("4711")));
}

#[rstest]
#[actix_web::test]
async fn validation_reports_every_field(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/records")
        .set_json(json!({ "identnr": "5000", "auspraegung": "x", "drucktext": "x", "sonderAbt": 9 }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["message"], "Validierung fehlgeschlagen");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
}

#[rstest]
#[actix_web::test]
async fn listing_is_paginated(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/records?page=1&limit=2")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    let data = &body["data"];
    assert_eq!(data["records"].as_array().map(Vec::len), Some(2));
    assert_eq!(data["pagination"]["totalCount"], 3);
    assert_eq!(data["pagination"]["totalPages"], 2);
    assert_eq!(data["pagination"]["hasNextPage"], true);
    assert_eq!(data["pagination"]["hasPreviousPage"], false);
}

#[rstest]
#[case("/api/records/filter?merkmal=farbe", 2)]
#[case("/api/records/filter?merkmal=farbe&identnr=4712", 1)]
#[case("/api/records/filter?merkmal=nothing&quickSearch=10%20mm", 1)]
#[case("/api/records/filter?position=&sonderAbt=", 3)]
#[case("/api/records/filter?position=2", 1)]
#[actix_web::test]
async fn filter_route_applies_criteria(
    repo: Arc<InMemoryRecordRepository>,
    #[case] uri: &str,
    #[case] expected: u64,
) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::get().uri(uri).to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["data"]["pagination"]["totalCount"], expected);
}

#[rstest]
#[case("/api/records/filter?position=zwei")]
#[case("/api/records/abc")]
#[case("/api/records?page=eins")]
#[actix_web::test]
async fn malformed_parameters_are_bad_requests(
    repo: Arc<InMemoryRecordRepository>,
    #[case] uri: &str,
) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::get().uri(uri).to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["success"], false);
}

#[rstest]
#[actix_web::test]
async fn patch_merges_and_delete_removes(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let id = repo
        .snapshot()
        .first()
        .map(|record| record.id.get())
        .expect("seeded record");

    let empty = actix_test::TestRequest::patch()
        .uri(&format!("/api/records/{id}"))
        .set_json(json!({}))
        .to_request();
    assert_eq!(
        actix_test::call_service(&app, empty).await.status(),
        StatusCode::BAD_REQUEST
    );

    let patch = actix_test::TestRequest::patch()
        .uri(&format!("/api/records/{id}"))
        .set_json(json!({ "drucktext": "Farbe: Rot (RAL 3000)" }))
        .to_request();
    let patched: Value = actix_test::call_and_read_body_json(&app, patch).await;
    assert_eq!(patched["data"]["drucktext"], "Farbe: Rot (RAL 3000)");
    assert_eq!(patched["data"]["auspraegung"], "rot");

    let delete = || {
        actix_test::TestRequest::delete()
            .uri(&format!("/api/records/{id}"))
            .to_request()
    };
    let first = actix_test::call_service(&app, delete()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let second = actix_test::call_service(&app, delete()).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn similar_lists_every_owner(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let id = repo
        .snapshot()
        .first()
        .map(|record| record.id.get())
        .expect("seeded record");
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/records/{id}/similar"))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["data"]["originalId"], id);
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["records"][1]["identnr"], "4712");
}

#[rstest]
#[actix_web::test]
async fn copy_skips_owners_that_already_have_the_row(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let id = repo
        .snapshot()
        .first()
        .map(|record| record.id.get())
        .expect("seeded record");
    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/records/{id}/copy-to-identifiers"))
        .set_json(json!({ "identnrs": ["4712", "9000"] }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["data"]["copiedToIdentnrs"], json!(["9000"]));
    assert_eq!(body["data"]["createdRecords"][0]["position"], 1);
    assert_eq!(repo.snapshot().len(), 4);

    let empty = actix_test::TestRequest::post()
        .uri(&format!("/api/records/{id}/copy-to-identifiers"))
        .set_json(json!({ "identnrs": [] }))
        .to_request();
    assert_eq!(
        actix_test::call_service(&app, empty).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[rstest]
#[actix_web::test]
async fn bulk_position_renumbers_matching_rows(repo: Arc<InMemoryRecordRepository>) {
    repo.seed("4711", fields("Farbe", "blau", "Farbe: blau", 4));
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/records/bulk-position")
        .set_json(json!({ "identnr": "4711", "merkmal": "Farbe", "newPosition": 10 }))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["data"]["count"], 2);
    let positions: Vec<i64> = body["data"]["records"]
        .as_array()
        .expect("records")
        .iter()
        .filter_map(|record| record["position"].as_i64())
        .collect();
    assert_eq!(positions, vec![10, 11]);
}

//! Tests for group HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::domain::ports::{InMemoryRecordRepository, RecordRepositoryError};
use crate::inbound::http::test_utils::{fields, test_app};

#[fixture]
fn repo() -> Arc<InMemoryRecordRepository> {
    let repo = Arc::new(InMemoryRecordRepository::new());
    repo.seed("A", fields("Farbe", "rot", "Farbe: rot", 1));
    repo.seed("B", fields("Farbe", "rot", "Farbe: rot", 1));
    let mut legacy = fields("Farbe", "rot", "Farbe: rot", 1);
    legacy.sondermerkmal = None;
    legacy.fertigungsliste = None;
    repo.seed("C", legacy);
    repo.seed("A", fields("Länge", "10 mm", "Länge 10 mm", 2));
    repo
}

fn member_ids(repo: &InMemoryRecordRepository, merkmal: &str) -> Vec<i32> {
    repo.snapshot()
        .into_iter()
        .filter(|record| record.fields.merkmal == merkmal)
        .map(|record| record.id.get())
        .collect()
}

fn target_fields(drucktext: &str) -> Value {
    json!({
        "merkmal": "Farbe",
        "auspraegung": "rot",
        "drucktext": drucktext,
        "sondermerkmal": "",
        "position": 1,
        "sonderAbt": 0,
        "fertigungsliste": 0,
    })
}

#[rstest]
#[actix_web::test]
async fn listing_merges_blank_qualifiers(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::get().uri("/api/groups").to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["data"]["totalCount"], 2);
    let farbe = &body["data"]["groups"][0];
    assert_eq!(farbe["id"], 1);
    assert_eq!(farbe["merkmal"], "Farbe");
    assert_eq!(farbe["identnrList"], json!(["A", "B", "C"]));
    assert_eq!(farbe["idList"].as_array().map(Vec::len), Some(3));
    assert_eq!(farbe["recordCount"], 3);
    assert_eq!(farbe["sondermerkmal"], "");
    assert_eq!(farbe["fertigungsliste"], 0);
}

#[rstest]
#[actix_web::test]
async fn bulk_delete_of_vanished_rows_succeeds(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/bulk-delete")
        .set_json(json!({ "ids": [9001, 9002] }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["data"]["deletedCount"], 0);
    assert_eq!(body["data"]["deletedIds"], json!([]));
}

#[rstest]
#[case(json!({ "ids": [] }))]
#[case(json!({ "ids": [3, 0] }))]
#[case(json!({ "ids": "3" }))]
#[actix_web::test]
async fn bulk_delete_rejects_bad_id_lists(
    repo: Arc<InMemoryRecordRepository>,
    #[case] payload: Value,
) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/bulk-delete")
        .set_json(payload)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn bulk_delete_removes_listed_rows(repo: Arc<InMemoryRecordRepository>) {
    let ids = member_ids(&repo, "Farbe");
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/bulk-delete")
        .set_json(json!({ "ids": ids }))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["data"]["deletedCount"], 3);
    assert_eq!(repo.snapshot().len(), 1);
}

#[rstest]
#[actix_web::test]
async fn copy_then_create_from_copy(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let copy = actix_test::TestRequest::post()
        .uri("/api/groups/copy")
        .set_json(json!({
            "merkmal": "Farbe",
            "auspraegung": "rot",
            "drucktext": "Farbe: rot",
            "position": 1,
        }))
        .to_request();
    let copied: Value = actix_test::call_and_read_body_json(&app, copy).await;
    assert_eq!(copied["data"]["identnrs"], json!(["A", "B", "C"]));
    assert_eq!(copied["data"]["recordCount"], 3);
    let template = copied["data"]["template"].clone();

    let create = actix_test::TestRequest::post()
        .uri("/api/groups/create-from-copy")
        .set_json(json!({ "template": template, "identnrs": ["X", "A", "X"] }))
        .to_request();
    let response = actix_test::call_service(&app, create).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(response).await;
    assert_eq!(created["data"]["recordCount"], 1);
    assert_eq!(created["data"]["targetIdentnrs"], json!(["A", "X"]));
    assert_eq!(created["data"]["skippedIdentnrs"], json!(["A"]));
    assert_eq!(repo.snapshot().len(), 5);
}

#[rstest]
#[actix_web::test]
async fn copy_of_unknown_group_is_not_found(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/copy")
        .set_json(json!({ "merkmal": "Farbe", "auspraegung": "grün", "drucktext": "grün" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn reconcile_moves_group_to_target(repo: Arc<InMemoryRecordRepository>) {
    let ids = member_ids(&repo, "Farbe");
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/reconcile")
        .set_json(json!({
            "original": { "memberIds": ids, "memberIdentnrs": ["A", "B", "C"] },
            "target": { "fields": target_fields("Farbe: Rot"), "identnrs": ["B", "C", "D"] },
        }))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["data"]["added"], json!(["D"]));
    assert_eq!(body["data"]["removed"], json!(["A"]));
    assert_eq!(body["data"]["updated"], json!(["B", "C"]));

    let listing = actix_test::TestRequest::get().uri("/api/groups").to_request();
    let groups: Value = actix_test::call_and_read_body_json(&app, listing).await;
    let farbe = &groups["data"]["groups"][0];
    assert_eq!(farbe["drucktext"], "Farbe: Rot");
    assert_eq!(farbe["identnrList"], json!(["B", "C", "D"]));
}

#[rstest]
#[actix_web::test]
async fn reconcile_of_ghost_group_is_a_no_op(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/reconcile")
        .set_json(json!({
            "original": { "memberIds": [] },
            "target": { "fields": target_fields("Farbe: rot"), "identnrs": ["Z"] },
        }))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(
        body["data"],
        json!({ "added": [], "removed": [], "updated": [] })
    );
    assert_eq!(repo.snapshot().len(), 4);
}

#[rstest]
#[actix_web::test]
async fn reconcile_failure_reports_progress(repo: Arc<InMemoryRecordRepository>) {
    let ids = member_ids(&repo, "Farbe");
    repo.fail_on("delete_many", RecordRepositoryError::connection("reset by peer"));
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/reconcile")
        .set_json(json!({
            "original": { "memberIds": ids },
            "target": { "fields": target_fields("Farbe: rot"), "identnrs": ["B", "C", "D"] },
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["phase"], "remove");
    assert_eq!(body["details"]["added"], json!(["D"]));
}

#[rstest]
#[actix_web::test]
async fn reconcile_validates_target_fields(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/groups/reconcile")
        .set_json(json!({
            "original": { "memberIds": [1] },
            "target": { "fields": { "merkmal": "Farbe" }, "identnrs": ["A"] },
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
}

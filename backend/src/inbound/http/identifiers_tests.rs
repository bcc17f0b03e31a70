//! Tests for identnr HTTP handlers.

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
    repo.seed("4711", fields("Länge", "10 mm", "Länge 10 mm", 2));
    repo.seed("4711", fields("Farbe", "rot", "Farbe: rot", 1));
    repo.seed("4712", fields("Farbe", "rot", "Farbe: rot", 7));
    repo
}

#[rstest]
#[actix_web::test]
async fn list_and_count(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;

    let list = actix_test::TestRequest::get().uri("/api/identifiers").to_request();
    let listed: Value = actix_test::call_and_read_body_json(&app, list).await;
    assert_eq!(listed["data"], json!(["4711", "4712"]));

    let count = actix_test::TestRequest::get()
        .uri("/api/identifiers/count")
        .to_request();
    let counted: Value = actix_test::call_and_read_body_json(&app, count).await;
    assert_eq!(counted["data"]["uniqueIdentnrs"], 2);
    assert_eq!(counted["data"]["totalRecords"], 3);
    assert_eq!(counted["data"]["avgRecordsPerIdentnr"], 1.5);
}

#[rstest]
#[actix_web::test]
async fn records_of_identnr_are_ordered_by_position(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/identifiers/4711/records")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["data"]["identnr"], "4711");
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["records"][0]["merkmal"], "Farbe");
    assert_eq!(body["data"]["records"][1]["merkmal"], "Länge");
}

#[rstest]
#[actix_web::test]
async fn create_under_path_identnr(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/identifiers/4712/records")
        .set_json(json!({
            "identnr": "ignored",
            "merkmal": "Gewicht",
            "auspraegung": "5 kg",
            "drucktext": "Gewicht 5 kg",
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["data"]["identnr"], "4712");
}

#[rstest]
#[actix_web::test]
async fn register_creates_placeholder_once(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let register = || {
        actix_test::TestRequest::post()
            .uri("/api/identifiers")
            .set_json(json!({ "identnr": "N1" }))
            .to_request()
    };

    let first = actix_test::call_service(&app, register()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(first).await;
    assert_eq!(body["data"]["existed"], false);
    assert_eq!(body["data"]["record"]["merkmal"], "PLACEHOLDER");
    assert_eq!(body["data"]["record"]["position"], 8);

    let second = actix_test::call_service(&app, register()).await;
    assert_eq!(second.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(second).await;
    assert_eq!(body["data"]["existed"], true);
    assert!(body["data"].get("record").is_none());
}

#[rstest]
#[actix_web::test]
async fn clone_copies_every_row(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/identifiers/clone")
        .set_json(json!({ "sourceIdentnr": "4711", "targetIdentnr": "4800" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["data"]["targetIdentnr"], "4800");
    assert_eq!(body["data"]["recordCount"], 2);
    assert_eq!(repo.snapshot().len(), 5);
}

#[rstest]
#[case("4711", "4712", StatusCode::BAD_REQUEST)]
#[case("4711", "4711", StatusCode::BAD_REQUEST)]
#[case("9999", "4800", StatusCode::NOT_FOUND)]
#[actix_web::test]
async fn clone_preconditions(
    repo: Arc<InMemoryRecordRepository>,
    #[case] source: &str,
    #[case] target: &str,
    #[case] expected: StatusCode,
) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/identifiers/clone")
        .set_json(json!({ "sourceIdentnr": source, "targetIdentnr": target }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), expected);
    assert_eq!(repo.snapshot().len(), 3);
}

#[rstest]
#[actix_web::test]
async fn delete_removes_all_rows_then_reports_not_found(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo.clone())).await;
    let delete = || {
        actix_test::TestRequest::delete()
            .uri("/api/identifiers/4711")
            .to_request()
    };

    let first = actix_test::call_service(&app, delete()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(first).await;
    assert_eq!(body["data"]["deletedCount"], 2);
    assert_eq!(repo.snapshot().len(), 1);

    let second = actix_test::call_service(&app, delete()).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn duplicates_report_owners_with_several_rows(repo: Arc<InMemoryRecordRepository>) {
    let app = actix_test::init_service(test_app(repo)).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/identifiers/duplicates")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    let data = &body["data"];
    assert_eq!(data["hasDuplicates"], true);
    assert_eq!(data["duplicateCount"], 1);
    assert_eq!(
        data["duplicates"],
        json!([{ "identnr": "4711", "recordCount": 2, "firstId": 1, "lastId": 2 }])
    );
    assert_eq!(data["stats"]["duplicateIdentnrs"], 1);
    assert_eq!(data["stats"]["totalRecords"], 3);
}

//! Integration tests for the Diesel record repository against embedded
//! PostgreSQL.
//!
//! Each test provisions its own database, applies the embedded migrations and
//! drives the adapter through the domain port. Suites skip when the cluster
//! cannot start unless `MERKMAL_REQUIRE_TEST_CLUSTER` is set.

use merkmal_backend::domain::ports::{RecordFilter, RecordRepository, RecordRepositoryError};
use merkmal_backend::domain::{AttributeFields, Identnr, NewRecord};
use merkmal_backend::outbound::persistence::{
    DbPool, DieselRecordRepository, PoolConfig, run_pending_migrations,
};
use pagination::{PageLimits, PageRequest};
use rstest::rstest;
use tokio::runtime::Runtime;

mod support;

use support::{ProvisionedDatabase, handle_cluster_setup_failure, provision_database};

fn fields(merkmal: &str, auspraegung: &str, position: i32) -> AttributeFields {
    AttributeFields {
        merkmal: merkmal.to_owned(),
        auspraegung: auspraegung.to_owned(),
        drucktext: format!("{merkmal}: {auspraegung}"),
        sondermerkmal: None,
        position,
        sonder_abt: 0,
        fertigungsliste: None,
    }
}

fn new_record(identnr: &str, merkmal: &str, auspraegung: &str, position: i32) -> NewRecord {
    NewRecord::for_owner(
        Identnr::new(identnr).expect("valid identnr"),
        fields(merkmal, auspraegung, position),
    )
}

fn setup(runtime: &Runtime) -> Option<(ProvisionedDatabase, DieselRecordRepository)> {
    let database = match provision_database() {
        Ok(database) => database,
        Err(reason) => return handle_cluster_setup_failure(reason),
    };
    let repository = runtime.block_on(async {
        run_pending_migrations(database.url())
            .await
            .expect("migrations apply");
        let pool = DbPool::new(PoolConfig::new(database.url()).with_max_size(2))
            .await
            .expect("pool builds");
        DieselRecordRepository::new(pool)
    });
    Some((database, repository))
}

#[rstest]
fn insert_rejects_duplicate_identity() {
    let runtime = Runtime::new().expect("runtime");
    let Some((_db, repo)) = setup(&runtime) else {
        return;
    };

    runtime.block_on(async {
        let first = repo
            .insert(&new_record("4711", "Farbe", "rot", 1))
            .await
            .expect("first insert");
        assert_eq!(first.identnr, "4711");
        assert_eq!(first.fields.sondermerkmal, None);

        let clash = repo.insert(&new_record("4711", "Farbe", "rot", 5)).await;
        assert!(matches!(clash, Err(RecordRepositoryError::Duplicate { .. })));

        let duplicate = repo
            .find_duplicate(&new_record("4711", "Farbe", "rot", 9), None)
            .await
            .expect("duplicate lookup");
        assert_eq!(duplicate, Some(first.id));
        let excluded = repo
            .find_duplicate(&new_record("4711", "Farbe", "rot", 9), Some(first.id))
            .await
            .expect("duplicate lookup");
        assert_eq!(excluded, None);
    });
}

#[rstest]
fn listing_filters_and_orders_by_position() {
    let runtime = Runtime::new().expect("runtime");
    let Some((_db, repo)) = setup(&runtime) else {
        return;
    };

    runtime.block_on(async {
        repo.insert(&new_record("4711", "Länge", "10 mm", 2))
            .await
            .expect("insert");
        repo.insert(&new_record("4711", "Farbe", "rot", 1))
            .await
            .expect("insert");
        repo.insert(&new_record("4712", "Farbe", "blau", 1))
            .await
            .expect("insert");

        let owner = Identnr::new("4711").expect("valid identnr");
        let owned = repo.find_by_identnr(&owner).await.expect("by identnr");
        let merkmale: Vec<_> = owned.iter().map(|r| r.fields.merkmal.as_str()).collect();
        assert_eq!(merkmale, ["Farbe", "Länge"]);

        let filter = RecordFilter {
            merkmal: Some("farb".to_owned()),
            ..RecordFilter::default()
        };
        let page = repo
            .list_page(&filter, PageRequest::first(PageLimits::new(25, 100)))
            .await
            .expect("page");
        assert_eq!(page.pagination.total_count, 2);
        assert!(page.items.iter().all(|r| r.fields.merkmal == "Farbe"));

        assert_eq!(repo.count_all().await.expect("count"), 3);
        assert_eq!(
            repo.distinct_identnrs().await.expect("identnrs"),
            ["4711", "4712"]
        );
        assert_eq!(repo.max_position().await.expect("max"), Some(2));
    });
}

#[rstest]
fn bulk_and_owner_deletes_report_removed_rows() {
    let runtime = Runtime::new().expect("runtime");
    let Some((_db, repo)) = setup(&runtime) else {
        return;
    };

    runtime.block_on(async {
        let a = repo
            .insert(&new_record("4711", "Farbe", "rot", 1))
            .await
            .expect("insert");
        let b = repo
            .insert(&new_record("4712", "Farbe", "rot", 1))
            .await
            .expect("insert");
        repo.insert(&new_record("4713", "Farbe", "rot", 1))
            .await
            .expect("insert");
        repo.insert(&new_record("4713", "Länge", "10 mm", 2))
            .await
            .expect("insert");

        let missing = merkmal_backend::domain::RecordId::new(b.id.get() + 1000);
        let deleted = repo
            .delete_many(&[b.id, a.id, missing])
            .await
            .expect("bulk delete");
        assert_eq!(deleted, [a.id, b.id]);

        let owner = Identnr::new("4713").expect("valid identnr");
        assert_eq!(repo.delete_by_identnr(&owner).await.expect("owner delete"), 2);
        assert_eq!(repo.count_by_identnr(&owner).await.expect("count"), 0);
        assert_eq!(repo.count_all().await.expect("count"), 0);
    });
}

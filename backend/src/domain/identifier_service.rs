//! Identnr-scoped use cases: listing, statistics, registration, cloning and
//! copying single records to other owners.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::info;

use super::ports::RecordRepository;
use super::record_service::{
    RecordService, insert_unless_duplicate, map_repository_error, parse_identnr,
};
use super::{AttributeFields, AttributeRecord, Error, Identnr, NewRecord, RecordDraft, RecordId};

/// Merkmal and auspraegung of a freshly registered identnr's placeholder row.
pub const PLACEHOLDER_TEXT: &str = "PLACEHOLDER";
/// Drucktext of a placeholder row.
pub const PLACEHOLDER_DRUCKTEXT: &str = "PLACEHOLDER - Bitte bearbeiten";

/// Aggregate counts over all owners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentifierStats {
    /// Number of distinct identnrs.
    pub unique_identnrs: u64,
    /// Number of stored records.
    pub total_records: u64,
    /// Records per identnr rounded to two decimals, `0.0` when empty.
    pub avg_records_per_identnr: f64,
}

impl IdentifierStats {
    fn new(unique_identnrs: u64, total_records: u64) -> Self {
        let avg = if unique_identnrs == 0 {
            0.0
        } else {
            let ratio = total_records as f64 / unique_identnrs as f64;
            (ratio * 100.0).round() / 100.0
        };
        Self {
            unique_identnrs,
            total_records,
            avg_records_per_identnr: avg,
        }
    }
}

/// An identnr owning more than one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiRecordIdentnr {
    /// The owner.
    pub identnr: String,
    /// Rows it owns.
    pub record_count: u64,
    /// Lowest row id.
    pub first_id: RecordId,
    /// Highest row id.
    pub last_id: RecordId,
}

/// Owners with several rows, most rows first, plus overall counts.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiRecordReport {
    /// Owners with more than one row, by count descending then identnr.
    pub identnrs: Vec<MultiRecordIdentnr>,
    /// Counts over every owner.
    pub stats: IdentifierStats,
}

/// Result of registering an identnr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Registered identnr.
    pub identnr: Identnr,
    /// Placeholder row created for a new identnr; `None` if it already existed.
    pub placeholder: Option<AttributeRecord>,
}

impl Registration {
    /// Whether the identnr owned rows before the call.
    #[must_use]
    pub fn existed(&self) -> bool {
        self.placeholder.is_none()
    }
}

/// Result of copying every row of one identnr to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    /// Copied-from owner.
    pub source: Identnr,
    /// Copied-to owner.
    pub target: Identnr,
    /// Rows created under `target`.
    pub cloned: Vec<AttributeRecord>,
}

/// Result of copying one row to several owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCopyOutcome {
    /// The copied row.
    pub original: AttributeRecord,
    /// Rows actually created.
    pub created: Vec<AttributeRecord>,
}

impl RecordCopyOutcome {
    /// Owners of the created rows.
    #[must_use]
    pub fn copied_to(&self) -> Vec<String> {
        self.created.iter().map(|r| r.identnr.clone()).collect()
    }
}

/// Identnr use cases backed by a [`RecordRepository`].
#[derive(Clone)]
pub struct IdentifierService {
    repo: Arc<dyn RecordRepository>,
    records: RecordService,
}

impl IdentifierService {
    /// Create the service.
    pub fn new(repo: Arc<dyn RecordRepository>) -> Self {
        let records = RecordService::new(repo.clone());
        Self { repo, records }
    }

    /// Distinct identnrs, ascending.
    pub async fn list(&self) -> Result<Vec<String>, Error> {
        self.repo
            .distinct_identnrs()
            .await
            .map_err(map_repository_error)
    }

    /// Owner and record counts.
    pub async fn stats(&self) -> Result<IdentifierStats, Error> {
        let unique = self.list().await?.len() as u64;
        let total = self.repo.count_all().await.map_err(map_repository_error)?;
        Ok(IdentifierStats::new(unique, total))
    }

    /// Owners that hold more than one row, with their id range.
    pub async fn multi_record_identnrs(&self) -> Result<MultiRecordReport, Error> {
        let records = self.repo.list_all().await.map_err(map_repository_error)?;
        let total = records.len() as u64;
        let mut owners: BTreeMap<String, MultiRecordIdentnr> = BTreeMap::new();
        for record in records {
            owners
                .entry(record.identnr.clone())
                .and_modify(|owner| {
                    owner.record_count += 1;
                    owner.first_id = owner.first_id.min(record.id);
                    owner.last_id = owner.last_id.max(record.id);
                })
                .or_insert(MultiRecordIdentnr {
                    identnr: record.identnr,
                    record_count: 1,
                    first_id: record.id,
                    last_id: record.id,
                });
        }
        let stats = IdentifierStats::new(owners.len() as u64, total);
        let mut identnrs: Vec<_> = owners
            .into_values()
            .filter(|owner| owner.record_count > 1)
            .collect();
        identnrs.sort_by(|a, b| {
            b.record_count
                .cmp(&a.record_count)
                .then_with(|| a.identnr.cmp(&b.identnr))
        });
        Ok(MultiRecordReport { identnrs, stats })
    }

    /// Rows of one identnr ordered by position, merkmal, id.
    pub async fn records_for(&self, identnr: &str) -> Result<Vec<AttributeRecord>, Error> {
        let identnr = parse_identnr(identnr)?;
        self.repo
            .find_by_identnr(&identnr)
            .await
            .map_err(map_repository_error)
    }

    /// Create a row owned by `identnr`; any identnr in `draft` is ignored.
    pub async fn create_for(&self, identnr: &str, draft: RecordDraft) -> Result<AttributeRecord, Error> {
        let draft = RecordDraft {
            identnr: Some(identnr.to_owned()),
            ..draft
        };
        self.records.create(draft).await
    }

    /// Delete every row of `identnr`, returning how many went.
    pub async fn delete_all(&self, identnr: &str) -> Result<u64, Error> {
        let identnr = parse_identnr(identnr)?;
        let deleted = self
            .repo
            .delete_by_identnr(&identnr)
            .await
            .map_err(map_repository_error)?;
        if deleted == 0 {
            return Err(Error::not_found(format!(
                "identnr '{identnr}' has no records"
            )));
        }
        info!(identnr = %identnr, deleted, "identnr deleted");
        Ok(deleted)
    }

    /// Make `identnr` known, creating a placeholder row when it owns none.
    pub async fn register(&self, identnr: &str) -> Result<Registration, Error> {
        let identnr = parse_identnr(identnr)?;
        let owned = self
            .repo
            .count_by_identnr(&identnr)
            .await
            .map_err(map_repository_error)?;
        if owned > 0 {
            return Ok(Registration {
                identnr,
                placeholder: None,
            });
        }

        let position = self
            .repo
            .max_position()
            .await
            .map_err(map_repository_error)?
            .map_or(1, |max| max.saturating_add(1));
        let record = NewRecord::for_owner(identnr.clone(), placeholder_fields(position));
        let placeholder = self
            .repo
            .insert(&record)
            .await
            .map_err(map_repository_error)?;
        info!(identnr = %identnr, id = %placeholder.id, "identnr registered");
        Ok(Registration {
            identnr,
            placeholder: Some(placeholder),
        })
    }

    /// Copy every row of `source` to the empty identnr `target`.
    pub async fn clone_identnr(&self, source: &str, target: &str) -> Result<CloneOutcome, Error> {
        let source = parse_identnr(source)?;
        let target = parse_identnr(target)?;
        if source == target {
            return Err(Error::invalid_request(
                "source and target identnr must differ",
            ));
        }
        let occupied = self
            .repo
            .count_by_identnr(&target)
            .await
            .map_err(map_repository_error)?;
        if occupied > 0 {
            return Err(Error::conflict(format!(
                "target identnr '{target}' already has {occupied} records"
            )));
        }
        let rows = self
            .repo
            .find_by_identnr(&source)
            .await
            .map_err(map_repository_error)?;
        if rows.is_empty() {
            return Err(Error::not_found(format!(
                "source identnr '{source}' has no records"
            )));
        }

        let mut cloned = Vec::with_capacity(rows.len());
        for row in rows {
            let record = NewRecord::for_owner(target.clone(), row.fields);
            let created = self
                .repo
                .insert(&record)
                .await
                .map_err(map_repository_error)?;
            cloned.push(created);
        }
        info!(source = %source, target = %target, count = cloned.len(), "identnr cloned");
        Ok(CloneOutcome {
            source,
            target,
            cloned,
        })
    }

    /// Duplicate row `id` under each of `targets`, skipping its own owner and
    /// owners that already hold an identical row.
    pub async fn copy_record(
        &self,
        id: RecordId,
        targets: &[String],
    ) -> Result<RecordCopyOutcome, Error> {
        if targets.is_empty() {
            return Err(Error::invalid_request(
                "identnrs must contain at least one identnr",
            ));
        }
        let targets = targets
            .iter()
            .map(|raw| parse_identnr(raw))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let original = self.records.get(id).await?;

        let mut created = Vec::new();
        for target in targets
            .into_iter()
            .filter(|target| target.as_str() != original.identnr)
        {
            let record = NewRecord::for_owner(target, original.fields.clone());
            if let Some(row) = insert_unless_duplicate(self.repo.as_ref(), &record).await? {
                created.push(row);
            }
        }
        info!(%id, created = created.len(), "record copied to identnrs");
        Ok(RecordCopyOutcome { original, created })
    }
}

fn placeholder_fields(position: i32) -> AttributeFields {
    AttributeFields {
        merkmal: PLACEHOLDER_TEXT.to_owned(),
        auspraegung: PLACEHOLDER_TEXT.to_owned(),
        drucktext: PLACEHOLDER_DRUCKTEXT.to_owned(),
        sondermerkmal: Some(String::new()),
        position,
        sonder_abt: 0,
        fertigungsliste: Some(0),
    }
}

#[cfg(test)]
mod tests {
    //! Registration, cloning and copy rules.

    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::InMemoryRecordRepository;

    fn fields(merkmal: &str, position: i32) -> AttributeFields {
        AttributeFields {
            merkmal: merkmal.to_owned(),
            auspraegung: "ja".to_owned(),
            drucktext: format!("{merkmal} ja"),
            sondermerkmal: None,
            position,
            sonder_abt: 0,
            fertigungsliste: Some(0),
        }
    }

    #[fixture]
    fn repo() -> Arc<InMemoryRecordRepository> {
        let repo = Arc::new(InMemoryRecordRepository::new());
        repo.seed("X", fields("Farbe", 1));
        repo.seed("X", fields("Material", 4));
        repo.seed("Y", fields("Farbe", 2));
        repo
    }

    #[rstest]
    #[tokio::test]
    async fn multi_record_owners_are_ranked_by_row_count(repo: Arc<InMemoryRecordRepository>) {
        repo.seed("Y", fields("Material", 5));
        repo.seed("Y", fields("Länge", 6));
        repo.seed("W", fields("Farbe", 1));
        let service = IdentifierService::new(repo);

        let report = service.multi_record_identnrs().await.expect("report");

        let ranked: Vec<_> = report
            .identnrs
            .iter()
            .map(|owner| (owner.identnr.as_str(), owner.record_count, owner.first_id.get(), owner.last_id.get()))
            .collect();
        assert_eq!(ranked, vec![("Y", 3, 3, 5), ("X", 2, 1, 2)]);
        assert_eq!(report.stats.unique_identnrs, 3);
        assert_eq!(report.stats.total_records, 6);
        assert!((report.stats.avg_records_per_identnr - 2.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test]
    async fn clone_into_populated_target_is_a_conflict(repo: Arc<InMemoryRecordRepository>) {
        let service = IdentifierService::new(repo.clone());
        let err = service
            .clone_identnr("X", "Y")
            .await
            .expect_err("target populated");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(repo.snapshot().len(), 3);
    }

    #[rstest]
    #[case("Q", "Z", ErrorCode::NotFound)]
    #[case("X", "X", ErrorCode::InvalidRequest)]
    #[tokio::test]
    async fn clone_preconditions(
        repo: Arc<InMemoryRecordRepository>,
        #[case] source: &str,
        #[case] target: &str,
        #[case] expected: ErrorCode,
    ) {
        let service = IdentifierService::new(repo);
        let err = service
            .clone_identnr(source, target)
            .await
            .expect_err("precondition");
        assert_eq!(err.code(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn clone_copies_every_row(repo: Arc<InMemoryRecordRepository>) {
        let service = IdentifierService::new(repo);
        let outcome = service.clone_identnr("X", "Z").await.expect("cloned");
        assert_eq!(outcome.cloned.len(), 2);
        assert!(outcome.cloned.iter().all(|row| row.identnr == "Z"));
        assert_eq!(
            service.records_for("Z").await.expect("rows").len(),
            2
        );
    }

    #[rstest]
    #[tokio::test]
    async fn copy_skips_owner_and_existing_duplicates(repo: Arc<InMemoryRecordRepository>) {
        let service = IdentifierService::new(repo);
        // Row 3 is Y/Farbe; X already holds an identical Farbe row.
        let outcome = service
            .copy_record(
                RecordId::new(3),
                &["X".to_owned(), "Y".to_owned(), "W".to_owned()],
            )
            .await
            .expect("copied");
        assert_eq!(outcome.copied_to(), vec!["W"]);
        assert_eq!(outcome.created[0].fields.position, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn register_creates_placeholder_after_highest_position(
        repo: Arc<InMemoryRecordRepository>,
    ) {
        let service = IdentifierService::new(repo);
        let fresh = service.register("N1").await.expect("registered");
        assert!(!fresh.existed());
        let placeholder = fresh.placeholder.expect("placeholder");
        assert_eq!(placeholder.fields.position, 5);
        assert_eq!(placeholder.fields.drucktext, PLACEHOLDER_DRUCKTEXT);

        let again = service.register("N1").await.expect("known");
        assert!(again.existed());
    }

    #[rstest]
    #[tokio::test]
    async fn stats_round_average(repo: Arc<InMemoryRecordRepository>) {
        let service = IdentifierService::new(repo);
        let stats = service.stats().await.expect("stats");
        assert_eq!(stats.unique_identnrs, 2);
        assert_eq!(stats.total_records, 3);
        assert!((stats.avg_records_per_identnr - 1.5).abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test]
    async fn stats_of_empty_store_are_zero() {
        let service = IdentifierService::new(Arc::new(InMemoryRecordRepository::new()));
        let stats = service.stats().await.expect("stats");
        assert_eq!(stats.unique_identnrs, 0);
        assert!(stats.avg_records_per_identnr.abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_all_of_unknown_identnr_is_not_found(repo: Arc<InMemoryRecordRepository>) {
        let service = IdentifierService::new(repo);
        let err = service.delete_all("nobody").await.expect_err("none");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(service.delete_all("X").await.expect("deleted"), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn create_for_uses_path_identnr(repo: Arc<InMemoryRecordRepository>) {
        let service = IdentifierService::new(repo);
        let draft = RecordDraft {
            identnr: Some("ignored".to_owned()),
            merkmal: Some("Gewicht".to_owned()),
            auspraegung: Some("5kg".to_owned()),
            drucktext: Some("Gewicht 5kg".to_owned()),
            ..RecordDraft::default()
        };
        let created = service.create_for("X", draft).await.expect("created");
        assert_eq!(created.identnr, "X");
    }
}

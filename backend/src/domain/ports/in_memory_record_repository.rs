//! Process-local [`RecordRepository`] used by tests and store-less runs.
//!
//! Enforces the uniqueness rule the way the database constraint does and can
//! be told to fail named operations, which lets tests exercise partial
//! failures of multi-step workflows.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::{AttributeFields, AttributeRecord, Identnr, NewRecord, RecordId};

use super::record_repository::same_identity;
use super::{RecordFilter, RecordRepository, RecordRepositoryError, StoreHealthProbe, StoreProbeError};

#[derive(Debug, Default)]
struct State {
    next_id: i32,
    records: BTreeMap<RecordId, AttributeRecord>,
    failures: HashMap<&'static str, RecordRepositoryError>,
}

impl State {
    fn check(&self, operation: &'static str) -> Result<(), RecordRepositoryError> {
        self.failures
            .get(operation)
            .map_or(Ok(()), |error| Err(error.clone()))
    }

    fn duplicate_of(&self, record: &NewRecord, exclude: Option<RecordId>) -> Option<RecordId> {
        self.records
            .values()
            .find(|existing| Some(existing.id) != exclude && same_identity(existing, record))
            .map(|existing| existing.id)
    }

    fn allocate(&mut self, identnr: String, fields: AttributeFields) -> AttributeRecord {
        self.next_id += 1;
        let record = AttributeRecord {
            id: RecordId::new(self.next_id),
            identnr,
            fields,
        };
        self.records.insert(record.id, record.clone());
        record
    }

    fn sorted_by<K: Ord>(
        &self,
        keep: impl Fn(&AttributeRecord) -> bool,
        key: impl Fn(&AttributeRecord) -> K,
    ) -> Vec<AttributeRecord> {
        let mut records: Vec<_> = self.records.values().filter(|&record| keep(record)).cloned().collect();
        records.sort_by_key(|record| key(record));
        records
    }
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    state: Mutex<State>,
}

impl InMemoryRecordRepository {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rows verbatim, bypassing validation and uniqueness checks.
    pub fn seed(&self, identnr: &str, fields: AttributeFields) -> AttributeRecord {
        self.lock().allocate(identnr.to_owned(), fields)
    }

    /// Make every later call of `operation` fail with `error`.
    pub fn fail_on(&self, operation: &'static str, error: RecordRepositoryError) {
        self.lock().failures.insert(operation, error);
    }

    /// Undo [`Self::fail_on`] for `operation`.
    pub fn recover(&self, operation: &'static str) {
        self.lock().failures.remove(operation);
    }

    /// Snapshot of every stored record ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AttributeRecord> {
        self.lock().records.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn list_all(&self) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let state = self.lock();
        state.check("list_all")?;
        Ok(state.records.values().cloned().collect())
    }

    async fn list_page(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<AttributeRecord>, RecordRepositoryError> {
        let state = self.lock();
        state.check("list_page")?;
        let matching = state.sorted_by(
            |record| filter.matches(record),
            |record| {
                (
                    record.fields.position,
                    record.identnr.clone(),
                    record.fields.merkmal.clone(),
                    record.id,
                )
            },
        );
        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(Page::new(items, page, total))
    }

    async fn find_by_id(
        &self,
        id: RecordId,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError> {
        let state = self.lock();
        state.check("find_by_id")?;
        Ok(state.records.get(&id).cloned())
    }

    async fn find_by_ids(
        &self,
        ids: &[RecordId],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let state = self.lock();
        state.check("find_by_ids")?;
        Ok(state.sorted_by(|record| ids.contains(&record.id), |record| record.id))
    }

    async fn find_by_identnr(
        &self,
        identnr: &Identnr,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let state = self.lock();
        state.check("find_by_identnr")?;
        Ok(state.sorted_by(
            |record| record.identnr == identnr.as_str(),
            |record| (record.fields.position, record.fields.merkmal.clone(), record.id),
        ))
    }

    async fn find_by_text(
        &self,
        merkmal: &str,
        auspraegung: &str,
        drucktext: &str,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let state = self.lock();
        state.check("find_by_text")?;
        Ok(state.sorted_by(
            |record| {
                record.fields.merkmal == merkmal
                    && record.fields.auspraegung == auspraegung
                    && record.fields.drucktext == drucktext
            },
            |record| (record.identnr.clone(), record.fields.position, record.id),
        ))
    }

    async fn find_duplicate(
        &self,
        record: &NewRecord,
        exclude: Option<RecordId>,
    ) -> Result<Option<RecordId>, RecordRepositoryError> {
        let state = self.lock();
        state.check("find_duplicate")?;
        Ok(state.duplicate_of(record, exclude))
    }

    async fn insert(&self, record: &NewRecord) -> Result<AttributeRecord, RecordRepositoryError> {
        let mut state = self.lock();
        state.check("insert")?;
        if state.duplicate_of(record, None).is_some() {
            return Err(RecordRepositoryError::duplicate(record.identity_label()));
        }
        Ok(state.allocate(record.identnr.to_string(), record.fields.clone()))
    }

    async fn update(
        &self,
        id: RecordId,
        record: &NewRecord,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError> {
        let mut state = self.lock();
        state.check("update")?;
        if !state.records.contains_key(&id) {
            return Ok(None);
        }
        if state.duplicate_of(record, Some(id)).is_some() {
            return Err(RecordRepositoryError::duplicate(record.identity_label()));
        }
        let updated = AttributeRecord {
            id,
            identnr: record.identnr.to_string(),
            fields: record.fields.clone(),
        };
        state.records.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn update_positions(
        &self,
        positions: &[(RecordId, i32)],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let mut state = self.lock();
        state.check("update_positions")?;
        let mut updated = Vec::with_capacity(positions.len());
        for (id, position) in positions {
            if let Some(record) = state.records.get_mut(id) {
                record.fields.position = *position;
                updated.push(record.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, id: RecordId) -> Result<bool, RecordRepositoryError> {
        let mut state = self.lock();
        state.check("delete")?;
        Ok(state.records.remove(&id).is_some())
    }

    async fn delete_many(&self, ids: &[RecordId]) -> Result<Vec<RecordId>, RecordRepositoryError> {
        let mut state = self.lock();
        state.check("delete_many")?;
        let mut deleted: Vec<RecordId> = ids
            .iter()
            .filter(|id| state.records.remove(*id).is_some())
            .copied()
            .collect();
        deleted.sort_unstable();
        Ok(deleted)
    }

    async fn delete_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError> {
        let mut state = self.lock();
        state.check("delete_by_identnr")?;
        let before = state.records.len();
        state
            .records
            .retain(|_, record| record.identnr != identnr.as_str());
        Ok(u64::try_from(before - state.records.len()).unwrap_or(u64::MAX))
    }

    async fn distinct_identnrs(&self) -> Result<Vec<String>, RecordRepositoryError> {
        let state = self.lock();
        state.check("distinct_identnrs")?;
        let mut identnrs: Vec<String> = state
            .records
            .values()
            .map(|record| record.identnr.clone())
            .collect();
        identnrs.sort_unstable();
        identnrs.dedup();
        Ok(identnrs)
    }

    async fn count_all(&self) -> Result<u64, RecordRepositoryError> {
        let state = self.lock();
        state.check("count_all")?;
        Ok(u64::try_from(state.records.len()).unwrap_or(u64::MAX))
    }

    async fn count_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError> {
        let state = self.lock();
        state.check("count_by_identnr")?;
        let count = state
            .records
            .values()
            .filter(|record| record.identnr == identnr.as_str())
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn max_position(&self) -> Result<Option<i32>, RecordRepositoryError> {
        let state = self.lock();
        state.check("max_position")?;
        Ok(state.records.values().map(|record| record.fields.position).max())
    }
}

#[async_trait]
impl StoreHealthProbe for InMemoryRecordRepository {
    async fn ping(&self) -> Result<(), StoreProbeError> {
        match self.lock().check("ping") {
            Ok(()) => Ok(()),
            Err(error) => Err(StoreProbeError::unreachable(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagination::PageLimits;
    use rstest::{fixture, rstest};

    fn fields(merkmal: &str, position: i32) -> AttributeFields {
        AttributeFields {
            merkmal: merkmal.to_owned(),
            auspraegung: "rot".to_owned(),
            drucktext: "rot".to_owned(),
            sondermerkmal: Some(String::new()),
            position,
            sonder_abt: 0,
            fertigungsliste: Some(0),
        }
    }

    fn new_record(identnr: &str, merkmal: &str) -> NewRecord {
        NewRecord::for_owner(Identnr::new(identnr).expect("identnr"), fields(merkmal, 1))
    }

    #[fixture]
    fn repo() -> InMemoryRecordRepository {
        let repo = InMemoryRecordRepository::new();
        repo.seed("B", fields("Farbe", 2));
        repo.seed("A", fields("Material", 1));
        repo.seed("A", fields("Farbe", 1));
        repo
    }

    #[rstest]
    #[tokio::test]
    async fn insert_rejects_duplicate_identity(repo: InMemoryRecordRepository) {
        let err = repo
            .insert(&new_record("A", "Farbe"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RecordRepositoryError::Duplicate { .. }));
        assert_eq!(repo.snapshot().len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn list_page_orders_by_position_then_identnr(repo: InMemoryRecordRepository) {
        let request = PageRequest::from_query(Some(1), Some(2), PageLimits::new(25, 100));
        let page = repo
            .list_page(&RecordFilter::default(), request)
            .await
            .expect("page");
        let order: Vec<_> = page
            .items
            .iter()
            .map(|r| (r.identnr.as_str(), r.fields.merkmal.as_str()))
            .collect();
        assert_eq!(order, vec![("A", "Farbe"), ("A", "Material")]);
        assert_eq!(page.pagination.total_count, 3);
        assert!(page.pagination.has_next_page);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_many_reports_only_existing_ids(repo: InMemoryRecordRepository) {
        let deleted = repo
            .delete_many(&[RecordId::new(3), RecordId::new(99), RecordId::new(1)])
            .await
            .expect("delete");
        assert_eq!(deleted, vec![RecordId::new(1), RecordId::new(3)]);
    }

    #[rstest]
    #[tokio::test]
    async fn injected_failures_surface_until_recovered(repo: InMemoryRecordRepository) {
        repo.fail_on("count_all", RecordRepositoryError::connection("reset"));
        assert!(repo.count_all().await.is_err());
        repo.recover("count_all");
        assert_eq!(repo.count_all().await.expect("count"), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn update_ignores_own_identity(repo: InMemoryRecordRepository) {
        let mut record = new_record("A", "Farbe");
        record.fields.position = 9;
        let updated = repo
            .update(RecordId::new(3), &record)
            .await
            .expect("update")
            .expect("exists");
        assert_eq!(updated.fields.position, 9);
    }
}

//! Single-record use cases: listing, CRUD, similarity and repositioning.

use std::sync::Arc;

use pagination::{Page, PageLimits, PageRequest};
use serde_json::json;
use tracing::{debug, info};

use super::grouping::is_similar;
use super::ports::{RecordFilter, RecordRepository, RecordRepositoryError};
use super::{AttributeRecord, Error, Identnr, NewRecord, RecordDraft, RecordId, ValidationErrors};

/// Page bounds of the flat record listing.
pub const RECORD_PAGE_LIMITS: PageLimits = PageLimits::new(25, 100);
/// Page bounds of the filtered record listing.
pub const FILTER_PAGE_LIMITS: PageLimits = PageLimits::new(50, 500_000);

/// Summary message attached to every validation failure.
pub const VALIDATION_FAILED: &str = "Validierung fehlgeschlagen";

/// Records sharing characteristic text with one reference record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarRecords {
    /// The reference record.
    pub original_id: RecordId,
    /// Matching records, reference included, ordered by identnr then position.
    pub records: Vec<AttributeRecord>,
}

/// Map a repository failure onto the domain error taxonomy.
pub(crate) fn map_repository_error(error: RecordRepositoryError) -> Error {
    match error {
        RecordRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("record store unavailable: {message}"))
        }
        RecordRepositoryError::Timeout { operation } => {
            Error::timeout(format!("record store timed out during {operation}"))
        }
        RecordRepositoryError::Duplicate { message } => {
            Error::duplicate(format!("record already exists: {message}"))
        }
        RecordRepositoryError::Query { message } => {
            Error::internal(format!("record store error: {message}"))
        }
    }
}

/// Turn field failures into the client-facing validation error.
pub(crate) fn invalid_fields(errors: &ValidationErrors) -> Error {
    let fields: Vec<&str> = errors.errors().iter().map(|e| e.field()).collect();
    Error::invalid_request(VALIDATION_FAILED)
        .with_errors(errors.messages())
        .with_details(json!({ "fields": fields }))
}

/// Parse an identnr supplied by a caller.
pub(crate) fn parse_identnr(raw: &str) -> Result<Identnr, Error> {
    Identnr::new(raw).map_err(|error| {
        Error::invalid_request(VALIDATION_FAILED).with_errors(vec![error.to_string()])
    })
}

/// Insert `record` unless its identity already exists.
///
/// Returns `None` for skipped duplicates, including ones that slip past the
/// read check and hit the storage constraint.
pub(crate) async fn insert_unless_duplicate(
    repo: &dyn RecordRepository,
    record: &NewRecord,
) -> Result<Option<AttributeRecord>, Error> {
    if repo
        .find_duplicate(record, None)
        .await
        .map_err(map_repository_error)?
        .is_some()
    {
        debug!(identity = %record.identity_label(), "skipping duplicate record");
        return Ok(None);
    }
    match repo.insert(record).await {
        Ok(created) => Ok(Some(created)),
        Err(RecordRepositoryError::Duplicate { message }) => {
            debug!(%message, "storage rejected duplicate record");
            Ok(None)
        }
        Err(error) => Err(map_repository_error(error)),
    }
}

/// Record use cases backed by a [`RecordRepository`].
#[derive(Clone)]
pub struct RecordService {
    repo: Arc<dyn RecordRepository>,
}

impl RecordService {
    /// Create the service.
    pub fn new(repo: Arc<dyn RecordRepository>) -> Self {
        Self { repo }
    }

    /// Flat listing ordered by position, identnr, merkmal.
    pub async fn list(&self, page: PageRequest) -> Result<Page<AttributeRecord>, Error> {
        self.repo
            .list_page(&RecordFilter::default(), page)
            .await
            .map_err(map_repository_error)
    }

    /// Filtered listing; see [`RecordFilter`] for matching rules.
    pub async fn filter(
        &self,
        filter: RecordFilter,
        page: PageRequest,
    ) -> Result<Page<AttributeRecord>, Error> {
        self.repo
            .list_page(&filter.normalized(), page)
            .await
            .map_err(map_repository_error)
    }

    /// Fetch one record.
    pub async fn get(&self, id: RecordId) -> Result<AttributeRecord, Error> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| record_not_found(id))
    }

    /// Validate and insert a record, rejecting duplicates.
    pub async fn create(&self, draft: RecordDraft) -> Result<AttributeRecord, Error> {
        let record = draft.validate().map_err(|errors| invalid_fields(&errors))?;
        self.ensure_unique(&record, None).await?;
        let created = self
            .repo
            .insert(&record)
            .await
            .map_err(map_repository_error)?;
        info!(id = %created.id, identnr = %created.identnr, "record created");
        Ok(created)
    }

    /// Replace every field of an existing record.
    pub async fn replace(&self, id: RecordId, draft: RecordDraft) -> Result<AttributeRecord, Error> {
        let record = draft.validate().map_err(|errors| invalid_fields(&errors))?;
        self.write(id, &record).await
    }

    /// Merge the set fields of `patch` over an existing record.
    pub async fn patch(&self, id: RecordId, patch: RecordDraft) -> Result<AttributeRecord, Error> {
        if patch.is_empty() {
            return Err(Error::invalid_request(
                "at least one field must be provided for a partial update",
            ));
        }
        let current = self.get(id).await?;
        let record = patch
            .overlay(RecordDraft::from_record(&current))
            .validate()
            .map_err(|errors| invalid_fields(&errors))?;
        self.write(id, &record).await
    }

    /// Delete one record.
    pub async fn delete(&self, id: RecordId) -> Result<RecordId, Error> {
        let deleted = self.repo.delete(id).await.map_err(map_repository_error)?;
        if !deleted {
            return Err(record_not_found(id));
        }
        info!(%id, "record deleted");
        Ok(id)
    }

    /// Records with the same merkmal, auspraegung, drucktext and sondermerkmal.
    pub async fn similar(&self, id: RecordId) -> Result<SimilarRecords, Error> {
        let original = self.get(id).await?;
        let fields = &original.fields;
        let candidates = self
            .repo
            .find_by_text(&fields.merkmal, &fields.auspraegung, &fields.drucktext)
            .await
            .map_err(map_repository_error)?;
        let records = candidates
            .into_iter()
            .filter(|candidate| is_similar(&candidate.fields, fields))
            .collect();
        Ok(SimilarRecords {
            original_id: id,
            records,
        })
    }

    /// Give every record of `identnr` with `merkmal` consecutive positions
    /// starting at `new_position`, keeping their current relative order.
    pub async fn reposition(
        &self,
        identnr: &str,
        merkmal: &str,
        new_position: i64,
    ) -> Result<Vec<AttributeRecord>, Error> {
        let identnr = parse_identnr(identnr)?;
        let merkmal = merkmal.trim();
        if merkmal.is_empty() {
            return Err(Error::invalid_request(VALIDATION_FAILED)
                .with_errors(vec!["merkmal is required".to_owned()]));
        }
        let start = i32::try_from(new_position)
            .ok()
            .filter(|start| *start >= 1)
            .ok_or_else(|| {
                Error::invalid_request(VALIDATION_FAILED)
                    .with_errors(vec!["newPosition must be a number greater than 0".to_owned()])
            })?;

        let records = self
            .repo
            .find_by_identnr(&identnr)
            .await
            .map_err(map_repository_error)?;
        let mut positions = Vec::new();
        for (record, offset) in records
            .iter()
            .filter(|record| record.fields.merkmal == merkmal)
            .zip(0_i32..)
        {
            let position = start.checked_add(offset).ok_or_else(|| {
                Error::invalid_request("newPosition leaves no room for the following records")
            })?;
            positions.push((record.id, position));
        }
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let updated = self
            .repo
            .update_positions(&positions)
            .await
            .map_err(map_repository_error)?;
        info!(identnr = %identnr, merkmal, count = updated.len(), "records repositioned");
        Ok(updated)
    }

    async fn ensure_unique(&self, record: &NewRecord, exclude: Option<RecordId>) -> Result<(), Error> {
        let existing = self
            .repo
            .find_duplicate(record, exclude)
            .await
            .map_err(map_repository_error)?;
        match existing {
            Some(existing_id) => Err(Error::duplicate(format!(
                "record already exists: {}",
                record.identity_label()
            ))
            .with_details(json!({ "existingId": existing_id.get() }))),
            None => Ok(()),
        }
    }

    async fn write(&self, id: RecordId, record: &NewRecord) -> Result<AttributeRecord, Error> {
        self.ensure_unique(record, Some(id)).await?;
        let updated = self
            .repo
            .update(id, record)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| record_not_found(id))?;
        info!(%id, identnr = %updated.identnr, "record updated");
        Ok(updated)
    }
}

fn record_not_found(id: RecordId) -> Error {
    Error::not_found(format!("record {id} not found"))
}

#[cfg(test)]
#[path = "record_service_tests.rs"]
mod tests;

//! Port abstraction for attribute record persistence.
//!
//! Every operation is its own unit of work. Multi-step workflows in the
//! services compose these calls without a spanning transaction, so each
//! method must leave the store consistent on its own.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::grouping::normalize_fertigungsliste;
use crate::domain::{AttributeRecord, Identnr, NewRecord, RecordId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by record repository adapters.
    pub enum RecordRepositoryError {
        /// The store could not be reached or dropped the connection.
        Connection { message: String } => "record store connection failed: {message}",
        /// A statement failed for a non-transient reason.
        Query { message: String } => "record store query failed: {message}",
        /// The store rejected a write that breaks record uniqueness.
        Duplicate { message: String } => "duplicate record: {message}",
        /// The store did not answer within the operation deadline.
        Timeout { operation: String } => "record store timed out during {operation}",
    }
}

impl RecordRepositoryError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Listing filter.
///
/// Text criteria are case-insensitive substring matches, numeric criteria are
/// exact. A non-blank `quick_search` replaces every other criterion with an
/// OR across the five text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Substring of the identnr.
    pub identnr: Option<String>,
    /// Substring of the merkmal.
    pub merkmal: Option<String>,
    /// Substring of the auspraegung.
    pub auspraegung: Option<String>,
    /// Substring of the drucktext.
    pub drucktext: Option<String>,
    /// Substring of the sondermerkmal.
    pub sondermerkmal: Option<String>,
    /// Exact position.
    pub position: Option<i32>,
    /// Exact special department.
    pub sonder_abt: Option<i32>,
    /// Exact production flag; `0` also matches unset flags.
    pub fertigungsliste: Option<i32>,
    /// Free text searched across all text fields.
    pub quick_search: Option<String>,
}

impl RecordFilter {
    /// Trim criteria, drop blank ones and let `quick_search` win.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty())
        };
        match clean(self.quick_search) {
            Some(quick_search) => Self {
                quick_search: Some(quick_search),
                ..Self::default()
            },
            None => Self {
                identnr: clean(self.identnr),
                merkmal: clean(self.merkmal),
                auspraegung: clean(self.auspraegung),
                drucktext: clean(self.drucktext),
                sondermerkmal: clean(self.sondermerkmal),
                quick_search: None,
                ..self
            },
        }
    }

    /// Evaluate the filter against one record.
    ///
    /// Adapters that cannot push the filter into the store use this directly;
    /// SQL adapters must agree with it.
    #[must_use]
    pub fn matches(&self, record: &AttributeRecord) -> bool {
        let fields = &record.fields;
        let sondermerkmal = fields.sondermerkmal.as_deref().unwrap_or_default();
        if let Some(needle) = &self.quick_search {
            return [
                record.identnr.as_str(),
                fields.merkmal.as_str(),
                fields.auspraegung.as_str(),
                fields.drucktext.as_str(),
                sondermerkmal,
            ]
            .into_iter()
            .any(|haystack| contains_ignore_case(haystack, needle));
        }

        let text = |criterion: &Option<String>, haystack: &str| {
            criterion
                .as_deref()
                .is_none_or(|needle| contains_ignore_case(haystack, needle))
        };
        text(&self.identnr, &record.identnr)
            && text(&self.merkmal, &fields.merkmal)
            && text(&self.auspraegung, &fields.auspraegung)
            && text(&self.drucktext, &fields.drucktext)
            && text(&self.sondermerkmal, sondermerkmal)
            && self.position.is_none_or(|p| p == fields.position)
            && self.sonder_abt.is_none_or(|d| d == fields.sonder_abt)
            && self.fertigungsliste.is_none_or(|flag| {
                normalize_fertigungsliste(Some(flag))
                    == normalize_fertigungsliste(fields.fertigungsliste)
            })
    }

    /// True when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Records equal to `record` under the uniqueness rule.
///
/// Exposed so adapters without a storage constraint share one definition.
#[must_use]
pub fn same_identity(record: &AttributeRecord, candidate: &NewRecord) -> bool {
    record.identnr == candidate.identnr.as_str()
        && record.fields.merkmal == candidate.fields.merkmal
        && record.fields.auspraegung == candidate.fields.auspraegung
        && record.fields.drucktext == candidate.fields.drucktext
}

/// Persistence port for attribute records.
///
/// Listing methods document their ordering; callers rely on it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Every record, ordered by id.
    async fn list_all(&self) -> Result<Vec<AttributeRecord>, RecordRepositoryError>;

    /// One page of matching records ordered by position, identnr, merkmal, id.
    async fn list_page(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<AttributeRecord>, RecordRepositoryError>;

    /// Record by id.
    async fn find_by_id(&self, id: RecordId)
    -> Result<Option<AttributeRecord>, RecordRepositoryError>;

    /// Existing records among `ids`, ordered by id. Unknown ids are skipped.
    async fn find_by_ids(
        &self,
        ids: &[RecordId],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError>;

    /// Records owned by `identnr`, ordered by position, merkmal, id.
    async fn find_by_identnr(
        &self,
        identnr: &Identnr,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError>;

    /// Records with the given characteristic text, ordered by identnr,
    /// position, id.
    async fn find_by_text(
        &self,
        merkmal: &str,
        auspraegung: &str,
        drucktext: &str,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError>;

    /// Id of a record sharing `record`'s uniqueness tuple, ignoring `exclude`.
    async fn find_duplicate(
        &self,
        record: &NewRecord,
        exclude: Option<RecordId>,
    ) -> Result<Option<RecordId>, RecordRepositoryError>;

    /// Insert a record and return it with its assigned id.
    async fn insert(&self, record: &NewRecord) -> Result<AttributeRecord, RecordRepositoryError>;

    /// Overwrite every field of record `id`; `None` when it does not exist.
    async fn update(
        &self,
        id: RecordId,
        record: &NewRecord,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError>;

    /// Assign new positions in one unit of work and return the updated rows.
    async fn update_positions(
        &self,
        positions: &[(RecordId, i32)],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError>;

    /// Delete record `id`; `false` when it did not exist.
    async fn delete(&self, id: RecordId) -> Result<bool, RecordRepositoryError>;

    /// Delete the existing records among `ids` and return their ids in
    /// ascending order.
    async fn delete_many(&self, ids: &[RecordId]) -> Result<Vec<RecordId>, RecordRepositoryError>;

    /// Delete every record of `identnr` and return how many were removed.
    async fn delete_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError>;

    /// Distinct identnrs in ascending order.
    async fn distinct_identnrs(&self) -> Result<Vec<String>, RecordRepositoryError>;

    /// Total number of records.
    async fn count_all(&self) -> Result<u64, RecordRepositoryError>;

    /// Number of records owned by `identnr`.
    async fn count_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError>;

    /// Highest position in the store, `None` when empty.
    async fn max_position(&self) -> Result<Option<i32>, RecordRepositoryError>;
}

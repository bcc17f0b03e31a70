//! Virtual group use cases: listing, bulk delete, templates and
//! reconciliation.
//!
//! None of the multi-row operations here run inside one transaction. Each row
//! write is its own unit of work, so a failure part-way leaves earlier writes
//! in place. Every step is written to be skipped when its goal already holds
//! (duplicates are not re-created, absent rows are not re-deleted), which
//! means re-running an operation from the current state converges on the
//! same result.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::grouping::{GroupKey, RecordGroup, derive_groups};
use super::ports::RecordRepository;
use super::reconcile::MembershipDiff;
use super::record_service::{insert_unless_duplicate, map_repository_error};
use super::{AttributeFields, AttributeRecord, Error, Identnr, NewRecord, RecordId};

/// Result of deleting rows by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteOutcome {
    /// Ids that existed and were removed, ascending.
    pub deleted_ids: Vec<RecordId>,
}

impl BulkDeleteOutcome {
    /// Number of removed rows.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted_ids.len()
    }
}

/// Shared values and members of one group, used to seed new rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTemplate {
    /// Canonical field values of the group.
    pub fields: AttributeFields,
    /// Distinct member identnrs, sorted.
    pub identnrs: Vec<String>,
    /// Member rows ordered by identnr.
    pub records: Vec<AttributeRecord>,
}

/// Result of creating rows from a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCopyOutcome {
    /// Rows actually created.
    pub created: Vec<AttributeRecord>,
    /// Distinct requested owners, sorted.
    pub target_identnrs: Vec<Identnr>,
    /// Owners skipped because the row already existed.
    pub skipped: Vec<Identnr>,
}

/// Desired state for a group, relative to what the caller last saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// Row ids of the group as listed.
    pub member_ids: Vec<RecordId>,
    /// Owners of the group as listed; derived from the rows when empty.
    pub member_identnrs: Vec<Identnr>,
    /// Field values every member should carry afterwards.
    pub target_fields: AttributeFields,
    /// Owners the group should have afterwards.
    pub target_identnrs: Vec<Identnr>,
}

/// What a reconciliation changed, by owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Owners that received a new row.
    pub added: Vec<String>,
    /// Owners whose group rows were deleted.
    pub removed: Vec<String>,
    /// Owners whose group rows were rewritten with the target fields.
    pub updated: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Add,
    Remove,
    Update,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        }
    }
}

/// Group use cases backed by a [`RecordRepository`].
#[derive(Clone)]
pub struct GroupService {
    repo: Arc<dyn RecordRepository>,
}

impl GroupService {
    /// Create the service.
    pub fn new(repo: Arc<dyn RecordRepository>) -> Self {
        Self { repo }
    }

    /// Every virtual group, recomputed from the current rows.
    pub async fn list(&self) -> Result<Vec<RecordGroup>, Error> {
        let records = self.repo.list_all().await.map_err(map_repository_error)?;
        Ok(derive_groups(records))
    }

    /// Delete rows by id. Ids that no longer exist are ignored, so a stale
    /// group reference deletes nothing and still succeeds.
    pub async fn bulk_delete(&self, ids: &[RecordId]) -> Result<BulkDeleteOutcome, Error> {
        if ids.is_empty() {
            return Err(Error::invalid_request("ids must contain at least one record id"));
        }
        if let Some(bad) = ids.iter().find(|id| id.get() <= 0) {
            return Err(Error::invalid_request(format!(
                "record ids must be positive, got {bad}"
            )));
        }
        let deleted_ids = self
            .repo
            .delete_many(ids)
            .await
            .map_err(map_repository_error)?;
        info!(
            requested = ids.len(),
            deleted = deleted_ids.len(),
            "group rows deleted"
        );
        Ok(BulkDeleteOutcome { deleted_ids })
    }

    /// Template for the group identified by `key`.
    pub async fn template(&self, key: &GroupKey) -> Result<GroupTemplate, Error> {
        let records = self.group_rows(key).await?;
        if records.is_empty() {
            return Err(Error::not_found(format!(
                "no group with merkmal '{}', auspraegung '{}', drucktext '{}'",
                key.merkmal, key.auspraegung, key.drucktext
            )));
        }
        let identnrs: BTreeSet<String> = records.iter().map(|r| r.identnr.clone()).collect();
        Ok(GroupTemplate {
            fields: key.to_fields(),
            identnrs: identnrs.into_iter().collect(),
            records,
        })
    }

    /// Create one row per owner from `fields`, skipping existing ones.
    pub async fn create_from_template(
        &self,
        fields: &AttributeFields,
        identnrs: &[Identnr],
    ) -> Result<TemplateCopyOutcome, Error> {
        let targets: BTreeSet<&Identnr> = identnrs.iter().collect();
        if targets.is_empty() {
            return Err(Error::invalid_request(
                "identnrs must contain at least one identnr",
            ));
        }
        let mut outcome = TemplateCopyOutcome::default();
        for identnr in targets {
            let record = NewRecord::for_owner(identnr.clone(), fields.clone());
            match insert_unless_duplicate(self.repo.as_ref(), &record).await? {
                Some(created) => outcome.created.push(created),
                None => outcome.skipped.push(identnr.clone()),
            }
            outcome.target_identnrs.push(identnr.clone());
        }
        info!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            "rows created from group template"
        );
        Ok(outcome)
    }

    /// Converge a group on the requested owners and field values.
    ///
    /// Runs add, remove, then update. On failure the returned error carries
    /// `details.phase` plus the owners already handled, since those writes
    /// stay committed.
    pub async fn reconcile(&self, request: ReconcileRequest) -> Result<ReconcileOutcome, Error> {
        let rows = self
            .repo
            .find_by_ids(&request.member_ids)
            .await
            .map_err(map_repository_error)?;
        let Some(original_key) = prevailing_key(&rows) else {
            info!(
                member_ids = request.member_ids.len(),
                "reconcile against vanished group treated as satisfied"
            );
            return Ok(ReconcileOutcome::default());
        };
        let current = if request.member_identnrs.is_empty() {
            rows.iter()
                .filter(|row| original_key.matches(&row.fields))
                .filter_map(|row| Identnr::new(&row.identnr).ok())
                .collect()
        } else {
            request.member_identnrs.clone()
        };
        let diff = MembershipDiff::compute(&current, &request.target_identnrs);

        let mut outcome = ReconcileOutcome::default();
        if let Err(error) = self
            .add_members(&diff.to_add, &request.target_fields, &mut outcome)
            .await
        {
            return Err(partial_failure(error, Phase::Add, &outcome));
        }
        if let Err(error) = self
            .remove_members(&original_key, &diff.to_remove, &mut outcome)
            .await
        {
            return Err(partial_failure(error, Phase::Remove, &outcome));
        }
        if let Err(error) = self
            .update_members(&original_key, &diff.to_keep, &request.target_fields, &mut outcome)
            .await
        {
            return Err(partial_failure(error, Phase::Update, &outcome));
        }

        info!(
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            updated = outcome.updated.len(),
            "group reconciled"
        );
        Ok(outcome)
    }

    async fn group_rows(&self, key: &GroupKey) -> Result<Vec<AttributeRecord>, Error> {
        let candidates = self
            .repo
            .find_by_text(&key.merkmal, &key.auspraegung, &key.drucktext)
            .await
            .map_err(map_repository_error)?;
        Ok(candidates
            .into_iter()
            .filter(|record| key.matches(&record.fields))
            .collect())
    }

    async fn add_members(
        &self,
        to_add: &[Identnr],
        fields: &AttributeFields,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), Error> {
        for identnr in to_add {
            let record = NewRecord::for_owner(identnr.clone(), fields.clone());
            if insert_unless_duplicate(self.repo.as_ref(), &record)
                .await?
                .is_some()
            {
                outcome.added.push(identnr.to_string());
            }
        }
        Ok(())
    }

    async fn remove_members(
        &self,
        original: &GroupKey,
        to_remove: &[Identnr],
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), Error> {
        if to_remove.is_empty() {
            return Ok(());
        }
        let doomed: Vec<AttributeRecord> = self
            .group_rows(original)
            .await?
            .into_iter()
            .filter(|record| owned_by_any(record, to_remove))
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }
        let ids: Vec<RecordId> = doomed.iter().map(|record| record.id).collect();
        let deleted = self
            .repo
            .delete_many(&ids)
            .await
            .map_err(map_repository_error)?;
        let removed: BTreeSet<String> = doomed
            .into_iter()
            .filter(|record| deleted.contains(&record.id))
            .map(|record| record.identnr)
            .collect();
        outcome.removed.extend(removed);
        Ok(())
    }

    async fn update_members(
        &self,
        original: &GroupKey,
        to_keep: &[Identnr],
        fields: &AttributeFields,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), Error> {
        if to_keep.is_empty() {
            return Ok(());
        }
        let rows = self.group_rows(original).await?;
        let mut updated = BTreeSet::new();
        for identnr in to_keep {
            for row in rows.iter().filter(|row| row.identnr == identnr.as_str()) {
                let record = NewRecord::for_owner(identnr.clone(), fields.clone());
                let written = self
                    .repo
                    .update(row.id, &record)
                    .await
                    .map_err(map_repository_error)?;
                if written.is_some() {
                    updated.insert(identnr.to_string());
                }
            }
        }
        outcome.updated.extend(updated);
        Ok(())
    }
}

/// Key shared by most of the live member rows.
///
/// Rows another client moved since the listing no longer carry the group's
/// key, so they must not decide which group is reconciled. Ties go to the
/// key whose first row has the lowest id.
fn prevailing_key(rows: &[AttributeRecord]) -> Option<GroupKey> {
    let mut tally: BTreeMap<GroupKey, (usize, RecordId)> = BTreeMap::new();
    for row in rows {
        let entry = tally
            .entry(GroupKey::of(&row.fields))
            .or_insert((0, row.id));
        entry.0 += 1;
        entry.1 = entry.1.min(row.id);
    }
    tally
        .into_iter()
        .max_by(|(_, (count_a, id_a)), (_, (count_b, id_b))| {
            count_a.cmp(count_b).then(id_b.cmp(id_a))
        })
        .map(|(key, _)| key)
}

fn owned_by_any(record: &AttributeRecord, owners: &[Identnr]) -> bool {
    owners
        .iter()
        .any(|owner| owner.as_str() == record.identnr)
}

fn partial_failure(error: Error, phase: Phase, outcome: &ReconcileOutcome) -> Error {
    warn!(
        phase = phase.as_str(),
        added = outcome.added.len(),
        removed = outcome.removed.len(),
        updated = outcome.updated.len(),
        error = %error,
        "group reconciliation stopped part-way"
    );
    error.with_progress(json!({
        "phase": phase.as_str(),
        "added": outcome.added,
        "removed": outcome.removed,
        "updated": outcome.updated,
    }))
}

#[cfg(test)]
#[path = "group_service_tests.rs"]
mod tests;

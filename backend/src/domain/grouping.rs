//! Virtual groups derived from flat records.
//!
//! A group is every record sharing the same [`GroupKey`]: identical
//! merkmal, auspraegung, drucktext, position and special department plus
//! normalised-equal sondermerkmal and fertigungsliste. Groups are never
//! stored; [`derive_groups`] recomputes them from whatever rows exist, so a
//! group whose rows are all gone simply disappears.
//!
//! The normalisation functions here are the only place that decides which raw
//! values count as "empty". Both grouping and the reconciliation matcher use
//! [`GroupKey`], so the two cannot disagree about membership.

use std::collections::BTreeMap;

use super::record::{AttributeFields, AttributeRecord, RecordId};

/// A key component whose blank representations collapse to one value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Normalized<T> {
    /// Null, blank or zero.
    Empty,
    /// Any other value, kept verbatim.
    Value(T),
}

/// Collapse `None` and whitespace-only text to [`Normalized::Empty`].
///
/// # Examples
/// ```
/// use merkmal_backend::domain::grouping::{Normalized, normalize_sondermerkmal};
///
/// assert_eq!(normalize_sondermerkmal(None), Normalized::Empty);
/// assert_eq!(normalize_sondermerkmal(Some("  ")), Normalized::Empty);
/// assert_eq!(
///     normalize_sondermerkmal(Some("SM1")),
///     Normalized::Value("SM1".to_owned())
/// );
/// ```
#[must_use]
pub fn normalize_sondermerkmal(raw: Option<&str>) -> Normalized<String> {
    match raw {
        Some(text) if !text.trim().is_empty() => Normalized::Value(text.to_owned()),
        _ => Normalized::Empty,
    }
}

/// Collapse `None` and `0` to [`Normalized::Empty`].
#[must_use]
pub fn normalize_fertigungsliste(raw: Option<i32>) -> Normalized<i32> {
    match raw {
        None | Some(0) => Normalized::Empty,
        Some(flag) => Normalized::Value(flag),
    }
}

/// Equality key of a virtual group.
///
/// Field order doubles as the listing order: merkmal, auspraegung and
/// drucktext first, the remaining components only break ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Characteristic name.
    pub merkmal: String,
    /// Characteristic value.
    pub auspraegung: String,
    /// Print text.
    pub drucktext: String,
    /// Shared position.
    pub position: i32,
    /// Special department code.
    pub sonder_abt: i32,
    /// Normalised special characteristic.
    pub sondermerkmal: Normalized<String>,
    /// Normalised production list flag.
    pub fertigungsliste: Normalized<i32>,
}

impl GroupKey {
    /// Key of the group `fields` belong to.
    #[must_use]
    pub fn of(fields: &AttributeFields) -> Self {
        Self {
            merkmal: fields.merkmal.clone(),
            auspraegung: fields.auspraegung.clone(),
            drucktext: fields.drucktext.clone(),
            position: fields.position,
            sonder_abt: fields.sonder_abt,
            sondermerkmal: normalize_sondermerkmal(fields.sondermerkmal.as_deref()),
            fertigungsliste: normalize_fertigungsliste(fields.fertigungsliste),
        }
    }

    /// Whether `fields` belong to this group.
    #[must_use]
    pub fn matches(&self, fields: &AttributeFields) -> bool {
        *self == Self::of(fields)
    }

    /// Sondermerkmal as shown to clients; empty renders as `""`.
    #[must_use]
    pub fn sondermerkmal_display(&self) -> &str {
        match &self.sondermerkmal {
            Normalized::Value(text) => text,
            Normalized::Empty => "",
        }
    }

    /// Fertigungsliste as shown to clients; empty renders as `0`.
    #[must_use]
    pub fn fertigungsliste_display(&self) -> i32 {
        match self.fertigungsliste {
            Normalized::Value(flag) => flag,
            Normalized::Empty => 0,
        }
    }

    /// Canonical field set for the group, suitable as a creation template.
    #[must_use]
    pub fn to_fields(&self) -> AttributeFields {
        AttributeFields {
            merkmal: self.merkmal.clone(),
            auspraegung: self.auspraegung.clone(),
            drucktext: self.drucktext.clone(),
            sondermerkmal: Some(self.sondermerkmal_display().to_owned()),
            position: self.position,
            sonder_abt: self.sonder_abt,
            fertigungsliste: Some(self.fertigungsliste_display()),
        }
    }
}

/// Whether two records carry the same characteristic text.
///
/// Looser than [`GroupKey`]: position, department and production flag are
/// ignored.
#[must_use]
pub fn is_similar(a: &AttributeFields, b: &AttributeFields) -> bool {
    a.merkmal == b.merkmal
        && a.auspraegung == b.auspraegung
        && a.drucktext == b.drucktext
        && normalize_sondermerkmal(a.sondermerkmal.as_deref())
            == normalize_sondermerkmal(b.sondermerkmal.as_deref())
}

/// One member row of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Record id.
    pub id: RecordId,
    /// Owning identnr.
    pub identnr: String,
}

/// A derived virtual group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordGroup {
    /// One-based display id, valid only for the listing it came from.
    pub display_id: u32,
    /// Shared key.
    pub key: GroupKey,
    /// Members ordered by identnr, then id.
    pub members: Vec<GroupMember>,
}

impl RecordGroup {
    /// Number of member rows.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.members.len()
    }

    /// Owner of each member row, duplicates kept.
    #[must_use]
    pub fn identnr_list(&self) -> Vec<String> {
        self.members.iter().map(|m| m.identnr.clone()).collect()
    }

    /// Id of each member row, aligned with [`Self::identnr_list`].
    #[must_use]
    pub fn id_list(&self) -> Vec<RecordId> {
        self.members.iter().map(|m| m.id).collect()
    }
}

/// Partition `records` into virtual groups.
///
/// Groups come back ordered by [`GroupKey`] with display ids assigned in that
/// order, so the listing is deterministic for a fixed set of rows.
///
/// # Examples
/// ```
/// use merkmal_backend::domain::grouping::derive_groups;
/// use merkmal_backend::domain::{AttributeFields, AttributeRecord, RecordId};
///
/// let fields = AttributeFields {
///     merkmal: "Farbe".into(),
///     auspraegung: "rot".into(),
///     drucktext: "rot".into(),
///     sondermerkmal: None,
///     position: 1,
///     sonder_abt: 0,
///     fertigungsliste: Some(0),
/// };
/// let mut blank = fields.clone();
/// blank.sondermerkmal = Some("  ".into());
/// let records = vec![
///     AttributeRecord { id: RecordId::new(1), identnr: "A".into(), fields },
///     AttributeRecord { id: RecordId::new(2), identnr: "B".into(), fields: blank },
/// ];
///
/// let groups = derive_groups(records);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].identnr_list(), vec!["A", "B"]);
/// ```
#[must_use]
pub fn derive_groups(records: impl IntoIterator<Item = AttributeRecord>) -> Vec<RecordGroup> {
    let mut partitions: BTreeMap<GroupKey, Vec<GroupMember>> = BTreeMap::new();
    for record in records {
        partitions
            .entry(GroupKey::of(&record.fields))
            .or_default()
            .push(GroupMember {
                id: record.id,
                identnr: record.identnr,
            });
    }

    partitions
        .into_iter()
        .zip(1_u32..)
        .map(|((key, mut members), display_id)| {
            members.sort_by(|a, b| a.identnr.cmp(&b.identnr).then(a.id.cmp(&b.id)));
            RecordGroup {
                display_id,
                key,
                members,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "grouping_tests.rs"]
mod tests;

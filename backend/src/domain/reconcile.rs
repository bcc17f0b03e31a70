//! Three-way membership diff used by group reconciliation.

use std::collections::BTreeSet;

use super::record::Identnr;

/// Which owners a reconciliation must add, remove, or keep.
///
/// Inputs are deduplicated first; multiplicity only matters for display.
/// Each list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Target owners not yet in the group.
    pub to_add: Vec<Identnr>,
    /// Current owners missing from the target.
    pub to_remove: Vec<Identnr>,
    /// Owners present on both sides.
    pub to_keep: Vec<Identnr>,
}

impl MembershipDiff {
    /// Compare current membership with the desired one.
    ///
    /// # Examples
    /// ```
    /// use merkmal_backend::domain::{Identnr, MembershipDiff};
    ///
    /// let ids = |names: &[&str]| -> Vec<Identnr> {
    ///     names.iter().map(|n| Identnr::new(n).expect("valid")).collect()
    /// };
    /// let diff = MembershipDiff::compute(&ids(&["A", "B", "C"]), &ids(&["B", "C", "D", "D"]));
    /// assert_eq!(diff.to_add, ids(&["D"]));
    /// assert_eq!(diff.to_remove, ids(&["A"]));
    /// assert_eq!(diff.to_keep, ids(&["B", "C"]));
    /// ```
    #[must_use]
    pub fn compute(current: &[Identnr], target: &[Identnr]) -> Self {
        let current: BTreeSet<&Identnr> = current.iter().collect();
        let target: BTreeSet<&Identnr> = target.iter().collect();
        Self {
            to_add: owned(target.difference(&current)),
            to_remove: owned(current.difference(&target)),
            to_keep: owned(target.intersection(&current)),
        }
    }

    /// True when nothing needs to change membership-wise.
    #[must_use]
    pub fn is_membership_stable(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

fn owned<'a, 'b: 'a>(ids: impl Iterator<Item = &'a &'b Identnr>) -> Vec<Identnr> {
    ids.map(|id| Identnr::clone(id)).collect()
}

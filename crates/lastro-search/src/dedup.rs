//! Duplicate result-set detection.
//!
//! A broader query that returns exactly the same records as an already
//! accepted group adds nothing; such result sets are recognised by comparing
//! identity sets, not record contents.

use std::collections::BTreeSet;

use lastro_core::{Record, ResultGroup};

/// Identity set of a result list.
pub fn identity_set(records: &[Record]) -> BTreeSet<i64> {
    records.iter().map(|r| r.id).collect()
}

/// Whether `candidate` has exactly the identity set of an accepted group.
///
/// An empty candidate is never a duplicate; callers reject empty results
/// separately.
pub fn is_duplicate(candidate: &[Record], accepted: &[ResultGroup]) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let ids = identity_set(candidate);
    accepted
        .iter()
        .any(|group| identity_set(&group.records) == ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastro_core::{Attribute, Predicate, RecordQuery};

    fn records(ids: &[i64]) -> Vec<Record> {
        ids.iter().map(|id| Record::new(*id, format!("v/{}", id))).collect()
    }

    fn group(ids: &[i64]) -> ResultGroup {
        ResultGroup::new(
            RecordQuery::filtered(Predicate::contains(Attribute::Title, "x")),
            "g",
            records(ids),
        )
    }

    #[test]
    fn test_same_set_in_other_order_is_duplicate() {
        assert!(is_duplicate(&records(&[3, 1, 2]), &[group(&[1, 2, 3])]));
    }

    #[test]
    fn test_subset_is_not_duplicate() {
        assert!(!is_duplicate(&records(&[1, 2]), &[group(&[1, 2, 3])]));
    }

    #[test]
    fn test_content_differences_are_ignored() {
        let mut candidate = records(&[1]);
        candidate[0].title = Some("another title".to_string());
        assert!(is_duplicate(&candidate, &[group(&[1])]));
    }

    #[test]
    fn test_empty_candidate_is_never_duplicate() {
        let empty_group = ResultGroup::new(RecordQuery::random(1), "g", Vec::new());
        assert!(!is_duplicate(&[], &[empty_group]));
    }

    #[test]
    fn test_no_accepted_groups() {
        assert!(!is_duplicate(&records(&[1]), &[]));
    }
}

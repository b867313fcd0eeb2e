//! Within-run near-duplicate abstract detection, wired into the persist
//! stage (SPEC_FULL supplement 1). Two different ids whose abstracts land
//! within the SimHash Hamming threshold are linked via `Paper.duplicate_of`
//! rather than silently treated as distinct.

use std::sync::Mutex;

use litgraph_common::PaperId;
use litgraph_discovery::simhash::{abstract_simhash, is_probable_duplicate};

/// Signatures of every abstract persisted so far this run, checked against
/// each new paper before it is written.
pub struct DuplicateIndex {
    seen: Mutex<Vec<(i64, PaperId)>>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self { seen: Mutex::new(Vec::new()) }
    }

    /// Returns the id of the first already-seen paper whose abstract is a
    /// probable duplicate of `abstract_text`, recording `id`'s own
    /// fingerprint either way so later papers can be compared against it.
    pub fn check_and_insert(&self, id: &PaperId, abstract_text: &str) -> Option<PaperId> {
        let signature = abstract_simhash(abstract_text);
        let mut seen = self.seen.lock().expect("duplicate index poisoned");
        let duplicate_of = seen
            .iter()
            .find(|(existing, _)| is_probable_duplicate(*existing, signature))
            .map(|(_, existing_id)| existing_id.clone());
        seen.push((signature, id.clone()));
        duplicate_of
    }
}

impl Default for DuplicateIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_near_identical_abstract_under_a_different_id() {
        let index = DuplicateIndex::new();
        let a = "A new approach to quantum field theory renormalisation in curved spacetime";
        let b = "A new approach to quantum field theory renormalization in curved spacetimes";

        assert_eq!(index.check_and_insert(&PaperId::new("A"), a), None);
        assert_eq!(index.check_and_insert(&PaperId::new("B"), b), Some(PaperId::new("A")));
    }

    #[test]
    fn unrelated_abstracts_are_not_flagged() {
        let index = DuplicateIndex::new();
        let a = "A new approach to quantum field theory renormalisation";
        let b = "Polynomial time algorithms for graph isomorphism testing";

        assert_eq!(index.check_and_insert(&PaperId::new("A"), a), None);
        assert_eq!(index.check_and_insert(&PaperId::new("B"), b), None);
    }
}

//! Discovery frontier: a visited-set plus a FIFO queue of (paper, depth)
//! pairs, shared across the discover-stage workers of the pipeline
//! coordinator (spec §4.2).
//!
//! The visited set is sharded across several mutex-guarded buckets so
//! concurrent workers claiming distinct papers rarely contend on the same
//! lock. Claiming (marking visited) happens atomically at enqueue time, so
//! two workers racing to enqueue the same neighbor never both succeed.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use litgraph_common::PaperId;
use tracing::{debug, trace};

const SHARD_COUNT: usize = 16;

struct VisitedSet {
    shards: Vec<Mutex<HashSet<PaperId>>>,
}

impl VisitedSet {
    fn new() -> Self {
        Self { shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashSet::new())).collect() }
    }

    fn shard_for(&self, id: &PaperId) -> &Mutex<HashSet<PaperId>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Returns true if `id` was newly claimed (not previously visited).
    fn claim(&self, id: &PaperId) -> bool {
        let mut shard = self.shard_for(id).lock().expect("visited-set shard poisoned");
        shard.insert(id.clone())
    }

    fn contains(&self, id: &PaperId) -> bool {
        self.shard_for(id).lock().expect("visited-set shard poisoned").contains(id)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().expect("visited-set shard poisoned").len()).sum()
    }

    fn snapshot(&self) -> Vec<PaperId> {
        self.shards
            .iter()
            .flat_map(|s| s.lock().expect("visited-set shard poisoned").iter().cloned().collect::<Vec<_>>())
            .collect()
    }
}

/// A paper queued for discovery, paired with its BFS depth from the nearest seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub id: PaperId,
    pub depth: u32,
}

/// Bounds applied when enqueuing neighbors (spec §4.2 edge cases).
#[derive(Debug, Clone, Copy)]
pub struct FrontierLimits {
    pub max_depth: u32,
    pub max_papers: Option<usize>,
    pub max_fanout_per_paper: usize,
}

impl Default for FrontierLimits {
    fn default() -> Self {
        Self { max_depth: 2, max_papers: None, max_fanout_per_paper: 20 }
    }
}

/// The shared discovery frontier: a visited set plus a FIFO work queue.
pub struct Frontier {
    visited: VisitedSet,
    queue: Mutex<VecDeque<FrontierItem>>,
    limits: FrontierLimits,
}

impl Frontier {
    pub fn new(limits: FrontierLimits) -> Self {
        Self { visited: VisitedSet::new(), queue: Mutex::new(VecDeque::new()), limits }
    }

    /// Seed the frontier with starting papers at depth 0. Duplicates among
    /// seeds are silently collapsed (the first claim wins).
    pub fn seed(&self, ids: impl IntoIterator<Item = PaperId>) {
        for id in ids {
            self.try_enqueue(id, 0);
        }
    }

    /// Restore a frontier's visited set from a prior run's persisted paper
    /// ids, without re-enqueueing them (spec §4.2/§4.5 resume semantics).
    /// Returns the number of ids marked visited.
    pub fn mark_visited_from_store(&self, ids: impl IntoIterator<Item = PaperId>) -> usize {
        let mut n = 0;
        for id in ids {
            if self.visited.claim(&id) {
                n += 1;
            }
        }
        n
    }

    /// Restore pending `(id, depth)` pairs from a checkpoint (spec §4.5
    /// resume semantics). Unlike `seed`, items are enqueued at their
    /// recorded depth rather than depth 0.
    pub fn seed_pending(&self, items: impl IntoIterator<Item = (PaperId, u32)>) {
        for (id, depth) in items {
            self.try_enqueue(id, depth);
        }
    }

    /// Pop the next item to process, if any. Returns `None` when the queue
    /// is empty (callers should treat this as "no more work right now",
    /// not necessarily "discovery is complete" — concurrent enqueues may follow).
    pub fn next(&self) -> Option<FrontierItem> {
        let mut queue = self.queue.lock().expect("frontier queue poisoned");
        queue.pop_front()
    }

    /// Enqueue the neighbors of a paper processed at `parent_depth`, applying
    /// max_depth, max_fanout_per_paper, and max_papers bounds, and skipping
    /// ids already claimed by another worker.
    pub fn enqueue_neighbors(&self, parent_depth: u32, neighbors: impl IntoIterator<Item = PaperId>) -> usize {
        let child_depth = parent_depth + 1;
        if child_depth > self.limits.max_depth {
            trace!(child_depth, max_depth = self.limits.max_depth, "neighbor depth exceeds bound, skipping");
            return 0;
        }

        let mut enqueued = 0;
        for id in neighbors.into_iter().take(self.limits.max_fanout_per_paper) {
            if self.try_enqueue(id, child_depth) {
                enqueued += 1;
            }
        }
        enqueued
    }

    fn try_enqueue(&self, id: PaperId, depth: u32) -> bool {
        if let Some(max_papers) = self.limits.max_papers {
            if self.visited.len() >= max_papers {
                return false;
            }
        }
        if !self.visited.claim(&id) {
            return false;
        }
        self.queue.lock().expect("frontier queue poisoned").push_back(FrontierItem { id: id.clone(), depth });
        debug!(id = id.as_str(), depth, "enqueued frontier item");
        true
    }

    pub fn is_visited(&self, id: &PaperId) -> bool {
        self.visited.contains(id)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().expect("frontier queue poisoned").len()
    }

    /// A point-in-time copy of the pending queue, for writing a checkpoint
    /// (spec §4.5 checkpoint file `queue` field). Non-destructive.
    pub fn pending_snapshot(&self) -> Vec<FrontierItem> {
        self.queue.lock().expect("frontier queue poisoned").iter().cloned().collect()
    }

    /// A point-in-time copy of every visited id, for writing a checkpoint.
    pub fn visited_snapshot(&self) -> Vec<PaperId> {
        self.visited.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_enqueues_all_distinct_ids() {
        let frontier = Frontier::new(FrontierLimits::default());
        frontier.seed([PaperId::new("a"), PaperId::new("b"), PaperId::new("a")]);
        assert_eq!(frontier.visited_count(), 2);
        assert_eq!(frontier.pending_count(), 2);
    }

    #[test]
    fn neighbors_beyond_max_depth_are_dropped() {
        let frontier = Frontier::new(FrontierLimits { max_depth: 1, ..Default::default() });
        let n = frontier.enqueue_neighbors(1, [PaperId::new("x")]);
        assert_eq!(n, 0);
        assert!(!frontier.is_visited(&PaperId::new("x")));
    }

    #[test]
    fn neighbors_are_capped_by_fanout() {
        let frontier = Frontier::new(FrontierLimits { max_fanout_per_paper: 2, ..Default::default() });
        let n = frontier.enqueue_neighbors(0, (0..10).map(|i| PaperId::new(format!("p{i}"))));
        assert_eq!(n, 2);
    }

    #[test]
    fn duplicate_claims_are_rejected() {
        let frontier = Frontier::new(FrontierLimits::default());
        assert_eq!(frontier.enqueue_neighbors(0, [PaperId::new("a")]), 1);
        assert_eq!(frontier.enqueue_neighbors(0, [PaperId::new("a")]), 0);
    }

    #[test]
    fn max_papers_bound_stops_new_claims() {
        let frontier = Frontier::new(FrontierLimits { max_papers: Some(1), ..Default::default() });
        frontier.seed([PaperId::new("a")]);
        assert_eq!(frontier.enqueue_neighbors(0, [PaperId::new("b")]), 0);
    }

    #[test]
    fn next_drains_queue_in_fifo_order() {
        let frontier = Frontier::new(FrontierLimits::default());
        frontier.seed([PaperId::new("a"), PaperId::new("b")]);
        assert_eq!(frontier.next().unwrap().id, PaperId::new("a"));
        assert_eq!(frontier.next().unwrap().id, PaperId::new("b"));
        assert!(frontier.next().is_none());
    }

    #[test]
    fn pending_snapshot_does_not_drain_the_queue() {
        let frontier = Frontier::new(FrontierLimits::default());
        frontier.seed([PaperId::new("a"), PaperId::new("b")]);
        let snapshot = frontier.pending_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(frontier.pending_count(), 2);
        assert_eq!(frontier.visited_snapshot().len(), 2);
    }

    #[test]
    fn seed_pending_preserves_recorded_depth() {
        let frontier = Frontier::new(FrontierLimits::default());
        frontier.seed_pending([(PaperId::new("a"), 2)]);
        assert_eq!(frontier.next().unwrap(), FrontierItem { id: PaperId::new("a"), depth: 2 });
    }

    #[test]
    fn mark_visited_from_store_does_not_enqueue() {
        let frontier = Frontier::new(FrontierLimits::default());
        let n = frontier.mark_visited_from_store([PaperId::new("a"), PaperId::new("b")]);
        assert_eq!(n, 2);
        assert_eq!(frontier.pending_count(), 0);
        assert!(frontier.is_visited(&PaperId::new("a")));
    }
}

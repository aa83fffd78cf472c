//! Level-bucketed BFS work queues.
//!
//! A [`BfsIterator`] holds the pending vertices of a sweep, bucketed by
//! topological level. The search drains one level at a time (in parallel
//! across a level) while visits concurrently enqueue vertices at other
//! levels. Membership is tracked per vertex with an atomic flag so the
//! same vertex is never pending twice; stale bucket entries left by
//! [`remove`](BfsIterator::remove) are skipped at drain time.

use kairos_graph::{TimingGraph, VertexId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A level-bucketed vertex work queue shared by sweep workers.
#[derive(Default)]
pub struct BfsIterator {
    levels: Vec<Mutex<Vec<VertexId>>>,
    in_queue: Vec<AtomicBool>,
    pending: AtomicUsize,
}

impl BfsIterator {
    /// Creates an empty queue; size it with
    /// [`ensure_size`](Self::ensure_size) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the buckets and membership flags to the graph's current
    /// dimensions. Existing entries are preserved.
    pub fn ensure_size(&mut self, graph: &TimingGraph) {
        let want_levels = graph.max_level() as usize + 1;
        while self.levels.len() < want_levels {
            self.levels.push(Mutex::new(Vec::new()));
        }
        while self.in_queue.len() < graph.vertex_count() {
            self.in_queue.push(AtomicBool::new(false));
        }
    }

    /// Empties the queue and clears all membership flags.
    pub fn clear(&mut self) {
        for bucket in &self.levels {
            bucket.lock().unwrap().clear();
        }
        for flag in &self.in_queue {
            flag.store(false, Ordering::Relaxed);
        }
        self.pending.store(0, Ordering::Relaxed);
    }

    /// Enqueues `vertex` at its level. No-op if already pending.
    pub fn enqueue(&self, graph: &TimingGraph, vertex: VertexId) {
        if !self.in_queue[vertex.index()].swap(true, Ordering::AcqRel) {
            let level = graph.vertex(vertex).level as usize;
            self.levels[level].lock().unwrap().push(vertex);
            self.pending.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Returns `true` if `vertex` is pending.
    pub fn in_queue(&self, vertex: VertexId) -> bool {
        self.in_queue
            .get(vertex.index())
            .map_or(false, |f| f.load(Ordering::Acquire))
    }

    /// Withdraws `vertex` from the queue. Its bucket entry becomes stale
    /// and is skipped at drain time.
    pub fn remove(&self, vertex: VertexId) {
        if let Some(flag) = self.in_queue.get(vertex.index()) {
            if flag.swap(false, Ordering::AcqRel) {
                self.pending.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    /// Number of pending vertices.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of level buckets currently allocated.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// The lowest level in `0..=upto` with queued entries, if any. Used by
    /// the forward sweep to re-descend when a loop or latch edge enqueues
    /// below the level cursor.
    pub fn min_pending_below(&self, upto: usize) -> Option<usize> {
        (0..=upto.min(self.levels.len().saturating_sub(1)))
            .find(|&level| !self.levels[level].lock().unwrap().is_empty())
    }

    /// The highest level in `from..` with queued entries, if any. The
    /// backward-sweep analog of [`min_pending_below`](Self::min_pending_below).
    pub fn max_pending_above(&self, from: usize) -> Option<usize> {
        (from..self.levels.len())
            .rev()
            .find(|&level| !self.levels[level].lock().unwrap().is_empty())
    }

    /// Drains the bucket of `level`, claiming each still-pending vertex.
    /// The result is sorted by vertex ID so parallel visits process a
    /// deterministic set regardless of enqueue interleaving.
    pub fn take_level(&self, level: usize) -> Vec<VertexId> {
        let Some(bucket) = self.levels.get(level) else {
            return Vec::new();
        };
        let entries = std::mem::take(&mut *bucket.lock().unwrap());
        let mut claimed: Vec<VertexId> = entries
            .into_iter()
            .filter(|v| self.in_queue[v.index()].swap(false, Ordering::AcqRel))
            .collect();
        self.pending.fetch_sub(claimed.len(), Ordering::AcqRel);
        claimed.sort_unstable();
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::Interner;
    use kairos_graph::{levelize, TimingArcSet, TimingRole};

    fn chain_graph(interner: &Interner, n: usize) -> (TimingGraph, Vec<VertexId>) {
        let mut graph = TimingGraph::new();
        let vertices: Vec<VertexId> = (0..n)
            .map(|i| graph.add_vertex(interner.intern(&format!("v{i}"))))
            .collect();
        for pair in vertices.windows(2) {
            graph.add_edge(pair[0], pair[1], TimingRole::Wire, TimingArcSet::wire());
        }
        levelize(&mut graph);
        (graph, vertices)
    }

    #[test]
    fn enqueue_is_idempotent() {
        let interner = Interner::new();
        let (graph, vs) = chain_graph(&interner, 3);
        let mut iter = BfsIterator::new();
        iter.ensure_size(&graph);
        iter.enqueue(&graph, vs[1]);
        iter.enqueue(&graph, vs[1]);
        assert_eq!(iter.pending(), 1);
        assert!(iter.in_queue(vs[1]));
        assert!(!iter.in_queue(vs[0]));
    }

    #[test]
    fn take_level_claims_and_sorts() {
        let interner = Interner::new();
        let (graph, vs) = chain_graph(&interner, 2);
        let mut graph = graph;
        // Two extra roots at level 0, enqueued out of order.
        let extra1 = graph.add_vertex(interner.intern("x1"));
        let extra2 = graph.add_vertex(interner.intern("x2"));
        levelize(&mut graph);
        let mut iter = BfsIterator::new();
        iter.ensure_size(&graph);
        iter.enqueue(&graph, extra2);
        iter.enqueue(&graph, vs[0]);
        iter.enqueue(&graph, extra1);
        let level0 = iter.take_level(0);
        assert_eq!(level0, vec![vs[0], extra1, extra2]);
        assert!(iter.is_empty());
        assert!(!iter.in_queue(vs[0]));
    }

    #[test]
    fn remove_skips_stale_entries() {
        let interner = Interner::new();
        let (graph, vs) = chain_graph(&interner, 3);
        let mut iter = BfsIterator::new();
        iter.ensure_size(&graph);
        iter.enqueue(&graph, vs[2]);
        iter.remove(vs[2]);
        assert!(iter.is_empty());
        assert!(iter.take_level(2).is_empty());
    }

    #[test]
    fn reenqueue_after_remove() {
        let interner = Interner::new();
        let (graph, vs) = chain_graph(&interner, 3);
        let mut iter = BfsIterator::new();
        iter.ensure_size(&graph);
        iter.enqueue(&graph, vs[2]);
        iter.remove(vs[2]);
        iter.enqueue(&graph, vs[2]);
        // The stale entry plus the live one drain to a single visit.
        assert_eq!(iter.take_level(2), vec![vs[2]]);
        assert!(iter.is_empty());
    }

    #[test]
    fn clear_resets() {
        let interner = Interner::new();
        let (graph, vs) = chain_graph(&interner, 3);
        let mut iter = BfsIterator::new();
        iter.ensure_size(&graph);
        iter.enqueue(&graph, vs[0]);
        iter.enqueue(&graph, vs[1]);
        iter.clear();
        assert!(iter.is_empty());
        assert!(iter.take_level(0).is_empty());
        assert!(iter.take_level(1).is_empty());
    }
}

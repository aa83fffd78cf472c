//! Propagation entry points: parallel level sweeps, the latch fixpoint,
//! and the filtered-search lifecycle.
//!
//! All entry points converge on the same shape: ensure seeds, enqueue
//! invalidated vertices, then drain the level-bucketed queue one level at
//! a time, visiting each level's vertices in parallel. Vertices at one
//! level never depend on each other, so a level is safe to partition
//! across workers; the queue is drained in level order so every
//! predecessor is committed before its successors are visited.

use crate::arrival::ArrivalVisitor;
use crate::pred::{SearchPred, SearchThru};
use crate::required::RequiredVisitor;
use crate::search::Search;
use crate::tag_group::TagGroupBldr;
use kairos_common::StaResult;
use kairos_graph::VertexId;
use kairos_sdc::ExceptionPoint;
use rayon::prelude::*;

/// A per-worker vertex visitor driven by the parallel sweep. Fatal errors
/// are latched on the search rather than propagated.
pub(crate) trait SweepVisitor: Send {
    fn visit(&mut self, search: &Search<'_>, vertex: VertexId);
}

impl<'a> Search<'a> {
    // ------------------------------------------------------------ adjacency

    /// Enqueues the fanout vertices reachable through `pred` into the
    /// forward queue.
    pub(crate) fn enqueue_arrival_adjacent(&self, vertex: VertexId, pred: &dyn SearchPred) {
        for &edge in self.graph.fanout_edges(vertex) {
            if pred.search_thru(self, edge) {
                let to = self.graph.edge(edge).to;
                if pred.search_to(self, to) {
                    self.arrival_iter.enqueue(self.graph, to);
                }
            }
        }
    }

    /// Enqueues the fanin vertices reachable through the adjacency
    /// predicate into the backward queue.
    pub(crate) fn enqueue_required_adjacent(&self, vertex: VertexId) {
        let pred = SearchThru::new();
        for &edge in self.graph.fanin_edges(vertex) {
            if pred.search_thru(self, edge) {
                let from = self.graph.edge(edge).from;
                if pred.search_from(self, from) {
                    self.required_iter.enqueue(self.graph, from);
                }
            }
        }
    }

    // --------------------------------------------------------- latch queue

    /// Records the latch outputs fed by a changed latch data arrival; the
    /// fixpoint loop drains them into the next pass.
    pub(crate) fn enqueue_latch_data_outputs(&self, vertex: VertexId) {
        for &edge in self.graph.fanout_edges(vertex) {
            if self.latches.is_latch_d_to_q(edge) {
                let out_vertex = self.graph.edge(edge).to;
                self.pending_latch_outputs.lock().unwrap().insert(out_vertex);
            }
        }
    }

    pub(crate) fn have_pending_latch_outputs(&self) -> bool {
        !self.pending_latch_outputs.lock().unwrap().is_empty()
    }

    pub(crate) fn enqueue_pending_latch_outputs(&self) {
        let mut pending = self.pending_latch_outputs.lock().unwrap();
        for &vertex in pending.iter() {
            self.arrival_iter.enqueue(self.graph, vertex);
        }
        pending.clear();
    }

    // ------------------------------------------------------ parallel drive

    fn visit_forward_parallel<V, F>(&self, to_level: usize, make_visitor: F) -> usize
    where
        V: SweepVisitor,
        F: Fn() -> V + Sync,
    {
        let mut total = 0;
        let mut level = 0usize;
        while level <= to_level && !self.arrival_iter.is_empty() {
            let batch = self.arrival_iter.take_level(level);
            if batch.is_empty() {
                level += 1;
                continue;
            }
            total += batch.len();
            batch
                .par_iter()
                .for_each_init(&make_visitor, |visitor, &vertex| visitor.visit(self, vertex));
            if self.has_fatal() {
                break;
            }
            // Loop and open-latch edges can enqueue below the cursor.
            match self.arrival_iter.min_pending_below(level) {
                Some(min) => level = min,
                None => level += 1,
            }
        }
        total
    }

    fn visit_backward_parallel<V, F>(&self, to_level: usize, make_visitor: F) -> usize
    where
        V: SweepVisitor,
        F: Fn() -> V + Sync,
    {
        let mut total = 0;
        let top = self.graph.max_level() as usize;
        let mut level = top;
        loop {
            if self.required_iter.is_empty() {
                break;
            }
            let batch = self.required_iter.take_level(level);
            if !batch.is_empty() {
                total += batch.len();
                batch
                    .par_iter()
                    .for_each_init(&make_visitor, |visitor, &vertex| visitor.visit(self, vertex));
                if self.has_fatal() {
                    break;
                }
                if let Some(max) = self.required_iter.max_pending_above(level) {
                    if max > level {
                        level = max;
                        continue;
                    }
                }
            }
            if level == to_level || level == 0 {
                break;
            }
            level -= 1;
        }
        total
    }

    // -------------------------------------------------------- entry points

    /// Computes arrivals everywhere, iterating until latch data arrivals
    /// stop changing.
    pub fn find_all_arrivals(&mut self) -> StaResult<()> {
        // The loop always runs once more than strictly necessary so a
        // pass that drained the pending set still gets a final check.
        let mut pass = 1;
        while pass == 1 || self.have_pending_latch_outputs() {
            self.enqueue_pending_latch_outputs();
            log::debug!("find arrivals pass {pass}");
            self.find_arrivals(self.graph.max_level())?;
            pass += 1;
        }
        Ok(())
    }

    /// Computes arrivals up to `level`.
    pub fn find_arrivals(&mut self, level: u32) -> StaResult<()> {
        log::debug!("find arrivals to level {level}");
        self.find_arrivals1()?;
        let crpr_active = self.sdc.crpr_active();
        let count = self.visit_forward_parallel(level as usize, || {
            ArrivalVisitor::new(false, false, crpr_active)
        });
        if let Some(err) = self.take_fatal() {
            return Err(err);
        }
        if self.arrival_iter.is_empty() && self.invalid_arrivals.lock().unwrap().is_empty() {
            self.clk_arrivals_valid = true;
            self.arrivals_at_endpoints_exist = true;
        }
        self.arrivals_exist = true;
        self.have_paths = true;
        log::debug!("found {count} arrivals");
        Ok(())
    }

    fn find_arrivals1(&mut self) -> StaResult<()> {
        if !self.arrivals_seeded {
            self.ensure_insertion_delays()?;
            self.arrival_iter.clear();
            self.required_iter.clear();
            self.arrival_iter.ensure_size(self.graph);
            self.required_iter.ensure_size(self.graph);
            self.seed_arrivals()?;
            self.arrivals_seeded = true;
        } else {
            self.arrival_iter.ensure_size(self.graph);
            self.required_iter.ensure_size(self.graph);
        }
        self.seed_invalid_arrivals()
    }

    /// Computes clock-network arrivals only: seeds the clock vertices and
    /// sweeps over wire and combinational edges.
    pub fn find_clk_arrivals(&mut self) -> StaResult<()> {
        if !self.clk_arrivals_valid {
            self.ensure_insertion_delays()?;
            log::debug!("find clk arrivals");
            self.arrival_iter.clear();
            self.arrival_iter.ensure_size(self.graph);
            self.seed_clk_vertex_arrivals()?;
            let crpr_active = self.sdc.crpr_active();
            self.visit_forward_parallel(self.graph.max_level() as usize, || {
                ArrivalVisitor::new(false, true, crpr_active)
            });
            if let Some(err) = self.take_fatal() {
                return Err(err);
            }
            self.arrivals_exist = true;
            self.clk_arrivals_valid = true;
        }
        Ok(())
    }

    fn seed_clk_vertex_arrivals(&mut self) -> StaResult<()> {
        let pins: Vec<_> = self.sdc.clock_pins().map(|(pin, _)| pin).collect();
        for pin in pins {
            let (vertex, bidirect) = self.graph.pin_vertices(pin);
            for vertex in [vertex, bidirect].into_iter().flatten() {
                let mut bldr = TagGroupBldr::new();
                self.init_tag_bldr(vertex, &mut bldr);
                self.seed_clk_arrivals(pin, vertex, &mut bldr)?;
                self.set_vertex_arrivals(vertex, &bldr)?;
            }
        }
        Ok(())
    }

    /// Computes required times down to `level` (0 for all).
    pub fn find_requireds(&mut self, level: u32) -> StaResult<()> {
        log::debug!("find requireds to level {level}");
        self.find_all_arrivals()?;
        if !self.requireds_seeded {
            self.seed_requireds();
        }
        self.seed_invalid_requireds();
        let count = self.visit_backward_parallel(level as usize, RequiredVisitor::new);
        if let Some(err) = self.take_fatal() {
            return Err(err);
        }
        self.requireds_exist = true;
        log::debug!("found {count} requireds");
        Ok(())
    }

    pub(crate) fn seed_requireds(&mut self) {
        self.ensure_downstream_clk_pins();
        let mut ends: Vec<VertexId> = self.endpoints().iter().copied().collect();
        ends.sort_unstable();
        for vertex in ends {
            if self.seed_required(vertex) {
                self.enqueue_required_adjacent(vertex);
            }
        }
        self.requireds_seeded = true;
        self.requireds_exist = true;
    }

    fn seed_invalid_requireds(&mut self) {
        let mut stale: Vec<VertexId> = self.invalid_requireds.lock().unwrap().drain().collect();
        stale.sort_unstable();
        for vertex in stale {
            self.required_iter.enqueue(self.graph, vertex);
        }
    }

    /// Updates arrivals and endpoint required times ahead of a TNS/WNS
    /// query. Required times are only needed at endpoints, so invalid ones
    /// are re-seeded rather than re-propagated.
    pub(crate) fn wns_tns_preamble(&mut self) -> StaResult<()> {
        self.find_all_arrivals()?;
        if self.requireds_seeded {
            let mut stale: Vec<VertexId> = self.invalid_requireds.lock().unwrap().drain().collect();
            stale.sort_unstable();
            for vertex in stale {
                if self.is_endpoint(vertex) {
                    self.seed_required(vertex);
                    // Endpoints with fanout depend on downstream checks;
                    // queue them in case full requireds are wanted later.
                    if self.has_searchable_fanout(vertex) {
                        self.required_iter.enqueue(self.graph, vertex);
                    }
                }
            }
        } else {
            self.seed_requireds();
        }
        Ok(())
    }

    // -------------------------------------------------------------- filter

    /// Computes arrivals for an interactive query filter: installs the
    /// filter exception, seeds its startpoints, and sweeps with the
    /// always-to-endpoints visitor so existing arrivals reach the
    /// filtered endpoints.
    pub fn find_filtered_arrivals(
        &mut self,
        from: Option<ExceptionPoint>,
        thrus: Vec<ExceptionPoint>,
        to: Option<ExceptionPoint>,
    ) -> StaResult<()> {
        self.delete_filtered_arrivals()?;
        let filter = self.sdc.make_filter(from, thrus, to);
        self.filter = Some(filter);
        self.find_arrivals1()?;
        self.seed_filter_starts()?;
        let max_level = self.graph.max_level() as usize;
        let crpr_active = self.sdc.crpr_active();
        // Always at least two passes so arrivals seeded by the first pass
        // reach the filtered endpoints.
        let mut pass = 1;
        while pass <= 2 || self.have_pending_latch_outputs() {
            self.enqueue_pending_latch_outputs();
            log::debug!("find filtered arrivals pass {pass}");
            let count = self
                .visit_forward_parallel(max_level, || ArrivalVisitor::new(true, false, crpr_active));
            log::debug!("found {count} arrivals");
            pass += 1;
        }
        if let Some(err) = self.take_fatal() {
            return Err(err);
        }
        self.arrivals_exist = true;
        Ok(())
    }

    fn seed_filter_starts(&mut self) -> StaResult<()> {
        let Some(filter) = self.filter else {
            return Ok(());
        };
        let exc = self.sdc.exception(filter);
        let first_point = exc.from.as_ref().or_else(|| exc.thrus.first());
        let Some(first_point) = first_point else {
            return Ok(());
        };
        let mut pins = first_point.pins.clone();
        let mut leaf_pins = Vec::new();
        for pin in pins.drain(..) {
            if self.network.is_hierarchical(pin) {
                self.network
                    .visit_drvr_loads_thru_hier_pin(pin, &mut |drvr, _load| {
                        leaf_pins.push(drvr);
                    });
            } else {
                leaf_pins.push(pin);
            }
        }
        for pin in leaf_pins {
            let (vertex, bidirect) = self.graph.pin_vertices(pin);
            for vertex in [vertex, bidirect].into_iter().flatten() {
                self.seed_arrival(vertex)?;
            }
        }
        Ok(())
    }

    /// Deletes the state a previous filtered search left behind: paths on
    /// filter-tagged vertices, then the filter-marked tags and tag groups,
    /// then the filter exception itself.
    pub fn delete_filtered_arrivals(&mut self) -> StaResult<()> {
        if self.filter.is_some() {
            for vertex in self.graph.vertex_ids() {
                let has_filter = self
                    .vertex_tag_group(vertex)
                    .map_or(false, |g| self.tag_group(g).has_filter_tag);
                if has_filter {
                    self.delete_vertex_paths(vertex);
                    self.arrival_invalid(vertex);
                    self.required_invalid(vertex);
                }
            }
            self.tag_groups.retire_matching(|group| group.has_filter_tag);
            self.tags.retire_matching(|tag| tag.is_filter);
        }
        self.delete_filter();
        Ok(())
    }

    /// Uninstalls the filter exception without sweeping state; used when
    /// everything is being invalidated anyway.
    pub(crate) fn delete_filter(&mut self) {
        if let Some(filter) = self.filter.take() {
            self.sdc.delete_exception(filter);
        }
    }
}

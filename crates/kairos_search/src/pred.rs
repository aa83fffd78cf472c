//! Search predicates deciding edge and vertex traversability.
//!
//! The predicates are layered: the base rules skip disabled edges and
//! constant vertices; [`EvalPred`] adds loop, check-edge, and latch
//! handling; [`SearchThru`] adds the dynamic-loop pending check used when
//! enqueueing fanout; [`ClkArrivalPred`] restricts traversal to the edges
//! a clock network can follow.

use crate::api::LatchState;
use crate::search::Search;
use crate::tag_group::TagGroupBldr;
use kairos_common::RiseFall;
use kairos_graph::{EdgeId, TimingRole, VertexId};

/// A traversability predicate consulted by the visitors and the BFS
/// adjacency enqueue.
pub trait SearchPred: Sync {
    /// May the search leave `from_vertex`?
    fn search_from(&self, search: &Search<'_>, from_vertex: VertexId) -> bool;

    /// May the search cross `edge`?
    fn search_thru(&self, search: &Search<'_>, edge: EdgeId) -> bool;

    /// May the search enter `to_vertex`?
    fn search_to(&self, search: &Search<'_>, to_vertex: VertexId) -> bool;
}

fn base_search_from(search: &Search<'_>, from_vertex: VertexId) -> bool {
    !search.graph().vertex(from_vertex).is_constant
}

fn base_search_thru(search: &Search<'_>, edge: EdgeId) -> bool {
    !search.graph().edge(edge).disabled
}

fn base_search_to(search: &Search<'_>, to_vertex: VertexId) -> bool {
    !search.graph().vertex(to_vertex).is_constant
}

/// The evaluation predicate: skips disabled edges, check edges, disabled
/// loop edges (unless dynamic loop breaking is on), and closed latches;
/// rejects clock source pins as destinations unless they are internal
/// path-delay endpoints.
#[derive(Clone, Copy)]
pub struct EvalPred {
    search_thru_latches: bool,
}

impl EvalPred {
    /// An evaluation predicate that follows latch D→Q edges when the
    /// latch is open.
    pub fn new() -> Self {
        Self {
            search_thru_latches: true,
        }
    }

    /// Controls whether latch D→Q edges are followed at all.
    pub fn set_search_thru_latches(&mut self, thru_latches: bool) {
        self.search_thru_latches = thru_latches;
    }
}

impl Default for EvalPred {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPred for EvalPred {
    fn search_from(&self, search: &Search<'_>, from_vertex: VertexId) -> bool {
        base_search_from(search, from_vertex)
    }

    fn search_thru(&self, search: &Search<'_>, edge: EdgeId) -> bool {
        let e = search.graph().edge(edge);
        base_search_thru(search, edge)
            && (search.sdc().dynamic_loop_breaking() || !e.disabled_loop)
            && !e.role.is_timing_check()
            && (self.search_thru_latches
                || e.role != TimingRole::LatchDToQ
                || search.latches.latch_d_to_q_state(edge) == LatchState::Open)
    }

    fn search_to(&self, search: &Search<'_>, to_vertex: VertexId) -> bool {
        let pin = search.graph().vertex(to_vertex).pin;
        base_search_to(search, to_vertex)
            && !(search.sdc().is_vertex_pin_clock(pin)
                && !search.sdc().is_path_delay_internal_endpoint(pin))
    }
}

/// The adjacency predicate used when enqueueing fanout: evaluation rules
/// plus open-latch gating plus the dynamic-loop pending check against the
/// visiting vertex's freshly built arrivals.
pub struct SearchThru<'b> {
    eval: EvalPred,
    tag_bldr: Option<&'b TagGroupBldr>,
}

impl<'b> SearchThru<'b> {
    /// A predicate with no pending-loop context.
    pub fn new() -> Self {
        Self {
            eval: EvalPred::new(),
            tag_bldr: None,
        }
    }

    /// A predicate consulting `tag_bldr` for pending loop-tagged arrivals.
    pub fn with_builder(tag_bldr: &'b TagGroupBldr) -> Self {
        Self {
            eval: EvalPred::new(),
            tag_bldr: Some(tag_bldr),
        }
    }

    fn loop_enabled(&self, search: &Search<'_>, edge: EdgeId) -> bool {
        !search.graph().edge(edge).disabled_loop
            || (search.sdc().dynamic_loop_breaking()
                && self.has_pending_loop_paths(search, edge))
    }

    /// A disabled loop edge opens when the from-vertex holds a loop-tagged
    /// arrival that still traverses the edge and was not already committed
    /// in a previous pass.
    fn has_pending_loop_paths(&self, search: &Search<'_>, edge: EdgeId) -> bool {
        let Some(bldr) = self.tag_bldr else {
            return false;
        };
        if !bldr.has_loop_tag() {
            return false;
        }
        let from_vertex = search.graph().edge(edge).from;
        let prev_group = search
            .vertex_tag_group(from_vertex)
            .map(|id| search.tag_group(id));
        for (from_tag_id, _, _) in bldr.iter() {
            let from_tag = search.tag(from_tag_id);
            if !from_tag.is_loop {
                continue;
            }
            // Loop patterns apply to both transitions; the rise arc
            // stands in for either.
            let path_ap = from_tag.path_ap;
            let min_max = search.corners().path_ap(path_ap).min_max;
            let to_tag = match search.thru_tag(from_tag_id, edge, RiseFall::Rise, min_max, path_ap)
            {
                Ok(tag) => tag,
                Err(err) => {
                    search.latch_fatal(err);
                    return false;
                }
            };
            if to_tag.is_some()
                && prev_group
                    .as_ref()
                    .map_or(true, |group| !group.has_tag(from_tag_id))
            {
                return true;
            }
        }
        false
    }
}

impl Default for SearchThru<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPred for SearchThru<'_> {
    fn search_from(&self, search: &Search<'_>, from_vertex: VertexId) -> bool {
        self.eval.search_from(search, from_vertex)
    }

    fn search_thru(&self, search: &Search<'_>, edge: EdgeId) -> bool {
        let e = search.graph().edge(edge);
        self.eval.search_thru(search, edge)
            // Latch D→Q enqueueing is driven by the pending-latch-output
            // set; only open latches search through directly.
            && (e.role != TimingRole::LatchDToQ
                || search.latches.latch_d_to_q_state(edge) == LatchState::Open)
            && self.loop_enabled(search, edge)
    }

    fn search_to(&self, search: &Search<'_>, to_vertex: VertexId) -> bool {
        self.eval.search_to(search, to_vertex)
    }
}

/// The clock-network predicate: wire and combinational edges only.
#[derive(Clone, Copy, Default)]
pub struct ClkArrivalPred {
    eval: EvalPred,
}

impl ClkArrivalPred {
    /// A clock-network traversal predicate.
    pub fn new() -> Self {
        Self {
            eval: EvalPred::new(),
        }
    }
}

impl SearchPred for ClkArrivalPred {
    fn search_from(&self, search: &Search<'_>, from_vertex: VertexId) -> bool {
        self.eval.search_from(search, from_vertex)
    }

    fn search_thru(&self, search: &Search<'_>, edge: EdgeId) -> bool {
        search.graph().edge(edge).role.propagates_clock() && self.eval.search_thru(search, edge)
    }

    fn search_to(&self, search: &Search<'_>, to_vertex: VertexId) -> bool {
        self.eval.search_to(search, to_vertex)
    }
}

//! Required-time propagation: backward sweep from endpoints.

use crate::api::PathEnd;
use crate::arrival::tag_match_no_crpr;
use crate::pred::EvalPred;
use crate::search::Search;
use crate::sweep::SweepVisitor;
use crate::visitor::{visit_fanout_paths, FromToPath, FromToPathVisitor};
use kairos_common::{Delay, MinMax, StaResult};
use kairos_graph::{TimingRole, VertexId};

/// Per-vertex required-time accumulator, keyed by arrival index.
///
/// Slots start at the opposite-direction init value; proposals keep the
/// tightest requirement (smallest for max-delay paths).
pub(crate) struct RequiredCmp {
    requireds: Vec<Delay>,
    have_requireds: bool,
}

impl RequiredCmp {
    pub(crate) fn new() -> Self {
        Self {
            requireds: Vec::with_capacity(10),
            have_requireds: false,
        }
    }

    /// Sizes the slots to the vertex's tag group and resets them to the
    /// init value of each path's opposite direction.
    pub(crate) fn requireds_init(&mut self, search: &Search<'_>, vertex: VertexId) {
        self.have_requireds = false;
        let Some(group_id) = search.vertex_tag_group(vertex) else {
            self.requireds.clear();
            return;
        };
        let group = search.tag_group(group_id);
        self.requireds.clear();
        self.requireds.resize(group.arrival_count(), Delay::ZERO);
        for (index, &tag_id) in group.tags().iter().enumerate() {
            let tag = search.tag(tag_id);
            let min_max = search.corners().path_ap(tag.path_ap).min_max;
            self.requireds[index] = min_max.opposite().init_value();
        }
    }

    /// Proposes a required time for one arrival slot, keeping the
    /// dominant value under `req_min` (the opposite of the path's
    /// direction).
    pub(crate) fn required_set(&mut self, arrival_index: usize, required: Delay, req_min: MinMax) {
        if required.fuzzy_dominates(self.requireds[arrival_index], req_min) {
            self.requireds[arrival_index] = required;
            self.have_requireds = true;
        }
    }

    pub(crate) fn required(&self, arrival_index: usize) -> Delay {
        self.requireds[arrival_index]
    }

    /// Commits the accumulated required times; returns `true` if any
    /// changed beyond the tolerance (or were deleted).
    pub(crate) fn requireds_save(&self, search: &Search<'_>, vertex: VertexId) -> bool {
        let mut paths = search.vertex_paths_write(vertex);
        let prev = paths.requireds.as_ref();
        if self.have_requireds {
            let changed = match prev {
                Some(prev) => {
                    prev.len() != self.requireds.len()
                        || prev
                            .iter()
                            .zip(self.requireds.iter())
                            .any(|(a, b)| !a.fuzzy_equal(*b))
                }
                None => true,
            };
            if changed {
                paths.requireds = Some(self.requireds.clone());
            }
            changed
        } else if prev.is_some() {
            paths.requireds = None;
            true
        } else {
            false
        }
    }
}

/// Per-worker backward-propagation visitor.
pub(crate) struct RequiredVisitor {
    required_cmp: RequiredCmp,
}

impl RequiredVisitor {
    pub(crate) fn new() -> Self {
        Self {
            required_cmp: RequiredCmp::new(),
        }
    }

    fn visit_inner(&mut self, search: &Search<'_>, vertex: VertexId) -> StaResult<()> {
        log::trace!("find required {}", search.pin_name(vertex));
        self.required_cmp.requireds_init(search, vertex);
        // Back-propagate requireds from fanout.
        let pred = EvalPred::new();
        visit_fanout_paths(search, vertex, &pred, self)?;
        // Constraints at endpoints set required times directly.
        if search.is_endpoint(vertex) {
            let cmp = &mut self.required_cmp;
            let mut seeder = |path_end: &PathEnd| {
                if !path_end.is_unconstrained {
                    cmp.required_set(
                        path_end.arrival_index,
                        path_end.required,
                        path_end.min_max.opposite(),
                    );
                }
            };
            search.path_ends.visit_path_ends(search, vertex, &mut seeder);
        }
        let changed = self.required_cmp.requireds_save(search, vertex);
        search.tns_invalid(vertex);
        if changed {
            search.enqueue_required_adjacent(vertex);
        }
        Ok(())
    }
}

impl SweepVisitor for RequiredVisitor {
    fn visit(&mut self, search: &Search<'_>, vertex: VertexId) {
        if let Err(err) = self.visit_inner(search, vertex) {
            search.latch_fatal(err);
        }
    }
}

impl FromToPathVisitor for RequiredVisitor {
    fn visit_from_to_path(&mut self, search: &Search<'_>, ctx: &FromToPath) -> StaResult<bool> {
        // Latches terminate the required sweep on their data side.
        if search.graph().edge(ctx.edge).role == TimingRole::LatchDToQ {
            return Ok(true);
        }
        let arrival_index = ctx.from_path.arrival_index as usize;
        let req_min = ctx.min_max.opposite();
        let Some(group_id) = search.vertex_tag_group(ctx.to_vertex) else {
            return Ok(true);
        };
        let group = search.tag_group(group_id);
        if let Some(to_index) = group.index_of(ctx.to_tag) {
            if let Some(to_required) = search.vertex_required_at(ctx.to_vertex, to_index) {
                let from_required = to_required - ctx.arc_delay;
                self.required_cmp
                    .required_set(arrival_index, from_required, req_min);
            }
        } else {
            // The downstream arrival differing only by CRPR clock path may
            // have been pruned; substitute the matching survivor.
            let to_tag = search.tag(ctx.to_tag);
            for (to_index, &candidate_id) in group.tags().iter().enumerate() {
                let candidate = search.tag(candidate_id);
                if tag_match_no_crpr(search, &candidate, &to_tag) {
                    if let Some(to_required) = search.vertex_required_at(ctx.to_vertex, to_index) {
                        let from_required = to_required - ctx.arc_delay;
                        self.required_cmp
                            .required_set(arrival_index, from_required, req_min);
                    }
                    break;
                }
            }
        }
        Ok(true)
    }
}

impl<'a> Search<'a> {
    /// Seeds an endpoint's required times from its path ends; returns
    /// `true` if any were recorded or changed.
    pub(crate) fn seed_required(&self, vertex: VertexId) -> bool {
        log::trace!("required seed {}", self.pin_name(vertex));
        let mut cmp = RequiredCmp::new();
        cmp.requireds_init(self, vertex);
        {
            let cmp = &mut cmp;
            let mut seeder = |path_end: &PathEnd| {
                if !path_end.is_unconstrained {
                    cmp.required_set(
                        path_end.arrival_index,
                        path_end.required,
                        path_end.min_max.opposite(),
                    );
                }
            };
            self.path_ends.visit_path_ends(self, vertex, &mut seeder);
        }
        cmp.requireds_save(self, vertex)
    }
}

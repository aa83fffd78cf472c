//! The arrival visitor: per-vertex forward propagation.
//!
//! One visit pulls arrivals from every fanin edge into a tag-group
//! builder, prunes CRPR-dominated arrivals, injects arrivals that
//! originate at the vertex (internal input delays, internal path-delay
//! startpoints, unclocked register clocks), and commits the result if it
//! changed beyond the comparison tolerance. Each sweep worker owns one
//! visitor; the builders are its scratch state.

use crate::pred::{ClkArrivalPred, EvalPred, SearchPred, SearchThru};
use crate::search::Search;
use crate::sweep::SweepVisitor;
use crate::tag::{Tag, TagId};
use crate::tag_group::TagGroupBldr;
use crate::visitor::{visit_fanin_paths, FromToPath, FromToPathVisitor};
use kairos_common::{Delay, MinMax, StaResult};
use kairos_graph::VertexId;

/// Tag equality ignoring the CRPR clock path, used to pair an arrival
/// with its no-credit twin.
pub(crate) fn tag_match_no_crpr(search: &Search<'_>, a: &Tag, b: &Tag) -> bool {
    a.rf == b.rf
        && a.path_ap == b.path_ap
        && a.is_clk == b.is_clk
        && a.input_delay == b.input_delay
        && a.is_segment_start == b.is_segment_start
        && a.states == b.states
        && search
            .clk_info(a.clk_info)
            .equal_no_crpr(&search.clk_info(b.clk_info))
}

/// Per-worker forward-propagation visitor.
pub(crate) struct ArrivalVisitor {
    always_to_endpoints: bool,
    clk_arrival_only: bool,
    crpr_active: bool,
    has_fanin_one: bool,
    tag_bldr: TagGroupBldr,
    tag_bldr_no_crpr: TagGroupBldr,
}

impl ArrivalVisitor {
    pub(crate) fn new(always_to_endpoints: bool, clk_arrival_only: bool, crpr_active: bool) -> Self {
        Self {
            always_to_endpoints,
            clk_arrival_only,
            crpr_active,
            has_fanin_one: false,
            tag_bldr: TagGroupBldr::new(),
            tag_bldr_no_crpr: TagGroupBldr::new(),
        }
    }

    fn visit_inner(&mut self, search: &Search<'_>, vertex: VertexId) -> StaResult<()> {
        log::trace!("find arrivals {}", search.pin_name(vertex));
        let pin = search.graph().vertex(vertex).pin;
        let sdc = search.sdc();
        // Don't clobber clock sources, unless the pin is an internal
        // path-delay endpoint.
        if sdc.is_vertex_pin_clock(pin) && !sdc.is_path_delay_internal_endpoint(pin) {
            return Ok(());
        }
        search.init_tag_bldr(vertex, &mut self.tag_bldr);
        self.has_fanin_one = search.graph().has_fanin_one(vertex);
        if self.crpr_active && !self.has_fanin_one {
            search.init_tag_bldr(vertex, &mut self.tag_bldr_no_crpr);
        }

        let eval = EvalPred::new();
        let clk_pred = ClkArrivalPred::new();
        let pred: &dyn SearchPred = if self.clk_arrival_only {
            &clk_pred
        } else {
            &eval
        };
        visit_fanin_paths(search, vertex, pred, self)?;
        if self.crpr_active && !self.has_fanin_one {
            self.prune_crpr_arrivals(search)?;
        }

        // Arrivals that originate at this vertex.
        if !search.network.is_top_level_port(pin) && sdc.has_input_delay(pin) {
            // set_input_delay on an internal pin.
            search.seed_input_segment_arrival(pin, vertex, &mut self.tag_bldr)?;
        }
        if sdc.is_path_delay_internal_startpoint(pin) {
            search.make_unclked_paths(vertex, true, &mut self.tag_bldr)?;
        }
        if sdc.is_path_delay_internal_endpoint(pin) && sdc.is_vertex_pin_clock(pin) {
            // A path-delay endpoint that is also a clock source: re-seed
            // the clock arrivals on top of the propagated paths.
            search.seed_clk_arrivals(pin, vertex, &mut self.tag_bldr)?;
        }
        // Register clock pins driven by no declared clock seed unclocked
        // segment paths so unconstrained launch paths can be reported.
        let is_clk = self.tag_bldr.has_clk_tag();
        if search.graph().vertex(vertex).is_reg_clk && !is_clk {
            log::trace!("arrival seed unclked reg clk {}", search.pin_name(vertex));
            search.make_unclked_paths(vertex, true, &mut self.tag_bldr)?;
        }

        let arrivals_changed = search.arrivals_changed(vertex, &self.tag_bldr);
        // A changed latch data arrival re-opens the latch outputs on the
        // next pass.
        if arrivals_changed && search.network.is_latch_data(pin) {
            search.enqueue_latch_data_outputs(vertex);
        }
        if (!search.arrivals_at_endpoints_exist || self.always_to_endpoints || arrivals_changed)
            && (search.network.is_reg_clk_pin(pin) || !sdc.is_path_delay_internal_endpoint(pin))
        {
            let adj_pred = SearchThru::with_builder(&self.tag_bldr);
            search.enqueue_arrival_adjacent(vertex, &adj_pred);
        }
        if arrivals_changed {
            log::trace!("arrival changed");
            search.tns_notify_before(vertex);
            search.set_vertex_arrivals(vertex, &self.tag_bldr)?;
            search.tns_invalid(vertex);
            self.constrained_requireds_invalid(search, vertex, is_clk);
        }
        search.enqueue_ref_pin_input_delays(pin)?;
        Ok(())
    }

    /// Deletes CRPR-credited arrivals dominated by their no-credit twin
    /// even after the maximum possible credit.
    fn prune_crpr_arrivals(&mut self, search: &Search<'_>) -> StaResult<()> {
        let entries: Vec<(TagId, Delay, usize)> = self.tag_bldr.iter().collect();
        for (tag_id, arrival, _) in entries {
            let tag = search.tag(tag_id);
            let clk_info = search.clk_info(tag.clk_info);
            if tag.is_clk || !clk_info.has_crpr_clk_pin() {
                continue;
            }
            let min_max = search.corners().path_ap(tag.path_ap).min_max;
            let (matched, max_arrival, _) = self.no_crpr_match(search, &tag);
            let Some(no_crpr_tag) = matched else {
                continue;
            };
            let no_crpr_info = search.clk_info(search.tag(no_crpr_tag).clk_info);
            let max_crpr = search.max_crpr(&no_crpr_info);
            let adjusted = match min_max {
                MinMax::Max => max_arrival - max_crpr,
                MinMax::Min => max_arrival + max_crpr,
            };
            // Even full credit cannot make this arrival competitive.
            if adjusted.fuzzy_dominates(arrival, min_max) {
                log::trace!("crpr pruned arrival at {:?}", tag_id);
                self.tag_bldr.delete_arrival(tag_id);
            }
        }
        Ok(())
    }

    fn no_crpr_match(&self, search: &Search<'_>, want: &Tag) -> (Option<TagId>, Delay, usize) {
        for (tag_id, arrival, index) in self.tag_bldr_no_crpr.iter() {
            let tag = search.tag(tag_id);
            if tag_match_no_crpr(search, &tag, want) {
                return (Some(tag_id), arrival, index);
            }
        }
        (None, Delay::ZERO, usize::MAX)
    }

    /// A changed clock arrival invalidates the required times of the
    /// checks, data checks, and gated-clock enables it constrains.
    fn constrained_requireds_invalid(&self, search: &Search<'_>, vertex: VertexId, is_clk: bool) {
        let pin = search.graph().vertex(vertex).pin;
        if !search.network.is_load(pin) || !search.requireds_exist {
            return;
        }
        if is_clk && search.network.is_check_clk(pin) {
            for &edge in search.graph().fanout_edges(vertex) {
                let e = search.graph().edge(edge);
                if e.role.is_timing_check() {
                    search.required_invalid(e.to);
                }
            }
        }
        // Data checks apply whether or not the vertex is a clock.
        if let Some(checks) = search.sdc().data_checks_from(pin) {
            for check in checks {
                search.required_invalid_pin(check.to);
            }
        }
        if is_clk && search.sdc().gated_clk_checks_enabled() {
            for &edge in search.graph().fanout_edges(vertex) {
                let to_pin = search.graph().vertex(search.graph().edge(edge).to).pin;
                if search.sdc().is_gated_clk_enable(to_pin) {
                    search.required_invalid(search.graph().edge(edge).to);
                }
            }
        }
    }
}

impl SweepVisitor for ArrivalVisitor {
    fn visit(&mut self, search: &Search<'_>, vertex: VertexId) {
        if let Err(err) = self.visit_inner(search, vertex) {
            search.latch_fatal(err);
        }
    }
}

impl FromToPathVisitor for ArrivalVisitor {
    fn visit_from_to_path(&mut self, search: &Search<'_>, ctx: &FromToPath) -> StaResult<bool> {
        let to_tag = search.tag(ctx.to_tag);
        let to_clk_info = search.clk_info(to_tag.clk_info);
        let (matched, arrival, index) = self.tag_bldr.tag_match_arrival(ctx.to_tag);
        if matched.is_none() || ctx.to_arrival.fuzzy_dominates(arrival, ctx.min_max) {
            let prev = (to_tag.is_clk || to_clk_info.is_gen_clk_src_path)
                .then(|| ctx.from_path.rep());
            self.tag_bldr.set_match_arrival(
                ctx.to_tag,
                &to_tag,
                to_clk_info.is_gen_clk_src_path,
                matched,
                ctx.to_arrival,
                index,
                prev,
            );
            if self.crpr_active
                && !self.has_fanin_one
                && to_clk_info.has_crpr_clk_pin()
                && !to_tag.is_clk
            {
                // The parallel builder matches modulo the CRPR clock path,
                // so all credit variants share one no-credit slot.
                let (matched, arrival, index) = self.no_crpr_match(search, &to_tag);
                if matched.is_none() || ctx.to_arrival.fuzzy_dominates(arrival, ctx.min_max) {
                    self.tag_bldr_no_crpr.set_match_arrival(
                        ctx.to_tag,
                        &to_tag,
                        to_clk_info.is_gen_clk_src_path,
                        matched,
                        ctx.to_arrival,
                        index,
                        prev,
                    );
                }
            }
        }
        Ok(true)
    }
}

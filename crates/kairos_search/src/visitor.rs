//! The path-visitor framework: edge iteration applying a visitor to every
//! (from-path, arc, to-path) triple.
//!
//! The iteration is shared by both sweeps: arrival propagation walks a
//! vertex's fanin edges, required propagation walks fanout edges. Per-role
//! delay and tag handling lives in [`visit_from_path`]; the visitor only
//! sees fully-formed (from-path, to-tag, to-arrival) triples.

use crate::path::PathRef;
use crate::pred::SearchPred;
use crate::search::Search;
use crate::tag::TagId;
use kairos_common::{Delay, MinMax, StaResult};
use kairos_graph::{EdgeId, TimingArc, TimingRole, VertexId};

/// One fully-formed propagation candidate handed to a visitor.
pub(crate) struct FromToPath {
    pub from_vertex: VertexId,
    pub from_tag: TagId,
    pub from_path: PathRef,
    pub edge: EdgeId,
    pub arc: TimingArc,
    pub arc_delay: Delay,
    pub to_vertex: VertexId,
    pub to_tag: TagId,
    pub to_arrival: Delay,
    pub min_max: MinMax,
}

/// A visitor receiving propagation candidates. Returning `false` stops the
/// iteration for the current vertex.
pub(crate) trait FromToPathVisitor {
    fn visit_from_to_path(&mut self, search: &Search<'_>, ctx: &FromToPath) -> StaResult<bool>;
}

/// Applies `visitor` to every candidate arriving at `to_vertex` over its
/// fanin edges.
pub(crate) fn visit_fanin_paths<V: FromToPathVisitor>(
    search: &Search<'_>,
    to_vertex: VertexId,
    pred: &dyn SearchPred,
    visitor: &mut V,
) -> StaResult<()> {
    if !pred.search_to(search, to_vertex) {
        return Ok(());
    }
    for &edge in search.graph().fanin_edges(to_vertex) {
        let from_vertex = search.graph().edge(edge).from;
        if pred.search_from(search, from_vertex) && pred.search_thru(search, edge) {
            if !visit_edge(search, from_vertex, edge, to_vertex, visitor)? {
                break;
            }
        }
    }
    Ok(())
}

/// Applies `visitor` to every candidate leaving `from_vertex` over its
/// fanout edges.
pub(crate) fn visit_fanout_paths<V: FromToPathVisitor>(
    search: &Search<'_>,
    from_vertex: VertexId,
    pred: &dyn SearchPred,
    visitor: &mut V,
) -> StaResult<()> {
    if !pred.search_from(search, from_vertex) {
        return Ok(());
    }
    for &edge in search.graph().fanout_edges(from_vertex) {
        let to_vertex = search.graph().edge(edge).to;
        if pred.search_to(search, to_vertex) && pred.search_thru(search, edge) {
            if !visit_edge(search, from_vertex, edge, to_vertex, visitor)? {
                break;
            }
        }
    }
    Ok(())
}

fn visit_edge<V: FromToPathVisitor>(
    search: &Search<'_>,
    from_vertex: VertexId,
    edge: EdgeId,
    to_vertex: VertexId,
    visitor: &mut V,
) -> StaResult<bool> {
    let from_pin = search.graph().vertex(from_vertex).pin;
    let from_paths = search.vertex_paths_snapshot(from_vertex);
    let Some(group_id) = from_paths.tag_group else {
        return Ok(true);
    };
    let group = search.tag_group(group_id);
    let from_is_segment_start = search.is_segment_start(from_pin);
    for (index, &from_tag_id) in group.tags().iter().enumerate() {
        let from_tag = search.tag(from_tag_id);
        // Only seeded segment paths may leave a segment startpoint.
        if from_is_segment_start && !from_tag.is_segment_start {
            continue;
        }
        // Paths that propagated onto a clock source stop there.
        if search.path_propagated_to_clk_src(from_pin, &from_tag) {
            continue;
        }
        let from_path = PathRef {
            vertex: from_vertex,
            tag: from_tag_id,
            arrival_index: index as u32,
        };
        let from_arrival = from_paths.arrivals[index];
        let arc_set = &search.graph().edge(edge).arc_set;
        let (arc1, arc2) = arc_set.arcs_from(from_tag.rf);
        for arc in [arc1, arc2].into_iter().flatten() {
            if !visit_from_path(
                search,
                from_vertex,
                from_tag_id,
                &from_path,
                from_arrival,
                edge,
                *arc,
                to_vertex,
                visitor,
            )? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Per-role delay computation and tag transformation for one arc.
#[allow(clippy::too_many_arguments)]
fn visit_from_path<V: FromToPathVisitor>(
    search: &Search<'_>,
    from_vertex: VertexId,
    from_tag_id: TagId,
    from_path: &PathRef,
    from_arrival: Delay,
    edge: EdgeId,
    arc: TimingArc,
    to_vertex: VertexId,
    visitor: &mut V,
) -> StaResult<bool> {
    let graph = search.graph();
    let sdc = search.sdc();
    let e = graph.edge(edge);
    let role = e.role;
    let from_pin = graph.vertex(from_vertex).pin;
    let to_pin = graph.vertex(to_vertex).pin;
    let to_rf = arc.to_rf;

    let from_tag = search.tag(from_tag_id);
    let from_clk_info = search.clk_info(from_tag.clk_info);
    let clk_edge = from_clk_info.clk_edge;
    let clock = from_clk_info.clock();
    let path_ap = from_tag.path_ap;
    let min_max = search.corners().path_ap(path_ap).min_max;

    let mut arc_delay = Delay::ZERO;
    let mut to_arrival = Delay::ZERO;
    let mut to_tag = None;

    if from_clk_info.is_gen_clk_src_path {
        let stops = clock.map_or(false, |clk| sdc.clk_stop_propagation(from_pin, clk));
        if !stops && (sdc.clk_thru_tristate_enabled() || !role.is_tristate()) {
            match search.genclks.gen_clk_src_clock(sdc, &from_clk_info) {
                Some(gclk) => {
                    let in_fanin = search.genclks.in_fanin(gclk, to_vertex);
                    let is_fdbk = search.genclks.is_latch_fdbk_edge(gclk, edge);
                    let combinational = search.genclks.is_combinational(sdc, gclk);
                    if (role.propagates_clock() || !combinational) && in_fanin && !is_fdbk {
                        to_tag = search
                            .thru_clk_tag(from_path, from_tag_id, true, edge, to_rf, min_max, path_ap)?;
                        if to_tag.is_some() {
                            arc_delay = search.derated_delay(from_vertex, &arc, edge, true, path_ap);
                            to_arrival = from_arrival + arc_delay;
                        }
                    }
                }
                None => {
                    // PLL output to feedback path.
                    to_tag = search.thru_tag(from_tag_id, edge, to_rf, min_max, path_ap)?;
                    if to_tag.is_some() {
                        arc_delay = search.derated_delay(from_vertex, &arc, edge, true, path_ap);
                        to_arrival = from_arrival + arc_delay;
                    }
                }
            }
        }
    } else if role.generic_role() == TimingRole::RegClkToQ {
        let stops = clock.map_or(false, |clk| sdc.clk_stop_propagation(from_pin, clk));
        if !stops {
            arc_delay = search.derated_delay(from_vertex, &arc, edge, false, path_ap);
            // Launch from unclocked register clock pins (segment starts) or
            // from true clock paths; default-arrival-clock paths and paths
            // already past a register do not relaunch.
            let launches = (clk_edge.is_none() && from_tag.is_segment_start)
                || (clock != sdc.default_arrival_clock() && from_tag.is_clk);
            if launches {
                let mut to_clk_info = from_tag.clk_info;
                if search.network.direction(to_pin) == crate::api::PortDirection::Internal {
                    to_clk_info = search.clk_info_with_crpr_clk_path(from_tag.clk_info, from_path)?;
                }
                let launched = search.from_reg_clk_tag(
                    from_pin,
                    from_tag.rf,
                    clock,
                    clk_edge.map(|e| e.rf),
                    to_clk_info,
                    to_pin,
                    to_rf,
                    min_max,
                    path_ap,
                )?;
                to_tag = match launched {
                    Some(tag) => search.thru_tag(tag, edge, to_rf, min_max, path_ap)?,
                    None => None,
                };
                // Ideal clocks relaunch from the reconstructed clock
                // arrival rather than the stored one.
                to_arrival = search.clk_path_arrival(from_path) + arc_delay;
            }
        }
    } else if role == TimingRole::LatchDToQ {
        if min_max == MinMax::Max {
            arc_delay = search.derated_delay(from_vertex, &arc, edge, false, path_ap);
            if let Some((latch_tag, latch_delay, latch_arrival)) =
                search
                    .latches
                    .latch_out_arrival(search, from_path, &arc, edge, path_ap)?
            {
                arc_delay = latch_delay;
                to_arrival = latch_arrival;
                to_tag = search.thru_tag(latch_tag, edge, to_rf, min_max, path_ap)?;
            }
        }
    } else if from_tag.is_clk {
        // Wire edges from clock source pins can be disabled by
        // hierarchical-pin records; clock arrivals used as data too.
        let hpin_disabled = role.is_wire()
            && clock.map_or(false, |clk| sdc.clk_disabled_by_hpin_thru(clk, from_pin, to_pin));
        if !hpin_disabled {
            let stops = clock.map_or(false, |clk| sdc.clk_stop_propagation(from_pin, clk));
            let to_propagates_clk =
                !stops && (sdc.clk_thru_tristate_enabled() || !role.is_tristate());
            arc_delay = search.derated_delay(from_vertex, &arc, edge, to_propagates_clk, path_ap);
            to_tag = search.thru_clk_tag(
                from_path,
                from_tag_id,
                to_propagates_clk,
                edge,
                to_rf,
                min_max,
                path_ap,
            )?;
            to_arrival = from_arrival + arc_delay;
        }
    } else {
        arc_delay = search.derated_delay(from_vertex, &arc, edge, false, path_ap);
        to_arrival = from_arrival + arc_delay;
        to_tag = search.thru_tag(from_tag_id, edge, to_rf, min_max, path_ap)?;
    }

    if let Some(to_tag) = to_tag {
        let ctx = FromToPath {
            from_vertex,
            from_tag: from_tag_id,
            from_path: *from_path,
            edge,
            arc,
            arc_delay,
            to_vertex,
            to_tag,
            to_arrival,
            min_max,
        };
        visitor.visit_from_to_path(search, &ctx)
    } else {
        Ok(true)
    }
}

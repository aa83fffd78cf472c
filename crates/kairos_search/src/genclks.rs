//! Generated-clock source analysis.
//!
//! Generated clocks derive their waveform from a master clock through a
//! divider network. Before any clock seeding, the engine computes each
//! generated clock's *source insertion delay*: the master's insertion plus
//! the network delay from the master source to the generated clock's
//! source pin, per transition and analysis point. The fanin vertex set of
//! each generated clock gates which edges its source paths may follow
//! during the main sweep, and latch D→Q edges inside that fanin are
//! treated as feedback and excluded.

use crate::clk_info::ClkInfo;
use crate::corner::PathApIndex;
use crate::search::Search;
use kairos_common::{Delay, Ident, RiseFall, StaResult};
use kairos_graph::{EdgeId, TimingRole, VertexId};
use kairos_sdc::{ClockId, Sdc};
use std::collections::{HashMap, HashSet};

/// Generated-clock source state: insertion delays, fanin sets, and latch
/// feedback edges, computed by the pre-pass.
#[derive(Default)]
pub struct Genclks {
    insertions: HashMap<(ClockId, Ident, RiseFall, PathApIndex), Delay>,
    fanins: HashMap<ClockId, HashSet<VertexId>>,
    fdbk_edges: HashMap<ClockId, HashSet<EdgeId>>,
    computed: bool,
}

impl Genclks {
    /// Creates empty generated-clock state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all computed state.
    pub fn clear(&mut self) {
        self.insertions.clear();
        self.fanins.clear();
        self.fdbk_edges.clear();
        self.computed = false;
    }

    /// Returns `true` once the pre-pass has run.
    pub fn computed(&self) -> bool {
        self.computed
    }

    /// The computed insertion delay of `clock` at its source `pin` for the
    /// given transition and analysis point.
    pub fn insertion_delay(
        &self,
        clock: ClockId,
        pin: Ident,
        rf: RiseFall,
        path_ap: PathApIndex,
    ) -> Option<Delay> {
        self.insertions.get(&(clock, pin, rf, path_ap)).copied()
    }

    /// Returns `true` if `vertex` is inside the source network of `clock`.
    pub fn in_fanin(&self, clock: ClockId, vertex: VertexId) -> bool {
        self.fanins.get(&clock).map_or(false, |s| s.contains(&vertex))
    }

    /// Returns `true` if `edge` is a latch feedback edge of `clock`'s
    /// source network.
    pub fn is_latch_fdbk_edge(&self, clock: ClockId, edge: EdgeId) -> bool {
        self.fdbk_edges.get(&clock).map_or(false, |s| s.contains(&edge))
    }

    /// Resolves the generated clock a source-path clock info belongs to.
    pub fn gen_clk_src_clock(&self, sdc: &Sdc, clk_info: &ClkInfo) -> Option<ClockId> {
        let src_pin = clk_info.gen_clk_src?;
        sdc.vertex_pin_clocks(src_pin)?
            .iter()
            .copied()
            .find(|&clk| sdc.clock(clk).is_generated())
    }

    /// Returns `true` if the generated clock is combinational (no
    /// frequency division); its source paths then follow only wire and
    /// combinational edges.
    pub fn is_combinational(&self, sdc: &Sdc, clock: ClockId) -> bool {
        sdc.clock(clock)
            .generated
            .map_or(false, |g| g.divide_by == 1)
    }
}

impl<'a> Search<'a> {
    /// Computes generated-clock insertion delays, fanin sets, and latch
    /// feedback edges. Idempotent until the state is cleared.
    pub fn ensure_insertion_delays(&mut self) -> StaResult<()> {
        if self.genclks.computed() {
            return Ok(());
        }
        struct GenClkWork {
            clock: ClockId,
            master: ClockId,
            sources: Vec<Ident>,
            master_sources: Vec<Ident>,
        }
        let work: Vec<GenClkWork> = self
            .sdc
            .clocks()
            .iter()
            .filter_map(|clk| {
                let master = clk.master_clk()?;
                Some(GenClkWork {
                    clock: clk.id,
                    master,
                    sources: clk.sources.clone(),
                    master_sources: self.sdc.clock(master).sources.clone(),
                })
            })
            .collect();

        for item in work {
            let mut fanin = HashSet::new();
            let mut worklist = Vec::new();
            for &src_pin in &item.sources {
                if let Some(vertex) = self.graph.pin_vertex(src_pin) {
                    if fanin.insert(vertex) {
                        worklist.push(vertex);
                    }
                }
            }
            while let Some(vertex) = worklist.pop() {
                for &edge in self.graph.fanin_edges(vertex) {
                    let e = self.graph.edge(edge);
                    if e.disabled || e.disabled_loop {
                        continue;
                    }
                    if !e.role.propagates_clock() && e.role != TimingRole::LatchDToQ {
                        continue;
                    }
                    if fanin.insert(e.from) {
                        worklist.push(e.from);
                    }
                }
            }

            let mut fdbk = HashSet::new();
            for &vertex in &fanin {
                for &edge in self.graph.fanout_edges(vertex) {
                    let e = self.graph.edge(edge);
                    if e.role == TimingRole::LatchDToQ && fanin.contains(&e.to) {
                        fdbk.insert(edge);
                    }
                }
            }

            let insertions = self.find_src_insertions(item.master, &item.master_sources, &fanin)?;
            for &src_pin in &item.sources {
                let Some(src_vertex) = self.graph.pin_vertex(src_pin) else {
                    continue;
                };
                for ap in self.corners.path_aps() {
                    for rf in RiseFall::BOTH {
                        if let Some(&delay) =
                            insertions.get(&(src_vertex, rf, ap.index))
                        {
                            log::debug!(
                                "gen clk insertion {} {} {} {}",
                                self.interner.resolve(src_pin),
                                rf.short_name(),
                                ap.index,
                                delay
                            );
                            self.genclks
                                .insertions
                                .insert((item.clock, src_pin, rf, ap.index), delay);
                        }
                    }
                }
            }
            self.genclks.fanins.insert(item.clock, fanin);
            self.genclks.fdbk_edges.insert(item.clock, fdbk);
        }
        self.genclks.computed = true;
        Ok(())
    }

    /// Level-order relaxation of the master clock's network delay over the
    /// generated clock's fanin, per transition and analysis point.
    fn find_src_insertions(
        &self,
        master: ClockId,
        master_sources: &[Ident],
        fanin: &HashSet<VertexId>,
    ) -> StaResult<HashMap<(VertexId, RiseFall, PathApIndex), Delay>> {
        let mut dist: HashMap<(VertexId, RiseFall, PathApIndex), Delay> = HashMap::new();
        for &pin in master_sources {
            let Some(vertex) = self.graph.pin_vertex(pin) else {
                continue;
            };
            if !fanin.contains(&vertex) {
                continue;
            }
            for ap in self.corners.path_aps() {
                let insertion = self
                    .sdc
                    .clock_insertion(master, Some(pin), ap.min_max)
                    .unwrap_or(Delay::ZERO);
                for rf in RiseFall::BOTH {
                    dist.insert((vertex, rf, ap.index), insertion);
                }
            }
        }

        let mut vertices: Vec<VertexId> = fanin.iter().copied().collect();
        vertices.sort_by_key(|&v| (self.graph.vertex(v).level, v));
        for &vertex in &vertices {
            for &edge in self.graph.fanout_edges(vertex) {
                let e = self.graph.edge(edge);
                if e.disabled || e.disabled_loop || !e.role.propagates_clock() {
                    continue;
                }
                if !fanin.contains(&e.to) {
                    continue;
                }
                for ap in self.corners.path_aps() {
                    for from_rf in RiseFall::BOTH {
                        let Some(&from_delay) = dist.get(&(vertex, from_rf, ap.index)) else {
                            continue;
                        };
                        let (arc1, arc2) = e.arc_set.arcs_from(from_rf);
                        for arc in [arc1, arc2].into_iter().flatten() {
                            let delay = from_delay
                                + self.derated_delay(vertex, arc, edge, true, ap.index);
                            let key = (e.to, arc.to_rf, ap.index);
                            let better = match dist.get(&key) {
                                Some(&existing) => delay.dominates(existing, ap.min_max),
                                None => true,
                            };
                            if better {
                                dist.insert(key, delay);
                            }
                        }
                    }
                }
            }
        }
        Ok(dist)
    }

    /// Seeds the generated-clock source-path tags at the master source
    /// vertices so the main sweep can carry them to the generated clock
    /// roots. The summary flag they set answers the
    /// [`is_gen_clk_src`](Search::is_gen_clk_src) query.
    pub(crate) fn gen_clk_src_path_seeds(
        &self,
        pin: Ident,
    ) -> StaResult<Vec<(crate::tag::TagId, Delay)>> {
        let mut seeds = Vec::new();
        let Some(clocks) = self.sdc.vertex_pin_clocks(pin) else {
            return Ok(seeds);
        };
        // This pin may be the master source of several generated clocks.
        for gclk in self.sdc.clocks() {
            let Some(gen) = gclk.generated else {
                continue;
            };
            if !clocks.contains(&gen.master) {
                continue;
            }
            let Some(gen_src) = gclk.default_pin() else {
                continue;
            };
            let master = self.sdc.clock(gen.master);
            for ap in self.corners.path_aps() {
                for rf in RiseFall::BOTH {
                    let insertion = self
                        .sdc
                        .clock_insertion(gen.master, Some(pin), ap.min_max)
                        .unwrap_or(Delay::ZERO);
                    let clk_info = self.find_clk_info(ClkInfo {
                        clk_edge: Some(master.edge(rf)),
                        clk_src: Some(pin),
                        is_propagated: true,
                        gen_clk_src: Some(gen_src),
                        is_gen_clk_src_path: true,
                        pulse_clk_sense: None,
                        insertion,
                        latency: Delay::ZERO,
                        uncertainties: None,
                        path_ap: ap.index,
                        crpr_clk_path: None,
                    })?;
                    let states = self.sdc.exception_from_clk_states(pin, rf, gen.master, ap.min_max);
                    let tag =
                        self.find_tag(rf, ap.index, clk_info, false, None, false, states)?;
                    let arrival = master.edge_time(rf) + insertion;
                    seeds.push((tag, arrival));
                }
            }
        }
        Ok(seeds)
    }
}

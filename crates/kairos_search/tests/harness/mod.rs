//! Shared test harness: table-driven collaborator implementations and a
//! small circuit builder.

// Each integration test binary uses a different slice of the harness.
#![allow(dead_code)]

use kairos_common::{Delay, Ident, Interner, MinMax, RiseFall, StaResult};
use kairos_graph::{
    levelize, EdgeId, LoopPath, TimingArc, TimingArcSet, TimingGraph, TimingRole, TimingSense,
    VertexId,
};
use kairos_sdc::{ClockId, ExceptionKind, Sdc};
use kairos_search::{
    Corners, DelayCalculator, LatchAnalyzer, LatchState, Network, PathEnd, PathEndProvider,
    PathRef, PortDirection, Search, TagId,
};
use std::collections::{HashMap, HashSet};

/// Table-driven netlist facts.
#[derive(Default)]
pub struct TableNetwork {
    pub top_ports: HashSet<Ident>,
    pub directions: HashMap<Ident, PortDirection>,
    pub latch_data: HashSet<Ident>,
    pub check_clks: HashSet<Ident>,
    pub reg_clk_pins: HashSet<Ident>,
    pub pulse_senses: HashMap<Ident, RiseFall>,
    pub hier: HashMap<Ident, Vec<(Ident, Ident)>>,
    pub inputs: Vec<Ident>,
    pub instances: HashMap<Ident, Vec<Ident>>,
}

impl Network for TableNetwork {
    fn is_top_level_port(&self, pin: Ident) -> bool {
        self.top_ports.contains(&pin)
    }

    fn direction(&self, pin: Ident) -> PortDirection {
        self.directions
            .get(&pin)
            .copied()
            .unwrap_or(PortDirection::Internal)
    }

    fn is_hierarchical(&self, pin: Ident) -> bool {
        self.hier.contains_key(&pin)
    }

    fn visit_drvr_loads_thru_hier_pin(&self, hpin: Ident, visit: &mut dyn FnMut(Ident, Ident)) {
        if let Some(pairs) = self.hier.get(&hpin) {
            for &(drvr, load) in pairs {
                visit(drvr, load);
            }
        }
    }

    fn is_latch_data(&self, pin: Ident) -> bool {
        self.latch_data.contains(&pin)
    }

    fn is_check_clk(&self, pin: Ident) -> bool {
        self.check_clks.contains(&pin)
    }

    fn is_load(&self, _pin: Ident) -> bool {
        true
    }

    fn is_reg_clk_pin(&self, pin: Ident) -> bool {
        self.reg_clk_pins.contains(&pin)
    }

    fn pulse_clk_sense(&self, pin: Ident) -> Option<RiseFall> {
        self.pulse_senses.get(&pin).copied()
    }

    fn top_level_input_pins(&self) -> Vec<Ident> {
        self.inputs.clone()
    }

    fn instance_pins(&self, instance: Ident) -> Vec<Ident> {
        self.instances.get(&instance).cloned().unwrap_or_default()
    }
}

/// Fixed per-edge delays, with optional per-analysis-point overrides.
#[derive(Default)]
pub struct FixedDelayCalc {
    pub delays: HashMap<EdgeId, Delay>,
    pub ap_delays: HashMap<(EdgeId, usize), Delay>,
}

impl FixedDelayCalc {
    pub fn set(&mut self, edge: EdgeId, delay: f64) {
        self.delays.insert(edge, Delay::new(delay));
    }

    pub fn set_ap(&mut self, edge: EdgeId, dcalc_ap: usize, delay: f64) {
        self.ap_delays.insert((edge, dcalc_ap), Delay::new(delay));
    }
}

impl DelayCalculator for FixedDelayCalc {
    fn arc_delay(&self, edge: EdgeId, _arc: &TimingArc, dcalc_ap: usize) -> Delay {
        self.ap_delays
            .get(&(edge, dcalc_ap))
            .or_else(|| self.delays.get(&edge))
            .copied()
            .unwrap_or(Delay::ZERO)
    }
}

/// Latch behavior tables: D→Q edges with a declared transparency. The
/// transparent-latch output path reuses the data path's tag; borrow
/// accounting is a reporting concern outside the core.
#[derive(Default)]
pub struct SimpleLatches {
    pub d_to_q: HashMap<EdgeId, LatchState>,
}

impl LatchAnalyzer for SimpleLatches {
    fn is_latch_d_to_q(&self, edge: EdgeId) -> bool {
        self.d_to_q.contains_key(&edge)
    }

    fn latch_d_to_q_state(&self, edge: EdgeId) -> LatchState {
        self.d_to_q.get(&edge).copied().unwrap_or(LatchState::Unknown)
    }

    fn latch_out_arrival(
        &self,
        search: &Search<'_>,
        from_path: &PathRef,
        arc: &TimingArc,
        edge: EdgeId,
        path_ap: kairos_search::PathApIndex,
    ) -> StaResult<Option<(TagId, Delay, Delay)>> {
        match self.latch_d_to_q_state(edge) {
            LatchState::Closed => Ok(None),
            _ => {
                let arc_delay = search.derated_delay(from_path.vertex, arc, edge, false, path_ap);
                let arrival = search.path_arrival(from_path) + arc_delay;
                Ok(Some((from_path.tag, arc_delay, arrival)))
            }
        }
    }

    fn latch_enable_path(
        &self,
        _search: &Search<'_>,
        _path: &PathRef,
        _edge: EdgeId,
    ) -> Option<PathRef> {
        None
    }
}

/// Reference path-end provider: derives required times from setup/hold
/// check edges, honoring multicycle and path-delay exception states the
/// search recorded on the data tags.
#[derive(Default)]
pub struct CheckEndProvider {
    pub setup: HashMap<EdgeId, Delay>,
    pub hold: HashMap<EdgeId, Delay>,
}

impl CheckEndProvider {
    pub fn set_setup(&mut self, edge: EdgeId, margin: f64) {
        self.setup.insert(edge, Delay::new(margin));
    }

    pub fn set_hold(&mut self, edge: EdgeId, margin: f64) {
        self.hold.insert(edge, Delay::new(margin));
    }

    /// The first capture moment strictly after the launch edge, advanced
    /// by multicycle allowance.
    fn capture_time(launch: f64, capture_edge: f64, capture_period: f64, cycles: u32) -> f64 {
        let mut capture = capture_edge;
        if capture_period > 0.0 {
            while capture <= launch + 1e-9 {
                capture += capture_period;
            }
            capture += (cycles.saturating_sub(1)) as f64 * capture_period;
        }
        capture
    }

    fn data_path_cycles(&self, search: &Search<'_>, tag: TagId, min_max: MinMax) -> u32 {
        let tag = search.tag(tag);
        for state in &tag.states {
            let exc = search.sdc().exception(state.exception);
            if let ExceptionKind::Multicycle { min_max: mm, cycles } = exc.kind {
                if mm.map_or(true, |m| m == min_max) && state.is_complete(exc) {
                    return cycles;
                }
            }
        }
        1
    }

    fn data_path_delay_bound(
        &self,
        search: &Search<'_>,
        tag: TagId,
        min_max: MinMax,
    ) -> Option<Delay> {
        let tag = search.tag(tag);
        for state in &tag.states {
            let exc = search.sdc().exception(state.exception);
            if let ExceptionKind::PathDelay { min_max: mm, delay } = exc.kind {
                if mm == min_max && state.is_complete(exc) {
                    return Some(delay);
                }
            }
        }
        None
    }

    fn visit_check_edge(
        &self,
        search: &Search<'_>,
        vertex: VertexId,
        edge: EdgeId,
        min_max: MinMax,
        margin: Delay,
        visitor: &mut dyn FnMut(&PathEnd),
    ) {
        let graph = search.graph();
        let clk_vertex = graph.edge(edge).from;
        let clk_rf = graph
            .edge(edge)
            .arc_set
            .arcs()
            .first()
            .map(|arc| arc.from_rf)
            .unwrap_or(RiseFall::Rise);

        for data_path in search.vertex_path_refs(vertex) {
            let data_tag = search.tag(data_path.tag);
            if data_tag.is_clk || data_tag.is_filter {
                continue;
            }
            let data_ap = search.corners().path_ap(data_tag.path_ap);
            if data_ap.min_max != min_max {
                continue;
            }
            let arrival = search.path_arrival(&data_path);

            // Absolute path-delay bounds replace the clock requirement.
            if let Some(bound) = self.data_path_delay_bound(search, data_path.tag, min_max) {
                let required = bound;
                let end = PathEnd {
                    arrival_index: data_path.arrival_index as usize,
                    min_max,
                    required,
                    slack: min_max.slack(arrival, required),
                    is_unconstrained: false,
                };
                visitor(&end);
                continue;
            }

            let launch = match search.clk_info(data_tag.clk_info).clk_edge {
                Some(clk_edge) => search.sdc().edge_time(clk_edge).as_ns(),
                None => 0.0,
            };
            // Capture clock arrival uses the opposite analysis side.
            let capture_ap = search
                .corners()
                .find_path_ap(data_ap.corner, min_max.opposite())
                .index;
            let cycles = self.data_path_cycles(search, data_path.tag, min_max);
            let mut tightest: Option<Delay> = None;
            for clk_path in search.vertex_path_refs(clk_vertex) {
                let clk_tag = search.tag(clk_path.tag);
                if !clk_tag.is_clk || clk_tag.rf != clk_rf || clk_tag.path_ap != capture_ap {
                    continue;
                }
                let clk_info = search.clk_info(clk_tag.clk_info);
                let Some(capture_edge) = clk_info.clk_edge else {
                    continue;
                };
                let capture_clk = search.sdc().clock(capture_edge.clock);
                let clk_arrival = search.clk_path_arrival(&clk_path);
                let network_delay = clk_arrival - search.sdc().edge_time(capture_edge);
                let uncertainty = clk_info
                    .uncertainties
                    .map(|u| u.value(min_max))
                    .unwrap_or(Delay::ZERO);
                let required = match min_max {
                    MinMax::Max => {
                        let capture = Self::capture_time(
                            launch,
                            search.sdc().edge_time(capture_edge).as_ns(),
                            capture_clk.period.as_ns(),
                            cycles,
                        );
                        Delay::new(capture) + network_delay - margin - uncertainty
                    }
                    MinMax::Min => clk_arrival + margin + uncertainty,
                };
                let tighter = match tightest {
                    Some(existing) => required.dominates(existing, min_max.opposite()),
                    None => true,
                };
                if tighter {
                    tightest = Some(required);
                }
            }
            if let Some(required) = tightest {
                let end = PathEnd {
                    arrival_index: data_path.arrival_index as usize,
                    min_max,
                    required,
                    slack: min_max.slack(arrival, required),
                    is_unconstrained: false,
                };
                visitor(&end);
            }
        }
    }
}

impl PathEndProvider for CheckEndProvider {
    fn visit_path_ends(
        &self,
        search: &Search<'_>,
        vertex: VertexId,
        visitor: &mut dyn FnMut(&PathEnd),
    ) {
        let graph = search.graph();
        for &edge in graph.fanin_edges(vertex) {
            match graph.edge(edge).role {
                TimingRole::SetupCheck => {
                    if let Some(&margin) = self.setup.get(&edge) {
                        self.visit_check_edge(search, vertex, edge, MinMax::Max, margin, visitor);
                    }
                }
                TimingRole::HoldCheck => {
                    if let Some(&margin) = self.hold.get(&edge) {
                        self.visit_check_edge(search, vertex, edge, MinMax::Min, margin, visitor);
                    }
                }
                _ => {}
            }
        }
    }

    fn check_edge_enabled(&self, _search: &Search<'_>, edge: EdgeId) -> bool {
        self.setup.contains_key(&edge) || self.hold.contains_key(&edge)
    }
}

/// A circuit under construction: graph, constraints, and collaborator
/// tables built together.
pub struct Bench {
    pub interner: Interner,
    pub graph: TimingGraph,
    pub sdc: Sdc,
    pub network: TableNetwork,
    pub dcalc: FixedDelayCalc,
    pub latches: SimpleLatches,
    pub ends: CheckEndProvider,
    pub loops: Vec<LoopPath>,
}

impl Bench {
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            graph: TimingGraph::new(),
            sdc: Sdc::new(),
            network: TableNetwork::default(),
            dcalc: FixedDelayCalc::default(),
            latches: SimpleLatches::default(),
            ends: CheckEndProvider::default(),
            loops: Vec::new(),
        }
    }

    pub fn pin(&self, name: &str) -> Ident {
        self.interner.intern(name)
    }

    /// Adds a top-level input port vertex.
    pub fn input(&mut self, name: &str) -> VertexId {
        let pin = self.pin(name);
        self.network.top_ports.insert(pin);
        self.network.directions.insert(pin, PortDirection::Input);
        self.network.inputs.push(pin);
        self.graph.add_vertex(pin)
    }

    /// Adds an internal pin vertex.
    pub fn vertex(&mut self, name: &str) -> VertexId {
        let pin = self.pin(name);
        self.graph.add_vertex(pin)
    }

    /// Adds a wire edge with a delay.
    pub fn wire(&mut self, from: VertexId, to: VertexId, delay: f64) -> EdgeId {
        let edge = self
            .graph
            .add_edge(from, to, TimingRole::Wire, TimingArcSet::wire());
        self.dcalc.set(edge, delay);
        edge
    }

    /// Adds a combinational edge with a delay.
    pub fn comb(&mut self, from: VertexId, to: VertexId, delay: f64) -> EdgeId {
        let edge = self.graph.add_edge(
            from,
            to,
            TimingRole::Combinational,
            TimingArcSet::combinational(TimingSense::PositiveUnate),
        );
        self.dcalc.set(edge, delay);
        edge
    }

    /// Declares a clock with the given period on a new source port.
    pub fn clock(&mut self, name: &str, port: &str, period: f64) -> (ClockId, VertexId) {
        let port_pin = self.pin(port);
        self.network.top_ports.insert(port_pin);
        self.network.directions.insert(port_pin, PortDirection::Input);
        let vertex = self.graph.add_vertex(port_pin);
        let clock = self.sdc.make_clock(
            self.pin(name),
            Delay::new(period),
            None,
            vec![port_pin],
        );
        (clock, vertex)
    }

    /// Adds an edge-triggered register: clock pin, data pin with a setup
    /// check, and output pin with a clk→Q edge. Returns
    /// (clk vertex, data vertex, output vertex).
    pub fn register(
        &mut self,
        name: &str,
        clk_to_q: f64,
        setup: f64,
    ) -> (VertexId, VertexId, VertexId) {
        let clk = self.vertex(&format!("{name}/CLK"));
        let data = self.vertex(&format!("{name}/D"));
        let out = self.vertex(&format!("{name}/Q"));
        self.graph.set_reg_clk(clk);
        let clk_pin = self.graph.vertex(clk).pin;
        self.network.reg_clk_pins.insert(clk_pin);
        self.network.check_clks.insert(clk_pin);
        let q_edge = self.graph.add_edge(
            clk,
            out,
            TimingRole::RegClkToQ,
            TimingArcSet::clk_to_q(RiseFall::Rise),
        );
        self.dcalc.set(q_edge, clk_to_q);
        let check = self.graph.add_edge(
            clk,
            data,
            TimingRole::SetupCheck,
            TimingArcSet::check(RiseFall::Rise),
        );
        self.ends.set_setup(check, setup);
        (clk, data, out)
    }

    /// Adds a transparent latch: enable pin, data pin, output pin with a
    /// D→Q edge in the given state. Returns (enable, data, out, d→q edge).
    pub fn latch(
        &mut self,
        name: &str,
        d_to_q: f64,
        state: LatchState,
    ) -> (VertexId, VertexId, VertexId, EdgeId) {
        let enable = self.vertex(&format!("{name}/EN"));
        let data = self.vertex(&format!("{name}/D"));
        let out = self.vertex(&format!("{name}/Q"));
        self.graph.set_reg_clk(enable);
        let en_pin = self.graph.vertex(enable).pin;
        self.network.reg_clk_pins.insert(en_pin);
        let data_pin = self.graph.vertex(data).pin;
        self.graph.vertex_mut(data).is_latch_data = true;
        self.network.latch_data.insert(data_pin);
        let edge = self
            .graph
            .add_edge(data, out, TimingRole::LatchDToQ, TimingArcSet::wire());
        self.dcalc.set(edge, d_to_q);
        self.latches.d_to_q.insert(edge, state);
        (enable, data, out, edge)
    }

    /// Declares an input delay on a port, measured from a clock edge.
    pub fn input_delay(&mut self, port: VertexId, clock: ClockId, value: f64) {
        let pin = self.graph.vertex(port).pin;
        let edge = self.sdc.clock(clock).edge(RiseFall::Rise);
        let id = self.sdc.make_input_delay(pin, Some(edge), false);
        self.sdc.input_delay_mut(id).set_all(Delay::new(value));
    }

    /// Levelizes the graph and records loop exceptions.
    pub fn finish(&mut self) {
        self.loops = levelize(&mut self.graph);
        self.sdc.make_loop_exceptions(&self.graph, &self.loops);
    }

    /// Builds the search engine over the bench.
    pub fn search(&self) -> Search<'_> {
        let corners = Corners::single(self.interner.intern("typ"));
        Search::new(
            &self.graph,
            self.sdc.clone(),
            &self.network,
            &self.dcalc,
            &self.latches,
            &self.ends,
            corners,
            &self.interner,
        )
    }
}

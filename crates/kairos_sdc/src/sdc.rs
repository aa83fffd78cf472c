//! The constraint store.
//!
//! [`Sdc`] aggregates every constraint the search consults: clocks by
//! source pin, latencies and insertions, uncertainties, input delays,
//! derates, data checks, gated-clock enables, analysis options, and the
//! path exceptions with their state-machine queries. It is built by a
//! front end (or a test harness) and is read-only during analysis.

use crate::clocks::{
    default_waveform, ClkEdgeRef, Clock, ClockId, ClockUncertainties, GeneratedClock, Waveform,
};
use crate::derate::Derates;
use crate::exceptions::{
    canonicalize, ExceptionId, ExceptionKind, ExceptionPath, ExceptionPoint, ExceptionState,
    ExceptionStateSet,
};
use crate::io_delays::{InputDelay, InputDelayId};
use indexmap::IndexMap;
use kairos_common::{Delay, Ident, Interner, MinMax, RiseFall};
use kairos_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use kairos_graph::{LoopPath, TimingGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Longest clock-relationship expansion considered before warning that two
/// clocks share no common period.
const CLK_TO_CLK_MAX_CYCLES: u32 = 1000;

/// A `set_data_check` record: arrivals at `from` constrain `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCheck {
    /// The pin whose arrival acts as the reference.
    pub from: Ident,
    /// The constrained pin.
    pub to: Ident,
}

/// The timing constraint store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sdc {
    clocks: Vec<Clock>,
    clock_by_name: HashMap<Ident, ClockId>,
    pin_clocks: IndexMap<Ident, Vec<ClockId>>,
    propagated_pins: HashSet<Ident>,

    clock_latency: HashMap<(ClockId, MinMax), Delay>,
    clock_pin_latency: HashMap<(ClockId, Ident, MinMax), Delay>,
    clock_hpin_latency: HashMap<(ClockId, Ident, MinMax), Delay>,
    clock_insertion: HashMap<(ClockId, MinMax), Delay>,
    clock_pin_insertion: HashMap<(ClockId, Ident, MinMax), Delay>,
    pin_uncertainties: HashMap<Ident, ClockUncertainties>,

    input_delays: Vec<InputDelay>,
    pin_input_delays: IndexMap<Ident, Vec<InputDelayId>>,
    ref_pin_input_delays: HashMap<Ident, Vec<InputDelayId>>,
    internal_input_delay_pins: HashSet<Ident>,

    exceptions: Vec<Option<ExceptionPath>>,
    path_delay_internal_startpoints: HashSet<Ident>,
    path_delay_internal_endpoints: HashSet<Ident>,

    data_checks: HashMap<Ident, Vec<DataCheck>>,
    gated_clk_enables: HashSet<Ident>,
    gated_clk_checks_enabled: bool,

    clk_stop_pins: HashSet<Ident>,
    clk_hpin_disables: HashSet<(ClockId, Ident, Ident)>,

    /// Derating factors applied by the search's delay queries.
    pub derates: Derates,

    crpr_active: bool,
    dynamic_loop_breaking: bool,
    clk_thru_tristate: bool,
    default_arrival_clock: Option<ClockId>,
}

impl Sdc {
    /// Creates an empty store with default options: CRPR off, dynamic loop
    /// breaking off, clocks propagate through tristates.
    pub fn new() -> Self {
        Self {
            clk_thru_tristate: true,
            ..Self::default()
        }
    }

    // ---------------------------------------------------------------- clocks

    /// Defines a clock on the given source pins.
    pub fn make_clock(
        &mut self,
        name: Ident,
        period: Delay,
        waveform: Option<Waveform>,
        sources: Vec<Ident>,
    ) -> ClockId {
        let id = ClockId::from_raw(self.clocks.len() as u32);
        for &pin in &sources {
            self.pin_clocks.entry(pin).or_default().push(id);
        }
        self.clocks.push(Clock {
            id,
            name,
            period,
            waveform: waveform.unwrap_or_else(|| default_waveform(period)),
            sources,
            is_propagated: false,
            uncertainties: None,
            generated: None,
        });
        self.clock_by_name.insert(name, id);
        id
    }

    /// Defines a generated clock derived from `master` by `divide_by`.
    pub fn make_generated_clock(
        &mut self,
        name: Ident,
        master: ClockId,
        divide_by: u32,
        sources: Vec<Ident>,
    ) -> ClockId {
        let master_period = self.clock(master).period;
        let period = Delay::new(master_period.as_ns() * divide_by as f64);
        let id = self.make_clock(name, period, None, sources);
        self.clocks[id.index()].generated = Some(GeneratedClock { master, divide_by });
        id
    }

    /// Returns the clock with the given ID.
    pub fn clock(&self, id: ClockId) -> &Clock {
        &self.clocks[id.index()]
    }

    /// Returns a mutable reference to the clock with the given ID.
    pub fn clock_mut(&mut self, id: ClockId) -> &mut Clock {
        &mut self.clocks[id.index()]
    }

    /// Looks up a clock by name.
    pub fn find_clock(&self, name: Ident) -> Option<ClockId> {
        self.clock_by_name.get(&name).copied()
    }

    /// All clocks, in definition order.
    pub fn clocks(&self) -> &[Clock] {
        &self.clocks
    }

    /// The time of a clock edge.
    pub fn edge_time(&self, edge: ClkEdgeRef) -> Delay {
        self.clock(edge.clock).edge_time(edge.rf)
    }

    /// Returns `true` if `pin` is a clock source pin.
    pub fn is_vertex_pin_clock(&self, pin: Ident) -> bool {
        self.pin_clocks.contains_key(&pin)
    }

    /// The clocks defined on `pin`, if any.
    pub fn vertex_pin_clocks(&self, pin: Ident) -> Option<&[ClockId]> {
        self.pin_clocks.get(&pin).map(|v| v.as_slice())
    }

    /// Clock source pins in definition order, with their clocks.
    pub fn clock_pins(&self) -> impl Iterator<Item = (Ident, &[ClockId])> + '_ {
        self.pin_clocks.iter().map(|(&pin, v)| (pin, v.as_slice()))
    }

    /// Marks a pin's transitive fanout as a propagated clock network.
    pub fn set_propagated_clock_pin(&mut self, pin: Ident) {
        self.propagated_pins.insert(pin);
    }

    /// Returns `true` if `set_propagated_clock` names this pin.
    pub fn is_propagated_clock_pin(&self, pin: Ident) -> bool {
        self.propagated_pins.contains(&pin)
    }

    /// Sets clock-level (ideal) latency.
    pub fn set_clock_latency(&mut self, clock: ClockId, min_max: MinMax, latency: Delay) {
        self.clock_latency.insert((clock, min_max), latency);
    }

    /// Sets latency on a specific clock pin, overriding clock latency.
    pub fn set_clock_pin_latency(
        &mut self,
        clock: ClockId,
        pin: Ident,
        min_max: MinMax,
        latency: Delay,
    ) {
        self.clock_pin_latency.insert((clock, pin, min_max), latency);
    }

    /// Sets latency through a hierarchical pin.
    pub fn set_clock_hpin_latency(
        &mut self,
        clock: ClockId,
        hpin: Ident,
        min_max: MinMax,
        latency: Delay,
    ) {
        self.clock_hpin_latency
            .insert((clock, hpin, min_max), latency);
    }

    /// Clock-level latency, if declared.
    pub fn clock_latency(&self, clock: ClockId, min_max: MinMax) -> Option<Delay> {
        self.clock_latency.get(&(clock, min_max)).copied()
    }

    /// Pin-level latency, if declared. Takes precedence over clock latency.
    pub fn clock_pin_latency(&self, clock: ClockId, pin: Ident, min_max: MinMax) -> Option<Delay> {
        self.clock_pin_latency.get(&(clock, pin, min_max)).copied()
    }

    /// Hierarchical-pin latency, if declared.
    pub fn clock_hpin_latency(
        &self,
        clock: ClockId,
        hpin: Ident,
        min_max: MinMax,
    ) -> Option<Delay> {
        self.clock_hpin_latency.get(&(clock, hpin, min_max)).copied()
    }

    /// Sets clock-level source insertion delay.
    pub fn set_clock_insertion(&mut self, clock: ClockId, min_max: MinMax, insertion: Delay) {
        self.clock_insertion.insert((clock, min_max), insertion);
    }

    /// Sets source insertion delay at a specific pin.
    pub fn set_clock_pin_insertion(
        &mut self,
        clock: ClockId,
        pin: Ident,
        min_max: MinMax,
        insertion: Delay,
    ) {
        self.clock_pin_insertion
            .insert((clock, pin, min_max), insertion);
    }

    /// Declared source insertion delay for (clock, pin), pin-level first.
    pub fn clock_insertion(
        &self,
        clock: ClockId,
        pin: Option<Ident>,
        min_max: MinMax,
    ) -> Option<Delay> {
        if let Some(pin) = pin {
            if let Some(&d) = self.clock_pin_insertion.get(&(clock, pin, min_max)) {
                return Some(d);
            }
        }
        self.clock_insertion.get(&(clock, min_max)).copied()
    }

    /// Sets uncertainty on a clock pin, overriding clock uncertainty.
    pub fn set_pin_uncertainties(&mut self, pin: Ident, uncertainties: ClockUncertainties) {
        self.pin_uncertainties.insert(pin, uncertainties);
    }

    /// Pin-level uncertainty, if declared.
    pub fn pin_uncertainties(&self, pin: Ident) -> Option<ClockUncertainties> {
        self.pin_uncertainties.get(&pin).copied()
    }

    /// Stops clock propagation at this pin (`set_clock_sense -stop_propagation`).
    pub fn add_clk_stop_propagation(&mut self, pin: Ident) {
        self.clk_stop_pins.insert(pin);
    }

    /// Returns `true` if the clock network must not propagate past `from_pin`.
    pub fn clk_stop_propagation(&self, from_pin: Ident, _clock: ClockId) -> bool {
        self.clk_stop_pins.contains(&from_pin)
    }

    /// Disables a clock's wire edges that bypass a hierarchical pin.
    pub fn add_clk_hpin_disable(&mut self, clock: ClockId, from_pin: Ident, to_pin: Ident) {
        self.clk_hpin_disables.insert((clock, from_pin, to_pin));
    }

    /// Returns `true` if a wire edge from a source pin of `clock` is
    /// disabled by a hierarchical-pin record.
    pub fn clk_disabled_by_hpin_thru(&self, clock: ClockId, from_pin: Ident, to_pin: Ident) -> bool {
        self.clk_hpin_disables.contains(&(clock, from_pin, to_pin))
    }

    // -------------------------------------------------------------- options

    /// Enables or disables clock-reconvergence pessimism removal.
    pub fn set_crpr_active(&mut self, active: bool) {
        self.crpr_active = active;
    }

    /// Returns `true` if CRPR is active.
    pub fn crpr_active(&self) -> bool {
        self.crpr_active
    }

    /// Enables or disables dynamic loop breaking.
    pub fn set_dynamic_loop_breaking(&mut self, enabled: bool) {
        self.dynamic_loop_breaking = enabled;
    }

    /// Returns `true` if dynamic loop breaking is enabled.
    pub fn dynamic_loop_breaking(&self) -> bool {
        self.dynamic_loop_breaking
    }

    /// Controls whether clock networks propagate through tristate edges.
    pub fn set_clk_thru_tristate(&mut self, enabled: bool) {
        self.clk_thru_tristate = enabled;
    }

    /// Returns `true` if clock networks propagate through tristate edges.
    pub fn clk_thru_tristate_enabled(&self) -> bool {
        self.clk_thru_tristate
    }

    /// Enables the default arrival clock: inputs without declared delays
    /// seed from a zero-period virtual clock.
    pub fn set_use_default_arrival_clock(&mut self, interner: &Interner, enabled: bool) {
        if enabled && self.default_arrival_clock.is_none() {
            let name = interner.intern("default_arrival");
            let id = ClockId::from_raw(self.clocks.len() as u32);
            self.clocks.push(Clock {
                id,
                name,
                period: Delay::ZERO,
                waveform: default_waveform(Delay::ZERO),
                sources: Vec::new(),
                is_propagated: false,
                uncertainties: None,
                generated: None,
            });
            self.clock_by_name.insert(name, id);
            self.default_arrival_clock = Some(id);
        } else if !enabled {
            self.default_arrival_clock = None;
        }
    }

    /// The default arrival clock, when enabled.
    pub fn default_arrival_clock(&self) -> Option<ClockId> {
        self.default_arrival_clock
    }

    /// The rising edge of the default arrival clock, when enabled.
    pub fn default_arrival_clock_edge(&self) -> Option<ClkEdgeRef> {
        self.default_arrival_clock.map(|clock| ClkEdgeRef {
            clock,
            rf: RiseFall::Rise,
        })
    }

    // --------------------------------------------------------- input delays

    /// Declares an input delay. `internal` marks a delay on a non-port pin,
    /// which seeds a segment-start path.
    pub fn make_input_delay(
        &mut self,
        pin: Ident,
        clock_edge: Option<ClkEdgeRef>,
        internal: bool,
    ) -> InputDelayId {
        let id = InputDelayId::from_raw(self.input_delays.len() as u32);
        self.input_delays.push(InputDelay {
            id,
            pin,
            clock_edge,
            delays: [[None; MinMax::COUNT]; 2],
            ref_pin: None,
            ref_rf: RiseFall::Rise,
            source_latency_included: false,
            network_latency_included: false,
        });
        self.pin_input_delays.entry(pin).or_default().push(id);
        if internal {
            self.internal_input_delay_pins.insert(pin);
        }
        id
    }

    /// Returns the input delay with the given ID.
    pub fn input_delay(&self, id: InputDelayId) -> &InputDelay {
        &self.input_delays[id.index()]
    }

    /// Returns a mutable reference to the input delay with the given ID.
    /// Reference-pin changes must go through
    /// [`set_input_delay_ref_pin`](Self::set_input_delay_ref_pin) so the
    /// reverse index stays current.
    pub fn input_delay_mut(&mut self, id: InputDelayId) -> &mut InputDelay {
        &mut self.input_delays[id.index()]
    }

    /// Records the reference pin of an input delay and indexes it.
    pub fn set_input_delay_ref_pin(&mut self, id: InputDelayId, ref_pin: Ident, ref_rf: RiseFall) {
        let delay = &mut self.input_delays[id.index()];
        delay.ref_pin = Some(ref_pin);
        delay.ref_rf = ref_rf;
        self.ref_pin_input_delays.entry(ref_pin).or_default().push(id);
    }

    /// Returns `true` if `pin` has any declared input delay.
    pub fn has_input_delay(&self, pin: Ident) -> bool {
        self.pin_input_delays.contains_key(&pin)
    }

    /// The input delays declared on `pin`.
    pub fn pin_input_delays(&self, pin: Ident) -> Option<&[InputDelayId]> {
        self.pin_input_delays.get(&pin).map(|v| v.as_slice())
    }

    /// Pins with declared input delays, in declaration order.
    pub fn input_delay_pins(&self) -> impl Iterator<Item = Ident> + '_ {
        self.pin_input_delays.keys().copied()
    }

    /// Input delays whose reference pin is `ref_pin`.
    pub fn ref_pin_input_delays(&self, ref_pin: Ident) -> Option<&[InputDelayId]> {
        self.ref_pin_input_delays.get(&ref_pin).map(|v| v.as_slice())
    }

    /// Returns `true` if `pin` carries an internal (non-port) input delay.
    pub fn is_input_delay_internal(&self, pin: Ident) -> bool {
        self.internal_input_delay_pins.contains(&pin)
    }

    // ----------------------------------------------------------- exceptions

    fn add_exception(
        &mut self,
        kind: ExceptionKind,
        from: Option<ExceptionPoint>,
        thrus: Vec<ExceptionPoint>,
        to: Option<ExceptionPoint>,
    ) -> ExceptionId {
        let id = ExceptionId::from_raw(self.exceptions.len() as u32);
        self.exceptions.push(Some(ExceptionPath {
            id,
            kind,
            from,
            thrus,
            to,
        }));
        id
    }

    /// Declares a false path.
    pub fn make_false_path(
        &mut self,
        from: Option<ExceptionPoint>,
        thrus: Vec<ExceptionPoint>,
        to: Option<ExceptionPoint>,
    ) -> ExceptionId {
        self.add_exception(ExceptionKind::FalsePath, from, thrus, to)
    }

    /// Declares a path-delay bound (`set_max_delay`/`set_min_delay`).
    pub fn make_path_delay(
        &mut self,
        min_max: MinMax,
        delay: Delay,
        from: Option<ExceptionPoint>,
        thrus: Vec<ExceptionPoint>,
        to: Option<ExceptionPoint>,
    ) -> ExceptionId {
        self.add_exception(ExceptionKind::PathDelay { min_max, delay }, from, thrus, to)
    }

    /// Declares a multicycle path.
    pub fn make_multicycle(
        &mut self,
        min_max: Option<MinMax>,
        cycles: u32,
        from: Option<ExceptionPoint>,
        thrus: Vec<ExceptionPoint>,
        to: Option<ExceptionPoint>,
    ) -> ExceptionId {
        self.add_exception(
            ExceptionKind::Multicycle { min_max, cycles },
            from,
            thrus,
            to,
        )
    }

    /// Installs an interactive path filter. The search owns its lifetime.
    pub fn make_filter(
        &mut self,
        from: Option<ExceptionPoint>,
        thrus: Vec<ExceptionPoint>,
        to: Option<ExceptionPoint>,
    ) -> ExceptionId {
        self.add_exception(ExceptionKind::Filter, from, thrus, to)
    }

    /// Records levelization loops as loop exceptions. Each loop becomes a
    /// pattern over its edges with the first edge repeated at the end, so
    /// a path entering the loop crosses the disabled closing edge once
    /// (the state is then one stage short of complete) and is killed when
    /// it finishes the full cycle.
    pub fn make_loop_exceptions(&mut self, graph: &TimingGraph, loops: &[LoopPath]) {
        for loop_path in loops {
            let edge_point = |edge_id: kairos_graph::EdgeId| {
                let edge = graph.edge(edge_id);
                let from_pin = graph.vertex(edge.from).pin;
                let to_pin = graph.vertex(edge.to).pin;
                ExceptionPoint::edges(vec![(from_pin, to_pin)])
            };
            let mut thrus: Vec<ExceptionPoint> =
                loop_path.edges.iter().map(|&e| edge_point(e)).collect();
            if let Some(&first) = loop_path.edges.first() {
                thrus.push(edge_point(first));
            }
            self.add_exception(ExceptionKind::Loop, None, thrus, None);
        }
    }

    /// Removes an exception (used when a filter is dropped).
    pub fn delete_exception(&mut self, id: ExceptionId) {
        self.exceptions[id.index()] = None;
    }

    /// Returns the exception with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the exception has been deleted.
    pub fn exception(&self, id: ExceptionId) -> &ExceptionPath {
        self.exceptions[id.index()]
            .as_ref()
            .expect("exception not deleted")
    }

    /// Live exceptions, in declaration order.
    pub fn exceptions(&self) -> impl Iterator<Item = &ExceptionPath> {
        self.exceptions.iter().filter_map(|e| e.as_ref())
    }

    /// Marks a pin as an internal path-delay startpoint
    /// (`set_max_delay -from` on a non-port pin).
    pub fn mark_path_delay_internal_startpoint(&mut self, pin: Ident) {
        self.path_delay_internal_startpoints.insert(pin);
    }

    /// Marks a pin as an internal path-delay endpoint.
    pub fn mark_path_delay_internal_endpoint(&mut self, pin: Ident) {
        self.path_delay_internal_endpoints.insert(pin);
    }

    /// Returns `true` if a path-delay exception starts at this internal pin.
    pub fn is_path_delay_internal_startpoint(&self, pin: Ident) -> bool {
        self.path_delay_internal_startpoints.contains(&pin)
    }

    /// Internal path-delay startpoints.
    pub fn path_delay_internal_startpoints(&self) -> impl Iterator<Item = Ident> + '_ {
        self.path_delay_internal_startpoints.iter().copied()
    }

    /// Returns `true` if a path-delay exception ends at this internal pin.
    pub fn is_path_delay_internal_endpoint(&self, pin: Ident) -> bool {
        self.path_delay_internal_endpoints.contains(&pin)
    }

    /// States of exceptions whose startpoint matches a path beginning at
    /// `pin` (or launched by `clock`). Returns `None` when a complete
    /// false path applies at the startpoint, which kills the path.
    pub fn exception_from_states(
        &self,
        pin: Ident,
        rf: RiseFall,
        clock: Option<ClockId>,
        min_max: MinMax,
    ) -> Option<ExceptionStateSet> {
        let mut states = ExceptionStateSet::new();
        for exc in self.exceptions() {
            if !exc.applies_to(min_max) {
                continue;
            }
            let Some(from) = &exc.from else {
                continue;
            };
            let matched = from.matches_pin(pin, rf)
                || clock.map_or(false, |clk| from.matches_clock(clk));
            if !matched {
                continue;
            }
            let state = ExceptionState::start(exc.id);
            if state.is_complete(exc) && exc.is_false() {
                return None;
            }
            states.push(state);
        }
        canonicalize(&mut states);
        Some(states)
    }

    /// States of exceptions whose first pattern stage matches the edge
    /// `from_pin → to_pin`. These exceptions have no startpoint pattern.
    pub fn exception_thru_states(
        &self,
        from_pin: Ident,
        to_pin: Ident,
        to_rf: RiseFall,
        min_max: MinMax,
    ) -> Option<ExceptionStateSet> {
        let mut states = ExceptionStateSet::new();
        for exc in self.exceptions() {
            if exc.from.is_some() || !exc.applies_to(min_max) || exc.stage_count() == 0 {
                continue;
            }
            if exc.stage(0).matches_edge(from_pin, to_pin, to_rf) {
                states.push(ExceptionState::start(exc.id).next());
            }
        }
        if states.is_empty() {
            None
        } else {
            canonicalize(&mut states);
            Some(states)
        }
    }

    /// States of false-path exceptions that apply to clock-tree pins: only
    /// `-from` patterns naming the clock (or its source pin) follow a clock
    /// network. Complete states are kept; clock paths carry them to kill
    /// downstream data uses of the clock.
    pub fn exception_from_clk_states(
        &self,
        pin: Ident,
        rf: RiseFall,
        clock: ClockId,
        min_max: MinMax,
    ) -> ExceptionStateSet {
        let mut states = ExceptionStateSet::new();
        for exc in self.exceptions() {
            if !exc.is_false() || !exc.applies_to(min_max) {
                continue;
            }
            let Some(from) = &exc.from else {
                continue;
            };
            if from.matches_clock(clock) || from.matches_pin(pin, rf) {
                states.push(ExceptionState::start(exc.id));
            }
        }
        canonicalize(&mut states);
        states
    }

    /// Filter startpoint states that match a register output pin: a filter
    /// `-from reg/Q` must catch paths launched at the clock pin as they
    /// emerge at Q.
    pub fn filter_from_states(
        &self,
        to_pin: Ident,
        to_rf: RiseFall,
        min_max: MinMax,
    ) -> ExceptionStateSet {
        let mut states = ExceptionStateSet::new();
        for exc in self.exceptions() {
            if !exc.is_filter() || !exc.applies_to(min_max) {
                continue;
            }
            if let Some(from) = &exc.from {
                if from.matches_pin(to_pin, to_rf) {
                    states.push(ExceptionState::start(exc.id));
                }
            }
        }
        canonicalize(&mut states);
        states
    }

    // ---------------------------------------------- data checks, gated clks

    /// Declares a data check from `from` to `to`.
    pub fn add_data_check(&mut self, from: Ident, to: Ident) {
        self.data_checks
            .entry(from)
            .or_default()
            .push(DataCheck { from, to });
    }

    /// Data checks referenced from `pin`.
    pub fn data_checks_from(&self, pin: Ident) -> Option<&[DataCheck]> {
        self.data_checks.get(&pin).map(|v| v.as_slice())
    }

    /// Declares a gated-clock enable pin.
    pub fn add_gated_clk_enable(&mut self, pin: Ident) {
        self.gated_clk_enables.insert(pin);
    }

    /// Returns `true` if `pin` is a declared gated-clock enable.
    pub fn is_gated_clk_enable(&self, pin: Ident) -> bool {
        self.gated_clk_enables.contains(&pin)
    }

    /// Enables gated-clock check classification.
    pub fn set_gated_clk_checks_enabled(&mut self, enabled: bool) {
        self.gated_clk_checks_enabled = enabled;
    }

    /// Returns `true` if gated-clock checks participate in endpoint
    /// classification.
    pub fn gated_clk_checks_enabled(&self) -> bool {
        self.gated_clk_checks_enabled
    }

    // ------------------------------------------------------------- warnings

    /// Warns for clock pairs whose periods share no common multiple within
    /// [`CLK_TO_CLK_MAX_CYCLES`] cycles. Reported after a query, per the
    /// recoverable-warning policy.
    pub fn report_clk_to_clk_max_cycle_warnings(
        &self,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) {
        for (i, clk1) in self.clocks.iter().enumerate() {
            for clk2 in &self.clocks[i + 1..] {
                let p1 = clk1.period.as_ns();
                let p2 = clk2.period.as_ns();
                if p1 <= 0.0 || p2 <= 0.0 {
                    continue;
                }
                if !have_common_period(p1, p2) {
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticCode::new(Category::Clock, 1),
                            format!(
                                "clocks {} and {} have no common period within {} cycles",
                                interner.resolve(clk1.name),
                                interner.resolve(clk2.name),
                                CLK_TO_CLK_MAX_CYCLES
                            ),
                        )
                        .with_subject(interner.resolve(clk1.name).to_string()),
                    );
                }
            }
        }
    }
}

fn have_common_period(p1: f64, p2: f64) -> bool {
    for a in 1..=CLK_TO_CLK_MAX_CYCLES {
        let b = (a as f64 * p1 / p2).round();
        if b >= 1.0 && b <= CLK_TO_CLK_MAX_CYCLES as f64 && (a as f64 * p1 - b * p2).abs() < 1e-6 {
            return true;
        }
    }
    false
}

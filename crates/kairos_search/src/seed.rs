//! Seeding of initial arrivals: clock source pins, input ports,
//! input-delay pins, and unclocked roots.

use crate::clk_info::ClkInfo;
use crate::corner::PathApIndex;
use crate::path::PathRef;
use crate::pred::{SearchPred, SearchThru};
use crate::search::Search;
use crate::tag::TagId;
use crate::tag_group::TagGroupBldr;
use kairos_common::{Delay, Ident, MinMax, RiseFall, StaResult};
use kairos_graph::VertexId;
use kairos_sdc::{ClkEdgeRef, ClockId, InputDelayId};
use std::collections::BTreeSet;

impl<'a> Search<'a> {
    /// Seeds every clock vertex, root, and input driver.
    pub(crate) fn seed_arrivals(&mut self) -> StaResult<()> {
        let mut vertices = BTreeSet::new();
        self.find_clock_vertices(&mut vertices);
        self.find_root_vertices(&mut vertices);
        self.find_input_drvr_vertices(&mut vertices);
        for vertex in vertices {
            self.seed_arrival(vertex)?;
        }
        Ok(())
    }

    pub(crate) fn find_clock_vertices(&self, vertices: &mut BTreeSet<VertexId>) {
        for (pin, _) in self.sdc.clock_pins() {
            let (vertex, bidirect) = self.graph.pin_vertices(pin);
            if let Some(vertex) = vertex {
                vertices.insert(vertex);
            }
            if let Some(vertex) = bidirect {
                vertices.insert(vertex);
            }
        }
    }

    /// Roots that are not clock pins, have no declared input delay, and
    /// carry no constant.
    pub(crate) fn find_root_vertices(&self, vertices: &mut BTreeSet<VertexId>) {
        for &vertex in self.graph.roots() {
            let v = self.graph.vertex(vertex);
            if !self.sdc.is_vertex_pin_clock(v.pin)
                && !self.sdc.has_input_delay(v.pin)
                && !v.is_constant
            {
                vertices.insert(vertex);
            }
        }
    }

    pub(crate) fn find_input_drvr_vertices(&self, vertices: &mut BTreeSet<VertexId>) {
        for pin in self.network.top_level_input_pins() {
            if let Some(vertex) = self.graph.pin_vertex(pin) {
                vertices.insert(vertex);
            }
        }
    }

    /// Re-seeds every vertex marked invalid since the last propagation.
    pub(crate) fn seed_invalid_arrivals(&mut self) -> StaResult<()> {
        let mut stale: Vec<VertexId> = self.invalid_arrivals.lock().unwrap().drain().collect();
        stale.sort_unstable();
        for vertex in stale {
            self.seed_arrival(vertex)?;
        }
        Ok(())
    }

    /// Seeds one vertex according to its kind: clock pin, input-arrival
    /// start, unclocked root, or interior vertex (enqueued for re-visit).
    pub(crate) fn seed_arrival(&self, vertex: VertexId) -> StaResult<()> {
        let pin = self.graph.vertex(vertex).pin;
        if self.sdc.is_vertex_pin_clock(pin) {
            log::debug!("arrival seed clk pin {}", self.pin_name(vertex));
            let mut bldr = TagGroupBldr::new();
            self.init_tag_bldr(vertex, &mut bldr);
            self.copy_gen_clk_src_paths(pin, &mut bldr)?;
            self.seed_clk_arrivals(pin, vertex, &mut bldr)?;
            // Clock pins may also have input arrivals from other clocks.
            self.seed_input_arrival(pin, vertex, &mut bldr)?;
            self.set_vertex_arrivals(vertex, &bldr)?;
        } else if self.is_input_arrival_srch_start(vertex) {
            let mut bldr = TagGroupBldr::new();
            self.init_tag_bldr(vertex, &mut bldr);
            self.seed_input_arrival(pin, vertex, &mut bldr)?;
            self.set_vertex_arrivals(vertex, &bldr)?;
            if !bldr.is_empty() {
                // Only search downstream when non-false paths start here.
                self.enqueue_arrival_adjacent(vertex, &SearchThru::new());
            }
        } else if self.graph.is_root(vertex) {
            let is_reg_clk = self.graph.vertex(vertex).is_reg_clk;
            if is_reg_clk
                || (self.report_unconstrained_paths && !self.network.is_top_level_port(pin))
            {
                log::debug!("arrival seed unclked root {}", self.pin_name(vertex));
                let mut bldr = TagGroupBldr::new();
                self.init_tag_bldr(vertex, &mut bldr);
                if self.make_unclked_paths(vertex, is_reg_clk, &mut bldr)? {
                    self.enqueue_arrival_adjacent(vertex, &SearchThru::new());
                }
                self.set_vertex_arrivals(vertex, &bldr)?;
            } else {
                self.delete_vertex_paths(vertex);
                let pred = SearchThru::new();
                if pred.search_from(self, vertex) {
                    self.enqueue_arrival_adjacent(vertex, &pred);
                }
            }
        } else {
            self.arrival_iter.enqueue(self.graph, vertex);
        }
        Ok(())
    }

    /// Copies the builder state of a vertex's committed paths so new seeds
    /// merge with arrivals not touched this pass.
    pub(crate) fn init_tag_bldr(&self, vertex: VertexId, bldr: &mut TagGroupBldr) {
        bldr.clear();
        let paths = self.vertex_paths_snapshot(vertex);
        let Some(group_id) = paths.tag_group else {
            return;
        };
        let group = self.tag_group(group_id);
        for (index, &tag_id) in group.tags().iter().enumerate() {
            let tag = self.tag(tag_id);
            let is_gen = self.clk_info(tag.clk_info).is_gen_clk_src_path;
            let prev = paths.prev_paths.as_ref().and_then(|p| p[index]);
            bldr.set_arrival(tag_id, &tag, is_gen, paths.arrivals[index], prev);
        }
    }

    fn copy_gen_clk_src_paths(&self, pin: Ident, bldr: &mut TagGroupBldr) -> StaResult<()> {
        for (tag_id, arrival) in self.gen_clk_src_path_seeds(pin)? {
            let tag = self.tag(tag_id);
            bldr.set_arrival(tag_id, &tag, true, arrival, None);
        }
        Ok(())
    }

    /// Seeds the clock arrivals of every clock defined on `pin`.
    pub(crate) fn seed_clk_arrivals(
        &self,
        pin: Ident,
        vertex: VertexId,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        let clocks: Vec<ClockId> = self
            .sdc
            .vertex_pin_clocks(pin)
            .map(|c| c.to_vec())
            .unwrap_or_default();
        for clock in clocks {
            log::debug!(
                "arrival seed clk {} pin {}",
                self.interner.resolve(self.sdc.clock(clock).name),
                self.pin_name(vertex)
            );
            for ap in self.corners.path_aps() {
                for rf in RiseFall::BOTH {
                    let insertion =
                        self.clock_insertion(clock, Some(pin), rf, ap.min_max, ap.index);
                    self.seed_clk_arrival(pin, rf, clock, ap.min_max, ap.index, insertion, bldr)?;
                }
            }
            self.enqueue_arrival_adjacent(vertex, &SearchThru::new());
        }
        Ok(())
    }

    /// Seeds one (clock, transition, analysis point) arrival, resolving
    /// latency, propagation, uncertainties, and pulse sense for the pin.
    #[allow(clippy::too_many_arguments)]
    fn seed_clk_arrival(
        &self,
        pin: Ident,
        rf: RiseFall,
        clock: ClockId,
        min_max: MinMax,
        path_ap: PathApIndex,
        insertion: Delay,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        let clk = self.sdc.clock(clock);
        let mut is_propagated = false;
        let mut latency = Delay::ZERO;
        if let Some(pin_latency) = self.sdc.clock_pin_latency(clock, pin, min_max) {
            latency = pin_latency;
        } else if let Some(clk_latency) = self.sdc.clock_latency(clock, min_max) {
            if self.sdc.is_propagated_clock_pin(pin) {
                // A propagated pin overrides latency on the clock.
                is_propagated = true;
            } else {
                latency = clk_latency;
            }
        } else {
            is_propagated = self.sdc.is_propagated_clock_pin(pin) || clk.is_propagated;
        }

        let uncertainties = self.sdc.pin_uncertainties(pin).or(clk.uncertainties);
        let pulse_clk_sense = self.network.pulse_clk_sense(pin);
        let clk_edge = clk.edge(rf);
        let clk_info = self.find_clk_info(ClkInfo {
            clk_edge: Some(clk_edge),
            clk_src: Some(pin),
            is_propagated,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense,
            insertion,
            latency,
            uncertainties,
            path_ap,
            crpr_clk_path: None,
        })?;
        // Only false paths -from apply to clock tree pins.
        let states = self.sdc.exception_from_clk_states(pin, rf, clock, min_max);
        let tag = self.find_tag(rf, path_ap, clk_info, true, None, false, states)?;
        let arrival = self.sdc.clock(clock).edge_time(rf) + insertion;
        let tag_arc = self.tag(tag);
        bldr.set_arrival(tag, &tag_arc, false, arrival, None);
        Ok(())
    }

    /// Seeds unclocked paths at a vertex for every transition and analysis
    /// point; returns `true` if any survived the startpoint exceptions.
    pub(crate) fn make_unclked_paths(
        &self,
        vertex: VertexId,
        is_segment_start: bool,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<bool> {
        let pin = self.graph.vertex(vertex).pin;
        let mut search_from = false;
        for ap in self.corners.path_aps() {
            for rf in RiseFall::BOTH {
                if let Some(tag) =
                    self.from_unclked_input_tag(pin, rf, ap.min_max, ap.index, is_segment_start)?
                {
                    let tag_arc = self.tag(tag);
                    bldr.set_arrival(tag, &tag_arc, false, Delay::ZERO, None);
                    search_from = true;
                }
            }
        }
        Ok(search_from)
    }

    pub(crate) fn is_input_arrival_srch_start(&self, vertex: VertexId) -> bool {
        let v = self.graph.vertex(vertex);
        let dir = self.network.direction(v.pin);
        self.network.is_top_level_port(v.pin)
            && (dir == crate::api::PortDirection::Input
                || (dir == crate::api::PortDirection::Bidirect && v.is_bidirect_driver))
    }

    /// Seeds the input arrivals of `pin`: declared input delays, or the
    /// default arrival clock for undeclared inputs.
    pub(crate) fn seed_input_arrival(
        &self,
        pin: Ident,
        vertex: VertexId,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        if self.sdc.has_input_delay(pin) {
            self.seed_input_arrival1(pin, vertex, false, bldr)
        } else if !self.sdc.is_vertex_pin_clock(pin) {
            // Inputs without set_input_delay.
            self.seed_input_delay_arrival(pin, vertex, None, false, bldr)
        } else {
            Ok(())
        }
    }

    /// Seeds a segment-start arrival for an internal input delay.
    pub(crate) fn seed_input_segment_arrival(
        &self,
        pin: Ident,
        vertex: VertexId,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        self.seed_input_arrival1(pin, vertex, true, bldr)
    }

    fn seed_input_arrival1(
        &self,
        pin: Ident,
        vertex: VertexId,
        is_segment_start: bool,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        // A pin can have arrivals wrt several clocks. An input arrival wrt
        // a clock defined on the pin itself is the insertion delay, which
        // clock seeding already covers.
        let ids: Vec<InputDelayId> = self
            .sdc
            .pin_input_delays(pin)
            .map(|ids| ids.to_vec())
            .unwrap_or_default();
        for id in ids {
            let input_clock = self.sdc.input_delay(id).clock_edge.map(|e| e.clock);
            let pin_clks = self.sdc.vertex_pin_clocks(pin);
            let propagates = match (input_clock, pin_clks) {
                (Some(clock), Some(pin_clks)) => !pin_clks.contains(&clock),
                _ => true,
            };
            if propagates {
                self.seed_input_delay_arrival(pin, vertex, Some(id), is_segment_start, bldr)?;
            }
        }
        Ok(())
    }

    /// Seeds the arrivals of one input delay record (or the default
    /// arrival for `None`).
    pub(crate) fn seed_input_delay_arrival(
        &self,
        pin: Ident,
        _vertex: VertexId,
        input_delay: Option<InputDelayId>,
        is_segment_start: bool,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        log::debug!(
            "arrival seed input {} {}",
            if input_delay.is_some() { "arrival" } else { "port" },
            self.interner.resolve(pin)
        );
        let record = input_delay.map(|id| self.sdc.input_delay(id).clone());
        let clk_edge = record
            .as_ref()
            .and_then(|d| d.clock_edge)
            .or_else(|| self.sdc.default_arrival_clock_edge());
        if let Some(record) = record.as_ref().filter(|d| d.ref_pin.is_some()) {
            let ref_pin = record.ref_pin.expect("reference pin present");
            let Some(ref_vertex) = self.graph.pin_vertex(ref_pin) else {
                return Ok(());
            };
            for ap in self.corners.path_aps() {
                for ref_path in self.vertex_path_refs(ref_vertex) {
                    let ref_tag = self.tag(ref_path.tag);
                    if !ref_tag.is_clk
                        || ref_tag.rf != record.ref_rf
                        || ref_tag.path_ap != ap.index
                    {
                        continue;
                    }
                    let ref_info = self.clk_info(ref_tag.clk_info);
                    let ref_clk_edge = ref_info.clk_edge;
                    let delay_clock = record.clock_edge.map(|e| e.clock);
                    if let (Some(want), Some(have)) = (delay_clock, ref_clk_edge) {
                        if want != have.clock {
                            continue;
                        }
                    }
                    let (clk_arrival, clk_insertion, clk_latency) =
                        self.input_delay_ref_pin_arrival(&ref_path, &ref_info, ap.min_max);
                    self.seed_input_delay_arrival2(
                        pin,
                        input_delay,
                        ref_clk_edge,
                        clk_arrival,
                        clk_insertion,
                        clk_latency,
                        is_segment_start,
                        ap.min_max,
                        ap.index,
                        bldr,
                    )?;
                }
            }
        } else {
            for ap in self.corners.path_aps() {
                let (clk_arrival, clk_insertion, clk_latency) =
                    self.input_delay_clk_arrival(record.as_ref(), clk_edge, ap.min_max, ap.index);
                self.seed_input_delay_arrival2(
                    pin,
                    input_delay,
                    clk_edge,
                    clk_arrival,
                    clk_insertion,
                    clk_latency,
                    is_segment_start,
                    ap.min_max,
                    ap.index,
                    bldr,
                )?;
            }
        }
        Ok(())
    }

    /// Input delays with a reference pin measure from the clock arrival at
    /// that pin: propagated clocks use the stored path arrival; ideal
    /// clocks use edge time plus insertion, with no network latency.
    fn input_delay_ref_pin_arrival(
        &self,
        ref_path: &PathRef,
        ref_info: &ClkInfo,
        min_max: MinMax,
    ) -> (Delay, Delay, Delay) {
        match ref_info.clk_edge {
            Some(clk_edge) if self.sdc.clock(clk_edge.clock).is_propagated => (
                self.path_arrival(ref_path),
                ref_info.insertion,
                ref_info.latency,
            ),
            Some(clk_edge) => {
                let insertion = self
                    .sdc
                    .clock_insertion(clk_edge.clock, None, min_max)
                    .unwrap_or(Delay::ZERO);
                (self.sdc.edge_time(clk_edge) + insertion, insertion, Delay::ZERO)
            }
            None => (Delay::ZERO, Delay::ZERO, Delay::ZERO),
        }
    }

    fn input_delay_clk_arrival(
        &self,
        input_delay: Option<&kairos_sdc::InputDelay>,
        clk_edge: Option<ClkEdgeRef>,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> (Delay, Delay, Delay) {
        let mut clk_arrival = Delay::ZERO;
        let mut clk_insertion = Delay::ZERO;
        let mut clk_latency = Delay::ZERO;
        if let (Some(delay), Some(clk_edge)) = (input_delay, clk_edge) {
            clk_arrival = self.sdc.edge_time(clk_edge);
            let clk = self.sdc.clock(clk_edge.clock);
            if !delay.source_latency_included {
                clk_insertion = self.clock_insertion(
                    clk_edge.clock,
                    clk.default_pin(),
                    clk_edge.rf,
                    min_max,
                    path_ap,
                );
                clk_arrival += clk_insertion;
            }
            if !clk.is_propagated && !delay.network_latency_included {
                clk_latency = self
                    .sdc
                    .clock_latency(clk_edge.clock, min_max)
                    .unwrap_or(Delay::ZERO);
                clk_arrival += clk_latency;
            }
        }
        (clk_arrival, clk_insertion, clk_latency)
    }

    #[allow(clippy::too_many_arguments)]
    fn seed_input_delay_arrival2(
        &self,
        pin: Ident,
        input_delay: Option<InputDelayId>,
        clk_edge: Option<ClkEdgeRef>,
        clk_arrival: Delay,
        clk_insertion: Delay,
        clk_latency: Delay,
        is_segment_start: bool,
        min_max: MinMax,
        path_ap: PathApIndex,
        bldr: &mut TagGroupBldr,
    ) -> StaResult<()> {
        for rf in RiseFall::BOTH {
            let arrival = match input_delay {
                Some(id) => match self.sdc.input_delay(id).value(rf, min_max) {
                    Some(value) => clk_arrival + value,
                    None => continue,
                },
                None => Delay::ZERO,
            };
            if let Some(tag) = self.input_delay_tag(
                pin,
                rf,
                clk_edge,
                clk_insertion,
                clk_latency,
                input_delay,
                is_segment_start,
                min_max,
                path_ap,
            )? {
                let tag_arc = self.tag(tag);
                bldr.set_arrival(tag, &tag_arc, false, arrival, None);
            }
        }
        Ok(())
    }

    /// The tag seeding one input-delay arrival, with startpoint exception
    /// states applied, or `None` when a false path kills it.
    #[allow(clippy::too_many_arguments)]
    fn input_delay_tag(
        &self,
        pin: Ident,
        rf: RiseFall,
        clk_edge: Option<ClkEdgeRef>,
        clk_insertion: Delay,
        clk_latency: Delay,
        input_delay: Option<InputDelayId>,
        is_segment_start: bool,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> StaResult<Option<TagId>> {
        let clock = clk_edge.map(|e| e.clock);
        let Some(states) = self.sdc.exception_from_states(pin, rf, clock, min_max) else {
            return Ok(None);
        };
        let (clk_src, is_propagated, uncertainties) = match clock {
            Some(clock) => {
                let clk = self.sdc.clock(clock);
                (clk.default_pin(), clk.is_propagated, clk.uncertainties)
            }
            None => (None, false, None),
        };
        let clk_info = self.find_clk_info(ClkInfo {
            clk_edge,
            clk_src,
            is_propagated,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense: None,
            insertion: clk_insertion,
            latency: clk_latency,
            uncertainties,
            path_ap,
            crpr_clk_path: None,
        })?;
        let tag = self.find_tag(
            rf,
            path_ap,
            clk_info,
            false,
            input_delay,
            is_segment_start,
            states,
        )?;
        // Apply pending -thru state changes for exceptions waiting on this
        // pin itself.
        let tag_arc = self.tag(tag);
        self.mutate_tag(
            &tag_arc,
            tag,
            pin,
            rf,
            false,
            clk_info,
            pin,
            rf,
            false,
            false,
            is_segment_start,
            clk_info,
            input_delay,
            min_max,
            path_ap,
        )
    }

    /// Re-seeds the input-delay vertices whose reference clock pin is
    /// `ref_pin`, as if an arc connected the reference pin to them.
    pub(crate) fn enqueue_ref_pin_input_delays(&self, ref_pin: Ident) -> StaResult<()> {
        let ids: Vec<InputDelayId> = self
            .sdc
            .ref_pin_input_delays(ref_pin)
            .map(|ids| ids.to_vec())
            .unwrap_or_default();
        for id in ids {
            let pin = self.sdc.input_delay(id).pin;
            let (vertex, bidirect) = self.graph.pin_vertices(pin);
            for vertex in [vertex, bidirect].into_iter().flatten() {
                let mut bldr = TagGroupBldr::new();
                self.init_tag_bldr(vertex, &mut bldr);
                let internal = !self.network.is_top_level_port(pin);
                self.seed_input_delay_arrival(pin, vertex, Some(id), internal, &mut bldr)?;
                self.set_vertex_arrivals(vertex, &bldr)?;
                self.enqueue_arrival_adjacent(vertex, &SearchThru::new());
            }
        }
        Ok(())
    }
}

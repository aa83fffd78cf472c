//! Tag transformations applied as paths cross edges.
//!
//! Every edge traversal maps a from-tag to a to-tag (or to nothing, which
//! drops the contribution). The core transform is [`Search::mutate_tag`]:
//! it advances the exception-state machines, kills paths that complete a
//! false-path or loop pattern, and interns the resulting tag. The clock
//! variants additionally thread the clock state (propagation, latency
//! overrides, pulse sense, CRPR paths) through the traversal.

use crate::clk_info::{ClkInfo, ClkInfoId};
use crate::corner::PathApIndex;
use crate::path::PathRef;
use crate::search::Search;
use crate::tag::{Tag, TagId};
use kairos_common::{Ident, MinMax, RiseFall, StaResult};
use kairos_graph::{EdgeId, TimingSense, VertexId};
use kairos_sdc::{canonicalize, ClockId, ExceptionStateSet, InputDelayId};

impl<'a> Search<'a> {
    /// Maps `from_tag` across `edge` as a data path. Returns `None` when
    /// the contribution must be dropped.
    pub fn thru_tag(
        &self,
        from_tag_id: TagId,
        edge: EdgeId,
        to_rf: RiseFall,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> StaResult<Option<TagId>> {
        let e = self.graph.edge(edge);
        let from_pin = self.graph.vertex(e.from).pin;
        let to_vertex = self.graph.vertex(e.to);
        let from_tag = self.tag(from_tag_id);
        self.mutate_tag(
            &from_tag,
            from_tag_id,
            from_pin,
            from_tag.rf,
            false,
            from_tag.clk_info,
            to_vertex.pin,
            to_rf,
            false,
            to_vertex.is_reg_clk,
            false,
            from_tag.clk_info,
            // Input delay does not propagate through edges.
            None,
            min_max,
            path_ap,
        )
    }

    /// Maps a clock-network `from_tag` across `edge`, threading the clock
    /// state. `to_propagates_clk` is false past a clock-stop point, which
    /// turns the path into data at the far end.
    pub(crate) fn thru_clk_tag(
        &self,
        from_path: &PathRef,
        from_tag_id: TagId,
        to_propagates_clk: bool,
        edge: EdgeId,
        to_rf: RiseFall,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> StaResult<Option<TagId>> {
        let e = self.graph.edge(edge);
        let from_pin = self.graph.vertex(e.from).pin;
        let to_vertex = self.graph.vertex(e.to);
        let to_pin = to_vertex.pin;
        let from_tag = self.tag(from_tag_id);
        let from_is_clk = from_tag.is_clk;
        let role = e.role;
        let to_is_clk = from_is_clk && to_propagates_clk && role.propagates_clock();
        let to_clk_info =
            self.thru_clk_info(from_path, from_tag.clk_info, edge, e.to, to_pin, min_max)?;
        self.mutate_tag(
            &from_tag,
            from_tag_id,
            from_pin,
            from_tag.rf,
            from_is_clk,
            from_tag.clk_info,
            to_pin,
            to_rf,
            to_is_clk,
            to_vertex.is_reg_clk,
            false,
            to_clk_info,
            None,
            min_max,
            path_ap,
        )
    }

    /// Threads clock state across an edge: propagated-clock upgrades,
    /// generated-clock root marking, CRPR path capture at register clock
    /// pins, pulse-sense flips, latency overrides, and pin uncertainties.
    fn thru_clk_info(
        &self,
        from_path: &PathRef,
        from_clk_info_id: ClkInfoId,
        edge: EdgeId,
        to_vertex: VertexId,
        to_pin: Ident,
        min_max: MinMax,
    ) -> StaResult<ClkInfoId> {
        let from = self.clk_info(from_clk_info_id);
        let Some(clk_edge) = from.clk_edge else {
            return Ok(from_clk_info_id);
        };
        let clock = clk_edge.clock;
        let mut changed = false;

        let mut to_clk_prop = from.is_propagated;
        if !to_clk_prop && self.sdc.is_propagated_clock_pin(to_pin) {
            to_clk_prop = true;
            changed = true;
        }

        // Generated-clock source paths stay distinguishable so CRPR state
        // can later be attached to them safely.
        let mut gen_clk_src = from.gen_clk_src;
        if from.is_gen_clk_src_path
            && self.sdc.crpr_active()
            && self.sdc.is_vertex_pin_clock(to_pin)
        {
            gen_clk_src = Some(to_pin);
            changed = true;
        }

        let mut crpr_clk_path = from.crpr_clk_path;
        if self.sdc.crpr_active() && self.graph.vertex(to_vertex).is_reg_clk {
            crpr_clk_path = Some(from_path.rep());
            changed = true;
        }

        let mut pulse_sense = from.pulse_clk_sense;
        if let Some(port_sense) = self.network.pulse_clk_sense(to_pin) {
            pulse_sense = Some(port_sense);
            changed = true;
        } else if let Some(from_sense) = from.pulse_clk_sense {
            if self.graph.edge(edge).arc_set.sense() == TimingSense::NegativeUnate {
                pulse_sense = Some(from_sense.opposite());
                changed = true;
            }
        }

        let mut latency = from.latency;
        if let Some(pin_latency) = self.sdc.clock_pin_latency(clock, to_pin, min_max) {
            // Pin latency has precedence over fanin or hierarchical latency.
            latency = pin_latency;
            to_clk_prop = false;
            changed = true;
        } else if let Some(hpin) = self.graph.edge(edge).hpin {
            if let Some(hpin_latency) = self.sdc.clock_hpin_latency(clock, hpin, min_max) {
                latency = hpin_latency;
                to_clk_prop = false;
                changed = true;
            }
        }

        let mut uncertainties = from.uncertainties;
        if let Some(pin_uncertainties) = self.sdc.pin_uncertainties(to_pin) {
            uncertainties = Some(pin_uncertainties);
            changed = true;
        }

        if changed {
            self.find_clk_info(ClkInfo {
                clk_edge: from.clk_edge,
                clk_src: from.clk_src,
                is_propagated: to_clk_prop,
                gen_clk_src,
                is_gen_clk_src_path: from.is_gen_clk_src_path,
                pulse_clk_sense: pulse_sense,
                insertion: from.insertion,
                latency,
                uncertainties,
                path_ap: from.path_ap,
                crpr_clk_path,
            })
        } else {
            Ok(from_clk_info_id)
        }
    }

    /// The tag of a path launched through a register clk→Q edge.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_reg_clk_tag(
        &self,
        from_pin: Ident,
        from_rf: RiseFall,
        clock: Option<ClockId>,
        _clk_rf: Option<RiseFall>,
        clk_info: ClkInfoId,
        to_pin: Ident,
        to_rf: RiseFall,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> StaResult<Option<TagId>> {
        let Some(mut states) = self.sdc.exception_from_states(from_pin, from_rf, clock, min_max)
        else {
            return Ok(None);
        };
        // A filter -from on the register output matches the path as it
        // emerges at the Q pin.
        let mut q_states = self.sdc.filter_from_states(to_pin, to_rf, min_max);
        states.append(&mut q_states);
        canonicalize(&mut states);
        self.find_tag(to_rf, path_ap, clk_info, false, None, false, states)
            .map(Some)
    }

    /// The tag seeding an unclocked startpoint (unconstrained root or
    /// internal path-delay startpoint), or `None` if a false path kills it.
    pub(crate) fn from_unclked_input_tag(
        &self,
        pin: Ident,
        rf: RiseFall,
        min_max: MinMax,
        path_ap: PathApIndex,
        is_segment_start: bool,
    ) -> StaResult<Option<TagId>> {
        let Some(states) = self.sdc.exception_from_states(pin, rf, None, min_max) else {
            return Ok(None);
        };
        let clk_info = self.find_clk_info(ClkInfo::unclocked(path_ap))?;
        self.find_tag(rf, path_ap, clk_info, false, None, is_segment_start, states)
            .map(Some)
    }

    /// A copy of `from_clk_info` carrying `from_path` as the CRPR clock
    /// path, when CRPR is active.
    pub(crate) fn clk_info_with_crpr_clk_path(
        &self,
        from_clk_info_id: ClkInfoId,
        from_path: &PathRef,
    ) -> StaResult<ClkInfoId> {
        if !self.sdc.crpr_active() {
            return Ok(from_clk_info_id);
        }
        let from = self.clk_info(from_clk_info_id);
        self.find_clk_info(ClkInfo {
            crpr_clk_path: Some(from_path.rep()),
            ..(*from).clone()
        })
    }

    /// Advances the exception-state machines of `from_tag` across the
    /// `from_pin → to_pin` traversal and interns the resulting tag.
    ///
    /// Returns `None` when the path must be discarded: a completed false
    /// path leaves a non-clock pin, a false or loop pattern completes on
    /// this traversal, or a loop closes.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn mutate_tag(
        &self,
        from_tag: &Tag,
        from_tag_id: TagId,
        from_pin: Ident,
        from_rf: RiseFall,
        from_is_clk: bool,
        from_clk_info: ClkInfoId,
        to_pin: Ident,
        to_rf: RiseFall,
        to_is_clk: bool,
        to_is_reg_clk: bool,
        to_is_segment_start: bool,
        to_clk_info: ClkInfoId,
        to_input_delay: Option<InputDelayId>,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> StaResult<Option<TagId>> {
        let from_states = &from_tag.states;
        let mut state_change = false;
        if !from_states.is_empty() {
            // First pass: look for kills and state changes without
            // building the new set.
            for &state in from_states {
                let exc = self.sdc.exception(state.exception);
                if state.is_complete(exc) && exc.is_false() && !from_is_clk {
                    // A completed false path propagates only on clock
                    // networks, which carry it to kill data uses.
                    return Ok(None);
                }
                if exc.matches_next_thru(state, from_pin, to_pin, to_rf, min_max) {
                    let next = state.next();
                    if next.is_complete(exc) {
                        if exc.is_loop() {
                            // This edge closes a loop.
                            return Ok(None);
                        }
                        if exc.is_false() && !to_is_clk {
                            return Ok(None);
                        }
                    }
                    state_change = true;
                    break;
                }
                // Loop state dies at register clock pins.
                if to_is_reg_clk && exc.is_loop() {
                    state_change = true;
                    break;
                }
            }
        }

        let thru_states = self
            .sdc
            .exception_thru_states(from_pin, to_pin, to_rf, min_max);
        if let Some(new_states) = &thru_states {
            for &state in new_states {
                let exc = self.sdc.exception(state.exception);
                if state.is_complete(exc) {
                    if exc.is_loop() {
                        return Ok(None);
                    }
                    if exc.is_false() && !to_is_clk {
                        return Ok(None);
                    }
                }
            }
        }

        if thru_states.is_some() || state_change {
            // Second pass: apply state changes and merge new states.
            let mut new_states: ExceptionStateSet = thru_states.unwrap_or_default();
            for &state in from_states {
                let exc = self.sdc.exception(state.exception);
                let was_complete = state.is_complete(exc);
                if was_complete && exc.is_false() && !from_is_clk {
                    return Ok(None);
                }
                let mut state = state;
                // One traversal can pass several consecutive pattern
                // stages (hierarchical thru pins on one edge).
                while exc.matches_next_thru(state, from_pin, to_pin, to_rf, min_max) {
                    state = state.next();
                }
                if !was_complete && state.is_complete(exc) {
                    if exc.is_loop() {
                        return Ok(None);
                    }
                    if exc.is_false() && !to_is_clk {
                        return Ok(None);
                    }
                }
                if !(to_is_reg_clk && exc.is_loop()) {
                    new_states.push(state);
                }
            }
            canonicalize(&mut new_states);
            return self
                .find_tag(
                    to_rf,
                    path_ap,
                    to_clk_info,
                    to_is_clk,
                    from_tag.input_delay,
                    to_is_segment_start,
                    new_states,
                )
                .map(Some);
        }

        // No state change.
        if to_clk_info == from_clk_info
            && to_rf == from_rf
            && to_is_clk == from_is_clk
            && from_tag.is_segment_start == to_is_segment_start
            && from_tag.input_delay == to_input_delay
        {
            Ok(Some(from_tag_id))
        } else {
            self.find_tag(
                to_rf,
                path_ap,
                to_clk_info,
                to_is_clk,
                to_input_delay,
                to_is_segment_start,
                from_states.clone(),
            )
            .map(Some)
        }
    }

    /// Returns `true` if `pin` starts a synthetic path segment (internal
    /// path-delay startpoint or internal input delay).
    pub fn is_segment_start(&self, pin: Ident) -> bool {
        (self.sdc.is_path_delay_internal_startpoint(pin) || self.sdc.is_input_delay_internal(pin))
            && !self.sdc.is_vertex_pin_clock(pin)
    }

    /// Returns `true` if a path must not leave a clock source pin it
    /// propagated to: paths arriving at an internal path-delay endpoint
    /// that is also a clock source stop there unless the clock is their
    /// own.
    pub(crate) fn path_propagated_to_clk_src(&self, pin: Ident, tag: &Tag) -> bool {
        let clk_info = self.clk_info(tag.clk_info);
        if !clk_info.is_gen_clk_src_path
            && tag.input_delay.is_none()
            && self.sdc.is_path_delay_internal_endpoint(pin)
        {
            match self.sdc.vertex_pin_clocks(pin) {
                Some(clks) => match clk_info.clock() {
                    Some(clock) => !clks.contains(&clock),
                    None => true,
                },
                None => false,
            }
        } else {
            false
        }
    }
}

//! External collaborator interfaces.
//!
//! The search consumes delay values, netlist facts, latch behavior, and
//! endpoint constraints through these traits. Implementations come from the
//! rest of the toolchain (delay calculator, netlist database, latch
//! analyzer, path-end enumeration); tests provide small table-driven ones.

use crate::corner::PathApIndex;
use crate::path::PathRef;
use crate::search::Search;
use crate::tag::TagId;
use kairos_common::{Delay, Ident, MinMax, RiseFall, StaResult};
use kairos_graph::{EdgeId, TimingArc, VertexId};

/// The direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// An input pin.
    Input,
    /// An output pin.
    Output,
    /// A bidirectional pin.
    Bidirect,
    /// An internal (non-boundary) pin.
    Internal,
}

impl PortDirection {
    /// Returns `true` for input and bidirect pins.
    pub fn is_any_input(self) -> bool {
        matches!(self, PortDirection::Input | PortDirection::Bidirect)
    }
}

/// Gate-level delay calculation.
pub trait DelayCalculator: Sync {
    /// The delay of `arc` on `edge` under the given delay-calculation
    /// context.
    fn arc_delay(&self, edge: EdgeId, arc: &TimingArc, dcalc_ap: usize) -> Delay;
}

/// Read-only netlist facts the search needs about pins.
pub trait Network: Sync {
    /// Returns `true` if `pin` is a top-level port.
    fn is_top_level_port(&self, pin: Ident) -> bool;

    /// The direction of `pin`.
    fn direction(&self, pin: Ident) -> PortDirection;

    /// Returns `true` if `pin` is a hierarchical pin.
    fn is_hierarchical(&self, pin: Ident) -> bool;

    /// Visits the (driver, load) leaf-pin pairs connected through a
    /// hierarchical pin.
    fn visit_drvr_loads_thru_hier_pin(&self, hpin: Ident, visit: &mut dyn FnMut(Ident, Ident));

    /// Returns `true` if `pin` is a latch data input.
    fn is_latch_data(&self, pin: Ident) -> bool;

    /// Returns `true` if `pin` is the clock reference of a timing check.
    fn is_check_clk(&self, pin: Ident) -> bool;

    /// Returns `true` if `pin` is a load (an input of some instance or a
    /// top-level output).
    fn is_load(&self, pin: Ident) -> bool;

    /// Returns `true` if `pin` is a register or latch clock pin.
    fn is_reg_clk_pin(&self, pin: Ident) -> bool;

    /// The pulse-clock sense declared on the pin's library port, if any.
    fn pulse_clk_sense(&self, pin: Ident) -> Option<RiseFall>;

    /// The top-level input and bidirect pins, in a stable order.
    fn top_level_input_pins(&self) -> Vec<Ident>;

    /// The leaf pins of an instance, for instance-level invalidation.
    fn instance_pins(&self, instance: Ident) -> Vec<Ident>;
}

/// The open/closed state of a latch's D→Q path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    /// The latch is transparent for the whole analysis.
    Open,
    /// The latch is opaque; D→Q never propagates.
    Closed,
    /// Openness depends on data that is not yet known.
    Unknown,
}

/// Latch timing behavior.
pub trait LatchAnalyzer: Sync {
    /// Returns `true` if `edge` is a latch D→Q edge.
    fn is_latch_d_to_q(&self, edge: EdgeId) -> bool;

    /// The D→Q transparency of `edge`.
    fn latch_d_to_q_state(&self, edge: EdgeId) -> LatchState;

    /// The tag, arc delay, and arrival of the latch output path produced
    /// by `from_path` crossing a D→Q `edge`, or `None` when the latch
    /// borrows nothing and the path dies.
    fn latch_out_arrival(
        &self,
        search: &Search<'_>,
        from_path: &PathRef,
        arc: &TimingArc,
        edge: EdgeId,
        path_ap: PathApIndex,
    ) -> StaResult<Option<(TagId, Delay, Delay)>>;

    /// The enable-pin path that opened the latch for `path` through
    /// `edge`, if any.
    fn latch_enable_path(
        &self,
        search: &Search<'_>,
        path: &PathRef,
        edge: EdgeId,
    ) -> Option<PathRef>;
}

/// One endpoint constraint result: the required time a check imposes on
/// one (vertex, arrival-index) path.
#[derive(Debug, Clone, Copy)]
pub struct PathEnd {
    /// The arrival index the requirement applies to.
    pub arrival_index: usize,
    /// The analysis direction of the constrained path.
    pub min_max: MinMax,
    /// The required time.
    pub required: Delay,
    /// The endpoint slack of this path end.
    pub slack: Delay,
    /// The path end is reported but unconstrained.
    pub is_unconstrained: bool,
}

/// Enumerates the endpoint constraints of a vertex.
///
/// The provider walks the checks constraining `vertex` (setup/hold edges,
/// data checks, output delays, path-delay bounds) and produces a
/// [`PathEnd`] per constrained path.
pub trait PathEndProvider: Sync {
    /// Calls `visitor` for every path end at `vertex`.
    fn visit_path_ends(
        &self,
        search: &Search<'_>,
        vertex: VertexId,
        visitor: &mut dyn FnMut(&PathEnd),
    );

    /// Returns `true` if a timing-check edge imposes an enabled check.
    fn check_edge_enabled(&self, search: &Search<'_>, edge: EdgeId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_direction_inputs() {
        assert!(PortDirection::Input.is_any_input());
        assert!(PortDirection::Bidirect.is_any_input());
        assert!(!PortDirection::Output.is_any_input());
        assert!(!PortDirection::Internal.is_any_input());
    }
}

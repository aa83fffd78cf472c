//! Hash-consed clock state records.

use crate::corner::PathApIndex;
use crate::path::PathVertexRep;
use kairos_common::{Delay, Ident, RiseFall};
use kairos_sdc::{ClkEdgeRef, ClockId, ClockUncertainties};

/// Opaque, copyable ID for an interned [`ClkInfo`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ClkInfoId(u32);

impl ClkInfoId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Immutable bundle describing a clock's state at a point of a path.
///
/// ClkInfos are hash-consed: two structurally equal records are the same
/// interned object, so a tag comparing clock state compares one index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClkInfo {
    /// The launching clock edge, or `None` for unclocked paths.
    pub clk_edge: Option<ClkEdgeRef>,
    /// The clock source pin this path's clock entered at.
    pub clk_src: Option<Ident>,
    /// The clock network is propagated rather than ideal.
    pub is_propagated: bool,
    /// The generated-clock source pin, when the path feeds one.
    pub gen_clk_src: Option<Ident>,
    /// The path is inside a generated clock's source network.
    pub is_gen_clk_src_path: bool,
    /// Pulse-clock sense inherited from the clock network, if any.
    pub pulse_clk_sense: Option<RiseFall>,
    /// Source insertion delay at the clock source.
    pub insertion: Delay,
    /// Ideal-clock network latency.
    pub latency: Delay,
    /// Uncertainties applying to this clock state.
    pub uncertainties: Option<ClockUncertainties>,
    /// The analysis point this record belongs to.
    pub path_ap: PathApIndex,
    /// The register-clock path used for reconvergence pessimism credit.
    pub crpr_clk_path: Option<PathVertexRep>,
}

impl ClkInfo {
    /// A record for an unclocked path at the given analysis point.
    pub fn unclocked(path_ap: PathApIndex) -> Self {
        Self {
            clk_edge: None,
            clk_src: None,
            is_propagated: false,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense: None,
            insertion: Delay::ZERO,
            latency: Delay::ZERO,
            uncertainties: None,
            path_ap,
            crpr_clk_path: None,
        }
    }

    /// The launching clock, if any.
    pub fn clock(&self) -> Option<ClockId> {
        self.clk_edge.map(|e| e.clock)
    }

    /// Returns `true` if a CRPR clock path is recorded.
    pub fn has_crpr_clk_pin(&self) -> bool {
        self.crpr_clk_path.is_some()
    }

    /// Structural equality ignoring the CRPR clock path. Used by required
    /// propagation to substitute tags whose CRPR-credited twin was pruned.
    pub fn equal_no_crpr(&self, other: &ClkInfo) -> bool {
        self.clk_edge == other.clk_edge
            && self.clk_src == other.clk_src
            && self.is_propagated == other.is_propagated
            && self.gen_clk_src == other.gen_clk_src
            && self.is_gen_clk_src_path == other.is_gen_clk_src_path
            && self.pulse_clk_sense == other.pulse_clk_sense
            && self.insertion == other.insertion
            && self.latency == other.latency
            && self.uncertainties == other.uncertainties
            && self.path_ap == other.path_ap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_graph::VertexId;

    #[test]
    fn unclocked_has_no_clock() {
        let info = ClkInfo::unclocked(0);
        assert!(info.clock().is_none());
        assert!(!info.has_crpr_clk_pin());
    }

    #[test]
    fn structural_equality() {
        let a = ClkInfo::unclocked(0);
        let b = ClkInfo::unclocked(0);
        let c = ClkInfo::unclocked(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn equal_no_crpr_ignores_crpr_path() {
        let a = ClkInfo::unclocked(0);
        let mut b = ClkInfo::unclocked(0);
        b.crpr_clk_path = Some(PathVertexRep {
            vertex: VertexId::from_raw(4),
            arrival_index: 0,
        });
        assert_ne!(a, b);
        assert!(a.equal_no_crpr(&b));
        let c = ClkInfo::unclocked(1);
        assert!(!a.equal_no_crpr(&c));
    }
}

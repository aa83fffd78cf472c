//! Timing roles classifying graph edges.

use serde::{Deserialize, Serialize};

/// The semantic role of a timing graph edge.
///
/// The role decides how the search treats the edge: which tag transform
/// applies, which derate applies, and whether the edge participates in
/// arrival propagation at all (check edges do not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingRole {
    /// Interconnect delay along a net.
    Wire,
    /// Combinational delay through a cell.
    Combinational,
    /// Clock-to-output delay of an edge-triggered register.
    RegClkToQ,
    /// Data-to-output delay of a level-sensitive latch.
    LatchDToQ,
    /// Enable-to-output delay of a level-sensitive latch.
    LatchEnToQ,
    /// Setup time check at a register data pin.
    SetupCheck,
    /// Hold time check at a register data pin.
    HoldCheck,
    /// Delay through a tristate driver while its enable asserts.
    TristateEnable,
    /// Delay through a tristate driver while its enable deasserts.
    TristateDisable,
}

impl TimingRole {
    /// Returns `true` for net interconnect edges.
    pub fn is_wire(self) -> bool {
        self == TimingRole::Wire
    }

    /// Returns `true` for setup/hold check edges, which constrain but do
    /// not propagate arrivals.
    pub fn is_timing_check(self) -> bool {
        matches!(self, TimingRole::SetupCheck | TimingRole::HoldCheck)
    }

    /// Returns `true` for tristate enable/disable edges.
    pub fn is_tristate(self) -> bool {
        matches!(self, TimingRole::TristateEnable | TimingRole::TristateDisable)
    }

    /// Collapses roles that share launch behavior: a latch enable-to-Q edge
    /// launches a path exactly like a register clock-to-Q edge.
    pub fn generic_role(self) -> TimingRole {
        match self {
            TimingRole::LatchEnToQ => TimingRole::RegClkToQ,
            other => other,
        }
    }

    /// Returns `true` for roles a clock network can propagate through.
    pub fn propagates_clock(self) -> bool {
        matches!(self, TimingRole::Wire | TimingRole::Combinational)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_roles() {
        assert!(TimingRole::SetupCheck.is_timing_check());
        assert!(TimingRole::HoldCheck.is_timing_check());
        assert!(!TimingRole::Wire.is_timing_check());
        assert!(!TimingRole::RegClkToQ.is_timing_check());
    }

    #[test]
    fn generic_role_collapses_latch_enable() {
        assert_eq!(
            TimingRole::LatchEnToQ.generic_role(),
            TimingRole::RegClkToQ
        );
        assert_eq!(TimingRole::RegClkToQ.generic_role(), TimingRole::RegClkToQ);
        assert_eq!(TimingRole::Wire.generic_role(), TimingRole::Wire);
    }

    #[test]
    fn clock_propagation_roles() {
        assert!(TimingRole::Wire.propagates_clock());
        assert!(TimingRole::Combinational.propagates_clock());
        assert!(!TimingRole::RegClkToQ.propagates_clock());
        assert!(!TimingRole::TristateEnable.propagates_clock());
    }

    #[test]
    fn tristate_roles() {
        assert!(TimingRole::TristateEnable.is_tristate());
        assert!(TimingRole::TristateDisable.is_tristate());
        assert!(!TimingRole::Combinational.is_tristate());
    }
}

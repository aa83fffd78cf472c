//! Input delay declarations.

use crate::clocks::ClkEdgeRef;
use kairos_common::{Delay, Ident, MinMax, RiseFall};
use serde::{Deserialize, Serialize};

/// Opaque, copyable ID for an input delay record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct InputDelayId(u32);

impl InputDelayId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize` for array access.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An input delay (`set_input_delay`) on a port or internal pin.
///
/// A pin may carry several input delays with respect to different clocks.
/// When `ref_pin` is set, the delay is measured from the clock arrival at
/// that reference pin rather than from the clock source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDelay {
    /// The unique ID of this record.
    pub id: InputDelayId,
    /// The pin the delay applies to.
    pub pin: Ident,
    /// The clock edge the delay is measured from, if any.
    pub clock_edge: Option<ClkEdgeRef>,
    /// Delay values per (transition, analysis direction); `None` entries
    /// do not seed.
    pub delays: [[Option<Delay>; MinMax::COUNT]; 2],
    /// Reference pin for the clock arrival, if declared.
    pub ref_pin: Option<Ident>,
    /// Transition of the reference clock arrival.
    pub ref_rf: RiseFall,
    /// The declared value already includes clock source latency.
    pub source_latency_included: bool,
    /// The declared value already includes clock network latency.
    pub network_latency_included: bool,
}

impl InputDelay {
    /// The delay value for (transition, direction), if declared.
    pub fn value(&self, rf: RiseFall, min_max: MinMax) -> Option<Delay> {
        self.delays[rf.index()][min_max.index()]
    }

    /// Sets the delay value for both transitions and directions.
    pub fn set_all(&mut self, value: Delay) {
        for rf in 0..2 {
            for mm in 0..MinMax::COUNT {
                self.delays[rf][mm] = Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocks::ClockId;
    use kairos_common::Interner;

    fn delay(interner: &Interner) -> InputDelay {
        InputDelay {
            id: InputDelayId::from_raw(0),
            pin: interner.intern("din"),
            clock_edge: Some(ClkEdgeRef {
                clock: ClockId::from_raw(0),
                rf: RiseFall::Rise,
            }),
            delays: [[None; MinMax::COUNT]; 2],
            ref_pin: None,
            ref_rf: RiseFall::Rise,
            source_latency_included: false,
            network_latency_included: false,
        }
    }

    #[test]
    fn unset_values_do_not_seed() {
        let interner = Interner::new();
        let d = delay(&interner);
        assert!(d.value(RiseFall::Rise, MinMax::Max).is_none());
    }

    #[test]
    fn set_all_fills_every_slot() {
        let interner = Interner::new();
        let mut d = delay(&interner);
        d.set_all(Delay::new(1.5));
        for rf in RiseFall::BOTH {
            for mm in MinMax::BOTH {
                assert_eq!(d.value(rf, mm), Some(Delay::new(1.5)));
            }
        }
    }

    #[test]
    fn per_slot_values() {
        let interner = Interner::new();
        let mut d = delay(&interner);
        d.delays[RiseFall::Fall.index()][MinMax::Min.index()] = Some(Delay::new(0.25));
        assert_eq!(d.value(RiseFall::Fall, MinMax::Min), Some(Delay::new(0.25)));
        assert!(d.value(RiseFall::Rise, MinMax::Min).is_none());
    }
}

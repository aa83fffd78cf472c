//! Clock definitions: waveforms, sources, uncertainties, generated clocks.

use kairos_common::{Delay, Ident, MinMax, RiseFall};
use serde::{Deserialize, Serialize};

/// Opaque, copyable ID for a clock in the constraint store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ClockId(u32);

impl ClockId {
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

/// A reference to one edge of a clock's waveform.
///
/// Edge times are resolved through the store
/// ([`Sdc::clock`](crate::Sdc::clock) then [`Clock::edge_time`]), so the
/// reference itself stays a small copyable key suitable for hash-consed
/// records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ClkEdgeRef {
    /// The clock.
    pub clock: ClockId,
    /// Which waveform edge.
    pub rf: RiseFall,
}

/// Rise and fall times of a clock within one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Waveform {
    /// Time of the rising edge.
    pub rise: Delay,
    /// Time of the falling edge.
    pub fall: Delay,
}

/// Setup/hold uncertainty applied to a clock or clock pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockUncertainties {
    /// Uncertainty subtracted from setup (max-analysis) requirements.
    pub setup: Delay,
    /// Uncertainty added to hold (min-analysis) requirements.
    pub hold: Delay,
}

impl ClockUncertainties {
    /// The uncertainty for the given analysis direction.
    pub fn value(&self, min_max: MinMax) -> Delay {
        match min_max {
            MinMax::Max => self.setup,
            MinMax::Min => self.hold,
        }
    }
}

/// The generation rule of a derived clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedClock {
    /// The master clock this clock is derived from.
    pub master: ClockId,
    /// Frequency division factor applied to the master.
    pub divide_by: u32,
}

/// A clock definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// The unique ID of this clock.
    pub id: ClockId,
    /// The clock's name.
    pub name: Ident,
    /// The clock period.
    pub period: Delay,
    /// Rise/fall edge times within the period.
    pub waveform: Waveform,
    /// The source pins this clock is defined on.
    pub sources: Vec<Ident>,
    /// The clock network is propagated (`set_propagated_clock`).
    pub is_propagated: bool,
    /// Clock-level uncertainties, if declared.
    pub uncertainties: Option<ClockUncertainties>,
    /// Generation rule when this is a generated clock.
    pub generated: Option<GeneratedClock>,
}

impl Clock {
    /// The time of the given waveform edge.
    pub fn edge_time(&self, rf: RiseFall) -> Delay {
        match rf {
            RiseFall::Rise => self.waveform.rise,
            RiseFall::Fall => self.waveform.fall,
        }
    }

    /// A reference to the given waveform edge.
    pub fn edge(&self, rf: RiseFall) -> ClkEdgeRef {
        ClkEdgeRef { clock: self.id, rf }
    }

    /// The first declared source pin, used where a single representative
    /// pin is needed.
    pub fn default_pin(&self) -> Option<Ident> {
        self.sources.first().copied()
    }

    /// Returns `true` if this is a generated clock.
    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// The master clock, for generated clocks.
    pub fn master_clk(&self) -> Option<ClockId> {
        self.generated.map(|g| g.master)
    }
}

/// The default waveform for a period: rise at 0, fall at period/2.
pub fn default_waveform(period: Delay) -> Waveform {
    Waveform {
        rise: Delay::ZERO,
        fall: Delay::new(period.as_ns() / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::Interner;

    fn clock(id: u32, name: Ident, period: f64) -> Clock {
        Clock {
            id: ClockId::from_raw(id),
            name,
            period: Delay::new(period),
            waveform: default_waveform(Delay::new(period)),
            sources: Vec::new(),
            is_propagated: false,
            uncertainties: None,
            generated: None,
        }
    }

    #[test]
    fn default_waveform_is_half_period() {
        let interner = Interner::new();
        let clk = clock(0, interner.intern("clk"), 10.0);
        assert_eq!(clk.edge_time(RiseFall::Rise).as_ns(), 0.0);
        assert_eq!(clk.edge_time(RiseFall::Fall).as_ns(), 5.0);
    }

    #[test]
    fn edge_refs_are_keys() {
        let interner = Interner::new();
        let clk = clock(3, interner.intern("clk"), 8.0);
        let rise = clk.edge(RiseFall::Rise);
        assert_eq!(rise.clock, ClockId::from_raw(3));
        assert_eq!(rise, clk.edge(RiseFall::Rise));
        assert_ne!(rise, clk.edge(RiseFall::Fall));
    }

    #[test]
    fn uncertainties_by_direction() {
        let u = ClockUncertainties {
            setup: Delay::new(0.2),
            hold: Delay::new(0.1),
        };
        assert_eq!(u.value(MinMax::Max).as_ns(), 0.2);
        assert_eq!(u.value(MinMax::Min).as_ns(), 0.1);
    }

    #[test]
    fn generated_clock_master() {
        let interner = Interner::new();
        let mut gclk = clock(1, interner.intern("gclk"), 20.0);
        gclk.generated = Some(GeneratedClock {
            master: ClockId::from_raw(0),
            divide_by: 2,
        });
        assert!(gclk.is_generated());
        assert_eq!(gclk.master_clk(), Some(ClockId::from_raw(0)));
    }
}

//! Timing derating factors.

use kairos_common::MinMax;
use serde::{Deserialize, Serialize};

/// Whether a derate applies to clock-network or data paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathClkOrData {
    /// The path is inside a clock network.
    Clk,
    /// The path carries data.
    Data,
}

impl PathClkOrData {
    fn index(self) -> usize {
        match self {
            PathClkOrData::Clk => 0,
            PathClkOrData::Data => 1,
        }
    }
}

/// The kind of delay a derate scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerateType {
    /// Net interconnect delays.
    NetDelay,
    /// Cell propagation delays.
    CellDelay,
    /// Cell check margins.
    CellCheck,
}

impl DerateType {
    fn index(self) -> usize {
        match self {
            DerateType::NetDelay => 0,
            DerateType::CellDelay => 1,
            DerateType::CellCheck => 2,
        }
    }
}

/// Global derating factors (`set_timing_derate`), keyed by delay kind,
/// clock-vs-data, and analysis direction. Unset factors are 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derates {
    factors: [[[f64; MinMax::COUNT]; 2]; 3],
}

impl Derates {
    /// All factors 1.0.
    pub fn new() -> Self {
        Self {
            factors: [[[1.0; MinMax::COUNT]; 2]; 3],
        }
    }

    /// Sets one derating factor.
    pub fn set(
        &mut self,
        derate_type: DerateType,
        clk_data: PathClkOrData,
        min_max: MinMax,
        factor: f64,
    ) {
        self.factors[derate_type.index()][clk_data.index()][min_max.index()] = factor;
    }

    /// The derating factor for a delay of the given kind.
    pub fn factor(
        &self,
        derate_type: DerateType,
        clk_data: PathClkOrData,
        min_max: MinMax,
    ) -> f64 {
        self.factors[derate_type.index()][clk_data.index()][min_max.index()]
    }
}

impl Default for Derates {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_unity() {
        let d = Derates::new();
        assert_eq!(
            d.factor(DerateType::NetDelay, PathClkOrData::Data, MinMax::Max),
            1.0
        );
    }

    #[test]
    fn set_and_get() {
        let mut d = Derates::new();
        d.set(DerateType::CellDelay, PathClkOrData::Clk, MinMax::Min, 0.95);
        assert_eq!(
            d.factor(DerateType::CellDelay, PathClkOrData::Clk, MinMax::Min),
            0.95
        );
        // Other slots untouched.
        assert_eq!(
            d.factor(DerateType::CellDelay, PathClkOrData::Clk, MinMax::Max),
            1.0
        );
        assert_eq!(
            d.factor(DerateType::CellDelay, PathClkOrData::Data, MinMax::Min),
            1.0
        );
    }
}

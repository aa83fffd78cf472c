//! Min/max analysis directions.

use crate::delay::Delay;
use serde::{Deserialize, Serialize};

/// The analysis direction of a path: `Min` for hold/early analysis,
/// `Max` for setup/late analysis.
///
/// Arrival propagation keeps the dominant value in this direction; required
/// propagation keeps the dominant value in the opposite direction. Slack is
/// `required - arrival` under `Max` and `arrival - required` under `Min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinMax {
    /// Early/hold analysis: smaller values dominate.
    Min,
    /// Late/setup analysis: larger values dominate.
    Max,
}

impl MinMax {
    /// Both directions, in index order.
    pub const BOTH: [MinMax; 2] = [MinMax::Min, MinMax::Max];

    /// Number of directions, for sizing per-direction arrays.
    pub const COUNT: usize = 2;

    /// Dense index: `Min` is 0, `Max` is 1.
    pub fn index(self) -> usize {
        match self {
            MinMax::Min => 0,
            MinMax::Max => 1,
        }
    }

    /// The opposite direction.
    pub fn opposite(self) -> MinMax {
        match self {
            MinMax::Min => MinMax::Max,
            MinMax::Max => MinMax::Min,
        }
    }

    /// The identity value for dominance in this direction: any real delay
    /// dominates it.
    pub fn init_value(self) -> Delay {
        match self {
            MinMax::Min => Delay::new(f64::INFINITY),
            MinMax::Max => Delay::new(f64::NEG_INFINITY),
        }
    }

    /// Slack sign convention: `required - arrival` under `Max`,
    /// `arrival - required` under `Min`.
    pub fn slack(self, arrival: Delay, required: Delay) -> Delay {
        match self {
            MinMax::Max => required - arrival,
            MinMax::Min => arrival - required,
        }
    }
}

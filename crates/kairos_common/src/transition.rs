//! Rise/fall signal transitions.

use serde::{Deserialize, Serialize};

/// A signal transition direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiseFall {
    /// A low-to-high transition.
    Rise,
    /// A high-to-low transition.
    Fall,
}

impl RiseFall {
    /// Both transitions, in index order.
    pub const BOTH: [RiseFall; 2] = [RiseFall::Rise, RiseFall::Fall];

    /// Dense index: `Rise` is 0, `Fall` is 1.
    pub fn index(self) -> usize {
        match self {
            RiseFall::Rise => 0,
            RiseFall::Fall => 1,
        }
    }

    /// The opposite transition.
    pub fn opposite(self) -> RiseFall {
        match self {
            RiseFall::Rise => RiseFall::Fall,
            RiseFall::Fall => RiseFall::Rise,
        }
    }

    /// Short display form used in traces: `r` or `f`.
    pub fn short_name(self) -> &'static str {
        match self {
            RiseFall::Rise => "r",
            RiseFall::Fall => "f",
        }
    }
}

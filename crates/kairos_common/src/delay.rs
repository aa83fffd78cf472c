//! Delay values with tolerance-aware comparison.
//!
//! All times in the engine (arc delays, arrivals, required times, slacks)
//! are [`Delay`] values in nanoseconds. Comparisons that decide whether a
//! stored value changed use a fixed tolerance so that floating-point noise
//! from delay recalculation does not trigger spurious re-propagation.
//! Dominance comparisons used during the search are strict so that results
//! are deterministic regardless of visit interleaving.

use crate::minmax::MinMax;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Comparison tolerance in nanoseconds.
const TOLERANCE_NS: f64 = 1e-9;

/// A delay or time value in nanoseconds.
///
/// Thin wrapper over `f64` providing arithmetic and the fuzzy/dominance
/// comparisons the search relies on. An `Arrival`, `Required`, or `Slack`
/// is a `Delay` interpreted under the current min/max analysis.
///
/// `Eq` and `Hash` use the raw bit pattern: delays are used as components
/// of hash-consed records, and those records never hold NaN.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Delay(f64);

impl Eq for Delay {}

impl std::hash::Hash for Delay {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.to_bits());
    }
}

impl Delay {
    /// Zero delay.
    pub const ZERO: Self = Self(0.0);

    /// Creates a delay from a value in nanoseconds.
    pub fn new(ns: f64) -> Self {
        Self(ns)
    }

    /// Returns the value in nanoseconds.
    pub fn as_ns(self) -> f64 {
        self.0
    }

    /// Returns `true` if the two values are equal within the comparison
    /// tolerance. Identical values compare equal even when infinite, so
    /// untouched init-value slots never read as changed.
    pub fn fuzzy_equal(self, other: Self) -> bool {
        self.0 == other.0 || (self.0 - other.0).abs() < TOLERANCE_NS
    }

    /// Strict dominance in the direction of `min_max`: greater for max
    /// analysis, less for min analysis. Ties are not dominant, which keeps
    /// the search deterministic across thread counts.
    pub fn dominates(self, other: Self, min_max: MinMax) -> bool {
        match min_max {
            MinMax::Max => self.0 > other.0,
            MinMax::Min => self.0 < other.0,
        }
    }

    /// Fuzzy greater-than in the direction of `min_max`: like
    /// [`dominates`](Self::dominates) but only when outside the tolerance.
    pub fn fuzzy_dominates(self, other: Self, min_max: MinMax) -> bool {
        !self.fuzzy_equal(other) && self.dominates(other, min_max)
    }

    /// Returns `true` if the value is negative beyond the tolerance.
    pub fn fuzzy_negative(self) -> bool {
        self.0 < -TOLERANCE_NS
    }

    /// The smaller of two delays.
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// The larger of two delays.
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Absolute value.
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Returns `true` for the infinities used as search init values.
    pub fn is_init_value(self) -> bool {
        self.0.is_infinite()
    }
}

impl Add for Delay {
    type Output = Delay;
    fn add(self, rhs: Delay) -> Delay {
        Delay(self.0 + rhs.0)
    }
}

impl AddAssign for Delay {
    fn add_assign(&mut self, rhs: Delay) {
        self.0 += rhs.0;
    }
}

impl Sub for Delay {
    type Output = Delay;
    fn sub(self, rhs: Delay) -> Delay {
        Delay(self.0 - rhs.0)
    }
}

impl SubAssign for Delay {
    fn sub_assign(&mut self, rhs: Delay) {
        self.0 -= rhs.0;
    }
}

impl Neg for Delay {
    type Output = Delay;
    fn neg(self) -> Delay {
        Delay(-self.0)
    }
}

impl Sum for Delay {
    fn sum<I: Iterator<Item = Delay>>(iter: I) -> Delay {
        Delay(iter.map(|d| d.0).sum())
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<f64> for Delay {
    fn from(ns: f64) -> Self {
        Self(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_equal_within_tolerance() {
        let a = Delay::new(1.0);
        let b = Delay::new(1.0 + 1e-12);
        assert!(a.fuzzy_equal(b));
        assert!(!a.fuzzy_equal(Delay::new(1.1)));
    }

    #[test]
    fn fuzzy_equal_handles_init_values() {
        let max_init = MinMax::Max.init_value();
        let min_init = MinMax::Min.init_value();
        assert!(max_init.fuzzy_equal(max_init));
        assert!(min_init.fuzzy_equal(min_init));
        assert!(!max_init.fuzzy_equal(min_init));
        assert!(!max_init.fuzzy_equal(Delay::ZERO));
    }

    #[test]
    fn dominance_directions() {
        let a = Delay::new(2.0);
        let b = Delay::new(1.0);
        assert!(a.dominates(b, MinMax::Max));
        assert!(!a.dominates(b, MinMax::Min));
        assert!(b.dominates(a, MinMax::Min));
    }

    #[test]
    fn dominance_is_strict_on_ties() {
        let a = Delay::new(3.0);
        assert!(!a.dominates(a, MinMax::Max));
        assert!(!a.dominates(a, MinMax::Min));
    }

    #[test]
    fn fuzzy_dominates_rejects_noise() {
        let a = Delay::new(1.0);
        let b = Delay::new(1.0 + 1e-12);
        assert!(!b.fuzzy_dominates(a, MinMax::Max));
        assert!(Delay::new(1.5).fuzzy_dominates(a, MinMax::Max));
    }

    #[test]
    fn arithmetic() {
        let a = Delay::new(1.5) + Delay::new(2.5);
        assert_eq!(a.as_ns(), 4.0);
        let b = a - Delay::new(1.0);
        assert_eq!(b.as_ns(), 3.0);
        assert_eq!((-b).as_ns(), -3.0);
    }

    #[test]
    fn init_values_are_infinite() {
        assert!(MinMax::Max.init_value().is_init_value());
        assert!(MinMax::Min.init_value().is_init_value());
        assert!(!Delay::ZERO.is_init_value());
    }

    #[test]
    fn serde_roundtrip() {
        let d = Delay::new(2.75);
        let json = serde_json::to_string(&d).unwrap();
        let back: Delay = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}

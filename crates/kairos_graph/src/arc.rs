//! Timing arcs: the transition-level connections within an edge.
//!
//! An edge carries a [`TimingArcSet`]: one arc per (from-transition,
//! to-transition) pair the underlying cell or net supports. The search
//! iterates the arcs reachable from a given from-transition; delay values
//! come from the external delay calculator keyed by `(edge, arc)`.

use kairos_common::RiseFall;
use serde::{Deserialize, Serialize};

/// Unateness of a timing arc set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingSense {
    /// Output transition follows the input transition.
    PositiveUnate,
    /// Output transition opposes the input transition.
    NegativeUnate,
    /// Both output transitions can result from either input transition.
    NonUnate,
}

/// One timing arc: a from-transition to to-transition pair.
///
/// The `index` is the arc's position within its owning set and is the key
/// the delay calculator uses alongside the edge ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimingArc {
    /// Position of this arc within its owning [`TimingArcSet`].
    pub index: u32,
    /// The input transition this arc responds to.
    pub from_rf: RiseFall,
    /// The output transition this arc produces.
    pub to_rf: RiseFall,
}

/// The set of timing arcs carried by one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingArcSet {
    arcs: Vec<TimingArc>,
    sense: TimingSense,
}

impl TimingArcSet {
    /// An arc set from explicit (from, to) transition pairs.
    pub fn new(sense: TimingSense, pairs: &[(RiseFall, RiseFall)]) -> Self {
        let arcs = pairs
            .iter()
            .enumerate()
            .map(|(i, &(from_rf, to_rf))| TimingArc {
                index: i as u32,
                from_rf,
                to_rf,
            })
            .collect();
        Self { arcs, sense }
    }

    /// The arc set of a wire: rise follows rise, fall follows fall.
    pub fn wire() -> Self {
        Self::new(
            TimingSense::PositiveUnate,
            &[
                (RiseFall::Rise, RiseFall::Rise),
                (RiseFall::Fall, RiseFall::Fall),
            ],
        )
    }

    /// A combinational arc set with the given unateness.
    pub fn combinational(sense: TimingSense) -> Self {
        match sense {
            TimingSense::PositiveUnate => Self::new(
                sense,
                &[
                    (RiseFall::Rise, RiseFall::Rise),
                    (RiseFall::Fall, RiseFall::Fall),
                ],
            ),
            TimingSense::NegativeUnate => Self::new(
                sense,
                &[
                    (RiseFall::Rise, RiseFall::Fall),
                    (RiseFall::Fall, RiseFall::Rise),
                ],
            ),
            TimingSense::NonUnate => Self::new(
                sense,
                &[
                    (RiseFall::Rise, RiseFall::Rise),
                    (RiseFall::Rise, RiseFall::Fall),
                    (RiseFall::Fall, RiseFall::Rise),
                    (RiseFall::Fall, RiseFall::Fall),
                ],
            ),
        }
    }

    /// The launch arc set of a register clocked on `clk_rf`: the active
    /// clock edge produces both output transitions.
    pub fn clk_to_q(clk_rf: RiseFall) -> Self {
        Self::new(
            TimingSense::NonUnate,
            &[(clk_rf, RiseFall::Rise), (clk_rf, RiseFall::Fall)],
        )
    }

    /// A check arc set: the reference clock edge checks both data
    /// transitions.
    pub fn check(clk_rf: RiseFall) -> Self {
        Self::new(
            TimingSense::NonUnate,
            &[(clk_rf, RiseFall::Rise), (clk_rf, RiseFall::Fall)],
        )
    }

    /// All arcs in the set.
    pub fn arcs(&self) -> &[TimingArc] {
        &self.arcs
    }

    /// The unateness of this set.
    pub fn sense(&self) -> TimingSense {
        self.sense
    }

    /// The arcs activated by `from_rf`, up to two (a non-unate arc set has
    /// both a rise and a fall output arc for each input transition).
    pub fn arcs_from(&self, from_rf: RiseFall) -> (Option<&TimingArc>, Option<&TimingArc>) {
        let mut first = None;
        let mut second = None;
        for arc in &self.arcs {
            if arc.from_rf == from_rf {
                if first.is_none() {
                    first = Some(arc);
                } else {
                    second = Some(arc);
                    break;
                }
            }
        }
        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_arcs_preserve_transition() {
        let set = TimingArcSet::wire();
        let (a, b) = set.arcs_from(RiseFall::Rise);
        assert_eq!(a.unwrap().to_rf, RiseFall::Rise);
        assert!(b.is_none());
        let (a, _) = set.arcs_from(RiseFall::Fall);
        assert_eq!(a.unwrap().to_rf, RiseFall::Fall);
    }

    #[test]
    fn negative_unate_inverts() {
        let set = TimingArcSet::combinational(TimingSense::NegativeUnate);
        let (a, b) = set.arcs_from(RiseFall::Rise);
        assert_eq!(a.unwrap().to_rf, RiseFall::Fall);
        assert!(b.is_none());
    }

    #[test]
    fn non_unate_yields_two_arcs() {
        let set = TimingArcSet::combinational(TimingSense::NonUnate);
        let (a, b) = set.arcs_from(RiseFall::Rise);
        assert!(a.is_some());
        assert!(b.is_some());
        assert_ne!(a.unwrap().to_rf, b.unwrap().to_rf);
    }

    #[test]
    fn clk_to_q_launches_only_on_active_edge() {
        let set = TimingArcSet::clk_to_q(RiseFall::Rise);
        let (a, b) = set.arcs_from(RiseFall::Rise);
        assert!(a.is_some() && b.is_some());
        let (a, b) = set.arcs_from(RiseFall::Fall);
        assert!(a.is_none() && b.is_none());
    }

    #[test]
    fn arc_indices_are_dense() {
        let set = TimingArcSet::combinational(TimingSense::NonUnate);
        for (i, arc) in set.arcs().iter().enumerate() {
            assert_eq!(arc.index as usize, i);
        }
    }
}

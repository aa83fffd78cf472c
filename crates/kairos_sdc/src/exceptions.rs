//! Path exceptions and their traversal state machines.
//!
//! An exception constrains or excludes the paths matching a
//! `from → thru… → to` pattern. As the search advances a path across an
//! edge it advances an [`ExceptionState`] per active exception; the state's
//! position counts the pattern stages matched so far, where the stages are
//! the `-thru` points in order followed by the `-to` point. A state whose
//! position reaches the stage count is *complete*. Completing a false-path
//! or loop exception kills the path at the pin where it completes.

use crate::clocks::ClockId;
use kairos_common::{Delay, Ident, MinMax, RiseFall};
use serde::{Deserialize, Serialize};

/// Opaque, copyable ID for a path exception.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ExceptionId(u32);

impl ExceptionId {
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

/// What an exception does to the paths it matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// `set_false_path`: matching paths are not timed.
    FalsePath,
    /// `set_max_delay`/`set_min_delay`: matching paths get an absolute
    /// delay bound instead of a clock-derived requirement.
    PathDelay {
        /// The analysis direction the bound applies to.
        min_max: MinMax,
        /// The bound itself.
        delay: Delay,
    },
    /// `set_multicycle_path`: matching paths may use extra clock cycles.
    Multicycle {
        /// Restricts the exception to one direction when set.
        min_max: Option<MinMax>,
        /// Number of clock cycles allowed.
        cycles: u32,
    },
    /// An interactive path filter (`-from`/`-thru`/`-to` of a query),
    /// installed and removed by the search.
    Filter,
    /// A combinational loop recorded by levelization; completing it closes
    /// the loop and kills the path.
    Loop,
}

/// One point of an exception pattern.
///
/// A point matches a set of pins (on path entry), a set of clocks
/// (startpoints launched by those clocks), or a set of edges (loop
/// patterns match specific graph edges). An optional transition restricts
/// the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionPoint {
    /// Pins matched when a path enters them.
    pub pins: Vec<Ident>,
    /// Clocks matched at path startpoints.
    pub clocks: Vec<ClockId>,
    /// Edges matched as (from-pin, to-pin) pairs; used by loop exceptions.
    pub edges: Vec<(Ident, Ident)>,
    /// Restricts the match to one transition when set.
    pub rf: Option<RiseFall>,
}

impl ExceptionPoint {
    /// A point matching the given pins.
    pub fn pins(pins: Vec<Ident>) -> Self {
        Self {
            pins,
            ..Self::default()
        }
    }

    /// A point matching startpoints of the given clocks.
    pub fn clocks(clocks: Vec<ClockId>) -> Self {
        Self {
            clocks,
            ..Self::default()
        }
    }

    /// A point matching the given graph edges.
    pub fn edges(edges: Vec<(Ident, Ident)>) -> Self {
        Self {
            edges,
            ..Self::default()
        }
    }

    fn rf_matches(&self, rf: RiseFall) -> bool {
        self.rf.map_or(true, |want| want == rf)
    }

    /// Returns `true` if a path at `pin` with transition `rf` matches.
    pub fn matches_pin(&self, pin: Ident, rf: RiseFall) -> bool {
        self.pins.contains(&pin) && self.rf_matches(rf)
    }

    /// Returns `true` if a startpoint launched by `clock` matches.
    pub fn matches_clock(&self, clock: ClockId) -> bool {
        self.clocks.contains(&clock)
    }

    /// Returns `true` if traversing `from_pin → to_pin` with arrival
    /// transition `to_rf` matches this point.
    pub fn matches_edge(&self, from_pin: Ident, to_pin: Ident, to_rf: RiseFall) -> bool {
        if !self.rf_matches(to_rf) {
            return false;
        }
        self.pins.contains(&to_pin) || self.edges.contains(&(from_pin, to_pin))
    }
}

/// A path exception: kind plus `from → thru… → to` pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionPath {
    /// The unique ID of this exception.
    pub id: ExceptionId,
    /// What the exception does.
    pub kind: ExceptionKind,
    /// The startpoint pattern, if any.
    pub from: Option<ExceptionPoint>,
    /// The intermediate points, in order.
    pub thrus: Vec<ExceptionPoint>,
    /// The endpoint pattern, if any.
    pub to: Option<ExceptionPoint>,
}

impl ExceptionPath {
    /// Returns `true` for false-path exceptions.
    pub fn is_false(&self) -> bool {
        self.kind == ExceptionKind::FalsePath
    }

    /// Returns `true` for loop exceptions.
    pub fn is_loop(&self) -> bool {
        self.kind == ExceptionKind::Loop
    }

    /// Returns `true` for interactive filter exceptions.
    pub fn is_filter(&self) -> bool {
        self.kind == ExceptionKind::Filter
    }

    /// Returns `true` for path-delay exceptions.
    pub fn is_path_delay(&self) -> bool {
        matches!(self.kind, ExceptionKind::PathDelay { .. })
    }

    /// Returns `true` if the exception applies under `min_max`.
    pub fn applies_to(&self, min_max: MinMax) -> bool {
        match self.kind {
            ExceptionKind::PathDelay { min_max: mm, .. } => mm == min_max,
            ExceptionKind::Multicycle { min_max: mm, .. } => mm.map_or(true, |m| m == min_max),
            _ => true,
        }
    }

    /// Number of pattern stages after the startpoint: the `-thru` points
    /// followed by the `-to` point.
    pub fn stage_count(&self) -> u32 {
        self.thrus.len() as u32 + u32::from(self.to.is_some())
    }

    /// The pattern stage at `position`.
    pub fn stage(&self, position: u32) -> &ExceptionPoint {
        let position = position as usize;
        if position < self.thrus.len() {
            &self.thrus[position]
        } else {
            self.to.as_ref().expect("stage position within pattern")
        }
    }

    /// Returns `true` if traversing `from_pin → to_pin` matches the next
    /// unmatched stage of `state`.
    pub fn matches_next_thru(
        &self,
        state: ExceptionState,
        from_pin: Ident,
        to_pin: Ident,
        to_rf: RiseFall,
        min_max: MinMax,
    ) -> bool {
        self.applies_to(min_max)
            && state.position < self.stage_count()
            && self
                .stage(state.position)
                .matches_edge(from_pin, to_pin, to_rf)
    }
}

/// The position of one path within one exception's pattern.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ExceptionState {
    /// The exception being tracked.
    pub exception: ExceptionId,
    /// Number of pattern stages matched so far.
    pub position: u32,
}

impl ExceptionState {
    /// The initial state of an exception whose startpoint matched.
    pub fn start(exception: ExceptionId) -> Self {
        Self {
            exception,
            position: 0,
        }
    }

    /// The state after matching one more stage.
    pub fn next(self) -> Self {
        Self {
            exception: self.exception,
            position: self.position + 1,
        }
    }

    /// Returns `true` if every stage of `exc` has been matched.
    pub fn is_complete(self, exc: &ExceptionPath) -> bool {
        self.position >= exc.stage_count()
    }
}

/// A canonical set of exception states: sorted and deduplicated, so equal
/// sets are representation-identical and can key hash-consed tags.
pub type ExceptionStateSet = Vec<ExceptionState>;

/// Sorts and deduplicates a state set in place.
pub fn canonicalize(states: &mut ExceptionStateSet) {
    states.sort_unstable();
    states.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::Interner;

    fn false_path(id: u32, from: Option<ExceptionPoint>, thrus: Vec<ExceptionPoint>, to: Option<ExceptionPoint>) -> ExceptionPath {
        ExceptionPath {
            id: ExceptionId::from_raw(id),
            kind: ExceptionKind::FalsePath,
            from,
            thrus,
            to,
        }
    }

    #[test]
    fn stage_count_includes_to() {
        let interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let exc = false_path(
            0,
            None,
            vec![ExceptionPoint::pins(vec![a])],
            Some(ExceptionPoint::pins(vec![b])),
        );
        assert_eq!(exc.stage_count(), 2);
        assert_eq!(exc.stage(0).pins, vec![a]);
        assert_eq!(exc.stage(1).pins, vec![b]);
    }

    #[test]
    fn state_advances_to_completion() {
        let interner = Interner::new();
        let thru = interner.intern("mid");
        let exc = false_path(0, None, vec![ExceptionPoint::pins(vec![thru])], None);
        let state = ExceptionState::start(exc.id);
        assert!(!state.is_complete(&exc));
        assert!(state.next().is_complete(&exc));
    }

    #[test]
    fn matches_next_thru_on_entry() {
        let interner = Interner::new();
        let src = interner.intern("src");
        let thru = interner.intern("mid");
        let exc = false_path(0, None, vec![ExceptionPoint::pins(vec![thru])], None);
        let state = ExceptionState::start(exc.id);
        assert!(exc.matches_next_thru(state, src, thru, RiseFall::Rise, MinMax::Max));
        assert!(!exc.matches_next_thru(state, thru, src, RiseFall::Rise, MinMax::Max));
    }

    #[test]
    fn edge_points_match_exact_edges() {
        let interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let point = ExceptionPoint::edges(vec![(a, b)]);
        assert!(point.matches_edge(a, b, RiseFall::Fall));
        assert!(!point.matches_edge(b, a, RiseFall::Fall));
    }

    #[test]
    fn transition_restriction() {
        let interner = Interner::new();
        let pin = interner.intern("p");
        let mut point = ExceptionPoint::pins(vec![pin]);
        point.rf = Some(RiseFall::Rise);
        assert!(point.matches_pin(pin, RiseFall::Rise));
        assert!(!point.matches_pin(pin, RiseFall::Fall));
    }

    #[test]
    fn path_delay_applies_to_its_direction() {
        let exc = ExceptionPath {
            id: ExceptionId::from_raw(1),
            kind: ExceptionKind::PathDelay {
                min_max: MinMax::Max,
                delay: Delay::new(5.0),
            },
            from: None,
            thrus: Vec::new(),
            to: None,
        };
        assert!(exc.applies_to(MinMax::Max));
        assert!(!exc.applies_to(MinMax::Min));
    }

    #[test]
    fn canonical_sets_are_sorted_and_deduped() {
        let a = ExceptionState {
            exception: ExceptionId::from_raw(2),
            position: 0,
        };
        let b = ExceptionState {
            exception: ExceptionId::from_raw(1),
            position: 1,
        };
        let mut set = vec![a, b, a];
        canonicalize(&mut set);
        assert_eq!(set, vec![b, a]);
    }
}

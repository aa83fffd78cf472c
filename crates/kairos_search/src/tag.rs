//! Hash-consed path tags.

use crate::clk_info::ClkInfoId;
use crate::corner::PathApIndex;
use kairos_common::RiseFall;
use kairos_sdc::{ExceptionStateSet, InputDelayId};

/// Opaque, copyable ID for an interned [`Tag`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct TagId(u32);

impl TagId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// The composite label identifying one kind of path arriving at a vertex.
///
/// Tags are hash-consed; tag identity (the interned index) is the sole key
/// in tag-group arrival maps. The exception-state set is canonical (sorted,
/// deduplicated), so structural equality is representation equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    /// The arriving transition.
    pub rf: RiseFall,
    /// The analysis point this path is analyzed under.
    pub path_ap: PathApIndex,
    /// The clock state of this path.
    pub clk_info: ClkInfoId,
    /// The path is still inside a clock network.
    pub is_clk: bool,
    /// The input delay this path was seeded from, if any.
    pub input_delay: Option<InputDelayId>,
    /// The path originates at an internal segment start.
    pub is_segment_start: bool,
    /// Current position in every active path exception.
    pub states: ExceptionStateSet,
    /// Some state belongs to a user-installed filter exception.
    pub is_filter: bool,
    /// Some state belongs to a loop exception.
    pub is_loop: bool,
}

impl Tag {
    /// Returns `true` if this tag carries any exception state.
    pub fn has_states(&self) -> bool {
        !self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_sdc::{ExceptionId, ExceptionState};

    fn tag(rf: RiseFall, ap: PathApIndex) -> Tag {
        Tag {
            rf,
            path_ap: ap,
            clk_info: ClkInfoId::from_raw(0),
            is_clk: false,
            input_delay: None,
            is_segment_start: false,
            states: Vec::new(),
            is_filter: false,
            is_loop: false,
        }
    }

    #[test]
    fn structural_equality() {
        assert_eq!(tag(RiseFall::Rise, 0), tag(RiseFall::Rise, 0));
        assert_ne!(tag(RiseFall::Rise, 0), tag(RiseFall::Fall, 0));
        assert_ne!(tag(RiseFall::Rise, 0), tag(RiseFall::Rise, 1));
    }

    #[test]
    fn states_distinguish_tags() {
        let mut a = tag(RiseFall::Rise, 0);
        let b = tag(RiseFall::Rise, 0);
        a.states.push(ExceptionState::start(ExceptionId::from_raw(0)));
        assert_ne!(a, b);
        assert!(a.has_states());
        assert!(!b.has_states());
    }
}

//! Interned tag groups and the per-visit builder.

use crate::path::PathVertexRep;
use crate::tag::{Tag, TagId};
use indexmap::IndexMap;
use kairos_common::{Delay, MinMax};

/// Opaque, copyable ID for an interned [`TagGroup`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct TagGroupId(u32);

impl TagGroupId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// The interned description of one vertex's tag set.
///
/// Tags are stored sorted by identity, and a tag's position is its arrival
/// index: every vertex sharing this group lays its arrival array out the
/// same way. Summary flags answer the common "does this vertex have any
/// clock/filter/loop path" queries without touching the tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagGroup {
    tags: Vec<TagId>,
    /// Some member tag is a clock-network path.
    pub has_clk_tag: bool,
    /// Some member tag is a generated-clock source path.
    pub has_gen_clk_src_tag: bool,
    /// Some member tag carries filter state.
    pub has_filter_tag: bool,
    /// Some member tag carries loop state.
    pub has_loop_tag: bool,
}

impl TagGroup {
    /// Number of arrivals a vertex with this group stores.
    pub fn arrival_count(&self) -> usize {
        self.tags.len()
    }

    /// The member tags in arrival-index order.
    pub fn tags(&self) -> &[TagId] {
        &self.tags
    }

    /// The arrival index of `tag`, if it is a member.
    pub fn index_of(&self, tag: TagId) -> Option<usize> {
        self.tags.binary_search(&tag).ok()
    }

    /// Returns `true` if `tag` is a member.
    pub fn has_tag(&self, tag: TagId) -> bool {
        self.index_of(tag).is_some()
    }
}

/// Per-vertex scratch accumulating the best arrival per tag during one
/// visit. Created fresh (or reinitialized) per visit; committed through the
/// tag-group intern table.
#[derive(Debug, Default)]
pub struct TagGroupBldr {
    entries: IndexMap<TagId, usize>,
    arrivals: Vec<Delay>,
    prev_paths: Vec<Option<PathVertexRep>>,
    has_clk_tag: bool,
    has_gen_clk_src_tag: bool,
    has_filter_tag: bool,
    has_loop_tag: bool,
}

impl TagGroupBldr {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all accumulated state so the builder can be reused.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.arrivals.clear();
        self.prev_paths.clear();
        self.has_clk_tag = false;
        self.has_gen_clk_src_tag = false;
        self.has_filter_tag = false;
        self.has_loop_tag = false;
    }

    /// Returns `true` if no arrivals have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct tags recorded.
    pub fn arrival_count(&self) -> usize {
        self.entries.len()
    }

    /// Summary flag: some recorded tag is a clock path.
    pub fn has_clk_tag(&self) -> bool {
        self.has_clk_tag
    }

    /// Summary flag: some recorded tag is a generated-clock source path.
    pub fn has_gen_clk_src_tag(&self) -> bool {
        self.has_gen_clk_src_tag
    }

    /// Summary flag: some recorded tag carries filter state.
    pub fn has_filter_tag(&self) -> bool {
        self.has_filter_tag
    }

    /// Summary flag: some recorded tag carries loop state.
    pub fn has_loop_tag(&self) -> bool {
        self.has_loop_tag
    }

    /// The arrival recorded for `tag`, with its slot index.
    pub fn tag_arrival(&self, tag: TagId) -> Option<(Delay, usize)> {
        self.entries
            .get(&tag)
            .map(|&index| (self.arrivals[index], index))
    }

    /// Locates the slot already recorded for `tag` identity: the matched
    /// tag (or `None`), the recorded arrival, and the slot index.
    pub fn tag_match_arrival(&self, tag: TagId) -> (Option<TagId>, Delay, usize) {
        match self.entries.get(&tag) {
            Some(&index) => (Some(tag), self.arrivals[index], index),
            None => (None, Delay::ZERO, usize::MAX),
        }
    }

    fn note_tag_flags(&mut self, tag: &Tag, clk_info_is_gen_src: bool) {
        self.has_clk_tag |= tag.is_clk;
        self.has_gen_clk_src_tag |= clk_info_is_gen_src;
        self.has_filter_tag |= tag.is_filter;
        self.has_loop_tag |= tag.is_loop;
    }

    /// Records `arrival` for `tag`, overwriting any existing slot.
    pub fn set_arrival(
        &mut self,
        tag_id: TagId,
        tag: &Tag,
        clk_info_is_gen_src: bool,
        arrival: Delay,
        prev_path: Option<PathVertexRep>,
    ) {
        self.note_tag_flags(tag, clk_info_is_gen_src);
        match self.entries.get(&tag_id) {
            Some(&index) => {
                self.arrivals[index] = arrival;
                self.prev_paths[index] = prev_path;
            }
            None => {
                let index = self.arrivals.len();
                self.entries.insert(tag_id, index);
                self.arrivals.push(arrival);
                self.prev_paths.push(prev_path);
            }
        }
    }

    /// Commits a dominance-checked arrival: updates the matched slot or
    /// appends a new one. `matched` is the result of
    /// [`tag_match_arrival`](Self::tag_match_arrival).
    pub fn set_match_arrival(
        &mut self,
        tag_id: TagId,
        tag: &Tag,
        clk_info_is_gen_src: bool,
        matched: Option<TagId>,
        arrival: Delay,
        index: usize,
        prev_path: Option<PathVertexRep>,
    ) {
        if matched.is_some() {
            self.arrivals[index] = arrival;
            self.prev_paths[index] = prev_path;
            self.note_tag_flags(tag, clk_info_is_gen_src);
        } else {
            self.set_arrival(tag_id, tag, clk_info_is_gen_src, arrival, prev_path);
        }
    }

    /// Removes the slot recorded for `tag`. Used by CRPR pruning.
    pub fn delete_arrival(&mut self, tag: TagId) {
        if let Some(index) = self.entries.shift_remove(&tag) {
            self.arrivals.remove(index);
            self.prev_paths.remove(index);
            for slot in self.entries.values_mut() {
                if *slot > index {
                    *slot -= 1;
                }
            }
        }
    }

    /// Iterates the recorded (tag, arrival, slot index) triples in
    /// insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, Delay, usize)> + '_ {
        self.entries
            .iter()
            .map(|(&tag, &index)| (tag, self.arrivals[index], index))
    }

    /// Keeps the dominant of the recorded and proposed arrival for every
    /// slot; returns `true` if the proposal won.
    pub fn proposal_dominates(&self, arrival: Delay, index: usize, min_max: MinMax) -> bool {
        index == usize::MAX || arrival.dominates(self.arrivals[index], min_max)
    }

    /// Builds the interned-group value for the current tag set.
    pub fn make_tag_group(&self) -> TagGroup {
        let mut tags: Vec<TagId> = self.entries.keys().copied().collect();
        tags.sort_unstable();
        TagGroup {
            tags,
            has_clk_tag: self.has_clk_tag,
            has_gen_clk_src_tag: self.has_gen_clk_src_tag,
            has_filter_tag: self.has_filter_tag,
            has_loop_tag: self.has_loop_tag,
        }
    }

    /// Materializes the final arrival array (and prev-path array when
    /// requested) in the ordering defined by `group`.
    pub fn copy_arrivals(
        &self,
        group: &TagGroup,
        out_arrivals: &mut Vec<Delay>,
        out_prev_paths: Option<&mut Vec<Option<PathVertexRep>>>,
    ) {
        out_arrivals.clear();
        out_arrivals.reserve(group.arrival_count());
        let mut prevs = out_prev_paths;
        if let Some(prevs) = prevs.as_deref_mut() {
            prevs.clear();
            prevs.reserve(group.arrival_count());
        }
        for &tag in group.tags() {
            let index = *self
                .entries
                .get(&tag)
                .expect("group tag recorded in builder");
            out_arrivals.push(self.arrivals[index]);
            if let Some(prevs) = prevs.as_deref_mut() {
                prevs.push(self.prev_paths[index]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clk_info::ClkInfoId;
    use kairos_common::RiseFall;

    fn tag(is_clk: bool) -> Tag {
        Tag {
            rf: RiseFall::Rise,
            path_ap: 0,
            clk_info: ClkInfoId::from_raw(0),
            is_clk,
            input_delay: None,
            is_segment_start: false,
            states: Vec::new(),
            is_filter: false,
            is_loop: false,
        }
    }

    #[test]
    fn set_and_match_arrival() {
        let mut bldr = TagGroupBldr::new();
        let t0 = TagId::from_raw(0);
        bldr.set_arrival(t0, &tag(false), false, Delay::new(2.0), None);
        let (matched, arrival, index) = bldr.tag_match_arrival(t0);
        assert_eq!(matched, Some(t0));
        assert_eq!(arrival, Delay::new(2.0));
        assert_eq!(index, 0);
        let (matched, _, _) = bldr.tag_match_arrival(TagId::from_raw(9));
        assert!(matched.is_none());
    }

    #[test]
    fn match_update_keeps_slot() {
        let mut bldr = TagGroupBldr::new();
        let t0 = TagId::from_raw(0);
        bldr.set_arrival(t0, &tag(false), false, Delay::new(2.0), None);
        let (matched, _, index) = bldr.tag_match_arrival(t0);
        bldr.set_match_arrival(t0, &tag(false), false, matched, Delay::new(3.0), index, None);
        assert_eq!(bldr.arrival_count(), 1);
        assert_eq!(bldr.tag_arrival(t0), Some((Delay::new(3.0), 0)));
    }

    #[test]
    fn flags_accumulate() {
        let mut bldr = TagGroupBldr::new();
        assert!(!bldr.has_clk_tag());
        bldr.set_arrival(TagId::from_raw(0), &tag(true), false, Delay::ZERO, None);
        assert!(bldr.has_clk_tag());
        bldr.set_arrival(TagId::from_raw(1), &tag(false), true, Delay::ZERO, None);
        assert!(bldr.has_gen_clk_src_tag());
    }

    #[test]
    fn delete_arrival_compacts_slots() {
        let mut bldr = TagGroupBldr::new();
        let t0 = TagId::from_raw(0);
        let t1 = TagId::from_raw(1);
        let t2 = TagId::from_raw(2);
        bldr.set_arrival(t0, &tag(false), false, Delay::new(1.0), None);
        bldr.set_arrival(t1, &tag(false), false, Delay::new(2.0), None);
        bldr.set_arrival(t2, &tag(false), false, Delay::new(3.0), None);
        bldr.delete_arrival(t1);
        assert_eq!(bldr.arrival_count(), 2);
        assert_eq!(bldr.tag_arrival(t0), Some((Delay::new(1.0), 0)));
        assert_eq!(bldr.tag_arrival(t2), Some((Delay::new(3.0), 1)));
    }

    #[test]
    fn group_orders_by_tag_identity() {
        let mut bldr = TagGroupBldr::new();
        let t5 = TagId::from_raw(5);
        let t1 = TagId::from_raw(1);
        bldr.set_arrival(t5, &tag(false), false, Delay::new(5.0), None);
        bldr.set_arrival(t1, &tag(false), false, Delay::new(1.0), None);
        let group = bldr.make_tag_group();
        assert_eq!(group.tags(), &[t1, t5]);
        assert_eq!(group.index_of(t5), Some(1));
        assert!(group.has_tag(t1));
        assert!(!group.has_tag(TagId::from_raw(7)));

        let mut arrivals = Vec::new();
        bldr.copy_arrivals(&group, &mut arrivals, None);
        assert_eq!(arrivals, vec![Delay::new(1.0), Delay::new(5.0)]);
    }

    #[test]
    fn identical_tag_sets_make_equal_groups() {
        let mut a = TagGroupBldr::new();
        let mut b = TagGroupBldr::new();
        for &id in &[3u32, 1] {
            a.set_arrival(TagId::from_raw(id), &tag(false), false, Delay::ZERO, None);
        }
        for &id in &[1u32, 3] {
            b.set_arrival(TagId::from_raw(id), &tag(false), false, Delay::new(4.0), None);
        }
        assert_eq!(a.make_tag_group(), b.make_tag_group());
    }

    #[test]
    fn proposal_dominance() {
        let mut bldr = TagGroupBldr::new();
        let t0 = TagId::from_raw(0);
        bldr.set_arrival(t0, &tag(false), false, Delay::new(2.0), None);
        assert!(bldr.proposal_dominates(Delay::new(3.0), 0, MinMax::Max));
        assert!(!bldr.proposal_dominates(Delay::new(1.0), 0, MinMax::Max));
        assert!(bldr.proposal_dominates(Delay::new(1.0), 0, MinMax::Min));
        // Missing slots are always dominated.
        assert!(bldr.proposal_dominates(Delay::new(-1.0), usize::MAX, MinMax::Max));
    }
}

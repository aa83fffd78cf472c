//! Per-vertex path storage and path references.

use crate::tag::TagId;
use crate::tag_group::TagGroupId;
use kairos_common::Delay;
use kairos_graph::VertexId;
use serde::{Deserialize, Serialize};

/// Compact back-link to a path at another vertex: the vertex plus the
/// arrival index within its tag group. Stored in prev-path arrays on clock
/// and generated-clock source vertices for backtracking to the launching
/// clock path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PathVertexRep {
    /// The vertex the referenced path lives on.
    pub vertex: VertexId,
    /// The arrival index within that vertex's tag group.
    pub arrival_index: u32,
}

/// A reference to one path: a (vertex, tag, arrival index) triple.
///
/// The arrival value and the prev-path link are resolved through the
/// search's per-vertex storage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PathRef {
    /// The vertex the path arrives at.
    pub vertex: VertexId,
    /// The path's tag.
    pub tag: TagId,
    /// The arrival index within the vertex's tag group.
    pub arrival_index: u32,
}

impl PathRef {
    /// The compact representation of this path.
    pub fn rep(&self) -> PathVertexRep {
        PathVertexRep {
            vertex: self.vertex,
            arrival_index: self.arrival_index,
        }
    }
}

/// The search-owned state of one vertex: its tag group, the arrival array
/// parallel to the group's tag order, the optional prev-path array (clock
/// and generated-clock vertices only), and the optional required array.
///
/// A vertex with no tag group has no paths. The arrays are replaced
/// atomically when a visit commits; readers at other levels take the slot's
/// read lock.
#[derive(Debug, Clone, Default)]
pub struct VertexPaths {
    /// The interned tag group, or `None` before any arrival is committed.
    pub tag_group: Option<TagGroupId>,
    /// Arrival per tag, indexed per the tag group's tag order.
    pub arrivals: Vec<Delay>,
    /// Prev-path link per arrival, present on clock-network vertices.
    pub prev_paths: Option<Vec<Option<PathVertexRep>>>,
    /// Required time per arrival, present after required propagation.
    pub requireds: Option<Vec<Delay>>,
}

impl VertexPaths {
    /// Returns `true` if the vertex carries no paths.
    pub fn is_empty(&self) -> bool {
        self.tag_group.is_none()
    }

    /// Returns `true` if required times have been stored.
    pub fn has_requireds(&self) -> bool {
        self.requireds.is_some()
    }

    /// Drops all stored state.
    pub fn clear(&mut self) {
        self.tag_group = None;
        self.arrivals.clear();
        self.prev_paths = None;
        self.requireds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vertex_paths() {
        let paths = VertexPaths::default();
        assert!(paths.is_empty());
        assert!(!paths.has_requireds());
    }

    #[test]
    fn clear_resets_everything() {
        let mut paths = VertexPaths {
            tag_group: Some(TagGroupId::from_raw(3)),
            arrivals: vec![Delay::new(1.0)],
            prev_paths: Some(vec![Some(PathVertexRep {
                vertex: VertexId::from_raw(0),
                arrival_index: 0,
            })]),
            requireds: Some(vec![Delay::new(9.0)]),
        };
        assert!(paths.has_requireds());
        paths.clear();
        assert!(paths.is_empty());
        assert!(paths.arrivals.is_empty());
        assert!(paths.prev_paths.is_none());
        assert!(paths.requireds.is_none());
    }

    #[test]
    fn path_ref_rep() {
        let path = PathRef {
            vertex: VertexId::from_raw(7),
            tag: TagId::from_raw(2),
            arrival_index: 1,
        };
        let rep = path.rep();
        assert_eq!(rep.vertex, VertexId::from_raw(7));
        assert_eq!(rep.arrival_index, 1);
    }
}

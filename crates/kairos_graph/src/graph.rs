//! The timing graph: vertices, edges, and adjacency.

use crate::arc::TimingArcSet;
use crate::ids::{EdgeId, VertexId};
use crate::role::TimingRole;
use kairos_common::Ident;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A vertex in the timing graph, uniquely associated with a netlist pin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// The unique ID of this vertex.
    pub id: VertexId,
    /// The pin this vertex times.
    pub pin: Ident,
    /// Topological rank; roots are level 0. Assigned by levelization.
    pub level: u32,
    /// The pin is a register or latch clock pin.
    pub is_reg_clk: bool,
    /// The pin is a latch data input.
    pub is_latch_data: bool,
    /// The pin carries a constant value and launches no paths.
    pub is_constant: bool,
    /// The vertex is the driver half of a bidirect pin.
    pub is_bidirect_driver: bool,
    /// The vertex has incoming timing-check edges. Maintained by
    /// [`TimingGraph::add_edge`].
    pub has_checks: bool,
    /// The vertex is the target of a boundary constraint (output delay,
    /// data check). Set while constraints are applied.
    pub is_constrained: bool,
    fanin: Vec<EdgeId>,
    fanout: Vec<EdgeId>,
}

/// A directed edge in the timing graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// The unique ID of this edge.
    pub id: EdgeId,
    /// Source vertex.
    pub from: VertexId,
    /// Destination vertex.
    pub to: VertexId,
    /// The semantic role of this edge.
    pub role: TimingRole,
    /// The timing arcs this edge carries.
    pub arc_set: TimingArcSet,
    /// The edge is disabled and never traversed.
    pub disabled: bool,
    /// The edge closes a combinational loop and is traversed only under
    /// dynamic loop breaking. Set by levelization.
    pub disabled_loop: bool,
    /// The hierarchical pin a wire edge passes through, if any. Consulted
    /// by hierarchical clock-disable records.
    pub hpin: Option<Ident>,
}

/// A levelized timing graph.
///
/// Vertices and edges are arena-allocated and addressed by dense ids.
/// Per-vertex fanin/fanout edge lists are kept in insertion order, which is
/// also graph-edge-id order; the search relies on that for deterministic
/// edge iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    pin_vertex: HashMap<Ident, VertexId>,
    bidirect_driver: HashMap<Ident, VertexId>,
    reg_clk_vertices: Vec<VertexId>,
    max_level: u32,
    roots: Vec<VertexId>,
}

impl TimingGraph {
    /// Creates an empty timing graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the load vertex for `pin` and returns its ID.
    pub fn add_vertex(&mut self, pin: Ident) -> VertexId {
        let id = VertexId::from_raw(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            id,
            pin,
            level: 0,
            is_reg_clk: false,
            is_latch_data: false,
            is_constant: false,
            is_bidirect_driver: false,
            has_checks: false,
            is_constrained: false,
            fanin: Vec::new(),
            fanout: Vec::new(),
        });
        self.pin_vertex.insert(pin, id);
        id
    }

    /// Adds the driver vertex for a bidirect `pin` and returns its ID.
    pub fn add_bidirect_driver_vertex(&mut self, pin: Ident) -> VertexId {
        let id = VertexId::from_raw(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            id,
            pin,
            level: 0,
            is_reg_clk: false,
            is_latch_data: false,
            is_constant: false,
            is_bidirect_driver: true,
            has_checks: false,
            is_constrained: false,
            fanin: Vec::new(),
            fanout: Vec::new(),
        });
        self.bidirect_driver.insert(pin, id);
        id
    }

    /// Adds a directed edge and returns its ID.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        role: TimingRole,
        arc_set: TimingArcSet,
    ) -> EdgeId {
        let id = EdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            from,
            to,
            role,
            arc_set,
            disabled: false,
            disabled_loop: false,
            hpin: None,
        });
        self.vertices[from.index()].fanout.push(id);
        self.vertices[to.index()].fanin.push(id);
        if role.is_timing_check() {
            self.vertices[to.index()].has_checks = true;
        }
        id
    }

    /// Returns the vertex with the given ID.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Returns a mutable reference to the vertex with the given ID.
    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Returns a mutable reference to the edge with the given ID.
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    /// Incoming edge IDs of `vertex`, in graph-edge-id order.
    pub fn fanin_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.vertices[vertex.index()].fanin
    }

    /// Outgoing edge IDs of `vertex`, in graph-edge-id order.
    pub fn fanout_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.vertices[vertex.index()].fanout
    }

    /// Returns `true` if `vertex` has exactly one incoming edge.
    pub fn has_fanin_one(&self, vertex: VertexId) -> bool {
        self.vertices[vertex.index()].fanin.len() == 1
    }

    /// The load vertex of `pin`, if the pin is in the graph.
    pub fn pin_vertex(&self, pin: Ident) -> Option<VertexId> {
        self.pin_vertex.get(&pin).copied()
    }

    /// The load vertex and optional bidirect driver vertex of `pin`.
    pub fn pin_vertices(&self, pin: Ident) -> (Option<VertexId>, Option<VertexId>) {
        (
            self.pin_vertex.get(&pin).copied(),
            self.bidirect_driver.get(&pin).copied(),
        )
    }

    /// Marks `vertex` as a register/latch clock pin.
    pub fn set_reg_clk(&mut self, vertex: VertexId) {
        let v = &mut self.vertices[vertex.index()];
        if !v.is_reg_clk {
            v.is_reg_clk = true;
            self.reg_clk_vertices.push(vertex);
        }
    }

    /// All register/latch clock pin vertices, in marking order.
    pub fn reg_clk_vertices(&self) -> &[VertexId] {
        &self.reg_clk_vertices
    }

    /// Total number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates all vertex IDs in arena order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len() as u32).map(VertexId::from_raw)
    }

    /// The maximum level assigned by levelization.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Root vertices (level 0 with no levelized fanin).
    pub fn roots(&self) -> &[VertexId] {
        &self.roots
    }

    /// Returns `true` if `vertex` is a root.
    pub fn is_root(&self, vertex: VertexId) -> bool {
        self.roots.contains(&vertex)
    }

    pub(crate) fn set_levelization(&mut self, max_level: u32, roots: Vec<VertexId>) {
        self.max_level = max_level;
        self.roots = roots;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::TimingArcSet;
    use kairos_common::Interner;

    fn pins(interner: &Interner, names: &[&str]) -> Vec<Ident> {
        names.iter().map(|n| interner.intern(n)).collect()
    }

    #[test]
    fn empty_graph() {
        let g = TimingGraph::new();
        assert_eq!(g.vertex_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.roots().is_empty());
    }

    #[test]
    fn add_vertices_and_edges() {
        let interner = Interner::new();
        let p = pins(&interner, &["a", "b"]);
        let mut g = TimingGraph::new();
        let a = g.add_vertex(p[0]);
        let b = g.add_vertex(p[1]);
        let e = g.add_edge(a, b, TimingRole::Wire, TimingArcSet::wire());
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge(e).from, a);
        assert_eq!(g.edge(e).to, b);
        assert_eq!(g.fanout_edges(a), &[e]);
        assert_eq!(g.fanin_edges(b), &[e]);
        assert_eq!(g.pin_vertex(p[0]), Some(a));
    }

    #[test]
    fn check_edges_set_has_checks() {
        let interner = Interner::new();
        let p = pins(&interner, &["clk", "d"]);
        let mut g = TimingGraph::new();
        let clk = g.add_vertex(p[0]);
        let d = g.add_vertex(p[1]);
        g.add_edge(
            clk,
            d,
            TimingRole::SetupCheck,
            TimingArcSet::check(kairos_common::RiseFall::Rise),
        );
        assert!(g.vertex(d).has_checks);
        assert!(!g.vertex(clk).has_checks);
    }

    #[test]
    fn bidirect_driver_vertices() {
        let interner = Interner::new();
        let pin = interner.intern("pad");
        let mut g = TimingGraph::new();
        let load = g.add_vertex(pin);
        let drvr = g.add_bidirect_driver_vertex(pin);
        assert!(g.vertex(drvr).is_bidirect_driver);
        assert_eq!(g.pin_vertices(pin), (Some(load), Some(drvr)));
    }

    #[test]
    fn reg_clk_marking_is_idempotent() {
        let interner = Interner::new();
        let pin = interner.intern("ff/CLK");
        let mut g = TimingGraph::new();
        let v = g.add_vertex(pin);
        g.set_reg_clk(v);
        g.set_reg_clk(v);
        assert_eq!(g.reg_clk_vertices(), &[v]);
        assert!(g.vertex(v).is_reg_clk);
    }

    #[test]
    fn fanin_order_follows_edge_ids() {
        let interner = Interner::new();
        let p = pins(&interner, &["a", "b", "c"]);
        let mut g = TimingGraph::new();
        let a = g.add_vertex(p[0]);
        let b = g.add_vertex(p[1]);
        let c = g.add_vertex(p[2]);
        let e1 = g.add_edge(a, c, TimingRole::Wire, TimingArcSet::wire());
        let e2 = g.add_edge(b, c, TimingRole::Wire, TimingArcSet::wire());
        assert_eq!(g.fanin_edges(c), &[e1, e2]);
        assert!(!g.has_fanin_one(c));
        assert!(!g.has_fanin_one(b));
    }

    #[test]
    fn serde_roundtrip() {
        let interner = Interner::new();
        let p = pins(&interner, &["x", "y"]);
        let mut g = TimingGraph::new();
        let x = g.add_vertex(p[0]);
        let y = g.add_vertex(p[1]);
        g.add_edge(x, y, TimingRole::Combinational, TimingArcSet::wire());
        let json = serde_json::to_string(&g).unwrap();
        let back: TimingGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.vertex_count(), 2);
        assert_eq!(back.edge_count(), 1);
    }
}

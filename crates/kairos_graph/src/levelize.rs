//! Levelization: loop breaking and topological level assignment.
//!
//! Levelization traverses the graph over *levelizable* edges (enabled,
//! non-check, non-latch-D→Q edges), marks every back edge found during DFS
//! as a disabled loop edge, and then assigns each vertex the length of the
//! longest levelizable path from a root. Latch D→Q edges are excluded so a
//! latch's output level does not depend on its data level; the search
//! revisits latch outputs through its own fixpoint instead.

use crate::graph::TimingGraph;
use crate::ids::{EdgeId, VertexId};
use crate::role::TimingRole;
use serde::{Deserialize, Serialize};

/// The edges of one combinational loop discovered during levelization,
/// in traversal order, ending with the edge that closes the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPath {
    /// The edges of the loop; the last one is marked `disabled_loop`.
    pub edges: Vec<EdgeId>,
}

impl LoopPath {
    /// The edge that closes the loop.
    pub fn closing_edge(&self) -> EdgeId {
        *self.edges.last().expect("loop has at least one edge")
    }
}

fn levelizable(graph: &TimingGraph, edge: EdgeId) -> bool {
    let e = graph.edge(edge);
    !e.disabled && !e.role.is_timing_check() && e.role != TimingRole::LatchDToQ
}

/// Breaks combinational loops and assigns levels.
///
/// Returns the loops found; their closing edges have been marked
/// `disabled_loop` on the graph. Levels and the root set are stored on the
/// graph. Calling this again re-levelizes from scratch (previously marked
/// loop edges stay marked).
pub fn levelize(graph: &mut TimingGraph) -> Vec<LoopPath> {
    let loops = break_loops(graph);
    assign_levels(graph);
    loops
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

fn break_loops(graph: &mut TimingGraph) -> Vec<LoopPath> {
    let n = graph.vertex_count();
    let mut color = vec![Color::White; n];
    let mut loops = Vec::new();
    // Edge path to the vertex currently being expanded, for loop recovery.
    let mut path_edges: Vec<EdgeId> = Vec::new();

    let vertex_ids: Vec<VertexId> = graph.vertex_ids().collect();
    for start in vertex_ids {
        if color[start.index()] != Color::White {
            continue;
        }
        // Iterative DFS; each frame is (vertex, next fanout position).
        let mut stack: Vec<(VertexId, usize)> = vec![(start, 0)];
        color[start.index()] = Color::Gray;
        while let Some(&(v, pos)) = stack.last() {
            let fanout = graph.fanout_edges(v);
            if pos >= fanout.len() {
                color[v.index()] = Color::Black;
                stack.pop();
                path_edges.pop();
                continue;
            }
            stack.last_mut().expect("frame present").1 += 1;
            let edge = fanout[pos];
            if !levelizable(graph, edge) || graph.edge(edge).disabled_loop {
                continue;
            }
            let to = graph.edge(edge).to;
            match color[to.index()] {
                Color::White => {
                    color[to.index()] = Color::Gray;
                    path_edges.push(edge);
                    stack.push((to, 0));
                }
                Color::Gray => {
                    // Back edge: `edge` closes a loop through `to`.
                    let mut edges: Vec<EdgeId> = Vec::new();
                    let mut seen_start = false;
                    for &pe in &path_edges {
                        if graph.edge(pe).from == to {
                            seen_start = true;
                        }
                        if seen_start {
                            edges.push(pe);
                        }
                    }
                    edges.push(edge);
                    graph.edge_mut(edge).disabled_loop = true;
                    loops.push(LoopPath { edges });
                }
                Color::Black => {}
            }
        }
    }
    loops
}

fn assign_levels(graph: &mut TimingGraph) {
    let n = graph.vertex_count();
    let mut indegree = vec![0u32; n];
    for v in graph.vertex_ids() {
        for &edge in graph.fanin_edges(v) {
            if levelizable(graph, edge) && !graph.edge(edge).disabled_loop {
                indegree[v.index()] += 1;
            }
        }
    }

    let mut roots = Vec::new();
    let mut queue: Vec<VertexId> = Vec::new();
    for v in graph.vertex_ids() {
        if indegree[v.index()] == 0 {
            roots.push(v);
            queue.push(v);
        }
    }

    let mut levels = vec![0u32; n];
    let mut max_level = 0;
    let mut head = 0;
    while head < queue.len() {
        let v = queue[head];
        head += 1;
        let v_level = levels[v.index()];
        max_level = max_level.max(v_level);
        for &edge in graph.fanout_edges(v) {
            if !levelizable(graph, edge) || graph.edge(edge).disabled_loop {
                continue;
            }
            let to = graph.edge(edge).to;
            levels[to.index()] = levels[to.index()].max(v_level + 1);
            indegree[to.index()] -= 1;
            if indegree[to.index()] == 0 {
                queue.push(to);
            }
        }
    }

    let vertex_ids: Vec<VertexId> = graph.vertex_ids().collect();
    for v in vertex_ids {
        graph.vertex_mut(v).level = levels[v.index()];
    }
    graph.set_levelization(max_level, roots);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::TimingArcSet;
    use kairos_common::Interner;

    fn wire_chain(graph: &mut TimingGraph, vertices: &[VertexId]) {
        for pair in vertices.windows(2) {
            graph.add_edge(pair[0], pair[1], TimingRole::Wire, TimingArcSet::wire());
        }
    }

    #[test]
    fn chain_levels() {
        let interner = Interner::new();
        let mut g = TimingGraph::new();
        let vs: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| g.add_vertex(interner.intern(n)))
            .collect();
        wire_chain(&mut g, &vs);
        let loops = levelize(&mut g);
        assert!(loops.is_empty());
        assert_eq!(g.vertex(vs[0]).level, 0);
        assert_eq!(g.vertex(vs[3]).level, 3);
        assert_eq!(g.max_level(), 3);
        assert_eq!(g.roots(), &[vs[0]]);
    }

    #[test]
    fn diamond_takes_longest_path() {
        let interner = Interner::new();
        let mut g = TimingGraph::new();
        let a = g.add_vertex(interner.intern("a"));
        let b = g.add_vertex(interner.intern("b"));
        let c = g.add_vertex(interner.intern("c"));
        let d = g.add_vertex(interner.intern("d"));
        g.add_edge(a, b, TimingRole::Wire, TimingArcSet::wire());
        g.add_edge(b, c, TimingRole::Wire, TimingArcSet::wire());
        g.add_edge(a, d, TimingRole::Wire, TimingArcSet::wire());
        g.add_edge(c, d, TimingRole::Wire, TimingArcSet::wire());
        levelize(&mut g);
        assert_eq!(g.vertex(d).level, 3);
    }

    #[test]
    fn loop_is_broken_and_recorded() {
        let interner = Interner::new();
        let mut g = TimingGraph::new();
        let a = g.add_vertex(interner.intern("a"));
        let b = g.add_vertex(interner.intern("b"));
        let c = g.add_vertex(interner.intern("c"));
        g.add_edge(a, b, TimingRole::Wire, TimingArcSet::wire());
        let e_bc = g.add_edge(b, c, TimingRole::Combinational, TimingArcSet::wire());
        let e_cb = g.add_edge(c, b, TimingRole::Combinational, TimingArcSet::wire());
        let loops = levelize(&mut g);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].closing_edge(), e_cb);
        assert_eq!(loops[0].edges, vec![e_bc, e_cb]);
        assert!(g.edge(e_cb).disabled_loop);
        // Levels are still well defined after the break.
        assert_eq!(g.vertex(b).level, 1);
        assert_eq!(g.vertex(c).level, 2);
    }

    #[test]
    fn latch_d_to_q_does_not_levelize() {
        let interner = Interner::new();
        let mut g = TimingGraph::new();
        let d = g.add_vertex(interner.intern("lat/D"));
        let q = g.add_vertex(interner.intern("lat/Q"));
        g.add_edge(d, q, TimingRole::LatchDToQ, TimingArcSet::wire());
        let loops = levelize(&mut g);
        assert!(loops.is_empty());
        // Both ends are roots; the D->Q edge imposes no ordering.
        assert_eq!(g.vertex(q).level, 0);
        assert_eq!(g.roots().len(), 2);
    }

    #[test]
    fn check_edges_do_not_levelize() {
        let interner = Interner::new();
        let mut g = TimingGraph::new();
        let clk = g.add_vertex(interner.intern("ff/CLK"));
        let data = g.add_vertex(interner.intern("ff/D"));
        g.add_edge(
            clk,
            data,
            TimingRole::SetupCheck,
            TimingArcSet::check(kairos_common::RiseFall::Rise),
        );
        levelize(&mut g);
        assert_eq!(g.vertex(data).level, 0);
        assert_eq!(g.roots().len(), 2);
    }

    #[test]
    fn relevelize_after_edit() {
        let interner = Interner::new();
        let mut g = TimingGraph::new();
        let a = g.add_vertex(interner.intern("a"));
        let b = g.add_vertex(interner.intern("b"));
        g.add_edge(a, b, TimingRole::Wire, TimingArcSet::wire());
        levelize(&mut g);
        assert_eq!(g.max_level(), 1);
        let c = g.add_vertex(interner.intern("c"));
        g.add_edge(b, c, TimingRole::Wire, TimingArcSet::wire());
        levelize(&mut g);
        assert_eq!(g.max_level(), 2);
        assert_eq!(g.vertex(c).level, 2);
    }
}

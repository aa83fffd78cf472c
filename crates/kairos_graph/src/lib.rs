//! Levelized timing graph for static timing analysis.
//!
//! The [`TimingGraph`] is a directed graph whose vertices correspond to
//! netlist pins and whose edges carry a [`TimingRole`] and a set of timing
//! arcs. Levelization assigns every vertex a topological rank after breaking
//! combinational loops; the search visits whole levels in parallel, so the
//! level assignment is what makes that safe.
//!
//! Delay values are *not* stored on edges; the search obtains them from an
//! external delay calculator keyed by edge and arc.

#![warn(missing_docs)]

pub mod arc;
pub mod graph;
pub mod ids;
pub mod levelize;
pub mod role;

pub use arc::{TimingArc, TimingArcSet, TimingSense};
pub use graph::{Edge, TimingGraph, Vertex};
pub use ids::{EdgeId, VertexId};
pub use levelize::{levelize, LoopPath};
pub use role::TimingRole;

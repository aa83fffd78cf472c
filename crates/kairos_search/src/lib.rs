//! Arrival/required propagation core for static timing analysis.
//!
//! Given a levelized [`kairos_graph::TimingGraph`], a
//! [`kairos_sdc::Sdc`] constraint store, and the collaborator interfaces
//! in [`api`], the [`Search`] engine computes every endpoint's worst-case
//! arrival times, required times, and slacks under all active clocks and
//! analysis points:
//!
//! - arrivals propagate forward in a parallel level sweep, each vertex
//!   carrying a *set* of paths distinguished by hash-consed [`Tag`]s;
//! - path exceptions advance per-tag state machines as edges are crossed;
//! - clock reconvergence pessimism removal prunes dominated arrivals;
//! - latches re-open upstream paths through an explicit fixpoint loop;
//! - required times propagate backward from endpoint constraints;
//! - slack aggregates (TNS/WNS) update incrementally as endpoints change.
//!
//! # Usage
//!
//! ```ignore
//! let mut search = Search::new(&graph, sdc, &network, &dcalc, &latches,
//!                              &path_ends, corners, &interner);
//! search.find_all_arrivals()?;
//! search.find_requireds(0)?;
//! let wns = search.worst_slack(MinMax::Max)?;
//! ```

#![warn(missing_docs)]

pub mod api;
mod arrival;
pub mod bfs;
pub mod clk_info;
pub mod corner;
mod crpr;
pub mod genclks;
pub mod intern;
pub mod path;
pub mod pred;
mod required;
pub mod search;
mod seed;
mod slack;
mod sweep;
pub mod tag;
pub mod tag_group;
mod transform;
mod visitor;

pub use api::{
    DelayCalculator, LatchAnalyzer, LatchState, Network, PathEnd, PathEndProvider, PortDirection,
};
pub use clk_info::{ClkInfo, ClkInfoId};
pub use corner::{Corner, Corners, PathAnalysisPt, PathApIndex};
pub use path::{PathRef, PathVertexRep, VertexPaths};
pub use pred::{ClkArrivalPred, EvalPred, SearchPred, SearchThru};
pub use search::{Search, TAG_GROUP_INDEX_MAX, TAG_INDEX_MAX};
pub use slack::TnsState;
pub use tag::{Tag, TagId};
pub use tag_group::{TagGroup, TagGroupBldr, TagGroupId};

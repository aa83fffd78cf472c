//! Clock reconvergence pessimism credit.
//!
//! When launch and capture clock paths share a common prefix, min/max
//! analysis double-counts the prefix's delay spread. The search stores the
//! register clock path a data path was launched through (the CRPR clock
//! path) and uses the maximum possible credit to prune arrivals that can
//! never win once credit is applied: an arrival kept *with* pessimism
//! credit pending must still beat its no-credit twin minus the maximum
//! credit, or it is dominated.

use crate::clk_info::ClkInfo;
use crate::search::Search;
use kairos_common::{Delay, MinMax};

impl<'a> Search<'a> {
    /// The maximum pessimism credit available to paths with this clock
    /// info: the min/max arrival spread at its CRPR clock-path vertex for
    /// the same clock edge and arriving transition. Zero when no common
    /// path is recorded.
    pub fn max_crpr(&self, clk_info: &ClkInfo) -> Delay {
        let Some(crpr_path) = clk_info.crpr_clk_path else {
            return Delay::ZERO;
        };
        // Identify the referenced clock path's edge and transition.
        let crpr_paths = self.vertex_path_refs(crpr_path.vertex);
        let Some(reference) = crpr_paths
            .iter()
            .find(|p| p.arrival_index == crpr_path.arrival_index)
        else {
            return Delay::ZERO;
        };
        let ref_tag = self.tag(reference.tag);
        let ref_edge = self.clk_info(ref_tag.clk_info).clk_edge;
        let ref_rf = ref_tag.rf;

        let mut min_arrival: Option<Delay> = None;
        let mut max_arrival: Option<Delay> = None;
        for path in &crpr_paths {
            let tag = self.tag(path.tag);
            if !tag.is_clk || tag.rf != ref_rf {
                continue;
            }
            if self.clk_info(tag.clk_info).clk_edge != ref_edge {
                continue;
            }
            let arrival = self.path_arrival(path);
            match self.corners.path_ap(tag.path_ap).min_max {
                MinMax::Min => {
                    min_arrival = Some(min_arrival.map_or(arrival, |a| a.min(arrival)));
                }
                MinMax::Max => {
                    max_arrival = Some(max_arrival.map_or(arrival, |a| a.max(arrival)));
                }
            }
        }
        match (min_arrival, max_arrival) {
            (Some(min), Some(max)) => (max - min).max(Delay::ZERO),
            _ => Delay::ZERO,
        }
    }
}

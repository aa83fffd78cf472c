//! Endpoint slack aggregation: total negative slack and worst slack.
//!
//! TNS is maintained incrementally: each endpoint's negative-slack
//! contribution is recorded so a changed endpoint can be subtracted and
//! re-added without rescanning. [`Search::tns_notify_before`] must run
//! before a vertex's arrivals or requireds are overwritten or deleted so
//! the old contribution can be withdrawn.

use crate::api::PathEnd;
use crate::search::Search;
use kairos_common::{Delay, InternalError, MinMax, StaResult};
use kairos_graph::VertexId;
use std::collections::HashMap;

/// Incremental total-negative-slack bookkeeping.
#[derive(Debug, Default)]
pub struct TnsState {
    tns: [Delay; MinMax::COUNT],
    slacks: [HashMap<VertexId, Delay>; MinMax::COUNT],
    exists: bool,
}

impl TnsState {
    /// Creates empty bookkeeping.
    pub fn new() -> Self {
        Self {
            tns: [Delay::ZERO; MinMax::COUNT],
            slacks: Default::default(),
            exists: false,
        }
    }

    /// Drops all state.
    pub fn clear(&mut self) {
        self.tns = [Delay::ZERO; MinMax::COUNT];
        for map in &mut self.slacks {
            map.clear();
        }
        self.exists = false;
    }

    /// Returns `true` once TNS has been computed.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub(crate) fn set_exists(&mut self) {
        self.exists = true;
    }

    /// The current TNS for a direction.
    pub fn total(&self, min_max: MinMax) -> Delay {
        self.tns[min_max.index()]
    }

    /// Adds an endpoint's contribution. Recording a vertex that already
    /// holds a contribution is corrupt state.
    pub(crate) fn incr(
        &mut self,
        vertex: VertexId,
        slack: Delay,
        min_max: MinMax,
    ) -> StaResult<()> {
        if slack.fuzzy_negative() {
            let index = min_max.index();
            self.tns[index] += slack;
            if self.slacks[index].insert(vertex, slack).is_some() {
                return Err(InternalError::new("tns incr existing vertex"));
            }
        }
        Ok(())
    }

    /// Withdraws an endpoint's contribution, if recorded.
    pub(crate) fn decr(&mut self, vertex: VertexId, min_max: MinMax) {
        let index = min_max.index();
        if let Some(slack) = self.slacks[index].remove(&vertex) {
            if slack.fuzzy_negative() {
                self.tns[index] -= slack;
            }
        }
    }
}

/// Lazily created worst-slack tracking per direction.
#[derive(Debug)]
pub(crate) struct WorstSlacks {
    slack: [Delay; MinMax::COUNT],
    vertex: [Option<VertexId>; MinMax::COUNT],
    rescan: [bool; MinMax::COUNT],
}

impl WorstSlacks {
    pub(crate) fn new() -> Self {
        Self {
            slack: [MinMax::Min.init_value(); MinMax::COUNT],
            vertex: [None; MinMax::COUNT],
            rescan: [true; MinMax::COUNT],
        }
    }

    pub(crate) fn update(&mut self, vertex: VertexId, slacks: &[Delay; MinMax::COUNT]) {
        for min_max in MinMax::BOTH {
            let index = min_max.index();
            let slack = slacks[index];
            if slack < self.slack[index] {
                self.slack[index] = slack;
                self.vertex[index] = Some(vertex);
            } else if self.vertex[index] == Some(vertex) && slack > self.slack[index] {
                // The recorded worst improved; only a rescan can find the
                // new worst.
                self.rescan[index] = true;
            }
        }
    }

    pub(crate) fn notify_before(&mut self, vertex: VertexId) {
        for index in 0..MinMax::COUNT {
            if self.vertex[index] == Some(vertex) {
                self.rescan[index] = true;
            }
        }
    }

    pub(crate) fn needs_rescan(&self, min_max: MinMax) -> bool {
        self.rescan[min_max.index()]
    }

    pub(crate) fn reset(&mut self, min_max: MinMax) {
        let index = min_max.index();
        self.slack[index] = MinMax::Min.init_value();
        self.vertex[index] = None;
        self.rescan[index] = false;
    }

    pub(crate) fn worst(&self, min_max: MinMax) -> (Delay, Option<VertexId>) {
        (self.slack[min_max.index()], self.vertex[min_max.index()])
    }
}

impl<'a> Search<'a> {
    /// Queues an endpoint whose slack bookkeeping is stale. Callable from
    /// sweep workers.
    pub(crate) fn tns_invalid(&self, vertex: VertexId) {
        let tracking = self.tns.lock().unwrap().exists()
            || self.worst_slacks.lock().unwrap().is_some();
        if tracking && self.is_endpoint(vertex) {
            self.invalid_tns.lock().unwrap().insert(vertex);
        }
    }

    /// Withdraws a vertex's slack contributions before its arrivals or
    /// requireds change.
    pub(crate) fn tns_notify_before(&self, vertex: VertexId) {
        let mut tns = self.tns.lock().unwrap();
        if tns.exists() && self.is_endpoint(vertex) {
            tns.decr(vertex, MinMax::Min);
            tns.decr(vertex, MinMax::Max);
        }
        drop(tns);
        if let Some(worst) = self.worst_slacks.lock().unwrap().as_mut() {
            worst.notify_before(vertex);
        }
    }

    /// The total negative slack for a direction, updating lazily.
    pub fn total_negative_slack(&mut self, min_max: MinMax) -> StaResult<Delay> {
        self.wns_tns_preamble()?;
        if self.tns.lock().unwrap().exists() {
            self.update_invalid_tns()?;
        } else {
            self.find_total_negative_slacks()?;
        }
        Ok(self.tns.lock().unwrap().total(min_max))
    }

    /// The worst endpoint slack for a direction and the vertex holding it.
    pub fn worst_slack(&mut self, min_max: MinMax) -> StaResult<(Delay, Option<VertexId>)> {
        self.wns_tns_preamble()?;
        if self.worst_slacks.lock().unwrap().is_none() {
            *self.worst_slacks.lock().unwrap() = Some(WorstSlacks::new());
        } else {
            self.update_invalid_tns()?;
        }
        let needs_rescan = self
            .worst_slacks
            .lock()
            .unwrap()
            .as_ref()
            .map_or(false, |w| w.needs_rescan(min_max));
        if needs_rescan {
            self.rescan_worst_slack(min_max)?;
        }
        Ok(self
            .worst_slacks
            .lock()
            .unwrap()
            .as_ref()
            .map(|w| w.worst(min_max))
            .unwrap_or((MinMax::Min.init_value(), None)))
    }

    /// Drops incremental worst-slack tracking until the next request.
    pub fn clear_worst_slack(&mut self) {
        *self.worst_slacks.lock().unwrap() = None;
    }

    fn rescan_worst_slack(&mut self, min_max: MinMax) -> StaResult<()> {
        let ends: Vec<VertexId> = self.endpoints().iter().copied().collect();
        let mut worst_guard = self.worst_slacks.lock().unwrap();
        let Some(worst) = worst_guard.as_mut() else {
            return Ok(());
        };
        worst.reset(min_max);
        drop(worst_guard);
        for vertex in ends {
            let slacks = self.wns_slacks(vertex);
            if let Some(worst) = self.worst_slacks.lock().unwrap().as_mut() {
                worst.update(vertex, &slacks);
            }
        }
        Ok(())
    }

    pub(crate) fn update_invalid_tns(&mut self) -> StaResult<()> {
        let stale: Vec<VertexId> = self.invalid_tns.lock().unwrap().drain().collect();
        for vertex in stale {
            // Graph edits can change endpoint-ness after the queueing.
            if self.is_endpoint(vertex) {
                let slacks = self.wns_slacks(vertex);
                let mut tns = self.tns.lock().unwrap();
                if tns.exists() {
                    tns.decr(vertex, MinMax::Min);
                    tns.incr(vertex, slacks[MinMax::Min.index()], MinMax::Min)?;
                    tns.decr(vertex, MinMax::Max);
                    tns.incr(vertex, slacks[MinMax::Max.index()], MinMax::Max)?;
                }
                drop(tns);
                if let Some(worst) = self.worst_slacks.lock().unwrap().as_mut() {
                    worst.update(vertex, &slacks);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn find_total_negative_slacks(&mut self) -> StaResult<()> {
        let ends: Vec<VertexId> = self.endpoints().iter().copied().collect();
        {
            let mut tns = self.tns.lock().unwrap();
            tns.clear();
        }
        for vertex in ends {
            let slacks = self.wns_slacks(vertex);
            let mut tns = self.tns.lock().unwrap();
            tns.incr(vertex, slacks[MinMax::Min.index()], MinMax::Min)?;
            tns.incr(vertex, slacks[MinMax::Max.index()], MinMax::Max)?;
        }
        self.tns.lock().unwrap().set_exists();
        Ok(())
    }

    /// The worst endpoint slack per direction at `vertex`.
    ///
    /// A vertex with fanout folds in downstream check slacks, so the
    /// path-end provider answers directly; a pure endpoint reads the
    /// stored arrival/required pairs, skipping filter-tagged paths.
    pub fn wns_slacks(&self, vertex: VertexId) -> [Delay; MinMax::COUNT] {
        let mut slacks = [MinMax::Min.init_value(); MinMax::COUNT];
        if self.has_searchable_fanout(vertex) {
            let mut update = |path_end: &PathEnd| {
                let index = path_end.min_max.index();
                if !path_end.is_unconstrained && path_end.slack < slacks[index] {
                    slacks[index] = path_end.slack;
                }
            };
            self.path_ends.visit_path_ends(self, vertex, &mut update);
        } else {
            for path in self.vertex_path_refs(vertex) {
                let tag = self.tag(path.tag);
                if tag.is_filter {
                    continue;
                }
                let Some(required) = self.vertex_required(vertex, path.tag) else {
                    continue;
                };
                let min_max = self.corners.path_ap(tag.path_ap).min_max;
                let arrival = self.path_arrival(&path);
                let slack = min_max.slack(arrival, required);
                let index = min_max.index();
                if slack < slacks[index] {
                    slacks[index] = slack;
                }
            }
        }
        slacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tns_accumulates_negative_slack_only() {
        let mut tns = TnsState::new();
        let v0 = VertexId::from_raw(0);
        let v1 = VertexId::from_raw(1);
        tns.incr(v0, Delay::new(-2.0), MinMax::Max).unwrap();
        tns.incr(v1, Delay::new(3.0), MinMax::Max).unwrap();
        assert_eq!(tns.total(MinMax::Max), Delay::new(-2.0));
        tns.decr(v0, MinMax::Max);
        assert_eq!(tns.total(MinMax::Max), Delay::ZERO);
    }

    #[test]
    fn tns_double_incr_is_fatal() {
        let mut tns = TnsState::new();
        let v0 = VertexId::from_raw(0);
        tns.incr(v0, Delay::new(-1.0), MinMax::Min).unwrap();
        let err = tns.incr(v0, Delay::new(-1.5), MinMax::Min).unwrap_err();
        assert!(err.message.contains("tns incr existing vertex"));
    }

    #[test]
    fn worst_slack_tracks_minimum() {
        let mut worst = WorstSlacks::new();
        let v0 = VertexId::from_raw(0);
        let v1 = VertexId::from_raw(1);
        let mut slacks = [Delay::new(5.0), Delay::new(2.0)];
        worst.update(v0, &slacks);
        slacks = [Delay::new(4.0), Delay::new(-1.0)];
        worst.update(v1, &slacks);
        assert_eq!(worst.worst(MinMax::Max), (Delay::new(-1.0), Some(v1)));
        assert_eq!(worst.worst(MinMax::Min), (Delay::new(4.0), Some(v1)));
    }

    #[test]
    fn worst_slack_improvement_requests_rescan() {
        let mut worst = WorstSlacks::new();
        worst.reset(MinMax::Max);
        let v0 = VertexId::from_raw(0);
        worst.update(v0, &[Delay::new(1.0), Delay::new(-3.0)]);
        assert!(!worst.needs_rescan(MinMax::Max));
        worst.update(v0, &[Delay::new(1.0), Delay::new(0.5)]);
        assert!(worst.needs_rescan(MinMax::Max));
    }
}

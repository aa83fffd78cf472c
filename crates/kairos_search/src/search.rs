//! The search engine value: state stores, commit logic, invalidation, and
//! result queries.
//!
//! [`Search`] owns everything the propagation computes — intern tables,
//! per-vertex path arrays, work queues, slack bookkeeping — and borrows its
//! collaborators (graph, network, delay calculator, latch analyzer,
//! path-end provider). There is no global state; every subsystem receives
//! the engine by reference.

use crate::api::{DelayCalculator, LatchAnalyzer, Network, PathEndProvider};
use crate::bfs::BfsIterator;
use crate::clk_info::{ClkInfo, ClkInfoId};
use crate::corner::{Corners, PathApIndex};
use crate::genclks::Genclks;
use crate::intern::InternTable;
use crate::path::{PathRef, VertexPaths};
use crate::slack::TnsState;
use crate::tag::{Tag, TagId};
use crate::tag_group::{TagGroup, TagGroupBldr, TagGroupId};
use kairos_common::{Delay, Ident, InternalError, Interner, MinMax, RiseFall, StaResult};
use kairos_graph::{EdgeId, TimingArc, TimingGraph, VertexId};
use kairos_sdc::{ClockId, DerateType, ExceptionId, PathClkOrData, Sdc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

/// Largest permitted tag index; exceeding it aborts the analysis.
pub const TAG_INDEX_MAX: u32 = 0x7fff_fffe;
/// Largest permitted tag-group index; exceeding it aborts the analysis.
pub const TAG_GROUP_INDEX_MAX: u32 = 0x7fff_fffe;

/// The arrival/required propagation engine.
///
/// Collaborators are borrowed for the engine's lifetime; computed state
/// (tags, arrivals, requireds, slack aggregates) is owned and survives
/// between queries until invalidated.
pub struct Search<'a> {
    pub(crate) graph: &'a TimingGraph,
    pub(crate) sdc: Sdc,
    pub(crate) network: &'a dyn Network,
    pub(crate) dcalc: &'a dyn DelayCalculator,
    pub(crate) latches: &'a dyn LatchAnalyzer,
    pub(crate) path_ends: &'a dyn PathEndProvider,
    pub(crate) interner: &'a Interner,
    pub(crate) corners: Corners,

    pub(crate) tags: InternTable<Tag>,
    pub(crate) clk_infos: InternTable<ClkInfo>,
    pub(crate) tag_groups: InternTable<TagGroup>,

    pub(crate) vertex_paths: Vec<RwLock<VertexPaths>>,
    pub(crate) arrival_iter: BfsIterator,
    pub(crate) required_iter: BfsIterator,

    pub(crate) invalid_arrivals: Mutex<HashSet<VertexId>>,
    pub(crate) invalid_requireds: Mutex<HashSet<VertexId>>,
    pub(crate) pending_latch_outputs: Mutex<HashSet<VertexId>>,

    pub(crate) endpoints: Option<HashSet<VertexId>>,
    pub(crate) invalid_endpoints: HashSet<VertexId>,

    pub(crate) tns: Mutex<TnsState>,
    pub(crate) worst_slacks: Mutex<Option<crate::slack::WorstSlacks>>,
    pub(crate) invalid_tns: Mutex<HashSet<VertexId>>,

    pub(crate) genclks: Genclks,
    pub(crate) filter: Option<ExceptionId>,

    fatal: Mutex<Option<InternalError>>,

    pub(crate) arrivals_exist: bool,
    pub(crate) arrivals_at_endpoints_exist: bool,
    pub(crate) arrivals_seeded: bool,
    pub(crate) requireds_exist: bool,
    pub(crate) requireds_seeded: bool,
    pub(crate) clk_arrivals_valid: bool,
    pub(crate) have_paths: bool,
    pub(crate) report_unconstrained_paths: bool,
    pub(crate) downstream_clk_pins: Option<Vec<bool>>,
}

impl<'a> Search<'a> {
    /// Creates an engine over the given collaborators. The graph must be
    /// levelized.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &'a TimingGraph,
        sdc: Sdc,
        network: &'a dyn Network,
        dcalc: &'a dyn DelayCalculator,
        latches: &'a dyn LatchAnalyzer,
        path_ends: &'a dyn PathEndProvider,
        corners: Corners,
        interner: &'a Interner,
    ) -> Self {
        let mut vertex_paths = Vec::with_capacity(graph.vertex_count());
        vertex_paths.resize_with(graph.vertex_count(), RwLock::default);
        let mut arrival_iter = BfsIterator::new();
        arrival_iter.ensure_size(graph);
        let mut required_iter = BfsIterator::new();
        required_iter.ensure_size(graph);
        Self {
            graph,
            sdc,
            network,
            dcalc,
            latches,
            path_ends,
            interner,
            corners,
            tags: InternTable::new("tag", TAG_INDEX_MAX),
            clk_infos: InternTable::new("clock info", u32::MAX),
            tag_groups: InternTable::new("tag group", TAG_GROUP_INDEX_MAX),
            vertex_paths,
            arrival_iter,
            required_iter,
            invalid_arrivals: Mutex::new(HashSet::new()),
            invalid_requireds: Mutex::new(HashSet::new()),
            pending_latch_outputs: Mutex::new(HashSet::new()),
            endpoints: None,
            invalid_endpoints: HashSet::new(),
            tns: Mutex::new(TnsState::new()),
            worst_slacks: Mutex::new(None),
            invalid_tns: Mutex::new(HashSet::new()),
            genclks: Genclks::new(),
            filter: None,
            fatal: Mutex::new(None),
            arrivals_exist: false,
            arrivals_at_endpoints_exist: false,
            arrivals_seeded: false,
            requireds_exist: false,
            requireds_seeded: false,
            clk_arrivals_valid: false,
            have_paths: false,
            report_unconstrained_paths: false,
            downstream_clk_pins: None,
        }
    }

    // ------------------------------------------------------------ accessors

    /// The timing graph under analysis.
    pub fn graph(&self) -> &TimingGraph {
        self.graph
    }

    /// The constraint store.
    pub fn sdc(&self) -> &Sdc {
        &self.sdc
    }

    /// Mutable access to the constraint store. The caller is responsible
    /// for invalidating affected results.
    pub fn sdc_mut(&mut self) -> &mut Sdc {
        &mut self.sdc
    }

    /// The analysis corners.
    pub fn corners(&self) -> &Corners {
        &self.corners
    }

    /// The name interner shared with the graph and constraints.
    pub fn interner(&self) -> &Interner {
        self.interner
    }

    /// Enables reporting of unconstrained paths, which widens seeding and
    /// endpoint classification. Changing the setting invalidates arrivals.
    pub fn set_report_unconstrained_paths(&mut self, report: bool) {
        if self.report_unconstrained_paths != report {
            self.arrivals_invalid();
        }
        self.report_unconstrained_paths = report;
    }

    // -------------------------------------------------------- intern tables

    /// Resolves a tag index.
    pub fn tag(&self, tag: TagId) -> Arc<Tag> {
        self.tags.get(tag.as_raw())
    }

    /// Resolves a clock-info index.
    pub fn clk_info(&self, clk_info: ClkInfoId) -> Arc<ClkInfo> {
        self.clk_infos.get(clk_info.as_raw())
    }

    /// Resolves a tag-group index.
    pub fn tag_group(&self, group: TagGroupId) -> Arc<TagGroup> {
        self.tag_groups.get(group.as_raw())
    }

    /// Number of live interned tags.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Number of live interned clock infos.
    pub fn clk_info_count(&self) -> usize {
        self.clk_infos.len()
    }

    /// Number of live interned tag groups.
    pub fn tag_group_count(&self) -> usize {
        self.tag_groups.len()
    }

    /// Interns (or finds) the tag with the given attributes. The filter
    /// and loop markers are derived from the state set.
    pub fn find_tag(
        &self,
        rf: RiseFall,
        path_ap: PathApIndex,
        clk_info: ClkInfoId,
        is_clk: bool,
        input_delay: Option<kairos_sdc::InputDelayId>,
        is_segment_start: bool,
        states: kairos_sdc::ExceptionStateSet,
    ) -> StaResult<TagId> {
        let mut is_filter = false;
        let mut is_loop = false;
        for state in &states {
            let exc = self.sdc.exception(state.exception);
            is_filter |= exc.is_filter();
            is_loop |= exc.is_loop();
        }
        let probe = Tag {
            rf,
            path_ap,
            clk_info,
            is_clk,
            input_delay,
            is_segment_start,
            states,
            is_filter,
            is_loop,
        };
        Ok(TagId::from_raw(self.tags.find_or_intern(&probe)?))
    }

    /// Interns (or finds) a clock-info record.
    pub fn find_clk_info(&self, probe: ClkInfo) -> StaResult<ClkInfoId> {
        Ok(ClkInfoId::from_raw(self.clk_infos.find_or_intern(&probe)?))
    }

    pub(crate) fn find_tag_group(&self, bldr: &TagGroupBldr) -> StaResult<TagGroupId> {
        let probe = bldr.make_tag_group();
        Ok(TagGroupId::from_raw(self.tag_groups.find_or_intern(&probe)?))
    }

    // ------------------------------------------------------- fatal handling

    /// Records a fatal error raised on a worker thread. The first error
    /// wins; the enclosing entry point reports it.
    pub(crate) fn latch_fatal(&self, err: InternalError) {
        let mut fatal = self.fatal.lock().unwrap();
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }

    /// Returns `true` if a fatal error has been latched.
    pub(crate) fn has_fatal(&self) -> bool {
        self.fatal.lock().unwrap().is_some()
    }

    pub(crate) fn take_fatal(&self) -> Option<InternalError> {
        self.fatal.lock().unwrap().take()
    }

    // ------------------------------------------------------ per-vertex state

    pub(crate) fn paths_read(&self, vertex: VertexId) -> RwLockReadGuard<'_, VertexPaths> {
        self.vertex_paths[vertex.index()].read().unwrap()
    }

    pub(crate) fn vertex_paths_write(
        &self,
        vertex: VertexId,
    ) -> std::sync::RwLockWriteGuard<'_, VertexPaths> {
        self.vertex_paths[vertex.index()].write().unwrap()
    }

    /// The committed required time at an arrival index, if present.
    pub(crate) fn vertex_required_at(&self, vertex: VertexId, index: usize) -> Option<Delay> {
        let paths = self.paths_read(vertex);
        paths.requireds.as_ref().map(|reqs| reqs[index])
    }

    /// The vertex's committed tag group, if any.
    pub fn vertex_tag_group(&self, vertex: VertexId) -> Option<TagGroupId> {
        self.paths_read(vertex).tag_group
    }

    /// A snapshot of the vertex's committed path state.
    pub fn vertex_paths_snapshot(&self, vertex: VertexId) -> VertexPaths {
        self.paths_read(vertex).clone()
    }

    /// The committed arrival for (vertex, tag), if present.
    pub fn vertex_arrival(&self, vertex: VertexId, tag: TagId) -> Option<Delay> {
        let paths = self.paths_read(vertex);
        let group = self.tag_group(paths.tag_group?);
        group.index_of(tag).map(|index| paths.arrivals[index])
    }

    /// The committed required time for (vertex, tag), if present.
    pub fn vertex_required(&self, vertex: VertexId, tag: TagId) -> Option<Delay> {
        let paths = self.paths_read(vertex);
        let group = self.tag_group(paths.tag_group?);
        let requireds = paths.requireds.as_ref()?;
        group.index_of(tag).map(|index| requireds[index])
    }

    /// Iterates the vertex's committed paths as [`PathRef`]s.
    pub fn vertex_path_refs(&self, vertex: VertexId) -> Vec<PathRef> {
        let paths = self.paths_read(vertex);
        let Some(group_id) = paths.tag_group else {
            return Vec::new();
        };
        let group = self.tag_group(group_id);
        group
            .tags()
            .iter()
            .enumerate()
            .map(|(index, &tag)| PathRef {
                vertex,
                tag,
                arrival_index: index as u32,
            })
            .collect()
    }

    /// The arrival of a path reference.
    pub fn path_arrival(&self, path: &PathRef) -> Delay {
        self.paths_read(path.vertex).arrivals[path.arrival_index as usize]
    }

    /// The prev-path link of a path reference, if stored.
    pub fn path_prev(&self, path: &PathRef) -> Option<PathRef> {
        let rep = {
            let paths = self.paths_read(path.vertex);
            let prevs = paths.prev_paths.as_ref()?;
            prevs[path.arrival_index as usize]?
        };
        let prev_paths = self.paths_read(rep.vertex);
        let group = self.tag_group(prev_paths.tag_group?);
        let tag = *group.tags().get(rep.arrival_index as usize)?;
        Some(PathRef {
            vertex: rep.vertex,
            tag,
            arrival_index: rep.arrival_index,
        })
    }

    /// Compares the builder against the vertex's committed arrivals within
    /// the analysis tolerance.
    pub(crate) fn arrivals_changed(&self, vertex: VertexId, bldr: &TagGroupBldr) -> bool {
        let paths = self.paths_read(vertex);
        let Some(group_id) = paths.tag_group else {
            return true;
        };
        let group = self.tag_group(group_id);
        if group.arrival_count() != bldr.arrival_count() {
            return true;
        }
        for (index, &tag) in group.tags().iter().enumerate() {
            match bldr.tag_arrival(tag) {
                Some((arrival, _)) => {
                    if !arrival.fuzzy_equal(paths.arrivals[index]) {
                        return true;
                    }
                }
                None => return true,
            }
        }
        false
    }

    /// Commits the builder's arrivals to the vertex: interns the tag
    /// group, materializes the arrival (and prev-path) arrays, and
    /// publishes them atomically. An empty builder deletes the vertex's
    /// paths instead.
    pub(crate) fn set_vertex_arrivals(
        &self,
        vertex: VertexId,
        bldr: &TagGroupBldr,
    ) -> StaResult<()> {
        if bldr.is_empty() {
            self.delete_vertex_paths(vertex);
            return Ok(());
        }
        let group_id = self.find_tag_group(bldr)?;
        let group = self.tag_group(group_id);
        let wants_prev = bldr.has_clk_tag() || bldr.has_gen_clk_src_tag();

        let mut arrivals = Vec::new();
        let mut prev_paths = if wants_prev { Some(Vec::new()) } else { None };
        bldr.copy_arrivals(&group, &mut arrivals, prev_paths.as_mut());

        let mut paths = self.vertex_paths[vertex.index()].write().unwrap();
        let group_changed = paths.tag_group != Some(group_id);
        paths.tag_group = Some(group_id);
        paths.arrivals = arrivals;
        paths.prev_paths = prev_paths;
        // Requireds are only reusable against an unchanged tag group.
        if group_changed && paths.requireds.take().is_some() {
            drop(paths);
            self.required_invalid(vertex);
        }
        Ok(())
    }

    pub(crate) fn delete_vertex_paths(&self, vertex: VertexId) {
        self.tns_notify_before(vertex);
        self.vertex_paths[vertex.index()].write().unwrap().clear();
    }

    // --------------------------------------------------------- invalidation

    /// Invalidates every computed result: paths, tags, tag groups, clock
    /// infos, generated-clock state, the filter, and all bookkeeping.
    pub fn arrivals_invalid(&mut self) {
        if self.arrivals_exist {
            log::debug!("arrivals invalid");
            for slot in &self.vertex_paths {
                slot.write().unwrap().clear();
            }
            self.have_paths = false;
            self.tags.clear();
            self.tag_groups.clear();
            self.clk_infos.clear();
            self.genclks.clear();
            self.delete_filter();
            self.arrivals_exist = false;
            self.arrivals_at_endpoints_exist = false;
            self.arrivals_seeded = false;
            self.requireds_exist = false;
            self.requireds_seeded = false;
            self.clk_arrivals_valid = false;
            self.arrival_iter.clear();
            self.required_iter.clear();
            self.invalid_arrivals.lock().unwrap().clear();
            self.invalid_requireds.lock().unwrap().clear();
            self.pending_latch_outputs.lock().unwrap().clear();
            self.tns.lock().unwrap().clear();
            *self.worst_slacks.lock().unwrap() = None;
            self.invalid_tns.lock().unwrap().clear();
            self.downstream_clk_pins = None;
        }
    }

    /// Invalidates all required times, leaving arrivals intact.
    pub fn requireds_invalid(&mut self) {
        log::debug!("requireds invalid");
        for slot in &self.vertex_paths {
            slot.write().unwrap().requireds = None;
        }
        self.requireds_exist = false;
        self.requireds_seeded = false;
        self.invalid_requireds.lock().unwrap().clear();
        self.tns.lock().unwrap().clear();
        *self.worst_slacks.lock().unwrap() = None;
        self.invalid_tns.lock().unwrap().clear();
    }

    /// Marks a vertex for arrival re-seeding on the next propagation.
    /// Callable from delay-calculation worker threads.
    pub fn arrival_invalid(&self, vertex: VertexId) {
        if self.arrivals_exist {
            if !self.arrival_iter.in_queue(vertex) {
                self.invalid_arrivals.lock().unwrap().insert(vertex);
            }
            self.tns_invalid(vertex);
        }
    }

    /// Invalidates a vertex and drops its stored paths. Used when an edit
    /// can reduce delays: committed arrivals merge into the next visit, so
    /// stale values must not survive it.
    pub fn arrival_invalid_delete(&self, vertex: VertexId) {
        self.arrival_invalid(vertex);
        self.vertex_paths[vertex.index()].write().unwrap().clear();
    }

    /// Marks the vertices of `pin` (load and bidirect driver) for arrival
    /// re-seeding.
    pub fn arrival_invalid_pin(&self, pin: Ident) {
        let (vertex, bidirect) = self.graph.pin_vertices(pin);
        if let Some(vertex) = vertex {
            self.arrival_invalid(vertex);
        }
        if let Some(vertex) = bidirect {
            self.arrival_invalid(vertex);
        }
    }

    /// Marks a vertex for required recomputation.
    pub fn required_invalid(&self, vertex: VertexId) {
        if self.requireds_exist {
            if !self.required_iter.in_queue(vertex) {
                self.invalid_requireds.lock().unwrap().insert(vertex);
            }
            self.tns_invalid(vertex);
        }
    }

    /// Marks the vertices of `pin` for required recomputation.
    pub fn required_invalid_pin(&self, pin: Ident) {
        let (vertex, bidirect) = self.graph.pin_vertices(pin);
        if let Some(vertex) = vertex {
            self.required_invalid(vertex);
        }
        if let Some(vertex) = bidirect {
            self.required_invalid(vertex);
        }
    }

    /// Marks every pin of an instance for required recomputation.
    pub fn required_invalid_instance(&self, instance: Ident) {
        for pin in self.network.instance_pins(instance) {
            self.required_invalid_pin(pin);
        }
    }

    /// Drops all memoized state for a vertex about to be removed from the
    /// graph.
    pub fn delete_vertex_before(&mut self, vertex: VertexId) {
        if self.arrivals_exist {
            self.delete_vertex_paths(vertex);
            self.arrival_iter.remove(vertex);
            self.invalid_arrivals.lock().unwrap().remove(&vertex);
        }
        if self.requireds_exist {
            self.required_iter.remove(vertex);
            self.invalid_requireds.lock().unwrap().remove(&vertex);
            self.invalid_tns.lock().unwrap().remove(&vertex);
        }
        if let Some(endpoints) = &mut self.endpoints {
            endpoints.remove(&vertex);
        }
        self.invalid_endpoints.remove(&vertex);
        self.pending_latch_outputs.lock().unwrap().remove(&vertex);
    }

    /// Removes a vertex from the queues before its level changes, then
    /// re-invalidates it.
    pub fn level_changed_before(&mut self, vertex: VertexId) {
        if self.arrivals_exist {
            self.arrival_iter.remove(vertex);
            self.required_iter.remove(vertex);
            self.arrival_invalid(vertex);
            self.required_invalid(vertex);
        }
    }

    /// Flags a vertex whose endpoint-ness may have changed.
    pub fn endpoint_invalid(&mut self, vertex: VertexId) {
        if self.endpoints.is_some() {
            self.invalid_endpoints.insert(vertex);
        }
    }

    // ------------------------------------------------------------- queries

    /// The clocks arriving at a vertex through clock-network paths.
    pub fn clocks(&self, vertex: VertexId) -> Vec<ClockId> {
        let mut clks = Vec::new();
        for path in self.vertex_path_refs(vertex) {
            let tag = self.tag(path.tag);
            if tag.is_clk {
                if let Some(clock) = self.clk_info(tag.clk_info).clock() {
                    if !clks.contains(&clock) {
                        clks.push(clock);
                    }
                }
            }
        }
        clks
    }

    /// Returns `true` if the vertex carries any clock-network path.
    pub fn is_clock(&self, vertex: VertexId) -> bool {
        self.vertex_tag_group(vertex)
            .map_or(false, |g| self.tag_group(g).has_clk_tag)
    }

    /// Returns `true` if the vertex carries any generated-clock source
    /// path.
    pub fn is_gen_clk_src(&self, vertex: VertexId) -> bool {
        self.vertex_tag_group(vertex)
            .map_or(false, |g| self.tag_group(g).has_gen_clk_src_tag)
    }

    /// The clock-source insertion delay for (clock, pin, transition) under
    /// `min_max`, falling back to the generated-clock pre-pass for
    /// generated clocks with propagated masters.
    pub fn clock_insertion(
        &self,
        clock: ClockId,
        pin: Option<Ident>,
        rf: RiseFall,
        min_max: MinMax,
        path_ap: PathApIndex,
    ) -> Delay {
        if let Some(insertion) = self.sdc.clock_insertion(clock, pin, min_max) {
            return insertion;
        }
        let clk = self.sdc.clock(clock);
        if clk.is_generated() {
            if let Some(pin) = pin {
                if let Some(insertion) = self.genclks.insertion_delay(clock, pin, rf, path_ap) {
                    return insertion;
                }
            }
        }
        Delay::ZERO
    }

    /// The arc delay scaled by the applicable derating factor.
    pub fn derated_delay(
        &self,
        _from_vertex: VertexId,
        arc: &TimingArc,
        edge: EdgeId,
        is_clk: bool,
        path_ap: PathApIndex,
    ) -> Delay {
        let ap = self.corners.path_ap(path_ap);
        let delay = self.dcalc.arc_delay(edge, arc, ap.dcalc_index());
        let clk_data = if is_clk {
            PathClkOrData::Clk
        } else {
            PathClkOrData::Data
        };
        let role = self.graph.edge(edge).role;
        let derate_type = if role.is_wire() {
            DerateType::NetDelay
        } else if role.is_timing_check() {
            DerateType::CellCheck
        } else {
            DerateType::CellDelay
        };
        let factor = self.sdc.derates.factor(derate_type, clk_data, ap.min_max);
        delay + Delay::new((factor - 1.0) * delay.as_ns())
    }

    /// The launching arrival of a clock path: ideal clocks at register
    /// clock pins reconstruct edge time + insertion + latency; propagated
    /// clocks use the stored arrival.
    pub fn clk_path_arrival(&self, clk_path: &PathRef) -> Delay {
        let tag = self.tag(clk_path.tag);
        let clk_info = self.clk_info(tag.clk_info);
        let vertex = self.graph.vertex(clk_path.vertex);
        if vertex.is_reg_clk && tag.is_clk && !clk_info.is_propagated {
            if let Some(clk_edge) = clk_info.clk_edge {
                let ap = tag.path_ap;
                let min_max = self.corners.path_ap(ap).min_max;
                return self.sdc.edge_time(clk_edge)
                    + self.clock_insertion(clk_edge.clock, clk_info.clk_src, clk_edge.rf, min_max, ap)
                    + clk_info.latency;
            }
        }
        self.path_arrival(clk_path)
    }

    /// Walks a data path's prev-path links back to the clock path that
    /// launched it and returns that clock path's arrival, or zero for
    /// unclocked paths.
    pub fn path_clk_path_arrival(&self, path: &PathRef) -> Delay {
        let mut current = *path;
        loop {
            let tag = self.tag(current.tag);
            if tag.is_clk {
                return self.clk_path_arrival(&current);
            }
            match self.path_prev(&current) {
                Some(prev) => current = prev,
                None => return Delay::ZERO,
            }
        }
    }

    // ----------------------------------------------------------- endpoints

    /// Returns `true` if a vertex terminates paths: it has constrained
    /// checks, is a gated-clock enable, is boundary-constrained, is an
    /// internal path-delay endpoint, has no searchable fanout, or is an
    /// unconstrained register clock while unconstrained reporting is on.
    pub fn is_endpoint(&self, vertex: VertexId) -> bool {
        let v = self.graph.vertex(vertex);
        let pin = v.pin;
        if !self.has_searchable_fanin(vertex) {
            return false;
        }
        (v.has_checks && self.has_enabled_checks(vertex))
            || (self.sdc.gated_clk_checks_enabled() && self.sdc.is_gated_clk_enable(pin))
            || v.is_constrained
            || self.sdc.is_path_delay_internal_endpoint(pin)
            || !self.has_searchable_fanout(vertex)
            || (self.report_unconstrained_paths && v.is_reg_clk)
    }

    pub(crate) fn has_enabled_checks(&self, vertex: VertexId) -> bool {
        self.graph.fanin_edges(vertex).iter().any(|&edge| {
            self.graph.edge(edge).role.is_timing_check()
                && self.path_ends.check_edge_enabled(self, edge)
        })
    }

    pub(crate) fn has_searchable_fanin(&self, vertex: VertexId) -> bool {
        self.graph.fanin_edges(vertex).iter().any(|&edge| {
            let e = self.graph.edge(edge);
            !e.disabled && !e.role.is_timing_check()
        })
    }

    pub(crate) fn has_searchable_fanout(&self, vertex: VertexId) -> bool {
        self.graph.fanout_edges(vertex).iter().any(|&edge| {
            let e = self.graph.edge(edge);
            !e.disabled && !e.role.is_timing_check()
        })
    }

    /// The endpoint set, built lazily and refreshed from the invalid set.
    pub fn endpoints(&mut self) -> &HashSet<VertexId> {
        if self.endpoints.is_none() {
            let mut endpoints = HashSet::new();
            for vertex in self.graph.vertex_ids() {
                if self.is_endpoint(vertex) {
                    endpoints.insert(vertex);
                }
            }
            self.endpoints = Some(endpoints);
            self.invalid_endpoints.clear();
        } else if !self.invalid_endpoints.is_empty() {
            let stale: Vec<VertexId> = self.invalid_endpoints.drain().collect();
            for vertex in stale {
                let is_endpoint = self.is_endpoint(vertex);
                let endpoints = self.endpoints.as_mut().expect("endpoint set built");
                if is_endpoint {
                    endpoints.insert(vertex);
                } else {
                    endpoints.remove(&vertex);
                }
            }
        }
        self.endpoints.as_ref().expect("endpoint set built")
    }

    // ------------------------------------------- downstream clock pin marks

    /// Ensures the reverse reachability marks from register/latch clock
    /// pins over clock-capable edges, used by required seeding.
    pub(crate) fn ensure_downstream_clk_pins(&mut self) {
        if self.downstream_clk_pins.is_some() {
            return;
        }
        let mut marks = vec![false; self.graph.vertex_count()];
        let mut worklist: Vec<VertexId> = self.graph.reg_clk_vertices().to_vec();
        for &vertex in &worklist {
            marks[vertex.index()] = true;
        }
        while let Some(vertex) = worklist.pop() {
            for &edge in self.graph.fanin_edges(vertex) {
                let e = self.graph.edge(edge);
                if e.disabled || !e.role.propagates_clock() {
                    continue;
                }
                if !marks[e.from.index()] {
                    marks[e.from.index()] = true;
                    worklist.push(e.from);
                }
            }
        }
        self.downstream_clk_pins = Some(marks);
    }

    /// Returns `true` if the vertex reaches a register clock pin through
    /// clock-capable edges. Valid after required seeding.
    pub fn has_downstream_clk_pin(&self, vertex: VertexId) -> bool {
        self.downstream_clk_pins
            .as_ref()
            .map_or(false, |marks| marks[vertex.index()])
    }

    // --------------------------------------------- startpoints / endpoints

    /// Visits every search startpoint: top-level inputs, input-delay pins,
    /// clock source pins, register clock pins, and internal path-delay
    /// startpoints.
    pub fn visit_startpoints(&self, visitor: &mut dyn FnMut(VertexId)) {
        let mut seen = HashSet::new();
        let mut visit = |vertex: VertexId, visitor: &mut dyn FnMut(VertexId)| {
            if seen.insert(vertex) {
                visitor(vertex);
            }
        };
        for pin in self.network.top_level_input_pins() {
            if let Some(vertex) = self.graph.pin_vertex(pin) {
                visit(vertex, visitor);
            }
        }
        for pin in self.sdc.input_delay_pins() {
            if let Some(vertex) = self.graph.pin_vertex(pin) {
                visit(vertex, visitor);
            }
        }
        let clock_pins: Vec<Ident> = self.sdc.clock_pins().map(|(pin, _)| pin).collect();
        for pin in clock_pins {
            if let Some(vertex) = self.graph.pin_vertex(pin) {
                visit(vertex, visitor);
            }
        }
        for &vertex in self.graph.reg_clk_vertices() {
            visit(vertex, visitor);
        }
        let starts: Vec<Ident> = self.sdc.path_delay_internal_startpoints().collect();
        for pin in starts {
            if let Some(vertex) = self.graph.pin_vertex(pin) {
                visit(vertex, visitor);
            }
        }
    }

    /// Visits every endpoint, filtering register clock pins that are not
    /// internal path-delay endpoints.
    pub fn visit_endpoints(&mut self, visitor: &mut dyn FnMut(VertexId)) {
        let mut ends: Vec<VertexId> = self.endpoints().iter().copied().collect();
        ends.sort_unstable();
        for vertex in ends {
            let pin = self.graph.vertex(vertex).pin;
            if !self.graph.vertex(vertex).is_reg_clk
                || self.sdc.is_path_delay_internal_endpoint(pin)
            {
                visitor(vertex);
            }
        }
    }

    // ----------------------------------------------------------- utilities

    /// Reports constraint-relationship warnings (clock pairs with no
    /// common period) into `sink`. Called after a query, per the
    /// recoverable-warning policy.
    pub fn report_constraint_warnings(&self, sink: &kairos_diagnostics::DiagnosticSink) {
        self.sdc
            .report_clk_to_clk_max_cycle_warnings(self.interner, sink);
    }

    pub(crate) fn pin_name(&self, vertex: VertexId) -> &str {
        self.interner.resolve(self.graph.vertex(vertex).pin)
    }
}

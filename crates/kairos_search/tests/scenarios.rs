//! End-to-end propagation scenarios over hand-built circuits.

mod harness;

use harness::Bench;
use kairos_common::{Delay, MinMax, RiseFall};
use kairos_sdc::{ExceptionPoint, Waveform};
use kairos_search::{LatchState, Search, VertexPaths};
use kairos_graph::VertexId;

/// The worst max-analysis data arrival at a vertex.
fn max_data_arrival(search: &Search<'_>, vertex: VertexId) -> Option<f64> {
    let mut worst: Option<f64> = None;
    for path in search.vertex_path_refs(vertex) {
        let tag = search.tag(path.tag);
        if tag.is_clk {
            continue;
        }
        if search.corners().path_ap(tag.path_ap).min_max != MinMax::Max {
            continue;
        }
        let arrival = search.path_arrival(&path).as_ns();
        worst = Some(worst.map_or(arrival, |w: f64| w.max(arrival)));
    }
    worst
}

/// The max-analysis clock arrival at a vertex for the given transition.
fn clk_arrival(search: &Search<'_>, vertex: VertexId, rf: RiseFall) -> Option<f64> {
    for path in search.vertex_path_refs(vertex) {
        let tag = search.tag(path.tag);
        if tag.is_clk
            && tag.rf == rf
            && search.corners().path_ap(tag.path_ap).min_max == MinMax::Max
        {
            return Some(search.path_arrival(&path).as_ns());
        }
    }
    None
}

#[test]
fn pure_combinational_register_path() {
    let mut bench = Bench::new();
    let setup = 0.5;
    let input = bench.input("IN");
    let (_clk, clk_src) = bench.clock("CLK", "CLK_port", 10.0);
    let (reg_clk, reg_d, _reg_q) = bench.register("REG", 1.0, setup);
    bench.wire(clk_src, reg_clk, 0.0);
    bench.comb(input, reg_d, 2.0);
    bench.finish();

    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    assert_eq!(max_data_arrival(&search, reg_d), Some(2.0));

    search.find_requireds(0).unwrap();
    let slacks = search.wns_slacks(reg_d);
    let expected_slack = 10.0 - setup - 2.0;
    assert!(
        (slacks[MinMax::Max.index()].as_ns() - expected_slack).abs() < 1e-9,
        "setup slack {} != {}",
        slacks[MinMax::Max.index()],
        expected_slack
    );

    // Required duality at the endpoint.
    for path in search.vertex_path_refs(reg_d) {
        let tag = search.tag(path.tag);
        if search.corners().path_ap(tag.path_ap).min_max != MinMax::Max {
            continue;
        }
        if let Some(required) = search.vertex_required(reg_d, path.tag) {
            let arrival = search.path_arrival(&path);
            assert!((required - arrival)
                .fuzzy_equal(Delay::new(expected_slack)));
        }
    }

    let (wns, wns_vertex) = search.worst_slack(MinMax::Max).unwrap();
    assert!((wns.as_ns() - expected_slack).abs() < 1e-9);
    assert_eq!(wns_vertex, Some(reg_d));
    // Positive slack contributes no TNS.
    assert_eq!(
        search.total_negative_slack(MinMax::Max).unwrap(),
        Delay::ZERO
    );
}

#[test]
fn two_clock_max_delay() {
    let mut bench = Bench::new();
    let setup = 0.25;
    let input = bench.input("IN");
    let (clk1, _clk1_src) = bench.clock("CLK1", "CLK1_port", 10.0);
    // Capture clock rises at 5 within a 10 period.
    let clk2_port = bench.pin("CLK2_port");
    bench.network.top_ports.insert(clk2_port);
    let clk2_src = bench.graph.add_vertex(clk2_port);
    bench.sdc.make_clock(
        bench.interner.intern("CLK2"),
        Delay::new(10.0),
        Some(Waveform {
            rise: Delay::new(5.0),
            fall: Delay::new(0.0),
        }),
        vec![clk2_port],
    );
    let (reg_clk, reg_d, _reg_q) = bench.register("REG", 1.0, setup);
    bench.wire(clk2_src, reg_clk, 0.0);
    bench.comb(input, reg_d, 3.0);
    bench.input_delay(input, clk1, 0.0);
    bench.finish();

    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    // Launched at CLK1 rise (time 0) plus the arc delay.
    assert_eq!(max_data_arrival(&search, reg_d), Some(3.0));

    search.find_requireds(0).unwrap();
    let slacks = search.wns_slacks(reg_d);
    let expected = 5.0 - 3.0 - setup;
    assert!(
        (slacks[MinMax::Max.index()].as_ns() - expected).abs() < 1e-9,
        "setup slack {} != {}",
        slacks[MinMax::Max.index()],
        expected
    );
}

#[test]
fn false_path_kills_only_matching_source() {
    let mut bench = Bench::new();
    let input = bench.input("IN");
    let other = bench.input("IN2");
    let (_clk, clk_src) = bench.clock("CLK", "CLK_port", 10.0);
    let (reg_clk, reg_d, _reg_q) = bench.register("REG", 1.0, 0.5);
    bench.wire(clk_src, reg_clk, 0.0);
    bench.comb(input, reg_d, 2.0);
    bench.comb(other, reg_d, 1.0);
    let in_pin = bench.graph.vertex(input).pin;
    let d_pin = bench.graph.vertex(reg_d).pin;
    bench.sdc.make_false_path(
        Some(ExceptionPoint::pins(vec![in_pin])),
        Vec::new(),
        Some(ExceptionPoint::pins(vec![d_pin])),
    );
    bench.finish();

    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    // The false path leaves only the IN2 contribution.
    assert_eq!(max_data_arrival(&search, reg_d), Some(1.0));

    // No committed tag anywhere carries a complete false-path state.
    for vertex in search.graph().vertex_ids() {
        for path in search.vertex_path_refs(vertex) {
            let tag = search.tag(path.tag);
            if tag.is_clk {
                continue;
            }
            for state in &tag.states {
                let exc = search.sdc().exception(state.exception);
                assert!(
                    !(exc.is_false() && state.is_complete(exc)),
                    "complete false state committed at {:?}",
                    vertex
                );
            }
        }
    }

    search.find_requireds(0).unwrap();
    let slacks = search.wns_slacks(reg_d);
    assert!((slacks[MinMax::Max.index()].as_ns() - (10.0 - 0.5 - 1.0)).abs() < 1e-9);
}

#[test]
fn latch_pass_through_converges_in_two_passes() {
    let mut bench = Bench::new();
    let input = bench.input("IN");
    let (_clk, clk_src) = bench.clock("CLK", "CLK_port", 10.0);
    let (lat_en, lat_d, lat_q, _dq) = bench.latch("LAT", 0.5, LatchState::Open);
    bench.wire(clk_src, lat_en, 0.0);
    let (reg_clk, reg_d, _reg_q) = bench.register("REG", 1.0, 0.5);
    bench.wire(clk_src, reg_clk, 0.0);
    bench.comb(input, lat_d, 2.0);
    bench.comb(lat_q, reg_d, 1.5);
    bench.finish();

    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    // Upstream arrival + D->Q + combinational.
    assert_eq!(max_data_arrival(&search, lat_d), Some(2.0));
    assert_eq!(max_data_arrival(&search, lat_q), Some(2.5));
    assert_eq!(max_data_arrival(&search, reg_d), Some(4.0));
}

#[test]
fn generated_clock_insertion_includes_master_and_divider_path() {
    let mut bench = Bench::new();
    let (clk, clk_src) = bench.clock("CLK", "CLK_port", 10.0);
    bench.sdc.set_clock_insertion(clk, MinMax::Min, Delay::new(0.5));
    bench.sdc.set_clock_insertion(clk, MinMax::Max, Delay::new(0.5));

    // Divide-by-2 divider: master network feeds the generated source pin.
    let div_q = bench.vertex("div/Q");
    bench.comb(clk_src, div_q, 1.5);
    let div_pin = bench.graph.vertex(div_q).pin;
    let gclk = bench.sdc.make_generated_clock(
        bench.interner.intern("GCLK"),
        clk,
        2,
        vec![div_pin],
    );
    assert_eq!(bench.sdc.clock(gclk).period.as_ns(), 20.0);

    let (reg_clk, reg_d, _reg_q) = bench.register("REG", 1.0, 0.5);
    bench.wire(div_q, reg_clk, 0.0);
    let input = bench.input("IN");
    bench.comb(input, reg_d, 1.0);
    bench.finish();

    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    // Master insertion (0.5) plus divider path delay (1.5).
    assert_eq!(clk_arrival(&search, reg_clk, RiseFall::Rise), Some(2.0));
    assert!(search.is_clock(reg_clk));
    // The master source carries the generated-clock source paths.
    assert!(search.is_gen_clk_src(clk_src));
}

#[test]
fn dynamic_loop_breaking_traverses_loop_once() {
    fn build(dynamic: bool) -> (Bench, VertexId, VertexId) {
        let mut bench = Bench::new();
        let a = bench.input("a");
        let b = bench.vertex("b");
        let c = bench.vertex("c");
        let out = bench.vertex("out");
        bench.comb(a, b, 1.0);
        bench.comb(b, c, 1.0);
        // Feedback edge; levelization breaks it.
        bench.comb(c, b, 1.0);
        bench.comb(c, out, 1.0);
        bench.finish();
        bench.sdc.set_dynamic_loop_breaking(dynamic);
        (bench, b, c)
    }

    // Without dynamic loop breaking the feedback edge is rejected.
    let (bench, b, c) = build(false);
    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    assert_eq!(max_data_arrival(&search, b), Some(1.0));
    assert_eq!(max_data_arrival(&search, c), Some(2.0));

    // With it, loop-tagged arrivals cross the feedback edge exactly once:
    // the b vertex also sees the around-the-loop arrival.
    let (bench, b, c) = build(true);
    let mut search = bench.search();
    search.find_all_arrivals().unwrap();
    assert_eq!(max_data_arrival(&search, b), Some(3.0));
    // The loop-tagged path dies when it closes the cycle back at c, so c
    // keeps only its direct arrival.
    assert_eq!(max_data_arrival(&search, c), Some(2.0));

    // Convergence: a second run with no invalidation changes nothing.
    let before: Vec<VertexPaths> = search
        .graph()
        .vertex_ids()
        .map(|v| search.vertex_paths_snapshot(v))
        .collect();
    search.find_all_arrivals().unwrap();
    for (vertex, old) in search.graph().vertex_ids().zip(before) {
        let new = search.vertex_paths_snapshot(vertex);
        assert_eq!(old.arrivals, new.arrivals);
    }
}

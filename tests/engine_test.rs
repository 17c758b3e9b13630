// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Engine-level integration: the full prepare-then-search job, monitoring
//! and cooperative abort.

mod common;

use spliced_search::engine::{Calls, ComposeParams, Engine};
use std::time::Duration;

/// The whole engine pipeline end to end on the smallest real search.
#[test]
fn engine_runs_a_single_method_search() {
    let mut engine = Engine::new();
    // Trim the default splice set down to Cambridge alone.
    while engine.methods().len() > 1 {
        engine.remove_method(1);
    }
    engine.build_node_table();
    assert!(engine.is_built());

    let params = ComposeParams {
        leads_per_part: 7,
        parts: 1,
        tenors_together: true,
        nice_part_ends: true,
        calls: Calls::None,
        min_com: Some(0),
        ..ComposeParams::default()
    };
    engine.compose(&params).unwrap();

    let best = engine.best_comps();
    assert_eq!(best.len(), 1);
    let course = best.get(0).unwrap();
    common::assert_comp_invariants(&course, 1, 0, 0);
    assert_eq!(course.com(), 0);
    assert_eq!(course.title(), "224 1-spliced");

    let rendered = engine.all_comps_string();
    assert!(rendered.contains("224 1-spliced, gen. spliced-search (No. 1)"));
    assert!(rendered.contains(" 2345678"));

    let status = engine.monitor().status();
    assert_eq!(status.n_comps, 1);
    assert!(!status.aborted);
    assert_eq!(status.best_com, 0);
    assert!(status.best_score > 0);
}

/// Aborting mid-search: the worker unwinds within the check interval and
/// leaves the kept compositions consistent.
#[test]
fn abort_unwinds_the_worker_and_keeps_output_consistent() {
    let mut engine = Engine::new();
    engine.build_node_table();
    let monitor = engine.monitor();

    // Four-method half-lead search with calls over five parts: far too
    // large to finish, so the abort always lands mid-search.
    let worker = std::thread::spawn(move || {
        let params = ComposeParams {
            leads_per_part: 8,
            parts: 5,
            tenors_together: true,
            optimum_balance: true,
            calls: Calls::BobsAndSingles,
            ..ComposeParams::default()
        };
        engine.compose(&params).expect("search failed to start");
        engine
    });

    std::thread::sleep(Duration::from_millis(400));
    monitor.tracker().abort();
    let engine = worker.join().expect("worker did not unwind");

    assert!(monitor.tracker().is_aborted());
    // Whatever was emitted before the abort is a complete, scored
    // composition.
    for comp in engine.best_comps().comps() {
        common::assert_comp_invariants(&comp, 5, 0, 0);
    }
}

/// Pausing parks the search; resuming lets it finish.
#[test]
fn pause_and_resume_round_trip() {
    let mut engine = Engine::new();
    while engine.methods().len() > 1 {
        engine.remove_method(1);
    }
    engine.build_node_table();
    let monitor = engine.monitor();

    let worker = std::thread::spawn(move || {
        let params = ComposeParams {
            leads_per_part: 7,
            parts: 1,
            calls: Calls::BobsAndSingles,
            min_com: Some(0),
            ..ComposeParams::default()
        };
        engine.compose(&params).expect("search failed to start");
        engine
    });

    monitor.tracker().pause();
    std::thread::sleep(Duration::from_millis(50));
    monitor.tracker().resume();
    let engine = worker.join().expect("worker did not finish");
    assert!(!monitor.tracker().is_aborted());
    assert!(!engine.best_comps().is_empty());
}

// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test utilities shared across integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use parking_lot::Mutex;
use spliced_search::compose::OutputComp;
use spliced_search::method::{standard, Method};
use spliced_search::search::ComposerHost;
use spliced_search::tables::Tables;
use spliced_search::track::Tracker;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builds fully populated tables for the given splice set.
pub fn tables_with(methods: Vec<Method>) -> Tables {
    init_tracing();
    let tracker = Tracker::new(100);
    let mut tables = Tables::new();
    tables.build_node_table(&tracker);
    tables.set_methods(methods);
    tables.prepare_methods(&tracker).expect("table build failed");
    tables.prepare_music(&tracker);
    tables.prepare_lead_music(&tracker);
    tables
}

/// The classic two-method splice set.
pub fn cambridge_yorkshire() -> Vec<Method> {
    vec![standard::cambridge(), standard::yorkshire()]
}

/// A host that records every emitted composition in discovery order.
#[derive(Default)]
pub struct RecordingHost {
    comps: Mutex<Vec<OutputComp>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comps(&self) -> Vec<OutputComp> {
        self.comps.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.comps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.lock().is_empty()
    }
}

impl ComposerHost for RecordingHost {
    fn output_comp(&self, comp: OutputComp) {
        self.comps.lock().push(comp);
    }
}

/// Asserts the cross-cutting invariants every emitted composition must
/// satisfy.
pub fn assert_comp_invariants(comp: &OutputComp, parts: usize, min_com: i32, min_score: i32) {
    assert_eq!(comp.n_parts(), parts, "part count\n{}", comp);
    assert!(comp.com() >= min_com, "COM below minimum\n{}", comp);
    assert!(comp.score() >= min_score, "score below minimum\n{}", comp);
    assert!(comp.music() > 0, "emitted without music\n{}", comp);
    assert!(
        (0..=100).contains(&comp.balance()),
        "balance out of range\n{}",
        comp
    );
}

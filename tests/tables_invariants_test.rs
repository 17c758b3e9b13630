// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Whole-table invariants over a realistic five-method stack.

mod common;

use spliced_search::method::{standard, Call};
use spliced_search::ring::{Row, STAGE};
use spliced_search::tables::{N_LEADHEADS, N_NODES};

fn five_methods() -> Vec<spliced_search::method::Method> {
    vec![
        standard::cambridge(),
        standard::yorkshire(),
        standard::lincolnshire(),
        standard::superlative(),
        standard::uxbridge(),
    ]
}

#[test]
fn node_table_is_complete() {
    let tables = common::tables_with(five_methods());
    assert_eq!(tables.n_nodes(), N_NODES);
    assert_eq!(tables.n_leadheads(), N_LEADHEADS);
    // Every row resolves to exactly one node.
    assert!(tables.node_id_of(&Row::rounds(STAGE)).is_some());
    assert!(tables.node_id_of(&Row::parse("87654321").unwrap()).is_some());
    // The composite table is the full cross product.
    assert_eq!(tables.n_composite_methods(), 25);
}

#[test]
fn every_lead_perm_lands_on_a_leadhead() {
    let tables = common::tables_with(five_methods());
    for cm in tables.composite_methods() {
        for call in [Call::Plain, Call::Bob, Call::Single] {
            let dest = tables.permute(tables.rounds_node(), cm.lead_perm(call));
            assert!(
                tables.node(dest).is_leadhead(),
                "{} {:?} does not reach a leadhead",
                cm.abbrev(),
                call
            );
        }
    }
}

#[test]
fn n_parts_is_the_permutation_order() {
    let tables = common::tables_with(five_methods());
    // Spot-check a spread of nodes: applying the row n_parts times from
    // rounds returns rounds, and no fewer applications do.
    for id in tables.node_ids().step_by(1111) {
        let node = tables.node(id);
        let n_parts = node.n_parts();
        let mut r = Row::rounds(STAGE);
        for k in 1..=n_parts {
            r.apply_permutation(node.row().bells());
            if k < n_parts {
                assert!(!r.is_rounds(), "row {} returned early", node.row());
            }
        }
        assert!(r.is_rounds(), "row {} has wrong order", node.row());
    }
}

#[test]
fn composite_lead_walk_agrees_with_lead_rows() {
    let tables = common::tables_with(five_methods());
    // Ringing every change of composite (i, j) from rounds and finishing
    // with the bobbed or singled ending must agree with the precomputed
    // call-end permutations.
    for cm in tables.composite_methods() {
        let mut buf = vec![0u32; cm.lead_length()];
        tables.generate_lead(cm, tables.rounds_node(), &mut buf);
        // The first row of the lead is the starting node itself.
        assert_eq!(buf[0], tables.rounds_node().index() as u32);
        // All rows of one lead are distinct.
        let mut seen = buf.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), cm.lead_length(), "{} repeats a row", cm.abbrev());
    }
}

#[test]
fn tenors_together_leads_are_flagged_consistently() {
    let tables = common::tables_with(five_methods());
    let mut flagged = 0;
    for &id in tables.leadheads() {
        let node = tables.node(id);
        assert!(node.is_leadhead());
        if node.is_tenors_together() {
            flagged += 1;
            assert!(node.row().is_tenors_together());
        }
    }
    assert_eq!(flagged, tables.tenors_together_leads().len());
    // Rounds is tenors together and tenors home.
    let rounds = tables.node(tables.rounds_node());
    assert!(rounds.is_tenors_together());
    assert!(rounds.is_tenors_home());
}

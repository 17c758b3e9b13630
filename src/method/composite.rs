// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Composite methods: one method's first half-lead spliced to another's
//! second half-lead.
//!
//! For N methods the engine builds the full N² table. Entry (i, j) rings
//! method i up to the half-lead and method j down to the leadhead, and is
//! abbreviated by the two method letters (e.g. `CY`). The diagonal entries
//! (i, i) are the plain methods themselves; the leadhead-only search
//! restricts itself to the diagonal.
//!
//! Each composite carries its change permutations as *ids* into the shared
//! permutation tables, so the search can walk a lead with nothing but array
//! lookups.

use crate::method::{calc_lead_rows, Call, LeadRows, Method, N_CALL_KINDS};
use crate::ring::{Row, STAGE};
use crate::tables::{PermId, PermTables};

/// A composite method with precomputed permutation ids.
///
/// Built by [`crate::tables::Tables::prepare_methods`]; the leadhead perm
/// ids are only valid once every composite has been registered and
/// [`CompositeMethod::rebase_lead_perms`] has moved them into the flat id
/// space after the place-notation perms.
#[derive(Debug, Clone)]
pub struct CompositeMethod {
    index: usize,
    first_index: usize,
    second_index: usize,
    name: String,
    abbrev: String,
    first_half_len: usize,
    second_half_len: usize,
    lead_length: usize,
    rows: LeadRows,
    pn_perm_ids: Vec<PermId>,
    lead_perm_ids: [PermId; N_CALL_KINDS],
    /// 1 when the two halves are different methods, else 0; summed straight
    /// into the running changes-of-method count.
    com: i32,
}

impl CompositeMethod {
    /// Builds composite (i, j) and registers its permutations.
    pub fn new(
        m1: &Method,
        m2: &Method,
        first_index: usize,
        second_index: usize,
        n_methods: usize,
        perms: &mut PermTables,
    ) -> Self {
        let index = first_index * n_methods + second_index;
        let pn1 = m1.notation();
        let pn2 = m2.notation();
        let h1 = m1.first_half_len();
        let h2 = m2.second_half_len();
        let rows = calc_lead_rows(pn1, pn2);

        let rounds = Row::rounds(STAGE);
        let mut pn_perm_ids = Vec::with_capacity(h1 + h2);
        for i in 0..h1 {
            let perm = as_perm(&rounds.changed(pn1.change(i)));
            pn_perm_ids.push(perms.add_pn(perm));
        }
        for i in 0..h2 {
            let perm = as_perm(&rounds.changed(pn2.change(i + h2)));
            pn_perm_ids.push(perms.add_pn(perm));
        }
        // Raw ids for now; rebased into the flat space once the
        // place-notation perm count is final.
        let lead_perm_ids = [
            perms.add_lead(as_perm(&rows.call_ends[0])),
            perms.add_lead(as_perm(&rows.call_ends[1])),
            perms.add_lead(as_perm(&rows.call_ends[2])),
        ];

        Self {
            index,
            first_index,
            second_index,
            name: format!("{}/{}", m1.name(), m2.name()),
            abbrev: format!("{}{}", m1.abbrev(), m2.abbrev()),
            first_half_len: h1,
            second_half_len: h2,
            lead_length: h1 + h2,
            rows,
            pn_perm_ids,
            lead_perm_ids,
            com: if first_index == second_index { 0 } else { 1 },
        }
    }

    /// Moves the leadhead perm ids past the place-notation perms so both
    /// index one flat table. Must be called exactly once, after every
    /// composite has registered its perms.
    pub fn rebase_lead_perms(&mut self, pn_perm_count: usize) {
        for id in &mut self.lead_perm_ids {
            *id = id.rebased(pn_perm_count);
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    #[inline]
    pub fn second_index(&self) -> usize {
        self.second_index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbrev(&self) -> &str {
        &self.abbrev
    }

    #[inline]
    pub fn lead_length(&self) -> usize {
        self.lead_length
    }

    pub fn first_half_len(&self) -> usize {
        self.first_half_len
    }

    pub fn second_half_len(&self) -> usize {
        self.second_half_len
    }

    pub fn leadhead(&self) -> &Row {
        &self.rows.leadhead
    }

    pub fn halflead(&self) -> &Row {
        &self.rows.halflead
    }

    /// Contribution of this composite to the changes-of-method count.
    #[inline]
    pub fn com_increment(&self) -> i32 {
        self.com
    }

    pub fn changes_method(&self) -> bool {
        self.com != 0
    }

    #[inline]
    pub fn pn_perm_ids(&self) -> &[PermId] {
        &self.pn_perm_ids
    }

    /// Permutation id mapping a lead's starting node to the next lead's
    /// starting node under the given call.
    #[inline]
    pub fn lead_perm(&self, call: Call) -> PermId {
        self.lead_perm_ids[call.index()]
    }
}

/// A row viewed as a permutation vector of bell numbers.
fn as_perm(row: &Row) -> [u8; STAGE] {
    let mut perm = [0u8; STAGE];
    perm.copy_from_slice(row.bells());
    perm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::standard;

    #[test]
    fn composite_cross_product() {
        let cam = standard::cambridge();
        let york = standard::yorkshire();
        let mut perms = PermTables::new();
        let cy = CompositeMethod::new(&cam, &york, 0, 1, 2, &mut perms);
        assert_eq!(cy.abbrev(), "CY");
        assert_eq!(cy.name(), "Cambridge/Yorkshire");
        assert_eq!(cy.index(), 1);
        assert_eq!(cy.lead_length(), 32);
        assert!(cy.changes_method());
        let cc = CompositeMethod::new(&cam, &cam, 0, 0, 2, &mut perms);
        assert!(!cc.changes_method());
        // The diagonal composite rings the plain method.
        assert_eq!(cc.leadhead(), cam.leadhead());
        assert_eq!(cc.halflead(), cam.halflead());
    }

    #[test]
    fn perm_registration_dedups_globally() {
        let cam = standard::cambridge();
        let york = standard::yorkshire();
        let mut perms = PermTables::new();
        let cc = CompositeMethod::new(&cam, &cam, 0, 0, 2, &mut perms);
        let n_after_cc = perms.n_pn();
        let cy = CompositeMethod::new(&cam, &york, 0, 1, 2, &mut perms);
        // Cambridge's first half registers nothing new the second time.
        assert_eq!(&cc.pn_perm_ids()[..16], &cy.pn_perm_ids()[..16]);
        assert!(perms.n_pn() >= n_after_cc);
    }

    #[test]
    fn composite_halves_come_from_their_methods() {
        let cam = standard::cambridge();
        let york = standard::yorkshire();
        let mut perms = PermTables::new();
        let cy = CompositeMethod::new(&cam, &york, 0, 1, 2, &mut perms);
        // First half is Cambridge's: same halflead row.
        assert_eq!(cy.halflead(), cam.halflead());
        // Second half is Yorkshire's: ringing Yorkshire's second half from
        // Cambridge's halflead gives the composite leadhead.
        assert_ne!(cy.leadhead(), cam.leadhead());
        assert_eq!(cy.leadhead().bell_at(1), 1);
    }
}

// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The composition buffer.
//!
//! One [`Composition`] instance lives for the whole search and is mutated
//! in place. It is tightly bound to the search driver: the driver sets
//! leads and reads the running tallies for pruning, and hands over to the
//! buffer for the part-end checks (rotations, music, truth).
//!
//! Heavily exercised by the inner loop; the truth and music walks work
//! entirely in node ids and permutation ids.

use crate::method::{Call, CompositeMethod, Method};
use crate::tables::{NodeId, Tables};

/// One lead of the composition: starting node, composite method, call and
/// the resulting last row. Pure value.
#[derive(Debug, Clone, Copy)]
pub struct Lead {
    start: NodeId,
    /// Index into the composite-method table.
    method: usize,
    call: Call,
    last_row: NodeId,
}

impl Lead {
    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn method_index(&self) -> usize {
        self.method
    }

    pub fn call(&self) -> Call {
        self.call
    }

    #[inline]
    pub fn last_row(&self) -> NodeId {
        self.last_row
    }
}

/// The current partial composition and its analysis state.
#[derive(Debug)]
pub struct Composition {
    n_leads_per_part: usize,
    /// Tenors must be home at the part end (tenors-together searches in six
    /// parts or fewer).
    tenors_home_pe: bool,
    nice_part_ends: bool,
    /// Neither part-end policy applies: every rotation is admissible.
    all_rots_good: bool,

    leads: Vec<Lead>,
    /// Running changes-of-method up to and including each lead.
    coms: Vec<i32>,
    /// Running row count up to and including each lead.
    lengths: Vec<u32>,

    part_end: NodeId,
    n_parts: usize,
    first_rot: usize,
    best_rot: usize,
    first_part_false_lead: Option<usize>,
    /// Truth bitmap over all nodes; cleared on every proof.
    truth_table: Vec<bool>,
    /// Scratch node ids for one lead.
    row_num_buf: Vec<u32>,

    rounds: NodeId,
    music: i32,
    balance: i32,
    unbalance: i32,
}

impl Composition {
    pub fn new(
        methods: &[Method],
        tables: &Tables,
        n_leads_per_part: usize,
        tenors_home_pe: bool,
        nice_part_ends: bool,
    ) -> Self {
        let max_lead = methods.iter().map(Method::lead_length).max().unwrap_or(0);
        let placeholder = Lead {
            start: tables.rounds_node(),
            method: 0,
            call: Call::Plain,
            last_row: tables.rounds_node(),
        };
        Self {
            n_leads_per_part,
            tenors_home_pe,
            nice_part_ends,
            all_rots_good: !tenors_home_pe && !nice_part_ends,
            leads: vec![placeholder; n_leads_per_part],
            coms: vec![0; n_leads_per_part],
            lengths: vec![0; n_leads_per_part],
            part_end: tables.rounds_node(),
            n_parts: 0,
            first_rot: 0,
            best_rot: 0,
            first_part_false_lead: None,
            truth_table: vec![false; tables.n_nodes()],
            row_num_buf: vec![0; max_lead],
            rounds: tables.rounds_node(),
            music: 0,
            balance: 0,
            unbalance: 0,
        }
    }

    #[inline]
    pub fn n_leads_per_part(&self) -> usize {
        self.n_leads_per_part
    }

    #[inline]
    pub fn lead(&self, n: usize) -> &Lead {
        &self.leads[n]
    }

    /// Records the lead at slot `n`, updating the running changes-of-method
    /// and length tallies, and returns its last row.
    #[inline]
    pub fn set_lead(
        &mut self,
        n: usize,
        start: NodeId,
        composite: &CompositeMethod,
        call: Call,
        tables: &Tables,
    ) -> NodeId {
        let last_row = tables.permute(start, composite.lead_perm(call));
        self.leads[n] = Lead {
            start,
            method: composite.index(),
            call,
            last_row,
        };
        if n == 0 {
            self.coms[0] = composite.com_increment();
            self.lengths[0] = composite.lead_length() as u32;
        } else {
            let mut com = self.coms[n - 1] + composite.com_increment();
            let prev = &self.leads[n - 1];
            if composite.first_index()
                != tables.composite_methods()[prev.method].second_index()
            {
                com += 1;
            }
            self.coms[n] = com;
            self.lengths[n] = self.lengths[n - 1] + composite.lead_length() as u32;
        }
        last_row
    }

    /// Changes of method up to and including this lead (no end-start
    /// wraparound).
    #[inline]
    pub fn com(&self, lead: usize) -> i32 {
        self.coms[lead]
    }

    /// Rows rung up to and including this lead.
    #[inline]
    pub fn part_length(&self, lead: usize) -> u32 {
        self.lengths[lead]
    }

    /// Changes of method per part, including the wraparound boundary from
    /// the last lead back to the first.
    pub fn part_com(&self, tables: &Tables) -> i32 {
        let n = self.n_leads_per_part;
        let mut com = self.coms[n - 1];
        let first = &tables.composite_methods()[self.leads[0].method];
        let last = &tables.composite_methods()[self.leads[n - 1].method];
        if first.first_index() != last.second_index() {
            com += 1;
        }
        com
    }

    /// Number of parts generated by the prospective part end. Also caches
    /// the part-end node for the rotation checks that follow.
    #[inline]
    pub fn update_n_parts(&mut self, tables: &Tables) -> usize {
        self.part_end = self.leads[self.n_leads_per_part - 1].last_row();
        self.n_parts = tables.node(self.part_end).n_parts();
        self.n_parts
    }

    pub fn n_parts(&self) -> usize {
        self.n_parts
    }

    pub fn best_rot(&self) -> usize {
        self.best_rot
    }

    /// The lead the first part went false at, if the last proof failed
    /// there; lets the driver backtrack straight past the offending prefix.
    #[inline]
    pub fn first_part_false_lead(&self) -> Option<usize> {
        self.first_part_false_lead
    }

    /// True if at least one rotation of the composition has an acceptable
    /// part end; `first_rot` is left at the first such rotation.
    pub fn check_rots(&mut self, tables: &Tables) -> bool {
        if self.all_rots_good {
            self.first_rot = 0;
            return true;
        }
        let pe = tables.node(self.part_end);
        if (!self.tenors_home_pe || pe.is_tenors_home())
            && (!self.nice_part_ends || pe.is_nice_part_end())
        {
            self.first_rot = 0;
            return true;
        }
        for rot in 1..self.n_leads_per_part {
            if self.is_good_rot_part_end(rot, tables) {
                self.first_rot = rot;
                return true;
            }
        }
        false
    }

    /// Whether the rotation starting from lead `rot` (> 0) has an
    /// acceptable part end. Assumes one of the part-end policies is on.
    fn is_good_rot_part_end(&self, rot: usize, tables: &Tables) -> bool {
        if self.tenors_home_pe {
            // Fast pre-check: the bells occupying the tenors' home places
            // at the rotation's starting row must be fixed points of the
            // unrotated part end.
            let rot_start = tables.node(self.leads[rot - 1].last_row());
            let pe = tables.node(self.part_end);
            let in_sevenths = rot_start.bell_at(7);
            let in_eighths = rot_start.bell_at(8);
            if pe.bell_at(in_sevenths as usize) != in_sevenths
                || pe.bell_at(in_eighths as usize) != in_eighths
            {
                return false;
            }
        }
        if self.nice_part_ends {
            // Compute the actual rotated part end by stepping every lead.
            let composites = tables.composite_methods();
            let mut part_end = self.rounds;
            let mut j = rot;
            for _ in 0..self.n_leads_per_part {
                let lead = &self.leads[j];
                part_end = tables.permute(part_end, composites[lead.method].lead_perm(lead.call));
                j += 1;
                if j >= self.n_leads_per_part {
                    j = 0;
                }
            }
            return tables.node(part_end).is_nice_part_end();
        }
        true
    }

    /// Checks every admissible rotation for music. As soon as one rotation
    /// beats `min_music` the composition is proved; a false composition
    /// aborts all further music work.
    ///
    /// Returns the best music score, or -1 if the composition is false in
    /// the first part, or 0 if it is otherwise false or no rotation meets
    /// the minimum.
    pub fn calc_music_rots(&mut self, min_music: i32, tables: &Tables) -> i32 {
        self.n_parts = tables
            .node(self.leads[self.n_leads_per_part - 1].last_row())
            .n_parts();
        self.music = 0;
        let mut rot = self.first_rot;
        let mut music = self.calc_music(rot, tables);
        loop {
            if music > min_music {
                // Prove at the first rotation with good music: if false we
                // save the music walks for every remaining rotation.
                if self.music == 0 && !self.is_true(tables) {
                    if self.first_part_false_lead.is_some() {
                        return -1;
                    }
                    return 0;
                }
                if music > self.music {
                    self.music = music;
                    self.best_rot = rot;
                }
            }
            if self.all_rots_good {
                rot += 1;
                if rot >= self.n_leads_per_part {
                    return self.music;
                }
            } else {
                loop {
                    rot += 1;
                    if rot >= self.n_leads_per_part {
                        return self.music;
                    }
                    if self.is_good_rot_part_end(rot, tables) {
                        break;
                    }
                }
            }
            music = self.calc_music(rot, tables);
        }
    }

    /// Total music of the whole composition rung from rotation `rot`: one
    /// lead-music lookup per lead per part.
    fn calc_music(&self, rot: usize, tables: &Tables) -> i32 {
        let composites = tables.composite_methods();
        let mut music = 0;
        let mut node = self.rounds;
        let mut j = rot;
        for _ in 0..self.n_parts {
            for _ in 0..self.n_leads_per_part {
                let lead = &self.leads[j];
                let method = &composites[lead.method];
                music += tables.lead_music(tables.node(node).leadhead_number(), method.index());
                node = tables.permute(node, method.lead_perm(lead.call));
                j += 1;
                if j >= self.n_leads_per_part {
                    j = 0;
                }
            }
        }
        music
    }

    /// Music score of the best rotation found by the last
    /// [`Composition::calc_music_rots`].
    pub fn music(&self) -> i32 {
        self.music
    }

    pub fn set_balance(&mut self, balance: i32, unbalance: i32) {
        self.balance = balance;
        self.unbalance = unbalance;
    }

    pub fn balance(&self) -> i32 {
        self.balance
    }

    pub fn unbalance_count(&self) -> i32 {
        self.unbalance
    }

    /// Proves the composition. By symmetry of the part-end group only
    /// ⌈parts/2⌉+1 parts need checking. A failure in the first part is
    /// recorded for the driver's jump-backtrack.
    pub fn is_true(&mut self, tables: &Tables) -> bool {
        self.truth_table.fill(false);
        let composites = tables.composite_methods();
        let mut node = self.rounds;
        let parts_to_check = (self.n_parts + 2) / 2;
        self.first_part_false_lead = None;
        for part in 0..parts_to_check {
            for i in 0..self.n_leads_per_part {
                let lead = &self.leads[i];
                let method = &composites[lead.method];
                tables.generate_lead(method, node, &mut self.row_num_buf);
                for k in (0..method.lead_length()).rev() {
                    let node_num = self.row_num_buf[k] as usize;
                    if self.truth_table[node_num] {
                        if part == 0 {
                            self.first_part_false_lead = Some(i);
                        }
                        return false;
                    }
                    self.truth_table[node_num] = true;
                }
                node = tables.permute(node, method.lead_perm(lead.call));
            }
        }
        true
    }

    /// Takes the immutable output snapshot of the best rotation.
    pub fn output_comp(&self, score: i32, lh_only: bool, tables: &Tables) -> super::OutputComp {
        super::OutputComp::new(self, score, lh_only, tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::standard;
    use crate::track::Tracker;

    fn tables_for(methods: Vec<Method>) -> Tables {
        let tracker = Tracker::new(100);
        let mut tables = Tables::new();
        tables.build_node_table(&tracker);
        tables.set_methods(methods);
        tables.prepare_methods(&tracker).unwrap();
        tables.prepare_music(&tracker);
        tables.prepare_lead_music(&tracker);
        tables
    }

    /// A plain course of Cambridge: seven plain leads back to rounds.
    #[test]
    fn plain_course_comes_round_and_is_true() {
        let tables = tables_for(vec![standard::cambridge()]);
        let mut comp = Composition::new(tables.methods(), &tables, 7, true, false);
        let cc = &tables.composite_methods()[0];
        let mut start = tables.rounds_node();
        for i in 0..7 {
            start = comp.set_lead(i, start, cc, Call::Plain, &tables);
        }
        assert_eq!(comp.update_n_parts(&tables), 1);
        assert!(tables.node(start).row().is_rounds());
        assert_eq!(comp.part_com(&tables), 0);
        assert_eq!(comp.part_length(6), 7 * 32);
        assert!(comp.is_true(&tables));
        assert_eq!(comp.first_part_false_lead(), None);
    }

    #[test]
    fn com_counts_method_changes_and_boundaries() {
        let tables = tables_for(vec![standard::cambridge(), standard::yorkshire()]);
        let composites = tables.composite_methods();
        // CC then YC: boundary C->Y changes method, YC is itself a change.
        let mut comp = Composition::new(tables.methods(), &tables, 2, false, false);
        let start = tables.rounds_node();
        let cc = &composites[0]; // (C,C)
        let yc = &composites[2]; // (Y,C)
        let next = comp.set_lead(0, start, cc, Call::Plain, &tables);
        comp.set_lead(1, next, yc, Call::Plain, &tables);
        // Lead 0: no change. Lead 1: YC internal change (1) plus the
        // boundary second(C) != first(Y) (1).
        assert_eq!(comp.com(0), 0);
        assert_eq!(comp.com(1), 2);
        // Wraparound: first lead starts C, last ends C: no extra change.
        assert_eq!(comp.part_com(&tables), 2);
    }

    #[test]
    fn repeated_lead_is_false_with_offender_reported() {
        let tables = tables_for(vec![standard::cambridge()]);
        // Eight plain leads of a seven-lead course: the eighth lead rings
        // the rounds lead again.
        let mut comp = Composition::new(tables.methods(), &tables, 8, false, false);
        let cc = &tables.composite_methods()[0];
        let mut start = tables.rounds_node();
        for i in 0..8 {
            start = comp.set_lead(i, start, cc, Call::Plain, &tables);
        }
        comp.update_n_parts(&tables);
        assert!(!comp.is_true(&tables));
        assert_eq!(comp.first_part_false_lead(), Some(7));
    }

    #[test]
    fn rotations_with_tenors_home_policy() {
        let tables = tables_for(vec![standard::cambridge()]);
        let mut comp = Composition::new(tables.methods(), &tables, 7, true, false);
        let cc = &tables.composite_methods()[0];
        let mut start = tables.rounds_node();
        for i in 0..7 {
            start = comp.set_lead(i, start, cc, Call::Plain, &tables);
        }
        comp.update_n_parts(&tables);
        // Rounds part end: rotation 0 is acceptable.
        assert!(comp.check_rots(&tables));
        assert_eq!(comp.first_rot, 0);
    }

    #[test]
    fn music_of_plain_course_matches_lead_music_totals() {
        let tables = tables_for(vec![standard::cambridge()]);
        let mut comp = Composition::new(tables.methods(), &tables, 7, false, false);
        let cc = &tables.composite_methods()[0];
        let mut start = tables.rounds_node();
        let mut expected = 0;
        for i in 0..7 {
            expected += tables.lead_music(tables.node(start).leadhead_number(), 0);
            start = comp.set_lead(i, start, cc, Call::Plain, &tables);
        }
        comp.update_n_parts(&tables);
        let music = comp.calc_music_rots(-1, &tables);
        assert_eq!(music, expected);
        assert_eq!(comp.music(), expected);
    }
}

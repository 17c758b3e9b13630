// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Half-lead spliced inner loop, no calls.
//!
//! The simplest of the three loop variants: one composite-method choice
//! per lead. See the module docs on [`crate::search`] for the shape shared
//! by all three.

use crate::method::Call;
use crate::search::{Composer, ComposerHost, CHECK_FREQ, REGEN_RESET};
use crate::track::Tracker;

impl Composer<'_> {
    pub(super) fn do_compose_no_calls(&mut self, host: &dyn ComposerHost, tracker: &Tracker) {
        let tables = self.tables;
        let n_methods = self.n_methods;
        let mut start = self.rounds;
        let min_com_constant = self.min_com + 1 - 2 * self.leads_per_part as i32;
        let mut i: usize = 0;

        loop {
            if i >= self.leads_per_part {
                // Reached a prospective part end. The part-end row must
                // generate the right number of parts, the length must be in
                // bounds, and touches with non-lowest postfixes from the
                // rotational sort (a last backtrack that is not an integral
                // division of the part) are rejected.
                let regen_mod = self.regen_ptr - 1;
                let mut j = self.leads_per_part - 1;
                if self.is_length_good()
                    && (regen_mod <= 0 || regen_mod * 2 >= self.leads_per_part as i32)
                    && self.comp.update_n_parts(tables) == self.n_parts
                {
                    j = self.check_comp(host);
                }
                // Backtrack from the part end to continue the search.
                loop {
                    i -= 1;
                    let lead_num = tables.node(self.comp.lead(i).last_row()).leadhead_number();
                    self.truth_table[lead_num] = false;
                    let index = self.method_indices[i];
                    self.reduce_method_counts(self.first_half_of[index], self.second_half_of[index]);
                    if i <= j {
                        break;
                    }
                }
            } else {
                self.counter += 1;
                if self.counter >= CHECK_FREQ && self.check_stats(tracker) {
                    break;
                }

                let index = self.method_indices[i];
                let one = self.first_half_of[index];
                let two = self.second_half_of[index];
                if self.first_half_counts[one] >= self.method_repeat_limit {
                    // Too many of the first half-lead method: skip to the
                    // next first-half choice by forcing a backtrack from
                    // the last second-half choice of this block.
                    self.method_indices[i] += n_methods - two - 1;
                } else if self.second_half_counts[two] < self.method_repeat_limit {
                    self.first_half_counts[one] += 1;
                    if self.first_half_counts[one] >= self.method_repeat_limit {
                        self.n_first_at_max += 1;
                    }
                    if self.n_first_at_max > self.max_methods_at_repeat_limit {
                        self.first_half_counts[one] -= 1;
                        self.n_first_at_max -= 1;
                        self.method_indices[i] += n_methods - two - 1;
                    } else {
                        self.second_half_counts[two] += 1;
                        if self.second_half_counts[two] >= self.method_repeat_limit {
                            self.n_second_at_max += 1;
                        }
                        if self.n_second_at_max > self.max_methods_at_repeat_limit {
                            self.second_half_counts[two] -= 1;
                            self.n_second_at_max -= 1;
                        } else {
                            // Both halves allowed: add the lead (this also
                            // updates the running COM) and check leadhead
                            // truth and the tenors-together prune.
                            let composite = &tables.composite_methods()[index];
                            let next = self.comp.set_lead(i, start, composite, Call::Plain, tables);
                            let next_node = tables.node(next);
                            let lead_num = next_node.leadhead_number();
                            if !self.truth_table[lead_num]
                                && (!self.tenors_together || next_node.is_tenors_together())
                            {
                                // Prune branches where min COM is no longer
                                // achievable.
                                if self.comp.com(i) >= 2 * i as i32 + min_com_constant {
                                    start = next;
                                    self.truth_table[lead_num] = true;
                                    i += 1;
                                    if self.regen_ptr < 0 {
                                        if self.regen_ptr < -100 {
                                            // Fresh after a backtrack: pick
                                            // up the copy offset from the
                                            // node just reached.
                                            self.regen_ptr = next_node.regen_offset();
                                            if self.regen_ptr >= 0 {
                                                self.method_indices[i] =
                                                    self.method_indices[self.regen_ptr as usize];
                                            }
                                        }
                                    } else {
                                        self.method_indices[i] =
                                            self.method_indices[self.regen_ptr as usize];
                                    }
                                    self.regen_ptr += 1;
                                    continue;
                                } else {
                                    self.reduce_method_counts(one, two);
                                    // With different halves, min COM must
                                    // have been violated by the first half
                                    // against the previous lead: skip its
                                    // remaining second-half choices.
                                    if one != two {
                                        self.method_indices[i] += n_methods - two - 1;
                                    }
                                }
                            } else {
                                self.reduce_method_counts(one, two);
                            }
                        }
                    }
                }
            }

            match self.backtrack_no_calls(i) {
                Some(up) => {
                    i = up;
                    start = if i > 0 {
                        self.comp.lead(i - 1).last_row()
                    } else {
                        self.rounds
                    };
                }
                None => break,
            }
            self.regen_ptr = REGEN_RESET;
        }
    }

    /// Advances the method choice at slot `i`, carrying exhausted slots
    /// upward. Returns the slot to continue from, or `None` when slot 0
    /// exhausts and the search is over.
    fn backtrack_no_calls(&mut self, mut i: usize) -> Option<usize> {
        loop {
            self.method_indices[i] += 1;
            if self.method_indices[i] < self.n_comp_methods {
                return Some(i);
            }
            self.method_indices[i] = 0;
            if i == 0 {
                return None;
            }
            i -= 1;
            let lead_num = self
                .tables
                .node(self.comp.lead(i).last_row())
                .leadhead_number();
            self.truth_table[lead_num] = false;
            let index = self.method_indices[i];
            self.reduce_method_counts(self.first_half_of[index], self.second_half_of[index]);
        }
    }
}

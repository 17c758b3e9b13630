// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Half-lead spliced inner loop with calls.
//!
//! As the no-calls loop, with a call choice (plain, bob, maybe single)
//! under every method choice. Gate failures force the call choice to its
//! last value so the next backtrack advances the method immediately.

use crate::method::Call;
use crate::search::{Composer, ComposerHost, CHECK_FREQ, REGEN_RESET};
use crate::track::Tracker;

impl Composer<'_> {
    pub(super) fn do_compose_with_calls(&mut self, host: &dyn ComposerHost, tracker: &Tracker) {
        let tables = self.tables;
        let n_methods = self.n_methods;
        let mut start = self.rounds;
        let min_com_constant = self.min_com + 1 - 2 * self.leads_per_part as i32;
        let mut i: usize = 0;

        loop {
            if i >= self.leads_per_part {
                let regen_mod = self.regen_ptr - 1;
                let mut j = self.leads_per_part - 1;
                if self.is_length_good()
                    && (regen_mod <= 0 || regen_mod * 2 >= self.leads_per_part as i32)
                    && self.comp.update_n_parts(tables) == self.n_parts
                {
                    j = self.check_comp(host);
                }
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
                    self.method_indices[i] += n_methods - two - 1;
                    self.calls[i] = self.allow_calls;
                } else if self.second_half_counts[two] < self.method_repeat_limit {
                    self.first_half_counts[one] += 1;
                    if self.first_half_counts[one] >= self.method_repeat_limit {
                        self.n_first_at_max += 1;
                    }
                    if self.n_first_at_max > self.max_methods_at_repeat_limit {
                        self.first_half_counts[one] -= 1;
                        self.n_first_at_max -= 1;
                        self.method_indices[i] += n_methods - two - 1;
                        self.calls[i] = self.allow_calls;
                    } else {
                        self.second_half_counts[two] += 1;
                        if self.second_half_counts[two] >= self.method_repeat_limit {
                            self.n_second_at_max += 1;
                        }
                        if self.n_second_at_max > self.max_methods_at_repeat_limit {
                            self.second_half_counts[two] -= 1;
                            self.n_second_at_max -= 1;
                            self.calls[i] = self.allow_calls;
                        } else {
                            let composite = &tables.composite_methods()[index];
                            let call = Call::from_index(self.calls[i]);
                            let next = self.comp.set_lead(i, start, composite, call, tables);
                            let next_node = tables.node(next);
                            let lead_num = next_node.leadhead_number();
                            if !self.truth_table[lead_num]
                                && (!self.tenors_together || next_node.is_tenors_together())
                            {
                                if self.comp.com(i) >= 2 * i as i32 + min_com_constant {
                                    start = next;
                                    self.truth_table[lead_num] = true;
                                    i += 1;
                                    if self.regen_ptr < 0 {
                                        if self.regen_ptr < -100 {
                                            self.regen_ptr = next_node.regen_offset();
                                            if self.regen_ptr >= 0 {
                                                let r = self.regen_ptr as usize;
                                                self.method_indices[i] = self.method_indices[r];
                                                self.calls[i] = self.calls[r];
                                            }
                                        }
                                    } else {
                                        let r = self.regen_ptr as usize;
                                        self.method_indices[i] = self.method_indices[r];
                                        self.calls[i] = self.calls[r];
                                    }
                                    self.regen_ptr += 1;
                                    continue;
                                } else {
                                    self.reduce_method_counts(one, two);
                                    if one != two {
                                        self.method_indices[i] += n_methods - two - 1;
                                    }
                                    self.calls[i] = self.allow_calls;
                                }
                            } else {
                                self.reduce_method_counts(one, two);
                            }
                        }
                    }
                }
            }

            match self.backtrack_with_calls(i) {
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

    /// Advances the call at slot `i` first, then the method, carrying
    /// exhausted slots upward.
    fn backtrack_with_calls(&mut self, mut i: usize) -> Option<usize> {
        loop {
            self.calls[i] += 1;
            if self.calls[i] <= self.allow_calls {
                return Some(i);
            }
            self.calls[i] = 0;
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

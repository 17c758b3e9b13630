// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Leadhead-only inner loop.
//!
//! Splices at leadheads only: the N diagonal composites instead of the N²
//! table, single-sided method counts, the single-sided COM bound, and
//! calls always enabled (a leadhead-only search without calls has nothing
//! to vary at the half-lead). Slot 0 never advances past method 0: a
//! rotationally sorted composition always starts with the first method,
//! so other starts only produce trivial rotations.

use crate::method::Call;
use crate::search::{Composer, ComposerHost, CHECK_FREQ, REGEN_RESET};
use crate::track::Tracker;

impl Composer<'_> {
    pub(super) fn do_compose_leadhead(&mut self, host: &dyn ComposerHost, tracker: &Tracker) {
        let tables = self.tables;
        let mut start = self.rounds;
        let min_com_constant = self.min_com - self.leads_per_part as i32;
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
                    self.reduce_method_counts_lh(i);
                    if i <= j {
                        break;
                    }
                }
            } else {
                self.counter += 1;
                if self.counter >= CHECK_FREQ && self.check_stats(tracker) {
                    break;
                }

                let one = self.method_indices[i];
                if self.first_half_counts[one] >= self.method_repeat_limit {
                    self.calls[i] = self.allow_calls;
                } else {
                    self.first_half_counts[one] += 1;
                    if self.first_half_counts[one] >= self.method_repeat_limit {
                        self.n_first_at_max += 1;
                    }
                    if self.n_first_at_max > self.max_methods_at_repeat_limit {
                        self.first_half_counts[one] -= 1;
                        self.n_first_at_max -= 1;
                        self.calls[i] = self.allow_calls;
                    } else {
                        let composite = &tables.composite_methods()[self.lh_method_of[one]];
                        let call = Call::from_index(self.calls[i]);
                        let next = self.comp.set_lead(i, start, composite, call, tables);
                        let next_node = tables.node(next);
                        let lead_num = next_node.leadhead_number();
                        if !self.truth_table[lead_num]
                            && (!self.tenors_together || next_node.is_tenors_together())
                        {
                            if self.comp.com(i) >= i as i32 + min_com_constant {
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
                                self.calls[i] = self.allow_calls;
                                self.reduce_method_counts_lh(i);
                            }
                        } else {
                            self.reduce_method_counts_lh(i);
                        }
                    }
                }
            }

            match self.backtrack_leadhead(i) {
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

    /// Single-sided count reduction for the leadhead-only search.
    #[inline]
    fn reduce_method_counts_lh(&mut self, i: usize) {
        let one = self.method_indices[i];
        if self.first_half_counts[one] >= self.method_repeat_limit {
            self.n_first_at_max -= 1;
        }
        self.first_half_counts[one] -= 1;
    }

    /// Call first, then method; slot 0 stops at the first method.
    fn backtrack_leadhead(&mut self, mut i: usize) -> Option<usize> {
        loop {
            self.calls[i] += 1;
            if self.calls[i] <= self.allow_calls {
                return Some(i);
            }
            if i == 0 {
                return None;
            }
            self.calls[i] = 0;
            self.method_indices[i] += 1;
            if self.method_indices[i] < self.n_comp_methods {
                return Some(i);
            }
            self.method_indices[i] = 0;
            i -= 1;
            let lead_num = self
                .tables
                .node(self.comp.lead(i).last_row())
                .leadhead_number();
            self.truth_table[lead_num] = false;
            self.reduce_method_counts_lh(i);
        }
    }
}

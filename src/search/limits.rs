// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Shared search thresholds.
//!
//! The output collector tightens these while the search runs; the driver
//! re-reads them at every candidate. Plain word-sized stores and loads:
//! a momentarily stale threshold only costs a little pruning, never
//! correctness.

use std::sync::atomic::{AtomicI32, Ordering};

/// The minimum score, changes-of-method and balance a composition must
/// reach, plus the method repeat limits derived from the unbalance rule.
#[derive(Debug)]
pub struct SearchLimits {
    min_score: AtomicI32,
    min_com: AtomicI32,
    min_balance: AtomicI32,
    method_repeat_limit: AtomicI32,
    max_methods_at_repeat_limit: AtomicI32,
}

impl SearchLimits {
    pub fn new() -> Self {
        Self {
            min_score: AtomicI32::new(0),
            min_com: AtomicI32::new(0),
            min_balance: AtomicI32::new(1),
            method_repeat_limit: AtomicI32::new(i32::MAX),
            max_methods_at_repeat_limit: AtomicI32::new(i32::MAX),
        }
    }

    pub fn min_score(&self) -> i32 {
        self.min_score.load(Ordering::Relaxed)
    }

    pub fn set_min_score(&self, min: i32) {
        self.min_score.store(min, Ordering::Relaxed);
    }

    pub fn min_com(&self) -> i32 {
        self.min_com.load(Ordering::Relaxed)
    }

    pub fn set_min_com(&self, min: i32) {
        self.min_com.store(min, Ordering::Relaxed);
    }

    pub fn min_balance(&self) -> i32 {
        self.min_balance.load(Ordering::Relaxed)
    }

    pub fn set_min_balance(&self, min: i32) {
        self.min_balance.store(min, Ordering::Relaxed);
    }

    pub fn method_repeat_limit(&self) -> i32 {
        self.method_repeat_limit.load(Ordering::Relaxed)
    }

    pub fn max_methods_at_repeat_limit(&self) -> i32 {
        self.max_methods_at_repeat_limit.load(Ordering::Relaxed)
    }

    pub fn set_repeat_limits_raw(&self, limit: i32, max_at_limit: i32) {
        self.method_repeat_limit.store(limit, Ordering::Relaxed);
        self.max_methods_at_repeat_limit
            .store(max_at_limit, Ordering::Relaxed);
    }

    /// Initial repeat limits: with optimum balance on, every method may
    /// appear at most ⌈leads/methods⌉ times per half, and only the
    /// remainder many methods may reach that ceiling.
    pub fn init_repeat_limits(&self, optimum_balance: bool, leads_per_part: i32, n_methods: i32) {
        if optimum_balance {
            let mut limit = leads_per_part / n_methods;
            let mut max_at = leads_per_part % n_methods;
            if max_at == 0 {
                max_at = n_methods;
            } else {
                limit += 1;
            }
            self.set_repeat_limits_raw(limit, max_at);
        } else {
            self.set_repeat_limits_raw(leads_per_part, n_methods);
        }
    }

    /// Derives repeat limits from an "unbalance" count, the inverse of the
    /// unbalance rule: keeps the search pruned so only compositions with a
    /// method balance good enough for the current top-K are considered.
    pub fn set_repeat_limits(&self, unbalance: i32, leads_per_part: i32, n_methods: i32) {
        if unbalance > n_methods {
            self.set_repeat_limits_raw(unbalance - n_methods, n_methods);
        } else {
            let mut limit = leads_per_part / n_methods;
            let mut max_at = unbalance;
            if unbalance == 0 {
                max_at = n_methods;
            } else {
                limit += 1;
            }
            self.set_repeat_limits_raw(limit, max_at);
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The top-K output collector and heuristic pruning feedback.
//!
//! Compositions stream in from the search in discovery order; the
//! collector keeps the best K by score. Whenever a newcomer pushes the
//! buffer past K, the kept set defines how good a composition now has to
//! be, and the collector writes the tightened minimum score, COM and
//! balance - and the repeat limits derived from the worst kept unbalance -
//! back into the shared [`SearchLimits`]. Pruning therefore tightens
//! monotonically as better compositions are found.

use crate::compose::OutputComp;
use crate::search::{ComposerHost, SearchLimits};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Default number of compositions kept.
pub const DEFAULT_COMPS_TO_KEEP: usize = 10;

/// Bounded best-compositions buffer, guarded by a mutex for concurrent
/// monitor reads.
#[derive(Debug)]
pub struct BestComps {
    comps: Mutex<Vec<OutputComp>>,
    keep: AtomicI32,
    leads_per_part: AtomicI32,
    n_methods: AtomicI32,
    limits: Arc<SearchLimits>,
}

impl BestComps {
    pub fn new(limits: Arc<SearchLimits>) -> Self {
        Self {
            comps: Mutex::new(Vec::new()),
            keep: AtomicI32::new(DEFAULT_COMPS_TO_KEEP as i32),
            leads_per_part: AtomicI32::new(1),
            n_methods: AtomicI32::new(1),
            limits,
        }
    }

    /// Clears the buffer and fixes the search shape the repeat-limit rule
    /// needs. Call before each search.
    pub fn reset(&self, leads_per_part: usize, n_methods: usize, keep: usize) {
        self.comps.lock().clear();
        self.keep.store(keep as i32, Ordering::Relaxed);
        self.leads_per_part
            .store(leads_per_part as i32, Ordering::Relaxed);
        self.n_methods.store(n_methods as i32, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.comps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.lock().is_empty()
    }

    /// Snapshot of the kept compositions, best first.
    pub fn comps(&self) -> Vec<OutputComp> {
        self.comps.lock().clone()
    }

    pub fn get(&self, i: usize) -> Option<OutputComp> {
        self.comps.lock().get(i).cloned()
    }

    /// Re-derives the minimum thresholds from the kept set and stores them
    /// into the shared limits.
    fn tighten_limits(&self, comps: &[OutputComp]) {
        let mut min_score = i32::MAX;
        let mut min_com = i32::MAX;
        let mut min_balance = i32::MAX;
        let mut max_unbalance = 0;
        for comp in comps {
            min_score = min_score.min(comp.score());
            min_com = min_com.min(comp.com());
            min_balance = min_balance.min(comp.balance());
            max_unbalance = max_unbalance.max(comp.unbalance_count());
        }
        self.limits.set_min_score(min_score);
        self.limits.set_min_com(min_com);
        self.limits.set_min_balance(min_balance);
        self.limits.set_repeat_limits(
            max_unbalance,
            self.leads_per_part.load(Ordering::Relaxed),
            self.n_methods.load(Ordering::Relaxed),
        );
    }
}

impl ComposerHost for BestComps {
    fn output_comp(&self, latest: OutputComp) {
        let keep = self.keep.load(Ordering::Relaxed) as usize;
        let mut comps = self.comps.lock();
        let ncomps = comps.len();
        for i in 0..ncomps {
            if latest.score() > comps[i].score() {
                comps.insert(i, latest);
                if ncomps >= keep {
                    comps.pop();
                    self.tighten_limits(&comps);
                }
                return;
            }
        }
        if ncomps < keep {
            comps.push(latest);
        }
    }
}

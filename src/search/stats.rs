// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search statistics, readable from a monitor thread while the search runs.
//!
//! All counters are word-sized atomics written by the single composing
//! thread; a monitor's reads between checks may be stale but are never
//! torn.

use crate::track::Tracker;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Instant;

/// Live counters for one search.
#[derive(Debug)]
pub struct SearchStats {
    n_comps: AtomicU64,
    nodes_searched: AtomicU64,
    comps_checked: AtomicU64,
    nodes_per_sec: AtomicU64,
    comps_per_sec: AtomicU64,
    best_score: AtomicI32,
    best_music: AtomicI32,
    best_com: AtomicI32,
    best_balance: AtomicI32,
    search_secs: AtomicU64,
    /// Progress and wall-clock when the first statistics display fired;
    /// the basis of the time-left estimate.
    time_base: Mutex<Option<(f64, Instant)>>,
}

impl SearchStats {
    pub fn new() -> Self {
        Self {
            n_comps: AtomicU64::new(0),
            nodes_searched: AtomicU64::new(0),
            comps_checked: AtomicU64::new(0),
            nodes_per_sec: AtomicU64::new(0),
            comps_per_sec: AtomicU64::new(0),
            best_score: AtomicI32::new(0),
            best_music: AtomicI32::new(0),
            best_com: AtomicI32::new(0),
            best_balance: AtomicI32::new(0),
            search_secs: AtomicU64::new(0),
            time_base: Mutex::new(None),
        }
    }

    pub(crate) fn reset(&self) {
        self.n_comps.store(0, Ordering::Relaxed);
        self.nodes_searched.store(0, Ordering::Relaxed);
        self.comps_checked.store(0, Ordering::Relaxed);
        self.nodes_per_sec.store(0, Ordering::Relaxed);
        self.comps_per_sec.store(0, Ordering::Relaxed);
        self.best_score.store(0, Ordering::Relaxed);
        self.best_music.store(0, Ordering::Relaxed);
        self.best_com.store(0, Ordering::Relaxed);
        self.best_balance.store(0, Ordering::Relaxed);
        self.search_secs.store(0, Ordering::Relaxed);
        *self.time_base.lock() = None;
    }

    /// Number of true compositions found so far.
    pub fn n_comps(&self) -> u64 {
        self.n_comps.load(Ordering::Relaxed)
    }

    /// Total leads searched.
    pub fn nodes_searched(&self) -> u64 {
        self.nodes_searched.load(Ordering::Relaxed)
    }

    /// Compositions checked for music and proof (only candidates with good
    /// part ends meeting the COM and balance minimums are checked).
    pub fn comps_checked(&self) -> u64 {
        self.comps_checked.load(Ordering::Relaxed)
    }

    /// Instantaneous leads-per-second measure.
    pub fn nodes_per_sec(&self) -> u64 {
        self.nodes_per_sec.load(Ordering::Relaxed)
    }

    /// Instantaneous compositions-checked-per-second measure.
    pub fn comps_per_sec(&self) -> u64 {
        self.comps_per_sec.load(Ordering::Relaxed)
    }

    pub fn best_score(&self) -> i32 {
        self.best_score.load(Ordering::Relaxed)
    }

    pub fn best_music(&self) -> i32 {
        self.best_music.load(Ordering::Relaxed)
    }

    pub fn best_com(&self) -> i32 {
        self.best_com.load(Ordering::Relaxed)
    }

    pub fn best_balance(&self) -> i32 {
        self.best_balance.load(Ordering::Relaxed)
    }

    pub(crate) fn add_comp(&self) {
        self.n_comps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_nodes(&self, nodes: u64) {
        self.nodes_searched.fetch_add(nodes, Ordering::Relaxed);
    }

    pub(crate) fn add_comp_checked(&self) {
        self.comps_checked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_rates(&self, nodes_per_sec: u64, comps_per_sec: u64) {
        self.nodes_per_sec.store(nodes_per_sec, Ordering::Relaxed);
        self.comps_per_sec.store(comps_per_sec, Ordering::Relaxed);
    }

    pub(crate) fn record_bests(&self, score: i32, music: i32, com: i32, balance: i32) {
        self.best_score.fetch_max(score, Ordering::Relaxed);
        self.best_music.fetch_max(music, Ordering::Relaxed);
        self.best_com.fetch_max(com, Ordering::Relaxed);
        self.best_balance.fetch_max(balance, Ordering::Relaxed);
    }

    pub(crate) fn set_search_secs(&self, secs: u64) {
        self.search_secs.store(secs, Ordering::Relaxed);
    }

    pub(crate) fn set_time_base(&self, progress: f64, at: Instant) {
        *self.time_base.lock() = Some((progress, at));
    }

    pub(crate) fn time_base(&self) -> Option<(f64, Instant)> {
        *self.time_base.lock()
    }

    /// Total search time as `h:mm:ss`; only meaningful once the search has
    /// finished.
    pub fn search_time_string(&self) -> String {
        let mut secs = self.search_secs.load(Ordering::Relaxed);
        let mut mins = secs / 60;
        secs -= mins * 60;
        let hours = mins / 60;
        mins -= hours * 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }

    /// Estimated time to completion in hours and minutes. Returns
    /// `>paused<` while paused, an empty string before the first display
    /// interval, and `forever` if no measurable progress has been made.
    pub fn estimate_time_left(&self, tracker: &Tracker) -> String {
        if tracker.is_paused() {
            return ">paused<".to_owned();
        }
        let Some((initial_progress, initial_time)) = self.time_base() else {
            return String::new();
        };
        let proportion_done =
            (tracker.progress() - initial_progress) / (100.0 - initial_progress);
        if proportion_done <= 0.0 {
            return "forever".to_owned();
        }
        let time = initial_time.elapsed().as_secs();
        let total_time = (time as f64 / proportion_done) as u64;
        let mins_left = (total_time.saturating_sub(time) + 30) / 60;
        let hours = mins_left / 60;
        format!("{}h{:02}", hours, mins_left % 60)
    }
}

impl Default for SearchStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bests_are_monotonic() {
        let stats = SearchStats::new();
        stats.record_bests(10, 5, 3, 80);
        stats.record_bests(8, 7, 2, 70);
        assert_eq!(stats.best_score(), 10);
        assert_eq!(stats.best_music(), 7);
        assert_eq!(stats.best_com(), 3);
        assert_eq!(stats.best_balance(), 80);
    }

    #[test]
    fn search_time_formats() {
        let stats = SearchStats::new();
        stats.set_search_secs(3723);
        assert_eq!(stats.search_time_string(), "1:02:03");
    }

    #[test]
    fn time_left_states() {
        let stats = SearchStats::new();
        let tracker = Tracker::new(100);
        assert_eq!(stats.estimate_time_left(&tracker), "");
        tracker.pause();
        assert_eq!(stats.estimate_time_left(&tracker), ">paused<");
        tracker.resume();
        stats.set_time_base(0.0, Instant::now());
        assert_eq!(stats.estimate_time_left(&tracker), "forever");
    }
}

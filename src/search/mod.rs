// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The composing search driver.
//!
//! The [`Composer`] runs the rotationally-sorted depth-first search over
//! compositions: one composite-method choice (and, with calls, one call
//! choice) per lead of the part. Three specialized inner loops cover the
//! half-lead no-calls, half-lead with-calls and leadhead-only searches -
//! one state type with a variant tag, dispatched once at the top, so the
//! hot path never goes through a pointer.
//!
//! # Rotational sort
//!
//! Every cyclic rotation of a composition rings the same rows, so the
//! search enumerates only the lexicographically smallest rotation of each
//! cyclic class. While building a composition, once the current position
//! crosses a rotation point the following method and call choices are
//! *copied* from the start of the composition through the regeneration
//! pointer rather than freely enumerated; a candidate reaching the part
//! end is accepted only when the final backtrack position proves it the
//! canonical representative. With tenors together, rotation points are the
//! tenors-home course ends and the per-node regeneration offsets skip the
//! distance to the next one.
//!
//! # Pruning
//!
//! Branches are cut by: the per-composition leadhead truth bitmap, the
//! tenors-together flag on the destination node, the repeat-count gates on
//! first- and second-half methods, the reachable changes-of-method bound,
//! part-length bounds, and the part-end `n_parts` requirement. The
//! score, COM and balance minimums tighten monotonically as the output
//! collector feeds the current top-K back into [`SearchLimits`].
//!
//! Heavily tuned; benchmark across a range of searches before modifying.

pub mod limits;
pub mod stats;

mod leadhead;
mod no_calls;
mod with_calls;

pub use limits::SearchLimits;
pub use stats::SearchStats;

use crate::compose::{Composition, OutputComp};
use crate::method::Call;
use crate::tables::{NodeId, Tables};
use crate::track::Tracker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

/// Nodes between time/abort checks in the inner loops.
pub const CHECK_FREQ: u32 = 2000;

/// Statistics display refresh interval.
const DISPLAY_INTERVAL: Duration = Duration::from_millis(500);

/// Progress is reported against this total on the tracker.
const TOTAL_DURATION: u64 = 1_000_000;

/// Regeneration pointer sentinel: recompute from the node offset at the
/// next successfully added lead.
const REGEN_RESET: i32 = -1000;

/// Where output compositions get sent. The collector behind this trait may
/// tighten the shared [`SearchLimits`] from inside the callback.
pub trait ComposerHost {
    fn output_comp(&self, comp: OutputComp);
}

/// Errors raised while configuring a search.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("no method with abbreviation '{0}' in the search")]
    UnknownAbbreviation(char),
    #[error("start composition has more leads than the part")]
    SeedTooLong,
    #[error("malformed start composition lead '{0}'")]
    BadSeedLead(String),
    #[error("search needs at least one method")]
    NoMethods,
    #[error("search needs at least one lead per part")]
    NoLeads,
}

/// Which of the three specialized inner loops runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    /// Half-lead spliced, no calls.
    HalfLead,
    /// Half-lead spliced with bobs (and maybe singles).
    HalfLeadCalls,
    /// Leadhead-only spliced, always with at least bobs.
    LeadheadOnly,
}

/// The search driver. Create with [`Composer::new`], adjust options with
/// the setters, then run [`Composer::compose`] on a worker thread and
/// monitor through the [`Tracker`], [`SearchStats`] and [`SearchLimits`]
/// handles.
pub struct Composer<'t> {
    tables: &'t Tables,
    variant: Variant,

    leads_per_part: usize,
    n_parts: usize,
    tenors_together: bool,
    allow_calls: usize,
    min_part_length: u32,
    max_part_length: u32,
    lh_spliced: bool,

    /// Score weighting per change of method.
    com_score: i32,
    /// Score weighting per balance percentage point.
    balance_score: i32,

    // Current thresholds, refreshed from `limits` at every candidate.
    min_score: i32,
    min_balance: i32,
    min_com: i32,
    method_repeat_limit: i32,
    max_methods_at_repeat_limit: i32,

    comp: Composition,
    rounds: NodeId,
    n_methods: usize,
    n_comp_methods: usize,
    /// Composite index -> first-half method index.
    first_half_of: Vec<usize>,
    /// Composite index -> second-half method index.
    second_half_of: Vec<usize>,
    /// Leadhead-only: method index -> diagonal composite index.
    lh_method_of: Vec<usize>,

    method_indices: Vec<usize>,
    calls: Vec<usize>,
    first_half_counts: Vec<i32>,
    second_half_counts: Vec<i32>,
    n_first_at_max: i32,
    n_second_at_max: i32,
    method_counts: Vec<i32>,
    /// Leadhead truth bitmap for the composition being built.
    truth_table: Vec<bool>,
    regen_ptr: i32,

    progress_ratios: Vec<f64>,
    progress_cumulatives: Vec<f64>,

    counter: u32,
    last_time: Instant,
    last_nodes: u64,
    last_comps: u64,
    comps_checked_local: u64,
    composing: bool,

    limits: Arc<SearchLimits>,
    stats: Arc<SearchStats>,
}

impl<'t> Composer<'t> {
    /// Creates a search driver.
    ///
    /// The tables must already carry the methods to splice (the expensive
    /// build passes can still be pending; they must be complete before
    /// [`Composer::compose`] runs). `calls` is 0 for none, 1 for bobs,
    /// 2 for bobs and singles; leadhead-only searches force at least bobs.
    /// `optimum_balance` demands as-equal-as-possible numbers of each
    /// method in both half-lead positions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tables: &'t Tables,
        leads_per_part: usize,
        n_parts: usize,
        tenors_together: bool,
        nice_part_ends: bool,
        optimum_balance: bool,
        lh_only: bool,
        calls: usize,
    ) -> Result<Self, SearchError> {
        let n_methods = tables.n_methods();
        if n_methods == 0 {
            return Err(SearchError::NoMethods);
        }
        if leads_per_part == 0 {
            return Err(SearchError::NoLeads);
        }
        let variant = if lh_only {
            Variant::LeadheadOnly
        } else if calls > 0 {
            Variant::HalfLeadCalls
        } else {
            Variant::HalfLead
        };
        let allow_calls = if lh_only { calls.max(1) } else { calls };

        // Tenors-together searches in up to six parts must bring the
        // tenors home at every part end; seven parts and above instead
        // ring a different coursing pair unaffected in each part.
        let tenors_home_pe = tenors_together && n_parts <= 6;

        let comp = Composition::new(
            tables.methods(),
            tables,
            leads_per_part,
            tenors_home_pe,
            nice_part_ends,
        );
        let limits = Arc::new(SearchLimits::new());
        limits.init_repeat_limits(optimum_balance, leads_per_part as i32, n_methods as i32);

        Ok(Self {
            tables,
            variant,
            leads_per_part,
            n_parts,
            tenors_together,
            allow_calls,
            min_part_length: 0,
            max_part_length: u32::MAX,
            lh_spliced: lh_only,
            com_score: 2,
            balance_score: 1,
            min_score: 0,
            min_balance: 1,
            min_com: 0,
            method_repeat_limit: limits.method_repeat_limit(),
            max_methods_at_repeat_limit: limits.max_methods_at_repeat_limit(),
            comp,
            rounds: tables.rounds_node(),
            n_methods,
            n_comp_methods: 0,
            first_half_of: Vec::new(),
            second_half_of: Vec::new(),
            lh_method_of: Vec::new(),
            method_indices: vec![0; leads_per_part + 1],
            calls: vec![0; leads_per_part + 1],
            first_half_counts: vec![0; n_methods],
            second_half_counts: vec![0; n_methods],
            n_first_at_max: 0,
            n_second_at_max: 0,
            method_counts: vec![0; n_methods],
            truth_table: vec![false; tables.n_leadheads()],
            regen_ptr: 0,
            progress_ratios: Vec::new(),
            progress_cumulatives: Vec::new(),
            counter: 0,
            last_time: Instant::now(),
            last_nodes: 0,
            last_comps: 0,
            comps_checked_local: 0,
            composing: false,
            limits,
            stats: Arc::new(SearchStats::new()),
        })
    }

    /// Shared thresholds handle for the output collector.
    pub fn limits(&self) -> Arc<SearchLimits> {
        Arc::clone(&self.limits)
    }

    /// Replaces the driver's statistics and limits with externally shared
    /// instances, carrying the current threshold values across. Call
    /// before any of the threshold setters.
    pub fn share_state(&mut self, stats: Arc<SearchStats>, limits: Arc<SearchLimits>) {
        limits.set_min_score(self.min_score);
        limits.set_min_balance(self.min_balance);
        limits.set_min_com(self.min_com);
        limits.set_repeat_limits_raw(self.method_repeat_limit, self.max_methods_at_repeat_limit);
        self.stats = stats;
        self.limits = limits;
    }

    /// Shared statistics handle for monitors.
    pub fn stats(&self) -> Arc<SearchStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_leadhead_only(&self) -> bool {
        self.lh_spliced
    }

    /// True while the search is underway (or paused).
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn leads_per_part(&self) -> usize {
        self.leads_per_part
    }

    pub fn n_parts_wanted(&self) -> usize {
        self.n_parts
    }

    pub fn set_com_score(&mut self, com_score: i32) {
        self.com_score = com_score;
    }

    pub fn set_balance_score(&mut self, balance_score: i32) {
        self.balance_score = balance_score;
    }

    /// Minimum part length; only meaningful when methods of different lead
    /// lengths are present.
    pub fn set_min_part_length(&mut self, min: u32) {
        self.min_part_length = min;
    }

    pub fn set_max_part_length(&mut self, max: u32) {
        self.max_part_length = max;
    }

    /// Minimum score a composition must reach before being output; may be
    /// tightened asynchronously through [`Composer::limits`] while
    /// composing.
    pub fn set_min_score(&mut self, min: i32) {
        self.min_score = min;
        self.limits.set_min_score(min);
    }

    pub fn set_min_balance(&mut self, min: i32) {
        self.min_balance = min;
        self.limits.set_min_balance(min);
    }

    pub fn set_min_com(&mut self, min: i32) {
        self.min_com = min;
        self.limits.set_min_com(min);
    }

    /// Seeds the search with a start composition: whitespace-separated
    /// leads, `XY` plus an optional `-`/`s` call marker for half-lead
    /// spliced, or `X` plus a marker for leadhead-only. The seed must
    /// itself be a lowest rotation; the driver does not re-sort it.
    pub fn set_start_comp(&mut self, seed: &str) -> Result<(), SearchError> {
        let mut i = 0;
        for token in seed.split_whitespace() {
            if i >= self.leads_per_part {
                return Err(SearchError::SeedTooLong);
            }
            let mut chars = token.chars();
            let c1 = chars
                .next()
                .ok_or_else(|| SearchError::BadSeedLead(token.to_owned()))?;
            let m1 = self.find_method(c1)?;
            let rest: String = chars.collect();
            let mut rest = rest.chars();
            if !self.lh_spliced {
                let c2 = rest
                    .next()
                    .ok_or_else(|| SearchError::BadSeedLead(token.to_owned()))?;
                let m2 = self.find_method(c2)?;
                self.method_indices[i] = m1 * self.n_methods + m2;
            } else {
                self.method_indices[i] = m1;
            }
            match rest.next() {
                None => {}
                Some('-') => self.calls[i] = Call::Bob.index(),
                Some('s') => self.calls[i] = Call::Single.index(),
                Some(_) => return Err(SearchError::BadSeedLead(token.to_owned())),
            }
            i += 1;
        }
        Ok(())
    }

    fn find_method(&self, abbrev: char) -> Result<usize, SearchError> {
        self.tables
            .methods()
            .iter()
            .position(|m| m.abbrev() == abbrev)
            .ok_or(SearchError::UnknownAbbreviation(abbrev))
    }

    /// Runs the search. The tables must be fully populated, with the
    /// regeneration offsets prepared for this search's tenors-together
    /// setting. Blocks until exhaustion or abort; found compositions are
    /// pushed to `host` as they appear.
    pub fn compose(&mut self, host: &dyn ComposerHost, tracker: &Tracker) {
        self.composing = true;
        tracker.set_total(TOTAL_DURATION);
        tracker.set_progress(0);
        tracker.set_job_name("Composing");
        info!(
            methods = self.n_methods,
            leads_per_part = self.leads_per_part,
            parts = self.n_parts,
            variant = ?self.variant,
            "composing starts"
        );

        if self.lh_spliced {
            self.n_comp_methods = self.n_methods;
            self.lh_method_of = (0..self.n_methods)
                .map(|j| j * self.n_methods + j)
                .collect();
        } else {
            self.n_comp_methods = self.tables.n_composite_methods();
            self.first_half_of = (0..self.n_comp_methods)
                .map(|i| i / self.n_methods)
                .collect();
            self.second_half_of = (0..self.n_comp_methods)
                .map(|i| i % self.n_methods)
                .collect();
        }

        self.calc_progress_ratios();

        self.truth_table.fill(false);
        if self.n_parts > 1 {
            let rounds_lh = self.tables.node(self.rounds).leadhead_number();
            self.truth_table[rounds_lh] = true;
        }

        self.stats.reset();
        self.counter = 0;
        self.last_nodes = 0;
        self.last_comps = 0;
        self.comps_checked_local = 0;
        let start_time = Instant::now();
        self.last_time = start_time;
        // Negative so a seeded start composition is consumed before the
        // regeneration copying begins.
        self.regen_ptr = -(self.leads_per_part as i32);

        match self.variant {
            Variant::HalfLead => self.do_compose_no_calls(host, tracker),
            Variant::HalfLeadCalls => self.do_compose_with_calls(host, tracker),
            Variant::LeadheadOnly => self.do_compose_leadhead(host, tracker),
        }

        self.stats.add_nodes(self.counter as u64);
        self.counter = 0;
        self.stats
            .set_search_secs(start_time.elapsed().as_secs());
        if !tracker.is_aborted() {
            info!(
                found = self.stats.n_comps(),
                best_balance = self.stats.best_balance(),
                best_com = self.stats.best_com(),
                best_score = self.stats.best_score(),
                nodes = self.stats.nodes_searched(),
                time = %self.stats.search_time_string(),
                "search complete"
            );
            tracker.set_progress(TOTAL_DURATION);
        }
        self.composing = false;
    }

    /// Part length within the configured bounds; only valid at a part end.
    #[inline]
    pub(super) fn is_length_good(&self) -> bool {
        let part_len = self.comp.part_length(self.leads_per_part - 1);
        part_len >= self.min_part_length && part_len <= self.max_part_length
    }

    /// Checks a candidate for balance, COM, rotations, music and truth; a
    /// passing composition is scored and output. Returns the lead to
    /// backtrack to: normally the last lead of the part, but further when
    /// the composition proved false in the first part.
    pub(super) fn check_comp(&mut self, host: &dyn ComposerHost) -> usize {
        let balance = self.calc_method_balance();
        let com = self.comp.part_com(self.tables);
        if balance >= self.min_balance && com >= self.min_com && self.comp.check_rots(self.tables)
        {
            self.comps_checked_local += 1;
            self.stats.add_comp_checked();
            let mut score = com * self.com_score + balance * self.balance_score;
            let min_music = self.min_score - score;
            let music = self.comp.calc_music_rots(min_music, self.tables);
            if music > 0 {
                score += music;
                self.stats.record_bests(score, music, com, balance);
                self.stats.add_comp();
                host.output_comp(self.comp.output_comp(score, self.lh_spliced, self.tables));
                // The collector may have tightened the thresholds.
                self.refresh_limits();
            } else if music < 0 {
                // False in the first part: jump-backtrack to the offender.
                if let Some(lead) = self.comp.first_part_false_lead() {
                    return lead;
                }
            }
        }
        self.leads_per_part - 1
    }

    pub(super) fn refresh_limits(&mut self) {
        self.min_score = self.limits.min_score();
        self.min_balance = self.limits.min_balance();
        self.min_com = self.limits.min_com();
        self.method_repeat_limit = self.limits.method_repeat_limit();
        self.max_methods_at_repeat_limit = self.limits.max_methods_at_repeat_limit();
    }

    /// Periodic housekeeping: banks the node counter, honours pause and
    /// abort, refreshes the statistics display. Returns true on abort.
    pub(super) fn check_stats(&mut self, tracker: &Tracker) -> bool {
        self.stats.add_nodes(self.counter as u64);
        self.counter = 0;
        if tracker.is_paused() {
            let pause_start = Instant::now();
            tracker.wait_for_resume();
            // Keep the time-left estimate honest: paused time doesn't count.
            if let Some((progress, base)) = self.stats.time_base() {
                self.stats.set_time_base(progress, base + pause_start.elapsed());
            }
            self.last_time = Instant::now();
        }
        if tracker.is_aborted() {
            return true;
        }
        let now = Instant::now();
        let dur = now.duration_since(self.last_time);
        if dur > DISPLAY_INTERVAL {
            let progress = self.composing_progress();
            tracker.set_progress((progress * TOTAL_DURATION as f64) as u64);
            let millis = dur.as_millis().max(1) as u64;
            let nodes = self.stats.nodes_searched();
            let nodes_per_sec = (nodes - self.last_nodes) * 1000 / millis;
            let comps_per_sec = (self.comps_checked_local - self.last_comps) * 1000 / millis;
            self.stats.set_rates(nodes_per_sec, comps_per_sec);
            self.last_nodes = nodes;
            self.last_comps = self.comps_checked_local;
            self.last_time = now;
            if self.stats.time_base().is_none() {
                self.stats.set_time_base(tracker.progress(), now);
            }
            self.refresh_limits();
        }
        false
    }

    /// Post-decrement method counts, maintaining the at-limit tallies.
    #[inline]
    pub(super) fn reduce_method_counts(&mut self, one: usize, two: usize) {
        if self.first_half_counts[one] >= self.method_repeat_limit {
            self.n_first_at_max -= 1;
        }
        self.first_half_counts[one] -= 1;
        if self.second_half_counts[two] >= self.method_repeat_limit {
            self.n_second_at_max -= 1;
        }
        self.second_half_counts[two] -= 1;
    }

    /// Method balance percentage 0..=100. For half-lead compositions the
    /// overall method distribution and the worse half-lead's distribution
    /// blend 2:1; any missing method scores zero outright. Sets the
    /// composition's balance and unbalance as a side effect.
    pub(super) fn calc_method_balance(&mut self) -> i32 {
        if self.variant == Variant::LeadheadOnly {
            return self.calc_method_balance_lh();
        }
        let n = self.n_methods as i32;
        let leads = self.leads_per_part as i32;
        for i in 0..self.n_methods {
            self.method_counts[i] = self.first_half_counts[i] + self.second_half_counts[i];
        }
        let mut balance = calc_method_distribution(&self.method_counts, (leads * 2) as f64);
        if balance > 0 {
            // The half-lead distributions feed the balance pruner, so they
            // are measured through the unbalance counts.
            let min_rep = 1 + leads / n;
            let unbalance = calc_unbalance(&self.first_half_counts, min_rep)
                .max(calc_unbalance(&self.second_half_counts, min_rep));
            let min_at_min_rep = leads % n;
            let bal_max = leads - min_rep + n - min_at_min_rep;
            let mut half_lead_balance = leads + n - unbalance;
            if unbalance <= n {
                half_lead_balance -= min_rep;
            }
            // Degenerate single-method searches have no half-lead spread
            // to measure (bal_max collapses to zero); keep the overall
            // distribution alone.
            if bal_max > 0 {
                balance = balance * 67 / 100 + half_lead_balance * 33 / bal_max;
            }
            self.comp.set_balance(balance, unbalance);
        }
        balance
    }

    /// Leadhead-only balance: the single-sided distribution; 100 means a
    /// perfect balance of all methods, 0 means one or more missing.
    fn calc_method_balance_lh(&mut self) -> i32 {
        let balance =
            calc_method_distribution(&self.first_half_counts, self.leads_per_part as f64);
        if balance > 0 {
            let min_rep = 1 + self.leads_per_part as i32 / self.n_methods as i32;
            let unbalance = calc_unbalance(&self.first_half_counts, min_rep);
            self.comp.set_balance(balance, unbalance);
        }
        balance
    }

    /// Fraction of the search space covered, 0..1. The first slot is
    /// scaled through the precomputed ratio table to compensate for the
    /// rotational sort exhausting later first choices exponentially
    /// faster.
    fn composing_progress(&self) -> f64 {
        let j = self.method_indices[0];
        let mut scale = self.progress_ratios[j];
        let mut progress = self.progress_cumulatives[j];
        scale /= (self.allow_calls + 1) as f64;
        progress += self.calls[0] as f64 * scale;
        for j in 1..self.leads_per_part {
            scale /= self.n_comp_methods as f64;
            progress += self.method_indices[j] as f64 * scale;
            scale /= (self.allow_calls + 1) as f64;
            progress += self.calls[j] as f64 * scale;
            if scale * TOTAL_DURATION as f64 <= 1.0 {
                break;
            }
        }
        progress
    }

    /// Precomputes the first-slot progress ratios so the reported fraction
    /// advances approximately uniformly in time.
    fn calc_progress_ratios(&mut self) {
        let n_comp = self.n_comp_methods;
        self.progress_ratios = vec![0.0; n_comp];
        self.progress_cumulatives = vec![0.0; n_comp];
        // 1-spliced is a special case: ordinary linear progress.
        if n_comp == 1 {
            self.progress_ratios[0] = 1.0;
            return;
        }
        let n = (self.leads_per_part - 1) as f64;
        for i in 0..n_comp - 1 {
            let x = (n_comp - i - 1) as f64;
            let scale = 1.0 + (n / x + n * (n - 1.0) / (2.0 * x * x));
            self.progress_ratios[i] = 1.0 - 1.0 / scale;
        }
        self.progress_ratios[n_comp - 1] = self.progress_ratios[n_comp - 2];

        // Collapse subsequent ratios in boundary-sized groups.
        let boundary = if self.tenors_together {
            n_comp
        } else if self.lh_spliced {
            1
        } else {
            self.n_methods
        };
        let mut scale = 1.0;
        let mut i = 0;
        while i < n_comp {
            for j in 0..boundary / 2 {
                self.progress_ratios.swap(i + j, i + boundary - j - 1);
            }
            for j in 0..boundary {
                self.progress_ratios[i + j] *= scale;
            }
            scale *= self.progress_ratios[i + boundary - 1];
            i += boundary;
        }

        let total: f64 = self.progress_ratios.iter().sum();
        let mut cum = total;
        for i in (0..n_comp).rev() {
            cum -= self.progress_ratios[i];
            self.progress_cumulatives[i] = cum / total;
            self.progress_ratios[i] /= total;
        }
        self.progress_cumulatives[0] = 0.0;
    }
}

/// Overall measure of method distribution: the product over methods of
/// each count's deviation factor from the optimum, as a percentage. Any
/// absent method zeroes the whole measure.
fn calc_method_distribution(counts: &[i32], max_methods: f64) -> i32 {
    let perfect = max_methods / counts.len() as f64;
    let mut balance = 1.0;
    for &count in counts.iter().rev() {
        if count == 0 {
            balance = 0.0;
            break;
        }
        let deviation = (perfect - count as f64).abs();
        balance *= 1.0 - deviation / max_methods;
    }
    (balance * 100.0) as i32
}

/// An "unbalance" count: the higher, the worse. If no method exceeds the
/// minimum possible repeat count, the number of methods at that count;
/// otherwise the method count plus the repeats of the most common method,
/// which always dominates the first form.
fn calc_unbalance(counts: &[i32], min_rep: i32) -> i32 {
    let mut max = 0;
    let mut n_at_max = 0;
    for &count in counts.iter().rev() {
        if count > 0 {
            if count == max {
                n_at_max += 1;
            } else if count > max {
                max = count;
                n_at_max = 1;
            }
        }
    }
    if max < min_rep {
        0
    } else if max == min_rep {
        n_at_max
    } else {
        counts.len() as i32 + max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::standard;

    fn tables_for(methods: Vec<crate::method::Method>) -> Tables {
        let tracker = Tracker::new(100);
        let mut tables = Tables::new();
        tables.build_node_table(&tracker);
        tables.set_methods(methods);
        tables.prepare_methods(&tracker).unwrap();
        tables.prepare_music(&tracker);
        tables.prepare_lead_music(&tracker);
        tables
    }

    #[test]
    fn distribution_rewards_evenness() {
        assert_eq!(calc_method_distribution(&[4, 4], 8.0), 100);
        assert_eq!(calc_method_distribution(&[8, 0], 8.0), 0);
        let uneven = calc_method_distribution(&[6, 2], 8.0);
        assert!(uneven > 0 && uneven < 100, "{}", uneven);
    }

    #[test]
    fn unbalance_counts() {
        // Nobody above the minimum: count the methods at it.
        assert_eq!(calc_unbalance(&[4, 4], 5), 0);
        assert_eq!(calc_unbalance(&[5, 3], 5), 1);
        assert_eq!(calc_unbalance(&[5, 5], 5), 2);
        // Above the minimum: methods + repeats of the most common.
        assert_eq!(calc_unbalance(&[7, 1], 5), 2 + 7);
    }

    #[test]
    fn seed_parsing_half_lead() {
        let tables = tables_for(vec![standard::cambridge(), standard::yorkshire()]);
        let mut composer = Composer::new(&tables, 8, 5, true, false, false, false, 1).unwrap();
        composer.set_start_comp("CC YC-").unwrap();
        assert_eq!(composer.method_indices[0], 0); // C*2+C = 0
        assert_eq!(composer.method_indices[1], 2); // Y*2+C = 2
        assert_eq!(composer.calls[1], Call::Bob.index());
        assert!(matches!(
            composer.set_start_comp("CC ZC"),
            Err(SearchError::UnknownAbbreviation('Z'))
        ));
    }

    #[test]
    fn seed_parsing_leadhead_only() {
        let tables = tables_for(vec![standard::cambridge(), standard::yorkshire()]);
        let mut composer = Composer::new(&tables, 4, 5, true, false, false, true, 0).unwrap();
        // Leadhead-only forces at least bobs on.
        assert_eq!(composer.allow_calls, 1);
        composer.set_start_comp("C Ys").unwrap();
        assert_eq!(composer.method_indices[0], 0);
        assert_eq!(composer.method_indices[1], 1);
        assert_eq!(composer.calls[1], Call::Single.index());
    }

    #[test]
    fn progress_ratios_normalise() {
        let tables = tables_for(vec![standard::cambridge(), standard::yorkshire()]);
        let mut composer = Composer::new(&tables, 8, 5, false, false, false, false, 0).unwrap();
        composer.n_comp_methods = 4;
        composer.calc_progress_ratios();
        let total: f64 = composer.progress_ratios.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(composer.progress_cumulatives[0], 0.0);
        // Cumulatives are nondecreasing.
        for w in composer.progress_cumulatives.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }
}

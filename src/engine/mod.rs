// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The composing engine facade.
//!
//! [`Engine`] owns the tables and the search's shared state, and gives a
//! host everything it needs: a method library sorted by abbreviation, the
//! current splice set, the music definitions, search parameter handling
//! (including the initial minimum-COM derivation and the default start
//! seed), the table-build passes run as delegate jobs of one master
//! tracker, and the top-K collector with heuristic pruning feedback.
//!
//! [`Engine::compose`] runs synchronously; hosts that want a responsive
//! surface run it on a worker thread and watch through a
//! [`SearchMonitor`] taken beforehand:
//!
//! ```no_run
//! use spliced_search::engine::{ComposeParams, Engine};
//!
//! let mut engine = Engine::new();
//! engine.build_node_table();
//! let monitor = engine.monitor();
//! let worker = std::thread::spawn(move || {
//!     let params = ComposeParams {
//!         leads_per_part: 8,
//!         parts: 5,
//!         ..ComposeParams::default()
//!     };
//!     engine.compose(&params).expect("search failed to start");
//!     engine
//! });
//! let status = monitor.status();
//! println!("{} {}%", status.job_name, status.progress);
//! monitor.tracker().abort();
//! let _engine = worker.join().expect("worker panicked");
//! ```

pub mod collector;

pub use collector::{BestComps, DEFAULT_COMPS_TO_KEEP};

use crate::method::library::{LibraryEntry, MAX_NAME};
use crate::method::{standard, Method, MethodError};
use crate::music::{default_music, MusicDef};
use crate::search::{Composer, SearchError, SearchLimits, SearchStats};
use crate::tables::{TableError, Tables};
use crate::track::Tracker;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Which calls a search may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calls {
    #[default]
    None,
    Bobs,
    BobsAndSingles,
}

impl Calls {
    /// The number of non-plain call kinds allowed, as the driver counts
    /// them.
    pub fn count(self) -> usize {
        match self {
            Calls::None => 0,
            Calls::Bobs => 1,
            Calls::BobsAndSingles => 2,
        }
    }
}

/// Errors surfaced by the engine before a search starts.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Method(#[from] MethodError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("cannot compose yet - table building still in progress")]
    TablesNotBuilt,
    #[error("the abbreviation {0} is already used")]
    AbbreviationInUse(char),
    #[error("no method at library index {0}")]
    NoSuchLibraryMethod(usize),
}

/// The search-configuration record.
#[derive(Debug, Clone)]
pub struct ComposeParams {
    pub leads_per_part: usize,
    pub parts: usize,
    pub tenors_together: bool,
    pub nice_part_ends: bool,
    /// Enforce optimum half-lead method balance (ATW).
    pub optimum_balance: bool,
    /// Start from the maximum possible COM instead of the minimum viable.
    pub max_com: bool,
    pub leadhead_only: bool,
    pub calls: Calls,
    pub min_score: i32,
    /// Minimum changes of method per part; derived from the method and
    /// lead counts when absent.
    pub min_com: Option<i32>,
    pub min_balance: i32,
    /// Part length bounds; derived from the shortest and longest lead
    /// lengths when absent.
    pub min_part_length: Option<u32>,
    pub max_part_length: Option<u32>,
    /// Start-composition seed; must be a lowest rotation. A default seed
    /// is derived for half-lead searches with at least two methods.
    pub start_comp: Option<String>,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            leads_per_part: 1,
            parts: 1,
            tenors_together: true,
            nice_part_ends: false,
            optimum_balance: false,
            max_com: false,
            leadhead_only: false,
            calls: Calls::None,
            min_score: 0,
            min_com: None,
            min_balance: 1,
            min_part_length: None,
            max_part_length: None,
            start_comp: None,
        }
    }
}

/// A point-in-time view of a running (or finished) search.
#[derive(Debug, Clone)]
pub struct SearchStatus {
    pub job_name: String,
    /// 0..=100.
    pub progress: f64,
    pub finished: bool,
    pub error: Option<String>,
    pub aborted: bool,
    pub n_comps: u64,
    pub nodes_per_sec: u64,
    pub comps_per_sec: u64,
    pub best_score: i32,
    pub best_music: i32,
    pub best_com: i32,
    pub best_balance: i32,
    pub time_left: String,
    pub search_time: String,
}

/// Cloneable monitoring handle, valid across the engine's lifetime.
#[derive(Debug, Clone)]
pub struct SearchMonitor {
    tracker: Arc<Tracker>,
    stats: Arc<SearchStats>,
    comps: Arc<BestComps>,
}

impl SearchMonitor {
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn best_comps(&self) -> &BestComps {
        &self.comps
    }

    pub fn status(&self) -> SearchStatus {
        SearchStatus {
            job_name: self.tracker.job_name(),
            progress: self.tracker.progress(),
            finished: self.tracker.is_finished(),
            error: self.tracker.error_msg(),
            aborted: self.tracker.is_aborted(),
            n_comps: self.stats.n_comps(),
            nodes_per_sec: self.stats.nodes_per_sec(),
            comps_per_sec: self.stats.comps_per_sec(),
            best_score: self.stats.best_score(),
            best_music: self.stats.best_music(),
            best_com: self.stats.best_com(),
            best_balance: self.stats.best_balance(),
            time_left: self.stats.estimate_time_left(&self.tracker),
            search_time: self.stats.search_time_string(),
        }
    }
}

/// The half-lead spliced composing engine.
pub struct Engine {
    tracker: Arc<Tracker>,
    tables: Tables,
    library: Vec<Method>,
    methods: Vec<Method>,
    music: Vec<MusicDef>,
    com_score: i32,
    balance_score: i32,
    n_comps_to_keep: usize,
    limits: Arc<SearchLimits>,
    stats: Arc<SearchStats>,
    best: Arc<BestComps>,
}

impl Engine {
    /// A new engine with the standard library, the classic four-method
    /// splice set and the default music. The node table is not built yet;
    /// call [`Engine::build_node_table`] (typically on a worker thread)
    /// before composing.
    pub fn new() -> Self {
        let mut library = standard::all();
        library.sort_by_key(Method::abbrev);
        let methods = vec![
            standard::cambridge(),
            standard::yorkshire(),
            standard::lincolnshire(),
            standard::superlative(),
        ];
        let mut tables = Tables::new();
        tables.set_methods(methods.clone());
        let limits = Arc::new(SearchLimits::new());
        Self {
            tracker: Arc::new(Tracker::new(100)),
            tables,
            library,
            methods,
            music: default_music(),
            com_score: 2,
            balance_score: 1,
            n_comps_to_keep: DEFAULT_COMPS_TO_KEEP,
            stats: Arc::new(SearchStats::new()),
            best: Arc::new(BestComps::new(Arc::clone(&limits))),
            limits,
        }
    }

    /// Builds the 40320-node table; a one-off cost per engine.
    pub fn build_node_table(&mut self) {
        let tracker = Arc::clone(&self.tracker);
        self.tables.build_node_table(&tracker);
    }

    pub fn is_built(&self) -> bool {
        self.tables.is_built()
    }

    pub fn monitor(&self) -> SearchMonitor {
        SearchMonitor {
            tracker: Arc::clone(&self.tracker),
            stats: Arc::clone(&self.stats),
            comps: Arc::clone(&self.best),
        }
    }

    pub fn tracker(&self) -> Arc<Tracker> {
        Arc::clone(&self.tracker)
    }

    pub fn best_comps(&self) -> Arc<BestComps> {
        Arc::clone(&self.best)
    }

    // ----------------------------------------------------------------
    // Library management
    // ----------------------------------------------------------------

    pub fn library(&self) -> &[Method] {
        &self.library
    }

    /// Restores the standard method library.
    pub fn reset_library(&mut self) {
        self.library = standard::all();
        self.library.sort_by_key(Method::abbrev);
    }

    /// Adds (or, matched by name, replaces) a library method. A method
    /// already in the current splice set is updated there too.
    pub fn add_method_to_library(
        &mut self,
        name: &str,
        abbrev: char,
        pn: &str,
    ) -> Result<(), EngineError> {
        let name = name.replace(crate::music::SEPARATOR, " ");
        let method = Method::with_abbrev(&name, abbrev, pn)?;
        let existing = self.library.iter().position(|m| m == &method);
        if self
            .library
            .iter()
            .enumerate()
            .any(|(i, m)| Some(i) != existing && m.abbrev() == abbrev)
        {
            return Err(EngineError::AbbreviationInUse(abbrev));
        }
        if let Some(old) = existing {
            self.library.remove(old);
            if let Some(i) = self.methods.iter().position(|m| m == &method) {
                self.methods[i] = method.clone();
                self.methods_changed();
            }
        }
        let at = self
            .library
            .iter()
            .position(|m| abbrev < m.abbrev())
            .unwrap_or(self.library.len());
        self.library.insert(at, method);
        Ok(())
    }

    /// Validates and adds one parsed Microsiril library line under the
    /// given abbreviation.
    pub fn add_library_entry(
        &mut self,
        entry: &LibraryEntry,
        abbrev: char,
    ) -> Result<(), EngineError> {
        self.add_method_to_library(&entry.name, abbrev, &entry.coded_notation())
    }

    pub fn remove_library_method(&mut self, i: usize) {
        if i < self.library.len() {
            self.library.remove(i);
        }
    }

    // ----------------------------------------------------------------
    // Current splice set
    // ----------------------------------------------------------------

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Display form of one current method: abbreviation and (truncated)
    /// name.
    pub fn method_display(&self, i: usize) -> String {
        let m = &self.methods[i];
        let mut name = m.name().to_owned();
        if name.len() > MAX_NAME {
            name = format!("{}...", &name[..MAX_NAME - 1]);
        }
        format!("{} {}", m.abbrev(), name)
    }

    /// Adds the library method at `i` to the splice set.
    pub fn add_method(&mut self, i: usize) -> Result<(), EngineError> {
        let method = self
            .library
            .get(i)
            .cloned()
            .ok_or(EngineError::NoSuchLibraryMethod(i))?;
        self.methods.push(method);
        self.methods_changed();
        Ok(())
    }

    pub fn remove_method(&mut self, i: usize) {
        if i < self.methods.len() {
            self.methods.remove(i);
            self.methods_changed();
        }
    }

    pub fn is_method_in_comp(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name() == name)
    }

    /// Lead length of the shortest method in the splice set.
    pub fn shortest_lead(&self) -> usize {
        self.methods
            .iter()
            .map(Method::lead_length)
            .min()
            .unwrap_or(0)
    }

    /// Lead length of the longest method in the splice set.
    pub fn longest_lead(&self) -> usize {
        self.methods
            .iter()
            .map(Method::lead_length)
            .max()
            .unwrap_or(0)
    }

    fn methods_changed(&mut self) {
        self.tables.set_methods(self.methods.clone());
    }

    // ----------------------------------------------------------------
    // Music management
    // ----------------------------------------------------------------

    pub fn music(&self) -> &[MusicDef] {
        &self.music
    }

    pub fn reset_music(&mut self) {
        self.music = default_music();
        self.music_changed();
    }

    /// Adds a music definition, replacing any existing one of the same
    /// name (case-insensitive).
    pub fn add_music(&mut self, name: &str, score: i32, matches: &str) {
        let def = MusicDef::parse(name, score, matches);
        match self
            .music
            .iter()
            .position(|m| m.name().eq_ignore_ascii_case(def.name()))
        {
            Some(i) => self.music[i] = def,
            None => self.music.push(def),
        }
        self.music_changed();
    }

    pub fn remove_music(&mut self, i: usize) {
        if i < self.music.len() {
            self.music.remove(i);
            self.music_changed();
        }
    }

    fn music_changed(&mut self) {
        self.tables.set_music(self.music.clone());
    }

    // ----------------------------------------------------------------
    // Scoring configuration
    // ----------------------------------------------------------------

    pub fn com_score(&self) -> i32 {
        self.com_score
    }

    pub fn set_com_score(&mut self, com_score: i32) {
        self.com_score = com_score;
    }

    pub fn balance_score(&self) -> i32 {
        self.balance_score
    }

    pub fn set_balance_score(&mut self, balance_score: i32) {
        self.balance_score = balance_score;
    }

    pub fn n_comps_to_keep(&self) -> usize {
        self.n_comps_to_keep
    }

    pub fn set_n_comps_to_keep(&mut self, n: usize) {
        self.n_comps_to_keep = n.max(1);
    }

    // ----------------------------------------------------------------
    // Composing
    // ----------------------------------------------------------------

    /// Initial minimum changes of method: without max-COM, the smallest
    /// value that still lets every method into the part; with it, the
    /// maximum achievable (two-method leadhead splices with an odd lead
    /// count cannot avoid one repeated boundary).
    fn initial_min_com(&self, params: &ComposeParams) -> i32 {
        let n_methods = self.methods.len() as i32;
        let n_leads = params.leads_per_part as i32;
        let max_com = params.max_com && n_methods >= 2;
        if params.leadhead_only {
            if max_com {
                if n_methods == 2 && n_leads & 1 == 1 {
                    n_leads - 1
                } else {
                    n_leads
                }
            } else {
                n_methods - 1
            }
        } else if max_com {
            n_leads * 2
        } else {
            n_methods.min(n_leads + 2)
        }
    }

    /// Runs the whole job synchronously: the outstanding table passes, the
    /// regeneration offsets, and the search itself, as delegate jobs of
    /// the engine tracker. Compositions accumulate in
    /// [`Engine::best_comps`]; progress, abort and pause go through the
    /// tracker.
    pub fn compose(&mut self, params: &ComposeParams) -> Result<(), EngineError> {
        if !self.tables.is_built() {
            return Err(EngineError::TablesNotBuilt);
        }
        self.tracker.set_total(100);
        self.tracker.set_progress(0);

        let passes: [fn(&mut Tables, &Tracker) -> Result<(), TableError>; 3] = [
            |t, d| t.prepare_methods(d),
            |t, d| {
                t.prepare_music(d);
                Ok(())
            },
            |t, d| {
                t.prepare_lead_music(d);
                Ok(())
            },
        ];
        for pass in passes.iter() {
            if self.tracker.is_aborted() {
                return Ok(());
            }
            let delegate = Arc::new(Tracker::new(100));
            self.tracker.start_delegate_job(Arc::clone(&delegate), 1);
            let result = pass(&mut self.tables, &delegate);
            self.tracker.end_delegate_job();
            result?;
        }
        if self.tracker.is_aborted() {
            return Ok(());
        }
        self.tables.prepare_regen_offsets(params.tenors_together);

        let min_part_length = params
            .min_part_length
            .unwrap_or((self.shortest_lead() * params.leads_per_part) as u32);
        let max_part_length = params
            .max_part_length
            .unwrap_or((self.longest_lead() * params.leads_per_part) as u32);
        let min_com = params
            .min_com
            .unwrap_or_else(|| self.initial_min_com(params));

        self.best.reset(
            params.leads_per_part,
            self.methods.len(),
            self.n_comps_to_keep,
        );

        let mut composer = Composer::new(
            &self.tables,
            params.leads_per_part,
            params.parts,
            params.tenors_together,
            params.nice_part_ends,
            params.optimum_balance,
            params.leadhead_only,
            params.calls.count(),
        )?;
        composer.share_state(Arc::clone(&self.stats), Arc::clone(&self.limits));
        composer.set_com_score(self.com_score);
        composer.set_balance_score(self.balance_score);
        composer.set_min_part_length(min_part_length);
        composer.set_max_part_length(max_part_length);
        composer.set_min_balance(params.min_balance);
        composer.set_min_score(params.min_score);
        composer.set_min_com(min_com);
        match &params.start_comp {
            Some(seed) => composer.set_start_comp(seed)?,
            None => {
                // Rotationally sorted searches start e.g. CC YC, not CC CC.
                if !params.leadhead_only && self.methods.len() > 1 {
                    let a = self.methods[0].abbrev();
                    let b = self.methods[1].abbrev();
                    let seed = format!("{a}{a} {b}{a}");
                    composer.set_start_comp(&seed)?;
                }
            }
        }
        info!(min_com, min_part_length, max_part_length, "search configured");

        let delegate = Arc::new(Tracker::new(100));
        self.tracker.start_delegate_job(Arc::clone(&delegate), 97);
        composer.compose(&*self.best, &delegate);
        self.tracker.end_delegate_job();
        Ok(())
    }

    /// Renders the kept compositions, best first.
    pub fn all_comps_string(&self) -> String {
        let comps = self.best.comps();
        if comps.is_empty() {
            return "No results".to_owned();
        }
        comps
            .iter()
            .enumerate()
            .map(|(i, c)| c.render(&format!(", gen. spliced-search (No. {})", i + 1)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_is_sorted_by_abbreviation() {
        let engine = Engine::new();
        let abbrevs: Vec<char> = engine.library().iter().map(Method::abbrev).collect();
        let mut sorted = abbrevs.clone();
        sorted.sort_unstable();
        assert_eq!(abbrevs, sorted);
        assert_eq!(engine.library().len(), 13);
        assert_eq!(engine.methods().len(), 4);
    }

    #[test]
    fn abbreviation_conflicts_are_rejected() {
        let mut engine = Engine::new();
        let err = engine.add_method_to_library("Crayford", 'C', "x38x14x58x16x12x38x14x78 l12");
        assert!(matches!(err, Err(EngineError::AbbreviationInUse('C'))));
        // The same name may be redefined under its own abbreviation.
        engine
            .add_method_to_library("Cambridge", 'C', "x38x14x1258x36x14x58x16x78 l12")
            .unwrap();
        assert_eq!(engine.library().len(), 13);
    }

    #[test]
    fn method_display_truncates() {
        let mut engine = Engine::new();
        engine
            .add_method_to_library(
                "Extraordinarily Long Name",
                'Q',
                "x38x14x1258x36x14x58x16x78 l12",
            )
            .unwrap();
        let i = engine
            .library()
            .iter()
            .position(|m| m.abbrev() == 'Q')
            .unwrap();
        engine.add_method(i).unwrap();
        let display = engine.method_display(engine.methods().len() - 1);
        assert!(display.starts_with("Q "));
        assert!(display.ends_with("..."));
    }

    #[test]
    fn initial_min_com_rules() {
        let mut engine = Engine::new();
        engine.methods.truncate(2);
        let mut params = ComposeParams {
            leads_per_part: 8,
            ..ComposeParams::default()
        };
        // Half-lead, no max-COM: min(methods, leads + 2).
        assert_eq!(engine.initial_min_com(&params), 2);
        params.max_com = true;
        assert_eq!(engine.initial_min_com(&params), 16);
        // Leadhead-only max-COM: leads, less one for 2-spliced odd leads.
        params.leadhead_only = true;
        assert_eq!(engine.initial_min_com(&params), 8);
        params.leads_per_part = 7;
        assert_eq!(engine.initial_min_com(&params), 6);
        params.max_com = false;
        assert_eq!(engine.initial_min_com(&params), 1);
    }

    #[test]
    fn compose_requires_built_tables() {
        let mut engine = Engine::new();
        let params = ComposeParams::default();
        assert!(matches!(
            engine.compose(&params),
            Err(EngineError::TablesNotBuilt)
        ));
    }

    #[test]
    fn music_add_replaces_by_name() {
        let mut engine = Engine::new();
        let n = engine.music().len();
        engine.add_music("queens", 5, "13572468");
        assert_eq!(engine.music().len(), n, "replaced, not appended");
        engine.add_music("Kings", 3, "53124678");
        assert_eq!(engine.music().len(), n + 1);
    }
}

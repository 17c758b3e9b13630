// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Permutation and node tables.
//!
//! Everything the search loop touches is precomputed here, in five passes:
//!
//! 1. [`Tables::build_node_table`] - once per process: exhaustive
//!    depth-first generation of all 40320 rows, numbering nodes and
//!    collecting the leadhead and tenors-together sub-tables.
//! 2. [`Tables::prepare_music`] - whenever the music definitions change:
//!    one music value per node.
//! 3. [`Tables::prepare_methods`] - whenever the methods change (even in
//!    order): builds the N² composite-method table, registers every change
//!    and leadhead permutation (globally deduplicated, leadhead ids rebased
//!    past the place-notation ids into one flat space), and closes the node
//!    table under every registered permutation so `permute(node, perm)` is
//!    a single array lookup.
//! 4. [`Tables::prepare_lead_music`] - whenever methods *or* music change:
//!    for every leadhead node and composite method, the music of a whole
//!    lead, so the search totals a lead with one lookup.
//! 5. [`Tables::prepare_regen_offsets`] - before every search: the
//!    rotational-sort regeneration offsets on the tenors-together leads.
//!
//! The tables are owned exclusively by the engine and are read-only during
//! the search.

pub mod node;

pub use node::{NodeId, RowNode, N_LEADHEADS, N_NODES};

use crate::method::{Call, CompositeMethod, Method};
use crate::music::{row_score, MusicDef};
use crate::ring::{Row, STAGE};
use crate::track::Tracker;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Fatal table-building failures: internal invariant violations, not user
/// errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("node table closure failed: no node for row {0}")]
    MissingNode(String),
    #[error("node table has not been built")]
    NotBuilt,
}

/// Id into the flat permutation space: place-notation permutations first,
/// then the rebased leadhead permutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermId(pub(crate) u16);

impl PermId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn rebased(self, offset: usize) -> Self {
        Self(self.0 + offset as u16)
    }
}

/// The two permutation registries, with global byte-wise deduplication.
#[derive(Debug, Default)]
pub struct PermTables {
    pn: Vec<[u8; STAGE]>,
    lead: Vec<[u8; STAGE]>,
    pn_index: HashMap<[u8; STAGE], u16>,
    lead_index: HashMap<[u8; STAGE], u16>,
}

impl PermTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a place-notation permutation, returning its final id.
    pub fn add_pn(&mut self, perm: [u8; STAGE]) -> PermId {
        if let Some(&i) = self.pn_index.get(&perm) {
            return PermId(i);
        }
        let i = self.pn.len() as u16;
        self.pn.push(perm);
        self.pn_index.insert(perm, i);
        PermId(i)
    }

    /// Registers a leadhead permutation, returning its id *within the
    /// leadhead table*; rebase before use.
    pub fn add_lead(&mut self, perm: [u8; STAGE]) -> PermId {
        if let Some(&i) = self.lead_index.get(&perm) {
            return PermId(i);
        }
        let i = self.lead.len() as u16;
        self.lead.push(perm);
        self.lead_index.insert(perm, i);
        PermId(i)
    }

    pub fn n_pn(&self) -> usize {
        self.pn.len()
    }

    pub fn n_lead(&self) -> usize {
        self.lead.len()
    }

    pub fn total(&self) -> usize {
        self.pn.len() + self.lead.len()
    }

    /// The permutation bytes for a flat id.
    pub fn perm(&self, id: usize) -> &[u8; STAGE] {
        if id < self.pn.len() {
            &self.pn[id]
        } else {
            &self.lead[id - self.pn.len()]
        }
    }

    fn clear(&mut self) {
        self.pn.clear();
        self.lead.clear();
        self.pn_index.clear();
        self.lead_index.clear();
    }
}

/// The node graph and every table derived from the method and music sets.
#[derive(Debug)]
pub struct Tables {
    nodes: Vec<RowNode>,
    node_index: HashMap<Row, NodeId>,
    /// Leadhead nodes in leadhead-number order (a contiguous numbering).
    leadheads: Vec<NodeId>,
    /// Tenors-together leadheads, in generation order.
    tenors_together_leads: Vec<NodeId>,
    perms: PermTables,
    /// Flat permutation links: destination of (node, perm), stride
    /// `n_perms` per node.
    perm_links: Vec<NodeId>,
    n_perms: usize,
    /// Lead music per (leadhead number, composite index), stride
    /// `composites.len()`.
    lead_music: Vec<i32>,
    methods: Vec<Method>,
    composites: Vec<CompositeMethod>,
    music: Vec<MusicDef>,
    methods_dirty: bool,
    music_dirty: bool,
    lead_music_dirty: bool,
    built: bool,
}

impl Tables {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            leadheads: Vec::new(),
            tenors_together_leads: Vec::new(),
            perms: PermTables::new(),
            perm_links: Vec::new(),
            n_perms: 0,
            lead_music: Vec::new(),
            methods: Vec::new(),
            composites: Vec::new(),
            music: crate::music::default_music(),
            methods_dirty: true,
            music_dirty: true,
            lead_music_dirty: true,
            built: false,
        }
    }

    /// True once pass 1 has completed.
    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leadheads(&self) -> usize {
        self.leadheads.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &RowNode {
        &self.nodes[id.index()]
    }

    pub fn node_id_of(&self, row: &Row) -> Option<NodeId> {
        self.node_index.get(row).copied()
    }

    /// All node ids, in table order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// The rounds node. Rounds is generated first, so this is node 0.
    pub fn rounds_node(&self) -> NodeId {
        NodeId(0)
    }

    pub fn leadheads(&self) -> &[NodeId] {
        &self.leadheads
    }

    pub fn tenors_together_leads(&self) -> &[NodeId] {
        &self.tenors_together_leads
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn n_methods(&self) -> usize {
        self.methods.len()
    }

    pub fn composite_methods(&self) -> &[CompositeMethod] {
        &self.composites
    }

    pub fn n_composite_methods(&self) -> usize {
        self.composites.len()
    }

    pub fn n_perms(&self) -> usize {
        self.n_perms
    }

    pub fn perms(&self) -> &PermTables {
        &self.perms
    }

    /// Destination of applying permutation `perm` at `node`: one lookup.
    #[inline]
    pub fn permute(&self, node: NodeId, perm: PermId) -> NodeId {
        self.perm_links[node.index() * self.n_perms + perm.index()]
    }

    /// Cached music of one lead of the given composite from a leadhead.
    #[inline]
    pub fn lead_music(&self, leadhead_number: usize, composite_index: usize) -> i32 {
        self.lead_music[leadhead_number * self.composites.len() + composite_index]
    }

    pub fn set_methods(&mut self, methods: Vec<Method>) {
        self.methods = methods;
        self.methods_dirty = true;
        self.lead_music_dirty = true;
    }

    pub fn set_music(&mut self, music: Vec<MusicDef>) {
        self.music = music;
        self.music_dirty = true;
        self.lead_music_dirty = true;
    }

    /// Pass 1: generates all 40320 nodes. Does not depend on methods or
    /// music (the default music is scored as nodes are created), so it runs
    /// once only; later calls are no-ops.
    pub fn build_node_table(&mut self, tracker: &Tracker) {
        if self.built {
            return;
        }
        tracker.set_job_name("Building node table");
        tracker.set_total(N_NODES as u64);
        tracker.set_progress(0);
        let start = std::time::Instant::now();

        self.nodes.reserve_exact(N_NODES);
        self.node_index.reserve(N_NODES);
        self.leadheads.reserve_exact(N_LEADHEADS);
        let mut row = Row::rounds(STAGE);
        self.generate_nodes(&mut row, 1, tracker);
        if tracker.is_aborted() {
            self.nodes.clear();
            self.node_index.clear();
            self.leadheads.clear();
            self.tenors_together_leads.clear();
            return;
        }
        info!(
            nodes = self.nodes.len(),
            leadheads = self.leadheads.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "node table built"
        );
        self.built = true;
        self.music_dirty = false;
    }

    /// Exhaustive depth-first row generation: position `n` takes each
    /// remaining bell in turn. Nodes are numbered in encounter order, which
    /// makes rounds node 0 and keeps leadhead numbering contiguous.
    fn generate_nodes(&mut self, row: &mut Row, n: usize, tracker: &Tracker) {
        if tracker.is_aborted() {
            return;
        }
        if n >= STAGE {
            let id = NodeId(self.nodes.len() as u32);
            let leadhead_number = if row.bell_at(1) == 1 {
                Some(self.leadheads.len() as u16)
            } else {
                None
            };
            let mut node = RowNode::new(*row, leadhead_number);
            node.set_music(row_score(row, &self.music));
            if node.is_leadhead() {
                self.leadheads.push(id);
                if node.is_tenors_together() {
                    self.tenors_together_leads.push(id);
                }
            }
            self.node_index.insert(*row, id);
            self.nodes.push(node);
            tracker.set_progress(self.nodes.len() as u64);
        } else {
            self.generate_nodes(row, n + 1, tracker);
            for i in n + 1..=STAGE {
                row.swap(n, i);
                self.generate_nodes(row, n + 1, tracker);
                row.swap(n, i);
            }
        }
    }

    /// Pass 2: per-row music values. Must run whenever the music
    /// definitions change.
    pub fn prepare_music(&mut self, tracker: &Tracker) {
        tracker.set_job_name("Preparing music");
        tracker.set_total(self.nodes.len() as u64);
        tracker.set_progress(0);
        if self.music_dirty {
            for (i, node) in self.nodes.iter_mut().enumerate() {
                if tracker.is_aborted() {
                    return;
                }
                let score = row_score(node.row(), &self.music);
                node.set_music(score);
                tracker.set_progress(i as u64 + 1);
            }
            self.music_dirty = false;
        }
        tracker.set_progress(self.nodes.len() as u64);
    }

    /// Pass 3: composite methods and the permutation closure. Must run
    /// whenever the method list changes, even in order only, because
    /// several tables are keyed by method index.
    pub fn prepare_methods(&mut self, tracker: &Tracker) -> Result<(), TableError> {
        tracker.set_job_name("Preparing methods");
        tracker.set_progress(0);
        if !self.methods_dirty {
            return Ok(());
        }
        if !self.built {
            return Err(TableError::NotBuilt);
        }
        let n = self.methods.len();
        self.perms.clear();
        let mut composites = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                composites.push(CompositeMethod::new(
                    &self.methods[i],
                    &self.methods[j],
                    i,
                    j,
                    n,
                    &mut self.perms,
                ));
            }
        }
        let pn_count = self.perms.n_pn();
        for cm in &mut composites {
            cm.rebase_lead_perms(pn_count);
        }
        self.composites = composites;

        self.populate_perm_links(tracker)?;
        if tracker.is_aborted() {
            return Ok(());
        }

        // Lead-music tables are keyed by composite index: force a rebuild.
        self.lead_music.clear();
        self.lead_music
            .resize(self.leadheads.len() * self.composites.len(), 0);
        self.lead_music_dirty = true;

        self.calc_leads_to_tenors_home();
        self.methods_dirty = false;
        Ok(())
    }

    /// Closes the node table under every registered permutation.
    fn populate_perm_links(&mut self, tracker: &Tracker) -> Result<(), TableError> {
        tracker.set_total(self.nodes.len() as u64);
        tracker.set_progress(0);
        let start = std::time::Instant::now();
        self.n_perms = self.perms.total();
        self.perm_links.clear();
        self.perm_links
            .resize(self.nodes.len() * self.n_perms, NodeId(0));
        for id in 0..self.nodes.len() {
            if tracker.is_aborted() {
                return Ok(());
            }
            let row = *self.nodes[id].row();
            for p in 0..self.n_perms {
                let dest = row.permuted(self.perms.perm(p));
                let dest_id = self
                    .node_index
                    .get(&dest)
                    .copied()
                    .ok_or_else(|| TableError::MissingNode(dest.to_string()))?;
                self.perm_links[id * self.n_perms + p] = dest_id;
            }
            tracker.set_progress(id as u64 + 1);
        }
        debug!(
            perms = self.n_perms,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "node table populated"
        );
        Ok(())
    }

    /// For every tenors-together leadhead, the number of plain leads of the
    /// first composite method to the next tenors-home leadhead. Seeds the
    /// rotational-sort regeneration offsets.
    fn calc_leads_to_tenors_home(&mut self) {
        let Some(first) = self.composites.first() else {
            return;
        };
        let plain = first.lead_perm(Call::Plain);
        for i in 0..self.tenors_together_leads.len() {
            let start = self.tenors_together_leads[i];
            let mut node = start;
            let mut leads = 0u16;
            while !self.nodes[node.index()].is_tenors_home() {
                node = self.permute(node, plain);
                leads += 1;
                if leads as usize > N_LEADHEADS {
                    // Course never comes home under this method; leave the
                    // node out of the regeneration scheme.
                    leads = 0;
                    break;
                }
            }
            self.nodes[start.index()].set_leads_to_tenors_home(leads);
        }
    }

    /// Pass 4: per-method lead music on the leadhead nodes. Must run
    /// whenever methods or music change.
    pub fn prepare_lead_music(&mut self, tracker: &Tracker) {
        tracker.set_job_name("Building tables");
        tracker.set_total(self.composites.len() as u64);
        tracker.set_progress(0);
        if !self.lead_music_dirty {
            return;
        }
        let start = std::time::Instant::now();
        let n_comps = self.composites.len();
        for m in 0..n_comps {
            if tracker.is_aborted() {
                return;
            }
            let pn_ids = self.composites[m].pn_perm_ids().to_vec();
            for lh in 0..self.leadheads.len() {
                let mut node = self.leadheads[lh];
                let mut music = self.nodes[node.index()].music();
                for &perm in &pn_ids[..pn_ids.len() - 1] {
                    node = self.permute(node, perm);
                    music += self.nodes[node.index()].music();
                }
                self.lead_music[lh * n_comps + m] = music;
            }
            tracker.set_progress(m as u64 + 1);
        }
        self.lead_music_dirty = false;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "lead music calculated"
        );
    }

    /// Pass 5: regeneration offsets for the coming search. Quick; must run
    /// before every search.
    pub fn prepare_regen_offsets(&mut self, tenors_together: bool) {
        for i in 0..self.tenors_together_leads.len() {
            let id = self.tenors_together_leads[i];
            self.nodes[id.index()].set_regen_offset(tenors_together);
        }
    }

    /// Fills `buf` with the node ids of one whole lead of `composite` from
    /// `start` (the following leadhead excluded). `buf` must be at least
    /// `composite.lead_length()` long.
    #[inline]
    pub fn generate_lead(&self, composite: &CompositeMethod, start: NodeId, buf: &mut [u32]) {
        let mut node = start;
        buf[0] = node.0;
        for (i, &perm) in composite.pn_perm_ids()[..composite.lead_length() - 1]
            .iter()
            .enumerate()
        {
            node = self.permute(node, perm);
            buf[i + 1] = node.0;
        }
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::standard;

    fn built_tables(methods: Vec<Method>) -> Tables {
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
    fn node_table_counts() {
        let tracker = Tracker::new(100);
        let mut tables = Tables::new();
        tables.build_node_table(&tracker);
        assert_eq!(tables.n_nodes(), N_NODES);
        assert_eq!(tables.n_leadheads(), N_LEADHEADS);
        assert!(tables.is_built());
        // Rounds is node 0 and leadhead 0.
        let rounds = tables.node(tables.rounds_node());
        assert!(rounds.row().is_rounds());
        assert_eq!(rounds.leadhead_number(), 0);
        // Leadhead numbering is contiguous in generation order.
        for (i, &id) in tables.leadheads().iter().enumerate() {
            assert_eq!(tables.node(id).leadhead_number(), i);
        }
    }

    #[test]
    fn perm_closure_round_trips_through_inverse() {
        let tables = built_tables(vec![standard::cambridge()]);
        // For every perm, applying it then its inverse returns the node.
        let n_perms = tables.n_perms();
        for p in 0..n_perms {
            let perm = *tables.perms().perm(p);
            let mut inverse = [0u8; STAGE];
            for (place, &bell) in perm.iter().enumerate() {
                inverse[(bell - 1) as usize] = (place + 1) as u8;
            }
            let start = tables.rounds_node();
            let there = tables.permute(start, PermId(p as u16));
            let back = tables
                .node_id_of(&tables.node(there).row().permuted(&inverse))
                .unwrap();
            assert_eq!(back, start);
        }
    }

    #[test]
    fn composite_pn_sequence_reaches_plain_leadhead() {
        let tables = built_tables(vec![standard::cambridge(), standard::yorkshire()]);
        for cm in tables.composite_methods() {
            // Walking the whole lead by PN perms from rounds, then applying
            // one more change, lands on the leadhead-change row.
            let mut buf = vec![0u32; cm.lead_length()];
            tables.generate_lead(cm, tables.rounds_node(), &mut buf);
            let lead_end = NodeId(buf[cm.lead_length() - 1]);
            let last_pn = cm.pn_perm_ids()[cm.lead_length() - 1];
            let next_leadhead = tables.permute(lead_end, last_pn);
            assert_eq!(tables.node(next_leadhead).row(), cm.leadhead());
            // And the plain lead perm jumps there in one step.
            let direct = tables.permute(tables.rounds_node(), cm.lead_perm(Call::Plain));
            assert_eq!(direct, next_leadhead, "{}", cm.abbrev());
        }
    }

    #[test]
    fn lead_music_matches_manual_walk() {
        let tables = built_tables(vec![standard::cambridge()]);
        let cm = &tables.composite_methods()[0];
        let mut buf = vec![0u32; cm.lead_length()];
        tables.generate_lead(cm, tables.rounds_node(), &mut buf);
        let manual: i32 = buf
            .iter()
            .map(|&id| tables.node(NodeId(id)).music())
            .sum();
        assert_eq!(tables.lead_music(0, 0), manual);
    }

    #[test]
    fn prepare_methods_is_idempotent() {
        let tracker = Tracker::new(100);
        let mut tables = built_tables(vec![standard::cambridge()]);
        let perms_before = tables.n_perms();
        tables.prepare_methods(&tracker).unwrap();
        assert_eq!(tables.n_perms(), perms_before);
    }

    #[test]
    fn regen_offsets_count_down_to_tenors_home() {
        let mut tables = built_tables(vec![standard::cambridge()]);
        tables.prepare_regen_offsets(true);
        // Rounds is tenors home: offset 0, copying starts immediately.
        assert_eq!(tables.node(tables.rounds_node()).regen_offset(), 0);
        // One plain lead of Cambridge from rounds: six more leads home.
        let cm = &tables.composite_methods()[0];
        let next = tables.permute(tables.rounds_node(), cm.lead_perm(Call::Plain));
        assert_eq!(tables.node(next).regen_offset(), -6);
        tables.prepare_regen_offsets(false);
        assert_eq!(tables.node(next).regen_offset(), 0);
    }
}

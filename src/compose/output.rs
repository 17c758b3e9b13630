// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Output compositions.
//!
//! When the search finds a true composition meeting the score minimums it
//! takes an [`OutputComp`] snapshot and sends it to the host. The snapshot
//! re-rings the first part of the *best rotation* from rounds and keeps
//! everything as plain values, so it stays valid while the search buffer
//! mutates on.

use crate::compose::Composition;
use crate::method::Call;
use crate::ring::bell_char;
use crate::tables::Tables;
use std::cmp::Ordering;
use std::fmt;

/// One lead of an output composition: the method abbreviation, the call
/// and the leadhead row it ends on (rendered without the treble).
#[derive(Debug, Clone)]
pub struct OutputLead {
    abbrev: String,
    call: Call,
    leadhead: String,
}

impl OutputLead {
    pub fn abbrev(&self) -> &str {
        &self.abbrev
    }

    pub fn call(&self) -> Call {
        self.call
    }

    pub fn leadhead(&self) -> &str {
        &self.leadhead
    }
}

/// An immutable composition snapshot, ordered by score.
#[derive(Debug, Clone)]
pub struct OutputComp {
    title: String,
    leads: Vec<OutputLead>,
    n_parts: usize,
    music: i32,
    score: i32,
    /// Changes of method, per part.
    com: i32,
    /// Method balance, 0..=100.
    balance: i32,
    /// Unbalance count, kept for the repeat-limit feedback rule.
    unbalance: i32,
    lh_only: bool,
}

impl OutputComp {
    /// Snapshots the best rotation of `comp`, re-ringing one part from
    /// rounds.
    pub(crate) fn new(comp: &Composition, score: i32, lh_only: bool, tables: &Tables) -> Self {
        let composites = tables.composite_methods();
        let n = comp.n_leads_per_part();
        let length: usize = (0..n)
            .map(|i| composites[comp.lead(i).method_index()].lead_length())
            .sum();
        let title = format!(
            "{} {}-spliced",
            length * comp.n_parts(),
            tables.n_methods()
        );

        let mut leads = Vec::with_capacity(n);
        let mut start = tables.rounds_node();
        let mut j = comp.best_rot();
        for _ in 0..n {
            let lead = comp.lead(j);
            let method = &composites[lead.method_index()];
            start = tables.permute(start, method.lead_perm(lead.call()));
            let row = tables.node(start).row();
            let abbrev = if lh_only {
                method.abbrev().chars().take(1).collect()
            } else {
                method.abbrev().to_owned()
            };
            leads.push(OutputLead {
                abbrev,
                call: lead.call(),
                leadhead: (2..=row.n_bells()).map(|p| bell_char(row.bell_at(p))).collect(),
            });
            j += 1;
            if j >= n {
                j = 0;
            }
        }

        Self {
            title,
            leads,
            n_parts: comp.n_parts(),
            music: comp.music(),
            score,
            com: comp.part_com(tables),
            balance: comp.balance(),
            unbalance: comp.unbalance_count(),
            lh_only,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn n_leads(&self) -> usize {
        self.leads.len()
    }

    pub fn lead(&self, i: usize) -> &OutputLead {
        &self.leads[i]
    }

    pub fn leads(&self) -> &[OutputLead] {
        &self.leads
    }

    pub fn n_parts(&self) -> usize {
        self.n_parts
    }

    pub fn music(&self) -> i32 {
        self.music
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    /// Changes of method per part; multiply by [`OutputComp::n_parts`] for
    /// the whole composition.
    pub fn com(&self) -> i32 {
        self.com
    }

    pub fn balance(&self) -> i32 {
        self.balance
    }

    pub fn unbalance_count(&self) -> i32 {
        self.unbalance
    }

    pub fn is_leadhead_only(&self) -> bool {
        self.lh_only
    }

    /// Renders the composition with an extra tag on the title line.
    pub fn render(&self, title_extra: &str) -> String {
        let mut s = format!("{}{}\n", self.title, title_extra);
        s.push_str(" 2345678\n");
        for lead in &self.leads {
            s.push_str(&format!(
                " {} {}{}\n",
                lead.leadhead,
                lead.abbrev,
                lead.call.marker()
            ));
        }
        if self.n_parts > 1 {
            s.push_str(&format!("{} part\n", self.n_parts));
        }
        s.push_str(&format!(
            "Music = {} COM = {} Balance = {}%",
            self.music,
            self.com * self.n_parts as i32,
            self.balance
        ));
        s
    }
}

impl fmt::Display for OutputComp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(""))
    }
}

impl PartialEq for OutputComp {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl Eq for OutputComp {}

impl PartialOrd for OutputComp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by score alone.
impl Ord for OutputComp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.cmp(&other.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Composition;
    use crate::method::standard;
    use crate::track::Tracker;

    #[test]
    fn snapshot_of_a_plain_course() {
        let tracker = Tracker::new(100);
        let mut tables = Tables::new();
        tables.build_node_table(&tracker);
        tables.set_methods(vec![standard::cambridge()]);
        tables.prepare_methods(&tracker).unwrap();
        tables.prepare_music(&tracker);
        tables.prepare_lead_music(&tracker);

        let mut comp = Composition::new(tables.methods(), &tables, 7, false, false);
        let cc = &tables.composite_methods()[0];
        let mut start = tables.rounds_node();
        for i in 0..7 {
            start = comp.set_lead(i, start, cc, Call::Plain, &tables);
        }
        comp.update_n_parts(&tables);
        comp.calc_music_rots(-1, &tables);
        comp.set_balance(100, 0);
        let out = comp.output_comp(comp.music() + 100, false, &tables);

        assert_eq!(out.title(), "224 1-spliced");
        assert_eq!(out.n_leads(), 7);
        assert_eq!(out.n_parts(), 1);
        assert_eq!(out.com(), 0);
        assert_eq!(out.balance(), 100);
        // Last lead of a plain course ends in rounds.
        assert_eq!(out.lead(6).leadhead(), "2345678");
        assert_eq!(out.lead(0).abbrev(), "CC");
        let text = out.render(", gen. (No. 1)");
        assert!(text.starts_with("224 1-spliced, gen. (No. 1)\n 2345678\n"));
        assert!(text.contains("1 part\n") == false);
        assert!(text.ends_with(&format!(
            "Music = {} COM = 0 Balance = 100%",
            out.music()
        )));
    }
}

// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Methods and composite methods.
//!
//! A [`Method`] is a symmetric sequence of changes on eight bells, named
//! and abbreviated to a single letter. The search itself never rings plain
//! methods: it works on [`CompositeMethod`]s, the N² cross product pairing
//! one method's first half-lead with another's second half-lead.
//!
//! Calls are fixed: a 4th's-place bob and a 1234 single, applied in place
//! of the leadhead change.

pub mod composite;
pub mod library;
pub mod standard;

pub use composite::CompositeMethod;

use crate::ring::{Change, PlaceNotation, Row, STAGE};
use strum::EnumCount;
use strum_macros::EnumCount as EnumCountMacro;
use thiserror::Error;

/// A call made at a lead end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumCountMacro)]
#[repr(u8)]
pub enum Call {
    Plain = 0,
    Bob = 1,
    Single = 2,
}

/// Number of call kinds (plain, bob, single).
pub const N_CALL_KINDS: usize = Call::COUNT;

impl Call {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        match i {
            0 => Call::Plain,
            1 => Call::Bob,
            2 => Call::Single,
            _ => panic!("call index out of range: {}", i),
        }
    }

    /// The marker used in seeds and output: nothing, `-` or `s`.
    pub fn marker(self) -> &'static str {
        match self {
            Call::Plain => "",
            Call::Bob => "-",
            Call::Single => "s",
        }
    }
}

/// The 4th's-place bob, as a change.
pub fn bob_change() -> Change {
    Change::new(vec![0, 3])
}

/// The 1234 single, as a change.
pub fn single_change() -> Change {
    Change::new(vec![0, 1, 2, 3])
}

/// Errors from method construction and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MethodError {
    #[error(transparent)]
    Notation(#[from] crate::ring::notation::NotationError),
    #[error("the method must be given a name")]
    MissingName,
    #[error("the method must be given a one-letter abbreviation")]
    BadAbbreviation,
    #[error("only Major methods are supported (notation is for stage {0})")]
    WrongStage(usize),
    #[error("method must be symmetric for half-lead splicing")]
    NotSymmetric,
    #[error("the treble must be the hunt bell")]
    TrebleNotHuntBell,
    #[error("the treble must be in 8ths place at the half-lead")]
    TrebleNotAtHalflead,
}

/// The halflead, leadhead and call-end rows derived from a lead's notation.
///
/// The call-end rows are the rows reached from rounds by ringing the lead
/// with a plain, bobbed or singled ending; treated as permutations they map
/// any lead's starting row to the next.
#[derive(Debug, Clone)]
pub(crate) struct LeadRows {
    pub halflead: Row,
    pub leadhead: Row,
    pub call_ends: [Row; N_CALL_KINDS],
}

/// Derives the lead rows for a first half taken from `pn1` and a second
/// half taken from `pn2` (identical for a plain method).
pub(crate) fn calc_lead_rows(pn1: &PlaceNotation, pn2: &PlaceNotation) -> LeadRows {
    let h1 = pn1.len() / 2;
    let h2 = pn2.len() / 2;
    let mut r = Row::rounds(STAGE);
    for i in 0..h1 {
        r.apply_change(pn1.change(i));
    }
    let halflead = r;
    for i in 0..h2.saturating_sub(1) {
        r.apply_change(pn2.change(i + h2));
    }
    let leadhead_change = pn2.change(h2 + h2 - 1);
    let leadhead = r.changed(leadhead_change);
    LeadRows {
        halflead,
        leadhead,
        call_ends: [
            leadhead,
            r.changed(&bob_change()),
            r.changed(&single_change()),
        ],
    }
}

/// A library method: symmetric place notation plus derived lead rows.
///
/// Construction validates everything the engine relies on, so a `Method`
/// in hand is always spliceable: Major stage, symmetric lead, treble the
/// hunt bell and lying in 8ths place at the half-lead.
#[derive(Debug, Clone)]
pub struct Method {
    name: String,
    abbrev: char,
    pn: PlaceNotation,
    first_half_len: usize,
    second_half_len: usize,
    lead_length: usize,
    rows: LeadRows,
}

impl Method {
    /// Builds a method whose abbreviation is the first letter of its name.
    pub fn new(name: &str, pn: &str) -> Result<Self, MethodError> {
        let abbrev = name.chars().next().ok_or(MethodError::MissingName)?;
        Self::with_abbrev(name, abbrev, pn)
    }

    pub fn with_abbrev(name: &str, abbrev: char, pn: &str) -> Result<Self, MethodError> {
        if name.is_empty() {
            return Err(MethodError::MissingName);
        }
        if abbrev.is_whitespace() || abbrev == crate::music::SEPARATOR {
            return Err(MethodError::BadAbbreviation);
        }
        let pn = PlaceNotation::parse(pn)?;
        if pn.highest_place() > STAGE || pn.guess_stage() != STAGE {
            return Err(MethodError::WrongStage(pn.guess_stage()));
        }
        if !pn.is_symmetric() {
            return Err(MethodError::NotSymmetric);
        }
        let rows = calc_lead_rows(&pn, &pn);
        if rows.leadhead.bell_at(1) != 1 {
            return Err(MethodError::TrebleNotHuntBell);
        }
        if rows.halflead.bell_at(STAGE) != 1 {
            return Err(MethodError::TrebleNotAtHalflead);
        }
        let half = pn.len() / 2;
        Ok(Self {
            name: name.to_owned(),
            abbrev,
            first_half_len: half,
            second_half_len: half,
            lead_length: pn.len(),
            pn,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbrev(&self) -> char {
        self.abbrev
    }

    pub fn notation(&self) -> &PlaceNotation {
        &self.pn
    }

    pub fn lead_length(&self) -> usize {
        self.lead_length
    }

    pub fn first_half_len(&self) -> usize {
        self.first_half_len
    }

    pub fn second_half_len(&self) -> usize {
        self.second_half_len
    }

    pub fn leadhead(&self) -> &Row {
        &self.rows.leadhead
    }

    pub fn halflead(&self) -> &Row {
        &self.rows.halflead
    }
}

/// Two methods are the same method when their names are equal.
impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Method {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::standard;

    #[test]
    fn cambridge_lead_rows() {
        let m = standard::cambridge();
        assert_eq!(m.lead_length(), 32);
        assert_eq!(m.first_half_len(), 16);
        // 2nds-place leadhead of the "b" group.
        assert_eq!(m.leadhead().to_string(), "15738264");
        assert_eq!(m.halflead().bell_at(STAGE), 1);
    }

    #[test]
    fn bob_and_single_alter_the_lead_end() {
        let m = standard::cambridge();
        let rows = calc_lead_rows(m.notation(), m.notation());
        assert_eq!(rows.call_ends[Call::Plain.index()], rows.leadhead);
        assert_ne!(rows.call_ends[Call::Bob.index()], rows.leadhead);
        assert_ne!(
            rows.call_ends[Call::Single.index()],
            rows.call_ends[Call::Bob.index()]
        );
        // Calls never move the treble.
        assert_eq!(rows.call_ends[Call::Bob.index()].bell_at(1), 1);
        assert_eq!(rows.call_ends[Call::Single.index()].bell_at(1), 1);
    }

    #[test]
    fn asymmetric_notation_is_rejected() {
        // An explicit asymmetric block: no reflection, odd lead length.
        let err = Method::new("Oddity", "+x38x14x78,+12");
        assert!(matches!(err, Err(MethodError::NotSymmetric)));
    }

    #[test]
    fn wrong_stage_is_rejected() {
        // Royal notation: places above 8.
        let err = Method::new("Tencount", "x30x14x50x16x70x18x90x10 l12");
        assert!(matches!(err, Err(MethodError::WrongStage(_))));
    }

    #[test]
    fn call_changes() {
        assert_eq!(bob_change().places(), &[0, 3]);
        assert_eq!(single_change().places(), &[0, 1, 2, 3]);
    }

    #[test]
    fn call_markers() {
        assert_eq!(Call::Plain.marker(), "");
        assert_eq!(Call::Bob.marker(), "-");
        assert_eq!(Call::Single.marker(), "s");
        assert_eq!(N_CALL_KINDS, 3);
    }
}

// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The [`Row`] type: an ordered tuple of distinct bells.
//!
//! A row stores bell numbers 1..=n directly, together with the stage n.
//! Both in-place operations (`apply_permutation`, `apply_change`) and pure
//! counterparts returning a fresh row (`permuted`, `changed`) are provided;
//! the pure forms replace the mutable/immutable class split of older
//! composing engines, since ownership makes the distinction explicit at the
//! call site.
//!
//! Beyond permutation, rows answer the ringing-theoretic queries the search
//! needs: whether the tenors are home, whether they are in a plain-bob
//! coursing position, and whether the row occurs in a plain course of
//! Plain Bob at this stage.

use crate::ring::{bell_char, bell_from_char, Change, MAX_BELLS, MIN_BELLS};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A row of bells at a stage between [`MIN_BELLS`] and [`MAX_BELLS`].
///
/// Equality is positional. The identity row (rounds) has bell i at place i.
#[derive(Clone, Copy)]
pub struct Row {
    /// Bell numbers 1..=n_bells; entries beyond `n_bells` are unused.
    bells: [u8; MAX_BELLS],
    n_bells: usize,
}

impl Row {
    /// Rounds on `n_bells` bells.
    ///
    /// # Panics
    ///
    /// Panics if `n_bells` is outside [`MIN_BELLS`]..=[`MAX_BELLS`]; stages
    /// are validated at the parsing boundary before rows are built.
    pub fn rounds(n_bells: usize) -> Self {
        assert!(
            (MIN_BELLS..=MAX_BELLS).contains(&n_bells),
            "stage out of range: {}",
            n_bells
        );
        let mut bells = [0u8; MAX_BELLS];
        for (i, b) in bells.iter_mut().enumerate().take(n_bells) {
            *b = (i + 1) as u8;
        }
        Self { bells, n_bells }
    }

    /// Parses a row from bell characters, taking the stage from the string
    /// length. Returns `None` on an unknown character or a bad length.
    pub fn parse(s: &str) -> Option<Self> {
        let n = s.len();
        if !(MIN_BELLS..=MAX_BELLS).contains(&n) {
            return None;
        }
        let mut bells = [0u8; MAX_BELLS];
        for (i, c) in s.chars().enumerate() {
            bells[i] = bell_from_char(c)?;
        }
        Some(Self { bells, n_bells: n })
    }

    pub fn n_bells(&self) -> usize {
        self.n_bells
    }

    /// The bell at `place` (1..=n_bells).
    #[inline]
    pub fn bell_at(&self, place: usize) -> u8 {
        self.bells[place - 1]
    }

    /// The place (1..=n_bells) of `bell`, or 0 if absent.
    pub fn find_bell(&self, bell: u8) -> usize {
        match self.bells[..self.n_bells].iter().position(|&b| b == bell) {
            Some(i) => i + 1,
            None => 0,
        }
    }

    /// The row as a slice of bell numbers.
    #[inline]
    pub fn bells(&self) -> &[u8] {
        &self.bells[..self.n_bells]
    }

    pub fn is_rounds(&self) -> bool {
        self.bells[..self.n_bells]
            .iter()
            .enumerate()
            .all(|(i, &b)| b == (i + 1) as u8)
    }

    /// Swaps the bells at places `i` and `j` (1-based).
    pub fn swap(&mut self, i: usize, j: usize) {
        self.bells.swap(i - 1, j - 1);
    }

    /// Permutes this row in place: the new bell at place i is the old bell
    /// at the place given by `permutation[i-1]`. The permutation must be a
    /// valid arrangement of 1..=n_bells.
    pub fn apply_permutation(&mut self, permutation: &[u8]) {
        let old = self.bells;
        for i in 0..self.n_bells {
            self.bells[i] = old[(permutation[i] - 1) as usize];
        }
    }

    /// Pure form of [`Row::apply_permutation`].
    pub fn permuted(&self, permutation: &[u8]) -> Self {
        let mut r = *self;
        r.apply_permutation(permutation);
        r
    }

    /// Calculates the permutation that maps this row onto `target`, the
    /// inverse operation of [`Row::apply_permutation`]. `perm` must be
    /// `n_bells` long.
    pub fn permutation_to(&self, target: &Row, perm: &mut [u8]) {
        for i in 0..self.n_bells {
            perm[i] = self.find_bell(target.bells[i]) as u8;
        }
    }

    /// Applies one change of place notation: every pair of adjacent places
    /// not held by the change swaps. Malformed notation (an odd place where
    /// an even one is expected, or vice versa) implies an extra held place
    /// immediately before.
    pub fn apply_change(&mut self, change: &Change) {
        let places = change.places();
        let mut j = 0;
        let mut next_place = if j < places.len() {
            let p = places[j] as usize;
            j += 1;
            p
        } else {
            self.n_bells
        };
        let mut i = 0;
        while i < self.n_bells {
            if i == next_place || i + 1 == next_place {
                i = next_place + 1;
                next_place = if j < places.len() {
                    let p = places[j] as usize;
                    j += 1;
                    p
                } else {
                    self.n_bells
                };
            } else {
                self.bells.swap(i, i + 1);
                i += 2;
            }
        }
    }

    /// Pure form of [`Row::apply_change`].
    pub fn changed(&self, change: &Change) -> Self {
        let mut r = *self;
        r.apply_change(change);
        r
    }

    /// True if bells 7..=n are all in their home places.
    pub fn is_tenors_home(&self) -> bool {
        (7..=self.n_bells).all(|i| self.bell_at(i) as usize == i)
    }

    /// True if the tenors (7 and 8 upward) are in a plain-bob coursing
    /// position at this leadhead.
    pub fn is_tenors_together(&self) -> bool {
        let mut bell = self.n_bells;
        let mut pos = self.find_bell(self.n_bells as u8);
        if pos == 0 {
            return false;
        }
        loop {
            bell = self.next_course_bell(bell, true);
            pos = self.next_course_bell_no_treble(pos, true);
            if bell as u8 != self.bell_at(pos) {
                return false;
            }
            if bell == 7 {
                return true;
            }
        }
    }

    /// The next bell in Plain Bob coursing order from `i` (1..=n_bells).
    /// With `evens_up` set, even bells move up two and odd bells down two;
    /// on eight bells this incrementally generates 2 4 6 8 7 5 3 1 2 4...
    pub fn next_course_bell(&self, i: usize, evens_up: bool) -> usize {
        let mut i = i;
        if (i & 1 != 0) ^ evens_up {
            i += 2;
            if i > self.n_bells {
                i = if evens_up {
                    (self.n_bells - 1) | 1
                } else {
                    self.n_bells & !1
                };
            }
        } else if i < 3 {
            i = if evens_up { 2 } else { 1 };
        } else {
            i -= 2;
        }
        i
    }

    /// As [`Row::next_course_bell`], but never returns the treble.
    pub fn next_course_bell_no_treble(&self, i: usize, evens_up: bool) -> usize {
        let i = self.next_course_bell(i, evens_up);
        if i == 1 {
            self.next_course_bell(i, evens_up)
        } else {
            i
        }
    }

    /// True if the row occurs in a plain course of Plain Bob at this stage,
    /// at either stroke.
    pub fn is_plain_bob_row(&self) -> bool {
        self.is_pb_row(true) || self.is_pb_row(false)
    }

    /// Checks for a Plain Bob row at one stroke by stepping through places
    /// 1,2,4,6... down to 5,3,1, skipping the treble's place, and requiring
    /// each bell found to be the course (or after) bell of the previous one.
    fn is_pb_row(&self, direction: bool) -> bool {
        let mut place = 1;
        let mut expected = 0;
        loop {
            if self.bells[place - 1] == 1 {
                place = self.next_course_bell(place, true);
                if place == 1 {
                    break;
                }
            }
            let bell = self.bells[place - 1] as usize;
            if expected > 0 && bell != expected {
                return false;
            }
            expected = self.next_course_bell_no_treble(bell, direction);
            place = self.next_course_bell(place, true);
            if place == 1 {
                break;
            }
        }
        true
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.bells() == other.bells()
    }
}

impl Eq for Row {}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bells().hash(state);
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.bells() {
            write!(f, "{}", bell_char(b))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::STAGE;

    #[test]
    fn rounds_is_rounds() {
        let r = Row::rounds(STAGE);
        assert!(r.is_rounds());
        assert_eq!(r.to_string(), "12345678");
        assert_eq!(r.bell_at(1), 1);
        assert_eq!(r.bell_at(8), 8);
    }

    #[test]
    fn parse_and_display_round_trip() {
        let r = Row::parse("13572468").unwrap();
        assert_eq!(r.to_string(), "13572468");
        assert!(!r.is_rounds());
        assert_eq!(r.find_bell(7), 4);
        assert!(Row::parse("1357246x").is_none());
        assert!(Row::parse("12").is_none());
    }

    #[test]
    fn apply_permutation_rearranges() {
        // Queens as a permutation applied to rounds gives queens.
        let queens = Row::parse("13572468").unwrap();
        let r = Row::rounds(STAGE).permuted(queens.bells());
        assert_eq!(r, queens);
    }

    #[test]
    fn permutation_to_inverts_apply() {
        let row = Row::parse("64235178").unwrap();
        let start = Row::parse("21436587").unwrap();
        let mut perm = [0u8; STAGE];
        start.permutation_to(&row, &mut perm);
        assert_eq!(start.permuted(&perm), row);
    }

    #[test]
    fn cross_change_swaps_every_pair() {
        let mut r = Row::rounds(STAGE);
        r.apply_change(&Change::cross());
        assert_eq!(r.to_string(), "21436587");
    }

    #[test]
    fn change_holds_listed_places() {
        // 14: places 1 and 4 held, pairs 2-3 and 5-6, 7-8 swap.
        let change = Change::new(vec![0, 3]);
        let r = Row::rounds(STAGE).changed(&change);
        assert_eq!(r.to_string(), "13246587");
    }

    #[test]
    fn malformed_change_implies_extra_place() {
        // A lone even place 2 (index 1) behaves as "12".
        let change = Change::new(vec![1]);
        let r = Row::rounds(STAGE).changed(&change);
        assert_eq!(Row::rounds(STAGE).changed(&Change::new(vec![0, 1])), r);
    }

    #[test]
    fn tenors_home_and_together() {
        assert!(Row::rounds(STAGE).is_tenors_home());
        let split = Row::parse("12345687").unwrap();
        assert!(!split.is_tenors_home());
        assert!(!split.is_tenors_together());
        // A Plain Bob leadhead: every pair coursing, tenors not home.
        let coursing = Row::parse("13527486").unwrap();
        assert!(!coursing.is_tenors_home());
        assert!(coursing.is_tenors_together());
    }

    #[test]
    fn plain_bob_rows() {
        assert!(Row::rounds(STAGE).is_plain_bob_row());
        // Handstroke row of the PB plain course.
        assert!(Row::parse("21436587").unwrap().is_plain_bob_row());
        assert!(!Row::parse("13572468").unwrap().is_plain_bob_row());
    }
}

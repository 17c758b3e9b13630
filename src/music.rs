// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Music definitions and row scoring.
//!
//! A [`MusicDef`] is a named collection of pattern rows over the stage,
//! with an integer score. Patterns use `x` as a wildcard position; a row's
//! music value is the sum, over every matching pattern of every definition,
//! of the definition's score. Row scores are computed once per node during
//! table building (see [`crate::tables`]), never in the search loop.

use crate::ring::{bell_from_char, Row, STAGE};
use std::fmt;

/// Separator used when a definition is rendered as a single line.
pub const SEPARATOR: char = '|';

/// One music pattern over eight positions; 0 is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicPattern([u8; STAGE]);

impl MusicPattern {
    /// Parses one pattern token. Tokens longer than the stage are
    /// truncated; shorter ones are padded with wildcards. The forgiving
    /// substitutions of the original engine are kept: `l` for 1, `O` for 0,
    /// and `-`, `*`, `.` for the wildcard.
    pub fn parse(token: &str) -> Self {
        let mut cells = [0u8; STAGE];
        for (i, c) in token.chars().take(STAGE).enumerate() {
            let c = match c {
                'l' => '1',
                'O' => '0',
                '-' | '*' | '.' => 'x',
                other => other,
            };
            if c == 'x' || c == 'X' {
                continue;
            }
            cells[i] = bell_from_char(c).unwrap_or(0);
        }
        Self(cells)
    }

    /// True if the row matches this pattern position by position.
    #[inline]
    pub fn matches(&self, row: &Row) -> bool {
        self.0
            .iter()
            .zip(row.bells())
            .all(|(&want, &have)| want == 0 || want == have)
    }
}

impl fmt::Display for MusicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &cell in &self.0 {
            if cell == 0 {
                write!(f, "x")?;
            } else {
                write!(f, "{}", crate::ring::bell_char(cell))?;
            }
        }
        Ok(())
    }
}

/// One music definition: a score plus the list of matching patterns.
#[derive(Debug, Clone)]
pub struct MusicDef {
    name: String,
    score: i32,
    patterns: Vec<MusicPattern>,
}

impl MusicDef {
    pub fn new(name: &str, score: i32, patterns: &[&str]) -> Self {
        Self {
            name: name.replace(SEPARATOR, " "),
            score,
            patterns: patterns.iter().map(|p| MusicPattern::parse(p)).collect(),
        }
    }

    /// Parses a definition whose patterns arrive as one string separated by
    /// commas, semicolons or spaces.
    pub fn parse(name: &str, score: i32, matches: &str) -> Self {
        let patterns = matches
            .trim()
            .split([',', ';', ' '])
            .filter(|t| !t.is_empty())
            .map(MusicPattern::parse)
            .collect();
        Self {
            name: name.replace(SEPARATOR, " "),
            score,
            patterns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn patterns(&self) -> &[MusicPattern] {
        &self.patterns
    }

    /// The music value this definition contributes to `row`.
    pub fn row_score(&self, row: &Row) -> i32 {
        self.patterns
            .iter()
            .filter(|p| p.matches(row))
            .count() as i32
            * self.score
    }
}

impl fmt::Display for MusicDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.name, SEPARATOR, self.score, SEPARATOR)?;
        for p in &self.patterns {
            write!(f, " {}", p)?;
        }
        Ok(())
    }
}

/// Total music value of a row over a set of definitions.
pub fn row_score(row: &Row, music: &[MusicDef]) -> i32 {
    music.iter().map(|m| m.row_score(row)).sum()
}

/// The default music set: rollups, little-bell rows, 468s, Queens and
/// Whittingtons.
pub fn default_music() -> Vec<MusicDef> {
    vec![
        MusicDef::new("Back rollups", 1, &["xxxx5678", "xxxx6578", "xxxx8765"]),
        MusicDef::new("Front rollups", 1, &["5678xxxx", "8765xxxx"]),
        MusicDef::new(
            "Little-bell",
            1,
            &["2345xxxx", "5432xxxx", "xxxx2345", "xxxx5432"],
        ),
        MusicDef::new("468s", 1, &["xxxx2468", "xxxx3468"]),
        MusicDef::new("Queens", 2, &["13572468"]),
        MusicDef::new("Whittingtons", 2, &["12753468"]),
    ]
}

/// Music for part ends, one definition per family of part counts: rewards
/// part-end rows that ring well over the whole peal.
pub fn part_end_music() -> Vec<MusicDef> {
    vec![
        MusicDef::new("1 & 3", 1, &["1xxx5678"]),
        MusicDef::new(
            "2 & 6",
            1,
            &["1xxx5678", "1xxx6578", "1xxx8765", "1xxx5768", "1xxx7856"],
        ),
        MusicDef::new(
            "4 & 12",
            1,
            &[
                "1xxx6857", "1xxx7586", "13524xxx", "14253xxx", "15234xxx", "13452xxx",
                "14532xxx", "15423xxx",
            ],
        ),
        MusicDef::new(
            "5",
            1,
            &["13526478", "15634278", "16452378", "14263578"],
        ),
        MusicDef::new(
            "7",
            1,
            &[
                "13527486", "15738264", "17856342", "18674523", "16482735", "14263857",
                "13456782", "14567823", "15678234", "16782345", "17823456", "18234567",
            ],
        ),
        MusicDef::new(
            "10",
            1,
            &["13257486", "13278564", "13286745", "13264857"],
        ),
    ]
}

// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The standard Surprise Major methods that ship with the engine.
//!
//! Notations are in MLIB form with explicit external places. Abbreviations
//! follow ringing convention: the first letter of the name, except where a
//! clash forces an alternative (Lincolnshire N, Cassiobury O, Belfast F).

use crate::method::Method;

fn must(m: Result<Method, crate::method::MethodError>) -> Method {
    match m {
        Ok(m) => m,
        Err(e) => panic!("standard method failed validation: {}", e),
    }
}

pub fn cambridge() -> Method {
    must(Method::new("Cambridge", "x38x14x1258x36x14x58x16x78 l12"))
}

pub fn yorkshire() -> Method {
    must(Method::new("Yorkshire", "x38x14x58x16x12x38x14x78 l12"))
}

pub fn lincolnshire() -> Method {
    must(Method::with_abbrev(
        "Lincolnshire",
        'N',
        "x38x14x58x16x14x58x36x78 l12",
    ))
}

pub fn superlative() -> Method {
    must(Method::new("Superlative", "x36x14x58x36x14x58x36x78 l12"))
}

pub fn pudsey() -> Method {
    must(Method::new("Pudsey", "x58x16x12x38x14x58x16x78 l12"))
}

pub fn rutland() -> Method {
    must(Method::new("Rutland", "x38x14x58x16x14x38x34x18 l12"))
}

pub fn bristol() -> Method {
    must(Method::new("Bristol", "x58x14.58x58.36.14x14.58x14x18 l18"))
}

pub fn london() -> Method {
    must(Method::new("London", "38x38.14x12x38.14x14.58.16x16.58 l12"))
}

pub fn ashtead() -> Method {
    must(Method::new("Ashtead", "x58x16x56x36x34x38x14x78 l12"))
}

pub fn cassiobury() -> Method {
    must(Method::with_abbrev(
        "Cassiobury",
        'O',
        "x58x16x12x36x12x58x14x18 l12",
    ))
}

pub fn uxbridge() -> Method {
    must(Method::new("Uxbridge", "x38x14x56x16x34x58x14x58 l12"))
}

pub fn belfast() -> Method {
    must(Method::with_abbrev(
        "Belfast",
        'F',
        "34x58.14x12x38.12x14.38.16x12.38 l18",
    ))
}

pub fn glasgow() -> Method {
    must(Method::new("Glasgow", "36x56.14.58x58.36x14x38.16x16.38 l18"))
}

/// The default library, sorted by abbreviation at load time by the engine.
pub fn all() -> Vec<Method> {
    vec![
        cambridge(),
        yorkshire(),
        lincolnshire(),
        superlative(),
        pudsey(),
        rutland(),
        bristol(),
        london(),
        ashtead(),
        cassiobury(),
        uxbridge(),
        belfast(),
        glasgow(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_standard_method_validates() {
        let methods = all();
        assert_eq!(methods.len(), 13);
        for m in &methods {
            assert_eq!(m.leadhead().bell_at(1), 1, "{}", m.name());
            assert_eq!(m.halflead().bell_at(8), 1, "{}", m.name());
        }
    }

    #[test]
    fn abbreviations_are_unique() {
        let methods = all();
        for (i, a) in methods.iter().enumerate() {
            for b in &methods[i + 1..] {
                assert_ne!(a.abbrev(), b.abbrev(), "{} vs {}", a.name(), b.name());
            }
        }
    }

    #[test]
    fn treble_dodging_lead_lengths() {
        for m in all() {
            assert_eq!(m.lead_length(), 32, "{}", m.name());
        }
    }
}

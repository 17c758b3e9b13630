// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Microsiril method-library text parsing.
//!
//! A library file is a plain text listing, one method per line outside the
//! header: `<Name> <Code> <PlaceNotation>`. Lines beginning `**` are
//! comments, a leading `<XMP>` wrapper is stripped, and a line whose name
//! is `Zzz` terminates the logical list. Downloading and unzipping the file
//! is the host's business; this surface accepts any [`BufRead`].

use std::io::BufRead;
use thiserror::Error;

/// Display names longer than this are truncated with an ellipsis.
pub const MAX_NAME: usize = 15;

/// Sentinel name terminating the logical method list.
const END_MARKER: &str = "Zzz";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read method library: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of a method library: name, leadhead code and place notation,
/// still unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub name: String,
    pub code: String,
    pub notation: String,
}

impl LibraryEntry {
    /// The name shortened for display, like the original library browser.
    pub fn display_name(&self) -> String {
        if self.name.len() > MAX_NAME {
            format!("{}...", &self.name[..MAX_NAME - 1])
        } else {
            self.name.clone()
        }
    }

    /// The notation string in leadhead-code-prefix form, ready for
    /// [`crate::ring::PlaceNotation::parse`].
    pub fn coded_notation(&self) -> String {
        format!("{} {}", self.code, self.notation)
    }
}

/// Parses a Microsiril library listing. Malformed lines (fewer than three
/// fields) are skipped, matching the tolerant behaviour of the original
/// browser.
pub fn parse_library(reader: impl BufRead) -> Result<Vec<LibraryEntry>, LibraryError> {
    let mut entries = Vec::new();
    for line in reader.lines() {
        let mut line = line?;
        if let Some(stripped) = line.strip_prefix("<XMP>") {
            line = stripped.to_owned();
        }
        if line.starts_with("**") {
            continue;
        }
        let mut fields = line.splitn(3, ' ');
        let (name, code, notation) = match (fields.next(), fields.next(), fields.next()) {
            (Some(n), Some(c), Some(p)) if !n.is_empty() && !c.is_empty() => (n, c, p),
            _ => continue,
        };
        if name == END_MARKER {
            break;
        }
        entries.push(LibraryEntry {
            name: name.to_owned(),
            code: code.to_owned(),
            notation: notation.trim_end().to_owned(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
<XMP>** Surprise Major methods
** generated for testing
Cambridge b &x3x4x25x36x4x5x6x7
Yorkshire b &x3x4x5x6x2x3x4x7
Zzz end of list
Phantom b &x3x4x5x6x2x3x4x7
";

    #[test]
    fn parses_until_end_marker() {
        let entries = parse_library(Cursor::new(SAMPLE)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Cambridge");
        assert_eq!(entries[0].code, "b");
        assert_eq!(entries[0].notation, "&x3x4x25x36x4x5x6x7");
        assert_eq!(entries[1].name, "Yorkshire");
    }

    #[test]
    fn skips_comments_and_header() {
        let entries = parse_library(Cursor::new("** only comments\n")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn coded_notation_parses_as_a_method() {
        let entries = parse_library(Cursor::new(SAMPLE)).unwrap();
        let coded = entries[0].coded_notation();
        let m = crate::method::Method::new("Cambridge", &coded).unwrap();
        assert_eq!(m.lead_length(), 32);
        assert_eq!(
            m.leadhead(),
            crate::method::standard::cambridge().leadhead()
        );
    }

    #[test]
    fn long_names_truncate_for_display() {
        let e = LibraryEntry {
            name: "Lessness Alliance Major".to_owned(),
            code: "f".to_owned(),
            notation: "&x38x14".to_owned(),
        };
        assert_eq!(e.display_name().len(), MAX_NAME - 1 + 3);
        assert!(e.display_name().ends_with("..."));
    }
}

// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 The clip2md authors

//! Markdown rendering for parsed clippings.
//!
//! Each book becomes one document:
//!
//! ```text
//! # <title> - <author>
//! ### <date> (Location <position>)
//! <note text>
//!
//! ### <date> (Location <position>)
//! ...
//! ```
//!
//! Notes without text are left out. A book with no text at all renders to
//! nothing, so no file is produced for it.
//!
//! # Example
//!
//! ```
//! use clip2md::parser::{OnMalformed, parse_clippings};
//! use clip2md::renderer::render_book;
//!
//! let text = "Dune (Frank Herbert)\r\n\
//!             - Your Highlight on Location 12 | Added on Monday\r\n\
//!             \r\n\
//!             Fear is the mind-killer.\r\n\
//!             ==========\r\n";
//! let clippings = parse_clippings(text, OnMalformed::Abort).unwrap();
//!
//! let markdown = render_book(&clippings.books()[0]).unwrap();
//! assert!(markdown.starts_with("# Dune - Frank Herbert\n"));
//! assert!(markdown.contains("### Monday (Location 12)\nFear is the mind-killer.\n"));
//! ```

use crate::parser::{BookGroup, Note};
use std::fmt::Write;

/// Renders one book as Markdown.
///
/// Returns `None` when none of the book's notes has text.
#[must_use]
pub fn render_book(book: &BookGroup) -> Option<String> {
    let mut sections = String::new();
    for note in book.notes().iter().filter(|note| !note.is_empty()) {
        render_note(&mut sections, note);
    }

    if sections.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(sections.len() + 64);
    writeln!(out, "# {} - {}", book.title(), book.author()).unwrap();
    out.push_str(&sections);
    Some(out)
}

fn render_note(out: &mut String, note: &Note) {
    writeln!(out, "### {} (Location {})", note.date, note.position).unwrap();
    writeln!(out, "{}\n", note.note_text).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{OnMalformed, SEPARATOR, parse_clippings};

    fn clipping(header: &str, location: &str, date: &str, text: &str) -> String {
        format!(
            "{header}\r\n- Your Highlight on Location {location} | Added on {date}\r\n\r\n{text}\r\n{SEPARATOR}\r\n"
        )
    }

    fn render(clippings: &[String]) -> Option<String> {
        let parsed = parse_clippings(&clippings.concat(), OnMalformed::Abort).unwrap();
        render_book(&parsed.books()[0])
    }

    #[test]
    fn renders_title_and_sections() {
        let output = render(&[
            clipping("Emma (Jane Austen)", "10-11", "Monday", "first"),
            clipping("Emma (Jane Austen)", "20", "Tuesday", "second"),
        ])
        .unwrap();

        assert_eq!(
            output,
            "# Emma - Jane Austen\n\
             ### Monday (Location 10-11)\nfirst\n\n\
             ### Tuesday (Location 20)\nsecond\n\n"
        );
    }

    #[test]
    fn skips_notes_without_text() {
        let output = render(&[
            clipping("Emma (Jane Austen)", "1", "Monday", ""),
            clipping("Emma (Jane Austen)", "2", "Tuesday", "kept"),
        ])
        .unwrap();

        assert!(!output.contains("Location 1)"));
        assert_eq!(output.matches("### ").count(), 1);
    }

    #[test]
    fn renders_nothing_when_all_notes_empty() {
        let output = render(&[
            clipping("Emma (Jane Austen)", "1", "Monday", ""),
            clipping("Emma (Jane Austen)", "2", "Tuesday", ""),
        ]);

        assert!(output.is_none());
    }

    #[test]
    fn headings_recover_date_and_position() {
        let sources = [
            clipping("Emma (Jane Austen)", "100-102", "Tuesday, 1 Jan 2020 10:00:00", "a"),
            clipping("Emma (Jane Austen)", "7", "Friday, 3 April 2020 21:15:42", "b"),
        ];
        let parsed = parse_clippings(&sources.concat(), OnMalformed::Abort).unwrap();
        let output = render_book(&parsed.books()[0]).unwrap();

        let recovered: Vec<(&str, &str)> = output
            .lines()
            .filter_map(|line| line.strip_prefix("### "))
            .filter_map(|heading| heading.strip_suffix(')')?.rsplit_once(" (Location "))
            .collect();
        let expected: Vec<(&str, &str)> = parsed.books()[0]
            .notes()
            .iter()
            .map(|note| (note.date.as_str(), note.position.as_str()))
            .collect();

        assert_eq!(recovered, expected);
    }
}

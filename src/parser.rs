// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 The clip2md authors

//! Parsing for Kindle `My Clippings.txt` exports.
//!
//! The clippings file is a flat list of blocks separated by lines made of
//! ten equals signs. Each block has four positional lines:
//!
//! ```text
//! Book Title (Author Name)
//! - Your Highlight on page 12 | Location 100-102 | Added on Tuesday, 1 Jan 2020 10:00:00
//!
//! Some highlighted text
//! ==========
//! ```
//!
//! Blocks are grouped by their `(title, author)` pair in order of first
//! appearance. Notes inside a group keep the order of the file.
//!
//! # Example
//!
//! ```
//! use clip2md::parser::{OnMalformed, parse_clippings};
//!
//! let text = "Dune (Frank Herbert)\r\n\
//!             - Your Highlight on Location 12-13 | Added on Monday, 2 March 2020 08:00:00\r\n\
//!             \r\n\
//!             Fear is the mind-killer.\r\n\
//!             ==========\r\n";
//!
//! let clippings = parse_clippings(text, OnMalformed::Abort).unwrap();
//! assert_eq!(clippings.books().len(), 1);
//! assert_eq!(clippings.books()[0].notes()[0].position, "12-13");
//! ```

use regex::Regex;
use serde::Serialize;
use snafu::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// The line that terminates every clipping block.
pub const SEPARATOR: &str = "==========";

/// Location explicitly labelled as such, e.g. `Location 100-102 |`.
static LABELLED_LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)location (\d+(?:-\d+)?) \|").unwrap());

/// Any number or range directly before a pipe.
static BARE_LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:-\d+)?) \|").unwrap());

/// Why a single clipping block could not be turned into a [`Note`].
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum BlockError {
    /// The block has no header line.
    #[snafu(display("block is empty"))]
    EmptyBlock,

    /// The header line has no `(` introducing the author.
    #[snafu(display("no author in parentheses in {header:?}"))]
    MissingAuthor {
        /// The offending header line.
        header: String,
    },

    /// Nothing precedes the author parentheses.
    #[snafu(display("empty title in {header:?}"))]
    EmptyTitle {
        /// The offending header line.
        header: String,
    },

    /// The author parentheses are empty.
    #[snafu(display("empty author in {header:?}"))]
    EmptyAuthor {
        /// The offending header line.
        header: String,
    },

    /// The block ends after the header line.
    #[snafu(display("missing metadata line"))]
    MissingMetadata,

    /// The metadata line has no `|` separating location and date.
    #[snafu(display("no '|' in metadata {line:?}"))]
    MissingPipe {
        /// The offending metadata line.
        line: String,
    },

    /// The metadata line has no location before a `|`.
    #[snafu(display("no location in metadata {line:?}"))]
    MissingLocation {
        /// The offending metadata line.
        line: String,
    },
}

/// Error type for clippings parsing failures.
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum ParseError {
    /// A block could not be parsed.
    #[snafu(display("malformed clipping #{index}: {source}"))]
    MalformedClipping {
        /// One-based position of the block in the file.
        index: usize,
        /// What was wrong with the block.
        source: BlockError,
    },
}

/// What to do when a block fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnMalformed {
    /// Fail the whole parse on the first malformed block.
    Abort,
    /// Skip the block and record the error in [`Clippings::skipped`].
    #[default]
    Skip,
}

/// A single highlight or note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Book title.
    pub title: String,
    /// Book author.
    pub author: String,
    /// Location reference, either `"123"` or a range like `"123-125"`.
    pub position: String,
    /// Date as written in the file, e.g. `"Tuesday, 1 Jan 2020 10:00:00"`.
    pub date: String,
    /// Annotation body. Empty for entries without text.
    pub note_text: String,
}

impl Note {
    /// The key of the book this note belongs to.
    #[must_use]
    pub fn key(&self) -> BookKey {
        BookKey {
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }

    /// Returns `true` if the note carries no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.note_text.is_empty()
    }
}

/// Identifies a book by its title and author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BookKey {
    /// Book title.
    pub title: String,
    /// Book author.
    pub author: String,
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.author)
    }
}

/// All notes of one book, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookGroup {
    #[serde(flatten)]
    key: BookKey,
    notes: Vec<Note>,
}

impl BookGroup {
    /// The `(title, author)` key shared by every note in the group.
    #[must_use]
    pub const fn key(&self) -> &BookKey {
        &self.key
    }

    /// Book title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.key.title
    }

    /// Book author.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.key.author
    }

    /// The notes, in the order they appear in the clippings file.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }
}

/// The parsed contents of a clippings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clippings {
    books: Vec<BookGroup>,
    skipped: Vec<ParseError>,
    unterminated: bool,
}

impl Clippings {
    /// Books in order of first appearance.
    #[must_use]
    pub fn books(&self) -> &[BookGroup] {
        &self.books
    }

    /// Blocks that were skipped under [`OnMalformed::Skip`].
    #[must_use]
    pub fn skipped(&self) -> &[ParseError] {
        &self.skipped
    }

    /// Returns `true` if text after the last separator was ignored.
    #[must_use]
    pub const fn unterminated(&self) -> bool {
        self.unterminated
    }

    /// Total number of notes across all books.
    #[must_use]
    pub fn note_count(&self) -> usize {
        self.books.iter().map(|book| book.notes.len()).sum()
    }

    /// Returns `true` if no notes were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    fn push(&mut self, index: &mut HashMap<BookKey, usize>, note: Note) {
        let key = note.key();
        if let Some(&i) = index.get(&key) {
            self.books[i].notes.push(note);
        } else {
            index.insert(key.clone(), self.books.len());
            self.books.push(BookGroup {
                key,
                notes: vec![note],
            });
        }
    }
}

/// Splits the file into raw blocks on separator lines.
///
/// Returns the blocks and the text after the last separator. The
/// separator lines themselves are not part of any block.
#[must_use]
pub fn split_blocks(text: &str) -> (Vec<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let end = offset + line.len();
        if line.trim_end_matches(['\r', '\n']) == SEPARATOR {
            blocks.push(&text[start..offset]);
            start = end;
        }
        offset = end;
    }

    (blocks, &text[start..])
}

/// Parses one raw block into a [`Note`].
///
/// # Errors
///
/// Returns a [`BlockError`] naming the first field that could not be
/// extracted.
pub fn parse_block(block: &str) -> Result<Note, BlockError> {
    let mut lines = block.lines();

    let header = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .context(EmptyBlockSnafu)?;
    let (title, author) = parse_header(header)?;

    let metadata = lines.next().context(MissingMetadataSnafu)?;
    let (position, date) = parse_metadata(metadata)?;

    // Line 2 is always blank.
    lines.next();
    let note_text = lines.next().unwrap_or_default();

    Ok(Note {
        title: title.to_owned(),
        author: author.to_owned(),
        position: position.to_owned(),
        date: date.to_owned(),
        note_text: note_text.to_owned(),
    })
}

/// Splits `"<Title> (<Author>)"` at the last opening parenthesis.
fn parse_header(header: &str) -> Result<(&str, &str), BlockError> {
    let trimmed = header.trim_start_matches('\u{feff}').trim_end();
    let open = trimmed
        .rfind('(')
        .context(MissingAuthorSnafu { header })?;

    let rest = &trimmed[open + 1..];
    let author = rest.strip_suffix(')').unwrap_or(rest).trim();
    let title = trimmed[..open].trim_end();

    ensure!(!title.is_empty(), EmptyTitleSnafu { header });
    ensure!(!author.is_empty(), EmptyAuthorSnafu { header });
    Ok((title, author))
}

/// Extracts the location and date from the metadata line.
fn parse_metadata(line: &str) -> Result<(&str, &str), BlockError> {
    // Drop the "- Y" style marker.
    let info = line.char_indices().nth(3).map_or("", |(i, _)| &line[i..]);
    ensure!(info.contains('|'), MissingPipeSnafu { line });

    let captures = LABELLED_LOCATION_RE
        .captures(info)
        .or_else(|| BARE_LOCATION_RE.captures(info))
        .context(MissingLocationSnafu { line })?;
    let (Some(matched), Some(position)) = (captures.get(0), captures.get(1)) else {
        return MissingLocationSnafu { line }.fail();
    };

    let date = info[matched.end()..].trim();
    let date = date.strip_prefix("Added on ").unwrap_or(date);
    Ok((position.as_str(), date))
}

/// Parses a whole clippings file into books.
///
/// # Errors
///
/// With [`OnMalformed::Abort`], returns the first malformed block as a
/// [`ParseError`]. With [`OnMalformed::Skip`] this never fails.
pub fn parse_clippings(text: &str, on_malformed: OnMalformed) -> Result<Clippings, ParseError> {
    let (blocks, tail) = split_blocks(text);
    let mut clippings = Clippings {
        unterminated: !tail.trim().is_empty(),
        ..Clippings::default()
    };
    let mut index = HashMap::new();

    for (i, block) in blocks.into_iter().enumerate() {
        match parse_block(block).context(MalformedClippingSnafu { index: i + 1 }) {
            Ok(note) => clippings.push(&mut index, note),
            Err(err) if on_malformed == OnMalformed::Skip => clippings.skipped.push(err),
            Err(err) => return Err(err),
        }
    }

    Ok(clippings)
}

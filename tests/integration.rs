// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 The clip2md authors

//! Integration tests for clip2md parsing, rendering and export.

use clip2md::export::{self, ExportOptions, FileNames, Outcome};
use clip2md::parser::{self, OnMalformed};
use clip2md::renderer;
use std::fs;
use std::path::Path;
use std::process::Command;

const CLIPPINGS: &str = "\u{feff}The Pragmatic Programmer (Andrew Hunt)\r\n\
- Your Highlight on page 12 | Location 180-181 | Added on Tuesday, 1 January 2019 08:12:33\r\n\
\r\n\
Care about your craft.\r\n\
==========\r\n\
Meditations (Marcus Aurelius)\r\n\
- Your Highlight on Location 403-404 | Added on Wednesday, 2 January 2019 21:01:09\r\n\
\r\n\
You have power over your mind, not outside events.\r\n\
==========\r\n\
The Pragmatic Programmer (Andrew Hunt)\r\n\
- Your Bookmark on page 30 | Location 455 | Added on Thursday, 3 January 2019 07:45:00\r\n\
\r\n\
\r\n\
==========\r\n\
The Pragmatic Programmer (Andrew Hunt)\r\n\
- Your Note on page 31 | Location 470 | Added on Thursday, 3 January 2019 07:50:12\r\n\
\r\n\
Try this on the build scripts.\r\n\
==========\r\n\
Bookmarks Only (Nobody)\r\n\
- Your Bookmark on Location 1 | Added on Friday, 4 January 2019 10:00:00\r\n\
\r\n\
\r\n\
==========\r\n";

/// Parses a realistic export and checks grouping and field extraction.
#[test]
fn parses_realistic_export() {
    let clippings = parser::parse_clippings(CLIPPINGS, OnMalformed::Abort).unwrap();

    assert_eq!(clippings.note_count(), 5);
    let titles: Vec<_> = clippings.books().iter().map(|b| b.title()).collect();
    assert_eq!(
        titles,
        ["The Pragmatic Programmer", "Meditations", "Bookmarks Only"]
    );

    let pragmatic = &clippings.books()[0];
    let positions: Vec<_> = pragmatic.notes().iter().map(|n| n.position.as_str()).collect();
    assert_eq!(positions, ["180-181", "455", "470"]);
    assert_eq!(pragmatic.notes()[0].date, "Tuesday, 1 January 2019 08:12:33");
}

/// Renders the book with a bookmark and checks the bookmark is left out.
#[test]
fn renders_only_notes_with_text() {
    let clippings = parser::parse_clippings(CLIPPINGS, OnMalformed::Abort).unwrap();
    let markdown = renderer::render_book(&clippings.books()[0]).unwrap();

    assert_eq!(
        markdown,
        "# The Pragmatic Programmer - Andrew Hunt\n\
         ### Tuesday, 1 January 2019 08:12:33 (Location 180-181)\n\
         Care about your craft.\n\n\
         ### Thursday, 3 January 2019 07:50:12 (Location 470)\n\
         Try this on the build scripts.\n\n"
    );
    assert!(renderer::render_book(&clippings.books()[2]).is_none());
}

/// Exports every book into a scratch directory.
#[test]
fn exports_one_file_per_book_with_text() {
    let scratch = tempfile::tempdir().unwrap();
    let input = scratch.path().join("My Clippings.txt");
    fs::write(&input, CLIPPINGS).unwrap();

    let text = fs::read_to_string(&input).unwrap();
    let clippings = parser::parse_clippings(&text, OnMalformed::Skip).unwrap();
    let dir = export::default_output_dir(&input);
    export::prepare_output_dir(&dir).unwrap();

    let mut names = FileNames::new();
    let outcomes: Vec<_> = clippings
        .books()
        .iter()
        .map(|book| export::export_book(book, &dir, &ExportOptions::default(), &mut names).unwrap())
        .collect();

    assert!(matches!(outcomes[0], Outcome::Written(_)));
    assert!(matches!(outcomes[1], Outcome::Written(_)));
    assert!(matches!(outcomes[2], Outcome::NoText));

    assert!(dir.join("The Pragmatic Programmer - Andrew Hunt.md").is_file());
    assert!(dir.join("Meditations - Marcus Aurelius.md").is_file());
    assert!(!dir.join("Bookmarks Only - Nobody.md").exists());
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_clip2md"))
        .args(args)
        .output()
        .expect("Failed to run clip2md")
}

/// Runs the binary end to end and checks the export directory.
#[test]
fn cli_writes_export_directory() {
    let scratch = tempfile::tempdir().unwrap();
    let input = scratch.path().join("My Clippings.txt");
    fs::write(&input, CLIPPINGS).unwrap();

    let output = run_cli(&["parse", input.to_str().unwrap()]);
    assert!(output.status.success(), "clip2md failed: {output:?}");

    let dir = scratch.path().join("Kindle Notes Export");
    let mut names: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        [
            "Meditations - Marcus Aurelius.md",
            "The Pragmatic Programmer - Andrew Hunt.md"
        ]
    );
}

/// An empty clippings file produces a warning and no output directory.
#[test]
fn cli_warns_on_empty_input() {
    let scratch = tempfile::tempdir().unwrap();
    let input = scratch.path().join("My Clippings.txt");
    fs::write(&input, "").unwrap();

    let output = run_cli(&["parse", input.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no notes found"));
    assert!(!scratch.path().join("Kindle Notes Export").exists());
}

/// Strict mode aborts on a malformed clipping; the default skips it.
#[test]
fn cli_strict_mode_aborts_on_malformed_clipping() {
    let scratch = tempfile::tempdir().unwrap();
    let input = scratch.path().join("My Clippings.txt");
    let broken = format!("No Author Here\r\n- Your Highlight\r\n\r\nx\r\n==========\r\n{CLIPPINGS}");
    fs::write(&input, broken).unwrap();
    let out = scratch.path().join("out");
    let out_arg = out.to_str().unwrap();

    let strict = run_cli(&["parse", "--strict", "-o", out_arg, input.to_str().unwrap()]);
    assert!(!strict.status.success());
    assert!(!out.exists());

    let lenient = run_cli(&["parse", "-q", "-o", out_arg, input.to_str().unwrap()]);
    assert!(lenient.status.success());
    assert!(String::from_utf8_lossy(&lenient.stderr).contains("malformed clipping #1"));
    assert!(Path::new(out_arg).join("Meditations - Marcus Aurelius.md").is_file());
}

/// `help`, no arguments and a missing path all print the usage.
#[test]
fn cli_prints_usage() {
    let cases: [&[&str]; 2] = [&[], &["help"]];
    for args in cases {
        let output = run_cli(args);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
    }

    let missing = run_cli(&["parse"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stdout).contains("Usage:"));
    let stderr = String::from_utf8_lossy(&missing.stderr);
    assert_eq!(stderr.lines().count(), 1, "unexpected stderr: {stderr}");
    assert!(stderr.contains("MissingInput"));

    let unknown = run_cli(&["frobnicate", "file.txt"]);
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stdout).contains("Usage:"));
}

/// Two books whose names sanitize to the same file both get written.
#[test]
fn cli_keeps_books_with_clashing_file_names() {
    let scratch = tempfile::tempdir().unwrap();
    let input = scratch.path().join("My Clippings.txt");
    let clippings = "A/B (X)\r\n- Your Highlight on Location 1 | Added on Monday\r\n\r\nslash\r\n==========\r\n\
                     A_B (X)\r\n- Your Highlight on Location 2 | Added on Monday\r\n\r\nunderscore\r\n==========\r\n";
    fs::write(&input, clippings).unwrap();

    let output = run_cli(&["parse", "-q", input.to_str().unwrap()]);
    assert!(output.status.success(), "clip2md failed: {output:?}");

    let dir = scratch.path().join("Kindle Notes Export");
    let first = fs::read_to_string(dir.join("A_B - X.md")).unwrap();
    let second = fs::read_to_string(dir.join("A_B - X (2).md")).unwrap();
    assert!(first.contains("slash"));
    assert!(second.contains("underscore"));
}

/// A converter failing for one book does not stop the others.
#[cfg(unix)]
#[test]
fn cli_pdf_conversion_failure_only_skips_that_book() {
    let scratch = tempfile::tempdir().unwrap();
    let input = scratch.path().join("My Clippings.txt");
    fs::write(&input, CLIPPINGS).unwrap();

    // Refuses Meditations and copies the Markdown for everything else.
    let script = scratch.path().join("convert.sh");
    fs::write(
        &script,
        "case \"$1\" in *Meditations*) echo refused >&2; exit 1;; esac\ncat > \"$1\"\n",
    )
    .unwrap();
    let converter = format!("sh {}", script.display());
    let out = scratch.path().join("out");

    let output = run_cli(&[
        "parse",
        "--format=pdf",
        "--pdf-converter",
        &converter,
        "-o",
        out.to_str().unwrap(),
        input.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "clip2md failed: {output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to convert"));
    assert!(stderr.contains("refused"));

    let mut names: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["The Pragmatic Programmer - Andrew Hunt.pdf"]);
    let pdf = fs::read_to_string(out.join("The Pragmatic Programmer - Andrew Hunt.pdf")).unwrap();
    assert!(pdf.starts_with("# The Pragmatic Programmer - Andrew Hunt\n"));
}

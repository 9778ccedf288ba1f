// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 The clip2md authors

//! Command-line interface for clip2md.
//!
//! This binary provides the `clip2md` command for exporting Kindle
//! clippings to one Markdown, PDF or JSON file per book.

use clip2md::export::{self, ExportOptions, FileNames, OutputFormat, Outcome, PdfConverter};
use clip2md::parser::{self, OnMalformed};
use lexopt::prelude::*;
use snafu::prelude::*;
use std::path::PathBuf;

/// Parsed command-line arguments.
struct Cli {
    command: Option<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
    converter: PdfConverter,
    strict: bool,
    quiet: bool,
    dry_run: bool,
}

/// Errors that end the run.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("unknown command {command:?}"))]
    UnknownCommand { command: String },

    #[snafu(display("a clippings file is required"))]
    MissingInput,

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("{source}"))]
    Export { source: export::ExportError },
}

/// Prints the usage message to stdout.
fn print_help() {
    println!(
        "\
{name} {version}
Convert Kindle clippings to one Markdown file per book

Usage: {name} <COMMAND> [OPTIONS] <CLIPPINGS>

Commands:
  help   Show this help message
  parse  Parse the clippings file and export its notes

Arguments:
  <CLIPPINGS>  Path to the Kindle \"My Clippings.txt\" file

Options:
      --format <FORMAT>      Output format: markdown, pdf or json (default: markdown)
  -o, --output <DIR>         Output directory (default: \"{dir}\" next to the input)
      --pdf-converter <CMD>  Command converting Markdown on stdin to PDF
                             (default: {converter})
      --strict               Abort on the first malformed clipping
  -q, --quiet                Suppress progress messages
  -n, --dry-run              Show what would be written without writing
  -h, --help                 Print help
  -V, --version              Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        dir = export::EXPORT_DIR_NAME,
        converter = PdfConverter::default(),
    );
}

/// Parses the command line.
///
/// Options may appear anywhere. The first positional argument is the
/// command and the last one is the clippings file.
fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut command = None;
    let mut input = None;
    let mut output = None;
    let mut format = OutputFormat::default();
    let mut converter = PdfConverter::default();
    let mut strict = false;
    let mut quiet = false;
    let mut dry_run = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Long("format") => format = parser.value()?.parse()?,
            Short('o') | Long("output") => output = Some(parser.value()?.parse()?),
            Long("pdf-converter") => converter = parser.value()?.parse()?,
            Long("strict") => strict = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            // The first value is the command; the last one is the file.
            Value(val) if command.is_none() => command = Some(val.string()?),
            Value(val) => input = Some(PathBuf::from(val)),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        command,
        input,
        output,
        format,
        converter,
        strict,
        quiet,
        dry_run,
    })
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    match cli.command.as_deref() {
        None | Some("help") => print_help(),
        Some("parse") => {
            if cli.input.is_none() {
                print_help();
                return MissingInputSnafu.fail();
            }
            run(&cli)?;
        }
        Some(other) => {
            print_help();
            return UnknownCommandSnafu { command: other }.fail();
        }
    }

    Ok(())
}

/// Parses the clippings file and exports every book.
///
/// Conversion failures are reported per book; filesystem errors end the run.
fn run(cli: &Cli) -> Result<(), Error> {
    let input = cli.input.as_deref().context(MissingInputSnafu)?;
    let text = std::fs::read_to_string(input).context(ReadFileSnafu { path: input })?;

    let on_malformed = if cli.strict {
        OnMalformed::Abort
    } else {
        OnMalformed::Skip
    };
    let clippings =
        parser::parse_clippings(&text, on_malformed).context(ParseFileSnafu { path: input })?;

    for skipped in clippings.skipped() {
        eprintln!("warning: skipping {skipped}");
    }
    if clippings.unterminated() {
        eprintln!("warning: ignoring unterminated text after the last clipping");
    }
    if clippings.is_empty() {
        eprintln!("warning: no notes found in {}, nothing to export", input.display());
        return Ok(());
    }

    let out_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| export::default_output_dir(input));
    if !cli.dry_run {
        export::prepare_output_dir(&out_dir).context(ExportSnafu)?;
    }

    let opts = ExportOptions {
        format: cli.format,
        converter: cli.converter.clone(),
        dry_run: cli.dry_run,
    };

    let mut names = FileNames::new();
    let mut written = 0;
    for book in clippings.books() {
        match export::export_book(book, &out_dir, &opts, &mut names).context(ExportSnafu)? {
            Outcome::Written(path) => {
                written += 1;
                if !cli.quiet {
                    eprintln!("Wrote {}", path.display());
                }
            }
            Outcome::WouldWrite(path) => eprintln!("Would write {}", path.display()),
            Outcome::NoText => {
                if !cli.quiet {
                    eprintln!("Skipping {} (no notes with text)", book.key());
                }
            }
            Outcome::ConversionFailed { path, source } => {
                eprintln!("error: failed to convert {}: {source}", path.display());
            }
        }
    }

    if !cli.quiet && !cli.dry_run {
        eprintln!(
            "Exported {written} of {} books ({} notes) to {}",
            clippings.books().len(),
            clippings.note_count(),
            out_dir.display()
        );
    }

    Ok(())
}

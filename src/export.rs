// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 The clip2md authors

//! Writing rendered books to disk.
//!
//! Every book is exported on its own. Filesystem errors are returned to
//! the caller, while a failed PDF conversion only affects its own book and
//! is reported as [`Outcome::ConversionFailed`].

use crate::parser::BookGroup;
use crate::renderer;
use snafu::prelude::*;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;

/// Name of the directory created next to the clippings file.
pub const EXPORT_DIR_NAME: &str = "Kindle Notes Export";

/// Converter argument replaced by the path of the PDF to produce.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Error type for export failures that should stop the run.
#[derive(Debug, Snafu)]
pub enum ExportError {
    /// Failed to create the output directory.
    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to serialize a book as JSON.
    #[snafu(display("failed to serialize {book}: {source}"))]
    Serialize {
        /// The book being serialized.
        book: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Error type for a failed PDF conversion.
#[derive(Debug, Snafu)]
pub enum ConvertError {
    /// The converter program could not be started.
    #[snafu(display("failed to run {program}: {source}"))]
    Spawn {
        /// The converter program.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The Markdown could not be passed to the converter.
    #[snafu(display("failed to send markdown to {program}: {source}"))]
    Feed {
        /// The converter program.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The converter exited unsuccessfully.
    #[snafu(display("{program} exited with {status}: {stderr}"))]
    Exit {
        /// The converter program.
        program: String,
        /// The converter's exit status.
        status: ExitStatus,
        /// What the converter printed to stderr.
        stderr: String,
    },

    /// The converter succeeded but produced no file.
    #[snafu(display("{program} did not produce {}", path.display()))]
    NoOutput {
        /// The converter program.
        program: String,
        /// The file the converter was asked to produce.
        path: PathBuf,
    },

    /// The converted file could not be moved into place.
    #[snafu(display("failed to move PDF to {}: {source}", path.display()))]
    Persist {
        /// The final PDF path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Which kind of file to produce for each book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Markdown documents.
    #[default]
    Markdown,
    /// PDF documents produced by an external converter.
    Pdf,
    /// The parsed notes as JSON.
    Json,
}

impl OutputFormat {
    /// File extension for this format, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown format {other:?} (expected markdown, pdf or json)"
            )),
        }
    }
}

/// External command turning Markdown on stdin into a PDF file.
///
/// Arguments equal to [`OUTPUT_PLACEHOLDER`] are replaced with the path of
/// the file to write. Without a placeholder the path is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfConverter {
    /// Program to run.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Default for PdfConverter {
    fn default() -> Self {
        Self {
            program: "pandoc".into(),
            args: ["--from", "markdown", "--output", OUTPUT_PLACEHOLDER]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl FromStr for PdfConverter {
    type Err = String;

    /// Parses a whitespace-separated command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace().map(str::to_owned);
        let program = words.next().ok_or("converter command is empty")?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl fmt::Display for PdfConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl PdfConverter {
    fn command(&self, output: &Path) -> Command {
        let mut substituted = false;
        let mut args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| {
                if arg == OUTPUT_PLACEHOLDER {
                    substituted = true;
                    output.as_os_str().to_owned()
                } else {
                    OsString::from(arg)
                }
            })
            .collect();
        if !substituted {
            args.push(output.as_os_str().to_owned());
        }

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }

    /// Runs the converter, writing the PDF to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started, exits
    /// unsuccessfully, or does not create `output`.
    pub fn convert(&self, markdown: &str, output: &Path) -> Result<(), ConvertError> {
        let program = self.program.as_str();
        let mut child = self
            .command(output)
            .spawn()
            .context(SpawnSnafu { program })?;

        // A converter that exits early closes the pipe; its exit status and
        // stderr explain more than the broken pipe does.
        let fed = child
            .stdin
            .take()
            .map_or(Ok(()), |mut stdin| stdin.write_all(markdown.as_bytes()));

        let result = child.wait_with_output().context(SpawnSnafu { program })?;
        ensure!(
            result.status.success(),
            ExitSnafu {
                program,
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            }
        );
        fed.context(FeedSnafu { program })?;
        ensure!(output.exists(), NoOutputSnafu { program, path: output });
        Ok(())
    }
}

/// Settings for exporting books, fixed for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Kind of file to produce.
    pub format: OutputFormat,
    /// Converter used for [`OutputFormat::Pdf`].
    pub converter: PdfConverter,
    /// Report what would be written without touching the disk.
    pub dry_run: bool,
}

/// What happened to one book.
#[derive(Debug)]
pub enum Outcome {
    /// The file was written.
    Written(PathBuf),
    /// The file would have been written (dry run).
    WouldWrite(PathBuf),
    /// The book has no notes with text, so nothing was written.
    NoText,
    /// PDF conversion failed and no file was written.
    ConversionFailed {
        /// The PDF that was not produced.
        path: PathBuf,
        /// Why the conversion failed.
        source: ConvertError,
    },
}

/// Returns the default output directory for a clippings file.
#[must_use]
pub fn default_output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(EXPORT_DIR_NAME),
        _ => PathBuf::from(EXPORT_DIR_NAME),
    }
}

/// Creates the output directory if it does not exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn prepare_output_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })
}

/// Returns `<Title> - <Author>` with characters unsafe in file names replaced.
#[must_use]
pub fn file_stem(book: &BookGroup) -> String {
    book.key()
        .to_string()
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\') || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// File stems handed out during one run.
///
/// Distinct books can sanitize to the same stem (`A/B` and `A_B`), and
/// case-insensitive filesystems treat `Emma` and `EMMA` as one file. Later
/// books get a ` (2)`, ` (3)`, ... suffix instead of overwriting earlier ones.
#[derive(Debug, Default)]
pub struct FileNames {
    used: HashSet<String>,
}

impl FileNames {
    /// Creates an empty set of names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a stem for `book` that no earlier book of this run uses.
    pub fn claim(&mut self, book: &BookGroup) -> String {
        let base = file_stem(book);
        let mut stem = base.clone();
        let mut n = 1;
        while !self.used.insert(stem.to_lowercase()) {
            n += 1;
            stem = format!("{base} ({n})");
        }
        stem
    }
}

/// Exports one book into `dir` according to `opts`.
///
/// The file name is reserved in `names` only when the book produces a file.
///
/// # Errors
///
/// Returns an error if a file cannot be written. Conversion failures are
/// reported through [`Outcome::ConversionFailed`] instead.
pub fn export_book(
    book: &BookGroup,
    dir: &Path,
    opts: &ExportOptions,
    names: &mut FileNames,
) -> Result<Outcome, ExportError> {
    let contents = match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(book).context(SerializeSnafu {
            book: book.key().to_string(),
        })?,
        OutputFormat::Markdown | OutputFormat::Pdf => match renderer::render_book(book) {
            Some(markdown) => markdown,
            None => return Ok(Outcome::NoText),
        },
    };

    let path = dir.join(format!("{}.{}", names.claim(book), opts.format.extension()));

    if opts.dry_run {
        return Ok(Outcome::WouldWrite(path));
    }

    if opts.format == OutputFormat::Pdf {
        return Ok(match write_pdf(&contents, &path, &opts.converter) {
            Ok(()) => Outcome::Written(path),
            Err(source) => Outcome::ConversionFailed { path, source },
        });
    }

    std::fs::write(&path, contents).context(WriteFileSnafu { path: &path })?;
    Ok(Outcome::Written(path))
}

/// Converts into a sibling partial file and renames it on success.
fn write_pdf(markdown: &str, path: &Path, converter: &PdfConverter) -> Result<(), ConvertError> {
    let partial = partial_path(path);
    let result = converter
        .convert(markdown, &partial)
        .and_then(|()| std::fs::rename(&partial, path).context(PersistSnafu { path }));

    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_stem()
        .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial.pdf"))
}

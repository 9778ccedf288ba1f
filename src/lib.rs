// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 The clip2md authors

//! Convert Kindle clippings exports to per-book Markdown notes.
//!
//! Kindle devices append every highlight and note to a single
//! `My Clippings.txt` file. This crate:
//!
//! 1. Parses that file into notes grouped by book
//! 2. Renders each book as a Markdown document
//! 3. Writes one file per book as Markdown, PDF or JSON
//!
//! # Example
//!
//! ```no_run
//! use clip2md::{export, parser, renderer};
//!
//! let text = std::fs::read_to_string("My Clippings.txt").unwrap();
//! let clippings = parser::parse_clippings(&text, parser::OnMalformed::Skip).unwrap();
//!
//! for book in clippings.books() {
//!     if let Some(markdown) = renderer::render_book(book) {
//!         println!("{markdown}");
//!     }
//! }
//!
//! let dir = export::default_output_dir("My Clippings.txt".as_ref());
//! export::prepare_output_dir(&dir).unwrap();
//! let mut names = export::FileNames::new();
//! for book in clippings.books() {
//!     export::export_book(book, &dir, &export::ExportOptions::default(), &mut names).unwrap();
//! }
//! ```
//!
//! # Modules
//!
//! - [`parser`]: clippings parsing and the note data model
//! - [`renderer`]: Markdown generation for one book
//! - [`export`]: output formats and file writing

#![deny(missing_docs)]

pub mod export;
pub mod parser;
pub mod renderer;

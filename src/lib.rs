//! # file-bundle
//!
//! Turns a directory tree, a single file or a ZIP archive into one plain-text
//! bundle ready to paste into an LLM, plus statistics and a language mix.
//!
//! ## Features
//!
//! - Text extraction from source files, PDF, DOCX, spreadsheets and other
//!   office containers
//! - Extension include/exclude filters and directory pruning by literal,
//!   glob or regex
//! - Archive expansion into a self-cleaning temporary directory
//! - Stable, parseable bundle format
//! - Atomic file operations with automatic backups
//!
//! ## Quick Start
//!
//! ```no_run
//! use file_bundle::{process_directory, serialize_bundle, DirPattern, ProcessOptions};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = ProcessOptions::new()
//!     .exclude_extensions(["lock"])
//!     .exclude_dir(DirPattern::literal("node_modules"));
//!
//! let entries = process_directory(Path::new("./proj"), &options, None)?;
//! print!("{}", serialize_bundle(&entries));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Classifier**: maps a path to its extension and content kind
//! 2. **Extractors**: one strategy per content kind, failures become placeholders
//! 3. **Walker**: depth-first traversal with filters and progress
//! 4. **Analyzer**: extension mix and display colors
//! 5. **Bundle**: serialization and statistics
//! 6. **Writer**: persists the bundle and its summary

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod archive;
mod bundle;
mod classify;
mod config;
mod entry;
mod error;
mod extract;
mod filter;
mod language;
mod pipeline;
mod walker;
mod writer;

#[cfg(feature = "async")]
pub mod asynchronous;
pub mod request;

pub use archive::{extract_archive, ExtractedArchive};
pub use bundle::{compute_stats, parse_bundle, serialize_bundle, BundleStats, SEPARATOR};
pub use classify::{classify, extension_of, normalize_extension, ContentKind, NO_EXTENSION};
pub use config::{Config, ConfigBuilder, InputKind, LabelMode};
pub use entry::{Outcome, ProcessedEntry};
pub use error::{Error, Result};
pub use extract::{
    error_placeholder, unsupported_placeholder, DocxExtractor, Extractor, ExtractorRegistry,
    GenericExtractor, PdfExtractor, PlainTextExtractor, SpreadsheetExtractor,
    BINARY_PLACEHOLDER, SKIPPED_PLACEHOLDER,
};
pub use filter::{DirPattern, ProcessOptions};
pub use language::{
    analyze_languages, canonical_color, compute_language_distribution, Color, ColorPalette,
    LabelMap, LanguageDistribution, LanguageStat,
};
pub use pipeline::{Pipeline, PipelineStats};
pub use walker::Processor;
pub use writer::bundle_file_name;

use std::path::Path;

/// Extracts text from exactly one file. Never fails.
///
/// Failures and filtered-out files are reported through placeholder text.
#[must_use]
pub fn process_file(path: &Path, options: &ProcessOptions) -> ProcessedEntry {
    Processor::new(options.clone()).process_file(path)
}

/// Processes every file under `path`, depth-first.
///
/// `on_progress` receives `(processed, total)` for the directory level that
/// just finished an entry.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed or an entry cannot be
/// stat'ed.
pub fn process_directory(
    path: &Path,
    options: &ProcessOptions,
    on_progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<Vec<ProcessedEntry>> {
    let processor = Processor::new(options.clone());
    match on_progress {
        Some(on_progress) => processor.process_directory_with_progress(path, on_progress),
        None => processor.process_directory(path),
    }
}

/// Processes every file inside a ZIP archive.
///
/// Entry paths are relative to the archive root. The temporary extraction
/// directory is removed before this returns.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or expanded.
///
/// # Examples
///
/// ```no_run
/// use file_bundle::{extract_from_archive, ProcessOptions};
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut on_progress = |done: usize, total: usize| eprintln!("{done}/{total}");
/// let entries = extract_from_archive(
///     Path::new("proj.zip"),
///     &ProcessOptions::new(),
///     Some(&mut on_progress),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn extract_from_archive(
    path: &Path,
    options: &ProcessOptions,
    on_progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<Vec<ProcessedEntry>> {
    let processor = Processor::new(options.clone());
    match on_progress {
        Some(on_progress) => processor.extract_from_archive_with_progress(path, on_progress),
        None => processor.extract_from_archive(path),
    }
}

/// Runs the complete pipeline with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The input cannot be walked or expanded
/// - Output files cannot be written
///
/// # Examples
///
/// ```no_run
/// use file_bundle::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .input(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}

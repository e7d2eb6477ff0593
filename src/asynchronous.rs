//! Async facade over the blocking pipeline.
//!
//! Each call moves its work onto tokio's blocking pool so request handlers
//! and UI loops are never stalled by file reads or archive expansion.

use crate::{
    entry::ProcessedEntry,
    error::{Error, Result},
    filter::ProcessOptions,
    walker::Processor,
};
use std::path::PathBuf;
use tokio::task;

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| Error::task(e.to_string()))?
}

/// Processes one file on the blocking pool.
///
/// # Errors
///
/// Returns an error only if the background task panicked or was cancelled.
pub async fn process_file(path: impl Into<PathBuf>, options: ProcessOptions) -> Result<ProcessedEntry> {
    let path = path.into();
    run_blocking(move || Ok(Processor::new(options).process_file(&path))).await
}

/// Processes a directory tree on the blocking pool.
///
/// # Errors
///
/// Returns the walk's error, or an error if the background task failed.
pub async fn process_directory(
    path: impl Into<PathBuf>,
    options: ProcessOptions,
) -> Result<Vec<ProcessedEntry>> {
    let path = path.into();
    run_blocking(move || Processor::new(options).process_directory(&path)).await
}

/// Processes a ZIP archive on the blocking pool.
///
/// # Errors
///
/// Returns the archive error, or an error if the background task failed.
pub async fn extract_from_archive(
    path: impl Into<PathBuf>,
    options: ProcessOptions,
) -> Result<Vec<ProcessedEntry>> {
    let path = path.into();
    run_blocking(move || Processor::new(options).extract_from_archive(&path)).await
}

use crate::{
    classify::classify,
    entry::{Outcome, ProcessedEntry},
    error::{Error, Result},
    extract::{error_placeholder, ExtractorRegistry},
    filter::ProcessOptions,
};
use std::panic::{self, AssertUnwindSafe};
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};
use tracing::{debug, trace, warn};

/// One directory level of the depth-first walk.
struct Frame {
    entries: std::vec::IntoIter<PathBuf>,
    processed: usize,
    total: usize,
}

impl Frame {
    fn open(dir: &Path, sorted: bool) -> Result<Self> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            entries.push(entry.path());
        }

        if sorted {
            entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        }

        let total = entries.len();
        Ok(Self {
            entries: entries.into_iter(),
            processed: 0,
            total,
        })
    }

    fn advance(&mut self, on_progress: &mut dyn FnMut(usize, usize)) {
        self.processed += 1;
        on_progress(self.processed, self.total);
    }
}

/// Runs extraction over files, directory trees and selections.
///
/// A processor pairs read-only [`ProcessOptions`] with the
/// [`ExtractorRegistry`] used to turn each file into text.
#[derive(Debug, Clone, Default)]
pub struct Processor {
    options: ProcessOptions,
    registry: ExtractorRegistry,
}

impl Processor {
    /// Creates a processor with the built-in extraction strategies.
    #[must_use]
    pub fn new(options: ProcessOptions) -> Self {
        Self::with_registry(options, ExtractorRegistry::new())
    }

    /// Creates a processor with a custom strategy table.
    #[must_use]
    pub const fn with_registry(options: ProcessOptions, registry: ExtractorRegistry) -> Self {
        Self { options, registry }
    }

    /// Returns the options of this processor.
    #[must_use]
    pub const fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Returns the strategy table of this processor.
    #[must_use]
    pub const fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Processes exactly one file. Never fails.
    ///
    /// Files rejected by the extension filters still produce an entry,
    /// carrying the skip placeholder.
    #[must_use]
    pub fn process_file(&self, path: &Path) -> ProcessedEntry {
        self.process_file_as(path, path)
    }

    /// Processes `path` but reports (and filters) it as `shown`.
    fn process_file_as(&self, path: &Path, shown: &Path) -> ProcessedEntry {
        let (extension, kind) = classify(path);
        let shown_str = shown.to_string_lossy().into_owned();

        if !self.options.should_process_file(shown) {
            trace!("Skipping {} (extension filter)", shown_str);
            return ProcessedEntry::skipped(shown_str, extension);
        }

        trace!("Extracting {} as {}", shown_str, kind);
        let (text, outcome) = panic::catch_unwind(AssertUnwindSafe(|| {
            self.registry.extract_with_outcome(path, kind)
        }))
        .unwrap_or_else(|_| {
            warn!("Extractor aborted on {}", shown_str);
            (
                error_placeholder("file", "extractor aborted unexpectedly"),
                Outcome::Failed,
            )
        });

        ProcessedEntry::new(shown_str, extension, text).with_outcome(outcome)
    }

    /// Processes a directory tree depth-first.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed or an entry cannot
    /// be stat'ed. File-level extraction failures never error.
    pub fn process_directory(&self, root: &Path) -> Result<Vec<ProcessedEntry>> {
        self.process_directory_with_progress(root, &mut |_, _| {})
    }

    /// Processes a directory tree depth-first, reporting progress.
    ///
    /// After each entry of a directory is fully handled (a file, a pruned
    /// directory, or a completely walked subdirectory) `on_progress` receives
    /// the number of handled entries at that level and the level's total.
    /// The counts are per level, not global.
    ///
    /// Entries are emitted in enumeration order combined with depth-first
    /// descent. Pruned directories contribute nothing beneath them. Symbolic
    /// links are never followed and produce no entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed or an entry cannot
    /// be stat'ed.
    pub fn process_directory_with_progress(
        &self,
        root: &Path,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<ProcessedEntry>> {
        debug!("Processing directory {}", root.display());
        self.walk(root, None, on_progress)
    }

    /// Depth-first walk over an explicit stack of directory frames.
    ///
    /// With `base` set, entries are filtered and reported relative to it.
    pub(crate) fn walk(
        &self,
        root: &Path,
        base: Option<&Path>,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<ProcessedEntry>> {
        let sorted = self.options.sorts_entries();
        let mut results = Vec::new();
        let mut stack = vec![Frame::open(root, sorted)?];

        while let Some(frame) = stack.last_mut() {
            let Some(path) = frame.entries.next() else {
                stack.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.advance(on_progress);
                }
                continue;
            };

            let file_type = fs::symlink_metadata(&path)
                .map_err(|e| Error::io(&path, e))?
                .file_type();
            let shown = base
                .and_then(|base| pathdiff::diff_paths(&path, base))
                .unwrap_or_else(|| path.clone());

            if file_type.is_symlink() {
                debug!("Skipping symlink {}", shown.display());
            } else if file_type.is_dir() {
                if self.options.should_skip_directory(&shown) {
                    debug!("Pruning directory {}", shown.display());
                } else {
                    stack.push(Frame::open(&path, sorted)?);
                    continue;
                }
            } else {
                results.push(self.process_file_as(&path, &shown));
            }

            if let Some(frame) = stack.last_mut() {
                frame.advance(on_progress);
            }
        }

        debug!("Processed {} files under {}", results.len(), root.display());
        Ok(results)
    }

    /// Processes a flat selection of files, preserving input order.
    ///
    /// Reads fan out over at most one worker per CPU; each file is
    /// independent, so no state is shared between workers.
    #[must_use]
    pub fn process_selection<P>(&self, paths: &[P]) -> Vec<ProcessedEntry>
    where
        P: AsRef<Path> + Sync,
    {
        if paths.is_empty() {
            return Vec::new();
        }

        let workers = num_cpus::get().clamp(1, paths.len());
        let chunk_size = paths.len().div_ceil(workers);
        debug!("Processing {} selected files on {} workers", paths.len(), workers);

        thread::scope(|scope| {
            let handles: Vec<_> = paths
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|p| self.process_file(p.as_ref()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(entries) => entries,
                    Err(payload) => panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}

//! ZIP archive support.
//!
//! Archives are expanded into a uniquely named temporary directory next to
//! the archive, walked like any other directory, and removed afterwards on
//! every exit path.

use crate::{
    entry::ProcessedEntry,
    error::{Error, Result},
    walker::Processor,
};
use std::{
    fs,
    io::{self, Read, Seek},
    path::{Path, PathBuf},
    time::SystemTime,
};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

/// An archive expanded on disk.
///
/// The directory is removed when this value is dropped, including during
/// unwinding. Use [`close`](Self::close) to observe removal errors.
#[derive(Debug)]
pub struct ExtractedArchive {
    dir: TempDir,
    source: PathBuf,
    files: usize,
}

impl ExtractedArchive {
    /// Returns the extraction root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the archive this directory was expanded from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the number of files written out of the archive.
    #[must_use]
    pub const fn file_count(&self) -> usize {
        self.files
    }

    /// Removes the extraction directory now.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory could not be deleted.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| Error::io(&path, e))?;
        debug!("Removed extraction directory {}", path.display());
        Ok(())
    }
}

/// Expands a ZIP archive into a fresh `temp_<millis>_*` directory beside it.
///
/// # Errors
///
/// Returns an error if the temporary directory cannot be created or the
/// archive cannot be read. A partially created directory is removed before
/// the error is returned.
pub fn extract_archive(archive_path: &Path) -> Result<ExtractedArchive> {
    let parent = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let millis = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_millis();

    let dir = tempfile::Builder::new()
        .prefix(&format!("temp_{millis}_"))
        .tempdir_in(parent)
        .map_err(|e| Error::io(parent, e))?;

    let file = fs::File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| Error::archive(archive_path, e.to_string()))?;
    let files = extract_members(&mut archive, archive_path, dir.path())?;

    debug!(
        "Extracted {} files of {} into {}",
        files,
        archive_path.display(),
        dir.path().display()
    );

    Ok(ExtractedArchive {
        dir,
        source: archive_path.to_path_buf(),
        files,
    })
}

/// Writes regular members under `dest`, returning how many were written.
///
/// Members whose names escape `dest` and symlink members are skipped, so
/// the expanded tree only ever holds the archive's own bytes.
fn extract_members<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    dest: &Path,
) -> Result<usize> {
    let mut count = 0;
    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .map_err(|e| Error::archive(archive_path, format!("member {i}: {e}")))?;

        let Some(relative) = member.enclosed_name() else {
            warn!("Skipping unsafe archive member {}", member.name());
            continue;
        };
        if member.is_symlink() {
            warn!("Skipping symlink archive member {}", member.name());
            continue;
        }

        let target = dest.join(relative);
        if member.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| Error::io(&target, e))?;
        io::copy(&mut member, &mut out)
            .map_err(|e| Error::archive(archive_path, format!("{}: {e}", member.name())))?;
        count += 1;
    }
    Ok(count)
}

impl Processor {
    /// Processes every file inside a ZIP archive.
    ///
    /// Entry paths are relative to the archive root, and directory
    /// patterns are matched against those relative paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be expanded or the expanded
    /// tree cannot be walked. The temporary directory is removed either way,
    /// including when `on_progress` panics.
    pub fn extract_from_archive(&self, archive_path: &Path) -> Result<Vec<ProcessedEntry>> {
        self.extract_from_archive_with_progress(archive_path, &mut |_, _| {})
    }

    /// Like [`extract_from_archive`](Self::extract_from_archive), reporting
    /// per-level progress.
    ///
    /// # Errors
    ///
    /// See [`extract_from_archive`](Self::extract_from_archive).
    pub fn extract_from_archive_with_progress(
        &self,
        archive_path: &Path,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<ProcessedEntry>> {
        let extracted = extract_archive(archive_path)?;
        let entries = self.walk(extracted.path(), Some(extracted.path()), on_progress)?;

        if let Err(e) = extracted.close() {
            warn!("Failed to remove extraction directory: {}", e);
        }

        Ok(entries)
    }
}

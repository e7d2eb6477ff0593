use crate::classify::NO_EXTENSION;
use crate::extract::{BINARY_PLACEHOLDER, SKIPPED_PLACEHOLDER};
use serde::{Deserialize, Serialize};

/// How an entry's text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// The text is the file's content (or a binary/unsupported marker)
    #[default]
    Extracted,
    /// The extension filters rejected the file
    Skipped,
    /// The extraction strategy failed; the text is an error placeholder
    Failed,
}

/// The result of processing one file.
///
/// `text` is always present: failed or skipped extractions carry a
/// bracketed placeholder instead of an error. The [`Outcome`] is kept beside
/// the text and is not serialized, so entries read back from JSON or a
/// bundle are always [`Outcome::Extracted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    /// Location of the file as discovered during traversal
    #[serde(rename = "filePath")]
    pub path: String,

    /// Normalized extension (`.py`) or `(no-ext)`
    pub extension: String,

    /// Extracted text or a placeholder
    pub text: String,

    #[serde(skip)]
    outcome: Outcome,
}

impl ProcessedEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(path: impl Into<String>, extension: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extension: extension.into(),
            text: text.into(),
            outcome: Outcome::Extracted,
        }
    }

    /// Creates the entry for a file rejected by the extension filters.
    #[must_use]
    pub fn skipped(path: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::new(path, extension, SKIPPED_PLACEHOLDER).with_outcome(Outcome::Skipped)
    }

    /// Sets how the text was produced.
    #[must_use]
    pub const fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Returns how the text was produced.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns true if the file was rejected by the extension filters.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.outcome == Outcome::Skipped
    }

    /// Returns true if extraction failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    /// Returns true if the text is a placeholder rather than file content.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.is_skipped()
            || self.is_error()
            || self.text == BINARY_PLACEHOLDER
            || (self.text.starts_with("[Unsupported file type: ") && self.text.ends_with(']'))
    }

    /// Returns true if the file name has no extension.
    #[must_use]
    pub fn has_no_extension(&self) -> bool {
        self.extension == NO_EXTENSION
    }

    /// Returns the number of lines in the text.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

//! Bundle text format.
//!
//! Every entry is written as
//!
//! ```text
//! ================================================================================
//! FILE: <path>
//! EXTENSION: <ext>
//! ================================================================================
//!
//! <text>
//!
//!
//! ```
//!
//! The `EXTENSION` line is omitted when the extension is empty. The layout
//! is consumed by downstream tools and must stay byte-stable.

use crate::{
    entry::ProcessedEntry,
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Line separating entry headers from content.
pub const SEPARATOR: &str =
    "================================================================================";

const FILE_PREFIX: &str = "FILE: ";
const EXTENSION_PREFIX: &str = "EXTENSION: ";
const ENTRY_TRAILER: &str = "\n\n\n";

/// Renders entries into bundle text, in input order.
#[must_use]
pub fn serialize_bundle(entries: &[ProcessedEntry]) -> String {
    let capacity = entries
        .iter()
        .map(|e| e.path.len() + e.extension.len() + e.text.len() + 2 * SEPARATOR.len() + 32)
        .sum();
    let mut out = String::with_capacity(capacity);

    for entry in entries {
        out.push_str(SEPARATOR);
        out.push('\n');
        out.push_str(FILE_PREFIX);
        out.push_str(&entry.path);
        out.push('\n');
        if !entry.extension.is_empty() {
            out.push_str(EXTENSION_PREFIX);
            out.push_str(&entry.extension);
            out.push('\n');
        }
        out.push_str(SEPARATOR);
        out.push_str("\n\n");
        out.push_str(&entry.text);
        out.push_str(ENTRY_TRAILER);
    }

    out
}

/// Recovers entries from bundle text.
///
/// An entry ends where the next header begins, so text that itself contains
/// a blank-line-separated header is split there.
///
/// # Errors
///
/// Returns an error if the text does not follow the bundle layout.
pub fn parse_bundle(text: &str) -> Result<Vec<ProcessedEntry>> {
    let header = format!("{SEPARATOR}\n{FILE_PREFIX}");
    let body_start = format!("{SEPARATOR}\n\n");
    let boundary = format!("{ENTRY_TRAILER}{header}");

    let mut entries = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let offset = text.len() - rest.len();
        rest = rest
            .strip_prefix(header.as_str())
            .ok_or_else(|| malformed(offset, "expected file header"))?;

        let (path, after) = rest
            .split_once('\n')
            .ok_or_else(|| malformed(offset, "unterminated FILE line"))?;

        let (extension, after) = match after.strip_prefix(EXTENSION_PREFIX) {
            Some(tail) => tail
                .split_once('\n')
                .ok_or_else(|| malformed(offset, "unterminated EXTENSION line"))?,
            None => ("", after),
        };

        let after = after
            .strip_prefix(body_start.as_str())
            .ok_or_else(|| malformed(offset, "expected separator after header"))?;

        let (body, next) = match after.find(boundary.as_str()) {
            Some(end) => (&after[..end], &after[end + ENTRY_TRAILER.len()..]),
            None => (
                after
                    .strip_suffix(ENTRY_TRAILER)
                    .ok_or_else(|| malformed(offset, "missing entry trailer"))?,
                "",
            ),
        };

        entries.push(ProcessedEntry::new(path, extension, body));
        rest = next;
    }

    Ok(entries)
}

fn malformed(offset: usize, reason: &str) -> Error {
    Error::serialization(format!("malformed bundle at byte {offset}: {reason}"))
}

/// Entry counts for a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    /// Number of entries
    pub total_files: usize,
    /// Entries per extension
    pub by_extension: BTreeMap<String, usize>,
}

/// Counts entries in total and per extension.
#[must_use]
pub fn compute_stats(entries: &[ProcessedEntry]) -> BundleStats {
    let mut by_extension = BTreeMap::new();
    for entry in entries {
        *by_extension.entry(entry.extension.clone()).or_insert(0) += 1;
    }

    BundleStats {
        total_files: entries.len(),
        by_extension,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ProcessedEntry> {
        vec![
            ProcessedEntry::new("proj/a.py", ".py", "x=1"),
            ProcessedEntry::new("proj/docs/guide.md", ".md", "# Guide\n\nIntro\n"),
            ProcessedEntry::new("proj/Makefile", "(no-ext)", "all:\n\techo hi"),
        ]
    }

    #[test]
    fn test_exact_layout() {
        let bundle = serialize_bundle(&[ProcessedEntry::new("a.py", ".py", "x=1")]);
        let expected = format!("{SEPARATOR}\nFILE: a.py\nEXTENSION: .py\n{SEPARATOR}\n\nx=1\n\n\n");
        assert_eq!(bundle, expected);
        assert_eq!(SEPARATOR.len(), 80);
    }

    #[test]
    fn test_empty_extension_line_omitted() {
        let bundle = serialize_bundle(&[ProcessedEntry::new("notes", "", "hello")]);
        assert!(!bundle.contains("EXTENSION:"));
        assert_eq!(bundle, format!("{SEPARATOR}\nFILE: notes\n{SEPARATOR}\n\nhello\n\n\n"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(serialize_bundle(&[]), "");
        assert!(parse_bundle("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_recovers_entries() {
        let entries = sample();
        let parsed = parse_bundle(&serialize_bundle(&entries)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_serialize_is_idempotent_through_parse() {
        let once = serialize_bundle(&sample());
        let twice = serialize_bundle(&parse_bundle(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_keeps_separator_inside_text() {
        let entries = vec![
            ProcessedEntry::new("a.md", ".md", format!("{SEPARATOR}\nnot a header")),
            ProcessedEntry::new("b.txt", ".txt", ""),
        ];
        let parsed = parse_bundle(&serialize_bundle(&entries)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_bundle("just some text").unwrap_err();
        assert!(err.to_string().contains("malformed bundle"));

        let truncated = format!("{SEPARATOR}\nFILE: a.py\n{SEPARATOR}\n\nx=1");
        assert!(parse_bundle(&truncated).is_err());
    }

    #[test]
    fn test_stats() {
        let mut entries = sample();
        entries.push(ProcessedEntry::new("b.py", ".py", ""));
        let stats = compute_stats(&entries);

        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.by_extension[".py"], 2);
        assert_eq!(stats.by_extension["(no-ext)"], 1);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalFiles"], 4);
        assert_eq!(json["byExtension"][".md"], 1);
    }
}

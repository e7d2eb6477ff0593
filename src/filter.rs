//! Inclusion and exclusion rules for a traversal run.
//!
//! Extension filters decide whether a file's text is extracted; directory
//! patterns decide whether a subtree is visited at all.

use crate::{
    classify::{extension_of, normalize_extension},
    error::{Error, Result},
};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::fmt;
use std::path::Path;

/// A directory exclusion rule.
#[derive(Debug, Clone)]
pub enum DirPattern {
    /// Matches when the basename equals the literal or the full path contains it.
    Literal(String),
    /// Shell-style glob matched against the full path.
    Glob(GlobMatcher),
    /// Regular expression searched for in the full path.
    Regex(Regex),
}

impl DirPattern {
    /// Creates a literal pattern.
    #[must_use]
    pub fn literal(name: impl Into<String>) -> Self {
        Self::Literal(name.into())
    }

    /// Compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the glob syntax is invalid.
    pub fn glob(pattern: &str) -> Result<Self> {
        let glob =
            Glob::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        Ok(Self::Glob(glob.compile_matcher()))
    }

    /// Compiles a regular expression pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is invalid.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        Ok(Self::Regex(regex))
    }

    /// Parses a pattern from its textual form.
    ///
    /// `re:<expr>` compiles a regex, `glob:<pattern>` or any string with
    /// glob metacharacters (`*?[{`) compiles a glob, anything else is a
    /// literal.
    ///
    /// # Errors
    ///
    /// Returns an error if a regex or glob fails to compile.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(expr) = raw.strip_prefix("re:") {
            Self::regex(expr)
        } else if let Some(pattern) = raw.strip_prefix("glob:") {
            Self::glob(pattern)
        } else if raw.contains(['*', '?', '[', '{']) {
            Self::glob(raw)
        } else {
            Ok(Self::literal(raw))
        }
    }

    /// Returns true if the directory at `path` matches this rule.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Literal(name) => {
                let basename = path.file_name().map(|n| n.to_string_lossy());
                basename.is_some_and(|b| b == name.as_str())
                    || path.to_string_lossy().contains(name.as_str())
            }
            Self::Glob(matcher) => matcher.is_match(path),
            Self::Regex(regex) => regex.is_match(&path.to_string_lossy()),
        }
    }
}

impl fmt::Display for DirPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(name) => f.write_str(name),
            Self::Glob(matcher) => write!(f, "glob:{}", matcher.glob()),
            Self::Regex(regex) => write!(f, "re:{}", regex.as_str()),
        }
    }
}

/// Read-only configuration for one traversal run.
///
/// Extensions are normalized on insertion, so `"PY"`, `"py"` and `".py"`
/// are equivalent.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    include_extensions: Vec<String>,
    exclude_extensions: Vec<String>,
    exclude_dirs: Vec<DirPattern>,
    sort_entries: bool,
}

impl ProcessOptions {
    /// Creates options that process everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts extraction to these extensions. Takes precedence over
    /// [`exclude_extensions`](Self::exclude_extensions).
    #[must_use]
    pub fn include_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_extensions = normalize_all(extensions);
        self
    }

    /// Skips extraction for these extensions when no include list is set.
    #[must_use]
    pub fn exclude_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_extensions = normalize_all(extensions);
        self
    }

    /// Replaces the directory exclusion rules.
    #[must_use]
    pub fn exclude_dirs(mut self, patterns: Vec<DirPattern>) -> Self {
        self.exclude_dirs = patterns;
        self
    }

    /// Appends one directory exclusion rule.
    #[must_use]
    pub fn exclude_dir(mut self, pattern: DirPattern) -> Self {
        self.exclude_dirs.push(pattern);
        self
    }

    /// Visits directory entries sorted by file name instead of enumeration order.
    #[must_use]
    pub const fn sort_entries(mut self, enabled: bool) -> Self {
        self.sort_entries = enabled;
        self
    }

    /// Returns the normalized include list.
    #[must_use]
    pub fn included(&self) -> &[String] {
        &self.include_extensions
    }

    /// Returns the normalized exclude list.
    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.exclude_extensions
    }

    /// Returns the directory exclusion rules.
    #[must_use]
    pub fn excluded_dirs(&self) -> &[DirPattern] {
        &self.exclude_dirs
    }

    /// Returns true if directory entries are visited in sorted order.
    #[must_use]
    pub const fn sorts_entries(&self) -> bool {
        self.sort_entries
    }

    /// Decides whether a file's text should be extracted.
    ///
    /// A non-empty include list is an exact membership test; otherwise a
    /// non-empty exclude list is a negated membership test. The two are
    /// never combined.
    #[must_use]
    pub fn should_process_file(&self, path: &Path) -> bool {
        let extension = extension_of(path);

        if !self.include_extensions.is_empty() {
            return self.include_extensions.contains(&extension);
        }

        if !self.exclude_extensions.is_empty() {
            return !self.exclude_extensions.contains(&extension);
        }

        true
    }

    /// Decides whether a directory (and everything beneath it) is pruned.
    #[must_use]
    pub fn should_skip_directory(&self, path: &Path) -> bool {
        self.exclude_dirs.iter().any(|pattern| pattern.matches(path))
    }
}

fn normalize_all<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for ext in extensions {
        let ext = normalize_extension(ext.as_ref());
        if !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_process_everything() {
        let options = ProcessOptions::new();
        assert!(options.should_process_file(Path::new("a.py")));
        assert!(options.should_process_file(Path::new("Makefile")));
        assert!(!options.should_skip_directory(Path::new("node_modules")));
    }

    #[test]
    fn test_include_list_is_exact() {
        let options = ProcessOptions::new().include_extensions(["py"]);
        assert!(options.should_process_file(Path::new("src/a.py")));
        assert!(options.should_process_file(Path::new("src/B.PY")));
        assert!(!options.should_process_file(Path::new("src/a.pyc")));
        assert!(!options.should_process_file(Path::new("Makefile")));
    }

    #[test]
    fn test_include_wins_over_exclude() {
        let options = ProcessOptions::new()
            .include_extensions([".py"])
            .exclude_extensions([".py", ".js"]);
        assert!(options.should_process_file(Path::new("a.py")));
        assert!(!options.should_process_file(Path::new("a.rs")));
    }

    #[test]
    fn test_exclude_list() {
        let options = ProcessOptions::new().exclude_extensions([".lock", "LOG"]);
        assert!(!options.should_process_file(Path::new("Cargo.lock")));
        assert!(!options.should_process_file(Path::new("server.log")));
        assert!(options.should_process_file(Path::new("main.rs")));
    }

    #[test]
    fn test_extension_lists_are_deduplicated() {
        let options = ProcessOptions::new().include_extensions(["py", ".PY", ".py"]);
        assert_eq!(options.included(), [".py".to_string()]);
    }

    #[test]
    fn test_literal_matches_basename_or_substring() {
        let pattern = DirPattern::literal("node_modules");
        assert!(pattern.matches(Path::new("proj/node_modules")));
        assert!(pattern.matches(Path::new("proj/node_modules/dep/lib")));
        assert!(!pattern.matches(Path::new("proj/src")));

        let loose = DirPattern::literal("build");
        assert!(loose.matches(Path::new("proj/prebuilds")));
    }

    #[test]
    fn test_glob_matches_full_path() {
        let pattern = DirPattern::glob("**/target").unwrap();
        assert!(pattern.matches(Path::new("proj/target")));
        assert!(!pattern.matches(Path::new("proj/targets")));
    }

    #[test]
    fn test_regex_searches_full_path() {
        let pattern = DirPattern::regex(r"\.(git|svn)$").unwrap();
        assert!(pattern.matches(Path::new("proj/.git")));
        assert!(!pattern.matches(Path::new("proj/.github")));
    }

    #[test]
    fn test_parse_pattern_kinds() {
        assert!(matches!(DirPattern::parse("dist").unwrap(), DirPattern::Literal(_)));
        assert!(matches!(DirPattern::parse("**/out").unwrap(), DirPattern::Glob(_)));
        assert!(matches!(DirPattern::parse("glob:out").unwrap(), DirPattern::Glob(_)));
        assert!(matches!(DirPattern::parse("re:^tmp").unwrap(), DirPattern::Regex(_)));
    }

    #[test]
    fn test_parse_invalid_pattern() {
        let err = DirPattern::parse("re:(unclosed").unwrap_err();
        assert!(err.is_config());
        assert!(DirPattern::parse("glob:[").is_err());
    }

    #[test]
    fn test_pattern_display() {
        assert_eq!(DirPattern::parse("dist").unwrap().to_string(), "dist");
        assert_eq!(DirPattern::parse("re:^tmp").unwrap().to_string(), "re:^tmp");
        assert_eq!(DirPattern::parse("**/out").unwrap().to_string(), "glob:**/out");
    }

    #[test]
    fn test_any_pattern_skips() {
        let options = ProcessOptions::new()
            .exclude_dir(DirPattern::literal("vendor"))
            .exclude_dir(DirPattern::parse("re:cache$").unwrap());
        assert!(options.should_skip_directory(Path::new("a/vendor")));
        assert!(options.should_skip_directory(Path::new("a/.cache")));
        assert!(!options.should_skip_directory(Path::new("a/src")));
    }
}

use crate::error::{Error, Result};
use crate::filter::ProcessOptions;
use crate::language::LabelMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_DIR: &str = ".";

/// What the input path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Detect from the path: directory, `.zip` archive, or single file
    #[default]
    Auto,
    /// A directory tree
    Dir,
    /// One file
    File,
    /// A ZIP archive
    Archive,
}

impl InputKind {
    /// Resolves [`InputKind::Auto`] by inspecting the path.
    ///
    /// Other kinds are returned unchanged.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto if path.is_dir() => Self::Dir,
            Self::Auto if is_zip(path) => Self::Archive,
            Self::Auto => Self::File,
            other => other,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Dir => "dir",
            Self::File => "file",
            Self::Archive => "archive",
        };
        f.write_str(name)
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// How entries are grouped in the language mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// One bucket per extension
    #[default]
    Extensions,
    /// Buckets named after languages, extensions merged where they map to one
    Languages,
}

impl LabelMode {
    /// Returns the label map for this mode.
    #[must_use]
    pub fn label_map(self) -> Option<LabelMap> {
        match self {
            Self::Extensions => None,
            Self::Languages => Some(LabelMap::languages()),
        }
    }
}

/// Configuration for the file-bundle pipeline.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Directory, file or archive to process
    pub input: PathBuf,

    /// How to interpret `input`
    pub kind: InputKind,

    /// Directory that receives the bundle
    pub output_dir: PathBuf,

    /// Filters applied during processing
    pub options: ProcessOptions,

    /// Grouping for the language mix
    pub labels: LabelMode,

    /// Print the bundle to stdout instead of writing a file
    pub to_stdout: bool,

    /// Dry run mode (no file writes)
    pub dry_run: bool,

    /// Write `<bundle>.summary.json` next to the bundle
    pub write_summary: bool,

    /// Create backups of existing files
    pub backup_existing: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use file_bundle::Config;
    ///
    /// let config = Config::builder()
    ///     .input("./src")
    ///     .output_dir("./out")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Input path doesn't exist
    /// - Input kind is `Dir` but the path is not a directory
    /// - Input kind is `File` or `Archive` but the path is not a file
    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(Error::config(format!(
                "Input path does not exist: {}",
                self.input.display()
            )));
        }

        match self.kind {
            InputKind::Dir if !self.input.is_dir() => {
                return Err(Error::config(format!(
                    "Input path is not a directory: {}",
                    self.input.display()
                )));
            }
            InputKind::File | InputKind::Archive if !self.input.is_file() => {
                return Err(Error::config(format!(
                    "Input path is not a file: {}",
                    self.input.display()
                )));
            }
            _ => {}
        }

        if !self.options.included().is_empty() && !self.options.excluded().is_empty() {
            tracing::warn!(
                "Both include and exclude extensions are set; only the include list is applied"
            );
        }

        if self.to_stdout && self.write_summary {
            tracing::warn!("Summary file is not written when the bundle goes to stdout");
        }

        Ok(())
    }

    /// Returns the input kind with `Auto` resolved.
    #[must_use]
    pub fn resolved_kind(&self) -> InputKind {
        self.kind.resolve(&self.input)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            kind: InputKind::Auto,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            options: ProcessOptions::default(),
            labels: LabelMode::Extensions,
            to_stdout: false,
            dry_run: false,
            write_summary: false,
            backup_existing: true,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    input: Option<PathBuf>,
    kind: Option<InputKind>,
    output_dir: Option<PathBuf>,
    options: Option<ProcessOptions>,
    labels: Option<LabelMode>,
    to_stdout: bool,
    dry_run: bool,
    write_summary: bool,
    backup_existing: Option<bool>,
}

impl ConfigBuilder {
    /// Sets the directory, file or archive to process.
    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Sets how the input path is interpreted.
    #[must_use]
    pub fn kind(mut self, kind: InputKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the output directory for the bundle.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the extension and directory filters.
    #[must_use]
    pub fn options(mut self, options: ProcessOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the grouping for the language mix.
    #[must_use]
    pub fn labels(mut self, mode: LabelMode) -> Self {
        self.labels = Some(mode);
        self
    }

    /// Prints the bundle to stdout instead of writing a file.
    #[must_use]
    pub fn to_stdout(mut self, enabled: bool) -> Self {
        self.to_stdout = enabled;
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables the JSON summary next to the bundle.
    #[must_use]
    pub fn write_summary(mut self, enabled: bool) -> Self {
        self.write_summary = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = Some(enabled);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            input: self.input.unwrap_or_else(|| PathBuf::from(".")),
            kind: self.kind.unwrap_or_default(),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            options: self.options.unwrap_or_default(),
            labels: self.labels.unwrap_or_default(),
            to_stdout: self.to_stdout,
            dry_run: self.dry_run,
            write_summary: self.write_summary,
            backup_existing: self.backup_existing.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder().input(temp.path()).build().unwrap();

        assert_eq!(config.kind, InputKind::Auto);
        assert_eq!(config.labels, LabelMode::Extensions);
        assert!(config.backup_existing);
        assert!(!config.options.sorts_entries());
    }

    #[test]
    fn test_missing_input() {
        let result = Config::builder()
            .input("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_dir_kind_requires_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("a.txt");
        file.write_str("x").unwrap();

        let result = Config::builder()
            .input(file.path())
            .kind(InputKind::Dir)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_archive_kind_requires_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .input(temp.path())
            .kind(InputKind::Archive)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_auto_kind_resolution() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("bundle.ZIP");
        archive.write_str("").unwrap();
        let file = temp.child("main.rs");
        file.write_str("").unwrap();

        assert_eq!(InputKind::Auto.resolve(temp.path()), InputKind::Dir);
        assert_eq!(InputKind::Auto.resolve(archive.path()), InputKind::Archive);
        assert_eq!(InputKind::Auto.resolve(file.path()), InputKind::File);
        assert_eq!(InputKind::File.resolve(archive.path()), InputKind::File);
    }

    #[test]
    fn test_label_mode() {
        assert!(LabelMode::Extensions.label_map().is_none());
        let map = LabelMode::Languages.label_map().unwrap();
        assert_eq!(map.label_for(".rs"), "Rust");
    }
}

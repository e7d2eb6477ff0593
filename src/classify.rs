//! Extension classification.
//!
//! Maps a path to a normalized extension token (`.py`, `.gitignore`, or the
//! `(no-ext)` sentinel) and to the coarse [`ContentKind`] that drives
//! extraction dispatch.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Sentinel extension for file names without a dot.
pub const NO_EXTENSION: &str = "(no-ext)";

static TEXT_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // plain text
        ".txt", ".md", ".csv", ".tsv", ".log",
        // data & config
        ".json", ".xml", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf", ".env",
        // javascript / typescript
        ".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs",
        // web & markup
        ".html", ".htm", ".css", ".scss", ".sass", ".less", ".svg", ".vue", ".svelte", ".pug",
        ".jade", ".slim", ".haml", ".ejs", ".handlebars", ".hbs", ".mustache", ".twig",
        ".blade", ".erb", ".asp", ".aspx", ".jsp",
        // python
        ".py", ".pyw", ".pyx", ".pyi",
        // jvm
        ".java", ".kt", ".scala", ".clj", ".gradle", ".maven",
        // c / c++
        ".c", ".cpp", ".cc", ".cxx", ".h", ".hpp", ".hh", ".hxx",
        // .net
        ".cs", ".vb", ".vbs", ".fs",
        ".go", ".rs", ".rb", ".php", ".phtml", ".swift",
        // shell
        ".sh", ".bash", ".zsh", ".fish", ".ps1", ".bat", ".cmd",
        // other languages
        ".r", ".m", ".matlab", ".sql", ".pl", ".perl", ".lua", ".dart", ".elm", ".ex", ".exs",
        ".cr", ".nim", ".zig", ".v", ".hx", ".purs", ".reason", ".re", ".rescript", ".coffee",
        ".ls", ".asm", ".s", ".f", ".f90", ".pas", ".dpr", ".ml",
        // build & tool config
        ".cmake", ".makefile", ".dockerfile", ".webpack", ".gulpfile", ".gruntfile", ".sbt",
        ".gitignore", ".gitattributes", ".editorconfig", ".npmrc", ".yarnrc", ".babelrc",
        ".eslintrc", ".prettierrc", ".stylelintrc", ".dockerignore",
        // misc
        ".vim", ".proto", ".graphql", ".gql", ".prisma", ".tf", ".tfvars",
    ]
    .into_iter()
    .collect()
});

/// Coarse content category that selects an extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Source, config and markup files read as UTF-8
    Text,
    /// Portable Document Format
    Pdf,
    /// Word processing documents (`.doc`, `.docx`)
    Document,
    /// Workbooks (`.xls`, `.xlsx`, `.xlsm`, `.xlsb`, `.ods`)
    Spreadsheet,
    /// Anything else: best-effort extraction with text and binary fallbacks
    Unknown,
}

impl ContentKind {
    /// Returns the content kind for a normalized extension token.
    #[must_use]
    pub fn of(extension: &str) -> Self {
        match extension {
            ".pdf" => Self::Pdf,
            ".doc" | ".docx" => Self::Document,
            ".xls" | ".xlsx" | ".xlsm" | ".xlsb" | ".ods" => Self::Spreadsheet,
            ext if TEXT_EXTENSIONS.contains(ext) => Self::Text,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Returns the normalized extension of the final path segment.
///
/// The token is everything after the last `.`, lowercased and prefixed with
/// `.`. Names without a dot, or ending in one, yield [`NO_EXTENSION`].
#[must_use]
pub fn extension_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!(".{}", ext.to_lowercase()),
        _ => NO_EXTENSION.to_string(),
    }
}

/// Classifies a path into its extension token and content kind.
#[must_use]
pub fn classify(path: &Path) -> (String, ContentKind) {
    let extension = extension_of(path);
    let kind = ContentKind::of(&extension);
    (extension, kind)
}

/// Normalizes a user-supplied extension (`"PY"`, `"py"`, `".py"` → `".py"`).
#[must_use]
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.starts_with('.') || trimmed == NO_EXTENSION {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}

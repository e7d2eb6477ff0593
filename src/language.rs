//! Extension mix and display colors.
//!
//! Counts entries per label (an extension, or a language name when a
//! [`LabelMap`] is supplied), converts counts into percentages and assigns a
//! stable color to every label.

use crate::{classify::NO_EXTENSION, entry::ProcessedEntry};
use once_cell::sync::Lazy;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Number of alternative hues tried before a duplicate color is accepted.
const MAX_HUE_SHIFTS: usize = 12;

/// Hue step between attempts, in degrees.
const HUE_SHIFT: u16 = 30;

static CANONICAL_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (".js", "#f1e05a"),
        (".jsx", "#f1e05a"),
        (".cjs", "#f1e05a"),
        (".mjs", "#f1e05a"),
        (".ts", "#3178c6"),
        (".tsx", "#3178c6"),
        (".py", "#3572A5"),
        (".java", "#b07219"),
        (".cpp", "#f34b7d"),
        (".c", "#555555"),
        (".cs", "#178600"),
        (".php", "#4F5D95"),
        (".rb", "#701516"),
        (".go", "#00ADD8"),
        (".rs", "#dea584"),
        (".swift", "#ffac45"),
        (".kt", "#A97BFF"),
        (".scala", "#c22d40"),
        (".html", "#e34c26"),
        (".css", "#563d7c"),
        (".scss", "#c6538c"),
        (".json", "#292929"),
        (".md", "#083fa1"),
        (".yaml", "#cb171e"),
        (".yml", "#cb171e"),
        (".xml", "#0060ac"),
        (".sql", "#e38c00"),
        (".sh", "#89e051"),
        (".vue", "#41b883"),
        (".dart", "#00B4AB"),
        (NO_EXTENSION, "#cccccc"),
    ])
});

static LANGUAGE_NAMES: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        (".js", "JavaScript"),
        (".jsx", "JavaScript"),
        (".cjs", "JavaScript"),
        (".mjs", "JavaScript"),
        (".ts", "TypeScript"),
        (".tsx", "TypeScript"),
        (".py", "Python"),
        (".java", "Java"),
        (".cpp", "C++"),
        (".c", "C"),
        (".cs", "C#"),
        (".php", "PHP"),
        (".rb", "Ruby"),
        (".go", "Go"),
        (".rs", "Rust"),
        (".swift", "Swift"),
        (".kt", "Kotlin"),
        (".scala", "Scala"),
        (".html", "HTML"),
        (".css", "CSS"),
        (".scss", "SCSS"),
        (".json", "JSON"),
        (".md", "Markdown"),
        (".yaml", "YAML"),
        (".yml", "YAML"),
        (".xml", "XML"),
        (".sql", "SQL"),
        (".sh", "Shell"),
        (".vue", "Vue"),
        (".dart", "Dart"),
        (NO_EXTENSION, "No Extension"),
    ]
});

/// Maps extensions to display labels.
///
/// Extensions without a mapping keep their raw token as the label, so every
/// entry is counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: HashMap<String, String>,
}

impl LabelMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the built-in extension to language name table.
    #[must_use]
    pub fn languages() -> Self {
        LANGUAGE_NAMES
            .iter()
            .map(|(ext, name)| (*ext, *name))
            .collect()
    }

    /// Adds or replaces a mapping. The extension is normalized.
    #[must_use]
    pub fn with(mut self, extension: &str, label: impl Into<String>) -> Self {
        self.insert(extension, label);
        self
    }

    /// Adds or replaces a mapping. The extension is normalized.
    pub fn insert(&mut self, extension: &str, label: impl Into<String>) {
        let key = if extension == NO_EXTENSION {
            extension.to_string()
        } else {
            crate::classify::normalize_extension(extension)
        };
        self.labels.insert(key, label.into());
    }

    /// Returns the label for an extension, falling back to the extension itself.
    #[must_use]
    pub fn label_for<'a>(&'a self, extension: &'a str) -> &'a str {
        self.labels.get(extension).map_or(extension, String::as_str)
    }

    /// Returns the number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if there are no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (ext, label) in iter {
            map.insert(&ext.into(), label);
        }
        map
    }
}

/// Label to percentage mapping in first-seen order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageDistribution {
    shares: Vec<(String, f64)>,
}

impl LanguageDistribution {
    /// Returns the percentage for a label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.shares
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, pct)| *pct)
    }

    /// Iterates labels in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.shares.iter().map(|(l, pct)| (l.as_str(), *pct))
    }

    /// Returns labels by descending percentage. Ties keep first-seen order.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, f64)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Returns true if no entries were counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

impl Serialize for LanguageDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shares.len()))?;
        for (label, pct) in &self.shares {
            map.serialize_entry(label, pct)?;
        }
        map.end()
    }
}

/// Computes the share of each label among `entries`.
#[must_use]
pub fn compute_language_distribution(
    entries: &[ProcessedEntry],
    labels: Option<&LabelMap>,
) -> LanguageDistribution {
    let counts = count_labels(entries, labels);
    let total = entries.len();

    let shares = counts
        .into_iter()
        .map(|bucket| (bucket.label, percentage(bucket.count, total)))
        .collect();

    LanguageDistribution { shares }
}

struct Bucket {
    label: String,
    extension: String,
    count: usize,
}

fn count_labels(entries: &[ProcessedEntry], labels: Option<&LabelMap>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let label = labels.map_or(entry.extension.as_str(), |map| map.label_for(&entry.extension));

        if let Some(&i) = index.get(label) {
            buckets[i].count += 1;
        } else {
            index.insert(label.to_string(), buckets.len());
            buckets.push(Bucket {
                label: label.to_string(),
                extension: entry.extension.clone(),
                count: 1,
            });
        }
    }

    buckets
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// A display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Canonical color from the built-in table
    Hex(&'static str),
    /// Hue derived from the label, rendered at 65% saturation and 60% lightness
    Hsl {
        /// Hue in degrees, `0..360`
        hue: u16,
    },
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(hex) => f.write_str(hex),
            Self::Hsl { hue } => write!(f, "hsl({hue}, 65%, 60%)"),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Assigns colors for one analysis pass.
///
/// Hashed colors are tracked so two labels in the same pass do not share a
/// hue when it can be avoided. Create a new palette per pass.
#[derive(Debug, Default)]
pub struct ColorPalette {
    used: HashSet<u16>,
}

impl ColorPalette {
    /// Creates an empty palette.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the color for `label`.
    ///
    /// Canonical colors are looked up by label, then by `extension`.
    pub fn color_for(&mut self, label: &str, extension: &str) -> Color {
        if let Some(hex) = canonical_color(label).or_else(|| canonical_color(extension)) {
            return Color::Hex(hex);
        }
        self.hashed(label)
    }

    fn hashed(&mut self, label: &str) -> Color {
        let mut hue = base_hue(label);
        let mut attempts = 0;
        while self.used.contains(&hue) && attempts < MAX_HUE_SHIFTS {
            hue = (hue + HUE_SHIFT) % 360;
            attempts += 1;
        }
        self.used.insert(hue);
        Color::Hsl { hue }
    }
}

/// Returns the canonical color for an extension, if it has one.
#[must_use]
pub fn canonical_color(extension: &str) -> Option<&'static str> {
    CANONICAL_COLORS.get(extension).copied()
}

/// Rolling string hash over UTF-16 code units, reduced to a hue.
fn base_hue(label: &str) -> u16 {
    let hash = label.encode_utf16().fold(0i32, |h, unit| {
        i32::from(unit).wrapping_add(h.wrapping_shl(5).wrapping_sub(h))
    });
    // rem_euclid(360) is always in 0..360
    u16::try_from(hash.rem_euclid(360)).unwrap_or_default()
}

/// One row of the language mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStat {
    /// Extension or language name
    pub label: String,
    /// Share of all entries, rounded to two decimals
    pub percentage: f64,
    /// Display color
    pub color: Color,
}

/// Computes the language mix sorted by descending share, with colors.
#[must_use]
pub fn analyze_languages(entries: &[ProcessedEntry], labels: Option<&LabelMap>) -> Vec<LanguageStat> {
    let total = entries.len();
    let mut buckets = count_labels(entries, labels);
    buckets.sort_by(|a, b| b.count.cmp(&a.count));

    let mut palette = ColorPalette::new();
    buckets
        .into_iter()
        .map(|bucket| LanguageStat {
            color: palette.color_for(&bucket.label, &bucket.extension),
            percentage: percentage(bucket.count, total),
            label: bucket.label,
        })
        .collect()
}

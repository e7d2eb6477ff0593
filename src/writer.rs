use crate::{
    bundle::BundleStats,
    config::Config,
    error::{Error, Result},
    language::LanguageStat,
};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tracing::{debug, info};

/// Metadata written next to a bundle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BundleSummary<'a> {
    /// Bundle file name
    pub bundle: String,

    /// Input that was processed
    pub input: String,

    /// Entry counts
    #[serde(flatten)]
    pub stats: &'a BundleStats,

    /// Language mix, largest first
    pub languages: &'a [LanguageStat],

    /// Execution duration in seconds
    pub duration_secs: f64,

    /// Generation timestamp
    pub generated_at: String,
}

/// Returns the timestamped bundle file name `processed-files-<millis>.txt`.
///
/// # Errors
///
/// Returns an error if the system clock is before the Unix epoch.
pub fn bundle_file_name() -> Result<String> {
    let millis = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_millis();
    Ok(format!("processed-files-{millis}.txt"))
}

/// Persists bundles with atomic operations.
pub(crate) struct Writer {
    output_dir: PathBuf,
    backup_existing: bool,
}

impl Writer {
    /// Creates a new writer from configuration.
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            backup_existing: config.backup_existing,
        }
    }

    /// Writes serialized bundle text under a fresh bundle name.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Output directory cannot be created
    /// - File write operations fail
    pub(crate) fn write_bundle(&self, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(bundle_file_name()?);
        self.write_bundle_to(&path, content)?;
        Ok(path)
    }

    fn write_bundle_to(&self, path: &Path, content: &str) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;

        self.write_file_atomic(path, content)?;

        info!("Wrote bundle ({} bytes) to {}", content.len(), path.display());
        Ok(())
    }

    /// Writes a file atomically with optional backup.
    ///
    /// # Process
    ///
    /// 1. Creates backup if file exists and backup is enabled
    /// 2. Writes content to temporary file
    /// 3. Syncs temporary file to disk
    /// 4. Atomically renames temporary file to target path
    fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        if path.exists() && self.backup_existing {
            self.backup_file(path)?;
        }

        let temp_path = path.with_extension("tmp");
        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::io(&temp_path, e))?;

        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

        Ok(())
    }

    /// Creates a timestamped backup of an existing file.
    fn backup_file(&self, path: &Path) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_nanos();

        let filename = path
            .file_name()
            .ok_or_else(|| Error::config("Invalid file path"))?
            .to_string_lossy();

        let backup_name = format!("{filename}.backup.{timestamp}");
        let backup_path = path
            .parent()
            .ok_or_else(|| Error::config("Invalid file path"))?
            .join(backup_name);

        fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

        debug!("Created backup: {}", backup_path.display());
        Ok(())
    }

    /// Writes `<bundle>.summary.json` next to the bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary file cannot be written.
    pub(crate) fn write_summary(
        &self,
        bundle_path: &Path,
        input: &Path,
        stats: &BundleStats,
        languages: &[LanguageStat],
        duration: Duration,
    ) -> Result<PathBuf> {
        let bundle = bundle_path
            .file_name()
            .ok_or_else(|| Error::config("Invalid bundle path"))?
            .to_string_lossy()
            .to_string();

        let summary = BundleSummary {
            bundle: bundle.clone(),
            input: input.display().to_string(),
            stats,
            languages,
            duration_secs: duration.as_secs_f64(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let summary_path = self.output_dir.join(format!("{bundle}.summary.json"));
        let json = serde_json::to_string_pretty(&summary)?;
        self.write_file_atomic(&summary_path, &json)?;

        info!("Wrote summary to {}", summary_path.display());
        Ok(summary_path)
    }
}

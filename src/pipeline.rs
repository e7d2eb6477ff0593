use crate::{
    bundle::{compute_stats, serialize_bundle},
    config::{Config, InputKind},
    entry::ProcessedEntry,
    error::{Error, Result},
    language::{analyze_languages, LanguageStat},
    walker::Processor,
    writer::{bundle_file_name, Writer},
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument, trace, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Input that was processed
    pub input: String,

    /// Resolved input kind
    pub kind: InputKind,

    /// Total number of entries
    pub total_files: usize,

    /// Entries with extracted text
    pub extracted_files: usize,

    /// Entries rejected by extension filters
    pub skipped_files: usize,

    /// Entries whose extraction failed
    pub failed_files: usize,

    /// Size of the serialized bundle in bytes
    pub bundle_bytes: usize,

    /// Written bundle, if any
    pub bundle_path: Option<PathBuf>,

    /// Written summary, if any
    pub summary_path: Option<PathBuf>,

    /// Language mix, largest first
    pub languages: Vec<LanguageStat>,

    /// Total execution time
    pub duration: Duration,

    /// Time spent processing files
    pub process_duration: Duration,

    /// Time spent writing
    pub write_duration: Duration,
}

impl PipelineStats {
    fn new(input: String, kind: InputKind, entries: &[ProcessedEntry]) -> Self {
        let skipped_files = entries.iter().filter(|e| e.is_skipped()).count();
        let failed_files = entries.iter().filter(|e| e.is_error()).count();

        Self {
            input,
            kind,
            total_files: entries.len(),
            extracted_files: entries.len() - skipped_files - failed_files,
            skipped_files,
            failed_files,
            bundle_bytes: 0,
            bundle_path: None,
            summary_path: None,
            languages: Vec::new(),
            duration: Duration::ZERO,
            process_duration: Duration::ZERO,
            write_duration: Duration::ZERO,
        }
    }

    /// Prints a human-readable summary to stderr.
    pub fn print_summary(&self) {
        eprintln!("\n╔═══════════════════════════════════════════════════════╗");
        eprintln!("║            File Bundle Summary                        ║");
        eprintln!("╠═══════════════════════════════════════════════════════╣");
        eprintln!("║ Input ({:<7}):                                      ║", self.kind);
        eprintln!("║   {}", self.input);
        eprintln!("║                                                       ║");
        eprintln!(
            "║ Files Processed:      {:>8}                        ║",
            self.total_files
        );
        eprintln!(
            "║   - Extracted:        {:>8}                        ║",
            self.extracted_files
        );
        eprintln!(
            "║   - Skipped:          {:>8}                        ║",
            self.skipped_files
        );
        eprintln!(
            "║   - Failed:           {:>8}                        ║",
            self.failed_files
        );
        eprintln!(
            "║ Bundle Size:          {:>8} bytes                  ║",
            self.bundle_bytes
        );

        if let Some(path) = &self.bundle_path {
            eprintln!("║ Bundle:                                               ║");
            eprintln!("║   {}", path.display());
        }

        if !self.languages.is_empty() {
            eprintln!("║                                                       ║");
            eprintln!("║ Languages:                                            ║");
            for stat in &self.languages {
                eprintln!(
                    "║   {:<20} {:>7.2}%  {:<22}║",
                    stat.label,
                    stat.percentage,
                    stat.color.to_string()
                );
            }
        }

        eprintln!("║                                                       ║");
        eprintln!("║ Timing Breakdown:                                     ║");
        eprintln!(
            "║   - Processing:       {:>8.2}s                     ║",
            self.process_duration.as_secs_f64()
        );
        eprintln!(
            "║   - Writing:          {:>8.2}s                     ║",
            self.write_duration.as_secs_f64()
        );
        eprintln!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        eprintln!("╚═══════════════════════════════════════════════════════╝\n");
    }

    /// Returns the throughput in files per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput_files_per_sec(&self) -> f64 {
        self.total_files as f64 / self.duration.as_secs_f64()
    }
}

/// Runs process, analyze, serialize and write for one input.
pub struct Pipeline {
    config: Config,
    processor: Processor,
    writer: Writer,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let processor = Processor::new(config.options.clone());
        let writer = Writer::new(&config);

        Ok(Self {
            config,
            processor,
            writer,
        })
    }

    /// Executes the complete pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Process**: Walks the input and extracts text from every file
    /// 2. **Analyze**: Computes counts and the language mix
    /// 3. **Write**: Serializes the bundle and persists it (or prints it)
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be walked, the archive cannot
    /// be expanded, or the output cannot be written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use file_bundle::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .input("./src")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(input = %self.config.input.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let kind = self.config.resolved_kind();

        info!("Starting pipeline execution ({} input)", kind);

        info!("Stage 1/3: Processing files...");
        let process_start = Instant::now();
        let entries = self.process(kind)?;
        let process_duration = process_start.elapsed();

        let mut stats = PipelineStats::new(self.config.input.display().to_string(), kind, &entries);
        stats.process_duration = process_duration;

        info!(
            "✓ Processed {} files ({} extracted, {} skipped, {} failed) in {:.2}s",
            stats.total_files,
            stats.extracted_files,
            stats.skipped_files,
            stats.failed_files,
            process_duration.as_secs_f64()
        );

        if entries.is_empty() {
            warn!("No files found under {}", self.config.input.display());
        }

        info!("Stage 2/3: Analyzing...");
        let labels = self.config.labels.label_map();
        stats.languages = analyze_languages(&entries, labels.as_ref());
        let bundle_stats = compute_stats(&entries);
        let bundle = serialize_bundle(&entries);
        stats.bundle_bytes = bundle.len();

        let write_start = Instant::now();
        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
            self.print_dry_run_summary(&stats)?;
        } else if self.config.to_stdout {
            info!("Stage 3/3: Printing bundle...");
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bundle.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| Error::io("<stdout>", e))?;
        } else {
            info!("Stage 3/3: Writing output files...");
            let path = self.writer.write_bundle(&bundle)?;

            if self.config.write_summary {
                let summary = self.writer.write_summary(
                    &path,
                    &self.config.input,
                    &bundle_stats,
                    &stats.languages,
                    start_time.elapsed(),
                )?;
                stats.summary_path = Some(summary);
            }
            stats.bundle_path = Some(path);
        }
        stats.write_duration = write_start.elapsed();
        stats.duration = start_time.elapsed();

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }

    /// Executes the processing stage for the resolved input kind.
    fn process(&self, kind: InputKind) -> Result<Vec<ProcessedEntry>> {
        let input = &self.config.input;
        let mut on_progress = |processed: usize, total: usize| {
            trace!("Progress {}/{}", processed, total);
        };

        match kind {
            InputKind::Dir | InputKind::Auto => self
                .processor
                .process_directory_with_progress(input, &mut on_progress),
            InputKind::Archive => self
                .processor
                .extract_from_archive_with_progress(input, &mut on_progress),
            InputKind::File => Ok(vec![self.processor.process_file(input)]),
        }
    }

    /// Prints a summary for dry run mode.
    fn print_dry_run_summary(&self, stats: &PipelineStats) -> Result<()> {
        let name = bundle_file_name()?;
        eprintln!("\n╔═══════════════════════════════════════════════════════╗");
        eprintln!("║                 Dry Run Summary                       ║");
        eprintln!("╠═══════════════════════════════════════════════════════╣");
        eprintln!(
            "║ Total files:          {:>8}                        ║",
            stats.total_files
        );
        eprintln!(
            "║ Bundle size:          {:>8} bytes                  ║",
            stats.bundle_bytes
        );
        eprintln!("║ Would write:                                          ║");
        eprintln!("║   {}", self.config.output_dir.join(name).display());
        eprintln!("║                                                       ║");
        eprintln!("║ ⚠ No files were written (dry run mode)               ║");
        eprintln!("╚═══════════════════════════════════════════════════════╝\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::parse_bundle;
    use crate::config::LabelMode;
    use crate::filter::{DirPattern, ProcessOptions};
    use assert_fs::prelude::*;
    use std::fs;
    use std::io::Write as _;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_pipeline_basic_execution() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("proj");
        input.child("file1.rs").write_str("fn main() {}").unwrap();
        input.child("file2.rs").write_str("pub fn test() {}").unwrap();
        input.child("notes.md").write_str("# Notes").unwrap();

        let config = Config::builder()
            .input(input.path())
            .output_dir(temp.path().join("out"))
            .write_summary(true)
            .build()
            .unwrap();
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.kind, InputKind::Dir);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.extracted_files, 3);
        assert_eq!(stats.languages[0].label, ".rs");
        assert_eq!(stats.languages[0].percentage, 66.67);

        let bundle_path = stats.bundle_path.unwrap();
        let text = fs::read_to_string(&bundle_path).unwrap();
        assert_eq!(text.len(), stats.bundle_bytes);
        assert_eq!(parse_bundle(&text).unwrap().len(), 3);
        assert!(stats.summary_path.unwrap().exists());
    }

    #[test]
    fn test_pipeline_dry_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file.rs").write_str("fn main() {}").unwrap();

        let config = Config::builder()
            .input(temp.path())
            .output_dir(temp.path().join("out"))
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert!(stats.bundle_path.is_none());
        assert!(stats.bundle_bytes > 0);
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_pipeline_counts_skipped_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("proj");
        input.child("a.py").write_str("x=1").unwrap();
        input.child("b.js").write_str("let y").unwrap();
        input.child("node_modules/dep.js").write_str("dep").unwrap();

        let options = ProcessOptions::new()
            .include_extensions(["py"])
            .exclude_dir(DirPattern::literal("node_modules"));
        let config = Config::builder()
            .input(input.path())
            .options(options)
            .labels(LabelMode::Languages)
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.skipped_files, 1);
        assert_eq!(stats.extracted_files, 1);
        let labels: Vec<_> = stats.languages.iter().map(|l| l.label.as_str()).collect();
        assert!(labels.contains(&"Python"));
        assert!(labels.contains(&"JavaScript"));
    }

    #[test]
    fn test_pipeline_failed_count_ignores_lookalike_content() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("proj");
        input
            .child("faq.md")
            .write_str("[Error processing PDF: what this message means]")
            .unwrap();
        input.child("broken.pdf").write_str("not a pdf").unwrap();

        let config = Config::builder()
            .input(input.path())
            .dry_run(true)
            .build()
            .unwrap();
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.extracted_files, 1);
    }

    #[test]
    fn test_pipeline_single_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("main.rs");
        file.write_str("fn main() {}").unwrap();

        let config = Config::builder()
            .input(file.path())
            .output_dir(temp.path().join("out"))
            .build()
            .unwrap();
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.kind, InputKind::File);
        assert_eq!(stats.total_files, 1);
        assert!(stats.bundle_path.unwrap().exists());
    }

    #[test]
    fn test_pipeline_archive() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("proj.zip");
        {
            let mut zip = zip::ZipWriter::new(fs::File::create(archive.path()).unwrap());
            zip.start_file("proj/a.py", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"x=1").unwrap();
            zip.finish().unwrap();
        }

        let config = Config::builder()
            .input(archive.path())
            .output_dir(temp.path().join("out"))
            .build()
            .unwrap();
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.kind, InputKind::Archive);
        let text = fs::read_to_string(stats.bundle_path.unwrap()).unwrap();
        let entries = parse_bundle(&text).unwrap();
        assert_eq!(entries[0].path.replace('\\', "/"), "proj/a.py");
    }

    #[test]
    fn test_pipeline_throughput() {
        let mut stats = PipelineStats::new(
            "in".to_string(),
            InputKind::Dir,
            &vec![ProcessedEntry::new("a.py", ".py", ""); 100],
        );
        stats.duration = Duration::from_secs(2);

        assert_eq!(stats.throughput_files_per_sec(), 50.0);
    }
}

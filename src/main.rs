use anyhow::Context;
use clap::Parser;
use file_bundle::{request, Config, DirPattern, InputKind, LabelMode, Pipeline, ProcessOptions};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "file-bundle",
    version,
    author,
    about = "Bundle a directory, file or ZIP archive into one AI-ready text file",
    long_about = "Bundle a directory, file or ZIP archive into one AI-ready text file.\n\n\
    Every file is converted to text (source, PDF, DOCX, spreadsheets and more) and \
    concatenated with FILE/EXTENSION headers. A language mix is printed at the end.\n\n\
    USAGE EXAMPLES:\n  \
      # Bundle a project, skipping dependencies\n  \
      file-bundle ./my-project --exclude-dir node_modules --exclude-dir .git\n\n  \
      # Only Python and Markdown, printed to stdout\n  \
      file-bundle ./my-project --include py --include md --stdout\n\n  \
      # Bundle an archive with language names in the summary\n  \
      file-bundle ./project.zip --languages --summary\n\n  \
      # Answer a JSON request\n  \
      file-bundle --request '{\"path\": \"./src\", \"type\": \"dir\"}'"
)]
struct Cli {
    /// Directory, file or ZIP archive to bundle
    #[arg(value_name = "INPUT", required_unless_present = "request")]
    input: Option<PathBuf>,

    /// How to interpret INPUT
    #[arg(short, long, value_enum, default_value = "auto")]
    kind: CliKind,

    /// Output directory for the bundle
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    out: PathBuf,

    /// Only extract files with this extension (repeatable)
    #[arg(short, long = "include", value_name = "EXT")]
    include: Vec<String>,

    /// Skip extraction for this extension (repeatable, ignored with --include)
    #[arg(short, long = "exclude", value_name = "EXT")]
    exclude: Vec<String>,

    /// Prune directories matching this pattern (repeatable)
    ///
    /// Plain names match a directory's name or any part of its path.
    /// Use glob:<pattern> or wildcards for globs and re:<expr> for regexes.
    #[arg(long = "exclude-dir", value_name = "PATTERN")]
    exclude_dir: Vec<String>,

    /// Visit directory entries in name order
    #[arg(long)]
    sorted: bool,

    /// Group the language mix by language name instead of extension
    #[arg(long)]
    languages: bool,

    /// Print the bundle to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Write a JSON summary next to the bundle
    #[arg(long)]
    summary: bool,

    /// Do not create backups of overwritten files
    #[arg(long)]
    no_backup: bool,

    /// Dry run (don't write files)
    #[arg(long)]
    dry_run: bool,

    /// Handle a JSON request `{"path": ..., "type": "dir"|"file"}` and print the response
    #[arg(long, value_name = "JSON", conflicts_with = "input")]
    request: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliKind {
    /// Detect from the path
    Auto,
    /// Directory tree
    Dir,
    /// Single file
    File,
    /// ZIP archive
    Archive,
}

impl From<CliKind> for InputKind {
    fn from(k: CliKind) -> Self {
        match k {
            CliKind::Auto => Self::Auto,
            CliKind::Dir => Self::Dir,
            CliKind::File => Self::File,
            CliKind::Archive => Self::Archive,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    if let Some(body) = cli.request {
        let response = request::handle(&body);
        println!("{}", serde_json::to_string_pretty(&response.body)?);
        if !response.is_success() {
            anyhow::bail!("Request failed with status {}", response.status);
        }
        return Ok(());
    }

    let input = cli.input.context("INPUT is required")?;

    let exclude_dirs = cli
        .exclude_dir
        .iter()
        .map(|raw| DirPattern::parse(raw))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --exclude-dir pattern")?;

    let options = ProcessOptions::new()
        .include_extensions(&cli.include)
        .exclude_extensions(&cli.exclude)
        .exclude_dirs(exclude_dirs)
        .sort_entries(cli.sorted);

    let labels = if cli.languages {
        LabelMode::Languages
    } else {
        LabelMode::Extensions
    };

    let config = Config::builder()
        .input(input)
        .kind(cli.kind.into())
        .output_dir(cli.out)
        .options(options)
        .labels(labels)
        .to_stdout(cli.stdout)
        .write_summary(cli.summary)
        .backup_existing(!cli.no_backup)
        .dry_run(cli.dry_run)
        .build()
        .context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    stats.print_summary();

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("file_bundle=info"),
        1 => EnvFilter::new("file_bundle=debug"),
        _ => EnvFilter::new("file_bundle=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

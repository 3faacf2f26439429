//! CLI entry point for `docintake`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use docintake::batch::{self, BatchReport};
use docintake::config::{self, Config};
use docintake::harvest::{HarvestReport, Harvester};
use docintake::mailstore::MaildirStore;
use docintake::tools::{ExternalArchiver, ExternalTools};

#[derive(Parser)]
#[command(
    name = "docintake",
    version,
    about = "Document-intake batch jobs: harvest mail attachments and normalize documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: $DOCINTAKE_CONFIG or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest attachments from unread mail into the destination directory
    Harvest {
        /// Maildir root (overrides [mailbox] maildir)
        #[arg(long)]
        maildir: Option<PathBuf>,
        /// Folder to harvest (overrides [mailbox] folder)
        #[arg(long)]
        folder: Option<String>,
        /// Destination directory (overrides [paths] destination)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy files from one directory to another
    Copy {
        /// Source directory (overrides [copy] source)
        source: Option<PathBuf>,
        /// Destination directory (overrides [copy] destination)
        destination: Option<PathBuf>,
        /// Extensions to copy, repeatable (overrides [copy] extensions)
        #[arg(short, long = "ext")]
        extensions: Vec<String>,
        /// Replace destination files even if they have the same size
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        json: bool,
    },
    /// Normalize file names in a directory
    Rename {
        dir: PathBuf,
    },
    /// Convert every image in a directory to PDF
    Convert {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Split every multi-page PDF in a directory into single pages
    Split {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Extract password-protected archives
    Extract {
        /// Archive file or directory of archives
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _guard = setup_logging(log_level, &config);

    match cli.command {
        Commands::Harvest {
            maildir,
            folder,
            output,
            json,
        } => cmd_harvest(config, maildir, folder, output, json),
        Commands::Copy {
            source,
            destination,
            extensions,
            overwrite,
            json,
        } => cmd_copy(&config, source, destination, extensions, overwrite, json),
        Commands::Rename { dir } => cmd_rename(&dir),
        Commands::Convert { dir, json } => cmd_convert(&config, &dir, json),
        Commands::Split { dir, json } => cmd_split(&config, &dir, json),
        Commands::Extract {
            input,
            output,
            json,
        } => cmd_extract(&config, &input, &output, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and a log file truncated for this run.
///
/// The returned guard flushes the file writer and must live until exit.
fn setup_logging(level: &str, config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_file = log_path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::File::create(&log_path));

    match log_file {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            tracing::warn!(path = %log_path.display(), error = %e, "Log file unavailable, logging to stderr only");
            None
        }
    }
}

fn progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {label} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}"
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "docintake", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Harvest one mailbox folder.
fn cmd_harvest(
    mut config: Config,
    maildir: Option<PathBuf>,
    folder: Option<String>,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(maildir) = maildir {
        config.mailbox.maildir = maildir;
    }
    if let Some(folder) = folder {
        config.mailbox.folder = folder;
    }
    if let Some(output) = output {
        config.paths.destination = output;
    }

    tracing::info!(
        account = %config.mailbox.account,
        folder = %config.mailbox.folder,
        destination = %config.paths.destination.display(),
        "Starting harvest"
    );

    let mut store = MaildirStore::open(&config.mailbox.maildir, &config.mailbox.folder)?;
    let tools = ExternalTools::from_config(&config.tools);

    let pb = progress_bar("Harvesting");
    let start = Instant::now();
    let report = Harvester::from_config(&mut store, &tools, &config).run_with_progress(&|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    });
    pb.finish_and_clear();
    let report = report?;

    tracing::info!(
        saved = report.attachments_saved,
        failed = report.attachments_failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Harvest finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_harvest_report(&report);
    }
    Ok(())
}

fn print_harvest_report(report: &HarvestReport) {
    println!("Messages scanned:      {}", report.messages_scanned);
    println!("Messages selected:     {}", report.messages_selected);
    println!("Messages marked read:  {}", report.messages_marked_read);
    println!("Messages failed:       {}", report.messages_failed);
    println!("Attachments saved:     {}", report.attachments_saved);
    println!("Attachments skipped:   {}", report.attachments_skipped);
    println!("Attachments failed:    {}", report.attachments_failed);
    for document in &report.documents {
        println!("  {}", document.display());
    }
}

fn cmd_copy(
    config: &Config,
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    extensions: Vec<String>,
    overwrite: bool,
    json: bool,
) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let Some(source) = source.or_else(|| config.copy.source.clone()) else {
        anyhow::bail!("no source directory given and [copy] source is not set");
    };
    let Some(destination) = destination.or_else(|| config.copy.destination.clone()) else {
        anyhow::bail!("no destination directory given and [copy] destination is not set");
    };
    let extensions = if extensions.is_empty() {
        config.copy.extensions.clone()
    } else {
        extensions
    };

    let pb = progress_bar("Copying");
    let report = batch::copy::copy_files(&source, &destination, &extensions, overwrite, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    });
    pb.finish_and_clear();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Copied {} file(s) ({}), skipped {}, failed {}",
            report.copied,
            format_size(report.bytes, BINARY),
            report.skipped,
            report.failed
        );
    }
    Ok(())
}

fn cmd_rename(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let pb = progress_bar("Renaming");
    let renamed = batch::rename::normalize_names(dir, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    });
    pb.finish_and_clear();
    let renamed = renamed?;

    for (from, to) in &renamed {
        println!("{} -> {}", from.display(), to.display());
    }
    println!("Renamed {} file(s)", renamed.len());
    Ok(())
}

fn cmd_convert(config: &Config, dir: &Path, json: bool) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }
    let tools = ExternalTools::from_config(&config.tools);

    let pb = progress_bar("Converting");
    let report = batch::convert::convert_images(
        dir,
        &tools,
        config.retry.policy(),
        &config.attachments.image_extensions,
        &|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        },
    );
    pb.finish_and_clear();
    print_batch_report("Converted", &report?, json)
}

fn cmd_split(config: &Config, dir: &Path, json: bool) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }
    let tools = ExternalTools::from_config(&config.tools);

    let pb = progress_bar("Splitting");
    let report = batch::split::split_documents(dir, &tools, config.retry.policy(), &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    });
    pb.finish_and_clear();
    print_batch_report("Split", &report?, json)
}

fn cmd_extract(config: &Config, input: &Path, output: &Path, json: bool) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("not found: {}", input.display());
    }
    let archiver = ExternalArchiver::from_config(&config.tools);

    let pb = progress_bar("Extracting");
    let report = batch::archive::extract_archives(
        input,
        output,
        &archiver,
        &config.archives.extensions,
        &config.archives.passwords,
        &|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        },
    );
    pb.finish_and_clear();
    print_batch_report("Extracted", &report?, json)
}

fn print_batch_report(verb: &str, report: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "{verb} {} file(s), skipped {}, failed {}",
        report.processed, report.skipped, report.failed
    );
    for output in &report.outputs {
        println!("  {}", output.display());
    }
    Ok(())
}

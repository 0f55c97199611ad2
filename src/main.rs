//! CLI entry point for `maildetach`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use maildetach::config::{Config, FaultPolicy};
use maildetach::extract::{self, ExtractSummary};
use maildetach::pipeline::PipelineOptions;

#[derive(Parser)]
#[command(
    name = "maildetach",
    version,
    about = "Extract base64 attachments from a directory of raw email files"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory containing the email files
    #[arg(short, long, value_name = "DIR")]
    base: Option<PathBuf>,

    /// Output directory (default: `detached` next to the base directory)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of decode workers
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// What to do with an attachment that is not valid base64
    #[arg(long, value_enum, value_name = "POLICY")]
    on_malformed: Option<FaultPolicy>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
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

    let config = maildetach::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match &cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(*shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.base.as_deref() {
            Some(base) => cmd_extract(base, &cli, &config),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config
        .general
        .log_dir
        .as_ref()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::never(dir, "maildetach.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "maildetach", &mut std::io::stdout());
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

/// Extract all attachments under `base`.
fn cmd_extract(base: &Path, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let output_dir = cli
        .output
        .clone()
        .or_else(|| config.extract.output_dir.clone())
        .unwrap_or_else(|| extract::default_output_dir(base));

    let mut options = PipelineOptions::from_config(config, output_dir);
    if let Some(workers) = cli.workers {
        options.worker_count = workers;
    }
    if let Some(policy) = cli.on_malformed {
        options.on_malformed = policy;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Scanning for attachments... {pos} file(s)")
            .expect("valid template"),
    );

    let start = Instant::now();
    let result = extract::extract_tree(base, &options, &|path| {
        if !cli.json {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            pb.println(name);
        }
        pb.inc(1);
    });
    pb.finish_and_clear();

    let summary = result?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, start.elapsed());
    }

    Ok(())
}

/// Print the run summary as a human-readable table.
fn print_summary(summary: &ExtractSummary, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<25} {}", "Files scanned", summary.files_scanned);
    if summary.files_failed > 0 {
        println!("  {:<25} {}", "Files failed", summary.files_failed);
    }
    println!("  {:<25} {}", "Attachments found", summary.attachments_found);
    println!(
        "  {:<25} {}",
        "Attachments written", summary.attachments_written
    );
    println!(
        "  {:<25} {}",
        "Bytes written",
        format_size(summary.bytes_written, BINARY)
    );
    println!("  {:<25} {}", "Output directory", summary.output_dir.display());
    println!("  {:<25} {:.2?}", "Elapsed", elapsed);

    if !summary.faults.is_empty() {
        println!();
        println!("  {} problem(s):", summary.faults.len());
        for fault in &summary.faults {
            match &fault.attachment {
                Some(id) => println!("    {} [{}]: {}", fault.path.display(), id, fault.message),
                None => println!("    {}: {}", fault.path.display(), fault.message),
            }
        }
    }
    println!();
}

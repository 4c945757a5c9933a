//! gg-archiver main entry point
//!
//! This is the command-line interface for the Google Groups archiver.

use clap::{CommandFactory, Parser, Subcommand};
use gg_archiver::config::load_or_default;
use gg_archiver::crawler::run_archive;
use gg_archiver::output::{demangle, print_demangle_report, print_run_report};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// gg-archiver: download a Google Group into an mbox archive
///
/// The `run` mode crawls every topic of a group and writes `<group>.mbx`
/// plus a `<group>.cnf` table of partially hidden addresses. Once the real
/// addresses are filled in, `demangle` applies the table to an archive.
#[derive(Parser, Debug)]
#[command(name = "gg-archiver")]
#[command(version)]
#[command(about = "Download a Google Group into an mbox archive", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Also write debug output to LOG_FILE (must not exist yet)
    #[arg(long, value_name = "LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a group and write its archive and address table
    Run {
        /// Group listing URL, e.g. https://groups.google.com/forum/#!forum/NAME
        #[arg(value_name = "URL")]
        url: String,

        /// Load the crawled group from FILE if it exists, otherwise save it there
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },

    /// Apply a filled-in address table to an archive
    Demangle {
        /// Correction table written by `run`
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Archive to read
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Archive to write (an existing file is kept as OUTPUT.bak)
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref());

    // Load and validate configuration
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match command {
        Command::Run { url, snapshot } => {
            match run_archive(&config, &url, snapshot.as_deref()).await {
                Ok(report) => {
                    tracing::info!("Archive of {} completed", report.group);
                    if !cli.quiet {
                        print_run_report(&report);
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("Run failed: {}", e);
                    Err(e.into())
                }
            }
        }
        Command::Demangle {
            table,
            input,
            output,
        } => match demangle(&table, &input, &output) {
            Ok(report) => {
                if !cli.quiet {
                    print_demangle_report(&report);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Demangle failed: {}", e);
                Err(e.into())
            }
        },
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With `log_file`, debug output additionally goes to that file. An existing
/// file is never overwritten; the error is logged and console logging goes on.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gg_archiver=info,warn"),
            1 => EnvFilter::new("gg_archiver=debug,info"),
            2 => EnvFilter::new("gg_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(filter);

    let (file, file_error) = match log_file.map(open_log_file) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(EnvFilter::new("gg_archiver=debug,info"))
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    if let (Some(path), Some(e)) = (log_file, file_error) {
        tracing::error!("Could not create log file {}: {}", path.display(), e);
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");

        assert!(open_log_file(&path).is_ok());
        std::fs::write(&path, "earlier run\n").unwrap();

        assert!(open_log_file(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier run\n");
    }

    #[test]
    fn test_cli_accepts_log_file() {
        let cli = Cli::try_parse_from([
            "gg-archiver",
            "--log-file",
            "run.log",
            "run",
            "https://groups.google.com/forum/#!forum/test",
        ])
        .unwrap();

        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
        assert!(matches!(cli.command, Some(Command::Run { .. })));
    }
}

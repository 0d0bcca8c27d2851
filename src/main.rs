//! Page-Sounder main entry point
//!
//! This is the command-line interface for the Page-Sounder page analyzer.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use page_sounder::config::{load_config_or_default, Config};
use page_sounder::crawler::{build_http_client, CrawlPool, Orchestrator};
use page_sounder::output::{
    format_record_detail, format_record_table, load_record_report, load_statistics,
    print_statistics,
};
use page_sounder::storage::{SqliteStorage, Storage, StorageError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Page-Sounder: a single-page web analyzer
///
/// Page-Sounder fetches a page, records its title, markup version, heading
/// counts, internal and external link counts, login form presence and the
/// links on it that no longer resolve.
#[derive(Parser, Debug)]
#[command(name = "page-sounder")]
#[command(version)]
#[command(about = "A single-page web analyzer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one or more pages and wait for the results
    Crawl {
        /// Absolute URLs to analyze
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// List crawl records, newest first
    List {
        /// Maximum number of records to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Show one record with its headings and broken links
    Show {
        id: i64,
    },

    /// Delete a record together with its headings and broken links
    Delete {
        id: i64,
    },

    /// Show record counts per status
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config =
        load_config_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Default configuration is invalid".to_string(),
        })?;
    tracing::debug!("Using database {}", config.storage.database_path);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open {}", config.storage.database_path))?;

    match cli.command {
        Command::Crawl { urls } => handle_crawl(&config, storage, &urls).await,
        Command::List { limit } => handle_list(&storage, limit),
        Command::Show { id } => handle_show(&storage, id),
        Command::Delete { id } => handle_delete(storage, id),
        Command::Stats => {
            let stats = load_statistics(&storage)?;
            print_statistics(&stats);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_sounder=info,warn"),
            1 => EnvFilter::new("page_sounder=debug,info"),
            2 => EnvFilter::new("page_sounder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Submits every URL, waits for the pool to drain and prints the outcomes
///
/// Ctrl-C cancels the remaining crawls; they end in `error`.
async fn handle_crawl(
    config: &Config,
    storage: SqliteStorage,
    urls: &[String],
) -> anyhow::Result<()> {
    let storage = Arc::new(Mutex::new(storage));
    let client = build_http_client(&config.user_agent).context("Failed to build HTTP client")?;
    let orchestrator = Orchestrator::new(&config.crawler, client, storage.clone());
    let pool = CrawlPool::from_config(&config.crawler, orchestrator);

    let mut accepted = Vec::new();
    let mut rejected = 0;
    for url in urls {
        match pool.start_crawl(url) {
            Ok(id) => {
                println!("Accepted {} as record {}", url, id);
                accepted.push(id);
            }
            Err(e) => {
                eprintln!("Rejected {}: {}", url, e);
                rejected += 1;
            }
        }
    }

    let cancel = pool.cancellation_token();
    let drain = pool.shutdown();
    tokio::pin!(drain);

    tokio::select! {
        _ = &mut drain => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling remaining crawls");
            cancel.cancel();
            drain.await;
        }
    }

    let storage = storage.lock().map_err(|_| StorageError::LockPoisoned)?;
    let mut records = Vec::new();
    for id in accepted {
        if let Some(record) = storage.get_record(id)? {
            records.push(record);
        }
    }
    print!("\n{}", format_record_table(&records));

    if rejected > 0 {
        bail!("{} of {} URLs were rejected", rejected, urls.len());
    }
    Ok(())
}

fn handle_list(storage: &SqliteStorage, limit: usize) -> anyhow::Result<()> {
    let records = storage.list_records(limit)?;
    print!("{}", format_record_table(&records));
    Ok(())
}

fn handle_show(storage: &SqliteStorage, id: i64) -> anyhow::Result<()> {
    match load_record_report(storage, id)? {
        Some(report) => {
            print!("{}", format_record_detail(&report));
            Ok(())
        }
        None => bail!("Record {} not found", id),
    }
}

fn handle_delete(mut storage: SqliteStorage, id: i64) -> anyhow::Result<()> {
    match storage.delete_record(id) {
        Ok(()) => {
            println!("Deleted record {}", id);
            Ok(())
        }
        Err(StorageError::RecordNotFound(_)) => bail!("Record {} not found", id),
        Err(e) => Err(e.into()),
    }
}

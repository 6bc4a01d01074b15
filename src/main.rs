//! Magpie main entry point
//!
//! Command-line interface for the Magpie corpus crawler.

use clap::Parser;
use magpie::config::{load_config, Config, SourceConfig};
use magpie::crawler::run_crawl;
use magpie::store::{SqliteStore, Store};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Magpie: a resumable corpus crawler
///
/// Magpie ingests documents from category-structured wikis and flat
/// paginated listings into a SQLite store. All crawl state is durable, so
/// an interrupted crawl picks up exactly where it stopped.
#[derive(Parser, Debug)]
#[command(name = "magpie")]
#[command(version = "0.1.0")]
#[command(about = "A resumable corpus crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show per-source statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("magpie=info,warn"),
            1 => EnvFilter::new("magpie=debug,info"),
            2 => EnvFilter::new("magpie=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config) {
    println!("=== Magpie Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nStore:");
    println!("  Database: {}", config.store.database_path);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        match source {
            SourceConfig::Category(c) => {
                println!("  - {} (category)", c.name);
                println!("    API: {}", c.api_url);
                println!("    Page base: {}", c.page_base);
                for seed in &c.seeds {
                    println!("    Seed: {}", seed);
                }
            }
            SourceConfig::Paginated(p) => {
                println!("  - {} (paginated)", p.name);
                println!("    Template: {}", p.page_url_template);
                println!("    Item pattern: {}", p.item_pattern);
                println!("    Max pages: {}", p.max_pages);
            }
        }
        if let Some(cap) = source.max_docs() {
            println!("    Document cap: {}", cap);
        }
        println!("    Recrawl after: {}s", source.recrawl_after_secs());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows per-source statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use std::path::Path;

    println!("Database: {}\n", config.store.database_path);

    let store = SqliteStore::new(Path::new(&config.store.database_path))?;

    for source in &config.sources {
        let count = store.count_by_source(source.name())?;
        match source {
            SourceConfig::Category(_) => {
                println!("{} (category): {} documents", source.name(), count);
            }
            SourceConfig::Paginated(_) => {
                let progress = store.load_progress(source.name())?;
                println!(
                    "{} (paginated): {} documents, cursor at page {}, item {}",
                    source.name(),
                    count,
                    progress.page,
                    progress.index
                );
            }
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting crawl of {} sources", config.sources.len());

    let cancel = CancellationToken::new();

    // Ctrl-C triggers a cooperative shutdown: in-flight items finish,
    // cursors are already persisted, and the process exits cleanly.
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current item and stopping");
            interrupt.cancel();
        }
    });

    match run_crawl(config, cancel).await {
        Ok(()) => {
            tracing::info!("Crawl pass completed");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

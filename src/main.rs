//! geo-sweep main entry point
//!
//! This is the command-line interface for the geo-sweep object finder.

use anyhow::Context;
use clap::Parser;
use geo_sweep::config::{load_config_with_hash, Config};
use geo_sweep::crawler::{crawl, CrawlSettings};
use geo_sweep::output::{load_statistics, print_new_objects, print_statistics};
use geo_sweep::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// geo-sweep: find new places inside an area
///
/// geo-sweep splits the configured area until every piece fits in one page
/// of search results, searches every piece, and prints the objects it has
/// not reported before.
#[derive(Parser, Debug)]
#[command(name = "geo-sweep")]
#[command(version)]
#[command(about = "Find new points of interest inside an area", long_about = None)]
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

    /// Forget every known object, then crawl once to re-seed the store
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    clear: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["clear", "stats"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["clear", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.clear {
        handle_clear(&config).await
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("geo_sweep=info,warn"),
            1 => EnvFilter::new("geo_sweep=debug,info"),
            2 => EnvFilter::new("geo_sweep=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let settings = CrawlSettings::from_config(config)?;

    println!("=== geo-sweep Dry Run ===\n");

    println!("Search:");
    println!("  Endpoint: {}", config.api.base_url);
    println!("  Text: {}", config.query.text);
    println!("  Language: {}", config.query.lang);
    println!("  Type: {}", config.query.kind);
    println!("  Restrict to area: {}", config.query.restrict_to_area);
    println!("  Page size: {}", config.query.results);

    println!("\nArea:");
    println!("  {}", settings.root);

    println!("\nPartitioning:");
    println!("  Threshold: {}", settings.partition.threshold);
    println!("  Max workers: {}", settings.partition.max_workers);
    println!("  Max depth: {}", settings.partition.max_depth);
    println!("  Min span: {}", settings.partition.min_span);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Partition fingerprint: {}", settings.partition_fingerprint());

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let settings = CrawlSettings::from_config(config)?;
    let store = open_storage(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;

    let stats = load_statistics(&store, &settings)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --clear mode: wipes the store and re-seeds it
async fn handle_clear(config: &Config) -> anyhow::Result<()> {
    let (_, report) = crawl(config, true).await.context("Crawl failed")?;

    println!(
        "Store cleared and re-seeded with {} objects from {} leaves",
        report.accepted, report.leaves
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Searching for '{}' in {}",
        config.query.text,
        config.root_bbox()?
    );

    let (objects, report) = crawl(config, false).await.context("Crawl failed")?;
    print_new_objects(&objects, &report)?;

    Ok(())
}

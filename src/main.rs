//! Spinneret main entry point
//!
//! This is the command-line interface for the Spinneret crawler.

use anyhow::Context;
use clap::Parser;
use spinneret::config::{load_config_with_hash, Config};
use spinneret::crawler::{run_crawl, user_agent};
use spinneret::CanonicalUrl;
use spinneret::output::{print_statistics, print_store_summary, prune_docid_log, summarize_store};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Spinneret: a polite, persistent web crawler
///
/// Spinneret fetches pages host by host, waiting between two requests to
/// the same host, and stores every page under its document id. Press Enter
/// to stop a running crawl; the next run resumes where it left off.
#[derive(Parser, Debug)]
#[command(name = "spinneret")]
#[command(version)]
#[command(about = "A polite, persistent web crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "prune"])]
    dry_run: bool,

    /// Show totals of the existing store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "prune"])]
    stats: bool,

    /// Write the docid log restricted to downloaded pages ("-" for stdout) and exit
    #[arg(long, value_name = "OUTPUT", conflicts_with_all = ["dry_run", "stats"])]
    prune: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(output) = cli.prune.as_deref() {
        handle_prune(&config, output)?;
    } else {
        handle_crawl(config)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spinneret=info,warn"),
            1 => EnvFilter::new("spinneret=debug,info"),
            2 => EnvFilter::new("spinneret=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_writer(io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Spinneret Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Stats interval: {}s", config.stats.interval_secs);

    println!("\nUser Agent:");
    println!("  {}", user_agent(&config.user_agent));

    println!("\nStorage:");
    println!("  Store directory: {}", config.storage.store_dir);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        match CanonicalUrl::parse(seed) {
            Ok(url) => println!("  * {}", url),
            Err(e) => println!("  ! {} ({})", seed, e),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows totals computed from the store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store_dir = Path::new(&config.storage.store_dir);
    let summary = summarize_store(store_dir)
        .with_context(|| format!("Failed to read store {}", store_dir.display()))?;
    print_store_summary(store_dir, &summary);
    Ok(())
}

/// Handles the --prune mode: keeps docid log lines of downloaded pages
fn handle_prune(config: &Config, output: &Path) -> anyhow::Result<()> {
    let store_dir = Path::new(&config.storage.store_dir);

    let mut out: Box<dyn Write> = if output == Path::new("-") {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let file = File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        Box::new(BufWriter::new(file))
    };

    let kept = prune_docid_log(store_dir, out.as_mut())
        .with_context(|| format!("Failed to prune docid log of {}", store_dir.display()))?;
    tracing::info!("Kept {} docid records", kept);
    Ok(())
}

/// Handles the main crawl operation
fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl with {} workers and {} seeds",
        config.crawler.workers,
        config.crawler.seeds.len()
    );

    let stats = run_crawl(config).context("Crawl failed")?;
    print_statistics(&stats);
    Ok(())
}

//! Gleaner main entry point
//!
//! This is the command-line interface for the Gleaner crawler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gleaner::config::{load_config_with_hash, Config, OutputFormat};
use gleaner::crawler::{Controller, HttpTransport};
use gleaner::extract::{LinkExtractor, ProductExtractor};
use gleaner::output::{exporter_for, print_summary};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Number of discovered links printed after a link crawl
const LINKS_SHOWN: usize = 10;

/// Gleaner: a polite record-extracting web crawler
///
/// Gleaner follows links inside a set of allowed domains, paces requests per
/// domain, retries transient failures and exports what it extracts.
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(version = "1.0.0")]
#[command(about = "A polite record-extracting web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Mode,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Mode {
    /// Extract products from listing and detail pages and export them
    Scrape {
        /// Output file (overrides the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (overrides the config)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Discover links and list the pages visited
    Crawl,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Mode::Scrape { output, format } = &cli.mode {
        if let Some(output) = output {
            config.output.path = output.display().to_string();
        }
        if let Some(format) = format {
            config.output.format = (*format).into();
        }
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli.mode);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.mode {
        Mode::Scrape { .. } => handle_scrape(config, cancel).await,
        Mode::Crawl => handle_crawl(config, cancel).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gleaner=info,warn"),
            1 => EnvFilter::new("gleaner=debug,info"),
            2 => EnvFilter::new("gleaner=trace,debug"),
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

/// Cancels the run on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, mode: &Mode) {
    println!("=== Gleaner Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nDomain Limits:");
    let rule = config.limits.default_rule;
    println!(
        "  * : parallelism {}, delay {}ms, jitter {}ms",
        rule.parallelism, rule.delay_ms, rule.jitter_ms
    );
    for entry in &config.limits.domains {
        println!(
            "  {} : parallelism {}, delay {}ms, jitter {}ms",
            entry.domain, entry.rule.parallelism, entry.rule.delay_ms, entry.rule.jitter_ms
        );
    }

    for entry in &config.limits.paths {
        println!(
            "  path {} : parallelism {}, delay {}ms, jitter {}ms",
            entry.path, entry.rule.parallelism, entry.rule.delay_ms, entry.rule.jitter_ms
        );
    }

    if !config.proxy.urls.is_empty() {
        println!("\nProxies ({}, round-robin):", config.proxy.urls.len());
        for proxy in &config.proxy.urls {
            println!("  - {}", proxy);
        }
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Backoff: {:?}", config.retry.backoff);
    println!(
        "  Delay: {}ms (max {}ms)",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    if matches!(mode, Mode::Scrape { .. }) {
        println!("\nOutput:");
        println!("  Path: {}", config.output.path);
        println!("  Format: {:?}", config.output.format);
    }

    println!(
        "\nAllowed Domains ({}):",
        config.crawler.allowed_domains.len()
    );
    for domain in &config.crawler.allowed_domains {
        println!("  - {}", domain);
    }

    println!("\nStart URLs ({}):", config.crawler.start_urls.len());
    for url in &config.crawler.start_urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} start URLs",
        config.crawler.start_urls.len()
    );
}

/// Builds the HTTP transport, reporting proxy rotation
fn build_transport(config: &Config) -> Result<HttpTransport> {
    let transport = HttpTransport::from_config(config).context("Failed to build HTTP client")?;
    if transport.proxy_count() > 0 {
        tracing::info!("Rotating requests through {} proxies", transport.proxy_count());
    }
    Ok(transport)
}

/// Handles the scrape mode: product extraction and export
async fn handle_scrape(config: Config, cancel: CancellationToken) -> Result<()> {
    let transport = build_transport(&config)?;
    let extractor = ProductExtractor::new()?;
    let start_urls = config.crawler.start_urls.clone();
    let output = config.output.clone();

    let controller = Controller::new(config, transport, extractor)?;
    let result = controller
        .run_with_cancellation(&start_urls, cancel)
        .await
        .context("Crawl failed")?;

    print_summary(&result);

    if result.records.is_empty() {
        println!("\nNo records found.");
        return Ok(());
    }

    let exporter = exporter_for(output.format, &output.path);
    let written = exporter
        .export(&result.records)
        .with_context(|| format!("Failed to export records to {}", output.path))?;

    println!("\n✓ Exported {} products to: {}", written, output.path);
    Ok(())
}

/// Handles the crawl mode: link discovery
async fn handle_crawl(config: Config, cancel: CancellationToken) -> Result<()> {
    let transport = build_transport(&config)?;
    let extractor = LinkExtractor::new()?;
    let start_urls = config.crawler.start_urls.clone();

    let controller = Controller::new(config, transport, extractor)?;
    let result = controller
        .run_with_cancellation(&start_urls, cancel)
        .await
        .context("Crawl failed")?;

    print_summary(&result);

    println!("\nVisited {} pages", result.records.len());
    println!("Discovered {} links", result.links_discovered.len());
    for link in result.links_discovered.iter().take(LINKS_SHOWN) {
        println!("  - {}", link);
    }
    if result.links_discovered.len() > LINKS_SHOWN {
        println!(
            "  ... and {} more",
            result.links_discovered.len() - LINKS_SHOWN
        );
    }

    Ok(())
}

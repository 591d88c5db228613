//! Mirrorator main entry point
//!
//! This is the command-line interface for the Mirrorator package mirror.

use clap::Parser;
use mirrorator::config::{load_config_with_hash, load_seeds, Config};
use mirrorator::crawler::run_mirror;
use mirrorator::output::print_statistics;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Mirrorator: a dependency-closure package mirror
///
/// Mirrorator mirrors the seed packages listed in the packages file, scans
/// their source archives for declared dependencies and keeps following
/// those until the whole closure is mirrored. A static "simple" index is
/// written next to the archives.
#[derive(Parser, Debug)]
#[command(name = "mirrorator")]
#[command(version = "1.0.0")]
#[command(about = "A dependency-closure package mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the seed list without mirroring anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => load_configuration(path)?,
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_mirror(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mirrorator=info,warn"),
            1 => EnvFilter::new("mirrorator=debug,info"),
            2 => EnvFilter::new("mirrorator=trace,debug"),
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

/// Loads and validates the configuration file
fn load_configuration(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --dry-run mode: shows settings and seeds, touches no network
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Mirrorator Dry Run ===\n");

    println!("Upstream:");
    println!("  Host: {}", config.upstream.host);
    println!("  Package prefix: {}", config.upstream.package_prefix);
    println!("  Source marker: {}", config.upstream.source_marker);
    println!("  Pre-release marker: {}", config.upstream.prerelease_marker);

    println!("\nMirror:");
    println!("  Root: {}", config.mirror.root);
    println!("  Packages file: {}", config.mirror.packages_file);
    println!("  Requirement report: {}", config.mirror.report_path);

    println!("\nAlias index:");
    println!("  Path: {}", config.aliases.index_path);
    println!("  Max age: {}h", config.aliases.max_age_hours);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Request timeout: {}s", config.http.timeout_secs);
    println!("  Package deadline: {}s", config.http.package_deadline_secs);

    let seeds = load_seeds(Path::new(&config.mirror.packages_file))?;
    println!("\nSeed packages ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start mirroring from {} seed packages", seeds.len());

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} into {}",
        config.upstream.host,
        config.mirror.root
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl and writing indexes");
            interrupt.cancel();
        }
    });

    match run_mirror(config, cancel).await {
        Ok(stats) => {
            tracing::info!("Mirror completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}

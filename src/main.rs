//! Discograph main entry point
//!
//! Command-line interface for the discograph music-archive ingestion
//! pipeline.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use discograph::config::load_config_with_hash;
use discograph::crawler::run_crawl;
use discograph::output::{
    export_graph, load_statistics, print_run_summary, print_statistics, write_dead_letter_file,
};
use discograph::storage::SqliteStorage;

/// Discograph: a music-archive ingestion pipeline
///
/// Discograph crawls archive pages describing bands, artists, labels, and
/// releases, normalizes them into typed records, and assembles a
/// deduplicated relationship graph for export.
#[derive(Parser, Debug)]
#[command(name = "discograph")]
#[command(version = "1.0.0")]
#[command(about = "A music-archive ingestion pipeline", long_about = None)]
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

    /// Ignore the visited ledger and re-ingest everything
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be ingested without fetching
    #[arg(long, conflicts_with_all = ["stats", "export_graph"])]
    dry_run: bool,

    /// Show archive statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_graph"])]
    stats: bool,

    /// Assemble and export the relationship graph from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_graph: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_graph {
        handle_export_graph(&config)?;
    } else {
        handle_ingest(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("discograph=info,warn"),
            1 => EnvFilter::new("discograph=debug,info"),
            2 => EnvFilter::new("discograph=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &discograph::Config) {
    println!("=== Discograph Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Max attempts per item: {}", config.crawler.max_attempts);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  User agent: {}", config.source.user_agent);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Dead-letter dir: {}", config.output.dead_letter_dir);
    println!("  Graph: {}", config.output.graph_path);

    let seed_count: usize = config.seed.iter().map(|s| s.references.len()).sum();
    println!("\nSeeds ({} references):", seed_count);
    for entry in &config.seed {
        println!("  [{}]", entry.kind);
        for reference in &entry.references {
            println!("    - {}", reference);
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start ingesting {} seed references", seed_count);
}

/// Handles the --stats mode: shows archive statistics from the database
fn handle_stats(config: &discograph::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-graph mode: assembles and writes the graph
fn handle_export_graph(config: &discograph::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting Relationship Graph ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.graph_path);
    println!();

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let graph = export_graph(
        &storage,
        Path::new(&config.output.graph_path),
        config.output.include_isolated,
    )?;

    println!(
        "✓ Graph exported: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    Ok(())
}

/// Handles the main ingest operation
async fn handle_ingest(
    config: discograph::Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh run (ignoring visited ledger)");
    } else {
        tracing::info!("Starting run (previously visited entities will be skipped)");
    }

    let dead_letter_dir = PathBuf::from(&config.output.dead_letter_dir);

    match run_crawl(config, config_hash, fresh).await {
        Ok(summary) => {
            write_dead_letter_file(&dead_letter_dir, &summary.unrecoverable)?;
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

//! latinpub command-line tool
//!
//! Loads harvested metadata into the record store, runs deduplication over
//! the stored records, and reports cluster statistics.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use latinpub_core::ingest::read_metadata_dir;
use latinpub_core::{deduplicate_store, Deduplicator, LatinPubConfig, SqliteStore};

#[derive(Parser)]
#[command(name = "latinpub", version, about = "Harvested Latin publication deduplication")]
struct Cli {
    /// Configuration file (defaults to <config dir>/latinpub/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overriding the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load JSON metadata documents into the record store
    Ingest {
        /// Directory of metadata documents, overriding the configuration
        #[arg(long)]
        metadata_dir: Option<PathBuf>,
    },
    /// Cluster duplicate records and assign canonical ids
    Dedupe {
        /// Run on the calling thread only
        #[arg(long)]
        sequential: bool,
    },
    /// Print record and cluster counts
    Stats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match LatinPubConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(database) = cli.database {
        config.storage.database = database;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, mut config: LatinPubConfig) -> latinpub_core::Result<()> {
    match command {
        Command::Ingest { metadata_dir } => {
            if let Some(dir) = metadata_dir {
                config.ingest.metadata_dir = dir;
            }
            let batch = read_metadata_dir(&config.ingest.metadata_dir)?;
            let mut store = SqliteStore::open(&config.storage.database)?;
            let inserted = store.insert_batch(&batch.records)?;

            println!("Files parsed:     {}", batch.records.len());
            println!("Files failed:     {}", batch.failed.len());
            println!("Records inserted: {}", inserted);
        }
        Command::Dedupe { sequential } => {
            if sequential {
                config.pipeline.parallel = false;
            }
            let mut store = SqliteStore::open(&config.storage.database)?;
            let report = deduplicate_store(&mut store, &Deduplicator::from_config(&config.pipeline))?;

            println!("Total records:           {}", report.total_records);
            println!("Excluded (no year):      {}", report.excluded_records);
            println!("Partitions compared:     {}", report.comparable_partitions);
            println!("Pairs compared:          {}", report.comparisons);
            println!("Duplicate clusters:      {}", report.clusters);
            println!("Records marked as dupes: {}", report.duplicates_marked);
            println!("Estimated unique works:  {}", report.unique_works);
        }
        Command::Stats => {
            let store = SqliteStore::open(&config.storage.database)?;
            let stats = store.stats()?;

            println!("Total records:      {}", stats.total_records);
            println!("Undated records:    {}", stats.undated_records);
            println!("Duplicate clusters: {}", stats.clusters);
            println!("Duplicate records:  {}", stats.duplicate_records);
            println!("Unique works:       {}", stats.unique_works);
        }
    }

    Ok(())
}

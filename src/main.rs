use campus_market::application::engine::Marketplace;
use campus_market::domain::ports::MarketStoreBox;
use campus_market::infrastructure::clock::SystemClock;
use campus_market::infrastructure::in_memory::InMemoryMarketStore;
use campus_market::interfaces::csv::inventory_writer::InventoryWriter;
use campus_market::interfaces::jsonl::command_reader::CommandReader;
use campus_market::logging::setup_logging;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands file, one JSON object per line
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "CAMPUS_MARKET_DB_PATH")]
    db_path: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<MarketStoreBox> {
    use campus_market::infrastructure::rocksdb::RocksDBMarketStore;

    match db_path {
        Some(path) => Ok(Box::new(RocksDBMarketStore::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryMarketStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<MarketStoreBox> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryMarketStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let market = Marketplace::new(open_store(cli.db_path)?, Box::new(SystemClock));

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let (mut applied, mut failed) = (0usize, 0usize);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                let op = command.op();
                match command.apply(&market).await {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        failed += 1;
                        debug!(
                            op,
                            kind = ?e.kind(),
                            retryable = e.is_retryable(),
                            error = %e,
                            "command failed"
                        );
                        eprintln!("Error processing command {op}: {}", e.public_message());
                    }
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error reading command: {}", e);
            }
        }
    }
    info!(applied, failed, input = %cli.input.display(), "replay finished");

    let inventory = market.inventory().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = InventoryWriter::new(stdout.lock());
    writer.write_inventory(&inventory).into_diagnostic()?;

    Ok(())
}

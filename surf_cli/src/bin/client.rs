use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use surf_sync::SyncClient;

/// Exit code for command-line usage errors.
const EX_USAGE: i32 = 64;

#[derive(Parser)]
#[command(
    name = "surfstore-client",
    about = "Synchronize a directory against a surfstore deployment"
)]
struct Cli {
    /// Address of the metadata service (host:port)
    meta_addr: String,

    /// Directory to keep in sync
    base_dir: PathBuf,

    /// Block size in bytes
    block_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    if cli.block_size == 0 {
        eprintln!("block size must be a positive number of bytes");
        std::process::exit(EX_USAGE);
    }

    let client = SyncClient::new(&cli.meta_addr, cli.base_dir, cli.block_size)?;
    client.sync().await
}

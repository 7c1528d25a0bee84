use std::str::FromStr;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use surf_node::ServiceRole;

/// Exit code for command-line usage errors.
const EX_USAGE: i32 = 64;

const USAGE: &str =
    "usage: surfstore-server -s {meta|block|both} -p PORT [-l] [-d] (blockStoreAddr*)";

#[derive(Parser)]
#[command(name = "surfstore-server", about = "Run a surfstore server node")]
struct Cli {
    /// Service role of this node: meta, block or both
    #[arg(short = 's', value_name = "SERVICE")]
    service: Option<String>,

    /// Port to accept connections on
    #[arg(short = 'p', value_name = "PORT", default_value_t = 8080)]
    port: u16,

    /// Listen on localhost only
    #[arg(short = 'l')]
    local_only: bool,

    /// Enable log output
    #[arg(short = 'd')]
    debug: bool,

    /// Block store shard addresses (include this node itself when the
    /// role is both)
    #[arg(value_name = "BLOCK_ADDR")]
    block_addrs: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let role = match cli.service.as_deref().map(ServiceRole::from_str) {
        Some(Ok(role)) => role,
        Some(Err(err)) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(EX_USAGE);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(EX_USAGE);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::OFF
        })
        .init();

    let host = if cli.local_only { "localhost" } else { "0.0.0.0" };
    let addr = format!("{host}:{}", cli.port);
    surf_node::serve_until_shutdown(&addr, role, cli.block_addrs).await
}

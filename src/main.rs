//! Mini-P2P node CLI
//!
//! Runs a peer-to-peer node speaking the version / peer-list / ping / sync
//! protocol.

use clap::{Parser, Subcommand};
use mini_p2p::cli::{self, StartOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "p2pnode")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Peer lifecycle and liveness node for a mini-blockchain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a P2P node
    Start {
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Comma-separated bootstrap peers, e.g. 127.0.0.1:9001,127.0.0.1:9002
        #[arg(long)]
        peers: Option<String>,

        /// Ignore peer lists received from other nodes
        #[arg(long)]
        no_discovery: bool,

        /// Answer sync queries as a synced node
        #[arg(long)]
        synced: bool,
    },

    /// Print the default config, or write it to a file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            config,
            port,
            peers,
            no_discovery,
            synced,
        } => {
            let opts = StartOptions {
                config,
                port,
                peers,
                no_discovery,
                synced,
            };
            let node_config = cli::resolve_config(&opts)?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_start(node_config, opts.synced))?;
        }

        Commands::Config { output } => {
            cli::cmd_config(output.as_deref())?;
        }
    }

    Ok(())
}

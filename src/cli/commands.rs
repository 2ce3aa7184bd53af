//! CLI commands for the node
//!
//! Implements the command handlers behind the `p2pnode` binary.

use crate::config::NodeConfig;
use crate::network::Node;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Flags accepted by `start`
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub peers: Option<String>,
    pub no_discovery: bool,
    pub synced: bool,
}

/// Build the effective config: file (or defaults), then command-line overrides
pub fn resolve_config(opts: &StartOptions) -> CliResult<NodeConfig> {
    let mut config = match &opts.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    if let Some(port) = opts.port {
        config.listen_port = port;
    }

    if let Some(peers) = &opts.peers {
        config.bootstrap_peers = peers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if opts.no_discovery {
        config.peer_discovery_enabled = false;
    }

    config.validate()?;
    Ok(config)
}

/// Run a node until Ctrl+C
pub async fn cmd_start(config: NodeConfig, synced: bool) -> CliResult<()> {
    println!("🌐 Starting P2P node on port {}...", config.listen_port);
    println!("   ├─ Protocol version: {}", config.protocol_version);
    println!(
        "   ├─ Genesis prev_headerhash: {}",
        hex::encode(&config.genesis_prev_headerhash)
    );
    println!(
        "   ├─ Ping period/timeout: {}s / {}s",
        config.ping_period_secs, config.ping_timeout_secs
    );
    println!(
        "   └─ Peer discovery: {}",
        if config.peer_discovery_enabled { "on" } else { "off" }
    );

    let node = Arc::new(Node::new(config).await?);
    node.set_synced(synced);

    let signal_node = Arc::clone(&node);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n📴 Shutting down node...");
            signal_node.shutdown().await;
        }
    });

    node.start().await?;

    let status = node.status().await;
    println!(
        "✅ Node stopped ({} known addresses, {} synced peers)",
        status.known_addresses, status.synced_peers
    );
    Ok(())
}

/// Print the default config, or write it to `output`
pub fn cmd_config(output: Option<&Path>) -> CliResult<()> {
    let config = NodeConfig::default();
    match output {
        Some(path) => {
            config.save(path)?;
            println!("✅ Config written to {}", path.display());
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}

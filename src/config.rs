//! Node configuration
//!
//! Loaded from a JSON file; every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default listening port
pub const DEFAULT_PORT: u16 = 9000;

/// Default seconds between liveness cycles
pub const DEFAULT_PING_PERIOD_SECS: u64 = 30;

/// Default seconds without a pong before a peer is dropped
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 180;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Peer-to-peer node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Port to listen on
    pub listen_port: u16,
    /// Initial peers to connect to
    pub bootstrap_peers: Vec<String>,
    /// Version string announced during the handshake
    pub protocol_version: String,
    /// Genesis reference hash, hex in the config file
    #[serde(with = "hex")]
    pub genesis_prev_headerhash: Vec<u8>,
    /// Seconds between liveness cycles
    pub ping_period_secs: u64,
    /// Seconds without a pong before a peer is dropped
    pub ping_timeout_secs: u64,
    /// Whether peer lists from other nodes are merged
    pub peer_discovery_enabled: bool,
    /// Address advertised to peers instead of the connection's local address
    pub advertised_ip: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_PORT,
            bootstrap_peers: Vec::new(),
            protocol_version: env!("CARGO_PKG_VERSION").to_string(),
            genesis_prev_headerhash: vec![0u8; 32],
            ping_period_secs: DEFAULT_PING_PERIOD_SECS,
            ping_timeout_secs: DEFAULT_PING_TIMEOUT_SECS,
            peer_discovery_enabled: true,
            advertised_ip: None,
        }
    }
}

impl NodeConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config: NodeConfig = serde_json::from_str(&data)?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_period_secs == 0 {
            return Err(ConfigError::Invalid("ping_period_secs must be > 0".into()));
        }
        if self.ping_timeout_secs == 0 {
            return Err(ConfigError::Invalid("ping_timeout_secs must be > 0".into()));
        }
        if self.protocol_version.is_empty() {
            // An empty version would read as a version request on the wire
            return Err(ConfigError::Invalid("protocol_version must not be empty".into()));
        }
        Ok(())
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.ping_period_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_period(), Duration::from_secs(30));
        assert_eq!(config.ping_timeout(), Duration::from_secs(180));
        assert_eq!(config.genesis_prev_headerhash.len(), 32);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("node.json");

        let config = NodeConfig {
            listen_port: 19000,
            bootstrap_peers: vec!["127.0.0.1:19001".to_string()],
            genesis_prev_headerhash: vec![0xde, 0xad, 0xbe, 0xef],
            peer_discovery_enabled: false,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"deadbeef\""));

        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("node.json");
        fs::write(&path, r#"{ "listen_port": 7000, "ping_timeout_secs": 60 }"#).unwrap();

        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded.listen_port, 7000);
        assert_eq!(loaded.ping_timeout_secs, 60);
        assert_eq!(loaded.ping_period_secs, DEFAULT_PING_PERIOD_SECS);
        assert!(loaded.peer_discovery_enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("node.json");
        fs::write(&path, r#"{ "ping_period_secs": 0 }"#).unwrap();

        assert!(matches!(
            NodeConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, r#"{ "genesis_prev_headerhash": "zz" }"#).unwrap();
        assert!(matches!(
            NodeConfig::load(&path),
            Err(ConfigError::SerializationError(_))
        ));
    }
}

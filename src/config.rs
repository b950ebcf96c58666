//! Configuration for the attestation client.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ATTESTOR_REGISTRY_URL, ATTESTOR_ETH_RPC_URL,
//!    ATTESTOR_ETH_FROM, ATTESTOR_CHAIN_ID)
//! 2. Config file (.attestor/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .attestor/config.yaml
//! - Falls back to ~/.attestor/config.yaml

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::PollPolicy;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub registry_url: Option<String>,
    #[serde(default)]
    pub eth_rpc_url: Option<String>,
    /// Sender account managed by the RPC node
    #[serde(default)]
    pub eth_from: Option<String>,
    #[serde(default)]
    pub default_chain_id: Option<u64>,
    /// Per-chain settings, keyed by chain id
    #[serde(default)]
    pub chains: HashMap<u64, ChainEntry>,
    #[serde(default)]
    pub uid_poll: Option<PollPolicy>,
    #[serde(default)]
    pub receipt: Option<ReceiptEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainEntry {
    /// Contract receiving run fees on this chain
    pub payment_contract: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptEntry {
    pub poll_interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub registry_url: String,
    pub eth_rpc_url: String,
    pub eth_from: Option<String>,
    pub default_chain_id: u64,
    pub chains: HashMap<u64, ChainEntry>,
    pub uid_poll: PollPolicy,
    pub receipt: ReceiptSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ReceiptSettings {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            timeout_ms: 600_000,
        }
    }
}

impl ResolvedConfig {
    /// Payment contract for a chain; an error when the chain is not
    /// configured
    pub fn payment_contract(&self, chain_id: u64) -> Result<&str> {
        self.chains
            .get(&chain_id)
            .map(|c| c.payment_contract.as_str())
            .with_context(|| format!("No payment contract configured for chain {}", chain_id))
    }

    /// Display name for a chain, falling back to the chain id
    pub fn chain_name(&self, chain_id: u64) -> String {
        self.chains
            .get(&chain_id)
            .and_then(|c| c.display_name.clone())
            .unwrap_or_else(|| chain_id.to_string())
    }
}

/// Find config file by searching current directory and parents, then the
/// home directory
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".attestor").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let home_config = dirs::home_dir()?.join(".attestor").join("config.yaml");
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let registry_url = std::env::var("ATTESTOR_REGISTRY_URL")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.registry_url.clone()))
        .unwrap_or_else(|| "http://localhost:8000".to_string());

    let eth_rpc_url = std::env::var("ATTESTOR_ETH_RPC_URL")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.eth_rpc_url.clone()))
        .unwrap_or_else(|| "http://localhost:8545".to_string());

    let eth_from = std::env::var("ATTESTOR_ETH_FROM")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.eth_from.clone()));

    let default_chain_id = match std::env::var("ATTESTOR_CHAIN_ID") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("ATTESTOR_CHAIN_ID is not a chain id: {}", raw))?,
        Err(_) => file
            .as_ref()
            .and_then(|f| f.default_chain_id)
            .unwrap_or(11_155_111), // Sepolia
    };

    let chains = file
        .as_ref()
        .map(|f| f.chains.clone())
        .unwrap_or_default();

    let uid_poll = file
        .as_ref()
        .and_then(|f| f.uid_poll.clone())
        .unwrap_or_default();

    let receipt = file
        .as_ref()
        .and_then(|f| f.receipt.as_ref())
        .map(|r| {
            let defaults = ReceiptSettings::default();
            ReceiptSettings {
                poll_interval_ms: r.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
                timeout_ms: r.timeout_ms.unwrap_or(defaults.timeout_ms),
            }
        })
        .unwrap_or_default();

    Ok(ResolvedConfig {
        registry_url,
        eth_rpc_url,
        eth_from,
        default_chain_id,
        chains,
        uid_poll,
        receipt,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let attestor_dir = temp.path().join(".attestor");
        std::fs::create_dir_all(&attestor_dir).unwrap();

        let config_path = attestor_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
registry_url: https://engine.example.org
eth_rpc_url: http://localhost:8545
eth_from: "0xa32aECda752cF4EF89956e83d60C04835d4FA867"
default_chain_id: 10
chains:
  10:
    payment_contract: "0x1111111111111111111111111111111111111111"
    display_name: Optimism
  11155111:
    payment_contract: "0x2222222222222222222222222222222222222222"
uid_poll:
  max_attempts: 6
  delay_ms: 5000
receipt:
  poll_interval_ms: 2000
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(
            config.registry_url,
            Some("https://engine.example.org".to_string())
        );
        assert_eq!(config.default_chain_id, Some(10));
        assert_eq!(config.chains.len(), 2);
        assert_eq!(
            config.chains.get(&10).unwrap().display_name,
            Some("Optimism".to_string())
        );
        assert_eq!(config.uid_poll.as_ref().unwrap().max_attempts, 6);
        assert_eq!(
            config.receipt.as_ref().unwrap().poll_interval_ms,
            Some(2000)
        );
        // timeout falls back to the default later, at resolution time
        assert_eq!(config.receipt.as_ref().unwrap().timeout_ms, None);
    }

    #[test]
    fn test_payment_contract_lookup() {
        let config = ResolvedConfig {
            registry_url: "http://localhost:8000".to_string(),
            eth_rpc_url: "http://localhost:8545".to_string(),
            eth_from: None,
            default_chain_id: 10,
            chains: [(
                10,
                ChainEntry {
                    payment_contract: "0x1111111111111111111111111111111111111111".to_string(),
                    display_name: Some("Optimism".to_string()),
                },
            )]
            .into_iter()
            .collect(),
            uid_poll: PollPolicy::default(),
            receipt: ReceiptSettings::default(),
            config_file: None,
        };

        assert_eq!(
            config.payment_contract(10).unwrap(),
            "0x1111111111111111111111111111111111111111"
        );
        assert!(config.payment_contract(1).is_err());

        assert_eq!(config.chain_name(10), "Optimism");
        assert_eq!(config.chain_name(1), "1");
    }

    #[test]
    fn test_receipt_defaults() {
        let settings = ReceiptSettings::default();
        assert_eq!(settings.poll_interval_ms, 5_000);
        assert_eq!(settings.timeout_ms, 600_000);
    }
}

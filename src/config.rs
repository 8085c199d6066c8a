//! Configuration module for the transaction augmenter
//!
//! Configuration is loaded from a TOML file, with `.env` and environment
//! variable overrides for the RPC connection.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};

/// Overrides `rpc.url`
pub const ENV_RPC_URL: &str = "TX_AUGMENT_RPC_URL";
/// Overrides `rpc.commitment`
pub const ENV_COMMITMENT: &str = "TX_AUGMENT_COMMITMENT";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// RPC connection used for lookup tables, blockhashes and mint accounts
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Commitment level for every read (`processed`, `confirmed`, `finalized`)
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_rpc_timeout() -> u64 {
    30
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl RpcConfig {
    /// Parsed commitment level
    pub fn commitment_config(&self) -> anyhow::Result<CommitmentConfig> {
        let commitment = self
            .commitment
            .parse::<CommitmentLevel>()
            .map_err(|_| anyhow::anyhow!("Unknown commitment level: {}", self.commitment))?;
        Ok(CommitmentConfig { commitment })
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `TX_AUGMENT_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc.url = url;
        }
        if let Some(commitment) = lookup(ENV_COMMITMENT) {
            self.rpc.commitment = commitment;
        }
    }

    /// Reject configurations the RPC client cannot be built from
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.rpc.url.starts_with("http://") || self.rpc.url.starts_with("https://")) {
            bail!("rpc.url must be an http(s) URL, got {:?}", self.rpc.url);
        }
        if self.rpc.timeout_secs == 0 {
            bail!("rpc.timeout_secs must be greater than zero");
        }
        self.rpc.commitment_config()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(
            config.rpc.commitment_config().unwrap(),
            CommitmentConfig::confirmed()
        );
        assert!(!config.logging.json);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[rpc]
url = "http://127.0.0.1:8899"

[logging]
json = true
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.rpc.url, "http://127.0.0.1:8899");
        assert_eq!(config.rpc.commitment, "confirmed");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert!(config.logging.json);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = NamedTempFile::new().unwrap();
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::from_file("/nonexistent/tx-augment.toml").is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_RPC_URL, "http://localhost:8899"),
            (ENV_COMMITMENT, "finalized"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert_eq!(
            config.rpc.commitment_config().unwrap(),
            CommitmentConfig::finalized()
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.rpc.commitment = "eventually".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.url = "ws://localhost:8900".to_string();
        assert!(config.validate().is_err());
    }
}

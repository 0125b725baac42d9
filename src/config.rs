//! User configuration loaded from `~/.airdrop-tui/config.yaml`
//!
//! A missing file means defaults; a malformed file is an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_LOG_FILE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEVNET_URL, LOCALNET_URL, MAINNET_BETA_URL, TESTNET_URL,
};
use crate::encoding::TransactionEncoding;
use crate::models::Commitment;

const CONFIG_FILE: &str = "config.yaml";

/// Named ledger clusters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

impl Cluster {
    pub fn url(&self) -> &'static str {
        match self {
            Cluster::Devnet => DEVNET_URL,
            Cluster::Testnet => TESTNET_URL,
            Cluster::MainnetBeta => MAINNET_BETA_URL,
            Cluster::Localnet => LOCALNET_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Localnet => "localnet",
        }
    }
}

/// Settings for the in-process wallet provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Whether the provider is injected at all
    pub enabled: bool,
    /// Whether connect requests are approved
    pub approve_connections: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            enabled: true,
            approve_connections: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cluster: Cluster,
    /// Overrides the cluster URL when set
    pub rpc_url: Option<String>,
    pub commitment: Commitment,
    pub transaction_encoding: TransactionEncoding,
    pub request_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub log_file: String,
    pub wallet: WalletConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cluster: Cluster::default(),
            rpc_url: None,
            commitment: Commitment::Confirmed,
            transaction_encoding: TransactionEncoding::Base64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_file: String::from(DEFAULT_LOG_FILE),
            wallet: WalletConfig::default(),
        }
    }
}

impl Config {
    /// Default config location under the home directory
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE)
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if let Some(url) = &self.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("rpc_url must be an http(s) URL, got {url}");
            }
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or_else(|| self.cluster.url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

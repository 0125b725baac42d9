//! Application constants
//!
//! Centralized location for cluster URLs, amounts and timing defaults.

use std::time::Duration;

/// Lamports in one whole SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Fixed faucet request: 2 SOL
pub const AIRDROP_LAMPORTS: u64 = 2 * LAMPORTS_PER_SOL;

/// Fixed transfer to the connected wallet: 2 SOL
pub const TRANSFER_LAMPORTS: u64 = 2 * LAMPORTS_PER_SOL;

/// Public RPC endpoints per cluster
pub const DEVNET_URL: &str = "https://api.devnet.solana.com";
pub const TESTNET_URL: &str = "https://api.testnet.solana.com";
pub const MAINNET_BETA_URL: &str = "https://api.mainnet-beta.solana.com";
pub const LOCALNET_URL: &str = "http://127.0.0.1:8899";

/// How long the freshly created account stays hidden before it is shown
pub const ACCOUNT_REVEAL_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Log file written next to the working directory
pub const DEFAULT_LOG_FILE: &str = "airdrop-tui.log";

/// Config directory name under the user's home
pub const CONFIG_DIR_NAME: &str = ".airdrop-tui";

/// Maximum activity log entries kept in memory
pub const MAX_ACTIVITY: usize = 50;

/// Application name
pub const APP_NAME: &str = "Airdrop TUI";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Airdrop TUI
//!
//! A terminal dashboard for a short devnet session: create a throwaway
//! account, fund it from the faucet, connect a wallet and send the funds on.
//!
//! ## Features
//! - Ed25519 account generation
//! - Confirmed 2 SOL faucet airdrops
//! - Wallet provider detection and connection
//! - Single-instruction transfers with signature confirmation
//! - YAML configuration and file logging
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (State machine)
//! - Network Layer (Tokio runtime)

pub mod constants;
pub mod models;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod transaction;
pub mod config;
pub mod wallet;
pub mod network;
pub mod transfer;
pub mod ui;
pub mod messages;
pub mod app;

// Re-export commonly used types
pub use models::{Address, Commitment, ExternalWalletHandle, Lamports, Signature, TransferReceipt};
pub use error::{ClientError, ParseError, TransferError, WalletError};
pub use keys::{KeyManager, Keypair};
pub use config::Config;
pub use wallet::{LocalWalletProvider, WalletConnector, WalletProvider};
pub use network::{LedgerRpc, NetworkActor, NetworkClient, RpcClient};
pub use transfer::TransferOrchestrator;
pub use messages::{UiEvent, NetworkCommand, NetworkResponse, RenderState};
pub use app::{AppState, AppActor, SessionPhase};

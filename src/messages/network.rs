//! Network messages - communication between App and Network layers

use std::sync::Arc;

use crate::keys::Keypair;
use crate::models::{Address, ExternalWalletHandle, Lamports, Signature, TransferReceipt};
use crate::wallet::WalletEventPayload;

/// Commands sent from App layer to Network layer
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Query the balance of the local account
    RefreshBalance { id: u64, address: Address },
    /// Request the fixed airdrop, wait for confirmation, then refresh the balance
    RequestAirdrop { id: u64, address: Address },
    /// Run the wallet connect handshake
    ConnectWallet { id: u64 },
    /// Run the wallet disconnect handshake
    DisconnectWallet { id: u64 },
    /// Transfer the fixed amount from the local account to `to`
    Transfer {
        id: u64,
        from: Arc<Keypair>,
        to: Address,
    },
    /// Shutdown the network actor
    Shutdown,
}

/// Which flow a failure belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Balance,
    Airdrop,
    Connect,
    Disconnect,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Balance => "Balance Refresh",
            Operation::Airdrop => "Airdrop",
            Operation::Connect => "Wallet Connection",
            Operation::Disconnect => "Wallet Disconnect",
        }
    }
}

/// Responses sent from Network layer to App layer
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    Balance {
        id: u64,
        address: Address,
        lamports: Lamports,
    },
    /// Airdrop confirmed; `balance` is the refreshed local balance if it could be read
    AirdropConfirmed {
        id: u64,
        address: Address,
        signature: Signature,
        balance: Option<Lamports>,
    },
    WalletConnected {
        id: u64,
        wallet: ExternalWalletHandle,
    },
    WalletDisconnected {
        id: u64,
    },
    TransferSucceeded {
        id: u64,
        receipt: TransferReceipt,
        balance: Option<Lamports>,
    },
    TransferFailed {
        id: u64,
        /// The ledger rejected the transaction, most commonly for lack of funds
        insufficient_balance: bool,
        message: String,
    },
    /// Any other failed flow
    Error {
        id: u64,
        operation: Operation,
        message: String,
    },
    /// Unsolicited event from the wallet provider
    WalletEvent(WalletEventPayload),
}

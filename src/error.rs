//! Error taxonomy for wallet, ledger and transfer operations

use thiserror::Error;

use crate::models::Signature;

/// Malformed text or binary input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid encoding: {0}")]
    Encoding(String),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("length {0} does not fit a compact-u16")]
    ShortVecOverflow(usize),
    #[error("input ended unexpectedly")]
    Truncated,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("secret key does not match its public key")]
    KeypairMismatch,
    #[error("{0} accounts do not fit a message")]
    TooManyAccounts(usize),
    #[error("account {0} is not part of the message")]
    MissingAccount(String),
}

/// Failures reported by the injected wallet capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no wallet provider detected")]
    ProviderAbsent,
    #[error("wallet connection rejected: {0}")]
    ConnectRejected(String),
    #[error("wallet is not connected")]
    NotConnected,
    #[error("wallet declined to sign: {0}")]
    SigningRejected(String),
    #[error("unsupported provider request: {0}")]
    Unsupported(String),
}

/// Failures talking to the ledger RPC node
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The node accepted the call but rejected or failed the transaction
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("confirmation of {0} timed out")]
    ConfirmTimeout(Signature),
    #[error("blockhash expired before {0} was confirmed")]
    BlockhashExpired(Signature),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Outcome of a failed transfer, as the UI distinguishes it
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("a transfer is already in flight")]
    InFlight,
    #[error(transparent)]
    Network(ClientError),
}

impl From<ClientError> for TransferError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transaction(reason) => TransferError::InsufficientBalance(reason),
            other => TransferError::Network(other),
        }
    }
}

/// Illegal session transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no local account has been created")]
    NoAccount,
    #[error("no wallet is connected")]
    NoWallet,
}

//! Wallet layer - the injected external wallet capability
//!
//! The provider is never looked up from ambient state: `WalletConnector`
//! receives a lookup function at construction, and absence is a normal
//! outcome of `detect()`.

pub mod local;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::WalletError;
use crate::models::{Address, ExternalWalletHandle, Signature};
use crate::transaction::Transaction;

pub use local::LocalWalletProvider;

/// Events a provider emits to registered handlers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    Connect,
    Disconnect,
    AccountChanged,
}

/// Data delivered with a provider event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEventPayload {
    Connect(Address),
    Disconnect,
    /// `None` when the wallet switched to an account it will not expose
    AccountChanged(Option<Address>),
}

impl WalletEventPayload {
    pub fn kind(&self) -> WalletEvent {
        match self {
            WalletEventPayload::Connect(_) => WalletEvent::Connect,
            WalletEventPayload::Disconnect => WalletEvent::Disconnect,
            WalletEventPayload::AccountChanged(_) => WalletEvent::AccountChanged,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&WalletEventPayload) + Send + Sync>;

/// How a message to sign should be shown to the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayEncoding {
    #[default]
    Utf8,
    Hex,
}

/// Methods reachable through the generic `request` entry point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderMethod {
    Connect,
    Disconnect,
    SignTransaction,
    SignAllTransactions,
    SignMessage,
}

impl ProviderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMethod::Connect => "connect",
            ProviderMethod::Disconnect => "disconnect",
            ProviderMethod::SignTransaction => "signTransaction",
            ProviderMethod::SignAllTransactions => "signAllTransactions",
            ProviderMethod::SignMessage => "signMessage",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Only connect silently if the user approved this app before
    pub only_if_trusted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: Signature,
    pub public_key: Address,
}

/// The capability an injected wallet extension exposes
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn name(&self) -> &str;
    fn public_key(&self) -> Option<Address>;
    fn is_connected(&self) -> bool;
    async fn connect(&self, opts: ConnectOptions) -> Result<Address, WalletError>;
    async fn disconnect(&self) -> Result<(), WalletError>;
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletError>;
    async fn sign_all_transactions(
        &self,
        txs: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, WalletError>;
    async fn sign_message(
        &self,
        message: &[u8],
        display: DisplayEncoding,
    ) -> Result<SignedMessage, WalletError>;
    fn on(&self, event: WalletEvent, handler: EventHandler);
    async fn request(
        &self,
        method: ProviderMethod,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, WalletError>;
}

/// A detected provider
#[derive(Clone)]
pub struct ProviderHandle(Arc<dyn WalletProvider>);

impl ProviderHandle {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.0
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderHandle").field(&self.name()).finish()
    }
}

type ProviderLookup = Arc<dyn Fn() -> Option<Arc<dyn WalletProvider>> + Send + Sync>;

/// Detects the injected provider and performs the connect handshake
#[derive(Clone)]
pub struct WalletConnector {
    lookup: ProviderLookup,
}

impl WalletConnector {
    pub fn new<F>(lookup: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn WalletProvider>> + Send + Sync + 'static,
    {
        WalletConnector {
            lookup: Arc::new(lookup),
        }
    }

    /// A connector for an environment without any wallet
    pub fn absent() -> Self {
        Self::new(|| None)
    }

    /// A connector that always finds `provider`
    pub fn with_provider(provider: Arc<dyn WalletProvider>) -> Self {
        Self::new(move || Some(provider.clone()))
    }

    pub fn detect(&self) -> Option<ProviderHandle> {
        (self.lookup)().map(ProviderHandle)
    }

    pub async fn connect(&self) -> Result<ExternalWalletHandle, WalletError> {
        let handle = self.detect().ok_or(WalletError::ProviderAbsent)?;
        tracing::info!(provider = handle.name(), "Requesting wallet connection");
        match handle.provider().connect(ConnectOptions::default()).await {
            Ok(public_key) => {
                tracing::info!(address = %public_key, "Wallet connected");
                Ok(ExternalWalletHandle {
                    public_key,
                    is_connected: true,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connection failed");
                Err(e)
            }
        }
    }

    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let handle = self.detect().ok_or(WalletError::ProviderAbsent)?;
        handle.provider().disconnect().await?;
        tracing::info!(provider = handle.name(), "Wallet disconnected");
        Ok(())
    }
}

impl fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConnector")
            .field("provider", &self.detect())
            .finish()
    }
}

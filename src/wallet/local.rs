//! In-process wallet provider
//!
//! Plays the part of a browser wallet extension: it owns its own keypair,
//! approves or rejects connection requests by policy, and notifies
//! registered handlers of connect, disconnect and account changes.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::encoding::{encode_base58, TransactionEncoding};
use crate::error::WalletError;
use crate::keys::Keypair;
use crate::models::Address;
use crate::transaction::Transaction;
use crate::wallet::{
    ConnectOptions, DisplayEncoding, EventHandler, ProviderMethod, SignedMessage, WalletEvent,
    WalletEventPayload, WalletProvider,
};

struct LocalState {
    keypair: Keypair,
    connected: bool,
    /// Set once the user approved a connection
    trusted: bool,
    approve_connections: bool,
    handlers: Vec<(WalletEvent, EventHandler)>,
}

pub struct LocalWalletProvider {
    state: Mutex<LocalState>,
}

impl LocalWalletProvider {
    pub const NAME: &'static str = "Local Wallet";

    pub fn new(approve_connections: bool) -> Self {
        Self::with_keypair(Keypair::generate(), approve_connections)
    }

    pub fn with_keypair(keypair: Keypair, approve_connections: bool) -> Self {
        LocalWalletProvider {
            state: Mutex::new(LocalState {
                keypair,
                connected: false,
                trusted: false,
                approve_connections,
                handlers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The wallet's address, whether or not it is exposed yet
    pub fn account(&self) -> Address {
        self.lock().keypair.public_key()
    }

    /// Switch to a freshly generated account, as a user would in the extension
    pub fn switch_account(&self) -> Address {
        let (address, connected) = {
            let mut state = self.lock();
            state.keypair = Keypair::generate();
            (state.keypair.public_key(), state.connected)
        };
        let exposed = connected.then_some(address);
        self.emit(WalletEventPayload::AccountChanged(exposed));
        address
    }

    fn emit(&self, payload: WalletEventPayload) {
        // Handlers run outside the lock so they may call back into the provider
        let handlers: Vec<EventHandler> = self
            .lock()
            .handlers
            .iter()
            .filter(|(event, _)| *event == payload.kind())
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(&payload);
        }
    }

    fn sign_one(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        let state = self.lock();
        if !state.connected {
            return Err(WalletError::NotConnected);
        }
        let key = state.keypair.public_key();
        if !tx.message.signer_keys().contains(&key) {
            return Err(WalletError::SigningRejected(format!(
                "{key} is not a signer of this transaction"
            )));
        }
        tx.sign(&[&state.keypair])
            .map_err(|e| WalletError::SigningRejected(e.to_string()))?;
        Ok(tx)
    }
}

fn tx_param(value: &Value) -> Result<Transaction, WalletError> {
    let text = value
        .as_str()
        .ok_or_else(|| WalletError::SigningRejected("transaction must be a base64 string".into()))?;
    let bytes = TransactionEncoding::Base64
        .decode(text)
        .map_err(|e| WalletError::SigningRejected(e.to_string()))?;
    Transaction::deserialize(&bytes).map_err(|e| WalletError::SigningRejected(e.to_string()))
}

fn tx_value(tx: &Transaction) -> Result<Value, WalletError> {
    let bytes = tx
        .serialize()
        .map_err(|e| WalletError::SigningRejected(e.to_string()))?;
    Ok(Value::String(TransactionEncoding::Base64.encode(&bytes)))
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn public_key(&self) -> Option<Address> {
        let state = self.lock();
        state.connected.then(|| state.keypair.public_key())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn connect(&self, opts: ConnectOptions) -> Result<Address, WalletError> {
        let address = {
            let mut state = self.lock();
            if opts.only_if_trusted && !state.trusted {
                return Err(WalletError::ConnectRejected("app is not trusted yet".into()));
            }
            if !state.approve_connections {
                return Err(WalletError::ConnectRejected("user rejected the request".into()));
            }
            state.connected = true;
            state.trusted = true;
            state.keypair.public_key()
        };
        self.emit(WalletEventPayload::Connect(address));
        Ok(address)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        let was_connected = std::mem::replace(&mut self.lock().connected, false);
        if was_connected {
            self.emit(WalletEventPayload::Disconnect);
        }
        Ok(())
    }

    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletError> {
        self.sign_one(tx)
    }

    async fn sign_all_transactions(
        &self,
        txs: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, WalletError> {
        txs.into_iter().map(|tx| self.sign_one(tx)).collect()
    }

    async fn sign_message(
        &self,
        message: &[u8],
        _display: DisplayEncoding,
    ) -> Result<SignedMessage, WalletError> {
        let state = self.lock();
        if !state.connected {
            return Err(WalletError::NotConnected);
        }
        Ok(SignedMessage {
            signature: state.keypair.sign(message),
            public_key: state.keypair.public_key(),
        })
    }

    fn on(&self, event: WalletEvent, handler: EventHandler) {
        self.lock().handlers.push((event, handler));
    }

    async fn request(&self, method: ProviderMethod, params: Value) -> Result<Value, WalletError> {
        match method {
            ProviderMethod::Connect => {
                let only_if_trusted = params
                    .get("onlyIfTrusted")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let address = self.connect(ConnectOptions { only_if_trusted }).await?;
                Ok(json!({ "publicKey": address.to_string() }))
            }
            ProviderMethod::Disconnect => {
                self.disconnect().await?;
                Ok(Value::Null)
            }
            ProviderMethod::SignTransaction => {
                let tx = tx_param(&params["transaction"])?;
                let signed = self.sign_transaction(tx).await?;
                Ok(json!({ "transaction": tx_value(&signed)? }))
            }
            ProviderMethod::SignAllTransactions => {
                let list = params["transactions"].as_array().ok_or_else(|| {
                    WalletError::SigningRejected("transactions must be an array".into())
                })?;
                let txs = list.iter().map(tx_param).collect::<Result<Vec<_>, _>>()?;
                let signed = self.sign_all_transactions(txs).await?;
                let encoded = signed.iter().map(tx_value).collect::<Result<Vec<_>, _>>()?;
                Ok(json!({ "transactions": encoded }))
            }
            ProviderMethod::SignMessage => {
                let message = params["message"].as_str().ok_or_else(|| {
                    WalletError::SigningRejected("message must be a string".into())
                })?;
                let display = match params["display"].as_str() {
                    Some("hex") => DisplayEncoding::Hex,
                    _ => DisplayEncoding::Utf8,
                };
                let signed = self.sign_message(message.as_bytes(), display).await?;
                Ok(json!({
                    "signature": encode_base58(signed.signature.as_bytes()),
                    "publicKey": signed.public_key.to_string(),
                }))
            }
        }
    }
}

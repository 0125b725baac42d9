//! Ledger access: the RPC seam and the confirmation-aware client on top of it

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{
    AIRDROP_LAMPORTS, DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS,
};
use crate::error::ClientError;
use crate::keys::Keypair;
use crate::models::{
    Address, Commitment, Lamports, LatestBlockhash, Signature, SignatureStatus,
};
use crate::network::client::RpcClient;
use crate::transaction::Transaction;

/// One method per JSON-RPC call the client needs
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn get_balance(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<Lamports, ClientError>;

    async fn request_airdrop(
        &self,
        address: &Address,
        amount: Lamports,
        commitment: Commitment,
    ) -> Result<Signature, ClientError>;

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, ClientError>;

    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, ClientError>;

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, ClientError>;

    async fn send_transaction(
        &self,
        tx: &Transaction,
        preflight: Commitment,
    ) -> Result<Signature, ClientError>;
}

/// Timing and commitment used by `NetworkClient`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientSettings {
    pub commitment: Commitment,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl From<&Config> for ClientSettings {
    fn from(config: &Config) -> Self {
        ClientSettings {
            commitment: config.commitment,
            confirm_timeout: config.confirm_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Balance queries, airdrops and confirmed submission over a `LedgerRpc`
pub struct NetworkClient {
    rpc: Arc<dyn LedgerRpc>,
    settings: ClientSettings,
}

impl NetworkClient {
    pub fn new(rpc: Arc<dyn LedgerRpc>, settings: ClientSettings) -> Self {
        NetworkClient { rpc, settings }
    }

    /// JSON-RPC client for the configured cluster
    pub fn from_config(config: &Config) -> Self {
        let rpc = RpcClient::new(
            config.rpc_url(),
            config.request_timeout(),
            config.transaction_encoding,
        );
        Self::new(Arc::new(rpc), ClientSettings::from(config))
    }

    pub async fn get_balance(&self, address: &Address) -> Result<Lamports, ClientError> {
        let balance = self.rpc.get_balance(address, self.settings.commitment).await?;
        tracing::debug!(address = %address, lamports = balance.0, "Fetched balance");
        Ok(balance)
    }

    /// Ask the faucet for `amount`; the result is pending until confirmed
    pub async fn request_airdrop(
        &self,
        address: &Address,
        amount: Lamports,
    ) -> Result<Signature, ClientError> {
        let signature = self
            .rpc
            .request_airdrop(address, amount, self.settings.commitment)
            .await?;
        tracing::info!(address = %address, lamports = amount.0, signature = %signature, "Airdrop requested");
        Ok(signature)
    }

    /// Request the fixed airdrop and wait for it to confirm
    pub async fn airdrop(&self, address: &Address) -> Result<Signature, ClientError> {
        let signature = self.request_airdrop(address, Lamports(AIRDROP_LAMPORTS)).await?;
        let blockhash = self.latest_blockhash().await?;
        self.confirm(&signature, &blockhash).await?;
        Ok(signature)
    }

    pub async fn latest_blockhash(&self) -> Result<LatestBlockhash, ClientError> {
        self.rpc.get_latest_blockhash(self.settings.commitment).await
    }

    /// Wait until `signature` reaches the configured commitment.
    ///
    /// Fails when the transaction errors, when the chain moves past the
    /// blockhash's last valid height, or when `confirm_timeout` elapses.
    /// A timed-out transaction may still land; it is reported as failed.
    pub async fn confirm(
        &self,
        signature: &Signature,
        blockhash: &LatestBlockhash,
    ) -> Result<(), ClientError> {
        match tokio::time::timeout(
            self.settings.confirm_timeout,
            self.poll_confirmation(signature, blockhash),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(signature = %signature, "Confirmation timed out");
                Err(ClientError::ConfirmTimeout(*signature))
            }
        }
    }

    async fn poll_confirmation(
        &self,
        signature: &Signature,
        blockhash: &LatestBlockhash,
    ) -> Result<(), ClientError> {
        let commitment = self.settings.commitment;
        loop {
            let statuses = self.rpc.get_signature_statuses(&[*signature]).await?;
            if let Some(Some(status)) = statuses.into_iter().next() {
                if let Some(err) = status.err {
                    tracing::warn!(signature = %signature, error = %err, "Transaction failed");
                    return Err(ClientError::Transaction(err));
                }
                if status.satisfies(commitment) {
                    tracing::info!(signature = %signature, slot = status.slot, "Transaction confirmed");
                    return Ok(());
                }
            }

            let height = self.rpc.get_block_height(commitment).await?;
            if height > blockhash.last_valid_block_height {
                tracing::warn!(signature = %signature, height, "Blockhash expired");
                return Err(ClientError::BlockhashExpired(*signature));
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Sign `tx` with `signers` against a fresh blockhash, broadcast it and
    /// wait for confirmation
    pub async fn submit(
        &self,
        mut tx: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature, ClientError> {
        let blockhash = self.latest_blockhash().await?;
        tx.message.recent_blockhash = blockhash.blockhash;
        tx.signatures = vec![Signature::empty(); tx.message.header.num_required_signatures as usize];
        tx.sign(signers)?;
        if !tx.is_fully_signed() {
            return Err(ClientError::Transaction(
                "transaction is missing required signatures".into(),
            ));
        }

        let signature = self.rpc.send_transaction(&tx, self.settings.commitment).await?;
        tracing::info!(signature = %signature, "Transaction sent");
        self.confirm(&signature, &blockhash).await?;
        Ok(signature)
    }
}

//! In-memory ledger used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use airdrop_tui::error::ClientError;
use airdrop_tui::models::{
    Address, Commitment, Lamports, LatestBlockhash, Signature, SignatureStatus,
};
use airdrop_tui::network::{ClientSettings, LedgerRpc, NetworkClient};
use airdrop_tui::transaction::{parse_system_transfer, Transaction};

struct Pending {
    remaining_polls: u32,
    err: Option<String>,
}

struct Inner {
    balances: HashMap<Address, u64>,
    statuses: HashMap<Signature, Pending>,
    blockhashes: Vec<[u8; 32]>,
    block_height: u64,
    next_signature: u64,
    balance_calls: HashMap<Address, usize>,
    status_polls: usize,
    sent: usize,
    /// On-chain error recorded for the next landed transaction
    fail_next: Option<String>,
}

/// Ledger that credits airdrops immediately and reports each signature as
/// processed for `pending_polls` status queries before confirming it
pub struct MemoryLedger {
    inner: Mutex<Inner>,
    pub pending_polls: u32,
    pub never_confirm: bool,
    /// Blocks a blockhash stays valid for
    pub validity: u64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        MemoryLedger {
            inner: Mutex::new(Inner {
                balances: HashMap::new(),
                statuses: HashMap::new(),
                blockhashes: Vec::new(),
                block_height: 100,
                next_signature: 1,
                balance_calls: HashMap::new(),
                status_polls: 0,
                sent: 0,
                fail_next: None,
            }),
            pending_polls: 0,
            never_confirm: false,
            validity: 150,
        }
    }
}

impl MemoryLedger {
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn never_confirming(mut self) -> Self {
        self.never_confirm = true;
        self
    }

    pub fn with_validity(mut self, blocks: u64) -> Self {
        self.validity = blocks;
        self
    }

    /// The next transaction passes preflight and lands, but its status
    /// carries `reason` and no balance moves
    pub fn fail_next_transaction(&self, reason: &str) {
        self.inner.lock().unwrap().fail_next = Some(reason.to_string());
    }

    pub fn balance(&self, address: &Address) -> Lamports {
        Lamports(*self.inner.lock().unwrap().balances.get(address).unwrap_or(&0))
    }

    pub fn balance_calls(&self, address: &Address) -> usize {
        *self.inner.lock().unwrap().balance_calls.get(address).unwrap_or(&0)
    }

    pub fn status_polls(&self) -> usize {
        self.inner.lock().unwrap().status_polls
    }

    pub fn sent(&self) -> usize {
        self.inner.lock().unwrap().sent
    }

    fn fresh_signature(inner: &mut Inner) -> Signature {
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&inner.next_signature.to_le_bytes());
        bytes[63] = 0xAD;
        inner.next_signature += 1;
        Signature::new(bytes)
    }

    fn track(&self, inner: &mut Inner, signature: Signature, err: Option<String>) {
        inner.statuses.insert(
            signature,
            Pending {
                remaining_polls: self.pending_polls,
                err,
            },
        );
    }
}

#[async_trait]
impl LedgerRpc for MemoryLedger {
    async fn get_balance(
        &self,
        address: &Address,
        _commitment: Commitment,
    ) -> Result<Lamports, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        *inner.balance_calls.entry(*address).or_default() += 1;
        Ok(Lamports(*inner.balances.get(address).unwrap_or(&0)))
    }

    async fn request_airdrop(
        &self,
        address: &Address,
        amount: Lamports,
        _commitment: Commitment,
    ) -> Result<Signature, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        *inner.balances.entry(*address).or_default() += amount.0;
        let signature = Self::fresh_signature(&mut inner);
        self.track(&mut inner, signature, None);
        Ok(signature)
    }

    async fn get_latest_blockhash(
        &self,
        _commitment: Commitment,
    ) -> Result<LatestBlockhash, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        let mut blockhash = [0u8; 32];
        blockhash[..8].copy_from_slice(&inner.block_height.to_le_bytes());
        blockhash[31] = 0xB1;
        inner.blockhashes.push(blockhash);
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: inner.block_height + self.validity,
        })
    }

    async fn get_block_height(&self, _commitment: Commitment) -> Result<u64, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        inner.block_height += 1;
        Ok(inner.block_height)
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_polls += 1;
        let never_confirm = self.never_confirm;
        Ok(signatures
            .iter()
            .map(|signature| {
                let pending = inner.statuses.get_mut(signature)?;
                let confirmation = if never_confirm || pending.remaining_polls > 0 {
                    pending.remaining_polls = pending.remaining_polls.saturating_sub(1);
                    Commitment::Processed
                } else {
                    Commitment::Finalized
                };
                Some(SignatureStatus {
                    slot: 1,
                    confirmation: Some(confirmation),
                    err: pending.err.clone(),
                })
            })
            .collect())
    }

    async fn send_transaction(
        &self,
        tx: &Transaction,
        _preflight: Commitment,
    ) -> Result<Signature, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        if !tx.verify() {
            return Err(ClientError::Rpc {
                code: -32003,
                message: "signature verification failed".into(),
            });
        }
        if !inner.blockhashes.contains(&tx.message.recent_blockhash) {
            return Err(ClientError::Transaction("Blockhash not found".into()));
        }

        let mut balances = inner.balances.clone();
        for ix in &tx.message.instructions {
            let Some((from, to, lamports)) = parse_system_transfer(&tx.message, ix) else {
                return Err(ClientError::Transaction("unsupported instruction".into()));
            };
            let available = balances.get(&from).copied().unwrap_or(0);
            if available < lamports.0 {
                return Err(ClientError::Transaction(
                    "Attempt to debit an account but found no record of a prior credit.".into(),
                ));
            }
            balances.insert(from, available - lamports.0);
            *balances.entry(to).or_default() += lamports.0;
        }
        let failure = inner.fail_next.take();
        if failure.is_none() {
            inner.balances = balances;
        }
        inner.sent += 1;

        let signature = tx
            .signature()
            .ok_or_else(|| ClientError::Malformed("unsigned transaction".into()))?;
        self.track(&mut inner, signature, failure);
        Ok(signature)
    }
}

pub fn fast_settings() -> ClientSettings {
    ClientSettings {
        commitment: Commitment::Confirmed,
        confirm_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(5),
    }
}

pub fn client_over(ledger: Arc<MemoryLedger>, settings: ClientSettings) -> Arc<NetworkClient> {
    Arc::new(NetworkClient::new(ledger, settings))
}

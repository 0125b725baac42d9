//! Transfer from the local account to the connected wallet

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::TransferError;
use crate::keys::Keypair;
use crate::models::{Address, Lamports, TransferReceipt};
use crate::network::NetworkClient;
use crate::transaction::{system_transfer, Message, Transaction};

/// Result of a confirmed transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOutcome {
    pub receipt: TransferReceipt,
    /// Local balance refreshed after confirmation, if the query succeeded
    pub balance: Option<Lamports>,
}

/// Builds, submits and confirms single-instruction transfers, one at a time
pub struct TransferOrchestrator {
    client: Arc<NetworkClient>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the transfer settles
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TransferOrchestrator {
    pub fn new(client: Arc<NetworkClient>) -> Self {
        TransferOrchestrator {
            client,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Move `amount` from `from` to `to`. A transaction the ledger rejects
    /// is reported as `InsufficientBalance`; a concurrent call is refused.
    pub async fn transfer(
        &self,
        from: &Keypair,
        to: &Address,
        amount: Lamports,
    ) -> Result<TransferOutcome, TransferError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(to = %to, "Transfer refused: another transfer is in flight");
            return Err(TransferError::InFlight);
        }
        let _guard = FlightGuard(&self.in_flight);

        let source = from.public_key();
        tracing::info!(from = %source, to = %to, lamports = amount.0, "Starting transfer");

        let ix = system_transfer(&source, to, amount);
        // The blockhash is filled in by submit
        let message = Message::new(&[ix], &source, [0u8; 32])
            .map_err(|e| TransferError::Network(e.into()))?;
        let tx = Transaction::new_unsigned(message);

        let signature = match self.client.submit(tx, &[from]).await {
            Ok(signature) => signature,
            Err(e) => {
                let err = TransferError::from(e);
                tracing::warn!(from = %source, error = %err, "Transfer failed");
                return Err(err);
            }
        };

        let balance = match self.client.get_balance(&source).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::warn!(address = %source, error = %e, "Balance refresh after transfer failed");
                None
            }
        };

        tracing::info!(signature = %signature, "Transfer confirmed");
        Ok(TransferOutcome {
            receipt: TransferReceipt {
                signature,
                confirmed: true,
            },
            balance,
        })
    }
}

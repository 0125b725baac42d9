//! Network actor - runs ledger RPC calls and wallet handshakes in the Tokio runtime

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::constants::TRANSFER_LAMPORTS;
use crate::error::TransferError;
use crate::messages::{NetworkCommand, NetworkResponse, Operation};
use crate::models::Lamports;
use crate::network::NetworkClient;
use crate::transfer::TransferOrchestrator;
use crate::wallet::{EventHandler, WalletConnector, WalletEvent, WalletEventPayload};

/// Network actor that executes session commands against the ledger and wallet
pub struct NetworkActor {
    client: Arc<NetworkClient>,
    connector: WalletConnector,
    transfers: Arc<TransferOrchestrator>,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<()>,
}

impl NetworkActor {
    pub fn new(
        client: Arc<NetworkClient>,
        connector: WalletConnector,
        response_tx: mpsc::UnboundedSender<NetworkResponse>,
    ) -> Self {
        let transfers = Arc::new(TransferOrchestrator::new(client.clone()));
        let actor = NetworkActor {
            client,
            connector,
            transfers,
            response_tx,
            active_requests: JoinSet::new(),
        };
        actor.subscribe_wallet_events();
        actor
    }

    /// Forward provider notifications to the App layer
    fn subscribe_wallet_events(&self) {
        let Some(handle) = self.connector.detect() else {
            tracing::info!("No wallet provider detected");
            return;
        };
        tracing::info!(provider = handle.name(), "Wallet provider detected");
        for event in [WalletEvent::Connect, WalletEvent::Disconnect, WalletEvent::AccountChanged] {
            let tx = self.response_tx.clone();
            let handler: EventHandler = Arc::new(move |payload: &WalletEventPayload| {
                let _ = tx.send(NetworkResponse::WalletEvent(payload.clone()));
            });
            handle.provider().on(event, handler);
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                // Handle incoming commands
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Shutdown) | None => {
                            self.active_requests.abort_all();
                            break;
                        }
                        Some(cmd) => self.spawn(cmd),
                    }
                }

                // Clean up completed tasks
                Some(result) = self.active_requests.join_next() => {
                    if let Err(e) = result {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Network task panicked");
                        }
                    }
                }
            }
        }
    }

    fn spawn(&mut self, cmd: NetworkCommand) {
        let response_tx = self.response_tx.clone();
        let client = self.client.clone();

        match cmd {
            NetworkCommand::RefreshBalance { id, address } => {
                self.active_requests.spawn(async move {
                    let response = match client.get_balance(&address).await {
                        Ok(lamports) => NetworkResponse::Balance { id, address, lamports },
                        Err(e) => NetworkResponse::Error {
                            id,
                            operation: Operation::Balance,
                            message: e.to_string(),
                        },
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::RequestAirdrop { id, address } => {
                self.active_requests.spawn(async move {
                    tracing::info!(id, address = %address, "Requesting airdrop");
                    let response = match client.airdrop(&address).await {
                        Ok(signature) => {
                            let balance = match client.get_balance(&address).await {
                                Ok(balance) => Some(balance),
                                Err(e) => {
                                    tracing::warn!(id, error = %e, "Balance refresh after airdrop failed");
                                    None
                                }
                            };
                            tracing::info!(id, signature = %signature, "Airdrop confirmed");
                            NetworkResponse::AirdropConfirmed { id, address, signature, balance }
                        }
                        Err(e) => {
                            tracing::warn!(id, error = %e, "Airdrop failed");
                            NetworkResponse::Error {
                                id,
                                operation: Operation::Airdrop,
                                message: e.to_string(),
                            }
                        }
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::ConnectWallet { id } => {
                let connector = self.connector.clone();
                self.active_requests.spawn(async move {
                    let response = match connector.connect().await {
                        Ok(wallet) => NetworkResponse::WalletConnected { id, wallet },
                        Err(e) => NetworkResponse::Error {
                            id,
                            operation: Operation::Connect,
                            message: e.to_string(),
                        },
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::DisconnectWallet { id } => {
                let connector = self.connector.clone();
                self.active_requests.spawn(async move {
                    let response = match connector.disconnect().await {
                        Ok(()) => NetworkResponse::WalletDisconnected { id },
                        Err(e) => NetworkResponse::Error {
                            id,
                            operation: Operation::Disconnect,
                            message: e.to_string(),
                        },
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::Transfer { id, from, to } => {
                let transfers = self.transfers.clone();
                self.active_requests.spawn(async move {
                    let result = transfers
                        .transfer(&from, &to, Lamports(TRANSFER_LAMPORTS))
                        .await;
                    let response = match result {
                        Ok(outcome) => NetworkResponse::TransferSucceeded {
                            id,
                            receipt: outcome.receipt,
                            balance: outcome.balance,
                        },
                        Err(e) => NetworkResponse::TransferFailed {
                            id,
                            insufficient_balance: matches!(e, TransferError::InsufficientBalance(_)),
                            message: e.to_string(),
                        },
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::Shutdown => {}
        }
    }
}

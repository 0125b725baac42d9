//! Command handlers - business logic for processing UI events and network responses

use tokio::time::Instant;

use crate::app::session::SessionEvent;
use crate::app::state::{ActivityLevel, AppState, Notice};
use crate::constants::TRANSFER_LAMPORTS;
use crate::error::WalletError;
use crate::messages::{NetworkCommand, NetworkResponse, Operation};
use crate::models::{ExternalWalletHandle, Lamports, TransferReceipt};
use crate::wallet::WalletEventPayload;

impl AppState {
    // ========================
    // Account
    // ========================

    /// Replace the local account and start the reveal delay
    pub fn create_account(&mut self) -> Option<NetworkCommand> {
        if !self.can_create() {
            self.log(ActivityLevel::Info, "Wait for the pending operation before creating a new account");
            return None;
        }
        let keypair = self.keys.create();
        let address = keypair.public_key();
        if let Err(e) = self.session.apply(SessionEvent::AccountCreated(address)) {
            tracing::warn!(error = %e, "Account creation rejected");
            return None;
        }
        self.balance = None;
        self.pending.balance = None;
        self.reveal_at = if self.reveal_delay.is_zero() {
            None
        } else {
            Some(Instant::now() + self.reveal_delay)
        };
        self.log(ActivityLevel::Success, format!("Created account {address}"));

        let id = self.next_id();
        self.pending.balance = Some(id);
        Some(NetworkCommand::RefreshBalance { id, address })
    }

    pub fn finish_reveal(&mut self) {
        self.reveal_at = None;
    }

    pub fn refresh_balance(&mut self) -> Option<NetworkCommand> {
        let address = self.keys.address()?;
        let id = self.next_id();
        self.pending.balance = Some(id);
        Some(NetworkCommand::RefreshBalance { id, address })
    }

    // ========================
    // Airdrop
    // ========================

    pub fn request_airdrop(&mut self) -> Option<NetworkCommand> {
        if !self.can_airdrop() {
            return None;
        }
        let address = self.keys.address()?;
        let id = self.next_id();
        self.pending.airdrop = Some(id);
        self.log(ActivityLevel::Info, "Requesting airdrop of 2 SOL...");
        Some(NetworkCommand::RequestAirdrop { id, address })
    }

    // ========================
    // Wallet
    // ========================

    pub fn connect_wallet(&mut self) -> Option<NetworkCommand> {
        if self.provider_name.is_none() {
            let title = format!("{} Failed", Operation::Connect.as_str());
            self.fail(&title, WalletError::ProviderAbsent.to_string());
            return None;
        }
        if !self.can_connect() {
            return None;
        }
        let id = self.next_id();
        self.pending.connect = Some(id);
        self.log(ActivityLevel::Info, "Waiting for wallet approval...");
        Some(NetworkCommand::ConnectWallet { id })
    }

    pub fn disconnect_wallet(&mut self) -> Option<NetworkCommand> {
        if self.session.wallet().is_none() || self.pending.disconnect.is_some() {
            return None;
        }
        if self.pending.transfer.is_some() {
            self.log(ActivityLevel::Info, "Wait for the transfer to settle before disconnecting");
            return None;
        }
        let id = self.next_id();
        self.pending.disconnect = Some(id);
        Some(NetworkCommand::DisconnectWallet { id })
    }

    // ========================
    // Transfer
    // ========================

    /// Start a transfer; refused while another one is in flight
    pub fn transfer(&mut self) -> Option<NetworkCommand> {
        if self.pending.transfer.is_some() {
            self.log(ActivityLevel::Info, "A transfer is already in progress");
            return None;
        }
        if !self.can_transfer() {
            self.log(ActivityLevel::Error, "Create an account and connect a wallet first");
            return None;
        }
        let (Some(from), Some(wallet)) = (self.keys.current(), self.session.wallet()) else {
            return None;
        };
        let id = self.next_id();
        self.pending.transfer = Some(id);
        self.log(
            ActivityLevel::Info,
            format!("Transferring {} to {}...", Lamports(TRANSFER_LAMPORTS), wallet.public_key),
        );
        Some(NetworkCommand::Transfer {
            id,
            from,
            to: wallet.public_key,
        })
    }

    // ========================
    // Popups & scrolling
    // ========================

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }

    pub fn scroll_up(&mut self) {
        self.activity_scroll = self.activity_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.activity_scroll = self.activity_scroll.saturating_add(1);
    }

    fn fail(&mut self, title: &str, message: String) {
        self.log(ActivityLevel::Error, format!("{title}: {message}"));
        self.notice = Some(Notice {
            is_error: true,
            title: title.to_string(),
            body: message.clone(),
        });
        self.last_error = Some(message);
    }

    // ========================
    // Network responses
    // ========================

    pub fn handle_response(&mut self, response: NetworkResponse) {
        match response {
            NetworkResponse::Balance { id, address, lamports } => {
                if self.pending.balance == Some(id) {
                    self.pending.balance = None;
                }
                if self.keys.address() == Some(address) {
                    self.balance = Some(lamports);
                } else {
                    tracing::debug!(id, address = %address, "Ignoring balance of a replaced account");
                }
            }

            NetworkResponse::AirdropConfirmed { id, address, signature, balance } => {
                if self.pending.airdrop != Some(id) {
                    return;
                }
                self.pending.airdrop = None;
                if self.keys.address() != Some(address) {
                    return;
                }
                if let Err(e) = self.session.apply(SessionEvent::AirdropConfirmed) {
                    tracing::warn!(error = %e, "Airdrop confirmation rejected");
                    return;
                }
                if balance.is_some() {
                    self.balance = balance;
                }
                self.last_error = None;
                self.log(ActivityLevel::Success, format!("Airdrop confirmed: {signature}"));
            }

            NetworkResponse::WalletConnected { id, wallet } => {
                if self.pending.connect != Some(id) {
                    return;
                }
                self.pending.connect = None;
                self.on_wallet_connected(wallet);
            }

            NetworkResponse::WalletDisconnected { id } => {
                if self.pending.disconnect == Some(id) {
                    self.pending.disconnect = None;
                }
                self.on_wallet_disconnected();
            }

            NetworkResponse::TransferSucceeded { id, receipt, balance } => {
                if self.pending.transfer != Some(id) {
                    return;
                }
                self.pending.transfer = None;
                self.on_transfer_succeeded(receipt, balance);
                self.replay_wallet_event();
            }

            NetworkResponse::TransferFailed { id, insufficient_balance, message } => {
                if self.pending.transfer != Some(id) {
                    return;
                }
                self.pending.transfer = None;
                self.on_transfer_failed(insufficient_balance, message);
                self.replay_wallet_event();
            }

            NetworkResponse::Error { id, operation, message } => {
                let slot = match operation {
                    Operation::Balance => &mut self.pending.balance,
                    Operation::Airdrop => &mut self.pending.airdrop,
                    Operation::Connect => &mut self.pending.connect,
                    Operation::Disconnect => &mut self.pending.disconnect,
                };
                if *slot != Some(id) {
                    return;
                }
                *slot = None;
                let title = format!("{} Failed", operation.as_str());
                self.fail(&title, message);
            }

            NetworkResponse::WalletEvent(payload) => self.handle_wallet_event(payload),
        }
    }

    fn on_transfer_succeeded(&mut self, receipt: TransferReceipt, balance: Option<Lamports>) {
        if let Err(e) = self.session.apply(SessionEvent::TransferSucceeded(receipt)) {
            tracing::warn!(error = %e, signature = %receipt.signature, "Transfer result rejected by session");
        }
        if balance.is_some() {
            self.balance = balance;
        }
        self.last_error = None;
        self.log(ActivityLevel::Success, format!("Transfer confirmed: {}", receipt.signature));
        self.notice = Some(Notice {
            is_error: false,
            title: "Transfer Successful".to_string(),
            body: format!("Signature: {}", receipt.signature),
        });
    }

    fn on_transfer_failed(&mut self, insufficient_balance: bool, message: String) {
        if let Err(e) = self.session.apply(SessionEvent::TransferFailed) {
            tracing::warn!(error = %e, "Transfer result rejected by session");
        }
        if insufficient_balance {
            self.log(ActivityLevel::Error, format!("Insufficient balance: {message}"));
            self.notice = Some(Notice {
                is_error: true,
                title: "Insufficient Balance".to_string(),
                body: "Airdrop more SOL to the account".to_string(),
            });
            self.last_error = Some(message);
        } else {
            self.fail("Transfer Failed", message);
        }
    }

    /// Apply the wallet change that arrived while a transfer was in flight
    fn replay_wallet_event(&mut self) {
        if let Some(payload) = self.deferred_wallet_event.take() {
            self.handle_wallet_event(payload);
        }
    }

    fn on_wallet_connected(&mut self, wallet: ExternalWalletHandle) {
        // The provider's connect event and the handshake result both land here
        if self.session.wallet() == Some(wallet) {
            return;
        }
        match self.session.apply(SessionEvent::WalletConnected(wallet)) {
            Ok(_) => {
                self.last_error = None;
                self.log(ActivityLevel::Success, format!("Wallet connected: {}", wallet.public_key));
            }
            Err(e) => tracing::warn!(error = %e, "Wallet connection rejected by session"),
        }
    }

    fn on_wallet_disconnected(&mut self) {
        if self.session.wallet().is_none() {
            return;
        }
        match self.session.apply(SessionEvent::WalletDisconnected) {
            Ok(_) => self.log(ActivityLevel::Info, "Wallet disconnected"),
            Err(e) => tracing::warn!(error = %e, "Wallet disconnect rejected by session"),
        }
    }

    fn handle_wallet_event(&mut self, payload: WalletEventPayload) {
        // The transfer keeps its recipient until it settles
        if self.pending.transfer.is_some() && !matches!(payload, WalletEventPayload::Connect(_)) {
            tracing::info!(event = ?payload.kind(), "Deferring wallet event until the transfer settles");
            self.deferred_wallet_event = Some(payload);
            return;
        }
        match payload {
            // Connections started elsewhere are picked up only while we have an account
            WalletEventPayload::Connect(address) => {
                if self.session.wallet().is_none() && self.session.account().is_some() {
                    self.on_wallet_connected(ExternalWalletHandle {
                        public_key: address,
                        is_connected: true,
                    });
                }
            }
            WalletEventPayload::Disconnect => self.on_wallet_disconnected(),
            WalletEventPayload::AccountChanged(Some(address)) => {
                if let Some(current) = self.session.wallet() {
                    if current.public_key != address {
                        let switched = ExternalWalletHandle {
                            public_key: address,
                            is_connected: true,
                        };
                        match self.session.apply(SessionEvent::WalletConnected(switched)) {
                            Ok(_) => self.log(ActivityLevel::Info, format!("Wallet switched to {address}")),
                            Err(e) => tracing::warn!(error = %e, "Wallet switch rejected by session"),
                        }
                    }
                }
            }
            WalletEventPayload::AccountChanged(None) => self.on_wallet_disconnected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::SessionPhase;
    use crate::models::{Address, Signature};
    use std::time::Duration;

    fn state() -> AppState {
        let mut state = AppState::new(&crate::config::Config::default(), Some("Test Wallet".into()));
        state.reveal_delay = Duration::ZERO;
        state
    }

    fn wallet() -> ExternalWalletHandle {
        ExternalWalletHandle {
            public_key: Address::new([9u8; 32]),
            is_connected: true,
        }
    }

    fn connected_state() -> AppState {
        let mut s = state();
        s.create_account().unwrap();
        let Some(NetworkCommand::ConnectWallet { id }) = s.connect_wallet() else {
            panic!("expected connect command");
        };
        s.handle_response(NetworkResponse::WalletConnected { id, wallet: wallet() });
        s
    }

    #[test]
    fn test_create_account_requests_balance() {
        let mut s = state();
        let cmd = s.create_account().unwrap();
        let address = s.keys.address().unwrap();
        assert!(matches!(cmd, NetworkCommand::RefreshBalance { address: a, .. } if a == address));
        assert_eq!(s.session.phase(), SessionPhase::Fundable);
        assert!(s.account_visible());
    }

    #[test]
    fn test_reveal_delay_hides_account() {
        let mut s = state();
        s.reveal_delay = Duration::from_secs(1);
        s.create_account().unwrap();
        assert!(!s.account_visible());
        assert!(s.request_airdrop().is_none());
        s.finish_reveal();
        assert!(s.request_airdrop().is_some());
    }

    #[test]
    fn test_stale_balance_ignored_after_recreate() {
        let mut s = state();
        let Some(NetworkCommand::RefreshBalance { id, address: first }) = s.create_account() else {
            panic!("expected balance refresh");
        };
        s.create_account().unwrap();
        s.handle_response(NetworkResponse::Balance { id, address: first, lamports: Lamports(5) });
        assert_eq!(s.balance, None);
        assert_ne!(s.keys.address(), Some(first));
    }

    #[test]
    fn test_airdrop_funds_only_on_confirmation() {
        let mut s = state();
        s.create_account().unwrap();
        let Some(NetworkCommand::RequestAirdrop { id, address }) = s.request_airdrop() else {
            panic!("expected airdrop command");
        };
        assert_eq!(s.session.phase(), SessionPhase::Fundable);
        // A second request while the first is pending is ignored
        assert!(s.request_airdrop().is_none());

        s.handle_response(NetworkResponse::AirdropConfirmed {
            id,
            address,
            signature: Signature::new([2u8; 64]),
            balance: Some(Lamports::from_sol(2)),
        });
        assert_eq!(s.session.phase(), SessionPhase::Funded);
        assert_eq!(s.balance, Some(Lamports::from_sol(2)));
    }

    #[test]
    fn test_connect_without_provider_not_offered() {
        let mut s = AppState::new(&crate::config::Config::default(), None);
        s.reveal_delay = Duration::ZERO;
        s.create_account().unwrap();
        assert!(!s.can_connect());
        assert!(s.connect_wallet().is_none());
        assert_eq!(s.last_error.as_deref(), Some("no wallet provider detected"));
    }

    #[test]
    fn test_connect_rejection_surfaces_notice() {
        let mut s = state();
        s.create_account().unwrap();
        let Some(NetworkCommand::ConnectWallet { id }) = s.connect_wallet() else {
            panic!("expected connect command");
        };
        s.handle_response(NetworkResponse::Error {
            id,
            operation: Operation::Connect,
            message: "user rejected the request".into(),
        });
        assert_eq!(s.session.phase(), SessionPhase::Fundable);
        assert!(s.notice.as_ref().unwrap().is_error);
        assert_eq!(s.notice.as_ref().unwrap().title, "Wallet Connection Failed");
        assert!(s.to_render_state().last_error);
        assert!(s.can_connect());
    }

    #[test]
    fn test_transfer_is_single_flight() {
        let mut s = connected_state();
        assert!(s.transfer().is_some());
        assert!(s.transfer().is_none());
        assert!(s.to_render_state().transfer_pending);
    }

    #[test]
    fn test_insufficient_balance_outcome() {
        let mut s = connected_state();
        let Some(NetworkCommand::Transfer { id, .. }) = s.transfer() else {
            panic!("expected transfer command");
        };
        s.handle_response(NetworkResponse::TransferFailed {
            id,
            insufficient_balance: true,
            message: "no funds".into(),
        });
        assert_eq!(s.session.phase(), SessionPhase::TransferFailed);
        assert_eq!(s.notice.as_ref().unwrap().title, "Insufficient Balance");
        assert_eq!(s.to_render_state().last_transfer_signature, None);
        // Retry is allowed
        assert!(s.transfer().is_some());
    }

    #[test]
    fn test_transfer_success_records_receipt() {
        let mut s = connected_state();
        let Some(NetworkCommand::Transfer { id, to, .. }) = s.transfer() else {
            panic!("expected transfer command");
        };
        assert_eq!(to, wallet().public_key);
        let receipt = TransferReceipt {
            signature: Signature::new([4u8; 64]),
            confirmed: true,
        };
        s.handle_response(NetworkResponse::TransferSucceeded {
            id,
            receipt,
            balance: Some(Lamports::ZERO),
        });
        let render = s.to_render_state();
        assert_eq!(render.phase, SessionPhase::Transferred);
        assert_eq!(render.last_transfer_signature, Some(receipt.signature));
        assert_eq!(render.local_balance, Some(Lamports::ZERO));
        assert!(!render.last_error);
    }

    #[test]
    fn test_provider_disconnect_event() {
        let mut s = connected_state();
        s.handle_response(NetworkResponse::WalletEvent(WalletEventPayload::Disconnect));
        assert_eq!(s.session.phase(), SessionPhase::Fundable);
        assert!(s.transfer().is_none());
    }

    fn transfer_receipt() -> TransferReceipt {
        TransferReceipt {
            signature: Signature::new([6u8; 64]),
            confirmed: true,
        }
    }

    #[test]
    fn test_disconnect_refused_while_transfer_pending() {
        let mut s = connected_state();
        let Some(NetworkCommand::Transfer { id, .. }) = s.transfer() else {
            panic!("expected transfer command");
        };
        assert!(s.disconnect_wallet().is_none());

        s.handle_response(NetworkResponse::TransferSucceeded {
            id,
            receipt: transfer_receipt(),
            balance: Some(Lamports::ZERO),
        });
        let render = s.to_render_state();
        assert_eq!(render.phase, SessionPhase::Transferred);
        assert_eq!(render.last_transfer_signature, Some(transfer_receipt().signature));
        assert_eq!(render.local_balance, Some(Lamports::ZERO));
        assert_eq!(render.notice.unwrap().title, "Transfer Successful");

        // Once settled the wallet can be disconnected again
        assert!(matches!(s.disconnect_wallet(), Some(NetworkCommand::DisconnectWallet { .. })));
    }

    #[test]
    fn test_provider_disconnect_applied_after_transfer_settles() {
        let mut s = connected_state();
        let Some(NetworkCommand::Transfer { id, .. }) = s.transfer() else {
            panic!("expected transfer command");
        };
        s.handle_response(NetworkResponse::WalletEvent(WalletEventPayload::Disconnect));
        assert_eq!(s.session.phase(), SessionPhase::Connected);

        s.handle_response(NetworkResponse::TransferSucceeded {
            id,
            receipt: transfer_receipt(),
            balance: Some(Lamports::ZERO),
        });
        let render = s.to_render_state();
        assert!(!render.has_connected_wallet);
        assert_eq!(render.phase, SessionPhase::Fundable);
        assert_eq!(render.last_transfer_signature, Some(transfer_receipt().signature));
        assert_eq!(render.local_balance, Some(Lamports::ZERO));
        assert_eq!(render.notice.unwrap().title, "Transfer Successful");
    }

    #[test]
    fn test_transfer_waits_for_reveal() {
        let mut s = connected_state();
        s.reveal_delay = Duration::from_secs(1);
        s.create_account().unwrap();
        assert!(s.session.can_transfer());
        assert!(!s.can_transfer());
        assert!(s.transfer().is_none());

        s.finish_reveal();
        assert!(s.transfer().is_some());
    }
}

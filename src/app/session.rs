//! Session lifecycle - which account exists, whether it is funded, which
//! wallet is connected and how the last transfer ended

use crate::error::SessionError;
use crate::models::{Address, ExternalWalletHandle, TransferReceipt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Empty,
    Fundable,
    Funded,
    Connected,
    Transferred,
    TransferFailed,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Empty => "No account",
            SessionPhase::Fundable => "Awaiting airdrop",
            SessionPhase::Funded => "Funded",
            SessionPhase::Connected => "Wallet connected",
            SessionPhase::Transferred => "Transferred",
            SessionPhase::TransferFailed => "Transfer failed",
        }
    }
}

/// Completed operations that move the session forward
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    AccountCreated(Address),
    AirdropConfirmed,
    WalletConnected(ExternalWalletHandle),
    WalletDisconnected,
    TransferSucceeded(TransferReceipt),
    TransferFailed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    phase: SessionPhase,
    account: Option<Address>,
    wallet: Option<ExternalWalletHandle>,
    funded: bool,
    last_receipt: Option<TransferReceipt>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn wallet(&self) -> Option<ExternalWalletHandle> {
        self.wallet
    }

    pub fn is_funded(&self) -> bool {
        self.funded
    }

    pub fn last_receipt(&self) -> Option<TransferReceipt> {
        self.last_receipt
    }

    pub fn can_request_airdrop(&self) -> bool {
        self.account.is_some()
    }

    pub fn can_connect(&self) -> bool {
        self.account.is_some() && self.wallet.is_none()
    }

    /// A transfer needs both a local account and a connected wallet
    pub fn can_transfer(&self) -> bool {
        self.account.is_some() && self.wallet.is_some()
    }

    /// Phase implied by the account, funding and wallet facts alone
    fn resting_phase(&self) -> SessionPhase {
        match (self.account, self.wallet, self.funded) {
            (None, _, _) => SessionPhase::Empty,
            (Some(_), Some(_), _) => SessionPhase::Connected,
            (Some(_), None, true) => SessionPhase::Funded,
            (Some(_), None, false) => SessionPhase::Fundable,
        }
    }

    /// Apply an event. Illegal events leave the state untouched.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, SessionError> {
        match event {
            SessionEvent::AccountCreated(address) => {
                self.account = Some(address);
                self.funded = false;
                self.last_receipt = None;
                self.phase = self.resting_phase();
            }
            SessionEvent::AirdropConfirmed => {
                if self.account.is_none() {
                    return Err(SessionError::NoAccount);
                }
                self.funded = true;
                self.phase = self.resting_phase();
            }
            SessionEvent::WalletConnected(handle) => {
                if self.account.is_none() {
                    return Err(SessionError::NoAccount);
                }
                self.wallet = Some(handle);
                self.phase = self.resting_phase();
            }
            SessionEvent::WalletDisconnected => {
                self.wallet = None;
                self.phase = self.resting_phase();
            }
            SessionEvent::TransferSucceeded(receipt) => {
                self.require_transfer_ready()?;
                self.funded = false;
                self.last_receipt = Some(receipt);
                self.phase = SessionPhase::Transferred;
            }
            SessionEvent::TransferFailed => {
                self.require_transfer_ready()?;
                self.last_receipt = None;
                self.phase = SessionPhase::TransferFailed;
            }
        }
        tracing::debug!(phase = ?self.phase, "Session transition");
        Ok(self.phase)
    }

    fn require_transfer_ready(&self) -> Result<(), SessionError> {
        if self.account.is_none() {
            return Err(SessionError::NoAccount);
        }
        if self.wallet.is_none() {
            return Err(SessionError::NoWallet);
        }
        Ok(())
    }
}

//! App state - pure data structure with no I/O logic

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::app::session::SessionState;
use crate::config::Config;
use crate::constants::{ACCOUNT_REVEAL_DELAY, MAX_ACTIVITY};
use crate::keys::KeyManager;
use crate::messages::RenderState;
use crate::models::Lamports;
use crate::wallet::WalletEventPayload;

/// Severity of an activity log line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Success,
    Error,
}

/// A line in the activity log
#[derive(Clone, Debug)]
pub struct ActivityEntry {
    pub level: ActivityLevel,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

/// Modal shown after a transfer or a failed operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub is_error: bool,
    pub title: String,
    pub body: String,
}

/// Request ids of operations waiting on the network layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingOps {
    pub balance: Option<u64>,
    pub airdrop: Option<u64>,
    pub connect: Option<u64>,
    pub disconnect: Option<u64>,
    pub transfer: Option<u64>,
}

/// Main application state - pure data, no I/O
pub struct AppState {
    // Cluster
    pub cluster: String,
    pub rpc_url: String,

    // Session
    pub keys: KeyManager,
    pub session: SessionState,
    pub balance: Option<Lamports>,
    pub provider_name: Option<String>,
    /// Provider disconnect or switch held back while a transfer is in flight
    pub deferred_wallet_event: Option<WalletEventPayload>,
    /// The account card is revealed once this passes
    pub reveal_at: Option<Instant>,
    pub reveal_delay: Duration,

    // Requests
    pub next_request_id: u64,
    pub pending: PendingOps,

    // Errors
    pub last_error: Option<String>,

    // Activity log
    pub activity: VecDeque<ActivityEntry>,
    pub activity_scroll: u16,

    // Popups
    pub notice: Option<Notice>,
    pub show_help: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&Config::default(), None)
    }
}

impl AppState {
    pub fn new(config: &Config, provider_name: Option<String>) -> Self {
        AppState {
            cluster: config.cluster.as_str().to_string(),
            rpc_url: config.rpc_url().to_string(),
            keys: KeyManager::new(),
            session: SessionState::new(),
            balance: None,
            provider_name,
            deferred_wallet_event: None,
            reveal_at: None,
            reveal_delay: ACCOUNT_REVEAL_DELAY,
            next_request_id: 1,
            pending: PendingOps::default(),
            last_error: None,
            activity: VecDeque::with_capacity(MAX_ACTIVITY),
            activity_scroll: 0,
            notice: None,
            show_help: false,
        }
    }

    /// Generate a unique request ID
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub fn log(&mut self, level: ActivityLevel, content: impl Into<String>) {
        if self.activity.len() >= MAX_ACTIVITY {
            self.activity.pop_back();
        }
        self.activity.push_front(ActivityEntry {
            level,
            content: content.into(),
            timestamp: chrono::Local::now(),
        });
    }

    pub fn account_visible(&self) -> bool {
        self.session.account().is_some() && self.reveal_at.is_none()
    }

    pub fn can_create(&self) -> bool {
        self.pending.airdrop.is_none() && self.pending.transfer.is_none()
    }

    pub fn can_airdrop(&self) -> bool {
        self.account_visible() && self.session.can_request_airdrop() && self.pending.airdrop.is_none()
    }

    pub fn can_connect(&self) -> bool {
        self.provider_name.is_some()
            && self.account_visible()
            && self.session.can_connect()
            && self.pending.connect.is_none()
    }

    pub fn can_transfer(&self) -> bool {
        self.account_visible()
            && self.session.can_transfer()
            && self.pending.transfer.is_none()
            && self.pending.disconnect.is_none()
    }

    /// Convert state to RenderState for UI
    pub fn to_render_state(&self) -> RenderState {
        let wallet = self.session.wallet();
        RenderState {
            cluster: self.cluster.clone(),
            rpc_url: self.rpc_url.clone(),
            phase: self.session.phase(),
            has_local_account: self.session.account().is_some(),
            account_visible: self.account_visible(),
            local_address: self.session.account(),
            local_balance: self.balance,
            provider_name: self.provider_name.clone(),
            has_connected_wallet: wallet.is_some(),
            connected_address: wallet.map(|w| w.public_key),
            last_transfer_signature: self.session.last_receipt().map(|r| r.signature),
            last_error: self.last_error.is_some(),
            last_error_message: self.last_error.clone(),
            airdrop_pending: self.pending.airdrop.is_some(),
            connect_pending: self.pending.connect.is_some(),
            transfer_pending: self.pending.transfer.is_some(),
            can_create: self.can_create(),
            can_airdrop: self.can_airdrop(),
            can_connect: self.can_connect(),
            can_transfer: self.can_transfer(),
            activity: self.activity.iter().cloned().collect(),
            activity_scroll: self.activity_scroll,
            notice: self.notice.clone(),
            show_help: self.show_help,
        }
    }
}

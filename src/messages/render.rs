//! Render state - data structure sent from App layer to UI for rendering

use crate::app::session::SessionPhase;
use crate::app::state::{ActivityEntry, Notice};
use crate::models::{Address, Lamports, Signature};

/// Complete state needed by the UI to render
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    // Cluster
    pub cluster: String,
    pub rpc_url: String,

    // Session
    pub phase: SessionPhase,
    pub has_local_account: bool,
    /// Account card stays hidden during the reveal delay after creation
    pub account_visible: bool,
    pub local_address: Option<Address>,
    pub local_balance: Option<Lamports>,
    pub provider_name: Option<String>,
    pub has_connected_wallet: bool,
    pub connected_address: Option<Address>,
    pub last_transfer_signature: Option<Signature>,
    pub last_error: bool,
    pub last_error_message: Option<String>,

    // In-flight operations
    pub airdrop_pending: bool,
    pub connect_pending: bool,
    pub transfer_pending: bool,

    // Which commands are currently offered
    pub can_create: bool,
    pub can_airdrop: bool,
    pub can_connect: bool,
    pub can_transfer: bool,

    // Activity log
    pub activity: Vec<ActivityEntry>,
    pub activity_scroll: u16,

    // Popups
    pub notice: Option<Notice>,
    pub show_help: bool,
}

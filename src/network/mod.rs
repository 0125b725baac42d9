//! Network layer - ledger RPC access and the network actor
//!
//! The Network actor receives commands from the App layer, runs each flow on
//! the Tokio runtime and sends back exactly one response per command.

pub mod actor;
pub mod client;
pub mod ledger;

pub use actor::NetworkActor;
pub use client::RpcClient;
pub use ledger::{ClientSettings, LedgerRpc, NetworkClient};

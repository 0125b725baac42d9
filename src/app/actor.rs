//! App actor - message loop processing UI events and network responses

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::app::state::AppState;
use crate::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};

/// App actor that processes UI events and network responses
pub struct AppActor {
    state: AppState,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    render_tx: mpsc::UnboundedSender<RenderState>,
}

impl AppActor {
    pub fn new(
        network_tx: mpsc::UnboundedSender<NetworkCommand>,
        render_tx: mpsc::UnboundedSender<RenderState>,
        state: AppState,
    ) -> Self {
        AppActor {
            state,
            network_tx,
            render_tx,
        }
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        // Send initial render state
        let _ = self.render_tx.send(self.state.to_render_state());

        loop {
            let reveal_at = self.state.reveal_at;
            tokio::select! {
                Some(event) = ui_rx.recv() => {
                    if self.handle_ui_event(event) {
                        // Quit signal received
                        let _ = self.network_tx.send(NetworkCommand::Shutdown);
                        break;
                    }
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                Some(response) = net_rx.recv() => {
                    self.state.handle_response(response);
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                _ = sleep_until(reveal_at.unwrap_or_else(Instant::now)), if reveal_at.is_some() => {
                    self.state.finish_reveal();
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                else => break,
            }
        }
    }

    fn send(&self, command: Option<NetworkCommand>) {
        if let Some(cmd) = command {
            let _ = self.network_tx.send(cmd);
        }
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            // Session commands
            UiEvent::CreateAccount => {
                let cmd = self.state.create_account();
                self.send(cmd);
            }
            UiEvent::RequestAirdrop => {
                let cmd = self.state.request_airdrop();
                self.send(cmd);
            }
            UiEvent::ConnectWallet => {
                let cmd = self.state.connect_wallet();
                self.send(cmd);
            }
            UiEvent::DisconnectWallet => {
                let cmd = self.state.disconnect_wallet();
                self.send(cmd);
            }
            UiEvent::Transfer => {
                let cmd = self.state.transfer();
                self.send(cmd);
            }
            UiEvent::RefreshBalance => {
                let cmd = self.state.refresh_balance();
                self.send(cmd);
            }

            // Activity log
            UiEvent::ScrollUp => self.state.scroll_up(),
            UiEvent::ScrollDown => self.state.scroll_down(),

            // Popups
            UiEvent::DismissNotice => self.state.dismiss_notice(),
            UiEvent::ToggleHelp => self.state.toggle_help(),
            UiEvent::CloseHelp => self.state.close_help(),

            // System
            UiEvent::Quit => return true,
        }

        false
    }
}

//! Airdrop TUI - Actor-based devnet session dashboard
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - central state machine processing events
//! - Network Layer (Tokio) - async ledger RPC and wallet handshakes

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use airdrop_tui::app::{AppActor, AppState};
use airdrop_tui::config::Config;
use airdrop_tui::constants::{APP_NAME, APP_VERSION};
use airdrop_tui::messages::ui_events::key_to_ui_event;
use airdrop_tui::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
use airdrop_tui::network::{NetworkActor, NetworkClient};
use airdrop_tui::ui::{
    activity_color, field_line, format_balance, phase_color, render_action, render_card,
    short_address,
};
use airdrop_tui::wallet::{LocalWalletProvider, WalletConnector, WalletProvider};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    // Initialize logging to file
    let file_appender = tracing_appender::rolling::never(".", &config.log_file);
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    tracing::info!(cluster = config.cluster.as_str(), rpc_url = config.rpc_url(), "Starting {APP_NAME} v{APP_VERSION}");

    // First run leaves an editable copy of the defaults behind
    let config_path = Config::default_path();
    if !config_path.exists() {
        match config.save_to(&config_path) {
            Ok(()) => tracing::info!(path = %config_path.display(), "Wrote default config"),
            Err(e) => tracing::warn!(path = %config_path.display(), "Could not write default config: {e:#}"),
        }
    }

    // Ledger client and wallet provider
    let client = Arc::new(NetworkClient::from_config(&config));
    let connector = if config.wallet.enabled {
        let provider: Arc<dyn WalletProvider> =
            Arc::new(LocalWalletProvider::new(config.wallet.approve_connections));
        WalletConnector::with_provider(provider)
    } else {
        WalletConnector::absent()
    };
    let provider_name = connector.detect().map(|handle| handle.name().to_string());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channels
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (net_cmd_tx, net_cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
    let (net_resp_tx, net_resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    // Spawn network actor
    let network_actor = NetworkActor::new(client, connector, net_resp_tx);
    tokio::spawn(network_actor.run(net_cmd_rx));

    // Spawn app actor
    let app_actor = AppActor::new(net_cmd_tx, render_tx, AppState::new(&config, provider_name));
    tokio::spawn(app_actor.run(ui_rx, net_resp_rx));

    // Run UI loop (synchronous with async polling)
    run_ui_loop(&mut terminal, ui_tx, &mut render_rx).await?;

    tracing::info!("Shutting down");
    Ok(())
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        // Draw with current state
        terminal.draw(|f| draw_ui(f, &current_state))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) = key_to_ui_event(
                    key,
                    current_state.show_help,
                    current_state.notice.is_some(),
                ) {
                    let _ = ui_tx.send(event);
                    if event == UiEvent::Quit {
                        break;
                    }
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState) {
    let area = f.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Action bar
        ])
        .split(area);

    draw_title_bar(f, state, main_chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_chunks[1]);

    let cards = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Local account
            Constraint::Length(5), // Wallet
            Constraint::Min(4),    // Transfer
        ])
        .split(columns[0]);

    draw_account_card(f, state, cards[0]);
    draw_wallet_card(f, state, cards[1]);
    draw_transfer_card(f, state, cards[2]);
    draw_activity(f, state, columns[1]);
    draw_action_bar(f, state, main_chunks[2]);

    // Popups
    if let Some(notice) = &state.notice {
        draw_notice_popup(f, notice, area);
    }

    if state.show_help {
        draw_help_popup(f, area);
    }
}

fn draw_title_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let spans = vec![
        Span::styled(
            format!(" {APP_NAME} v{APP_VERSION} "),
            Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
        ),
        Span::raw(" "),
        Span::styled(format!("{} ", state.cluster), Style::default().fg(Color::Yellow)),
        Span::styled(state.rpc_url.as_str(), Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", state.phase.label()),
            Style::default().fg(phase_color(state.phase)).bold(),
        ),
    ];

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_account_card(f: &mut Frame, state: &RenderState, area: Rect) {
    let lines = match state.local_address {
        None => vec![Line::from(Span::styled(
            "No account yet. Press 'n' to create one.",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(_) if !state.account_visible => vec![Line::from(Span::styled(
            "Generating account...",
            Style::default().fg(Color::Yellow),
        ))],
        Some(address) => {
            let airdrop = if state.airdrop_pending {
                "requesting 2 SOL..."
            } else if state.can_airdrop {
                "press 'a' for 2 SOL"
            } else {
                ""
            };
            vec![
                field_line("Address", short_address(&address, area.width), Color::White),
                field_line("Balance", format_balance(state.local_balance), Color::Green),
                field_line("Airdrop", airdrop, Color::Yellow),
            ]
        }
    };

    f.render_widget(render_card(" Local Account ", lines, state.account_visible), area);
}

fn draw_wallet_card(f: &mut Frame, state: &RenderState, area: Rect) {
    let lines = match (&state.provider_name, state.connected_address) {
        (None, _) => vec![
            Line::from(Span::styled("No wallet detected.", Style::default().fg(Color::Red))),
            Line::from(Span::styled(
                "Install a wallet extension to receive transfers.",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        (Some(name), Some(address)) => vec![
            field_line("Provider", name.as_str(), Color::White),
            field_line("Address", short_address(&address, area.width), Color::Cyan),
        ],
        (Some(name), None) => {
            let hint = if state.connect_pending {
                "waiting for approval..."
            } else if state.can_connect {
                "press 'c' to connect"
            } else {
                "create an account first"
            };
            vec![
                field_line("Provider", name.as_str(), Color::White),
                field_line("Status", hint, Color::Yellow),
            ]
        }
    };

    f.render_widget(render_card(" Wallet ", lines, state.has_connected_wallet), area);
}

fn draw_transfer_card(f: &mut Frame, state: &RenderState, area: Rect) {
    let mut lines = Vec::new();

    if state.transfer_pending {
        lines.push(field_line("Status", "sending 2 SOL...", Color::Yellow));
    } else if state.can_transfer {
        lines.push(field_line("Status", "press 't' to send 2 SOL", Color::White));
    } else {
        lines.push(field_line("Status", "needs an account and a wallet", Color::DarkGray));
    }

    if let Some(signature) = state.last_transfer_signature {
        lines.push(field_line("Signature", signature.to_string(), Color::Green));
    }

    if let Some(message) = &state.last_error_message {
        lines.push(field_line("Error", message.as_str(), Color::Red));
    }

    f.render_widget(render_card(" Transfer ", lines, state.can_transfer), area);
}

fn draw_activity(f: &mut Frame, state: &RenderState, area: Rect) {
    let mut lines: Vec<Line> = state
        .activity
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    entry.timestamp.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.content.as_str(), Style::default().fg(activity_color(entry.level))),
            ])
        })
        .collect();

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Nothing yet.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let activity = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Activity (↑/↓ scroll) "),
        )
        .wrap(Wrap { trim: false })
        .scroll((state.activity_scroll, 0));
    f.render_widget(activity, area);
}

fn draw_action_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let mut spans = Vec::new();
    spans.extend(render_action('n', "New account", state.can_create));
    spans.extend(render_action('a', "Airdrop", state.can_airdrop));
    if state.has_connected_wallet {
        spans.extend(render_action('d', "Disconnect", true));
    } else {
        spans.extend(render_action('c', "Connect", state.can_connect));
    }
    spans.extend(render_action('t', "Transfer", state.can_transfer));
    spans.extend(render_action('?', "Help", true));
    spans.extend(render_action('q', "Quit", true));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_notice_popup(f: &mut Frame, notice: &airdrop_tui::app::state::Notice, area: Rect) {
    let popup_area = centered_rect(60, 25, area);
    let color = if notice.is_error { Color::Red } else { Color::Green };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ", notice.title))
        .title_bottom(Line::from(" Enter/Esc to close ").right_aligned())
        .style(Style::default().bg(Color::Black));

    let body = Paragraph::new(notice.body.as_str())
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(body, popup_area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);

    let help_text = r#"
 AIRDROP TUI - Keyboard Shortcuts

 SESSION
   n                  Create a new local account
   a                  Request a 2 SOL airdrop
   c                  Connect the wallet
   d                  Disconnect the wallet
   t                  Transfer 2 SOL to the wallet
   r                  Refresh the balance

 ACTIVITY
   ↑ / ↓              Scroll the activity log

 GENERAL
   ?                  Toggle this help
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

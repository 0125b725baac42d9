//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    // Session commands
    CreateAccount,
    RequestAirdrop,
    ConnectWallet,
    DisconnectWallet,
    Transfer,
    RefreshBalance,

    // Activity log
    ScrollUp,
    ScrollDown,

    // Popups
    DismissNotice,
    ToggleHelp,
    CloseHelp,

    // System
    Quit,
}

/// Convert a key event to a UiEvent based on which popup is open
pub fn key_to_ui_event(key: KeyEvent, show_help: bool, show_notice: bool) -> Option<UiEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UiEvent::Quit);
    }

    // Popups swallow every other key
    if show_help {
        return Some(UiEvent::CloseHelp);
    }
    if show_notice {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => Some(UiEvent::DismissNotice),
            KeyCode::Char('q') => Some(UiEvent::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Char('n') => Some(UiEvent::CreateAccount),
        KeyCode::Char('a') => Some(UiEvent::RequestAirdrop),
        KeyCode::Char('c') => Some(UiEvent::ConnectWallet),
        KeyCode::Char('d') => Some(UiEvent::DisconnectWallet),
        KeyCode::Char('t') => Some(UiEvent::Transfer),
        KeyCode::Char('r') => Some(UiEvent::RefreshBalance),
        KeyCode::Up => Some(UiEvent::ScrollUp),
        KeyCode::Down => Some(UiEvent::ScrollDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_command_keys() {
        assert_eq!(key_to_ui_event(press(KeyCode::Char('n')), false, false), Some(UiEvent::CreateAccount));
        assert_eq!(key_to_ui_event(press(KeyCode::Char('t')), false, false), Some(UiEvent::Transfer));
        assert_eq!(key_to_ui_event(press(KeyCode::Char('x')), false, false), None);
    }

    #[test]
    fn test_notice_captures_keys() {
        assert_eq!(key_to_ui_event(press(KeyCode::Char('t')), false, true), None);
        assert_eq!(key_to_ui_event(press(KeyCode::Enter), false, true), Some(UiEvent::DismissNotice));
        assert_eq!(key_to_ui_event(press(KeyCode::Char('t')), true, false), Some(UiEvent::CloseHelp));
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_ui_event(key, true, true), Some(UiEvent::Quit));
    }
}

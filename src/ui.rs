use ratatui::{prelude::*, widgets::*};

use crate::app::session::SessionPhase;
use crate::app::state::ActivityLevel;
use crate::models::{Address, Lamports};

/// Renders a command hint such as `[a] Airdrop 2 SOL`, dimmed when unavailable
pub fn render_action<'a>(key: char, label: &'a str, enabled: bool) -> Vec<Span<'a>> {
    let (key_style, label_style) = if enabled {
        (
            Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
            Style::default().fg(Color::White),
        )
    } else {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    };
    vec![
        Span::styled(format!(" {key} "), key_style),
        Span::styled(format!(" {label}  "), label_style),
    ]
}

/// Renders a bordered card with a colored title
pub fn render_card<'a>(title: &'a str, lines: Vec<Line<'a>>, highlight: bool) -> Paragraph<'a> {
    let border_style = if highlight {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .wrap(Wrap { trim: false })
}

/// Label/value pair on one line
pub fn field_line<'a>(label: &'a str, value: impl Into<String>, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value.into(), Style::default().fg(color)),
    ])
}

/// Abbreviate an address as `AbCd…WxYz` for narrow terminals
pub fn short_address(address: &Address, width: u16) -> String {
    let text = address.to_string();
    if (width as usize) >= text.len() + 12 || text.len() <= 12 {
        return text;
    }
    format!("{}…{}", &text[..6], &text[text.len() - 6..])
}

pub fn format_balance(balance: Option<Lamports>) -> String {
    match balance {
        Some(lamports) => lamports.to_string(),
        None => "…".to_string(),
    }
}

/// Phase color
pub fn phase_color(phase: SessionPhase) -> Color {
    match phase {
        SessionPhase::Empty => Color::DarkGray,
        SessionPhase::Fundable => Color::Yellow,
        SessionPhase::Funded => Color::Green,
        SessionPhase::Connected => Color::Cyan,
        SessionPhase::Transferred => Color::Magenta,
        SessionPhase::TransferFailed => Color::Red,
    }
}

/// Activity level color
pub fn activity_color(level: ActivityLevel) -> Color {
    match level {
        ActivityLevel::Info => Color::Gray,
        ActivityLevel::Success => Color::Green,
        ActivityLevel::Error => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address() {
        let address = Address::new([7u8; 32]);
        let full = address.to_string();
        assert_eq!(short_address(&address, 200), full);

        let short = short_address(&address, 20);
        assert!(short.starts_with(&full[..6]));
        assert!(short.ends_with(&full[full.len() - 6..]));
        assert_eq!(short.chars().count(), 13);
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(None), "…");
        assert_eq!(format_balance(Some(Lamports::from_sol(2))), Lamports::from_sol(2).to_string());
    }
}

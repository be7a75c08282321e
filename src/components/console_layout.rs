// ABOUTME: Console layout with status header, terminal pane and key-hint footer

use crate::app::ConsoleState;
use crate::terminal::{ConnectionState, ConnectionStatus, TerminalSize, TerminalView};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

pub struct ConsoleLayout;

impl ConsoleLayout {
    pub fn new() -> Self {
        Self
    }

    /// Draw the console and return the inner size of the terminal pane
    pub fn render(&self, frame: &mut Frame, state: &ConsoleState) -> TerminalSize {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(3),    // Terminal
                Constraint::Length(1), // Key hints
            ])
            .split(frame.size());

        Self::render_header(frame, chunks[0], state);

        let pane = chunks[1];
        {
            let emulator = state.emulator();
            let view = TerminalView::new(&emulator)
                .title(format!(" {} ", state.target.id))
                .focused(state.status.is_connected);
            frame.render_widget(view, pane);
        }

        Self::render_footer(frame, chunks[2], state);

        let inner = Block::default().borders(Borders::ALL).inner(pane);
        TerminalSize::new(inner.width, inner.height)
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &ConsoleState) {
        let title = format!(" OmniCloud console · {}", state.target.id);
        let chip = status_chip(&state.status);
        let chip_text = format!(" {} ", chip.0);

        let padding = usize::from(area.width)
            .saturating_sub(title.width())
            .saturating_sub(chip_text.width());

        let line = Line::from(vec![
            Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" ".repeat(padding)),
            Span::styled(
                chip_text,
                Style::default().fg(Color::Black).bg(chip.1).add_modifier(Modifier::BOLD),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_footer(frame: &mut Frame, area: Rect, state: &ConsoleState) {
        let status = &state.status;
        let hints = footer_hints(state);

        let mut spans = Vec::new();
        for (key, action) in hints {
            spans.push(Span::styled(
                format!(" {key} "),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(format!("{action}  "), Style::default().fg(Color::Gray)));
        }

        if let Some(error) = status.last_error.as_deref().filter(|_| !status.is_connected) {
            spans.push(Span::styled(
                format!("│ {error}"),
                Style::default().fg(Color::Red),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

impl Default for ConsoleLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Key hints for the footer. While connected the Ctrl chords belong to the
/// remote shell, so console actions are listed behind the `Ctrl-]` prefix.
pub fn footer_hints(state: &ConsoleState) -> Vec<(&'static str, &'static str)> {
    let status = &state.status;
    if state.command_prefix {
        let mut hints = vec![("d", "Disconnect"), ("l", "Clear"), ("q", "Quit")];
        if status.can_reconnect() {
            hints.insert(1, ("r", "Reconnect"));
        }
        return hints;
    }

    if status.is_connected {
        return vec![("Ctrl-Q", "Quit"), ("Ctrl-]", "Console keys"), ("PgUp/PgDn", "Scroll")];
    }

    let mut hints = vec![("Ctrl-Q", "Quit"), ("Ctrl-L", "Clear"), ("PgUp/PgDn", "Scroll")];
    if status.can_reconnect() {
        hints.insert(1, ("Ctrl-R", "Reconnect"));
    } else {
        hints.insert(1, ("Ctrl-D", "Disconnect"));
    }
    hints
}

/// Label and background color for the connection chip
pub fn status_chip(status: &ConnectionStatus) -> (&'static str, Color) {
    match status.state {
        ConnectionState::Connected => ("● Connected", Color::Green),
        ConnectionState::Connecting => ("◌ Connecting", Color::Yellow),
        ConnectionState::Failed => ("✗ Demo mode", Color::Red),
        ConnectionState::Idle | ConnectionState::Disconnected => ("○ Disconnected", Color::Gray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstanceTarget;
    use crate::terminal::TerminalEmulator;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_status_chip_labels() {
        let connected = ConnectionStatus::new(ConnectionState::Connected, None);
        assert_eq!(status_chip(&connected).0, "● Connected");

        let failed = ConnectionStatus::new(ConnectionState::Failed, Some("refused".into()));
        assert_eq!(status_chip(&failed).1, Color::Red);

        let idle = ConnectionStatus::default();
        assert_eq!(status_chip(&idle).0, "○ Disconnected");
    }

    fn console_state(state: ConnectionState) -> ConsoleState {
        let emulator = Arc::new(Mutex::new(TerminalEmulator::new(TerminalSize::default(), 0)));
        let mut console = ConsoleState::new(InstanceTarget::new("i-42"), emulator);
        console.status = ConnectionStatus::new(state, None);
        console
    }

    #[test]
    fn test_footer_hints_follow_connection() {
        let keys = |state: &ConsoleState| -> Vec<&str> {
            footer_hints(state).into_iter().map(|(key, _)| key).collect()
        };

        let failed = console_state(ConnectionState::Failed);
        assert_eq!(keys(&failed), vec!["Ctrl-Q", "Ctrl-R", "Ctrl-L", "PgUp/PgDn"]);

        let connecting = console_state(ConnectionState::Connecting);
        assert_eq!(keys(&connecting), vec!["Ctrl-Q", "Ctrl-D", "Ctrl-L", "PgUp/PgDn"]);

        let mut connected = console_state(ConnectionState::Connected);
        assert_eq!(keys(&connected), vec!["Ctrl-Q", "Ctrl-]", "PgUp/PgDn"]);

        connected.command_prefix = true;
        assert_eq!(keys(&connected), vec!["d", "l", "q"]);
    }
}

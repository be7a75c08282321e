// ABOUTME: Event handling for keyboard input in the console
// Maps console shortcuts to app actions and encodes everything else as terminal bytes

use crate::app::state::ConsoleState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    Reconnect,
    Disconnect,
    Clear,
    ScrollUp,
    ScrollDown,
    /// Keystroke data for the remote shell (or the demo shell)
    Input(String),
    LayoutChanged,
}

/// Escape byte for console commands (`Ctrl-]`, as in telnet)
pub const COMMAND_PREFIX: &str = "\x1d";

pub struct EventHandler;

impl EventHandler {
    /// Map a key press to a console action or terminal input.
    ///
    /// While connected, Ctrl-D, Ctrl-L and Ctrl-R belong to the remote shell.
    /// Console actions stay reachable through the `Ctrl-]` prefix followed by
    /// `d`, `r`, `l` or `q`. `Ctrl-]` twice sends a literal `Ctrl-]`.
    pub fn handle_key_event(key_event: KeyEvent, state: &mut ConsoleState) -> Option<AppEvent> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }

        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);

        if state.command_prefix {
            state.command_prefix = false;
            return match key_event.code {
                KeyCode::Char(']' | '5') if ctrl => Some(AppEvent::Input(COMMAND_PREFIX.to_string())),
                KeyCode::Char('q') => Some(AppEvent::Quit),
                KeyCode::Char('d') => Some(AppEvent::Disconnect),
                KeyCode::Char('l') => Some(AppEvent::Clear),
                KeyCode::Char('r') => Self::reconnect_if_allowed(state),
                _ => None,
            };
        }

        if ctrl {
            match key_event.code {
                // Legacy terminals report 0x1d as Ctrl-5
                KeyCode::Char(']' | '5') => {
                    state.command_prefix = true;
                    return None;
                }
                KeyCode::Char('q') => return Some(AppEvent::Quit),
                _ if state.status.is_connected => {}
                KeyCode::Char('r') => return Self::reconnect_if_allowed(state),
                KeyCode::Char('d') => return Some(AppEvent::Disconnect),
                KeyCode::Char('l') => return Some(AppEvent::Clear),
                _ => {}
            }
        }

        match key_event.code {
            KeyCode::PageUp => Some(AppEvent::ScrollUp),
            KeyCode::PageDown => Some(AppEvent::ScrollDown),
            _ => Self::key_to_bytes(key_event).map(AppEvent::Input),
        }
    }

    // Reconnect is only offered when neither connected nor connecting
    fn reconnect_if_allowed(state: &ConsoleState) -> Option<AppEvent> {
        state.status.can_reconnect().then_some(AppEvent::Reconnect)
    }

    /// Encode a key press the way an xterm-compatible terminal would
    pub fn key_to_bytes(key_event: KeyEvent) -> Option<String> {
        let data = match key_event.code {
            KeyCode::Char(c) => {
                if key_event.modifiers.contains(KeyModifiers::CONTROL) {
                    if !c.is_ascii_alphabetic() {
                        return None;
                    }
                    // Send control character
                    char::from(c.to_ascii_lowercase() as u8 & 0x1f).to_string()
                } else if key_event.modifiers.contains(KeyModifiers::ALT) {
                    format!("\x1b{c}")
                } else {
                    c.to_string()
                }
            }
            KeyCode::Enter => "\r".to_string(),
            KeyCode::Tab => "\t".to_string(),
            KeyCode::BackTab => "\x1b[Z".to_string(),
            KeyCode::Backspace => "\x7f".to_string(),
            KeyCode::Esc => "\x1b".to_string(),
            KeyCode::Up => "\x1b[A".to_string(),
            KeyCode::Down => "\x1b[B".to_string(),
            KeyCode::Right => "\x1b[C".to_string(),
            KeyCode::Left => "\x1b[D".to_string(),
            KeyCode::Home => "\x1b[H".to_string(),
            KeyCode::End => "\x1b[F".to_string(),
            KeyCode::Delete => "\x1b[3~".to_string(),
            KeyCode::Insert => "\x1b[2~".to_string(),
            KeyCode::F(n) => {
                let sequence = match n {
                    1 => "\x1bOP",
                    2 => "\x1bOQ",
                    3 => "\x1bOR",
                    4 => "\x1bOS",
                    5 => "\x1b[15~",
                    6 => "\x1b[17~",
                    7 => "\x1b[18~",
                    8 => "\x1b[19~",
                    9 => "\x1b[20~",
                    10 => "\x1b[21~",
                    11 => "\x1b[23~",
                    12 => "\x1b[24~",
                    _ => return None,
                };
                sequence.to_string()
            }
            _ => return None,
        };

        Some(data)
    }
}

// ABOUTME: Unit tests for console key handling: shortcuts, reconnect gating and terminal byte encoding

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use omni_console::app::{AppEvent, ConsoleState, EventHandler, COMMAND_PREFIX};
use omni_console::models::InstanceTarget;
use omni_console::terminal::{ConnectionState, ConnectionStatus, TerminalEmulator, TerminalSize};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn create_state(state: ConnectionState) -> ConsoleState {
    let emulator = Arc::new(Mutex::new(TerminalEmulator::new(TerminalSize::default(), 100)));
    let mut console = ConsoleState::new(InstanceTarget::new("i-42"), emulator);
    console.status = ConnectionStatus::new(state, None);
    console
}

fn create_key_event(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

#[test]
fn test_console_shortcuts_when_not_connected() {
    let mut state = create_state(ConnectionState::Failed);

    assert_eq!(EventHandler::handle_key_event(ctrl('q'), &mut state), Some(AppEvent::Quit));
    assert_eq!(EventHandler::handle_key_event(ctrl('d'), &mut state), Some(AppEvent::Disconnect));
    assert_eq!(EventHandler::handle_key_event(ctrl('l'), &mut state), Some(AppEvent::Clear));
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::PageUp), &mut state),
        Some(AppEvent::ScrollUp)
    );
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::PageDown), &mut state),
        Some(AppEvent::ScrollDown)
    );
}

#[test]
fn test_reconnect_offered_only_when_idle_or_failed() {
    assert_eq!(
        EventHandler::handle_key_event(ctrl('r'), &mut create_state(ConnectionState::Connecting)),
        None
    );

    for state in [
        ConnectionState::Idle,
        ConnectionState::Disconnected,
        ConnectionState::Failed,
    ] {
        assert_eq!(
            EventHandler::handle_key_event(ctrl('r'), &mut create_state(state)),
            Some(AppEvent::Reconnect),
            "reconnect should be offered while {state:?}"
        );
    }
}

#[test]
fn test_shell_control_keys_reach_remote_when_connected() {
    let mut state = create_state(ConnectionState::Connected);

    let cases = [('d', "\x04"), ('l', "\x0c"), ('r', "\x12")];
    for (key, expected) in cases {
        assert_eq!(
            EventHandler::handle_key_event(ctrl(key), &mut state),
            Some(AppEvent::Input(expected.to_string())),
            "Ctrl-{key} should be forwarded while connected"
        );
    }

    assert_eq!(EventHandler::handle_key_event(ctrl('q'), &mut state), Some(AppEvent::Quit));
}

#[test]
fn test_command_prefix_reaches_console_actions() {
    let mut state = create_state(ConnectionState::Connected);

    assert_eq!(EventHandler::handle_key_event(ctrl(']'), &mut state), None);
    assert!(state.command_prefix);
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::Char('d')), &mut state),
        Some(AppEvent::Disconnect)
    );
    assert!(!state.command_prefix);

    assert_eq!(EventHandler::handle_key_event(ctrl(']'), &mut state), None);
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::Char('l')), &mut state),
        Some(AppEvent::Clear)
    );

    // Reconnect stays gated behind the prefix too
    assert_eq!(EventHandler::handle_key_event(ctrl(']'), &mut state), None);
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::Char('r')), &mut state),
        None
    );
    assert!(!state.command_prefix);
}

#[test]
fn test_command_prefix_twice_sends_literal() {
    let mut state = create_state(ConnectionState::Connected);

    assert_eq!(EventHandler::handle_key_event(ctrl('5'), &mut state), None);
    assert_eq!(
        EventHandler::handle_key_event(ctrl(']'), &mut state),
        Some(AppEvent::Input(COMMAND_PREFIX.to_string()))
    );
    assert!(!state.command_prefix);
}

#[test]
fn test_unknown_key_after_prefix_is_swallowed() {
    let mut state = create_state(ConnectionState::Connected);

    EventHandler::handle_key_event(ctrl(']'), &mut state);
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::Char('x')), &mut state),
        None
    );
    assert_eq!(
        EventHandler::handle_key_event(create_key_event(KeyCode::Char('x')), &mut state),
        Some(AppEvent::Input("x".to_string()))
    );
}

#[test]
fn test_plain_keys_become_input() {
    let mut state = create_state(ConnectionState::Connected);

    let cases = [
        (KeyCode::Char('q'), "q"),
        (KeyCode::Char('L'), "L"),
        (KeyCode::Enter, "\r"),
        (KeyCode::Backspace, "\x7f"),
        (KeyCode::Tab, "\t"),
        (KeyCode::Esc, "\x1b"),
        (KeyCode::Up, "\x1b[A"),
        (KeyCode::Left, "\x1b[D"),
        (KeyCode::Delete, "\x1b[3~"),
        (KeyCode::F(1), "\x1bOP"),
        (KeyCode::F(12), "\x1b[24~"),
    ];

    for (code, expected) in cases {
        assert_eq!(
            EventHandler::handle_key_event(create_key_event(code), &mut state),
            Some(AppEvent::Input(expected.to_string())),
            "unexpected encoding for {code:?}"
        );
    }
}

#[test]
fn test_control_characters_pass_through() {
    let mut state = create_state(ConnectionState::Connected);

    assert_eq!(
        EventHandler::handle_key_event(ctrl('c'), &mut state),
        Some(AppEvent::Input("\x03".to_string()))
    );
    assert_eq!(
        EventHandler::handle_key_event(ctrl('z'), &mut state),
        Some(AppEvent::Input("\x1a".to_string()))
    );
    assert_eq!(EventHandler::handle_key_event(ctrl('1'), &mut state), None);
}

#[test]
fn test_alt_prefixes_escape() {
    let mut state = create_state(ConnectionState::Connected);
    let alt_b = KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT);

    assert_eq!(
        EventHandler::handle_key_event(alt_b, &mut state),
        Some(AppEvent::Input("\x1bb".to_string()))
    );
}

#[test]
fn test_key_release_ignored() {
    let mut state = create_state(ConnectionState::Connected);
    let release = KeyEvent {
        code: KeyCode::Char('a'),
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Release,
        state: KeyEventState::NONE,
    };

    assert_eq!(EventHandler::handle_key_event(release, &mut state), None);
}

#[test]
fn test_unmapped_keys_ignored() {
    assert_eq!(EventHandler::key_to_bytes(create_key_event(KeyCode::F(13))), None);
    assert_eq!(EventHandler::key_to_bytes(create_key_event(KeyCode::Null)), None);
}
